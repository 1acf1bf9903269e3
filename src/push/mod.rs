//! Server push socket
//!
//! A single long-lived websocket that fans incoming messages out to the
//! registered handlers.

pub mod client;

pub use client::{AsyncPushHandler, PushClient};
