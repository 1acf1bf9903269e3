//! Type definitions for the connector
//!
//! This module contains the data structures passed across the public surface.

pub mod internal;
pub mod request;
pub mod response;

pub use internal::{AuthState, LoginResult};
pub use request::{BodyEncoding, UrlOptions};
pub use response::{ApiResponse, AuthenticatedUser, AuthenticationResult, PublicSystemInfo};
