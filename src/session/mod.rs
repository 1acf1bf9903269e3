//! # Session layer
//!
//! The transport core shared by the async and blocking surfaces:
//!
//! - [`ExecutionContext`] / [`ContextId`]: which pooled session a call uses
//! - [`SessionPool`]: one reference counted HTTP session per context
//! - [`UrlBuilder`]: request URLs with credentials and device id attached
//! - [`AuthManager`]: access token, login exchange, server flavor detection
//! - [`RequestExecutor`]: one logical call with an attempt budget
//!
//! A call acquires a lease on its context's session for each attempt and
//! releases it before the next one, so a session lives exactly as long as
//! some call in its context is running.

pub mod auth;
pub mod context;
pub mod executor;
pub mod network;
pub mod pool;
pub mod url;

pub use auth::{AuthManager, AuthState};
pub use context::{ContextId, ExecutionContext};
pub use executor::RequestExecutor;
pub use network::{HttpSession, RequestBody, SessionSettings, TlsTrust};
pub use pool::{PoolStats, SessionLease, SessionPool};
pub use url::{Credentials, UrlBuilder};
