//! Emby Connector - transport and session layer for Emby/Jellyfin clients
//!
//! Everything a media-server object model needs to talk to the server: URL
//! construction, pooled HTTP sessions per execution context, username/password
//! login with automatic re-authentication, a bounded retry loop, JSON
//! decoding with useful diagnostics, and a push socket for server events.
//!
//! # Features
//!
//! - **Per-context sessions**: one reference counted HTTP session per execution context
//! - **Authentication**: static API key or username/password login, refreshed on 401
//! - **Bounded retries**: connection failures and timeouts share one attempt budget
//! - **Push socket**: ordered fan-out of websocket messages to sync or async handlers
//! - **Blocking surface**: the same core driven from synchronous code
//!
//! # Architecture
//!
//! [`Connector`] is the facade. Each call goes through the
//! [`RequestExecutor`](session::RequestExecutor), which leases a session from
//! the [`SessionPool`](session::SessionPool), builds the URL with the
//! [`UrlBuilder`](session::UrlBuilder) and consults the
//! [`AuthManager`](session::AuthManager) before the first attempt and after any
//! 401 response.
//!
//! # Examples
//!
//! ```rust,no_run
//! use emby_connector::{Connector, ConnectorConfig, UrlOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ConnectorConfig::new("https://media.example.org")
//!     .with_credentials("alice", "secret");
//! let connector = Connector::new(config)?;
//!
//! let info = connector.info().await?;
//! println!("{}", info["ServerName"]);
//!
//! let response = connector.get("/Users/{UserId}/Views", &UrlOptions::new()).await?;
//! println!("{} {}", response.status, response.body);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod config;
pub mod connector;
pub mod error;
pub mod push;
pub mod session;
pub mod types;
pub mod utils;

pub use blocking::BlockingConnector;
pub use config::{ConfigLoader, ConnectorConfig, ServerFlavor};
pub use connector::Connector;
pub use error::{Error, Result};
pub use push::AsyncPushHandler;
pub use session::{ContextId, ExecutionContext};
pub use types::{ApiResponse, BodyEncoding, LoginResult, UrlOptions};
