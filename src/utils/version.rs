//! Version information utilities
//!
//! Provides the version reported to the server in the Authorization header.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the current crate version
pub fn get_version() -> &'static str {
    VERSION
}

/// User agent sent with every request
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), get_version())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_user_agent() {
        let agent = user_agent();
        assert!(agent.starts_with("emby-connector/"));
        assert!(agent.ends_with(VERSION));
    }
}
