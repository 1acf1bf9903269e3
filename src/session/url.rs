//! Request URL construction
//!
//! Turns a server path plus [`UrlOptions`] into a fully qualified URL. The
//! builder performs no I/O and cannot fail: base URLs are validated when the
//! configuration is.

use crate::{
    Result,
    config::ConnectorConfig,
    types::UrlOptions,
};
use url::Url;

/// Credentials visible to the URL builder at the time a request is built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Session access token obtained by login
    pub token: Option<String>,
    /// Static API key from configuration
    pub api_key: Option<String>,
    /// Resolved user id (login result, else configured)
    pub user_id: Option<String>,
}

impl Credentials {
    /// Value sent as `api_key`: the session token wins over the static key
    pub fn effective_key(&self) -> Option<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_key.as_deref().filter(|k| !k.is_empty()))
    }
}

/// Builds request URLs from the connector configuration
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: Url,
    remote: Option<Url>,
    base_path: String,
    device_id: String,
}

impl UrlBuilder {
    /// Create a builder from validated configuration
    pub fn from_config(config: &ConnectorConfig) -> Result<Self> {
        Ok(Self {
            base: config.base_url()?,
            remote: config.remote_url()?,
            base_path: config.server.base_path.trim_end_matches('/').to_string(),
            device_id: config.auth.device_id.clone(),
        })
    }

    /// Build the URL for `path`
    pub fn build(&self, path: &str, options: &UrlOptions, credentials: &Credentials) -> String {
        let target = match (&self.remote, options.remote) {
            (Some(remote), true) => remote,
            _ => &self.base,
        };

        let scheme = match (options.push, target.scheme()) {
            (true, "https") => "wss",
            (true, _) => "ws",
            (false, scheme) => scheme,
        };

        let mut url = format!("{}://{}", scheme, target.host_str().unwrap_or_default());
        if let Some(port) = target.port() {
            url.push_str(&format!(":{}", port));
        }
        url.push_str(target.path().trim_end_matches('/'));
        url.push_str(&self.base_path);

        let user_id = options
            .user_id
            .as_deref()
            .or(credentials.user_id.as_deref())
            .unwrap_or_default();
        let api_key = credentials.effective_key();

        let path = path
            .replace("{UserId}", user_id)
            .replace("{DeviceId}", &self.device_id)
            .replace("{ApiKey}", api_key.unwrap_or_default());
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&path);

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &options.query {
            query.append_pair(key, value);
        }
        if options.attach_api_key {
            if let Some(key) = api_key {
                query.append_pair("api_key", key);
            }
            // Identifies the device even before any key is known
            query.append_pair("deviceId", &self.device_id);
        }
        if options.attach_user_id && !user_id.is_empty() {
            query.append_pair("userId", user_id);
        }

        let query = query.finish();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn builder(url: &str) -> UrlBuilder {
        let config = ConnectorConfig::new(url)
            .with_api_key("k", "u1")
            .with_device_id("dev");
        UrlBuilder::from_config(&config).unwrap()
    }

    fn creds() -> Credentials {
        Credentials {
            token: None,
            api_key: Some("k".to_string()),
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_query_order() {
        let options = UrlOptions::new()
            .with_query("Recursive", "true")
            .with_user_id(true);
        let url = builder("http://media:8096").build("/Items", &options, &creds());

        assert_eq!(
            url,
            "http://media:8096/emby/Items?Recursive=true&api_key=k&deviceId=dev&userId=u1"
        );
    }

    #[test]
    fn test_no_trailing_question_mark() {
        let options = UrlOptions::new().with_api_key(false);
        let url = builder("http://media:8096").build("/System/Info/Public", &options, &creds());
        assert_eq!(url, "http://media:8096/emby/System/Info/Public");
    }

    #[rstest]
    #[case("http://media:8096", false, "http://media:8096")]
    #[case("https://media", false, "https://media")]
    #[case("http://media:8096", true, "ws://media:8096")]
    #[case("https://media", true, "wss://media")]
    fn test_scheme_mapping(#[case] base: &str, #[case] push: bool, #[case] prefix: &str) {
        let options = UrlOptions::new().with_push(push).with_api_key(false);
        let url = builder(base).build("/embywebsocket", &options, &creds());
        assert_eq!(url, format!("{}/emby/embywebsocket", prefix));
    }

    #[test]
    fn test_token_preferred_over_api_key() {
        let credentials = Credentials {
            token: Some("session".to_string()),
            ..creds()
        };
        let url = builder("http://media:8096").build("/Items", &UrlOptions::new(), &credentials);
        assert!(url.contains("api_key=session"));
        assert!(!url.contains("api_key=k"));
    }

    #[test]
    fn test_no_key_known() {
        let url =
            builder("http://media:8096").build("/Items", &UrlOptions::new(), &Credentials::default());
        assert_eq!(url, "http://media:8096/emby/Items?deviceId=dev");
    }

    #[test]
    fn test_remote_selection() {
        let config = ConnectorConfig::new("http://lan:8096")
            .with_remote_url("https://public.example.org")
            .with_api_key("k", "u1");
        let builder = UrlBuilder::from_config(&config).unwrap();
        let options = UrlOptions::new().with_api_key(false);

        assert_eq!(
            builder.build("/Items", &options.clone().with_remote(true), &creds()),
            "https://public.example.org/emby/Items"
        );
        assert_eq!(
            builder.build("/Items", &options, &creds()),
            "http://lan:8096/emby/Items"
        );
    }

    #[test]
    fn test_path_placeholders() {
        let options = UrlOptions::new().with_api_key(false);
        let url = builder("http://media:8096").build("/Users/{UserId}/Items", &options, &creds());
        assert_eq!(url, "http://media:8096/emby/Users/u1/Items");

        let url = builder("http://media:8096").build(
            "/Users/{UserId}/Items",
            &options.for_user("other"),
            &creds(),
        );
        assert_eq!(url, "http://media:8096/emby/Users/other/Items?userId=other");
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let options = UrlOptions::new().with_api_key(false);
        let url = builder("https://host/media/").build("Items", &options, &creds());
        assert_eq!(url, "https://host/media/emby/Items");
    }

    #[test]
    fn test_query_values_are_encoded() {
        let options = UrlOptions::new()
            .with_api_key(false)
            .with_query("SearchTerm", "a b&c");
        let url = builder("http://media:8096").build("/Items", &options, &creds());
        assert_eq!(url, "http://media:8096/emby/Items?SearchTerm=a+b%26c");
    }
}
