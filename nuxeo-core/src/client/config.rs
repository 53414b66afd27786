//! # Client Configuration
//!
//! Everything needed to reach a server: its URL, how to authenticate, and the defaults applied
//! to every request. A configuration can be built in code or loaded from a JSON file:
//!
//! ```json
//! {
//!   "url": "http://localhost:8080/nuxeo",
//!   "authentication": { "type": "basic", "username": "Administrator", "password": "Administrator" },
//!   "timeout_secs": 60,
//!   "schemas": ["dublincore", "file"]
//! }
//! ```
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': '{source}'")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': '{source}'")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// How requests authenticate against the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    #[default]
    None,
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// A Nuxeo authentication token, sent in the `X-Authentication-Token` header.
    Token { token: String },
    /// An OAuth2 access token.
    Bearer { token: String },
    /// Portal single sign-on: every request is signed with a secret shared with the server.
    PortalSso { username: String, secret: String },
}

impl Authentication {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: token.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn portal_sso(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::PortalSso {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `http://localhost:8080/nuxeo`.
    pub url: String,
    #[serde(default)]
    pub authentication: Authentication,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Document schemas to return, sent in the `properties` header. Empty means server default.
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Repository targeted by document calls, the server default when absent.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("NuxeoRustClient/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            authentication: Authentication::None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            schemas: Vec::new(),
            headers: Vec::new(),
            repository: None,
            user_agent: default_user_agent(),
        }
    }

    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the document schemas to fetch, `*` meaning all of them.
    pub fn schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.repository = Some(name.into());
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "url": "http://localhost:8080/nuxeo" }"#).unwrap();
        assert_eq!(config.authentication, Authentication::None);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.schemas.is_empty());
        assert!(config.user_agent.starts_with("NuxeoRustClient/"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "url": "http://localhost:8080/nuxeo",
                "authentication": {{ "type": "basic", "username": "Administrator", "password": "secret" }},
                "timeout_secs": 5,
                "schemas": ["*"],
                "headers": [["X-NXRepository", "default"]]
            }}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.authentication,
            Authentication::basic("Administrator", "secret")
        );
        assert_eq!(config.timeout_duration(), Duration::from_secs(5));
        assert_eq!(config.schemas, vec!["*"]);
        assert_eq!(
            config.headers,
            vec![("X-NXRepository".to_string(), "default".to_string())]
        );
    }

    #[test]
    fn test_portal_sso_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "url": "http://localhost:8080/nuxeo",
                "authentication": { "type": "portal_sso", "username": "Administrator", "secret": "nuxeo5secretkey" }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.authentication,
            Authentication::portal_sso("Administrator", "nuxeo5secretkey")
        );
    }

    #[test]
    fn test_from_missing_file() {
        let err = ClientConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://localhost:8080/nuxeo")
            .authentication(Authentication::token("abc"))
            .timeout(Duration::from_secs(10))
            .schemas(["dublincore", "file"])
            .header("X-NXRepository", "default")
            .repository("other");
        assert_eq!(config.authentication, Authentication::token("abc"));
        assert_eq!(config.repository.as_deref(), Some("other"));
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.schemas, vec!["dublincore", "file"]);
        assert_eq!(config.headers.len(), 1);
    }
}
