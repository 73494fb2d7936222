use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::Credentials;
use crate::error_handling::types::ConfigError;

fn default_port() -> u16 {
    80
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_auto_url_encoding() -> bool {
    true
}

/// Target server configuration for one load-test scenario.
///
/// # Fields Overview
///
/// - `host`: server host name, without scheme ("dav.example.org")
/// - `port`: server TCP port, defaults to 80
/// - `dav_path`: WebDAV home directory relative to the host, e.g. "webdav/"
/// - `credentials`: optional Basic-auth pair, both fields or none
/// - `connect_timeout_secs`: TCP connect limit, defaults to 10
/// - `request_timeout_secs`: whole request/response limit, defaults to 60
/// - `auto_url_encoding`: percent-encode relative paths automatically,
///   defaults to true; disable it when the test data is already encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebDavConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub dav_path: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_auto_url_encoding")]
    pub auto_url_encoding: bool,
}

impl WebDavConfig {
    /// Creates a configuration for the given host and port with defaults for
    /// everything else.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            dav_path: String::new(),
            credentials: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            auto_url_encoding: default_auto_url_encoding(),
        }
    }

    /// Reads and validates a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: WebDavConfig =
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost("host must not be empty".to_string()));
        }
        if self.host.contains("://") {
            return Err(ConfigError::EmptyHost(format!(
                "host '{}' must not carry a scheme",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(ConfigError::BadPort("port must not be 0".to_string()));
        }
        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() || creds.password.is_empty() {
                return Err(ConfigError::PartialCredentials(
                    "username and password must both be set".to_string(),
                ));
            }
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::BadTimeout(
                "timeouts must not be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
