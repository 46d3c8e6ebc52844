//! Gateway configuration, loadable from TOML.
//!
//! ```toml
//! print_stack_trace = true
//!
//! [authorization_server]
//! authorize_path = "/login/oauth2/auth"
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::Deserialize;

/// Default location of the transport documentation linked from error bodies.
pub const DEFAULT_TRANSPORT_DOCS_URL: &str =
    "https://docs.rs/gateway-core/latest/gateway_core/struct.GatewayConfig.html";

/// Failures loading a [`GatewayConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The contents are not valid configuration.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Include the failure source chain in synthesized error bodies.
    pub print_stack_trace: bool,
    /// Documentation link embedded in synthesized error bodies.
    pub transport_docs_url: String,
    /// Authorization-server endpoints.
    pub authorization_server: AuthServerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            print_stack_trace: false,
            transport_docs_url: DEFAULT_TRANSPORT_DOCS_URL.to_string(),
            authorization_server: AuthServerConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Paths served by [`crate::AuthorizationServer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthServerConfig {
    /// Front-channel authorization endpoint.
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
    /// Back-channel token endpoint.
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            authorize_path: default_authorize_path(),
            token_path: default_token_path(),
        }
    }
}

fn default_authorize_path() -> String {
    "/oauth2/auth".to_string()
}

fn default_token_path() -> String {
    "/oauth2/token".to_string()
}
