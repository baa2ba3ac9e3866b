//! REST Server Configuration
//!
//! Bind address, link origin policy and CORS settings.

use serde::{Deserialize, Serialize};

use crate::core::{ViewsetError, ViewsetResult};

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Scheme used in links when the request does not say otherwise
    #[serde(default = "default_scheme")]
    pub default_scheme: String,

    /// Honor `X-Forwarded-Proto` / `X-Forwarded-Host` when building links
    #[serde(default)]
    pub trust_forwarded_headers: bool,

    /// CORS allowed origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Default for RestServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_scheme: default_scheme(),
            trust_forwarded_headers: false,
            cors_origins: Vec::new(),
        }
    }
}

impl RestServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> ViewsetResult<()> {
        if !matches!(self.default_scheme.as_str(), "http" | "https") {
            return Err(ViewsetError::configuration(format!(
                "default_scheme must be 'http' or 'https', got '{}'",
                self.default_scheme
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ViewsetError::configuration("host cannot be empty"));
        }
        Ok(())
    }
}
