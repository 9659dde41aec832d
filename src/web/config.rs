//! Web server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Foreign origins allowed to call the API. Empty disables CORS and
    /// rejects every cross-origin command.
    pub cors_origins: Vec<String>,
    /// Maximum number of concurrent status stream clients
    pub max_websocket_connections: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_WEB_PORT,
            cors_origins: Vec::new(),
            max_websocket_connections: 16,
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_cors_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_websocket_connections(mut self, max: usize) -> Self {
        self.max_websocket_connections = max;
        self
    }

    pub fn cors_enabled(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Whether a request carrying this `Origin` header may issue commands.
    /// `host` is the request's `Host` header; a page served by this API is
    /// always allowed.
    pub fn allows_origin(&self, origin: &str, host: Option<&str>) -> bool {
        let origin = origin.trim_end_matches('/');
        if let Some(host) = host {
            if origin == format!("http://{}", host) {
                return true;
            }
        }
        self.cors_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/') == origin)
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
