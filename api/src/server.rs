//! HTTP server setup.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::routes::router;
use crate::state::AppState;

/// Server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl ServerConfig {
    /// Creates a new configuration.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the bind address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 8080)
    }
}

/// The API server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Creates a server over the given configuration and state.
    #[must_use]
    pub const fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Binds the listener and serves requests until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind fails or the server loop aborts.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("API server listening on {addr}");
        axum::serve(listener, router(self.state)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_formatting() {
        let config = ServerConfig::new("127.0.0.1", 3000);
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }

    #[test]
    fn default_binds_all_interfaces() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }
}
