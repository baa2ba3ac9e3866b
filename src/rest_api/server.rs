//! # REST API HTTP Server
//!
//! Binds the configured address and serves a [`ResourceRouter`].

use axum::Router;
use tokio::net::TcpListener;

use super::config::RestServerConfig;
use super::router::ResourceRouter;

/// HTTP server for registered viewsets
pub struct RestServer {
    config: RestServerConfig,
    router: Router,
}

impl RestServer {
    pub fn new(config: RestServerConfig, resources: ResourceRouter) -> Self {
        Self {
            config,
            router: resources.into_router(),
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(
            address = %listener.local_addr()?,
            scheme = %self.config.default_scheme,
            "serving resource viewsets"
        );

        axum::serve(listener, self.router).await
    }
}
