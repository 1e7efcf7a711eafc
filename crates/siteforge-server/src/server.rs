//! API server lifecycle.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::OWNER_HEADER;
use crate::routes::router;
use crate::state::AppState;

/// `[server]` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Allowed browser origin, or `*` for any
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Errors that can occur with the servers.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Server error: {0}")]
    Serve(String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Invalid CORS origin {0}")]
    InvalidOrigin(String),
}

/// The REST API and public site host.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// The router with CORS and request tracing applied.
    pub fn app(&self) -> Result<Router, ServerError> {
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(OWNER_HEADER),
            ])
            .max_age(Duration::from_secs(60 * 60));

        let cors = if self.config.cors_origin == "*" {
            cors.allow_origin(Any)
        } else {
            let origin = HeaderValue::from_str(&self.config.cors_origin)
                .map_err(|_| ServerError::InvalidOrigin(self.config.cors_origin.clone()))?;
            cors.allow_origin(origin).allow_credentials(true)
        };

        Ok(router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http()))
    }

    /// Serve until Ctrl+C or SIGTERM, then stop the job queue.
    pub async fn start(self) -> Result<(), ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address.clone()))?;

        let app = self.app()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;
        tracing::info!("API listening on http://{}", addr);
        tracing::info!("Health check: http://{}/health", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        self.state.queue.shutdown();
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
