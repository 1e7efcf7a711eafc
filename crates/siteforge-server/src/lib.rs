//! HTTP servers for siteforge.
//!
//! [`ApiServer`] exposes the project, template and domain REST API and serves
//! published sites by host name. [`PreviewServer`] renders a single site
//! document and pushes updates to the browser over a WebSocket whenever the
//! file changes.

pub mod auth;
pub mod error;
pub mod preview;
pub mod routes;
pub mod server;
pub mod state;
pub mod watcher;
pub mod websocket;

pub use auth::{Owner, OWNER_HEADER};
pub use error::{ApiError, FieldError};
pub use preview::{PreviewConfig, PreviewServer};
pub use routes::router;
pub use server::{ApiServer, ServerConfig, ServerError};
pub use state::AppState;
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{LiveHub, LiveMessage};
