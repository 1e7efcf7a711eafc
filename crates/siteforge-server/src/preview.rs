//! Live preview server for a single site document.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::sync::RwLock;

use siteforge_blocks::load_document;
use siteforge_render::SiteRenderer;

use crate::server::ServerError;
use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{live_client_script, LiveHub, LiveMessage};

const LIVE_SOCKET: &str = "/__live";
const LIVE_SCRIPT: &str = "/__live.js";

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Site document to preview
    pub file: PathBuf,

    pub port: u16,
    pub host: String,

    /// Open a browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("site.json"),
            port: 7777,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

struct PreviewState {
    file: PathBuf,
    renderer: SiteRenderer,
    hub: LiveHub,
    page: RwLock<String>,
}

/// Serves one rendered document and pushes re-renders as the file changes.
pub struct PreviewServer {
    config: PreviewConfig,
    renderer: SiteRenderer,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig, renderer: SiteRenderer) -> Self {
        Self { config, renderer }
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address.clone()))?;

        let page = render_page(&self.renderer, &self.config.file);
        let state = Arc::new(PreviewState {
            file: self.config.file.clone(),
            renderer: self.renderer,
            hub: LiveHub::new(),
            page: RwLock::new(page),
        });

        let (watcher, mut rx) = FileWatcher::new(&[self.config.file.clone()])
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let watch_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&watch_state, event).await;
            }
            drop(watcher);
        });

        let app = preview_router(state);

        tracing::info!("Previewing {} at http://{}", self.config.file.display(), addr);

        if self.config.open {
            let url = format!("http://{}", addr);
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        Ok(())
    }
}

fn preview_router(state: Arc<PreviewState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(LIVE_SOCKET, get(ws_handler))
        .route(LIVE_SCRIPT, get(script_handler))
        .with_state(state)
}

/// Render the document with the live script injected, or an error page.
fn render_page(renderer: &SiteRenderer, file: &Path) -> String {
    let rendered = load_document(file)
        .map_err(|e| e.to_string())
        .and_then(|doc| renderer.render(&doc).map_err(|e| e.to_string()));

    let html = rendered.unwrap_or_else(|message| {
        tracing::warn!("Preview failed: {}", message);
        error_page(&message)
    });
    inject_live_script(&html)
}

fn inject_live_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, LIVE_SCRIPT);
    match html.rfind("</body>") {
        Some(pos) => format!("{}{}\n{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}\n{}", html, tag),
    }
}

fn error_page(message: &str) -> String {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Preview error</title></head>
<body style="font-family: system-ui, sans-serif; padding: 2rem;">
  <h1>Preview error</h1>
  <pre>{}</pre>
</body>
</html>"#,
        escaped
    )
}

fn is_preview_file(state: &PreviewState, path: &Path) -> bool {
    path == state.file || path.file_name() == state.file.file_name()
}

async fn handle_watch_event(state: &PreviewState, event: WatchEvent) {
    match event {
        WatchEvent::DocumentChanged(path) if is_preview_file(state, &path) => {
            tracing::info!("Document changed: {}", path.display());

            let rendered = load_document(&state.file)
                .map_err(|e| e.to_string())
                .and_then(|doc| state.renderer.render(&doc).map_err(|e| e.to_string()));

            match rendered {
                Ok(html) => {
                    *state.page.write().await = inject_live_script(&html);
                    state.hub.send(LiveMessage::UpdateContent { html });
                }
                Err(message) => {
                    tracing::warn!("Preview failed: {}", message);
                    *state.page.write().await = inject_live_script(&error_page(&message));
                    state.hub.send(LiveMessage::Reload);
                }
            }
        }
        WatchEvent::Deleted(path) if is_preview_file(state, &path) => {
            tracing::warn!("Document deleted: {}", path.display());
        }
        _ => {}
    }
}

async fn index_handler(State(state): State<Arc<PreviewState>>) -> Html<String> {
    Html(state.page.read().await.clone())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<PreviewState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<PreviewState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &LiveMessage::Connected).await.is_err() {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &LiveMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!("Failed to encode live message: {}", e);
            Ok(())
        }
    }
}

async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        live_client_script(LIVE_SOCKET),
    )
}
