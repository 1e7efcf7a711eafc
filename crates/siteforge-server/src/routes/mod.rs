//! REST API routes.

pub mod domains;
pub mod hosting;
pub mod projects;
pub mod templates;

use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use siteforge_blocks::BlockKind;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the API router. Unmatched requests fall through to site hosting.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/blocks", get(block_palette))
        .route("/api/templates", get(templates::list))
        .route("/api/templates/categories", get(templates::categories))
        .route("/api/templates/{id}", get(templates::get))
        .route("/api/projects", get(projects::list).post(projects::create))
        .route("/api/projects/jobs/{job_id}/status", get(projects::job_status))
        .route(
            "/api/projects/{id}",
            get(projects::get).put(projects::update).delete(projects::delete),
        )
        .route("/api/projects/{id}/duplicate", post(projects::duplicate))
        .route("/api/projects/{id}/preview", get(projects::preview))
        .route("/api/projects/{id}/publish", post(projects::publish))
        .route("/api/domains", get(domains::list).post(domains::add))
        .route("/api/domains/{id}", axum::routing::delete(domains::delete))
        .route("/api/domains/{id}/status", get(domains::status))
        .fallback(hosting::serve_site)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Every block kind with the properties a new block starts with.
async fn block_palette() -> Json<Value> {
    let blocks: Vec<Value> = BlockKind::ALL
        .iter()
        .map(|kind| json!({ "type": kind.name(), "defaultProps": kind.default_props() }))
        .collect();

    Json(json!({ "blocks": blocks }))
}

/// Ids that do not parse can never match a record.
pub(crate) fn parse_id(raw: &str, what: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(what))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use siteforge_blocks::TemplateCatalog;
    use siteforge_jobs::{
        DomainVerifier, JobError, JobOptions, JobQueue, ManagedCertificates, Publisher, SiteStorage,
        TxtResolver,
    };
    use siteforge_render::SiteRenderer;
    use siteforge_store::{Database, JobKind};

    use crate::auth::OWNER_HEADER;
    use crate::state::AppState;

    struct NoRecords;

    #[async_trait]
    impl TxtResolver for NoRecords {
        async fn txt_records(&self, _name: &str) -> Result<Vec<String>, JobError> {
            Ok(Vec::new())
        }
    }

    /// App state over an in-memory database and store. Publishing runs
    /// immediately; verification is queued far in the future.
    pub async fn state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        let storage = SiteStorage::in_memory();

        let publisher = Arc::new(Publisher::new(
            db.clone(),
            storage.clone(),
            SiteRenderer::default(),
            "sites.test",
        ));
        let verifier = Arc::new(DomainVerifier::new(
            db.clone(),
            Arc::new(NoRecords),
            Arc::new(ManagedCertificates::new(Duration::ZERO)),
            Duration::ZERO,
        ));
        let verify = JobOptions {
            initial_delay: Duration::from_secs(3600),
            ..JobOptions::verify()
        };

        let queue = JobQueue::builder(db)
            .handler(JobKind::PublishSite, publisher, JobOptions::publish())
            .handler(JobKind::VerifyDomain, verifier, verify)
            .build();

        AppState::new(
            queue,
            TemplateCatalog::builtin(),
            SiteRenderer::default(),
            storage,
            "sites.test",
        )
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        owner: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            request = request.header(OWNER_HEADER, owner.to_string());
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Send a request and parse the JSON response.
    pub async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        owner: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, text) = send(app, method, uri, owner, body).await;
        (status, serde_json::from_str(&text).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{call, state};
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(state().await);

        let (status, body) = call(&app, "GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn lists_block_palette() {
        let app = router(state().await);

        let (status, body) = call(&app, "GET", "/api/blocks", None, None).await;

        assert_eq!(status, StatusCode::OK);
        let blocks = body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), BlockKind::ALL.len());
        assert_eq!(blocks[0]["type"], "hero");
        assert_eq!(blocks[0]["defaultProps"]["buttonText"], "Get Started");
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404() {
        let app = router(state().await);

        let (status, body) = call(&app, "GET", "/api/nothing-here", None, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }
}
