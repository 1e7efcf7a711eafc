//! Public hosting of published sites.
//!
//! Requests that match no API route are served by host name: a
//! `<slug>.<publish domain>` host serves that project's latest deployment, and
//! any other host is looked up as a verified custom domain.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;

use siteforge_jobs::publish::index_key;

use crate::error::ApiError;
use crate::state::AppState;

/// `host` without a trailing `:<port>`.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// The request host without port, lowercased.
fn request_host(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    Some(strip_port(host).trim_end_matches('.').to_lowercase())
}

/// Slug of a `<slug>.<publish_domain>` host. A port on the publish domain
/// is ignored, since the request host has had its port removed.
fn published_slug<'a>(host: &'a str, publish_domain: &str) -> Option<&'a str> {
    let slug = host.strip_suffix(strip_port(publish_domain))?.strip_suffix('.')?;
    (!slug.is_empty() && !slug.contains('.')).then_some(slug)
}

pub async fn serve_site(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let is_page = matches!(uri.path(), "/" | "/index.html");
    if !is_page || !(method == Method::GET || method == Method::HEAD) {
        return Ok(route_not_found());
    }
    let Some(host) = request_host(&headers) else {
        return Ok(route_not_found());
    };

    let deployment = match published_slug(&host, &state.publish_domain) {
        Some(slug) => state.db.deployment_for_slug(slug).await?,
        None => state.db.deployment_for_domain(&host).await?,
    };
    let Some(path) = deployment else {
        return Ok(route_not_found());
    };

    match state.storage.get_html(&index_key(&path)).await? {
        Some(html) => Ok(Html(html).into_response()),
        None => {
            tracing::warn!("Deployment {} for {} is missing from storage", path, host);
            Ok(route_not_found())
        }
    }
}

fn route_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" }))).into_response()
}
