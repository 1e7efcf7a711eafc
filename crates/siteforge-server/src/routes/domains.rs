//! Custom domain routes.

use std::sync::LazyLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use siteforge_jobs::required_records;
use siteforge_store::{DomainRecord, DomainStatus, NewDomain, SslStatus};

use crate::auth::Owner;
use crate::error::{ApiError, FieldError};
use crate::routes::parse_id;
use crate::state::AppState;

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDomain {
    #[serde(default)]
    pub domain: String,
    pub project_id: Option<Uuid>,
}

/// Listing view of a domain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub id: Uuid,
    pub domain: String,
    pub status: DomainStatus,
    pub ssl_status: Option<SslStatus>,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DomainRecord> for DomainSummary {
    fn from(domain: &DomainRecord) -> Self {
        Self {
            id: domain.id,
            domain: domain.domain.clone(),
            status: domain.status,
            ssl_status: domain.ssl_status,
            project_id: domain.project_id,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

/// Strip a scheme and one trailing slash, and lowercase.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme
        .strip_suffix('/')
        .unwrap_or(without_scheme)
        .to_lowercase()
}

/// A fully qualified host name with an alphabetic top-level label.
pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };

    labels.len() >= 2
        && labels.iter().all(|label| LABEL.is_match(label))
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

pub async fn add(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: Result<Json<AddDomain>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;

    let domain = normalize_domain(&body.domain);
    if !is_valid_hostname(&domain) {
        return Err(ApiError::Validation(vec![FieldError::new(
            "domain",
            "Invalid domain format",
        )]));
    }

    if let Some(project_id) = body.project_id {
        if state.db.get_project(project_id, owner).await?.is_none() {
            return Err(ApiError::NotFound("Project"));
        }
    }

    if state.db.find_domain(&domain).await?.is_some() {
        return Err(ApiError::Conflict("Domain already exists".to_string()));
    }

    let token = Uuid::new_v4().to_string();
    let record = state
        .db
        .create_domain(NewDomain {
            owner_id: owner,
            project_id: body.project_id,
            dns_records: required_records(&domain, &token, &state.publish_domain),
            domain,
            verification_token: token,
        })
        .await?;

    state.queue.verify_domain(record.id, owner).await?;
    tracing::info!("Added domain {} ({})", record.domain, record.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "domain": {
                "id": record.id,
                "domain": record.domain,
                "status": record.status,
                "verificationToken": record.verification_token,
                "dnsRecords": record.dns_records,
            }
        })),
    ))
}

pub async fn list(State(state): State<AppState>, Owner(owner): Owner) -> Result<Json<Value>, ApiError> {
    let domains: Vec<DomainSummary> = state
        .db
        .list_domains(owner)
        .await?
        .iter()
        .map(DomainSummary::from)
        .collect();

    Ok(Json(json!({ "domains": domains })))
}

pub async fn status(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Domain")?;
    let domain = state
        .db
        .get_domain(id, owner)
        .await?
        .ok_or(ApiError::NotFound("Domain"))?;

    Ok(Json(json!({ "domain": domain })))
}

pub async fn delete(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Domain")?;
    if !state.db.delete_domain(id, owner).await? {
        return Err(ApiError::NotFound("Domain"));
    }

    tracing::info!("Deleted domain {}", id);
    Ok(Json(json!({ "message": "Domain deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use crate::routes::test_support::{call, state};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_input() {
        assert_eq!(normalize_domain("https://Example.com/"), "example.com");
        assert_eq!(normalize_domain(" http://shop.example.org "), "shop.example.org");
        assert_eq!(normalize_domain("example.com"), "example.com");
    }

    #[test]
    fn validates_hostnames() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("my-site.co.uk"));
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("-bad.com"));
        assert!(!is_valid_hostname("example.com/path"));
        assert!(!is_valid_hostname("example..com"));
        assert!(!is_valid_hostname("example.c0m"));
    }

    #[tokio::test]
    async fn adds_domain_with_dns_instructions() {
        let state = state().await;
        let app = router(state.clone());
        let owner = Uuid::new_v4();

        let (status, body) = call(
            &app,
            "POST",
            "/api/domains",
            Some(owner),
            Some(json!({ "domain": "https://www.bellavista.com/" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let domain = &body["domain"];
        assert_eq!(domain["domain"], "www.bellavista.com");
        assert_eq!(domain["status"], "PENDING");

        let token = domain["verificationToken"].as_str().unwrap();
        assert_eq!(
            domain["dnsRecords"],
            json!([
                { "type": "TXT", "name": "_site-verification.www.bellavista.com", "value": token, "ttl": 300 },
                { "type": "CNAME", "name": "www.bellavista.com", "value": "sites.test", "ttl": 300 },
            ])
        );

        let id: Uuid = domain["id"].as_str().unwrap().parse().unwrap();
        let stored = state.db.get_domain(id, owner).await.unwrap().unwrap();
        assert_eq!(stored.status, DomainStatus::Pending);
        assert_eq!(stored.verification_token, token);
    }

    #[tokio::test]
    async fn rejects_duplicates_and_bad_names() {
        let app = router(state().await);
        let owner = Some(Uuid::new_v4());

        let (status, _) = call(&app, "POST", "/api/domains", owner, Some(json!({ "domain": "taken.com" }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app,
            "POST",
            "/api/domains",
            Some(Uuid::new_v4()),
            Some(json!({ "domain": "http://taken.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Domain already exists");

        let (status, body) = call(&app, "POST", "/api/domains", owner, Some(json!({ "domain": "not a domain" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["message"], "Invalid domain format");
    }

    #[tokio::test]
    async fn lists_reports_and_deletes() {
        let app = router(state().await);
        let owner = Some(Uuid::new_v4());

        let (_, added) = call(&app, "POST", "/api/domains", owner, Some(json!({ "domain": "first.com" }))).await;
        call(&app, "POST", "/api/domains", owner, Some(json!({ "domain": "second.com" }))).await;
        let id = added["domain"]["id"].as_str().unwrap();

        let (_, listed) = call(&app, "GET", "/api/domains", owner, None).await;
        let names: Vec<&str> = listed["domains"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["domain"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"first.com"));
        assert!(listed["domains"][0].get("verificationToken").is_none());

        let status_uri = format!("/api/domains/{}/status", id);
        let (status, body) = call(&app, "GET", &status_uri, owner, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["domain"]["domain"], "first.com");
        assert!(body["domain"]["verificationToken"].is_string());

        let (status, _) = call(&app, "GET", &status_uri, Some(Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/domains/{}", id);
        let (status, body) = call(&app, "DELETE", &uri, owner, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Domain deleted successfully");
        let (status, _) = call(&app, "DELETE", &uri, owner, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn project_must_belong_to_owner() {
        let app = router(state().await);

        let (status, body) = call(
            &app,
            "POST",
            "/api/domains",
            Some(Uuid::new_v4()),
            Some(json!({ "domain": "orphan.com", "projectId": Uuid::new_v4() })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project not found");
    }
}
