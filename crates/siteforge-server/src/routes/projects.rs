//! Project routes: editing, preview and publishing.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use siteforge_blocks::{is_valid_slug, slugify, Block, StyleSettings};
use siteforge_store::{NewProject, ProjectRecord, ProjectUpdate};

use crate::auth::Owner;
use crate::error::{ApiError, FieldError};
use crate::routes::parse_id;
use crate::state::AppState;

const MAX_TITLE: usize = 100;
const MAX_SEO_TITLE: usize = 60;
const MAX_SEO_DESCRIPTION: usize = 160;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[serde(default)]
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub template_id: Option<String>,
    pub content: Option<Vec<Block>>,
    pub styles: Option<StyleSettings>,
}

/// Listing view of a project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
    pub published_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ProjectRecord> for ProjectSummary {
    fn from(project: &ProjectRecord) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
            slug: project.slug.clone(),
            is_published: project.is_published,
            published_url: project.published_url.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: Result<Json<CreateProject>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = payload?;

    let title = body.title.trim().to_string();
    let slug = body.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut errors = Vec::new();
    check_title(&title, &mut errors);
    if let Some(slug) = slug {
        check_slug(slug, &mut errors);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let base = slug.map(str::to_string).unwrap_or_else(|| slugify(&title));
    let slug = unique_slug(&state, &base, |n| format!("{}-{}", base, n)).await?;

    let mut content = body.content.unwrap_or_default();
    let mut styles = body.styles.unwrap_or_default();
    if let Some(template) = body.template_id.as_deref().and_then(|id| state.catalog.get(id)) {
        content = template.content.clone();
        styles = template.styles.clone();
    }

    let project = state
        .db
        .create_project(NewProject {
            owner_id: owner,
            title,
            slug,
            description: body.description,
            content,
            styles,
            template_id: body.template_id,
            ..Default::default()
        })
        .await?;

    tracing::info!("Created project {} ({})", project.slug, project.id);
    Ok((StatusCode::CREATED, Json(json!({ "project": project }))))
}

pub async fn list(State(state): State<AppState>, Owner(owner): Owner) -> Result<Json<Value>, ApiError> {
    let projects: Vec<ProjectSummary> = state
        .db
        .list_projects(owner)
        .await?
        .iter()
        .map(ProjectSummary::from)
        .collect();

    Ok(Json(json!({ "projects": projects })))
}

pub async fn get(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project = find_project(&state, &id, owner).await?;
    Ok(Json(json!({ "project": project })))
}

pub async fn update(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    payload: Result<Json<ProjectUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Project")?;
    let Json(mut update) = payload?;

    let mut errors = Vec::new();
    if let Some(title) = update.title.as_mut() {
        *title = title.trim().to_string();
        check_title(title, &mut errors);
    }
    if let Some(slug) = update.slug.as_mut() {
        *slug = slug.trim().to_string();
        check_slug(slug, &mut errors);
    }
    if let Some(seo_title) = update.seo_title.as_mut() {
        *seo_title = seo_title.trim().to_string();
        if seo_title.chars().count() > MAX_SEO_TITLE {
            errors.push(FieldError::new(
                "seoTitle",
                format!("SEO title must be at most {} characters", MAX_SEO_TITLE),
            ));
        }
    }
    if let Some(seo_description) = update.seo_description.as_mut() {
        *seo_description = seo_description.trim().to_string();
        if seo_description.chars().count() > MAX_SEO_DESCRIPTION {
            errors.push(FieldError::new(
                "seoDescription",
                format!("SEO description must be at most {} characters", MAX_SEO_DESCRIPTION),
            ));
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let project = state
        .db
        .update_project(id, owner, update)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    Ok(Json(json!({ "project": project })))
}

pub async fn delete(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id, "Project")?;
    if !state.db.delete_project(id, owner).await? {
        return Err(ApiError::NotFound("Project"));
    }

    tracing::info!("Deleted project {}", id);
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

pub async fn duplicate(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let original = find_project(&state, &id, owner).await?;

    let base = format!("{}-copy", original.slug);
    let slug = unique_slug(&state, &base, |n| format!("{}-copy-{}", original.slug, n)).await?;

    let copy = state
        .db
        .create_project(NewProject {
            owner_id: owner,
            title: format!("{} - Copy", original.title),
            slug,
            description: original.description,
            content: original.content,
            styles: original.styles,
            seo_title: original.seo_title,
            seo_description: original.seo_description,
            favicon: original.favicon,
            custom_css: original.custom_css,
            template_id: original.template_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "project": ProjectSummary::from(&copy) })),
    ))
}

/// The page as it would be published right now.
pub async fn preview(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let project = find_project(&state, &id, owner).await?;
    let html = state.renderer.render(&project.to_document())?;
    Ok(Html(html))
}

pub async fn publish(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project = find_project(&state, &id, owner).await?;
    let job = state.queue.publish_site(project.id, owner).await?;

    Ok(Json(json!({
        "success": true,
        "jobId": job.id,
        "message": "Publishing started",
    })))
}

pub async fn job_status(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job_id = parse_id(&job_id, "Job")?;
    let job = state
        .db
        .get_job_for_owner(job_id, owner)
        .await?
        .ok_or(ApiError::NotFound("Job"))?;

    let published_url = job
        .result
        .as_ref()
        .and_then(|result| result.get("publishedUrl"))
        .cloned()
        .unwrap_or(Value::Null);

    Ok(Json(json!({
        "status": job.status,
        "result": job.result,
        "error": job.error,
        "attempts": job.attempts,
        "publishedUrl": published_url,
    })))
}

async fn find_project(state: &AppState, id: &str, owner: Uuid) -> Result<ProjectRecord, ApiError> {
    let id = parse_id(id, "Project")?;
    state
        .db
        .get_project(id, owner)
        .await?
        .ok_or(ApiError::NotFound("Project"))
}

/// `base` if free, otherwise the first free `candidate(1)`, `candidate(2)`, ...
async fn unique_slug(
    state: &AppState,
    base: &str,
    candidate: impl Fn(u32) -> String,
) -> Result<String, ApiError> {
    let mut slug = base.to_string();
    let mut counter = 1;
    while state.db.slug_exists(&slug).await? {
        slug = candidate(counter);
        counter += 1;
    }
    Ok(slug)
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE {
        errors.push(FieldError::new(
            "title",
            format!("Title is required and must be at most {} characters", MAX_TITLE),
        ));
    }
}

fn check_slug(slug: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_slug(slug) {
        errors.push(FieldError::new(
            "slug",
            "Slug must contain only lowercase letters, numbers, and hyphens",
        ));
    }
}
