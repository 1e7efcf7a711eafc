//! Template catalog routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use siteforge_blocks::TemplateFilter;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, Query(filter): Query<TemplateFilter>) -> Json<Value> {
    Json(json!({ "templates": state.catalog.list(&filter) }))
}

pub async fn categories(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "categories": state.catalog.categories() }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let template = state.catalog.get(&id).ok_or(ApiError::NotFound("Template"))?;
    Ok(Json(json!({ "template": template })))
}
