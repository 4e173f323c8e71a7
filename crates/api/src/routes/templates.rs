//! Template CRUD routes.

use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::MessageTemplate;
use roster_engine::template::{CreateTemplateParams, TemplateService, UpdateTemplateParams};

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/templates", get(list_templates))
        .route("/api/templates", post(create_template))
        .route("/api/templates/{id}", patch(update_template))
        .route("/api/templates/{id}", delete(delete_template))
}

/// GET /api/templates — List all templates for the organization.
async fn list_templates(
    State(state): State<AppState>,
    auth: AuthAdmin,
) -> Result<Json<Vec<MessageTemplate>>, AppError> {
    let templates = TemplateService::list(&state.pool, auth.org_id).await?;
    Ok(Json(templates))
}

/// POST /api/templates — Create a custom template.
async fn create_template(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(params): Json<CreateTemplateParams>,
) -> Result<Json<MessageTemplate>, AppError> {
    let template = TemplateService::create(&state.pool, auth.org_id, &params).await?;
    Ok(Json(template))
}

/// PATCH /api/templates/:id — Update a template. Reserved templates may
/// change body but not name.
async fn update_template(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateTemplateParams>,
) -> Result<Json<MessageTemplate>, AppError> {
    let template = TemplateService::update(&state.pool, auth.org_id, id, &params).await?;
    Ok(Json(template))
}

/// DELETE /api/templates/:id — Delete a custom template.
async fn delete_template(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = TemplateService::delete(&state.pool, auth.org_id, id).await?;
    if deleted {
        Ok(Json(serde_json::json!({"deleted": true})))
    } else {
        Err(AppError::NotFound(format!("Template {} not found", id)))
    }
}
