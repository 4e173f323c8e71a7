//! Contact listing and device token registration routes.

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_channels::token;
use roster_common::error::AppError;
use roster_common::types::{Contact, Platform};

use crate::middleware::auth::{AuthAdmin, AuthContact};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(list_contacts))
        .route("/api/contact/device-token", post(register_device_token))
        .route("/api/contact/device-token", delete(remove_device_token))
}

/// GET /api/contacts — List all contacts for the admin's organization.
async fn list_contacts(
    State(state): State<AppState>,
    auth: AuthAdmin,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts: Vec<Contact> = sqlx::query_as(
        "SELECT * FROM contacts WHERE org_id = $1 ORDER BY last_name ASC, first_name ASC",
    )
    .bind(auth.org_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(contacts))
}

#[derive(Debug, Deserialize)]
struct RegisterTokenRequest {
    token: String,
    platform: Platform,
}

/// POST /api/contact/device-token — Register a push token for the
/// authenticated contact. Malformed tokens are rejected before storage.
async fn register_device_token(
    State(state): State<AppState>,
    auth: AuthContact,
    Json(req): Json<RegisterTokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !token::is_valid(req.platform, &req.token) {
        return Err(AppError::Validation(format!(
            "Token does not match the {} format",
            req.platform
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO device_tokens (id, contact_id, token, platform)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (contact_id, token) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.contact_id)
    .bind(&req.token)
    .bind(req.platform.to_string())
    .execute(&state.pool)
    .await?;

    tracing::info!(
        contact_id = %auth.contact_id,
        platform = %req.platform,
        "Device token registered"
    );

    Ok(Json(json!({ "registered": true })))
}

#[derive(Debug, Deserialize)]
struct RemoveTokenRequest {
    token: String,
}

/// DELETE /api/contact/device-token — Remove a token (app logout or
/// platform-reported invalidation).
async fn remove_device_token(
    State(state): State<AppState>,
    auth: AuthContact,
    Json(req): Json<RemoveTokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query("DELETE FROM device_tokens WHERE contact_id = $1 AND token = $2")
        .bind(auth.contact_id)
        .bind(&req.token)
        .execute(&state.pool)
        .await?;

    Ok(Json(json!({ "removed": result.rows_affected() > 0 })))
}
