//! Push notification callback routes.
//!
//! The mobile apps echo back the notification id generated at send time: once
//! when the OS delivers the notification, and once if the user taps an action
//! button on it.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::Availability;
use roster_engine::delivery::DeliveryTracker;

use crate::middleware::auth::AuthContact;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/contact/push-notification/delivered",
            post(mark_delivered),
        )
        .route("/api/contact/push-notification/action", post(record_action))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveredRequest {
    notification_id: Uuid,
}

/// POST /api/contact/push-notification/delivered — Record that the device
/// received the push. Fire-and-forget on the client; unknown ids are not an
/// error.
async fn mark_delivered(
    State(state): State<AppState>,
    _auth: AuthContact,
    Json(req): Json<DeliveredRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = DeliveryTracker::mark_delivered(&state.pool, req.notification_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest {
    notification_id: Uuid,
    action: String,
    job_id: Uuid,
}

/// POST /api/contact/push-notification/action — Apply an Accept/Decline tap
/// from the notification to the contact's availability for the job. The
/// notification must have been sent to the calling contact.
async fn record_action(
    State(state): State<AppState>,
    auth: AuthContact,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Availability>, AppError> {
    let availability = DeliveryTracker::record_action(
        &state.pool,
        auth.contact_id,
        req.notification_id,
        &req.action,
        req.job_id,
    )
    .await?;
    Ok(Json(availability))
}
