//! Availability mutation route.

use axum::extract::{Path, State};
use axum::routing::patch;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{Availability, AvailabilityStatus};

use crate::middleware::auth::Principal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/contact/availability/{id}", patch(update_availability))
}

#[derive(Debug, Deserialize)]
struct UpdateAvailabilityRequest {
    status: AvailabilityStatus,
}

/// PATCH /api/contact/availability/:id — Set the response status on an
/// availability row. A contact may only touch their own row; an admin may
/// override any row in their organization.
async fn update_availability(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Availability>, AppError> {
    let existing: Availability = sqlx::query_as(
        r#"
        SELECT a.* FROM availability a
        JOIN jobs j ON j.id = a.job_id
        WHERE a.id = $1 AND j.org_id = $2
        "#,
    )
    .bind(id)
    .bind(principal.org_id())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Availability {} not found", id)))?;

    if let Principal::Contact(contact) = &principal
        && contact.contact_id != existing.contact_id
    {
        return Err(AppError::Auth(
            "Cannot modify another contact's availability".to_string(),
        ));
    }

    let updated: Availability = sqlx::query_as(
        "UPDATE availability SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(req.status)
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(
        availability_id = %id,
        job_id = %updated.job_id,
        status = %updated.status,
        "Availability updated"
    );

    Ok(Json(updated))
}
