//! Job lookup route.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::Job;

use crate::middleware::auth::Principal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/jobs/{id}", get(get_job))
}

/// GET /api/jobs/:id — Fetch a job, scoped to the caller's organization.
/// Contacts see the job details a push deep-links to.
async fn get_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job: Job = sqlx::query_as("SELECT * FROM jobs WHERE id = $1 AND org_id = $2")
        .bind(id)
        .bind(principal.org_id())
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(job))
}
