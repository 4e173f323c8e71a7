//! Outbound message dispatch routes.
//!
//! The mobile/web clients send camelCase JSON; these DTOs translate at the
//! boundary and the engine works in snake_case rows.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{EventKind, Job};
use roster_engine::resolver::RecipientResolver;
use roster_engine::template::TemplateService;

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send-message", post(send_message))
        .route("/api/send-message/{job_id}/cancel", post(cancel_dispatch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    job_id: Uuid,
    template_id: Option<Uuid>,
    custom_message: Option<String>,
    #[serde(default)]
    contact_ids: Vec<Uuid>,
}

/// POST /api/send-message — Render a template (or custom body) for a job and
/// queue it to the resolved recipients in timed batches.
async fn send_message(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let job: Job = sqlx::query_as("SELECT * FROM jobs WHERE id = $1 AND org_id = $2")
        .bind(req.job_id)
        .bind(auth.org_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", req.job_id)))?;

    let (body, event) = match (&req.template_id, &req.custom_message) {
        (Some(template_id), None) => {
            let template = TemplateService::get(&state.pool, auth.org_id, *template_id).await?;
            (template.body, event_for_template(&template.name))
        }
        (None, Some(custom)) => (custom.clone(), EventKind::Message),
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of templateId or customMessage".to_string(),
            ));
        }
    };

    let recipients = match event {
        EventKind::JobInvitation => {
            if req.contact_ids.is_empty() {
                return Err(AppError::Validation(
                    "contactIds is required for invitations".to_string(),
                ));
            }
            RecipientResolver::invitation_recipients(
                &state.pool,
                auth.org_id,
                job.id,
                &req.contact_ids,
            )
            .await?
        }
        _ => RecipientResolver::broadcast_recipients(&state.pool, auth.org_id, job.id).await?,
    };

    let total_queued = state
        .batcher
        .submit(auth.org_id, &job, event, &body, recipients)
        .await?;

    Ok(Json(json!({ "totalQueued": total_queued })))
}

/// POST /api/send-message/:job_id/cancel — Stop pending batches for a job.
/// Batches already sent are not retracted.
async fn cancel_dispatch(
    State(state): State<AppState>,
    auth: AuthAdmin,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM jobs WHERE id = $1 AND org_id = $2")
            .bind(job_id)
            .bind(auth.org_id)
            .fetch_optional(&state.pool)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let cancelled = state.batcher.cancel(job_id);
    Ok(Json(json!({ "cancelled": cancelled })))
}

/// Map a reserved template name to its event kind. Custom templates are
/// plain messages.
fn event_for_template(name: &str) -> EventKind {
    match name {
        "Job Invitation" => EventKind::JobInvitation,
        "Job Cancellation" => EventKind::JobCancellation,
        "Job Update" => EventKind::JobUpdate,
        _ => EventKind::Message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_for_reserved_templates() {
        assert_eq!(event_for_template("Job Invitation"), EventKind::JobInvitation);
        assert_eq!(
            event_for_template("Job Cancellation"),
            EventKind::JobCancellation
        );
        assert_eq!(event_for_template("Job Update"), EventKind::JobUpdate);
    }

    #[test]
    fn test_custom_template_is_plain_message() {
        assert_eq!(event_for_template("Weekly check-in"), EventKind::Message);
    }
}
