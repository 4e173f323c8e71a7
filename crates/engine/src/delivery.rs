//! Delivery tracker — correlates push send attempts with client callbacks.
//!
//! Every push attempt gets a `notification_records` row keyed by its generated
//! notification id. The mobile apps call back with "delivered" when the OS
//! hands them the notification, and "action" when the user taps Accept or
//! Decline on the notification itself.

use sqlx::PgPool;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{Availability, AvailabilityStatus};
use roster_channels::gateway::PushCorrelation;

pub struct DeliveryTracker;

impl DeliveryTracker {
    /// Persist correlations for a batch of push send attempts.
    pub async fn record_attempts(
        pool: &PgPool,
        job_id: Option<Uuid>,
        correlations: &[PushCorrelation],
    ) -> Result<(), AppError> {
        for correlation in correlations {
            sqlx::query(
                r#"
                INSERT INTO notification_records (id, contact_id, job_id, token)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(correlation.notification_id)
            .bind(correlation.contact_id)
            .bind(job_id)
            .bind(&correlation.token)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Mark a push as received by the device. Best-effort and idempotent:
    /// an unknown id is not an error, the client fires and forgets.
    pub async fn mark_delivered(pool: &PgPool, notification_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notification_records
            SET delivered_at = COALESCE(delivered_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(notification_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record an Accept/Decline triggered from a notification action button
    /// and apply it to the contact's availability for the job.
    ///
    /// Action identifiers are matched case-insensitively: iOS registers
    /// lowercase ones, Android uppercase. `maybe` is registered client-side
    /// but not supported here; it arrives only through the regular
    /// availability endpoint.
    ///
    /// The notification must belong to the calling contact and to the job
    /// named in the request.
    pub async fn record_action(
        pool: &PgPool,
        contact_id: Uuid,
        notification_id: Uuid,
        action: &str,
        job_id: Uuid,
    ) -> Result<Availability, AppError> {
        let status = match action.to_ascii_lowercase().as_str() {
            "accept" => AvailabilityStatus::Confirmed,
            "decline" => AvailabilityStatus::Declined,
            _ => {
                return Err(AppError::Validation(format!(
                    "Unsupported notification action '{}'",
                    action
                )));
            }
        };

        let record: Option<(Option<Uuid>,)> = sqlx::query_as(
            "SELECT job_id FROM notification_records WHERE id = $1 AND contact_id = $2",
        )
        .bind(notification_id)
        .bind(contact_id)
        .fetch_optional(pool)
        .await?;

        let (record_job_id,) = record.ok_or_else(|| {
            AppError::NotFound(format!("Notification {} not found", notification_id))
        })?;

        if record_job_id != Some(job_id) {
            return Err(AppError::Validation(format!(
                "Notification {} does not belong to job {}",
                notification_id, job_id
            )));
        }

        sqlx::query("UPDATE notification_records SET action = $1 WHERE id = $2")
            .bind(action)
            .bind(notification_id)
            .execute(pool)
            .await?;

        let availability: Availability = sqlx::query_as(
            r#"
            INSERT INTO availability (id, job_id, contact_id, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id, contact_id) DO UPDATE
            SET status = $4, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(contact_id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            notification_id = %notification_id,
            contact_id = %contact_id,
            job_id = %job_id,
            status = %status,
            "Availability set from notification action"
        );

        Ok(availability)
    }
}
