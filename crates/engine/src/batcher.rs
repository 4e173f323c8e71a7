//! Dispatch batcher — timed fan-out of a rendered broadcast.
//!
//! A submitted dispatch is split into fixed-size batches. Batch 0 is sent
//! before `submit` returns; the rest are driven by a spawned task on a fixed
//! interval until the list is exhausted, the organization runs out of
//! credits, the job's headcount fills up, or the dispatch is cancelled.
//!
//! Cancellation is checked only at batch boundaries — in-flight sends for an
//! already-fired batch run to completion and are never retracted. A Redis
//! `SET NX EX` guard (one key per job) prevents double submission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::sync::watch;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{
    DeliveryStatus, DeviceToken, EventKind, Job, MessageDirection, Recipient,
};
use roster_channels::gateway::NotificationGateway;

use crate::delivery::DeliveryTracker;
use crate::ledger::CreditLedger;
use crate::template;

/// Extra guard TTL beyond the scheduled dispatch span, in seconds.
const GUARD_TTL_SLACK_SECS: u64 = 300;

/// Lifecycle of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Scheduled,
    Sending,
    Done,
    Cancelled,
}

/// Result of sending one batch.
#[derive(Debug, PartialEq, Eq)]
enum BatchRun {
    Completed,
    CreditsExhausted,
}

struct DispatchHandle {
    cancel: watch::Sender<bool>,
}

/// Split a recipient list into batches of at most `batch_size`.
///
/// Produces `ceil(n / batch_size)` batches covering every item exactly once.
pub fn partition<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Push notification title for an event kind.
pub fn push_title(event: EventKind, job_name: &str) -> String {
    match event {
        EventKind::JobInvitation => format!("New invitation: {}", job_name),
        EventKind::JobUpdate => format!("Updated: {}", job_name),
        EventKind::JobCancellation => format!("Cancelled: {}", job_name),
        EventKind::Message => job_name.to_string(),
    }
}

pub struct DispatchBatcher {
    pool: PgPool,
    redis: ConnectionManager,
    gateway: Arc<NotificationGateway>,
    batch_size: usize,
    interval: Duration,
    active: Arc<Mutex<HashMap<Uuid, DispatchHandle>>>,
}

impl DispatchBatcher {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        gateway: Arc<NotificationGateway>,
        batch_size: usize,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            redis,
            gateway,
            batch_size,
            interval,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a dispatch: send the first batch now, schedule the rest.
    ///
    /// Returns the total number of recipients queued.
    pub async fn submit(
        &self,
        org_id: Uuid,
        job: &Job,
        event: EventKind,
        body: &str,
        recipients: Vec<Recipient>,
    ) -> Result<u32, AppError> {
        if body.trim().is_empty() {
            return Err(AppError::Validation("Message body cannot be empty".to_string()));
        }
        if recipients.is_empty() {
            return Err(AppError::Validation("Recipient list is empty".to_string()));
        }
        if CreditLedger::balance(&self.pool, org_id).await? == 0 {
            return Err(AppError::CreditsExhausted(
                "Organization has no send credits remaining".to_string(),
            ));
        }

        let batches = partition(&recipients, self.batch_size);
        let total = recipients.len() as u32;

        self.acquire_guard(job.id, batches.len() as u64).await?;

        tracing::info!(
            job_id = %job.id,
            event = %event,
            recipients = total,
            batches = batches.len(),
            "Dispatch submitted"
        );

        let mut iter = batches.into_iter();
        // Batch 0 goes out before submit returns. The guard is held by now,
        // so an error must release it before propagating.
        let first = iter.next().unwrap_or_default();
        let first_run = match Self::send_batch(
            &self.pool,
            &self.gateway,
            org_id,
            job,
            event,
            body,
            &first,
        )
        .await
        {
            Ok(run) => run,
            Err(e) => {
                self.release_guard(job.id).await;
                return Err(e);
            }
        };

        let remaining: Vec<Vec<Recipient>> = iter.collect();

        if remaining.is_empty() || first_run == BatchRun::CreditsExhausted {
            if first_run == BatchRun::CreditsExhausted {
                tracing::warn!(job_id = %job.id, "Credits exhausted during first batch");
            }
            self.release_guard(job.id).await;
            return Ok(total);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.active
            .lock()
            .map_err(|_| AppError::Internal("Dispatch registry poisoned".to_string()))?
            .insert(job.id, DispatchHandle { cancel: cancel_tx });

        let pool = self.pool.clone();
        let redis = self.redis.clone();
        let gateway = Arc::clone(&self.gateway);
        let active = Arc::clone(&self.active);
        let interval = self.interval;
        let job = job.clone();
        let body = body.to_string();

        tokio::spawn(async move {
            let state = Self::run_scheduled_batches(
                &pool, &gateway, org_id, &job, event, &body, remaining, interval, cancel_rx,
            )
            .await;

            tracing::info!(job_id = %job.id, state = ?state, "Dispatch finished");

            if let Ok(mut map) = active.lock() {
                map.remove(&job.id);
            }
            let mut redis = redis;
            let key = Self::guard_key(job.id);
            if let Err(e) = redis::cmd("DEL").arg(&key).query_async::<()>(&mut redis).await {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to release dispatch guard");
            }
        });

        Ok(total)
    }

    /// Cancel pending batches for a job. Returns `true` if a dispatch with
    /// scheduled batches was active. Already-sent batches are not retracted.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let map = match self.active.lock() {
            Ok(map) => map,
            Err(_) => return false,
        };
        match map.get(&job_id) {
            Some(handle) => {
                tracing::info!(job_id = %job_id, "Dispatch cancellation requested");
                handle.cancel.send(true).is_ok()
            }
            None => false,
        }
    }

    /// Drive the remaining batches on the fixed interval.
    #[allow(clippy::too_many_arguments)]
    async fn run_scheduled_batches(
        pool: &PgPool,
        gateway: &Arc<NotificationGateway>,
        org_id: Uuid,
        job: &Job,
        event: EventKind,
        body: &str,
        batches: Vec<Vec<Recipient>>,
        interval: Duration,
        cancel: watch::Receiver<bool>,
    ) -> DispatchState {
        for (index, batch) in batches.into_iter().enumerate() {
            tracing::debug!(
                job_id = %job.id,
                batch = index + 1,
                state = ?DispatchState::Scheduled,
                "Waiting for next dispatch tick"
            );
            tokio::time::sleep(interval).await;

            // Cancellation is observed only here, never mid-batch.
            if *cancel.borrow() {
                return DispatchState::Cancelled;
            }

            match Self::headcount_filled(pool, job).await {
                Ok(true) => {
                    tracing::info!(
                        job_id = %job.id,
                        "Required headcount filled — skipping remaining batches"
                    );
                    return DispatchState::Done;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Headcount check failed");
                }
            }

            tracing::debug!(
                job_id = %job.id,
                batch = index + 1,
                state = ?DispatchState::Sending,
                "Sending batch"
            );
            match Self::send_batch(pool, gateway, org_id, job, event, body, &batch).await {
                Ok(BatchRun::Completed) => {
                    tracing::debug!(job_id = %job.id, batch = index + 1, "Batch sent");
                }
                Ok(BatchRun::CreditsExhausted) => {
                    tracing::warn!(
                        job_id = %job.id,
                        batch = index + 1,
                        "Credits exhausted — halting dispatch"
                    );
                    return DispatchState::Done;
                }
                Err(e) => {
                    tracing::error!(job_id = %job.id, batch = index + 1, error = %e, "Batch failed");
                }
            }
        }

        DispatchState::Done
    }

    /// Send one batch: per recipient, debit a credit, render, log the
    /// message, attempt SMS and push, record the outcome.
    ///
    /// Individual send failures are logged and reflected on the message row,
    /// never propagated. No per-recipient retry.
    #[allow(clippy::too_many_arguments)]
    async fn send_batch(
        pool: &PgPool,
        gateway: &Arc<NotificationGateway>,
        org_id: Uuid,
        job: &Job,
        event: EventKind,
        body: &str,
        batch: &[Recipient],
    ) -> Result<BatchRun, AppError> {
        let title = push_title(event, &job.name);

        for recipient in batch {
            if !CreditLedger::try_debit(pool, org_id).await? {
                return Ok(BatchRun::CreditsExhausted);
            }

            let contact = &recipient.contact;
            let rendered = template::render(body, contact, job);

            let message_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO messages (id, org_id, job_id, contact_id, direction, content, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(message_id)
            .bind(org_id)
            .bind(job.id)
            .bind(contact.id)
            .bind(MessageDirection::Outbound.to_string())
            .bind(&rendered)
            .bind(DeliveryStatus::Pending.to_string())
            .execute(pool)
            .await?;

            let mut sms_sent = false;
            if let Some(phone) = &contact.phone
                && !contact.opted_out
                && gateway.sms_enabled()
            {
                match gateway.send_sms(phone, &rendered).await {
                    Ok(()) => sms_sent = true,
                    Err(e) => {
                        tracing::warn!(contact_id = %contact.id, error = %e, "SMS send failed");
                    }
                }
            }

            let devices: Vec<DeviceToken> =
                sqlx::query_as("SELECT * FROM device_tokens WHERE contact_id = $1")
                    .bind(contact.id)
                    .fetch_all(pool)
                    .await?;

            let mut push_sent = false;
            if !devices.is_empty() {
                let outcome = gateway
                    .fan_out(devices, &title, &rendered, event, Some(job.id))
                    .await;

                push_sent = outcome.sent.contains(&contact.id);
                if !outcome.invalid_tokens.is_empty() {
                    tracing::warn!(
                        contact_id = %contact.id,
                        count = outcome.invalid_tokens.len(),
                        "Invalid device tokens flagged for cleanup"
                    );
                }
                DeliveryTracker::record_attempts(pool, Some(job.id), &outcome.correlations)
                    .await?;
            }

            let status = if sms_sent || push_sent {
                DeliveryStatus::Sent
            } else {
                DeliveryStatus::Failed
            };
            sqlx::query("UPDATE messages SET status = $1 WHERE id = $2")
                .bind(status.to_string())
                .bind(message_id)
                .execute(pool)
                .await?;
        }

        Ok(BatchRun::Completed)
    }

    /// Whether confirmed responses already cover the job's required headcount.
    async fn headcount_filled(pool: &PgPool, job: &Job) -> Result<bool, AppError> {
        if job.required_headcount <= 0 {
            return Ok(false);
        }

        let (confirmed,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM availability WHERE job_id = $1 AND status = 'confirmed'",
        )
        .bind(job.id)
        .fetch_one(pool)
        .await?;

        Ok(confirmed >= job.required_headcount as i64)
    }

    fn guard_key(job_id: Uuid) -> String {
        format!("dispatch:job:{}", job_id)
    }

    /// Take the per-job dispatch guard. `SET NX EX` makes the check-and-set
    /// atomic; the TTL covers the full scheduled span plus slack so a crashed
    /// dispatch cannot wedge the job forever.
    async fn acquire_guard(&self, job_id: Uuid, batches: u64) -> Result<(), AppError> {
        let ttl = self.interval.as_secs() * batches + GUARD_TTL_SLACK_SECS;
        let mut redis = self.redis.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(Self::guard_key(job_id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl)
            .query_async(&mut redis)
            .await?;

        if result.is_some() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "A dispatch for job {} is already in progress",
                job_id
            )))
        }
    }

    async fn release_guard(&self, job_id: Uuid) {
        let mut redis = self.redis.clone();
        if let Err(e) = redis::cmd("DEL")
            .arg(Self::guard_key(job_id))
            .query_async::<()>(&mut redis)
            .await
        {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to release dispatch guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_exact_multiple() {
        let items: Vec<u32> = (0..10).collect();
        let batches = partition(&items, 5);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 5));
    }

    #[test]
    fn test_partition_with_remainder() {
        let items: Vec<u32> = (0..12).collect();
        let batches = partition(&items, 5);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(batches[1].len(), 5);
        assert_eq!(batches[2].len(), 2);

        // Every recipient exactly once
        let flattened: Vec<u32> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn test_partition_fewer_than_batch_size() {
        let items: Vec<u32> = (0..3).collect();
        let batches = partition(&items, 5);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_partition_empty() {
        let items: Vec<u32> = Vec::new();
        assert!(partition(&items, 5).is_empty());
    }

    #[test]
    fn test_partition_zero_batch_size_clamped() {
        let items: Vec<u32> = (0..4).collect();
        let batches = partition(&items, 0);
        assert_eq!(batches.len(), 4);
    }

    #[test]
    fn test_push_title_by_event() {
        assert_eq!(
            push_title(EventKind::JobInvitation, "Night Shift"),
            "New invitation: Night Shift"
        );
        assert_eq!(
            push_title(EventKind::JobCancellation, "Night Shift"),
            "Cancelled: Night Shift"
        );
        assert_eq!(push_title(EventKind::Message, "Night Shift"), "Night Shift");
    }
}
