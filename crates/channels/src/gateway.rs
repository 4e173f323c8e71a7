//! Notification gateway — the one owner of initialized channel clients.
//!
//! Constructed once at process start from `AppConfig` and injected into the
//! dispatcher, instead of module-level singletons. A channel with missing or
//! broken credentials logs a warning at startup and stays disabled for the
//! process lifetime; no re-initialization is attempted.

use std::sync::Arc;

use tokio::task::JoinSet;
use uuid::Uuid;

use roster_common::config::AppConfig;
use roster_common::types::{DeviceToken, EventKind, Platform, PushNotification};

use crate::SendError;
use crate::apns::ApnsClient;
use crate::fcm::FcmClient;
use crate::sms::SmsClient;
use crate::token;

/// Correlation between a push send attempt and its device, used to match
/// later "delivered"/"action" callbacks from the client apps.
#[derive(Debug, Clone)]
pub struct PushCorrelation {
    pub contact_id: Uuid,
    pub notification_id: Uuid,
    pub token: String,
}

/// Aggregate result of a push fan-out.
#[derive(Debug, Default)]
pub struct FanoutOutcome {
    /// Contacts with at least one successful push.
    pub sent: Vec<Uuid>,
    /// Contacts whose every push attempt failed.
    pub failed: Vec<Uuid>,
    /// One correlation per successful send attempt.
    pub correlations: Vec<PushCorrelation>,
    /// Tokens flagged invalid by format check or provider response.
    /// Removal candidates for a separate cleanup path, not auto-purged.
    pub invalid_tokens: Vec<String>,
}

pub struct NotificationGateway {
    apns: Option<ApnsClient>,
    fcm: Option<FcmClient>,
    sms: Option<SmsClient>,
}

impl NotificationGateway {
    /// Initialize all channels from config. Never fails: a channel that
    /// cannot initialize is disabled with a warning.
    pub fn from_config(config: &AppConfig) -> Self {
        let apns = match (
            &config.apns_key_path,
            &config.apns_key_id,
            &config.apns_team_id,
            &config.apns_bundle_id,
        ) {
            (Some(key_path), Some(key_id), Some(team_id), Some(bundle_id)) => {
                match std::fs::read(key_path).map_err(anyhow::Error::from).and_then(|pem| {
                    ApnsClient::new(
                        &pem,
                        key_id.clone(),
                        team_id.clone(),
                        bundle_id.clone(),
                        config.apns_production,
                    )
                }) {
                    Ok(client) => {
                        tracing::info!(production = config.apns_production, "APNs channel enabled");
                        Some(client)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "APNs initialization failed — iOS push disabled");
                        None
                    }
                }
            }
            _ => {
                tracing::warn!("APNs credentials not configured — iOS push disabled");
                None
            }
        };

        let fcm = if let Some(path) = &config.fcm_service_account_path {
            match std::fs::read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|json| FcmClient::from_service_account(&json))
            {
                Ok(client) => {
                    tracing::info!("FCM channel enabled (HTTP v1)");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "FCM initialization failed — Android push disabled");
                    None
                }
            }
        } else if let Some(server_key) = &config.fcm_server_key {
            match FcmClient::from_server_key(server_key.clone()) {
                Ok(client) => {
                    tracing::info!("FCM channel enabled (legacy server key)");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "FCM initialization failed — Android push disabled");
                    None
                }
            }
        } else {
            tracing::warn!("FCM credentials not configured — Android push disabled");
            None
        };

        let sms = match (&config.sms_api_url, &config.sms_api_key, &config.sms_from) {
            (Some(url), Some(key), Some(from)) => {
                match SmsClient::new(url.clone(), key.clone(), from.clone()) {
                    Ok(client) => {
                        tracing::info!("SMS channel enabled");
                        Some(client)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "SMS initialization failed — SMS disabled");
                        None
                    }
                }
            }
            _ => {
                tracing::warn!("SMS credentials not configured — SMS disabled");
                None
            }
        };

        Self { apns, fcm, sms }
    }

    /// Gateway with every channel disabled. Used by tests and dry runs.
    pub fn disabled() -> Self {
        Self {
            apns: None,
            fcm: None,
            sms: None,
        }
    }

    pub fn sms_enabled(&self) -> bool {
        self.sms.is_some()
    }

    pub fn push_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Ios => self.apns.is_some(),
            Platform::Android => self.fcm.is_some(),
        }
    }

    /// Send one SMS.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<(), SendError> {
        match &self.sms {
            Some(client) => client.send(to, body).await,
            None => Err(SendError::Disabled("sms")),
        }
    }

    /// Send one push notification to one device token.
    pub async fn send_push(
        &self,
        device: &DeviceToken,
        notification: &PushNotification,
    ) -> Result<(), SendError> {
        if !token::is_valid(device.platform, &device.token) {
            return Err(SendError::InvalidToken(device.token.clone()));
        }

        match device.platform {
            Platform::Ios => match &self.apns {
                Some(client) => client.send(&device.token, notification).await,
                None => Err(SendError::Disabled("apns")),
            },
            Platform::Android => match &self.fcm {
                Some(client) => client.send(&device.token, notification).await,
                None => Err(SendError::Disabled("fcm")),
            },
        }
    }

    /// Fan a notification out to a set of device tokens concurrently.
    ///
    /// Each attempt gets its own generated `notification_id` for delivered /
    /// action correlation. Individual failures are aggregated, never
    /// propagated; there is no per-token retry.
    pub async fn fan_out(
        self: &Arc<Self>,
        devices: Vec<DeviceToken>,
        title: &str,
        body: &str,
        event: EventKind,
        job_id: Option<Uuid>,
    ) -> FanoutOutcome {
        let mut tasks = JoinSet::new();

        for device in devices {
            let gateway = Arc::clone(self);
            let notification = PushNotification {
                title: title.to_string(),
                body: body.to_string(),
                event,
                job_id,
                notification_id: Uuid::new_v4(),
            };
            tasks.spawn(async move {
                let result = gateway.send_push(&device, &notification).await;
                (device, notification.notification_id, result)
            });
        }

        let mut outcome = FanoutOutcome::default();
        let mut succeeded: Vec<Uuid> = Vec::new();
        let mut attempted: Vec<Uuid> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let Ok((device, notification_id, result)) = joined else {
                tracing::error!("Push task panicked");
                continue;
            };

            attempted.push(device.contact_id);

            match result {
                Ok(()) => {
                    succeeded.push(device.contact_id);
                    outcome.correlations.push(PushCorrelation {
                        contact_id: device.contact_id,
                        notification_id,
                        token: device.token,
                    });
                }
                Err(SendError::InvalidToken(token)) => {
                    tracing::warn!(
                        contact_id = %device.contact_id,
                        "Invalid device token — flagged for cleanup"
                    );
                    outcome.invalid_tokens.push(token);
                }
                Err(SendError::Disabled(channel)) => {
                    tracing::debug!(channel, contact_id = %device.contact_id, "Channel disabled");
                }
                Err(e) => {
                    tracing::warn!(contact_id = %device.contact_id, error = %e, "Push send failed");
                }
            }
        }

        succeeded.sort();
        succeeded.dedup();

        attempted.sort();
        attempted.dedup();

        outcome.failed = attempted
            .iter()
            .filter(|id| !succeeded.contains(id))
            .copied()
            .collect();
        outcome.sent = succeeded;

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_device(platform: Platform, token: &str) -> DeviceToken {
        DeviceToken {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            token: token.to_string(),
            platform,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_disabled_gateway_rejects_sms() {
        let gateway = NotificationGateway::disabled();
        let result = gateway.send_sms("+15551234567", "hello").await;
        assert!(matches!(result, Err(SendError::Disabled("sms"))));
    }

    #[tokio::test]
    async fn test_invalid_token_rejected_before_send() {
        let gateway = NotificationGateway::disabled();
        let device = make_device(Platform::Ios, "too-short");
        let notification = PushNotification {
            title: "t".to_string(),
            body: "b".to_string(),
            event: EventKind::Message,
            job_id: None,
            notification_id: Uuid::new_v4(),
        };
        let result = gateway.send_push(&device, &notification).await;
        assert!(matches!(result, Err(SendError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_fan_out_flags_invalid_tokens() {
        let gateway = Arc::new(NotificationGateway::disabled());
        let bad = make_device(Platform::Ios, "nothex");
        let bad_token = bad.token.clone();

        let outcome = gateway
            .fan_out(vec![bad], "title", "body", EventKind::JobInvitation, None)
            .await;

        assert!(outcome.sent.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.invalid_tokens, vec![bad_token]);
        assert!(outcome.correlations.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_disabled_channel_counts_as_failure() {
        let gateway = Arc::new(NotificationGateway::disabled());
        // Valid format, but no APNs client configured
        let device = make_device(Platform::Ios, &"a".repeat(64));
        let contact_id = device.contact_id;

        let outcome = gateway
            .fan_out(vec![device], "title", "body", EventKind::Message, None)
            .await;

        assert!(outcome.sent.is_empty());
        assert_eq!(outcome.failed, vec![contact_id]);
        assert!(outcome.invalid_tokens.is_empty());
    }
}
