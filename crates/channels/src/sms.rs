//! HTTP SMS provider client.
//!
//! One JSON POST per message against the configured provider endpoint.
//! Delivery is best-effort; the dispatcher records the outcome per recipient.

use std::time::Duration;

use serde::Serialize;

use crate::SendError;

/// Per-request timeout for SMS sends.
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    from: &'a str,
    to: &'a str,
    body: &'a str,
}

/// SMS client bound to one provider account and sender number.
pub struct SmsClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl SmsClient {
    pub fn new(api_url: String, api_key: String, from: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_url,
            api_key,
            from,
        })
    }

    /// Send one SMS to one phone number.
    pub async fn send(&self, to: &str, body: &str) -> Result<(), SendError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SmsRequest {
                from: &self.from,
                to,
                body,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(SendError::Rejected(format!(
                "SMS provider responded {}: {}",
                status, detail
            )))
        }
    }
}
