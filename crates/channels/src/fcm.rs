//! FCM push client.
//!
//! Prefers the HTTP v1 API authenticated by a service-account OAuth token.
//! When only a legacy server key is configured, falls back to a raw POST
//! against the legacy `fcm/send` endpoint.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use roster_common::types::PushNotification;

use crate::SendError;
use crate::payload::{fcm_legacy_message, fcm_v1_message};

const FCM_LEGACY_URL: &str = "https://fcm.googleapis.com/fcm/send";
const OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Refresh the OAuth access token after this many seconds (tokens last 3600).
const TOKEN_REFRESH_SECS: i64 = 3000;

/// Per-request timeout for FCM sends.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Relevant fields of a Firebase service account JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct OauthClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct OauthTokenResponse {
    access_token: String,
}

enum FcmAuth {
    ServiceAccount {
        account: ServiceAccount,
        key: EncodingKey,
        cached_token: Mutex<Option<(String, i64)>>,
    },
    LegacyKey(String),
}

/// FCM client for one Firebase project.
pub struct FcmClient {
    http: reqwest::Client,
    auth: FcmAuth,
}

impl FcmClient {
    /// Build a client from a service account JSON blob (HTTP v1 API).
    pub fn from_service_account(json: &str) -> anyhow::Result<Self> {
        let account: ServiceAccount = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Invalid FCM service account JSON: {}", e))?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid FCM service account key: {}", e))?;

        Ok(Self {
            http: Self::build_http()?,
            auth: FcmAuth::ServiceAccount {
                account,
                key,
                cached_token: Mutex::new(None),
            },
        })
    }

    /// Build a client using only the legacy server key.
    pub fn from_server_key(server_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: Self::build_http()?,
            auth: FcmAuth::LegacyKey(server_key),
        })
    }

    fn build_http() -> anyhow::Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?)
    }

    /// Send one notification to one registration token.
    ///
    /// `UNREGISTERED` / `NotRegistered` / `InvalidRegistration` responses
    /// surface as [`SendError::InvalidToken`], mirroring the APNs path.
    pub async fn send(
        &self,
        device_token: &str,
        notification: &PushNotification,
    ) -> Result<(), SendError> {
        match &self.auth {
            FcmAuth::ServiceAccount { account, .. } => {
                self.send_v1(account, device_token, notification).await
            }
            FcmAuth::LegacyKey(key) => self.send_legacy(key, device_token, notification).await,
        }
    }

    async fn send_v1(
        &self,
        account: &ServiceAccount,
        device_token: &str,
        notification: &PushNotification,
    ) -> Result<(), SendError> {
        let access_token = self.oauth_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            account.project_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&fcm_v1_message(device_token, notification))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let error_status = body["error"]["status"].as_str().unwrap_or_default();
        if error_status == "NOT_FOUND" || error_status == "UNREGISTERED" {
            return Err(SendError::InvalidToken(device_token.to_string()));
        }

        Err(SendError::Rejected(format!(
            "FCM v1 responded {}: {}",
            status,
            body["error"]["message"].as_str().unwrap_or("unknown")
        )))
    }

    async fn send_legacy(
        &self,
        server_key: &str,
        device_token: &str,
        notification: &PushNotification,
    ) -> Result<(), SendError> {
        let response = self
            .http
            .post(FCM_LEGACY_URL)
            .header("Authorization", format!("key={}", server_key))
            .json(&fcm_legacy_message(device_token, notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Rejected(format!(
                "FCM legacy endpoint responded {}",
                status
            )));
        }

        // The legacy endpoint reports per-token errors inside a 200 body.
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        if let Some(error) = body["results"][0]["error"].as_str() {
            return match error {
                "NotRegistered" | "InvalidRegistration" => {
                    Err(SendError::InvalidToken(device_token.to_string()))
                }
                other => Err(SendError::Rejected(other.to_string())),
            };
        }

        Ok(())
    }

    /// Get an OAuth access token via the JWT-bearer grant, cached until
    /// near expiry.
    async fn oauth_token(&self) -> Result<String, SendError> {
        let FcmAuth::ServiceAccount {
            account,
            key,
            cached_token,
        } = &self.auth
        else {
            return Err(SendError::Auth("No service account configured".to_string()));
        };

        let now = Utc::now().timestamp();

        {
            let cached = cached_token
                .lock()
                .map_err(|_| SendError::Auth("FCM token cache poisoned".to_string()))?;
            if let Some((token, issued_at)) = cached.as_ref()
                && now - issued_at < TOKEN_REFRESH_SECS
            {
                return Ok(token.clone());
            }
        }

        let claims = OauthClaims {
            iss: account.client_email.clone(),
            scope: OAUTH_SCOPE.to_string(),
            aud: account.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, key)
            .map_err(|e| SendError::Auth(format!("Failed to sign FCM assertion: {}", e)))?;

        let response = self
            .http
            .post(&account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::Auth(format!(
                "OAuth token exchange failed: HTTP {}",
                response.status()
            )));
        }

        let token: OauthTokenResponse = response
            .json()
            .await
            .map_err(|e| SendError::Auth(format!("Malformed OAuth response: {}", e)))?;

        let mut cached = cached_token
            .lock()
            .map_err(|_| SendError::Auth("FCM token cache poisoned".to_string()))?;
        *cached = Some((token.access_token.clone(), now));

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_service_account_rejected() {
        assert!(FcmClient::from_service_account("{not json").is_err());
    }

    #[test]
    fn test_service_account_missing_fields_rejected() {
        assert!(FcmClient::from_service_account(r#"{"project_id": "p"}"#).is_err());
    }

    #[test]
    fn test_server_key_client_builds() {
        assert!(FcmClient::from_server_key("AAAA-server-key".to_string()).is_ok());
    }
}
