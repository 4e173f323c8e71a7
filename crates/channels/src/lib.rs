//! Outbound channel adapters: APNs and FCM push, HTTP SMS.
//!
//! Each adapter formats and transmits a single message to a single
//! recipient/device. The [`gateway::NotificationGateway`] owns the initialized
//! clients and fans a notification out across all of a recipient's tokens.

pub mod apns;
pub mod fcm;
pub mod gateway;
pub mod payload;
pub mod sms;
pub mod token;

use thiserror::Error;

/// Error from a single channel send attempt.
///
/// `InvalidToken` marks the device token as a removal candidate — the caller
/// logs it for a separate cleanup path rather than purging synchronously.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid device token: {0}")]
    InvalidToken(String),

    #[error("channel disabled: {0}")]
    Disabled(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected send: {0}")]
    Rejected(String),

    #[error("auth error: {0}")]
    Auth(String),
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        SendError::Transport(e.to_string())
    }
}
