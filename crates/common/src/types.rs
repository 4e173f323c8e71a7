use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mobile platform a device token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
        }
    }
}

/// A contact's response status for a specific job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    NoReply,
    Maybe,
    Confirmed,
    Declined,
    Cancelled,
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvailabilityStatus::NoReply => write!(f, "no_reply"),
            AvailabilityStatus::Maybe => write!(f, "maybe"),
            AvailabilityStatus::Confirmed => write!(f, "confirmed"),
            AvailabilityStatus::Declined => write!(f, "declined"),
            AvailabilityStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Direction of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Outbound,
    Inbound,
}

impl std::fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageDirection::Outbound => write!(f, "outbound"),
            MessageDirection::Inbound => write!(f, "inbound"),
        }
    }
}

/// Message delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of outbound notification event. Drives push payload shaping:
/// invitations carry the actionable `JOB_INVITATION` category, the rest
/// land on the plain messages channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobInvitation,
    JobUpdate,
    JobCancellation,
    Message,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::JobInvitation => write!(f, "job_invitation"),
            EventKind::JobUpdate => write!(f, "job_update"),
            EventKind::JobCancellation => write!(f, "job_cancellation"),
            EventKind::Message => write!(f, "message"),
        }
    }
}

/// A staffing job posted by an organization admin.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub required_headcount: i32,
    pub department_id: Option<Uuid>,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

/// A contractor/crew member owned by an organization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub org_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub skills: serde_json::Value,
    pub opted_out: bool,
    pub created_at: DateTime<Utc>,
}

/// Links a contact to a job. One row per (job, contact) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Availability {
    pub id: Uuid,
    pub job_id: Uuid,
    pub contact_id: Uuid,
    pub status: AvailabilityStatus,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A message template with token placeholders.
///
/// Reserved templates ("Job Invitation", "Job Cancellation", "Job Update")
/// cannot be renamed or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageTemplate {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub body: String,
    pub reserved: bool,
    pub created_at: DateTime<Utc>,
}

/// A logged message. Append-only once sent.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub org_id: Uuid,
    pub job_id: Option<Uuid>,
    pub contact_id: Uuid,
    pub direction: MessageDirection,
    pub content: String,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

/// A platform-issued push token registered by a contact's app install.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceToken {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub token: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
}

/// Correlates a push send attempt with later "delivered"/"action" callbacks
/// from the client apps.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub job_id: Option<Uuid>,
    pub token: String,
    pub delivered_at: Option<DateTime<Utc>>,
    pub action: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Canonical push notification, encoded per-platform by the channel layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    /// Short title shown in the notification tray
    pub title: String,
    /// Body text
    pub body: String,
    /// Event kind — selects category/channel on the device
    pub event: EventKind,
    /// Job this notification concerns (also used as the thread/group key)
    pub job_id: Option<Uuid>,
    /// Generated per send attempt, echoed back by delivered/action callbacks
    pub notification_id: Uuid,
}

/// A recipient selected by the resolver: the contact plus their existing
/// availability row for the job, if any.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub contact: Contact,
    pub availability: Option<Availability>,
}
