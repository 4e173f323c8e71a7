//! Platform-specific push payload encoders.
//!
//! Callers construct one canonical [`PushNotification`]; the encoders here
//! produce the divergent APNs and FCM wire shapes. Rules carried by every
//! encoder:
//! - invitations get the actionable `JOB_INVITATION` category, everything
//!   else lands on the plain messages channel
//! - the job id doubles as the OS-level thread/group key
//! - FCM `data` values are all strings (FCM rejects non-string values)
//! - Android action identifiers are uppercase (`ACCEPT`/`DECLINE`), iOS
//!   registers lowercase ones client-side

use serde_json::{Value, json};

use roster_common::types::{EventKind, PushNotification};

/// APNs category enabling the Accept/Decline/Maybe action buttons.
pub const APNS_INVITATION_CATEGORY: &str = "JOB_INVITATION";

/// Android notification channel for job invitations.
pub const FCM_INVITATION_CHANNEL: &str = "job_invitations";

/// Android notification channel for everything else.
pub const FCM_MESSAGES_CHANNEL: &str = "messages";

/// Android click action for invitation notifications.
pub const FCM_INVITATION_CLICK_ACTION: &str = "JOB_INVITATION";

/// Android click action for plain message notifications.
pub const FCM_MESSAGE_CLICK_ACTION: &str = "OPEN_MESSAGE";

fn is_invitation(event: EventKind) -> bool {
    matches!(event, EventKind::JobInvitation)
}

/// Custom keys carried alongside `aps` (APNs) or inside `data` (FCM).
fn custom_keys(notification: &PushNotification) -> Vec<(&'static str, String)> {
    let mut keys = vec![
        ("type", notification.event.to_string()),
        ("notificationId", notification.notification_id.to_string()),
        (
            "action",
            if is_invitation(notification.event) {
                "respond".to_string()
            } else {
                "open".to_string()
            },
        ),
        (
            "actionType",
            if is_invitation(notification.event) {
                APNS_INVITATION_CATEGORY.to_string()
            } else {
                "NONE".to_string()
            },
        ),
    ];
    if let Some(job_id) = notification.job_id {
        keys.push(("jobId", job_id.to_string()));
    }
    keys
}

/// Build the APNs request body for a notification.
///
/// Root keys alongside `aps`: `type`, `jobId`, `action`, `notificationId`,
/// `actionType`.
pub fn apns_payload(notification: &PushNotification) -> Value {
    let mut aps = json!({
        "alert": {
            "title": notification.title,
            "body": notification.body,
        },
        "sound": "default",
        "badge": 1,
    });

    if is_invitation(notification.event) {
        aps["category"] = json!(APNS_INVITATION_CATEGORY);
    }
    if let Some(job_id) = notification.job_id {
        // Groups notifications for the same job in the OS tray
        aps["thread-id"] = json!(job_id.to_string());
    }

    let mut payload = json!({ "aps": aps });
    for (key, value) in custom_keys(notification) {
        payload[key] = json!(value);
    }
    payload
}

/// FCM `data` map: every value coerced to a string, plus the Android-cased
/// `category` key.
fn fcm_data(notification: &PushNotification) -> Value {
    let mut data = serde_json::Map::new();
    for (key, value) in custom_keys(notification) {
        data.insert(key.to_string(), Value::String(value));
    }
    data.insert(
        "category".to_string(),
        Value::String(
            if is_invitation(notification.event) {
                FCM_INVITATION_CLICK_ACTION
            } else {
                FCM_MESSAGE_CLICK_ACTION
            }
            .to_string(),
        ),
    );
    Value::Object(data)
}

fn fcm_channel_id(event: EventKind) -> &'static str {
    if is_invitation(event) {
        FCM_INVITATION_CHANNEL
    } else {
        FCM_MESSAGES_CHANNEL
    }
}

fn fcm_click_action(event: EventKind) -> &'static str {
    if is_invitation(event) {
        FCM_INVITATION_CLICK_ACTION
    } else {
        FCM_MESSAGE_CLICK_ACTION
    }
}

/// Build the FCM HTTP v1 request body (`message` envelope).
pub fn fcm_v1_message(token: &str, notification: &PushNotification) -> Value {
    json!({
        "message": {
            "token": token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": fcm_data(notification),
            "android": {
                "notification": {
                    "click_action": fcm_click_action(notification.event),
                    "channel_id": fcm_channel_id(notification.event),
                }
            }
        }
    })
}

/// Build the FCM legacy endpoint request body, used when only a server key
/// is configured.
pub fn fcm_legacy_message(token: &str, notification: &PushNotification) -> Value {
    json!({
        "to": token,
        "notification": {
            "title": notification.title,
            "body": notification.body,
            "click_action": fcm_click_action(notification.event),
            "android_channel_id": fcm_channel_id(notification.event),
        },
        "data": fcm_data(notification),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_notification(event: EventKind) -> PushNotification {
        PushNotification {
            title: "Night Shift".to_string(),
            body: "You have been invited".to_string(),
            event,
            job_id: Some(Uuid::new_v4()),
            notification_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_apns_invitation_has_category_and_thread() {
        let n = make_notification(EventKind::JobInvitation);
        let payload = apns_payload(&n);
        assert_eq!(payload["aps"]["category"], "JOB_INVITATION");
        assert_eq!(
            payload["aps"]["thread-id"],
            n.job_id.unwrap().to_string().as_str()
        );
        assert_eq!(payload["aps"]["alert"]["title"], "Night Shift");
        assert_eq!(payload["notificationId"], n.notification_id.to_string().as_str());
        assert_eq!(payload["type"], "job_invitation");
        assert_eq!(payload["jobId"], n.job_id.unwrap().to_string().as_str());
    }

    #[test]
    fn test_apns_message_has_no_category() {
        let n = make_notification(EventKind::Message);
        let payload = apns_payload(&n);
        assert!(payload["aps"].get("category").is_none());
        assert_eq!(payload["actionType"], "NONE");
    }

    #[test]
    fn test_fcm_data_values_are_all_strings() {
        let n = make_notification(EventKind::JobUpdate);
        let message = fcm_v1_message("tok", &n);
        let data = message["message"]["data"].as_object().unwrap();
        assert!(!data.is_empty());
        for (key, value) in data {
            assert!(value.is_string(), "data[{}] must be a string", key);
        }
    }

    #[test]
    fn test_fcm_channel_selected_by_event() {
        let invite = fcm_v1_message("tok", &make_notification(EventKind::JobInvitation));
        assert_eq!(
            invite["message"]["android"]["notification"]["channel_id"],
            "job_invitations"
        );

        let update = fcm_v1_message("tok", &make_notification(EventKind::JobUpdate));
        assert_eq!(
            update["message"]["android"]["notification"]["channel_id"],
            "messages"
        );
    }

    #[test]
    fn test_fcm_legacy_shape() {
        let n = make_notification(EventKind::JobCancellation);
        let message = fcm_legacy_message("tok123", &n);
        assert_eq!(message["to"], "tok123");
        assert_eq!(message["notification"]["android_channel_id"], "messages");
        assert_eq!(message["data"]["type"], "job_cancellation");
    }

    #[test]
    fn test_no_job_id_omits_keys() {
        let n = PushNotification {
            title: "Hi".to_string(),
            body: "b".to_string(),
            event: EventKind::Message,
            job_id: None,
            notification_id: Uuid::new_v4(),
        };
        let payload = apns_payload(&n);
        assert!(payload.get("jobId").is_none());
        assert!(payload["aps"].get("thread-id").is_none());
    }
}
