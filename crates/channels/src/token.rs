//! Device token format validation.
//!
//! Tokens are validated by shape before any send attempt: APNs issues 64
//! lowercase hex characters, FCM registration tokens are 140–200 characters of
//! alphanumerics plus `:`, `_` and `-` separators. Tokens failing validation
//! never reach the wire.

use roster_common::types::Platform;

/// Minimum length of an FCM registration token.
const FCM_MIN_LEN: usize = 140;
/// Maximum length of an FCM registration token.
const FCM_MAX_LEN: usize = 200;

/// Validate an APNs device token: exactly 64 hex characters.
pub fn is_valid_apns_token(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate an FCM registration token: 140–200 chars of `[A-Za-z0-9:_-]`.
pub fn is_valid_fcm_token(token: &str) -> bool {
    (FCM_MIN_LEN..=FCM_MAX_LEN).contains(&token.len())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
}

/// Validate a token against its platform's format.
pub fn is_valid(platform: Platform, token: &str) -> bool {
    match platform {
        Platform::Ios => is_valid_apns_token(token),
        Platform::Android => is_valid_fcm_token(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apns_64_hex_accepted() {
        let token = "a".repeat(64);
        assert!(is_valid_apns_token(&token));
    }

    #[test]
    fn test_apns_63_hex_rejected() {
        let token = "a".repeat(63);
        assert!(!is_valid_apns_token(&token));
    }

    #[test]
    fn test_apns_non_hex_rejected() {
        let mut token = "a".repeat(63);
        token.push('g');
        assert!(!is_valid_apns_token(&token));
    }

    #[test]
    fn test_fcm_150_chars_accepted() {
        let token = format!("cXyZ:{}", "A1_-b".repeat(29));
        assert_eq!(token.len(), 150);
        assert!(is_valid_fcm_token(&token));
    }

    #[test]
    fn test_fcm_139_chars_rejected() {
        let token = "a".repeat(139);
        assert!(!is_valid_fcm_token(&token));
    }

    #[test]
    fn test_fcm_201_chars_rejected() {
        let token = "a".repeat(201);
        assert!(!is_valid_fcm_token(&token));
    }

    #[test]
    fn test_fcm_illegal_char_rejected() {
        let token = format!("{}!", "a".repeat(149));
        assert!(!is_valid_fcm_token(&token));
    }

    #[test]
    fn test_platform_dispatch() {
        assert!(is_valid(Platform::Ios, &"f".repeat(64)));
        assert!(!is_valid(Platform::Android, &"f".repeat(64)));
        assert!(is_valid(Platform::Android, &"f".repeat(150)));
    }
}
