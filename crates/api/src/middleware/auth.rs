//! JWT authentication middleware and helpers.
//!
//! Two principals exist: organization admins (web console, also reachable via
//! `X-API-Key`) and contacts (mobile app). Role is carried in the JWT; the
//! extractors below validate the Authorization header on protected routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roster_common::error::AppError;

use crate::state::AppState;

/// Role of an authenticated principal.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CONTACT: &str = "contact";

/// JWT claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject — the admin user's or contact's UUID
    pub sub: String,
    /// Owning organization UUID
    pub org: String,
    /// Principal role: "admin" or "contact"
    pub role: String,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// Authenticated organization admin.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub user_id: Uuid,
    pub org_id: Uuid,
}

/// Authenticated contact (mobile app).
#[derive(Debug, Clone)]
pub struct AuthContact {
    pub contact_id: Uuid,
    pub org_id: Uuid,
}

/// Either principal, for routes both roles may call.
#[derive(Debug, Clone)]
pub enum Principal {
    Admin(AuthAdmin),
    Contact(AuthContact),
}

impl Principal {
    pub fn org_id(&self) -> Uuid {
        match self {
            Principal::Admin(admin) => admin.org_id,
            Principal::Contact(contact) => contact.org_id,
        }
    }
}

/// Encode a JWT token for a principal.
pub fn encode_jwt(
    subject: Uuid,
    org_id: Uuid,
    role: &str,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours as i64);

    let claims = Claims {
        sub: subject.to_string(),
        org: org_id.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("Failed to encode JWT: {}", e)))?;

    Ok(token)
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Resolve a request to a principal: JWT Bearer first, then `X-API-Key`
/// (admin service access).
async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<Principal, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let api_key_header = parts
        .headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let Some(auth) = auth_header
        && let Some(token) = auth.strip_prefix("Bearer ")
    {
        let claims = decode_jwt(token, &state.config.jwt_secret)?;
        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Invalid subject in token".to_string()))?;
        let org_id = Uuid::parse_str(&claims.org)
            .map_err(|_| AppError::Auth("Invalid org in token".to_string()))?;

        return match claims.role.as_str() {
            ROLE_ADMIN => Ok(Principal::Admin(AuthAdmin {
                user_id: subject,
                org_id,
            })),
            ROLE_CONTACT => Ok(Principal::Contact(AuthContact {
                contact_id: subject,
                org_id,
            })),
            other => Err(AppError::Auth(format!("Unknown role '{}'", other))),
        };
    }

    if let Some(api_key) = api_key_header {
        let row: Option<(Uuid, Uuid)> =
            sqlx::query_as("SELECT id, org_id FROM users WHERE api_key = $1")
                .bind(&api_key)
                .fetch_optional(&state.pool)
                .await?;

        if let Some((user_id, org_id)) = row {
            return Ok(Principal::Admin(AuthAdmin { user_id, org_id }));
        }
    }

    Err(AppError::Auth(
        "Missing or invalid Authorization header. Use 'Bearer <JWT>' or 'X-API-Key: <key>'"
            .to_string(),
    ))
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        async move { authenticate(parts, &state).await }
    }
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        async move {
            match authenticate(parts, &state).await? {
                Principal::Admin(admin) => Ok(admin),
                Principal::Contact(_) => {
                    Err(AppError::Auth("Admin access required".to_string()))
                }
            }
        }
    }
}

impl FromRequestParts<AppState> for AuthContact {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let state = state.clone();
        async move {
            match authenticate(parts, &state).await? {
                Principal::Contact(contact) => Ok(contact),
                Principal::Admin(_) => {
                    Err(AppError::Auth("Contact access required".to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_encode_decode_jwt() {
        let subject = Uuid::new_v4();
        let org = Uuid::new_v4();
        let token = encode_jwt(subject, org, ROLE_ADMIN, TEST_SECRET, 24).unwrap();
        let claims = decode_jwt(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, subject.to_string());
        assert_eq!(claims.org, org.to_string());
        assert_eq!(claims.role, ROLE_ADMIN);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token =
            encode_jwt(Uuid::new_v4(), Uuid::new_v4(), ROLE_CONTACT, TEST_SECRET, 24).unwrap();
        assert!(decode_jwt(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_expired_jwt_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            org: Uuid::new_v4().to_string(),
            role: ROLE_CONTACT.to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
    }
}
