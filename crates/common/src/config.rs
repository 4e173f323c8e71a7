use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string
    pub redis_url: String,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Recipients per dispatch batch (default: 5)
    pub dispatch_batch_size: usize,

    /// Seconds between dispatch batches (default: 120)
    pub dispatch_batch_interval_secs: u64,

    /// Path to the APNs `.p8` signing key
    pub apns_key_path: Option<String>,

    /// APNs key ID
    pub apns_key_id: Option<String>,

    /// Apple developer team ID
    pub apns_team_id: Option<String>,

    /// App bundle ID, sent as `apns-topic`
    pub apns_bundle_id: Option<String>,

    /// Use the production APNs host instead of sandbox
    pub apns_production: bool,

    /// Path to the FCM service account JSON (HTTP v1 API)
    pub fcm_service_account_path: Option<String>,

    /// FCM legacy server key, used when no service account is configured
    pub fcm_server_key: Option<String>,

    /// SMS provider endpoint URL
    pub sms_api_url: Option<String>,

    /// SMS provider API key
    pub sms_api_key: Option<String>,

    /// Sender phone number for outbound SMS
    pub sms_from: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            dispatch_batch_size: std::env::var("DISPATCH_BATCH_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_BATCH_SIZE must be a valid usize"))?,
            dispatch_batch_interval_secs: std::env::var("DISPATCH_BATCH_INTERVAL_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("DISPATCH_BATCH_INTERVAL_SECS must be a valid u64")
                })?,
            apns_key_path: std::env::var("APNS_KEY_PATH").ok(),
            apns_key_id: std::env::var("APNS_KEY_ID").ok(),
            apns_team_id: std::env::var("APNS_TEAM_ID").ok(),
            apns_bundle_id: std::env::var("APNS_BUNDLE_ID").ok(),
            apns_production: std::env::var("APNS_PRODUCTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            fcm_service_account_path: std::env::var("FCM_SERVICE_ACCOUNT_PATH").ok(),
            fcm_server_key: std::env::var("FCM_SERVER_KEY").ok(),
            sms_api_url: std::env::var("SMS_API_URL").ok(),
            sms_api_key: std::env::var("SMS_API_KEY").ok(),
            sms_from: std::env::var("SMS_FROM").ok(),
        })
    }
}
