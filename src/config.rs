//! Process configuration loaded from environment variables.
//!
//! Everything is read once at startup; a missing required variable is a
//! fatal startup error, never a runtime one.

use std::env;
use std::path::PathBuf;

/// Sync configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID
    pub client_id: String,
    /// Strava OAuth client secret
    pub client_secret: String,
    /// Seed refresh token used when the credential file has no state yet
    pub refresh_token: Option<String>,
    /// One-time bootstrap authorization code
    pub auth_code: Option<String>,
    /// Redirect URI for the bootstrap code exchange
    pub redirect_uri: Option<String>,
    /// Directly-supplied access token, bypassing the token endpoint entirely
    pub access_token: Option<String>,
    /// Where the rotated refresh token is persisted
    pub token_file: PathBuf,
    /// Destination store base URL; the upsert sink is disabled when absent
    pub store_url: Option<String>,
    /// API key for the destination store
    pub store_api_key: Option<String>,
    /// Destination table name
    pub store_table: String,
    /// CSV backup file path
    pub csv_file: PathBuf,
    /// JSON backup file path
    pub json_file: PathBuf,
    /// Lookback window (days) when no sink has a watermark yet
    pub days_back: i64,
    /// Whether to enrich each activity with a per-record detail call
    pub fetch_details: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let days_back = match env::var("DAYS_BACK") {
            Ok(v) => v
                .parse::<i64>()
                .map_err(|_| ConfigError::Invalid("DAYS_BACK", v))?,
            Err(_) => 30,
        };

        Ok(Self {
            client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            refresh_token: non_empty(env::var("STRAVA_REFRESH_TOKEN").ok()),
            auth_code: non_empty(env::var("STRAVA_AUTH_CODE").ok()),
            redirect_uri: non_empty(env::var("STRAVA_REDIRECT_URI").ok()),
            access_token: non_empty(env::var("STRAVA_ACCESS_TOKEN").ok()),
            token_file: env::var("TOKEN_FILE")
                .unwrap_or_else(|_| ".strava_tokens.json".to_string())
                .into(),
            store_url: non_empty(env::var("STORE_URL").ok()),
            store_api_key: non_empty(env::var("STORE_API_KEY").ok()),
            store_table: env::var("STORE_TABLE").unwrap_or_else(|_| "strava_activities".to_string()),
            csv_file: env::var("CSV_FILE")
                .unwrap_or_else(|_| "activities.csv".to_string())
                .into(),
            json_file: env::var("JSON_FILE")
                .unwrap_or_else(|_| "activities_raw.json".to_string())
                .into(),
            days_back,
            fetch_details: env::var("FETCH_DETAILS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

/// Treat empty environment variables as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
