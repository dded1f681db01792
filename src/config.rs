//! Application configuration loaded from environment variables.
//!
//! The OAuth client id and secret are required; startup fails fast when
//! either is absent. Everything else has a sensible default.

use std::env;

use chrono_tz::Tz;

/// Harvest identity service (OAuth authorize + token endpoints).
pub const DEFAULT_IDENTITY_URL: &str = "https://id.getharvest.com";

/// Harvest API v2 base URL.
pub const DEFAULT_API_URL: &str = "https://api.harvestapp.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Harvest OAuth client ID (public)
    pub client_id: String,
    /// Harvest OAuth client secret
    pub client_secret: String,
    /// Server port for the OAuth redirect endpoint
    pub port: u16,
    /// Time zone used to evaluate reminder windows and stamp spent dates
    pub time_zone: Tz,
    /// Identity service base URL (overridable for tests)
    pub identity_url: String,
    /// Harvest API base URL (overridable for tests)
    pub api_url: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            port: 8080,
            time_zone: chrono_tz::UTC,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let time_zone = match env::var("REMINDER_TIME_ZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimeZone(name))?,
            Err(_) => chrono_tz::UTC,
        };

        Ok(Self {
            client_id: env::var("HARVEST_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("HARVEST_CLIENT_ID"))?,
            client_secret: env::var("HARVEST_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("HARVEST_CLIENT_SECRET"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            time_zone,
            identity_url: env::var("HARVEST_IDENTITY_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_URL.to_string()),
            api_url: env::var("HARVEST_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),
}
