//! Environment-driven configuration.

use chrono_tz::Tz;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Events allowed on the free plan before a user becomes limited.
pub const DEFAULT_FREE_PLAN_MAX_EVENTS: i64 = 5;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the local libSQL database file.
    pub database_path: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// The bot's display timezone. Day boundaries (due dates, "today")
    /// are evaluated in this zone.
    pub timezone: Tz,
    /// Free-plan event quota.
    pub free_plan_max_events: i64,
    /// Bearer token expected by the reminder trigger endpoint.
    pub reminder_token: SecretString,
    /// Base URL of the messaging platform API.
    pub platform_base_url: String,
    /// Access token for the messaging platform API.
    pub platform_token: SecretString,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timezone = match std::env::var("BOT_TIMEZONE") {
            Ok(raw) => raw
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "BOT_TIMEZONE".to_string(),
                    message: format!("unknown timezone: {raw}"),
                })?,
            Err(_) => chrono_tz::Asia::Taipei,
        };

        let free_plan_max_events = match std::env::var("FREE_PLAN_MAX_EVENTS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "FREE_PLAN_MAX_EVENTS".to_string(),
                    message: format!("expected a positive integer, got {raw}"),
                })?,
            Err(_) => DEFAULT_FREE_PLAN_MAX_EVENTS,
        };

        Ok(Self {
            database_path: std::env::var("ROUTINELY_DB_PATH")
                .unwrap_or_else(|_| "./data/routinely.db".to_string()),
            bind_addr: std::env::var("ROUTINELY_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            timezone,
            free_plan_max_events,
            reminder_token: SecretString::from(require_env("REMINDER_TOKEN")?),
            platform_base_url: std::env::var("PLATFORM_BASE_URL")
                .unwrap_or_else(|_| "https://api.chat.example".to_string()),
            platform_token: SecretString::from(require_env("PLATFORM_ACCESS_TOKEN")?),
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
