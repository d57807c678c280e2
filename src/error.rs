//! Error types for Routinely.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Internal state has desynchronized (e.g. a session references an
    /// event or user row that no longer exists). Fatal for the request.
    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-related errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored row could not be decoded back into its domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Outbound messaging / profile lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Push to {user_id} failed: {reason}")]
    PushFailed { user_id: String, reason: String },

    #[error("Profile lookup for {user_id} failed: {reason}")]
    ProfileFailed { user_id: String, reason: String },
}
