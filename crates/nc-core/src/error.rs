//! Error types shared by the gate, stats and background handlers.

/// Failure reading or writing the extension's key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid value for key '{key}': {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a browser API the core calls out to.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("failed to update redirect ruleset: {0}")]
    RuleUpdate(String),
    #[error("failed to navigate tab {tab_id}: {reason}")]
    Navigation { tab_id: i64, reason: String },
    #[error("failed to replace page location: {0}")]
    Location(String),
    #[error("failed to update badge: {0}")]
    Badge(String),
    #[error("failed to notify ui: {0}")]
    Notify(String),
}

/// Umbrella error for operations that touch both storage and the platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
