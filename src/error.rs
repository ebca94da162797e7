use std::fmt;

use thiserror::Error;

/// Platform facilities a session may or may not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Persistence,
    Camera,
    Geolocation,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Persistence => "local storage",
            Capability::Camera => "camera",
            Capability::Geolocation => "geolocation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} is not supported on this platform")]
    CapabilityUnsupported(Capability),

    #[error("Local store not initialized")]
    StoreNotReady,

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("Collection '{collection}' does not exist in schema version {version}")]
    CollectionMissing {
        collection: &'static str,
        version: u32,
    },

    #[error("Cannot open store at version {requested}: it is already at version {current}")]
    VersionDowngrade { requested: u32, current: u32 },

    #[error("No migration defined for schema version {0}")]
    UnknownSchemaVersion(u32),

    #[error("{0}")]
    Usage(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors the user can fix by retrying differently, as opposed to
    /// failures of the environment.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::CapabilityUnsupported(_)
                | AppError::StoreNotReady
                | AppError::PreconditionFailed(_)
                | AppError::CollectionMissing { .. }
                | AppError::VersionDowngrade { .. }
                | AppError::UnknownSchemaVersion(_)
                | AppError::Usage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
