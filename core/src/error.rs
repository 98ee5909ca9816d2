//! Error types for the versioning engine.

use thiserror::Error;

/// Failure to serialize an attribute map into a snapshot payload.
///
/// Decoding never fails; see [`crate::SnapshotCodec::decode`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode YAML snapshot: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors surfaced by a [`crate::VersionStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed version record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("version store lock poisoned")]
    Poisoned,

    /// Backend-specific failure (constraint violation, connection loss, ...).
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Errors raised while building or loading tracking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("metadata key `{key}` on `{item_type}` shadows a built-in version field")]
    ReservedMetadataKey { item_type: String, key: String },

    #[error("item type `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level error returned by lifecycle hooks and read-side queries.
#[derive(Debug, Error)]
pub enum VersioningError {
    /// Store failures pass through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("item type `{0}` is not registered for versioning")]
    UnregisteredType(String),
}

pub type Result<T> = std::result::Result<T, VersioningError>;
