//! Error types for persistence
//!
//! Store operations themselves fail softly (`bool` / `Option`); these errors
//! only describe what went wrong talking to durable storage and are logged by
//! the store rather than returned across its public surface.

/// Persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be encoded or decoded
    #[error("storage document malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document written by a newer build
    #[error("unsupported persisted document version {found} (newest known: {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    /// Migration could not upgrade an old document
    #[error("migration from version {from} failed: {reason}")]
    Migration { from: u64, reason: String },

    /// Key not usable by the backend
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
