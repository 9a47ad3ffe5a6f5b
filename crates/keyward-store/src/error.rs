//! Error types for the store module.

use keyward_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Identity encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A bulk write failed part-way.
    ///
    /// The first `committed` operations were applied and stay applied; the
    /// operation at `index` failed and nothing after it was attempted.
    #[error("bulk write failed at op {index} ({committed} committed): {message}")]
    BulkWrite {
        index: usize,
        committed: usize,
        message: String,
    },

    /// The backend cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
