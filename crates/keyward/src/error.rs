//! Error types for the permission layer.

use keyward_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission operations.
///
/// A missing record is never an error: lookups return `Level::ABSENT` or an
/// empty list instead.
#[derive(Debug, Error)]
pub enum AclError {
    /// Storage error, passed through unchanged.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A descriptor was rejected under `DescriptorPolicy::Strict`.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, AclError>;
