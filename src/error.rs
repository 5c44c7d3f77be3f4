// ⚠️ Console errors - library-level failure taxonomy
// Loaders and binaries wrap these in anyhow; the core returns them directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("residential entity not found: {0}")]
    EntityNotFound(String),

    #[error("subscription to {source_id} failed: {reason}")]
    SubscriptionFailed { source_id: String, reason: String },

    #[error("fetch from {entity_id} failed: {reason}")]
    FetchFailed { entity_id: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
