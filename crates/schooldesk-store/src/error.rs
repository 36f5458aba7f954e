//! Store error types.
//!
//! The `Display` text of every variant is short and safe to hand back to a
//! client. The underlying driver message lives in `reason` and is only meant
//! for server-side logs.

/// Errors that can occur while talking to the school store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to connect to (or prepare) the backing database.
    #[error("failed to connect to the school store")]
    Connect { reason: String },

    /// A read or write against the store failed.
    #[error("school store {operation} failed")]
    Query {
        operation: &'static str,
        reason: String,
    },

    /// The memory store seed file could not be loaded.
    #[error("failed to load school seed file '{path}'")]
    Seed { path: String, reason: String },
}

impl StoreError {
    /// Underlying failure detail, for logging only.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Connect { reason } | Self::Query { reason, .. } | Self::Seed { reason, .. } => {
                reason
            }
        }
    }
}
