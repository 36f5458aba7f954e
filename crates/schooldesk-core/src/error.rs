//! Error types for `schooldesk-core`.

/// Errors from classifying a school identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The identifier was absent or blank.
    #[error("school identifier is required")]
    Missing,
}

/// Errors from audit sinks.
///
/// These never reach a client; [`AuditLog`](crate::audit::AuditLog) logs
/// and drops them.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The entry could not be serialized.
    #[error("failed to serialize audit entry: {reason}")]
    Serialization { reason: String },

    /// A sink failed to persist the entry.
    #[error("audit sink '{name}' failed: {reason}")]
    SinkFailure { name: String, reason: String },
}

/// Errors from applying the trial policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrialError {
    /// The configured trial length cannot produce an end date.
    #[error("trial length of {days} days is out of range")]
    InvalidLength { days: i64 },
}
