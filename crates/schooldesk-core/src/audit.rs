//! Trial signup audit trail.
//!
//! Each successful trial activation produces one [`AuditEntry`] that is
//! appended to every configured [`AuditSink`]. The trail is informational
//! only and never read back: sink failures are logged at `warn` and dropped,
//! and [`AuditLog::record_detached`] keeps the write off the response path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::AuditError;
use crate::redact;

/// Event name written for trial activations.
pub const TRIAL_ACTIVATED: &str = "trial_activated";

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub school_id: Uuid,
    pub email: Option<String>,
    pub plan_name: String,
    pub plan_price: Option<f64>,
    pub student_limit: i32,
    /// Client identity as seen by the server (forwarded IP or peer address).
    pub client: Option<String>,
}

impl AuditEntry {
    /// Build a `trial_activated` entry stamped now.
    #[must_use]
    pub fn trial_activated(
        school_id: Uuid,
        email: Option<String>,
        plan_name: String,
        plan_price: Option<f64>,
        student_limit: i32,
        client: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event: TRIAL_ACTIVATED.to_owned(),
            school_id,
            email,
            plan_name,
            plan_price,
            student_limit,
            client,
        }
    }
}

/// An insert-only destination for audit entries.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    /// The sink's name (for log output).
    fn name(&self) -> &str;

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry could not be persisted.
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Best-effort fan-out to all configured sinks.
#[derive(Default)]
pub struct AuditLog {
    sinks: RwLock<Vec<Arc<dyn AuditSink>>>,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    pub async fn add_sink(&self, sink: Arc<dyn AuditSink>) {
        self.sinks.write().await.push(sink);
    }

    /// Check whether any sinks are configured.
    pub async fn has_sinks(&self) -> bool {
        !self.sinks.read().await.is_empty()
    }

    /// Write `entry` to every sink. Failures are logged, never returned.
    pub async fn record(&self, entry: &AuditEntry) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            if let Err(e) = sink.record(entry).await {
                warn!(
                    sink = sink.name(),
                    school_id = %entry.school_id,
                    error = %redact::scrub(&e.to_string()),
                    "audit sink failed; entry dropped"
                );
            }
        }
    }

    /// Spawn [`record`](Self::record) onto the runtime and return immediately.
    pub fn record_detached(self: &Arc<Self>, entry: AuditEntry) -> tokio::task::JoinHandle<()> {
        let log = Arc::clone(self);
        tokio::spawn(async move {
            log.record(&entry).await;
        })
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}
