//! JSON-lines audit sink.
//!
//! One [`AuditEntry`] per line, appended to the file named by
//! `SCHOOLDESK_AUDIT_FILE`. The file is opened when the sink is built so a
//! bad path stops the server at startup instead of failing every signup.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::AuditError;

/// Appends trial audit entries to a local file.
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open `path` for appending, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::SinkFailure`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_failure(&path, "open", &e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path entries are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_failure(path: &Path, op: &str, err: &std::io::Error) -> AuditError {
    AuditError::SinkFailure {
        name: "file".to_owned(),
        reason: format!("{op} {}: {err}", path.display()),
    }
}

#[async_trait::async_trait]
impl AuditSink for FileAuditSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "file"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(entry).map_err(|e| AuditError::Serialization {
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        // One write per entry keeps lines whole under concurrent signups.
        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|e| io_failure(&self.path, "append to", &e))?;
        file.flush()
            .await
            .map_err(|e| io_failure(&self.path, "flush", &e))
    }
}

impl std::fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
