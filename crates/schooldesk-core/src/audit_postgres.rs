//! `PostgreSQL` audit sink.
//!
//! Inserts entries into the `trial_audit_log` table, which lives next to the
//! `schools` table in the managed database. Insert-only.

use sqlx::PgPool;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::AuditError;

const CREATE_AUDIT_TABLE: &str = "CREATE TABLE IF NOT EXISTS trial_audit_log (\
    id            UUID             PRIMARY KEY, \
    recorded_at   TIMESTAMPTZ      NOT NULL, \
    event         TEXT             NOT NULL, \
    school_id     UUID             NOT NULL, \
    email         TEXT, \
    plan_name     TEXT             NOT NULL, \
    plan_price    DOUBLE PRECISION, \
    student_limit INTEGER          NOT NULL, \
    client        TEXT\
)";

/// Audit sink backed by a `PostgreSQL` table.
#[derive(Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    /// Wrap an existing pool and make sure the audit table exists.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::SinkFailure`] if the table cannot be created.
    pub async fn new(pool: PgPool) -> Result<Self, AuditError> {
        sqlx::query(CREATE_AUDIT_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| AuditError::SinkFailure {
                name: "postgres".to_owned(),
                reason: format!("migration failed: {e}"),
            })?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl AuditSink for PostgresAuditSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "postgres"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        sqlx::query(
            r"INSERT INTO trial_audit_log
                (id, recorded_at, event, school_id, email, plan_name, plan_price, student_limit, client)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.timestamp)
        .bind(&entry.event)
        .bind(entry.school_id)
        .bind(entry.email.as_deref())
        .bind(&entry.plan_name)
        .bind(entry.plan_price)
        .bind(entry.student_limit)
        .bind(entry.client.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::SinkFailure {
            name: "postgres".to_owned(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

impl std::fmt::Debug for PostgresAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAuditSink")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}
