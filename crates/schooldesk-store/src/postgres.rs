//! `PostgreSQL` school store.
//!
//! Reads and writes the `schools` table of the managed database. The table
//! is created if it does not exist so a fresh local database works out of
//! the box; in production the schema is owned by the hosted backend.
//!
//! Feature-gated behind `postgres`.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{
    School, SchoolStore, StoreError, TRIAL_BLOCKING_STATUSES, TrialActivation,
    TrialActivationRequest,
};

const CREATE_SCHOOLS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schools (\
    id                  UUID        PRIMARY KEY DEFAULT gen_random_uuid(), \
    school_code         TEXT        NOT NULL UNIQUE, \
    name                TEXT        NOT NULL, \
    email               TEXT, \
    phone               TEXT, \
    address             TEXT, \
    city                TEXT, \
    country             TEXT, \
    subscription_status TEXT        NOT NULL DEFAULT 'none', \
    subscription_plan   TEXT, \
    plan_type           TEXT, \
    student_count       INTEGER     NOT NULL DEFAULT 0, \
    student_limit       INTEGER, \
    trial_end_date      TIMESTAMPTZ, \
    next_billing_date   TIMESTAMPTZ, \
    billing_customer_id TEXT, \
    internal_notes      TEXT, \
    created_at          TIMESTAMPTZ NOT NULL DEFAULT now(), \
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT now()\
)";

/// A school store backed by `PostgreSQL`.
///
/// # Examples
///
/// ```no_run
/// # use schooldesk_store::PostgresSchoolStore;
/// # #[tokio::main]
/// # async fn main() {
/// let store = PostgresSchoolStore::connect("postgres://localhost/schooldesk").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresSchoolStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresSchoolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSchoolStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresSchoolStore {
    /// Connect and make sure the `schools` table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] if the connection or table creation fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connect {
                reason: e.to_string(),
            })?;

        sqlx::query(CREATE_SCHOOLS_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Connect {
                reason: format!("migration failed: {e}"),
            })?;

        Ok(Self { pool })
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::Query {
        operation,
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl SchoolStore for PostgresSchoolStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err("lookup by id"))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError> {
        sqlx::query_as::<_, School>("SELECT * FROM schools WHERE upper(school_code) = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err("lookup by code"))
    }

    async fn activate_trial(
        &self,
        id: Uuid,
        request: &TrialActivationRequest,
    ) -> Result<TrialActivation, StoreError> {
        let blocking: Vec<String> = TRIAL_BLOCKING_STATUSES
            .iter()
            .map(|s| (*s).to_owned())
            .collect();

        // The status guard lives in the WHERE clause so the check and the
        // write are one statement.
        let updated = sqlx::query_as::<_, School>(
            r"UPDATE schools SET
                subscription_status = 'trial',
                subscription_plan   = $2,
                plan_type           = 'trial',
                student_limit       = $3,
                trial_end_date      = $4,
                next_billing_date   = $4,
                email               = COALESCE($5, email),
                name                = COALESCE($6, name),
                phone               = COALESCE($7, phone),
                updated_at          = now()
              WHERE id = $1 AND lower(subscription_status) <> ALL($8)
              RETURNING *",
        )
        .bind(id)
        .bind(&request.plan_name)
        .bind(request.student_limit)
        .bind(request.trial_end_date)
        .bind(request.email.as_deref())
        .bind(request.name.as_deref())
        .bind(request.phone.as_deref())
        .bind(&blocking)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err("trial activation"))?;

        if let Some(school) = updated {
            return Ok(TrialActivation::Activated(school));
        }

        Ok(match self.find_by_id(id).await? {
            Some(current) => TrialActivation::AlreadySubscribed(current),
            None => TrialActivation::NotFound,
        })
    }
}
