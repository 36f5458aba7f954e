//! School record store for `SchoolDesk`.
//!
//! This crate defines the [`SchoolStore`] trait: the narrow interface the
//! marketing site uses to talk to the managed database that owns school
//! accounts. The site never creates or deletes schools; it only reads them
//! and performs the one guarded `none → trial` mutation.
//!
//! Two implementations are provided:
//!
//! - [`PostgresSchoolStore`]: production store backed by `PostgreSQL` (feature `postgres`)
//! - [`MemorySchoolStore`]: in-memory, for local development and tests

mod error;
mod memory;
mod model;
#[cfg(feature = "postgres")]
mod postgres;

pub use error::StoreError;
pub use memory::MemorySchoolStore;
pub use model::{
    School, SubscriptionStatus, TRIAL_BLOCKING_STATUSES, TrialActivation, TrialActivationRequest,
};
#[cfg(feature = "postgres")]
pub use postgres::PostgresSchoolStore;

use uuid::Uuid;

/// Read/write access to school records.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SchoolStore: Send + Sync + 'static {
    /// Short backend name for health output and logs.
    fn backend_name(&self) -> &'static str;

    /// Fetch a school by primary id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the backend fails.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError>;

    /// Fetch a school by its code. Callers pass the code already uppercased.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the backend fails.
    async fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError>;

    /// Move a school into `trial`, but only if its status still permits it.
    ///
    /// The status check and the write happen atomically, so two concurrent
    /// calls for the same school produce at most one
    /// [`TrialActivation::Activated`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the backend fails.
    async fn activate_trial(
        &self,
        id: Uuid,
        request: &TrialActivationRequest,
    ) -> Result<TrialActivation, StoreError>;
}
