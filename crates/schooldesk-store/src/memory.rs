//! In-memory school store.
//!
//! Holds schools in a `HashMap` behind a `RwLock`. Nothing is persisted.
//! Useful for local development (optionally seeded from a JSON file) and for
//! tests that need a real store without a database.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{School, SchoolStore, StoreError, TrialActivation, TrialActivationRequest};

/// An in-memory school store.
///
/// School codes are uppercased on insert so lookups by uppercased code match.
///
/// # Examples
///
/// ```
/// # use schooldesk_store::{MemorySchoolStore, SchoolStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemorySchoolStore::new();
/// assert!(store.find_by_code("NOPE").await.unwrap().is_none());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySchoolStore {
    schools: Arc<RwLock<HashMap<Uuid, School>>>,
}

impl MemorySchoolStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load schools from a JSON array file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Seed`] if the file cannot be read or parsed.
    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let seed_err = |reason: String| StoreError::Seed {
            path: path.display().to_string(),
            reason,
        };

        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| seed_err(e.to_string()))?;
        let schools: Vec<School> =
            serde_json::from_slice(&raw).map_err(|e| seed_err(e.to_string()))?;

        let store = Self::new();
        for school in schools {
            store.insert(school).await;
        }
        tracing::debug!(path = %path.display(), "memory school store seeded");
        Ok(store)
    }

    /// Insert or replace a school.
    pub async fn insert(&self, mut school: School) {
        school.school_code = school.school_code.to_uppercase();
        self.schools.write().await.insert(school.id, school);
    }

    /// Number of schools held.
    pub async fn len(&self) -> usize {
        self.schools.read().await.len()
    }

    /// Whether the store holds no schools.
    pub async fn is_empty(&self) -> bool {
        self.schools.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SchoolStore for MemorySchoolStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        Ok(self.schools.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError> {
        let schools = self.schools.read().await;
        Ok(schools.values().find(|s| s.school_code == code).cloned())
    }

    async fn activate_trial(
        &self,
        id: Uuid,
        request: &TrialActivationRequest,
    ) -> Result<TrialActivation, StoreError> {
        // Check and write under one lock.
        let mut schools = self.schools.write().await;
        let Some(school) = schools.get_mut(&id) else {
            return Ok(TrialActivation::NotFound);
        };

        if !school.subscription_status.permits_trial() {
            return Ok(TrialActivation::AlreadySubscribed(school.clone()));
        }

        school.subscription_status = crate::SubscriptionStatus::Trial;
        school.subscription_plan = Some(request.plan_name.clone());
        school.plan_type = Some("trial".to_owned());
        school.student_limit = Some(request.student_limit);
        school.trial_end_date = Some(request.trial_end_date);
        school.next_billing_date = Some(request.trial_end_date);
        if let Some(email) = &request.email {
            school.email = Some(email.clone());
        }
        if let Some(name) = &request.name {
            school.name.clone_from(name);
        }
        if let Some(phone) = &request.phone {
            school.phone = Some(phone.clone());
        }
        school.updated_at = Utc::now();

        Ok(TrialActivation::Activated(school.clone()))
    }
}
