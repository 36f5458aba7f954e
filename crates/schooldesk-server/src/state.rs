//! Shared application state for the `SchoolDesk` API server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;
use std::time::Duration;

use schooldesk_core::audit::AuditLog;
use schooldesk_core::ratelimit::{FixedWindowLimiter, RateLimiter};
use schooldesk_core::trial::TrialPolicy;
use schooldesk_store::SchoolStore;

use crate::config::{DEFAULT_ONBOARDING_URL, ServerConfig};

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// School store (`None` when no store is configured).
    pub schools: Option<Arc<dyn SchoolStore>>,
    /// Per-client limiter for the lookup route.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Best-effort trial audit trail.
    pub audit: Arc<AuditLog>,
    /// Trial terms applied on signup.
    pub trial_policy: TrialPolicy,
    /// Onboarding link quoted in not-found and validation messages.
    pub onboarding_url: String,
}

impl AppState {
    /// State with the given store and defaults for everything else.
    #[must_use]
    pub fn new(schools: Option<Arc<dyn SchoolStore>>) -> Self {
        let defaults = ServerConfig::default();
        Self {
            schools,
            rate_limiter: Arc::new(
                FixedWindowLimiter::new(
                    defaults.rate_limit_max,
                    Duration::from_secs(defaults.rate_limit_window_secs),
                )
                .with_capacity(defaults.rate_limit_capacity),
            ),
            audit: Arc::new(AuditLog::new()),
            trial_policy: TrialPolicy::default(),
            onboarding_url: DEFAULT_ONBOARDING_URL.to_owned(),
        }
    }

    /// `message` followed by directions to the onboarding flow.
    #[must_use]
    pub fn with_onboarding_hint(&self, message: &str) -> String {
        format!(
            "{message} Please complete school onboarding at {} first.",
            self.onboarding_url
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("onboarding_url", &self.onboarding_url)
            .field("trial_policy", &self.trial_policy)
            .finish_non_exhaustive()
    }
}
