//! HTTP route handlers.
//!
//! Routes live under `/api`. Only the school lookup route is rate limited;
//! the signup route is protected by a concurrency cap instead.

pub mod health;
pub mod school;
pub mod trial;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Concurrent trial signups allowed per process.
pub const TRIAL_CONCURRENCY_LIMIT: usize = 32;

/// Build the API router with its state applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(school::router(Arc::clone(&state)))
        .merge(trial::router())
        .merge(health::router())
        .with_state(state)
}
