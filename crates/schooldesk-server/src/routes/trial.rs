//! Trial signup route.
//!
//! - `POST /api/trial/signup`: start a capped trial for an onboarded school
//!
//! The `none → trial` transition is applied by the store as a conditional
//! update, so a school that became subscribed between the read and the
//! write is rejected the same way as one that was subscribed all along.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use schooldesk_core::audit::AuditEntry;
use schooldesk_core::identifier::SchoolIdentifier;
use schooldesk_core::trial::TrialSignup;
use schooldesk_store::TrialActivation;

use crate::error::AppError;
use crate::middleware::ClientIdentity;
use crate::projection::TrialSchool;
use crate::routes::TRIAL_CONCURRENCY_LIMIT;
use crate::state::AppState;

/// Response for a successful signup.
#[derive(Debug, Serialize)]
pub struct TrialSignupResponse {
    pub success: bool,
    pub message: String,
    pub school: TrialSchool,
}

/// Build the trial router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trial/signup", post(signup))
        .layer(tower::limit::ConcurrencyLimitLayer::new(TRIAL_CONCURRENCY_LIMIT))
}

/// `POST /api/trial/signup`: activate a trial.
async fn signup(
    State(state): State<Arc<AppState>>,
    ClientIdentity(client): ClientIdentity,
    payload: Result<Json<TrialSignup>, JsonRejection>,
) -> Result<Json<TrialSignupResponse>, AppError> {
    let Json(signup) = payload.map_err(|e| {
        debug!(error = %e, "rejected trial signup body");
        AppError::BadRequest(
            state.with_onboarding_hint("Request body must be a JSON object with a school ID."),
        )
    })?;

    let identifier = SchoolIdentifier::parse(signup.school_id.as_deref().unwrap_or_default())
        .map_err(|_| AppError::BadRequest(state.with_onboarding_hint("School ID is required.")))?;

    let Some(store) = state.schools.clone() else {
        return Err(AppError::Configuration(
            "trial signup requires a school store".to_owned(),
        ));
    };

    let school = identifier
        .resolve(store.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound(state.with_onboarding_hint("School not found.")))?;

    if !school.subscription_status.permits_trial() {
        info!(
            school_id = %school.id,
            status = %school.subscription_status,
            "trial signup rejected: already subscribed"
        );
        return Err(AppError::already_subscribed(&school));
    }

    let request = state
        .trial_policy
        .activation_request(&signup, Utc::now())
        .map_err(|e| AppError::Configuration(e.to_string()))?;
    let updated = match store.activate_trial(school.id, &request).await? {
        TrialActivation::Activated(updated) => updated,
        TrialActivation::AlreadySubscribed(current) => {
            info!(school_id = %current.id, "trial signup lost race to another activation");
            return Err(AppError::already_subscribed(&current));
        }
        TrialActivation::NotFound => {
            return Err(AppError::NotFound(
                state.with_onboarding_hint("School not found."),
            ));
        }
    };

    info!(
        school_id = %updated.id,
        student_limit = request.student_limit,
        trial_end_date = %request.trial_end_date,
        "trial activated"
    );

    state.audit.record_detached(AuditEntry::trial_activated(
        updated.id,
        request.email.clone().or_else(|| updated.email.clone()),
        request.plan_name.clone(),
        signup.plan_price,
        request.student_limit,
        Some(client),
    ));

    Ok(Json(TrialSignupResponse {
        success: true,
        message: "Trial activated successfully.".to_owned(),
        school: TrialSchool::from(&updated),
    }))
}
