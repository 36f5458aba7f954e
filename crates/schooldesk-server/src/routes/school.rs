//! School lookup route.
//!
//! - `GET /api/school/{school_id}`: look up by UUID or school code

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::middleware as axum_mw;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use schooldesk_core::identifier::SchoolIdentifier;

use crate::error::AppError;
use crate::middleware::rate_limit;
use crate::projection::SchoolProfile;
use crate::state::AppState;

/// Build the school lookup router.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/school/{school_id}", get(get_school))
        .route("/api/school", get(missing_school_id))
        .route("/api/school/", get(missing_school_id))
        .route_layer(axum_mw::from_fn_with_state(state, rate_limit))
}

/// `GET /api/school/{school_id}`: return the public profile of a school.
async fn get_school(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> Result<Json<SchoolProfile>, AppError> {
    let identifier = SchoolIdentifier::parse(&school_id)
        .map_err(|_| AppError::BadRequest(state.with_onboarding_hint("School ID is required.")))?;

    let Some(store) = state.schools.as_deref() else {
        return Err(AppError::Internal(
            "school lookup attempted without a configured store".to_owned(),
        ));
    };

    debug!(identifier = %identifier, "looking up school");
    let school = identifier
        .resolve(store)
        .await
        .map_err(|e| AppError::internal_store("school lookup", &e))?
        .ok_or_else(|| AppError::NotFound(state.with_onboarding_hint("School not found.")))?;

    Ok(Json(SchoolProfile::from(&school)))
}

/// `GET /api/school`: no identifier supplied.
async fn missing_school_id(State(state): State<Arc<AppState>>) -> AppError {
    AppError::BadRequest(state.with_onboarding_hint("School ID is required."))
}
