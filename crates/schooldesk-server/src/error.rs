//! HTTP error types for the `SchoolDesk` API server.
//!
//! Every error variant produces a JSON body with a machine-readable `error`
//! field and a human-readable `message`. Internal details are logged through
//! [`redact::scrub`] and never echoed to the client.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use schooldesk_core::ratelimit::RateLimitDecision;
use schooldesk_core::redact;
use schooldesk_store::{School, StoreError, SubscriptionStatus};

use crate::middleware::apply_rate_limit_headers;

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client sent invalid or incomplete input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No school matched the identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The school is already on a trial or paid plan.
    #[error("school already subscribed ({status})")]
    AlreadySubscribed {
        status: SubscriptionStatus,
        plan: Option<String>,
    },

    /// The client exhausted its request budget.
    #[error("rate limited")]
    RateLimited(RateLimitDecision),

    /// A required integration is not configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A store call failed. `message` is safe to return; `detail` is logged.
    #[error("{message}")]
    Dependency { message: String, detail: String },

    /// Unexpected failure. Logged, answered with a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Rejection for a school whose status blocks a new trial.
    #[must_use]
    pub fn already_subscribed(school: &School) -> Self {
        Self::AlreadySubscribed {
            status: school.subscription_status.clone(),
            plan: school.subscription_plan.clone(),
        }
    }

    /// Wrap a store failure as an opaque internal error.
    #[must_use]
    pub fn internal_store(context: &str, err: &StoreError) -> Self {
        Self::Internal(format!("{context}: {err}: {}", err.reason()))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Dependency {
            message: err.to_string(),
            detail: err.reason().to_owned(),
        }
    }
}

/// JSON error response body.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "bad_request",
                    message,
                    ..ErrorBody::default()
                },
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "not_found",
                    message,
                    ..ErrorBody::default()
                },
            ),
            Self::AlreadySubscribed { status, plan } => {
                let message = if status == SubscriptionStatus::Trial {
                    "This school already has an active trial."
                } else {
                    "This school already has an active subscription."
                };
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        error: "already_subscribed",
                        message: message.to_owned(),
                        current_status: Some(status.to_string()),
                        current_plan: plan,
                        ..ErrorBody::default()
                    },
                )
            }
            Self::RateLimited(decision) => {
                let body = ErrorBody {
                    error: "rate_limited",
                    message: "Too many requests. Please try again later.".to_owned(),
                    limit: Some(decision.limit),
                    remaining: Some(decision.remaining),
                    reset_after_secs: Some(retry_after_secs(&decision)),
                    ..ErrorBody::default()
                };
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                apply_rate_limit_headers(response.headers_mut(), &decision);
                response.headers_mut().insert(
                    axum::http::header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(&decision)),
                );
                return response;
            }
            Self::Configuration(msg) => {
                tracing::error!(error = %redact::scrub(&msg), "integration not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "configuration_error",
                        message: "Service is not configured. Please try again later.".to_owned(),
                        ..ErrorBody::default()
                    },
                )
            }
            Self::Dependency { message, detail } => {
                tracing::error!(
                    error = %message,
                    detail = %redact::scrub(&detail),
                    "school store call failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal_error",
                        message,
                        ..ErrorBody::default()
                    },
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %redact::scrub(&msg), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal_error",
                        message: "internal server error".to_owned(),
                        ..ErrorBody::default()
                    },
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Whole seconds until the window resets, at least one.
pub(crate) fn retry_after_secs(decision: &RateLimitDecision) -> u64 {
    let reset = decision.reset_after;
    let secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
    secs.max(1)
}
