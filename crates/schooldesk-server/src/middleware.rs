//! Request middleware for the `SchoolDesk` API server.
//!
//! [`rate_limit`] gates a route on the shared [`RateLimiter`], keyed by
//! client identity and matched route, and stamps `X-RateLimit-*` headers on
//! the response. [`ClientIdentity`] exposes the same client identity to
//! handlers.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts, MatchedPath, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use schooldesk_core::ratelimit::{RateLimitDecision, RateLimiter};

use crate::error::{AppError, retry_after_secs};
use crate::state::AppState;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Identity used when nothing identifies the caller.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Resolve the caller's identity from proxy headers or the peer address.
///
/// Order: first `X-Forwarded-For` entry, `X-Real-IP`, peer socket address,
/// then [`ANONYMOUS_CLIENT`].
#[must_use]
pub fn client_identity(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header(X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_owned();
    }
    if let Some(real_ip) = header(X_REAL_IP) {
        return real_ip.to_owned();
    }
    peer.map_or_else(
        || ANONYMOUS_CLIENT.to_owned(),
        |ConnectInfo(addr)| addr.ip().to_string(),
    )
}

/// Extractor yielding the caller's identity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(Self(client_identity(&parts.headers, peer)))
    }
}

/// Write the `X-RateLimit-*` headers for `decision`.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(retry_after_secs(decision)));
}

/// Middleware that rejects requests over the client's budget with 429.
pub async fn rate_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let client = client_identity(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_owned(), |p| p.as_str().to_owned());
    let key = format!("{client}:{route}");

    let decision = state.rate_limiter.check(&key).await;
    if !decision.allowed {
        warn!(client = %client, route = %route, "rate limit exceeded");
        return AppError::RateLimited(decision).into_response();
    }

    let mut response = next.run(req).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    response
}
