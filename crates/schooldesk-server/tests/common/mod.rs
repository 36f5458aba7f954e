//! Shared fixtures for router-level tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use schooldesk_core::ratelimit::FixedWindowLimiter;
use schooldesk_server::routes;
use schooldesk_server::state::AppState;
use schooldesk_store::{
    MemorySchoolStore, School, SchoolStore, StoreError, SubscriptionStatus, TrialActivation,
    TrialActivationRequest,
};

pub const ONBOARDING_URL: &str = "https://app.schooldesk.io/onboarding";

pub fn school(code: &str, status: SubscriptionStatus) -> School {
    School {
        id: Uuid::new_v4(),
        school_code: code.to_owned(),
        name: "Greenfield Academy".to_owned(),
        email: Some("office@greenfield.example".to_owned()),
        phone: Some("+254 712 345678".to_owned()),
        address: Some("12 Ngong Road".to_owned()),
        city: Some("Nairobi".to_owned()),
        country: Some("KE".to_owned()),
        subscription_status: status,
        subscription_plan: None,
        plan_type: None,
        student_count: 180,
        student_limit: None,
        trial_end_date: None,
        next_billing_date: None,
        billing_customer_id: Some("cus_9f8e7d".to_owned()),
        internal_notes: Some("VIP - discount agreed".to_owned()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Memory store that counts which operations were called.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemorySchoolStore,
    pub by_id: AtomicUsize,
    pub by_code: AtomicUsize,
    pub activations: AtomicUsize,
}

impl CountingStore {
    pub async fn with(schools: Vec<School>) -> Arc<Self> {
        let store = Self::default();
        for s in schools {
            store.inner.insert(s).await;
        }
        Arc::new(store)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SchoolStore for CountingStore {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<School>, StoreError> {
        self.by_id.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<School>, StoreError> {
        self.by_code.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_code(code).await
    }

    async fn activate_trial(
        &self,
        id: Uuid,
        request: &TrialActivationRequest,
    ) -> Result<TrialActivation, StoreError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.inner.activate_trial(id, request).await
    }
}

/// Store whose every call fails with a driver-style message.
#[derive(Debug)]
pub struct FailingStore;

fn failure(operation: &'static str) -> StoreError {
    StoreError::Query {
        operation,
        reason: "connection refused: host=db.internal password=hunter2".to_owned(),
    }
}

#[async_trait::async_trait]
impl SchoolStore for FailingStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<School>, StoreError> {
        Err(failure("lookup by id"))
    }

    async fn find_by_code(&self, _code: &str) -> Result<Option<School>, StoreError> {
        Err(failure("lookup by code"))
    }

    async fn activate_trial(
        &self,
        _id: Uuid,
        _request: &TrialActivationRequest,
    ) -> Result<TrialActivation, StoreError> {
        Err(failure("trial activation"))
    }
}

pub fn state(store: Option<Arc<dyn SchoolStore>>) -> AppState {
    AppState::new(store)
}

pub fn app(state: AppState) -> Router {
    routes::router(Arc::new(state))
}

pub fn app_with_limit(store: Arc<dyn SchoolStore>, max: u32) -> Router {
    let mut s = state(Some(store));
    s.rate_limiter = Arc::new(FixedWindowLimiter::new(max, Duration::from_secs(60)));
    app(s)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_from(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}
