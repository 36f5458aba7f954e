//! Router-level tests for `POST /api/trial/signup`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tokio::sync::{Mutex, mpsc};

use schooldesk_core::audit::{AuditEntry, AuditSink};
use schooldesk_core::error::AuditError;
use schooldesk_core::trial::TrialPolicy;
use schooldesk_store::{SchoolStore, SubscriptionStatus};

use common::{CountingStore, FailingStore, ONBOARDING_URL, app, post_json, school, send, state};

const SIGNUP: &str = "/api/trial/signup";

struct FailingSink {
    calls: mpsc::UnboundedSender<()>,
}

#[async_trait::async_trait]
impl AuditSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        let _ = self.calls.send(());
        Err(AuditError::SinkFailure {
            name: "failing".to_owned(),
            reason: "insert rejected".to_owned(),
        })
    }
}

struct HangingSink;

#[async_trait::async_trait]
impl AuditSink for HangingSink {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<AuditEntry>>,
}

#[async_trait::async_trait]
impl AuditSink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}

#[tokio::test]
async fn activates_trial_and_caps_students() {
    let s = school("GRN-01", SubscriptionStatus::None);
    let id = s.id;
    let store = CountingStore::with(vec![s]).await;
    let app = app(state(Some(store.clone())));

    let (status, _, body) = send(
        &app,
        post_json(
            SIGNUP,
            &json!({"schoolId": id.to_string(), "planName": "growth", "studentCount": 500}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["school"]["subscription_status"], "trial");
    assert_eq!(body["school"]["student_limit"], 75);
    assert_eq!(body["school"]["subscription_plan"], "growth");
    assert!(body["school"].get("email").is_none());

    let stored = store.inner.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.student_limit, Some(75));
    assert_eq!(stored.subscription_status, SubscriptionStatus::Trial);
    assert!(stored.trial_end_date.is_some());
}

#[tokio::test]
async fn student_limit_defaults_to_ceiling_and_keeps_smaller_counts() {
    let a = school("AAA", SubscriptionStatus::None);
    let b = school("BBB", SubscriptionStatus::Expired);
    let store = CountingStore::with(vec![a, b]).await;
    let app = app(state(Some(store)));

    let (status, _, body) = send(&app, post_json(SIGNUP, &json!({"schoolId": "aaa"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["school"]["student_limit"], 75);

    let (status, _, body) =
        send(&app, post_json(SIGNUP, &json!({"schoolId": "BBB", "studentCount": 40}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["school"]["student_limit"], 40);
}

#[tokio::test]
async fn subscribed_school_is_rejected_without_mutation() {
    for status in [SubscriptionStatus::Trial, SubscriptionStatus::Active] {
        let mut s = school("GRN-01", status.clone());
        s.subscription_plan = Some("growth".to_owned());
        let before = s.clone();
        let store = CountingStore::with(vec![s]).await;
        let app = app(state(Some(store.clone())));

        let (code, _, body) = send(
            &app,
            post_json(SIGNUP, &json!({"schoolId": "GRN-01", "studentCount": 10})),
        )
        .await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "already_subscribed");
        assert_eq!(body["currentStatus"], status.as_str());
        assert_eq!(body["currentPlan"], "growth");
        assert_eq!(CountingStore::count(&store.activations), 0);
        assert_eq!(store.inner.find_by_id(before.id).await.unwrap().unwrap(), before);
    }
}

#[tokio::test]
async fn missing_school_id_is_400_whatever_else_is_sent() {
    let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
    let app = app(state(Some(store.clone())));

    let bodies = [
        json!({}),
        json!({"email": "head@greenfield.example", "schoolName": "Greenfield", "studentCount": 10}),
        json!({"schoolId": ""}),
        json!({"schoolId": "   ", "planName": "growth"}),
        json!({"schoolId": null, "phone": "+254700000000"}),
        json!({"studentCount": "lots"}),
    ];
    for body in &bodies {
        let (status, _, resp) = send(&app, post_json(SIGNUP, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(resp["message"].as_str().unwrap().contains(ONBOARDING_URL), "{body}");
    }

    let not_json = Request::builder()
        .method("POST")
        .uri(SIGNUP)
        .header("content-type", "application/json")
        .body(Body::from("schoolId=GRN-01"))
        .unwrap();
    let (status, _, _) = send(&app, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(CountingStore::count(&store.activations), 0);
}

#[tokio::test]
async fn unknown_school_is_404_with_onboarding_hint() {
    let store = CountingStore::with(vec![]).await;
    let app = app(state(Some(store)));

    let (status, _, body) = send(&app, post_json(SIGNUP, &json!({"schoolId": "NOPE"}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains(ONBOARDING_URL));
}

#[tokio::test]
async fn unconfigured_store_is_a_configuration_error() {
    let app = app(state(None));
    let (status, _, body) = send(&app, post_json(SIGNUP, &json!({"schoolId": "GRN-01"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration_error");
}

#[tokio::test]
async fn store_failure_returns_safe_message() {
    let app = app(state(Some(Arc::new(FailingStore))));
    let (status, _, body) = send(&app, post_json(SIGNUP, &json!({"schoolId": "GRN-01"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "school store lookup by code failed");
    assert!(!body.to_string().contains("hunter2"));
}

#[tokio::test]
async fn audit_failure_does_not_change_response() {
    let s = school("GRN-01", SubscriptionStatus::None);
    let store = CountingStore::with(vec![s]).await;
    let state = state(Some(store));
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.audit.add_sink(Arc::new(FailingSink { calls: tx })).await;
    let app = app(state);

    let (status, _, body) = send(
        &app,
        post_json(SIGNUP, &json!({"schoolId": "GRN-01", "studentCount": 90})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Trial activated successfully.");
    assert_eq!(body["school"]["student_limit"], 75);

    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn hanging_audit_sink_does_not_block_response() {
    let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
    let state = state(Some(store));
    state.audit.add_sink(Arc::new(HangingSink)).await;
    let app = app(state);

    let (status, _, _) = tokio::time::timeout(
        Duration::from_secs(5),
        send(&app, post_json(SIGNUP, &json!({"schoolId": "GRN-01"}))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn audit_entry_records_signup() {
    let s = school("GRN-01", SubscriptionStatus::Cancelled);
    let id = s.id;
    let store = CountingStore::with(vec![s]).await;
    let state = state(Some(store));
    let sink = Arc::new(CollectingSink::default());
    state.audit.add_sink(sink.clone()).await;
    let app = app(state);

    let (status, _, _) = send(
        &app,
        post_json(
            SIGNUP,
            &json!({"schoolId": "GRN-01", "email": "head@greenfield.example", "planPrice": 49.0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let entry = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(e) = sink.entries.lock().await.first().cloned() {
                return e;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(entry.school_id, id);
    assert_eq!(entry.event, "trial_activated");
    assert_eq!(entry.email.as_deref(), Some("head@greenfield.example"));
    assert_eq!(entry.plan_price, Some(49.0));
    assert_eq!(entry.student_limit, 75);
    assert_eq!(entry.client.as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn concurrent_signups_activate_once() {
    let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
    let store_dyn: Arc<dyn SchoolStore> = store.clone();
    let app = app(state(Some(store_dyn)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            send(&app, post_json(SIGNUP, &json!({"schoolId": "GRN-01"}))).await.0
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count();
    assert_eq!(ok, 1, "{statuses:?}");
    assert_eq!(rejected, 7, "{statuses:?}");
}

#[tokio::test]
async fn loosely_typed_numbers_still_activate() {
    let bodies = [
        (json!({"schoolId": "GRN-01", "studentCount": 40.0}), 40),
        (json!({"schoolId": "GRN-01", "studentCount": "40"}), 40),
        (json!({"schoolId": "GRN-01", "studentCount": "120"}), 75),
        (json!({"schoolId": "GRN-01", "studentCount": "lots"}), 75),
        (json!({"schoolId": "GRN-01", "planPrice": "49.00"}), 75),
    ];
    for (body, limit) in bodies {
        let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
        let app = app(state(Some(store.clone())));

        let (status, _, resp) = send(&app, post_json(SIGNUP, &body)).await;

        assert_eq!(status, StatusCode::OK, "{body}: {resp}");
        assert_eq!(resp["school"]["student_limit"], limit, "{body}");
        assert_eq!(CountingStore::count(&store.activations), 1, "{body}");
    }
}

#[tokio::test]
async fn audit_keeps_parseable_price_and_drops_the_rest() {
    for (price, expected) in [(json!("49.00"), Some(49.0)), (json!("free"), None)] {
        let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
        let state = state(Some(store));
        let sink = Arc::new(CollectingSink::default());
        state.audit.add_sink(sink.clone()).await;
        let app = app(state);

        let (status, _, _) = send(
            &app,
            post_json(SIGNUP, &json!({"schoolId": "GRN-01", "planPrice": price})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let entry = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(e) = sink.entries.lock().await.first().cloned() {
                    return e;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(entry.plan_price, expected);
    }
}

#[tokio::test]
async fn malformed_body_is_not_reported_as_missing_id() {
    let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
    let app = app(state(Some(store)));

    let not_json = Request::builder()
        .method("POST")
        .uri(SIGNUP)
        .header("content-type", "application/json")
        .body(Body::from("{\"schoolId\": \"GRN-01\""))
        .unwrap();
    let (status, _, body) = send(&app, not_json).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Request body must be a JSON object"), "{message}");
    assert!(message.contains(ONBOARDING_URL));

    let (_, _, body) = send(&app, post_json(SIGNUP, &json!({"studentCount": 10}))).await;
    assert!(body["message"].as_str().unwrap().starts_with("School ID is required."));
}

#[tokio::test]
async fn out_of_range_trial_length_is_a_configuration_error() {
    let store = CountingStore::with(vec![school("GRN-01", SubscriptionStatus::None)]).await;
    let mut state = state(Some(store.clone()));
    state.trial_policy = TrialPolicy::new(i64::MAX);
    let app = app(state);

    let (status, _, body) = send(&app, post_json(SIGNUP, &json!({"schoolId": "GRN-01"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration_error");
    assert_eq!(CountingStore::count(&store.activations), 0);
}
