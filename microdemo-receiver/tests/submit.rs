//! HTTP tests for the receiver
//!
//! Each test serves the real router on a random port, backed by a recording
//! queue fake.

use std::sync::Arc;

use microdemo_receiver::handlers::SUBMIT_ACCEPTED;
use microdemo_receiver::{create_router, ReceiverState, SharedSecret};
use microdemo_test::{init_tracing, Journal, RecordingQueue, TestServer};
use serde_json::{json, Value};

const TOKEN: &str = "SECRET_TOKEN";

struct Harness {
    server: TestServer,
    journal: Journal,
    queue: Arc<RecordingQueue>,
}

async fn start() -> Harness {
    init_tracing();
    let journal = Journal::default();
    let queue = Arc::new(RecordingQueue::new(journal.clone()));
    let state = ReceiverState::new(queue.clone(), SharedSecret::new(TOKEN));
    let server = TestServer::start(create_router(state)).await.unwrap();
    Harness {
        server,
        journal,
        queue,
    }
}

fn valid_data() -> Value {
    json!({
        "email_sender": "alice@example.com",
        "email_subject": "Quarterly report",
        "email_timestream": "2024-03-01T12:30:45.123Z"
    })
}

// =============================================================================
// SUCCESS
// =============================================================================

#[tokio::test]
async fn test_valid_submission_is_enqueued_once() {
    let h = start().await;
    let data = valid_data();

    let response = h.server.client().submit(TOKEN, data.clone()).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, SUBMIT_ACCEPTED);
    assert!(response.request_id.is_some());

    let bodies = h.journal.enqueued_bodies();
    assert_eq!(bodies, vec![data.to_string()]);
    let parsed: Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(parsed, data);
    assert_eq!(h.queue.inner().visible_count(), 1);
}

#[tokio::test]
async fn test_extra_fields_are_forwarded() {
    let h = start().await;
    let mut data = valid_data();
    data["email_body"] = json!("Numbers attached.");
    data["labels"] = json!(["finance", "q1"]);

    let response = h.server.client().submit(TOKEN, data.clone()).await.unwrap();

    assert_eq!(response.status, 200);
    let parsed: Value = serde_json::from_str(&h.journal.enqueued_bodies()[0]).unwrap();
    assert_eq!(parsed, data);
}

#[tokio::test]
async fn test_timestamp_variants_accepted() {
    let h = start().await;

    for ts in [
        "2024-03-01T12:30:45",
        "2024-03-01T12:30:45Z",
        "2024-03-01T12:30:45.123",
    ] {
        let mut data = valid_data();
        data["email_timestream"] = json!(ts);
        let response = h.server.client().submit(TOKEN, data).await.unwrap();
        assert_eq!(response.status, 200, "timestamp {ts} should be accepted");
    }

    assert_eq!(h.journal.enqueued_bodies().len(), 3);
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

#[tokio::test]
async fn test_wrong_tokens_are_rejected_without_enqueue() {
    let h = start().await;
    let client = h.server.client();

    for token in ["", "secret_token", "SECRET_TOKEN ", "SECRET", "SECRET_TOKEN_X"] {
        let response = client.submit(token, valid_data()).await.unwrap();
        assert_eq!(response.status, 403, "token {token:?} should be rejected");
        assert_eq!(response.json().unwrap()["code"], "AuthorizationFailure");
    }

    assert!(h.journal.enqueued_bodies().is_empty());
    assert!(h.queue.inner().is_empty());
}

#[tokio::test]
async fn test_missing_or_non_string_token() {
    let h = start().await;
    let client = h.server.client();

    let missing = client
        .submit_raw(json!({ "data": valid_data() }).to_string())
        .await
        .unwrap();
    assert_eq!(missing.status, 403);

    let numeric = client
        .submit_raw(json!({ "token": 42, "data": valid_data() }).to_string())
        .await
        .unwrap();
    assert_eq!(numeric.status, 403);

    assert!(h.journal.calls().is_empty());
}

#[tokio::test]
async fn test_token_checked_before_validation() {
    let h = start().await;

    let response = h
        .server
        .client()
        .submit("wrong", json!({ "email_sender": "nope" }))
        .await
        .unwrap();

    assert_eq!(response.status, 403);
    assert!(h.journal.calls().is_empty());
}

// =============================================================================
// VALIDATION
// =============================================================================

#[tokio::test]
async fn test_invalid_emails_are_rejected_without_enqueue() {
    let h = start().await;
    let client = h.server.client();

    for email in ["plainaddress", "a@b", "@example.com", "a b@example.com", ""] {
        let mut data = valid_data();
        data["email_sender"] = json!(email);

        let response = client.submit(TOKEN, data).await.unwrap();
        assert_eq!(response.status, 400, "email {email:?} should be rejected");

        let body = response.json().unwrap();
        assert_eq!(body["code"], "ValidationFailure");
        assert_eq!(body["fields"][0]["field"], "email_sender");
    }

    assert!(h.journal.enqueued_bodies().is_empty());
}

#[tokio::test]
async fn test_invalid_timestamps_are_rejected_without_enqueue() {
    let h = start().await;
    let client = h.server.client();

    for ts in ["2024-03-01", "01/03/2024 12:30", "2024-03-01T12:30:45+02:00", "now"] {
        let mut data = valid_data();
        data["email_timestream"] = json!(ts);

        let response = client.submit(TOKEN, data).await.unwrap();
        assert_eq!(response.status, 400, "timestamp {ts:?} should be rejected");
        assert_eq!(
            response.json().unwrap()["fields"][0]["problem"],
            "invalid_timestamp"
        );
    }

    assert!(h.journal.enqueued_bodies().is_empty());
}

#[tokio::test]
async fn test_every_missing_field_is_reported() {
    let h = start().await;

    let response = h.server.client().submit(TOKEN, json!({})).await.unwrap();

    assert_eq!(response.status, 400);
    let body = response.json().unwrap();
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(
        fields,
        vec!["email_sender", "email_subject", "email_timestream"]
    );
    assert!(body["message"].as_str().unwrap().contains("email_subject"));
}

#[tokio::test]
async fn test_missing_data_object() {
    let h = start().await;

    let response = h
        .server
        .client()
        .submit_raw(json!({ "token": TOKEN }).to_string())
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(response.json().unwrap()["fields"][0]["field"], "data");
    assert!(h.journal.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_json_body() {
    let h = start().await;

    let response = h
        .server
        .client()
        .submit_raw("{ not json")
        .await
        .unwrap();

    assert_eq!(response.status, 400);
    let body = response.json().unwrap();
    assert_eq!(body["code"], "ParseFailure");
    assert_eq!(
        body["requestId"].as_str(),
        response.request_id.as_deref()
    );
    assert!(h.journal.calls().is_empty());
}

// =============================================================================
// DEPENDENCY FAILURE
// =============================================================================

#[tokio::test]
async fn test_queue_failure_returns_500() {
    let h = start().await;
    h.queue.fail_enqueue(true);

    let response = h.server.client().submit(TOKEN, valid_data()).await.unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.json().unwrap()["code"], "DependencyFailure");
    // One attempt, no internal retry
    assert_eq!(h.journal.enqueued_bodies().len(), 1);
    assert!(h.queue.inner().is_empty());
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn test_health_does_not_touch_queue() {
    let h = start().await;
    h.queue.fail_enqueue(true);
    h.queue.fail_poll(true);

    let response = h.server.client().health().await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["status"], "ok");
    assert!(h.journal.calls().is_empty());
}
