//! End-to-end: receiver → queue → relay → object store, all in memory

use std::sync::Arc;

use microdemo_core::RelayConfig;
use microdemo_receiver::{create_router, ReceiverState, SharedSecret};
use microdemo_relay::{PollOutcome, Relay};
use microdemo_test::{init_tracing, Journal, RecordingQueue, RecordingStore, TestServer};
use serde_json::{json, Value};

const TOKEN: &str = "pipeline-token";

struct Pipeline {
    server: TestServer,
    relay: Relay,
    journal: Journal,
    store: Arc<RecordingStore>,
}

async fn pipeline() -> Pipeline {
    init_tracing();
    let journal = Journal::default();
    let queue = Arc::new(RecordingQueue::new(journal.clone()));
    let store = Arc::new(RecordingStore::new(journal.clone()));

    let state = ReceiverState::new(queue.clone(), SharedSecret::new(TOKEN));
    let server = TestServer::start(create_router(state)).await.unwrap();

    let config = RelayConfig {
        wait_time_secs: 0,
        ..RelayConfig::default()
    };
    let relay = Relay::new(queue, store.clone(), config);

    Pipeline {
        server,
        relay,
        journal,
        store,
    }
}

#[tokio::test]
async fn test_submission_reaches_object_store() {
    let p = pipeline().await;
    let data = json!({
        "email_sender": "bob@example.org",
        "email_subject": "Hello",
        "email_timestream": "2024-03-01T12:30:45Z",
        "note": "extra fields survive"
    });

    let response = p.server.client().submit(TOKEN, data.clone()).await.unwrap();
    assert_eq!(response.status, 200);

    let key = match p.relay.poll_once().await {
        PollOutcome::Stored { key, .. } => key,
        other => panic!("expected Stored, got {other:?}"),
    };

    let object = p.store.inner().get(&key).unwrap();
    let stored: Value = serde_json::from_slice(&object.data).unwrap();
    assert_eq!(stored, data);

    assert_eq!(p.relay.poll_once().await, PollOutcome::Empty);
    assert_eq!(p.journal.acks().len(), 1);
}

#[tokio::test]
async fn test_rejected_submissions_never_reach_store() {
    let p = pipeline().await;
    let client = p.server.client();

    let bad_token = client
        .submit("nope", json!({ "email_sender": "a@b.com" }))
        .await
        .unwrap();
    assert_eq!(bad_token.status, 403);

    let bad_data = client
        .submit(TOKEN, json!({ "email_sender": "not-an-email" }))
        .await
        .unwrap();
    assert_eq!(bad_data.status, 400);

    assert_eq!(p.relay.poll_once().await, PollOutcome::Empty);
    assert!(p.store.inner().is_empty());
    assert!(p.journal.puts().is_empty());
}

#[tokio::test]
async fn test_submissions_are_stored_in_arrival_order() {
    let p = pipeline().await;
    let client = p.server.client();

    for subject in ["first", "second", "third"] {
        let data = json!({
            "email_sender": "carol@example.com",
            "email_subject": subject,
            "email_timestream": "2024-03-01T12:30:45.000Z"
        });
        assert_eq!(client.submit(TOKEN, data).await.unwrap().status, 200);
    }

    for _ in 0..3 {
        assert!(matches!(
            p.relay.poll_once().await,
            PollOutcome::Stored { .. }
        ));
    }

    let subjects: Vec<String> = p
        .store
        .inner()
        .keys(Some("data/"))
        .iter()
        .map(|key| {
            let object = p.store.inner().get(key).unwrap();
            let value: Value = serde_json::from_slice(&object.data).unwrap();
            value["email_subject"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(subjects, vec!["first", "second", "third"]);
}
