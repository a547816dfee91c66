//! HTTP handlers for the receiver

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use microdemo_core::{ErrorCode, MessageQueue, PipelineError, Submission};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::SharedSecret;

/// Body of a successful submit response
pub const SUBMIT_ACCEPTED: &str = "Message sent to queue";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state for receiver handlers
pub struct ReceiverState {
    pub queue: Arc<dyn MessageQueue>,
    pub secret: SharedSecret,
}

impl ReceiverState {
    pub fn new(queue: Arc<dyn MessageQueue>, secret: SharedSecret) -> Self {
        Self { queue, secret }
    }
}

/// Liveness check; does not touch the queue
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "service": "microdemo-receiver"})),
    )
}

/// Handle `POST /submit`.
///
/// Checks run in order: JSON envelope, token, submission fields. Each valid
/// request makes exactly one enqueue attempt; there is no idempotency key, so
/// a client retry after a timeout can enqueue the same submission twice.
pub async fn submit(State(state): State<Arc<ReceiverState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let envelope: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Malformed submit body");
            return error_response(
                PipelineError::new(ErrorCode::ParseFailure, format!("Malformed JSON body: {e}"))
                    .with_request_id(request_id),
            );
        }
    };

    let token = envelope.get("token").and_then(Value::as_str);
    if !token.is_some_and(|t| state.secret.verify(t)) {
        warn!(request_id = %request_id, "Rejected submission with invalid token");
        return error_response(
            PipelineError::new(ErrorCode::AuthorizationFailure, "Invalid token")
                .with_request_id(request_id),
        );
    }

    let data = envelope.get("data").unwrap_or(&Value::Null);
    let submission = match Submission::from_value(data) {
        Ok(submission) => submission,
        Err(err) => {
            info!(request_id = %request_id, error = %err, "Rejected invalid submission");
            let message = err.to_string();
            return error_response(
                PipelineError::new(ErrorCode::ValidationFailure, message)
                    .with_fields(err.fields)
                    .with_request_id(request_id),
            );
        }
    };
    debug!(
        request_id = %request_id,
        email_timestream = %submission.email_timestream,
        "Submission validated"
    );

    let message_body = data.to_string();

    match state.queue.enqueue(message_body).await {
        Ok(message_id) => {
            info!(request_id = %request_id, message_id = %message_id, "Submission enqueued");
            text_response(StatusCode::OK, SUBMIT_ACCEPTED, &request_id)
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Error sending to queue");
            error_response(
                PipelineError::new(e.code(), "Error sending to queue").with_request_id(request_id),
            )
        }
    }
}

fn text_response(status: StatusCode, body: &'static str, request_id: &str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    insert_request_id(&mut response, request_id);
    response
}

fn error_response(error: PipelineError) -> Response {
    let status =
        StatusCode::from_u16(error.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(error.to_json()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    insert_request_id(&mut response, &error.request_id);
    response
}

fn insert_request_id(response: &mut Response, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}
