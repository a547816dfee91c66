//! Queue capability

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::error::ErrorCode;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue does not exist: {0}")]
    QueueNotFound(String),

    #[error("Receipt handle is invalid: {0}")]
    ReceiptHandleInvalid(String),

    #[error("Malformed message from queue: {0}")]
    MalformedMessage(String),

    #[error("Queue backend error: {0}")]
    Backend(String),
}

impl QueueError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::DependencyFailure
    }
}

/// Opaque proof of one message delivery.
///
/// Not `Clone`: acknowledging moves the handle, so a holder cannot use it twice.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A delivered message
#[derive(Debug)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
    pub receipt_handle: ReceiptHandle,
    pub receive_count: u32,
}

/// Minimal queue surface used by the receiver and the relay
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send a new message, returning its message id
    async fn enqueue(&self, body: String) -> Result<String, QueueError>;

    /// Receive at most one message, waiting up to `wait` for one to arrive
    async fn poll_one(&self, wait: Duration) -> Result<Option<QueueMessage>, QueueError>;

    /// Delete the delivered message identified by `receipt`
    async fn ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_dependency_errors_map_to_500() {
        let missing = QueueError::QueueNotFound("q".to_string());
        assert_eq!(missing.code(), ErrorCode::DependencyFailure);
        assert_eq!(missing.code().http_status(), 500);

        let taken = StoreError::AlreadyExists("data/1.json".to_string());
        assert_eq!(taken.code(), ErrorCode::DependencyFailure);
        assert_eq!(taken.to_string(), "Object already exists: data/1.json");
    }
}
