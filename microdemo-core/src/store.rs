//! Object store capability

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::error::ErrorCode;

/// Errors from object store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Object store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::DependencyFailure
    }
}

/// Result of a successful put
#[derive(Debug, Clone)]
pub struct PutReceipt {
    pub key: String,
    pub etag: Option<String>,
}

/// Minimal object store surface used by the relay
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under a key that must not exist yet
    async fn put(&self, key: &str, data: Bytes) -> Result<PutReceipt, StoreError>;
}
