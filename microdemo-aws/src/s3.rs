//! S3-backed object store

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use microdemo_core::{AwsConfig, ObjectStore, PutReceipt, StoreConfig, StoreError};
use tracing::info;

const CONTENT_TYPE: &str = "application/json";

/// Object store bound to one S3 bucket
pub struct S3Store {
    client: Client,
    config: StoreConfig,
}

impl S3Store {
    pub fn new(sdk: &SdkConfig, aws: &AwsConfig, config: StoreConfig) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk)
            .force_path_style(aws.force_path_style)
            .build();
        Self::from_client(Client::from_conf(s3_config), config)
    }

    pub fn from_client(client: Client, config: StoreConfig) -> Self {
        Self { client, config }
    }
}

/// Map a failed `PutObject` by its S3 error code
fn put_error(bucket: &str, key: &str, code: Option<&str>, detail: String) -> StoreError {
    match code {
        Some("NoSuchBucket") => StoreError::BucketNotFound(bucket.to_string()),
        // If-None-Match lost against an existing or concurrently written key
        Some("PreconditionFailed" | "ConditionalRequestConflict") => {
            StoreError::AlreadyExists(key.to_string())
        }
        _ => StoreError::Backend(detail),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes) -> Result<PutReceipt, StoreError> {
        let size = data.len();
        let output = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .if_none_match("*")
            .content_type(CONTENT_TYPE)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| {
                put_error(
                    &self.config.bucket,
                    key,
                    err.code(),
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        info!(bucket = %self.config.bucket, key = %key, size, "Stored object");
        Ok(PutReceipt {
            key: key.to_string(),
            etag: output.e_tag().map(ToString::to_string),
        })
    }
}
