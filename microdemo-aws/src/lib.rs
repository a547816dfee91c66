//! SQS and S3 backends for microdemo
//!
//! Implements the `MessageQueue` and `ObjectStore` capabilities from
//! `microdemo-core` on the official AWS SDK. Endpoint overrides and static
//! credentials make the same code work against LocalStack.

pub mod client;
pub mod s3;
pub mod sqs;

pub use client::load_sdk_config;
pub use s3::S3Store;
pub use sqs::SqsQueue;
