//! Core types and traits for microdemo
//!
//! This crate provides the pieces shared by the receiver and the relay:
//! - the submission model and its validation rules
//! - the `MessageQueue` and `ObjectStore` capabilities
//! - the error taxonomy and configuration structs
//! - in-memory queue and object store backends

pub mod config;
pub mod error;
pub mod memory;
pub mod queue;
pub mod store;
pub mod submission;

pub use config::{
    AwsConfig, BackoffConfig, ConfigError, QueueConfig, ReceiverConfig, RelayConfig, Settings,
    StoreConfig,
};
pub use error::{ErrorCode, PipelineError};
pub use memory::{MemoryQueue, MemoryStore};
pub use queue::{MessageQueue, QueueError, QueueMessage, ReceiptHandle};
pub use store::{ObjectStore, PutReceipt, StoreError};
pub use submission::{FieldError, FieldProblem, Submission, ValidationError};
