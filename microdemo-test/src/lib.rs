//! Test utilities for microdemo
//!
//! Provides:
//! - recording queue and object store fakes with fault injection
//! - an in-process HTTP server on a random port
//! - a client for the receiver endpoints
//!
//! ## Usage
//!
//! ```rust,no_run
//! # async fn example() {
//! use microdemo_test::{Journal, RecordingQueue};
//!
//! let journal = Journal::default();
//! let queue = RecordingQueue::new(journal.clone());
//!
//! // Seeded messages bypass the journal
//! queue.seed(r#"{"email_sender":"a@b.com"}"#).await;
//! assert!(journal.calls().is_empty());
//! # }
//! ```

pub mod client;
pub mod fakes;
pub mod server;

pub use client::{ClientError, ClientResponse, SubmitClient};
pub use fakes::{Call, Journal, RecordingQueue, RecordingStore};
pub use server::{TestError, TestServer};

/// Queue URL used by the fakes
pub const TEST_QUEUE_URL: &str = "http://localhost:4566/000000000000/microdemo-queue";

/// Bucket used by the fakes
pub const TEST_BUCKET: &str = "demo-bucket";

/// Install a test tracing subscriber; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
