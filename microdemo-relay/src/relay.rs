//! Poll loop

use bytes::Bytes;
use microdemo_core::{MessageQueue, ObjectStore, RelayConfig};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::keys::KeyScheme;
use crate::outcome::{PollOutcome, RelayStats, Stage};

/// Moves messages from a queue into an object store, one at a time
pub struct Relay {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn ObjectStore>,
    keys: KeyScheme,
    config: RelayConfig,
}

impl Relay {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn ObjectStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            queue,
            store,
            keys: KeyScheme::from_config(&config),
            config,
        }
    }

    /// Replace the key scheme derived from the configuration
    #[must_use]
    pub fn with_keys(mut self, keys: KeyScheme) -> Self {
        self.keys = keys;
        self
    }

    /// Run a single iteration.
    ///
    /// The message is deleted only after its body has been written, so a
    /// failure at any earlier step leaves it to reappear after the visibility
    /// timeout.
    pub async fn poll_once(&self) -> PollOutcome {
        let message = match self.queue.poll_one(self.config.wait_time()).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("No messages available");
                return PollOutcome::Empty;
            }
            Err(e) => {
                error!(error = %e, "Failed to receive message");
                return PollOutcome::DependencyError {
                    stage: Stage::Receive,
                    error: e.to_string(),
                };
            }
        };

        let message_id = message.message_id;
        debug!(
            message_id = %message_id,
            receive_count = message.receive_count,
            "Received message"
        );

        let bytes = match serde_json::from_str::<Value>(&message.body)
            .and_then(|value| serde_json::to_vec(&value))
        {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                error!(
                    message_id = %message_id,
                    error = %e,
                    "Message body is not valid JSON, leaving it on the queue"
                );
                return PollOutcome::ParseError {
                    message_id,
                    reason: e.to_string(),
                };
            }
        };

        let key = self.keys.next_key();
        match self.store.put(&key, bytes).await {
            Ok(receipt) => {
                debug!(key = %receipt.key, etag = ?receipt.etag, "Stored object");
            }
            Err(e) => {
                error!(
                    message_id = %message_id,
                    key = %key,
                    code = %e.code(),
                    error = %e,
                    "Failed to store message, leaving it on the queue"
                );
                return PollOutcome::DependencyError {
                    stage: Stage::Store,
                    error: e.to_string(),
                };
            }
        }

        if let Err(e) = self.queue.ack(message.receipt_handle).await {
            // The object is already written; redelivery will store it again
            warn!(
                message_id = %message_id,
                key = %key,
                error = %e,
                "Stored message but failed to delete it from the queue"
            );
            return PollOutcome::DependencyError {
                stage: Stage::Ack,
                error: e.to_string(),
            };
        }

        info!(message_id = %message_id, key = %key, "Processed and stored message");
        PollOutcome::Stored { key, message_id }
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Iterations never overlap, and shutdown is only observed while waiting
    /// between them.
    pub async fn run<F>(&self, shutdown: F) -> RelayStats
    where
        F: Future<Output = ()>,
    {
        let mut backoff = Backoff::new(self.config.poll_interval(), &self.config.backoff);
        let mut stats = RelayStats::default();
        tokio::pin!(shutdown);

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            wait_time_secs = self.config.wait_time_secs,
            "Relay loop started"
        );

        loop {
            let outcome = self.poll_once().await;
            stats.record(&outcome);

            let delay = backoff.next_delay(&outcome);
            if backoff.is_backing_off() {
                warn!(
                    outcome = outcome.label(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Backing off after dependency failure"
                );
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(
            iterations = stats.iterations,
            stored = stats.stored,
            empty = stats.empty,
            parse_errors = stats.parse_errors,
            dependency_errors = stats.dependency_errors,
            "Relay loop stopped"
        );
        stats
    }
}
