//! In-memory queue with visibility timeouts and long polling

use async_trait::async_trait;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::queue::{MessageQueue, QueueError, QueueMessage, ReceiptHandle};

/// Visibility timeout when the configuration leaves it unset
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// A message held by the queue
#[derive(Debug, Clone)]
pub struct Message {
    pub message_id: String,
    pub body: String,
    pub md5_of_body: String,
    pub sent_timestamp: i64,
    pub approximate_receive_count: u32,
    pub approximate_first_receive_timestamp: Option<i64>,
}

impl Message {
    fn new(body: String) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            md5_of_body: hex::encode(Md5::digest(body.as_bytes())),
            body,
            sent_timestamp: chrono::Utc::now().timestamp_millis(),
            approximate_receive_count: 0,
            approximate_first_receive_timestamp: None,
        }
    }
}

struct InFlight {
    message: Message,
    visible_at: Instant,
}

#[derive(Default)]
struct QueueState {
    visible: VecDeque<Message>,
    in_flight: HashMap<String, InFlight>,
}

impl QueueState {
    /// Return expired deliveries to the head of the queue
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();

        let mut returned: Vec<Message> = expired
            .into_iter()
            .filter_map(|handle| self.in_flight.remove(&handle))
            .map(|f| f.message)
            .collect();
        returned.sort_by_key(|m| std::cmp::Reverse(m.sent_timestamp));

        for message in returned {
            debug!(message_id = %message.message_id, "Visibility timeout expired");
            self.visible.push_front(message);
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.in_flight.values().map(|f| f.visible_at).min()
    }
}

/// In-memory queue.
///
/// Every delivery issues a fresh receipt handle and hides the message for the
/// visibility timeout. Handles from earlier deliveries are rejected by `ack`.
pub struct MemoryQueue {
    name: String,
    visibility_timeout: Duration,
    state: Mutex<QueueState>,
    arrivals: Notify,
}

impl MemoryQueue {
    pub fn new(config: &QueueConfig) -> Self {
        let name = config
            .url
            .split('/')
            .next_back()
            .unwrap_or(&config.url)
            .to_string();

        info!(name = %name, url = %config.url, "Creating in-memory queue");

        Self {
            name,
            visibility_timeout: config
                .visibility_timeout()
                .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT),
            state: Mutex::new(QueueState::default()),
            arrivals: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages currently available for delivery
    pub fn visible_count(&self) -> usize {
        let mut state = self.state.lock();
        state.reclaim_expired(Instant::now());
        state.visible.len()
    }

    /// Messages delivered but neither acknowledged nor expired
    pub fn in_flight_count(&self) -> usize {
        let mut state = self.state.lock();
        state.reclaim_expired(Instant::now());
        state.in_flight.len()
    }

    /// Visible plus in-flight messages
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.visible.len() + state.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every held message, visible ones first
    pub fn snapshot(&self) -> Vec<Message> {
        let state = self.state.lock();
        state
            .visible
            .iter()
            .cloned()
            .chain(state.in_flight.values().map(|f| f.message.clone()))
            .collect()
    }

    fn try_receive(&self) -> Option<QueueMessage> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.reclaim_expired(now);

        let mut message = state.visible.pop_front()?;
        message.approximate_receive_count += 1;
        if message.approximate_first_receive_timestamp.is_none() {
            message.approximate_first_receive_timestamp =
                Some(chrono::Utc::now().timestamp_millis());
        }

        let receipt = Uuid::new_v4().to_string();
        let delivered = QueueMessage {
            message_id: message.message_id.clone(),
            body: message.body.clone(),
            receipt_handle: ReceiptHandle::new(receipt.clone()),
            receive_count: message.approximate_receive_count,
        };

        state.in_flight.insert(
            receipt,
            InFlight {
                message,
                visible_at: now + self.visibility_timeout,
            },
        );

        Some(delivered)
    }

    fn wake_at(&self, deadline: Instant) -> Instant {
        self.state
            .lock()
            .next_expiry()
            .map_or(deadline, |expiry| expiry.min(deadline))
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        let message = Message::new(body);
        let message_id = message.message_id.clone();

        self.state.lock().visible.push_back(message);
        self.arrivals.notify_waiters();

        info!(queue = %self.name, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    async fn poll_one(&self, wait: Duration) -> Result<Option<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;

        loop {
            // Register before checking so an enqueue in between is not missed
            let notified = self.arrivals.notified();

            if let Some(message) = self.try_receive() {
                info!(
                    queue = %self.name,
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    "Received message"
                );
                return Ok(Some(message));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let _ = tokio::time::timeout_at(self.wake_at(deadline), notified).await;
        }
    }

    async fn ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state.reclaim_expired(Instant::now());

        let Some(in_flight) = state.in_flight.remove(receipt.as_str()) else {
            return Err(QueueError::ReceiptHandleInvalid(receipt.into_inner()));
        };

        info!(
            queue = %self.name,
            message_id = %in_flight.message.message_id,
            "Deleted message"
        );
        Ok(())
    }
}
