//! Recording fakes for the queue and object store

use async_trait::async_trait;
use bytes::Bytes;
use microdemo_core::{
    MemoryQueue, MemoryStore, MessageQueue, ObjectStore, PutReceipt, QueueConfig, QueueError,
    QueueMessage, ReceiptHandle, StoreConfig, StoreError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{TEST_BUCKET, TEST_QUEUE_URL};

const INJECTED_FAULT: &str = "injected fault";

/// One capability call, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Enqueue { body: String },
    /// A receive attempt and the receipt handle it delivered, if any
    Poll { receipt: Option<String> },
    Ack { receipt: String },
    Put { key: String, body: Bytes },
}

/// Ordered log of calls shared between fakes
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn enqueued_bodies(&self) -> Vec<String> {
        self.filter_map(|c| match c {
            Call::Enqueue { body } => Some(body.clone()),
            _ => None,
        })
    }

    pub fn puts(&self) -> Vec<(String, Bytes)> {
        self.filter_map(|c| match c {
            Call::Put { key, body } => Some((key.clone(), body.clone())),
            _ => None,
        })
    }

    /// Receipt handles handed out by successful polls
    pub fn delivered_receipts(&self) -> Vec<String> {
        self.filter_map(|c| match c {
            Call::Poll { receipt } => receipt.clone(),
            _ => None,
        })
    }

    pub fn polls(&self) -> usize {
        self.filter_map(|c| matches!(c, Call::Poll { .. }).then_some(()))
            .len()
    }

    pub fn acks(&self) -> Vec<String> {
        self.filter_map(|c| match c {
            Call::Ack { receipt } => Some(receipt.clone()),
            _ => None,
        })
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.lock().iter().position(pred)
    }

    fn filter_map<T>(&self, f: impl Fn(&Call) -> Option<T>) -> Vec<T> {
        self.0.lock().iter().filter_map(f).collect()
    }
}

/// `MemoryQueue` wrapper that journals every call and can fail on demand
pub struct RecordingQueue {
    inner: MemoryQueue,
    journal: Journal,
    fail_enqueue: AtomicBool,
    fail_poll: AtomicBool,
    fail_ack: AtomicBool,
}

impl RecordingQueue {
    pub fn new(journal: Journal) -> Self {
        Self::with_config(journal, &QueueConfig::new(TEST_QUEUE_URL))
    }

    pub fn with_config(journal: Journal, config: &QueueConfig) -> Self {
        Self {
            inner: MemoryQueue::new(config),
            journal,
            fail_enqueue: AtomicBool::new(false),
            fail_poll: AtomicBool::new(false),
            fail_ack: AtomicBool::new(false),
        }
    }

    /// The wrapped queue, for inspection and unjournaled seeding
    pub fn inner(&self) -> &MemoryQueue {
        &self.inner
    }

    /// Put a message on the queue without journaling it
    pub async fn seed(&self, body: impl Into<String>) -> String {
        self.inner
            .enqueue(body.into())
            .await
            .expect("memory queue accepts every message")
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    pub fn fail_poll(&self, fail: bool) {
        self.fail_poll.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ack(&self, fail: bool) {
        self.fail_ack.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        self.journal.record(Call::Enqueue { body: body.clone() });
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(QueueError::Backend(INJECTED_FAULT.to_string()));
        }
        self.inner.enqueue(body).await
    }

    async fn poll_one(&self, wait: Duration) -> Result<Option<QueueMessage>, QueueError> {
        if self.fail_poll.load(Ordering::SeqCst) {
            self.journal.record(Call::Poll { receipt: None });
            return Err(QueueError::Backend(INJECTED_FAULT.to_string()));
        }
        let result = self.inner.poll_one(wait).await;
        let receipt = match &result {
            Ok(Some(message)) => Some(message.receipt_handle.as_str().to_string()),
            _ => None,
        };
        self.journal.record(Call::Poll { receipt });
        result
    }

    async fn ack(&self, receipt: ReceiptHandle) -> Result<(), QueueError> {
        self.journal.record(Call::Ack {
            receipt: receipt.as_str().to_string(),
        });
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(QueueError::Backend(INJECTED_FAULT.to_string()));
        }
        self.inner.ack(receipt).await
    }
}

/// `MemoryStore` wrapper that journals every put and can fail on demand
pub struct RecordingStore {
    inner: MemoryStore,
    journal: Journal,
    fail_put: AtomicBool,
}

impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: MemoryStore::new(&StoreConfig::new(TEST_BUCKET)),
            journal,
            fail_put: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<PutReceipt, StoreError> {
        self.journal.record(Call::Put {
            key: key.to_string(),
            body: data.clone(),
        });
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(INJECTED_FAULT.to_string()));
        }
        self.inner.put(key, data).await
    }
}
