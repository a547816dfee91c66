//! In-memory object store

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use md5::{Digest, Md5};
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::store::{ObjectStore, PutReceipt, StoreError};

/// A stored object
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Ephemeral (in-memory) object store bound to one bucket
pub struct MemoryStore {
    bucket: String,
    objects: DashMap<String, StoredObject>,
}

impl MemoryStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            objects: DashMap::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.value().clone())
    }

    /// All keys in lexicographic order, optionally filtered by prefix
    pub fn keys(&self, prefix: Option<&str>) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|o| o.key().clone())
            .filter(|k| prefix.map_or(true, |p| k.starts_with(p)))
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn compute_etag(data: &[u8]) -> String {
        format!("\"{}\"", hex::encode(Md5::digest(data)))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<PutReceipt, StoreError> {
        let etag = Self::compute_etag(&data);
        let size = data.len() as u64;

        match self.objects.entry(key.to_string()) {
            Entry::Occupied(_) => {
                warn!(bucket = %self.bucket, key = %key, "Refusing to overwrite object");
                return Err(StoreError::AlreadyExists(key.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredObject {
                    data,
                    etag: etag.clone(),
                    size,
                    last_modified: Utc::now(),
                });
            }
        }

        info!(bucket = %self.bucket, key = %key, size, "Stored object");
        Ok(PutReceipt {
            key: key.to_string(),
            etag: Some(etag),
        })
    }
}
