// Session blob store
// Keeps generated videos in memory so clients can fetch them by blob URI

use crate::orchestrator::encoder::LocalBlob;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Default cap on bytes held by the store (256 MiB)
pub const DEFAULT_BLOB_STORE_MAX_BYTES: usize = 256 * 1024 * 1024;

/// In-memory blobs for the current process
///
/// Nothing is written to disk. Once the stored bytes exceed `max_bytes`
/// the oldest blobs are evicted; the blob just inserted is always kept.
#[derive(Debug)]
pub struct BlobStore {
    blobs: HashMap<Uuid, LocalBlob>,
    order: VecDeque<Uuid>,
    total_bytes: usize,
    max_bytes: usize,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::with_max_bytes(DEFAULT_BLOB_STORE_MAX_BYTES)
    }
}

impl BlobStore {
    /// Empty store holding at most `max_bytes`
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            blobs: HashMap::new(),
            order: VecDeque::new(),
            total_bytes: 0,
            max_bytes,
        }
    }

    /// Store a blob, replacing any with the same id, then evict the
    /// oldest blobs until the store is back under its cap
    pub fn insert(&mut self, blob: LocalBlob) {
        let id = blob.id;
        self.remove(&id);

        tracing::debug!(blob_id = %id, bytes = blob.data.len(), "Stored blob");
        self.total_bytes += blob.data.len();
        self.blobs.insert(id, blob);
        self.order.push_back(id);

        while self.total_bytes > self.max_bytes && self.order.len() > 1 {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.blobs.remove(&oldest) {
                self.total_bytes -= evicted.data.len();
                tracing::info!(
                    blob_id = %oldest,
                    bytes = evicted.data.len(),
                    max_bytes = self.max_bytes,
                    "Evicted blob to stay under the store cap"
                );
            }
        }

        if self.total_bytes > self.max_bytes {
            tracing::warn!(
                blob_id = %id,
                bytes = self.total_bytes,
                max_bytes = self.max_bytes,
                "Blob alone exceeds the store cap"
            );
        }
    }

    /// Fetch a blob
    pub fn get(&self, id: &Uuid) -> Option<&LocalBlob> {
        self.blobs.get(id)
    }

    /// Drop a blob, returning it if present
    pub fn remove(&mut self, id: &Uuid) -> Option<LocalBlob> {
        let blob = self.blobs.remove(id)?;
        self.order.retain(|held| held != id);
        self.total_bytes -= blob.data.len();
        Some(blob)
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Total bytes held
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Cap on bytes held
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}
