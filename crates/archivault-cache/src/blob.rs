use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use uuid::Uuid;

/// Issues displayable handles (object URLs) for binary assets.
pub trait BlobHandleAllocator: Send + Sync {
    /// Register `blob` and return a handle that refers to it.
    fn create_handle(&self, blob: &Bytes) -> String;

    /// Invalidate a handle. Unknown handles are ignored.
    fn release_handle(&self, handle: &str);
}

/// Allocator that keeps blobs in memory under `blob:archivault/<uuid>` handles.
#[derive(Debug, Default)]
pub struct InMemoryHandleAllocator {
    live: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryHandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles created and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().expect("lock poisoned").len()
    }

    /// The blob behind a live handle.
    pub fn resolve(&self, handle: &str) -> Option<Bytes> {
        self.live.lock().expect("lock poisoned").get(handle).cloned()
    }
}

impl BlobHandleAllocator for InMemoryHandleAllocator {
    fn create_handle(&self, blob: &Bytes) -> String {
        let handle = format!("blob:archivault/{}", Uuid::now_v7());
        self.live
            .lock()
            .expect("lock poisoned")
            .insert(handle.clone(), blob.clone());
        handle
    }

    fn release_handle(&self, handle: &str) {
        self.live.lock().expect("lock poisoned").remove(handle);
    }
}
