use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use archivault_types::EntityId;

use crate::error::{StoreError, StoreResult};

/// Backing storage for full resource bodies.
///
/// Implementations must satisfy these invariants:
/// - `load_resource` returns `Ok(None)` for an unknown id, not an error.
/// - Errors describe the backend (offline, corrupt data), never a missing id.
/// - The store never interprets resource contents.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch the full JSON body of a resource.
    async fn load_resource(&self, id: &EntityId) -> StoreResult<Option<Value>>;

    /// Write (or overwrite) the body of a resource.
    async fn save_resource(&self, id: &EntityId, data: &Value) -> StoreResult<()>;

    /// Delete a resource. Returns `true` if it existed.
    async fn delete_resource(&self, id: &EntityId) -> StoreResult<bool>;
}

/// In-memory, HashMap-based resource store.
///
/// Intended for tests and embedding. Counts every load request and can be
/// switched offline or given a fixed latency to exercise the cache.
pub struct InMemoryResourceStore {
    resources: RwLock<HashMap<EntityId, Value>>,
    loads: AtomicUsize,
    available: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
            available: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Delay every load by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed a resource without going through the async API.
    pub fn put(&self, id: impl Into<EntityId>, data: Value) {
        self.resources
            .write()
            .expect("lock poisoned")
            .insert(id.into(), data);
    }

    /// Take the store offline (every call fails with `Unavailable`) or back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `load_resource` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.resources.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().expect("lock poisoned").is_empty()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        }
    }
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn load_resource(&self, id: &EntityId) -> StoreResult<Option<Value>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_available()?;
        let map = self.resources.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    async fn save_resource(&self, id: &EntityId, data: &Value) -> StoreResult<()> {
        self.check_available()?;
        self.resources
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), data.clone());
        Ok(())
    }

    async fn delete_resource(&self, id: &EntityId) -> StoreResult<bool> {
        self.check_available()?;
        let mut map = self.resources.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResourceStore")
            .field("resource_count", &self.len())
            .field("load_count", &self.load_count())
            .finish()
    }
}
