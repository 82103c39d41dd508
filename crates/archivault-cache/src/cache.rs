//! The virtualized resource cache.
//!
//! Bodies are kept in an [`LruCache`] for recency order, but eviction is
//! driven by a byte budget rather than an entry count: when the sum of
//! serialized sizes exceeds `max_bytes`, the least recently accessed entries
//! that nobody has retained are dropped until the cache fits again. Retained
//! entries are never evicted, so a cache full of retained bodies may run over
//! budget.
//!
//! Concurrent `load_full` calls for the same id share one
//! [`tokio::sync::OnceCell`], so the store sees a single request and every
//! caller receives the same `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use lru::LruCache;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use archivault_types::EntityId;

use crate::blob::BlobHandleAllocator;
use crate::config::CacheConfig;
use crate::error::StoreResult;
use crate::store::ResourceStore;
use crate::stub::{build_stubs, ResourceStub};

type LoadCell = Arc<OnceCell<Option<Arc<Value>>>>;

/// One cached body.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: Arc<Value>,
    /// Serialized JSON length in bytes.
    pub estimated_size: usize,
    pub last_accessed: Instant,
    pub ref_count: usize,
}

/// Point-in-time counters of a [`VirtualizedCache`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: usize,
    pub max_bytes: usize,
    pub retained_count: usize,
    pub stub_count: usize,
    pub blob_url_count: usize,
    pub in_flight_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

impl CacheStats {
    /// Fraction of lookups served from memory, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

struct BlobUrl {
    handle: String,
    ref_count: usize,
}

struct CacheInner {
    entries: LruCache<EntityId, CacheEntry>,
    total_bytes: usize,
    /// Retain counts, kept apart from entries so an id can be pinned before
    /// its body arrives.
    pins: HashMap<EntityId, usize>,
    stubs: HashMap<EntityId, ResourceStub>,
    in_flight: HashMap<EntityId, LoadCell>,
    blob_urls: HashMap<String, BlobUrl>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheInner {
    fn touch(&mut self, id: &EntityId) -> Option<Arc<Value>> {
        let entry = self.entries.get_mut(id)?;
        entry.last_accessed = Instant::now();
        let data = entry.data.clone();
        if let Some(stub) = self.stubs.get_mut(id) {
            stub.last_accessed = Some(Utc::now());
        }
        Some(data)
    }

    fn insert(&mut self, id: EntityId, data: Arc<Value>, max_bytes: usize) {
        let estimated_size = serde_json::to_vec(data.as_ref()).map(|b| b.len()).unwrap_or(0);
        let entry = CacheEntry {
            data,
            estimated_size,
            last_accessed: Instant::now(),
            ref_count: self.pins.get(&id).copied().unwrap_or(0),
        };
        if let Some(old) = self.entries.put(id.clone(), entry) {
            self.total_bytes -= old.estimated_size;
        }
        self.total_bytes += estimated_size;
        self.evict(max_bytes, Some(&id));
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        match self.entries.pop(id) {
            Some(old) => {
                self.total_bytes -= old.estimated_size;
                true
            }
            None => false,
        }
    }

    /// Drop least recently used, unretained entries until the budget holds.
    fn evict(&mut self, max_bytes: usize, keep: Option<&EntityId>) {
        while self.total_bytes > max_bytes {
            let victim = self
                .entries
                .iter()
                .rev()
                .find(|(id, entry)| entry.ref_count == 0 && Some(*id) != keep)
                .map(|(id, _)| id.clone());
            let Some(victim) = victim else {
                debug!(
                    total = self.total_bytes,
                    max_bytes,
                    "cache over budget, all entries retained"
                );
                break;
            };
            self.remove(&victim);
            self.evictions += 1;
            debug!(id = %victim, "evicted cache entry");
        }
    }

    fn set_ref_count(&mut self, id: &EntityId, count: usize) {
        if count == 0 {
            self.pins.remove(id);
        } else {
            self.pins.insert(id.clone(), count);
        }
        if let Some(entry) = self.entries.peek_mut(id) {
            entry.ref_count = count;
        }
    }
}

/// Byte-budgeted, ref-counted cache of full resource bodies.
pub struct VirtualizedCache {
    config: CacheConfig,
    store: Arc<dyn ResourceStore>,
    handles: Arc<dyn BlobHandleAllocator>,
    inner: Mutex<CacheInner>,
}

impl VirtualizedCache {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn ResourceStore>,
        handles: Arc<dyn BlobHandleAllocator>,
    ) -> Self {
        Self {
            config,
            store,
            handles,
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                total_bytes: 0,
                pins: HashMap::new(),
                stubs: HashMap::new(),
                in_flight: HashMap::new(),
                blob_urls: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().expect("lock poisoned")
    }

    // ---------------------------------------------------------------
    // Stubs
    // ---------------------------------------------------------------

    /// Build stubs for every collection and manifest under `root` and seed
    /// the cache with their full bodies. Returns the root stub, or `None` if
    /// the root is not a collection or manifest.
    pub fn create_stub_tree(&self, root: &Value) -> Option<ResourceStub> {
        let mut built = Vec::new();
        build_stubs(root, &mut built)?;
        let root_id = built.first().map(|(stub, _)| stub.id.clone())?;

        let mut inner = self.lock();
        let count = built.len();
        for (stub, body) in built {
            let id = stub.id.clone();
            inner.stubs.insert(id.clone(), stub);
            inner.insert(id, Arc::new(body), self.config.max_bytes);
        }
        debug!(root = %root_id, stubs = count, "created stub tree");
        let loaded = inner.entries.contains(&root_id);
        inner.stubs.get(&root_id).cloned().map(|mut s| {
            s.loaded = loaded;
            s
        })
    }

    /// The stub for `id`, with `loaded` reflecting whether its body is cached.
    pub fn stub(&self, id: &EntityId) -> Option<ResourceStub> {
        let inner = self.lock();
        let mut stub = inner.stubs.get(id)?.clone();
        stub.loaded = inner.entries.contains(id);
        Some(stub)
    }

    /// Stubs of the listable children of `id`, in order.
    pub fn child_stubs(&self, id: &EntityId) -> Vec<ResourceStub> {
        let inner = self.lock();
        let Some(parent) = inner.stubs.get(id) else {
            return Vec::new();
        };
        parent
            .children
            .iter()
            .filter_map(|child| {
                let mut stub = inner.stubs.get(child)?.clone();
                stub.loaded = inner.entries.contains(child);
                Some(stub)
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Bodies
    // ---------------------------------------------------------------

    /// Cached body of `id`, without touching the store.
    pub fn get(&self, id: &EntityId) -> Option<Arc<Value>> {
        let mut inner = self.lock();
        let found = inner.touch(id);
        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    /// Put a body into the cache without writing it to the store.
    pub fn insert(&self, id: EntityId, data: Value) -> Arc<Value> {
        let data = Arc::new(data);
        self.lock().insert(id, data.clone(), self.config.max_bytes);
        data
    }

    /// Full body of `id`: from memory, from an in-flight load of the same id,
    /// or from the store. Store failures are logged and yield `None`.
    pub async fn load_full(&self, id: &EntityId) -> Option<Arc<Value>> {
        let cell = {
            let mut inner = self.lock();
            if let Some(data) = inner.touch(id) {
                inner.hits += 1;
                return Some(data);
            }
            inner.misses += 1;
            inner.in_flight.entry(id.clone()).or_default().clone()
        };

        let result = cell.get_or_init(|| self.fetch(id)).await.clone();

        let mut inner = self.lock();
        if inner.in_flight.get(id).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            inner.in_flight.remove(id);
        }
        result
    }

    async fn fetch(&self, id: &EntityId) -> Option<Arc<Value>> {
        match self.store.load_resource(id).await {
            Ok(Some(value)) => {
                let data = Arc::new(value);
                self.lock().insert(id.clone(), data.clone(), self.config.max_bytes);
                debug!(%id, "loaded resource");
                Some(data)
            }
            Ok(None) => {
                debug!(%id, "resource not in store");
                None
            }
            Err(e) => {
                warn!(%id, error = %e, "failed to load resource");
                None
            }
        }
    }

    /// Write a body through to the store, then cache it.
    pub async fn save(&self, id: &EntityId, data: Value) -> StoreResult<Arc<Value>> {
        self.store.save_resource(id, &data).await?;
        Ok(self.insert(id.clone(), data))
    }

    /// Delete a resource from the store and drop every trace of it here.
    pub async fn delete(&self, id: &EntityId) -> StoreResult<bool> {
        let existed = self.store.delete_resource(id).await?;
        let mut inner = self.lock();
        inner.remove(id);
        inner.stubs.remove(id);
        inner.pins.remove(id);
        Ok(existed)
    }

    /// Drop the cached body of `id`; the stub and retain count stay.
    pub fn invalidate(&self, id: &EntityId) -> bool {
        self.lock().remove(id)
    }

    /// Drop every body, stub and retain count, and release all blob handles.
    pub fn clear(&self) {
        let handles: Vec<String> = {
            let mut inner = self.lock();
            inner.entries.clear();
            inner.total_bytes = 0;
            inner.pins.clear();
            inner.stubs.clear();
            let handles = inner.blob_urls.drain().map(|(_, url)| url.handle).collect();
            handles
        };
        for handle in handles {
            self.handles.release_handle(&handle);
        }
    }

    /// Fetch up to `preload_limit` children of `parent_id` that are not yet
    /// cached. Returns how many were loaded.
    pub async fn preload_children(&self, parent_id: &EntityId) -> usize {
        let pending: Vec<EntityId> = {
            let inner = self.lock();
            let Some(parent) = inner.stubs.get(parent_id) else {
                return 0;
            };
            parent
                .children
                .iter()
                .filter(|c| !inner.entries.contains(*c))
                .take(self.config.preload_limit)
                .cloned()
                .collect()
        };
        let mut loaded = 0;
        for child in &pending {
            if self.load_full(child).await.is_some() {
                loaded += 1;
            }
        }
        debug!(parent = %parent_id, requested = pending.len(), loaded, "preloaded children");
        loaded
    }

    // ---------------------------------------------------------------
    // Retain / release
    // ---------------------------------------------------------------

    /// Pin `id` so its body is never evicted. Returns the new count.
    pub fn retain(&self, id: &EntityId) -> usize {
        let mut inner = self.lock();
        let count = inner.pins.get(id).copied().unwrap_or(0) + 1;
        inner.set_ref_count(id, count);
        count
    }

    /// Undo one `retain`. Never goes below zero. Returns the new count.
    pub fn release(&self, id: &EntityId) -> usize {
        let mut inner = self.lock();
        let count = inner.pins.get(id).copied().unwrap_or(0).saturating_sub(1);
        inner.set_ref_count(id, count);
        if count == 0 {
            inner.evict(self.config.max_bytes, None);
        }
        count
    }

    /// Current retain count of `id`.
    pub fn ref_count(&self, id: &EntityId) -> usize {
        self.lock().pins.get(id).copied().unwrap_or(0)
    }

    // ---------------------------------------------------------------
    // Blob URLs
    // ---------------------------------------------------------------

    /// Handle for an asset's binary content. Repeated calls for the same
    /// asset share one handle and bump its count.
    pub fn get_blob_url(&self, asset_id: &str, blob: &Bytes) -> String {
        let mut inner = self.lock();
        if let Some(url) = inner.blob_urls.get_mut(asset_id) {
            url.ref_count += 1;
            return url.handle.clone();
        }
        let handle = self.handles.create_handle(blob);
        inner.blob_urls.insert(
            asset_id.to_string(),
            BlobUrl {
                handle: handle.clone(),
                ref_count: 1,
            },
        );
        handle
    }

    /// Drop one use of an asset's handle, releasing it at zero. Returns
    /// `false` for an asset with no handle.
    pub fn release_blob_url(&self, asset_id: &str) -> bool {
        let released = {
            let mut inner = self.lock();
            let Some(url) = inner.blob_urls.get_mut(asset_id) else {
                return false;
            };
            url.ref_count -= 1;
            if url.ref_count > 0 {
                return true;
            }
            inner.blob_urls.remove(asset_id).map(|url| url.handle)
        };
        if let Some(handle) = released {
            self.handles.release_handle(&handle);
        }
        true
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    pub fn get_cache_stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entry_count: inner.entries.len(),
            total_bytes: inner.total_bytes,
            max_bytes: self.config.max_bytes,
            retained_count: inner.pins.len(),
            stub_count: inner.stubs.len(),
            blob_url_count: inner.blob_urls.len(),
            in_flight_count: inner.in_flight.len(),
            hit_count: inner.hits,
            miss_count: inner.misses,
            eviction_count: inner.evictions,
        }
    }
}

impl std::fmt::Debug for VirtualizedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.get_cache_stats();
        f.debug_struct("VirtualizedCache")
            .field("entry_count", &stats.entry_count)
            .field("total_bytes", &stats.total_bytes)
            .field("max_bytes", &stats.max_bytes)
            .finish()
    }
}

/// Format a byte count with binary units: `512 B`, `1.5 KB`, `100.0 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryHandleAllocator;
    use crate::store::InMemoryResourceStore;
    use serde_json::json;
    use std::time::Duration;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn body(name: &str, pad: usize) -> Value {
        json!({ "id": name, "type": "Manifest", "pad": "x".repeat(pad) })
    }

    fn size_of(v: &Value) -> usize {
        serde_json::to_vec(v).unwrap().len()
    }

    type Fixture = (
        VirtualizedCache,
        Arc<InMemoryResourceStore>,
        Arc<InMemoryHandleAllocator>,
    );

    fn cache_with(max_bytes: usize) -> Fixture {
        let store = Arc::new(InMemoryResourceStore::new());
        let handles = Arc::new(InMemoryHandleAllocator::new());
        let config = CacheConfig::with_max_bytes(max_bytes);
        let cache = VirtualizedCache::new(config, store.clone(), handles.clone());
        (cache, store, handles)
    }

    // -----------------------------------------------------------------------
    // Eviction
    // -----------------------------------------------------------------------

    #[test]
    fn evicts_least_recently_used_first() {
        let one = size_of(&body("a", 100));
        let (cache, _, _) = cache_with(one * 2);
        cache.insert(id("a"), body("a", 100));
        cache.insert(id("b"), body("b", 100));
        assert!(cache.get(&id("a")).is_some());
        cache.insert(id("c"), body("c", 100));

        assert!(cache.get(&id("a")).is_some());
        assert!(cache.get(&id("b")).is_none());
        assert!(cache.get(&id("c")).is_some());
        assert_eq!(cache.get_cache_stats().eviction_count, 1);
    }

    #[test]
    fn retained_entries_are_never_evicted() {
        let one = size_of(&body("a", 100));
        let (cache, _, _) = cache_with(one);
        cache.insert(id("a"), body("a", 100));
        cache.retain(&id("a"));
        cache.insert(id("b"), body("b", 100));
        cache.retain(&id("b"));
        cache.insert(id("c"), body("c", 100));

        // a and b are pinned; only c was unpinned, and it is the newest.
        let stats = cache.get_cache_stats();
        assert!(stats.total_bytes > stats.max_bytes);
        assert!(cache.get(&id("a")).is_some());
        assert!(cache.get(&id("b")).is_some());

        cache.release(&id("a"));
        assert!(cache.get(&id("a")).is_none());
        assert!(cache.get(&id("b")).is_some());
    }

    // A pin taken before the body is loaded applies once it arrives.
    #[test]
    fn retain_before_insert_still_protects() {
        let one = size_of(&body("a", 50));
        let (cache, _, _) = cache_with(one);
        cache.retain(&id("a"));
        cache.insert(id("a"), body("a", 50));
        cache.insert(id("b"), body("b", 50));
        cache.insert(id("c"), body("c", 50));
        assert!(cache.get(&id("a")).is_some());
        assert!(cache.get(&id("b")).is_none());
    }

    #[test]
    fn release_never_goes_below_zero() {
        let (cache, _, _) = cache_with(1024);
        assert_eq!(cache.release(&id("x")), 0);
        assert_eq!(cache.retain(&id("x")), 1);
        assert_eq!(cache.retain(&id("x")), 2);
        assert_eq!(cache.release(&id("x")), 1);
        assert_eq!(cache.release(&id("x")), 0);
        assert_eq!(cache.release(&id("x")), 0);
        assert_eq!(cache.ref_count(&id("x")), 0);
    }

    #[test]
    fn oversized_entry_is_kept_on_insert() {
        let (cache, _, _) = cache_with(10);
        cache.insert(id("big"), body("big", 500));
        assert!(cache.get(&id("big")).is_some());
        cache.insert(id("next"), body("next", 1));
        assert!(cache.get(&id("big")).is_none());
    }

    #[test]
    fn replacing_a_body_updates_byte_total() {
        let (cache, _, _) = cache_with(1 << 20);
        cache.insert(id("a"), body("a", 100));
        cache.insert(id("a"), body("a", 10));
        assert_eq!(cache.get_cache_stats().total_bytes, size_of(&body("a", 10)));
        assert!(cache.invalidate(&id("a")));
        assert_eq!(cache.get_cache_stats().total_bytes, 0);
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn load_full_caches_result() {
        let (cache, store, _) = cache_with(1 << 20);
        store.put("m1", body("m1", 10));
        let first = cache.load_full(&id("m1")).await.unwrap();
        let second = cache.load_full(&id("m1")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.load_count(), 1);
        assert!(cache.load_full(&id("missing")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_request() {
        let store = Arc::new(InMemoryResourceStore::new().with_latency(Duration::from_millis(20)));
        store.put("m1", body("m1", 10));
        let cache = VirtualizedCache::new(
            CacheConfig::default(),
            store.clone(),
            Arc::new(InMemoryHandleAllocator::new()),
        );
        let target = id("m1");
        let (a, b, c) = tokio::join!(
            cache.load_full(&target),
            cache.load_full(&target),
            cache.load_full(&target)
        );
        assert_eq!(store.load_count(), 1);
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(cache.get_cache_stats().in_flight_count, 0);
    }

    #[tokio::test]
    async fn failed_load_resolves_none_and_can_retry() {
        let (cache, store, _) = cache_with(1 << 20);
        store.put("m1", body("m1", 10));
        store.set_available(false);
        assert!(cache.load_full(&id("m1")).await.is_none());
        store.set_available(true);
        assert!(cache.load_full(&id("m1")).await.is_some());
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn save_writes_through_and_delete_clears() {
        let (cache, store, _) = cache_with(1 << 20);
        cache.save(&id("m1"), body("m1", 5)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(cache.get(&id("m1")).is_some());
        assert!(cache.delete(&id("m1")).await.unwrap());
        assert!(cache.get(&id("m1")).is_none());
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Stubs and preload
    // -----------------------------------------------------------------------

    fn archive_doc() -> Value {
        json!({
            "id": "top", "type": "Collection", "label": { "en": ["Archive"] },
            "items": [
                { "id": "m1", "type": "Manifest", "items": [{ "id": "c1", "type": "Canvas" }] },
                { "id": "m2", "type": "Manifest", "items": [] },
                { "id": "m3", "type": "Manifest", "items": [] }
            ]
        })
    }

    #[tokio::test]
    async fn stub_tree_and_preload() {
        let (cache, store, _) = cache_with(1 << 20);
        let root = cache.create_stub_tree(&archive_doc()).unwrap();
        assert_eq!(root.label, "Archive");
        assert_eq!(root.canvas_count, 1);
        assert!(root.loaded);
        assert_eq!(cache.child_stubs(&id("top")).len(), 3);

        cache.invalidate(&id("m2"));
        cache.invalidate(&id("m3"));
        assert!(!cache.stub(&id("m2")).unwrap().loaded);
        store.put("m2", body("m2", 1));

        // m3 is not in the store, so only m2 comes back.
        assert_eq!(cache.preload_children(&id("top")).await, 1);
        assert!(cache.stub(&id("m2")).unwrap().loaded);
        assert!(!cache.stub(&id("m3")).unwrap().loaded);
        assert_eq!(cache.preload_children(&id("nope")).await, 0);
    }

    #[tokio::test]
    async fn preload_respects_limit() {
        let store = Arc::new(InMemoryResourceStore::new());
        let cache = VirtualizedCache::new(
            CacheConfig {
                max_bytes: 1 << 20,
                preload_limit: 2,
            },
            store.clone(),
            Arc::new(InMemoryHandleAllocator::new()),
        );
        cache.create_stub_tree(&archive_doc()).unwrap();
        for m in ["m1", "m2", "m3"] {
            cache.invalidate(&id(m));
            store.put(m, body(m, 1));
        }
        assert_eq!(cache.preload_children(&id("top")).await, 2);
        assert_eq!(store.load_count(), 2);
    }

    // -----------------------------------------------------------------------
    // Blob URLs
    // -----------------------------------------------------------------------

    #[test]
    fn blob_urls_are_ref_counted() {
        let (cache, _, handles) = cache_with(1024);
        let blob = Bytes::from_static(b"\x89PNG");
        let a = cache.get_blob_url("asset-1", &blob);
        let b = cache.get_blob_url("asset-1", &blob);
        assert_eq!(a, b);
        assert_eq!(handles.live_count(), 1);

        assert!(cache.release_blob_url("asset-1"));
        assert_eq!(handles.live_count(), 1);
        assert!(cache.release_blob_url("asset-1"));
        assert_eq!(handles.live_count(), 0);
        assert!(!cache.release_blob_url("asset-1"));
    }

    #[test]
    fn clear_releases_everything() {
        let (cache, _, handles) = cache_with(1 << 20);
        cache.create_stub_tree(&archive_doc());
        cache.get_blob_url("asset", &Bytes::from_static(b"x"));
        cache.clear();
        let stats = cache.get_cache_stats();
        assert_eq!((stats.entry_count, stats.stub_count, stats.total_bytes), (0, 0, 0));
        assert_eq!(handles.live_count(), 0);
    }

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(100 * 1024 * 1024), "100.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn hit_rate() {
        let (cache, _, _) = cache_with(1024);
        assert_eq!(cache.get_cache_stats().hit_rate(), 0.0);
        cache.insert(id("a"), json!({}));
        cache.get(&id("a"));
        cache.get(&id("b"));
        assert_eq!(cache.get_cache_stats().hit_rate(), 0.5);
    }
}
