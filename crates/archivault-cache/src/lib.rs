//! Virtualized resource cache for Archivault.
//!
//! Large archives are browsed through lightweight [`ResourceStub`]s; full
//! bodies are loaded on demand from a [`ResourceStore`] and kept in a
//! byte-budgeted LRU cache.
//!
//! # Collaborators
//!
//! - [`ResourceStore`] -- async backing storage for full bodies
//!   ([`InMemoryResourceStore`] for tests and embedding)
//! - [`BlobHandleAllocator`] -- issues displayable handles for binary assets
//!   ([`InMemoryHandleAllocator`])
//!
//! # Rules
//!
//! 1. An entry with a non-zero retain count is never evicted.
//! 2. Concurrent loads of one id make one store request and share the result.
//! 3. Store failures are logged and surface as "unavailable", never as panics.
//! 4. Retain and blob handle counts never go below zero.

pub mod blob;
pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod stub;

pub use blob::{BlobHandleAllocator, InMemoryHandleAllocator};
pub use cache::{format_bytes, CacheEntry, CacheStats, VirtualizedCache};
pub use config::CacheConfig;
pub use error::{StoreError, StoreResult};
pub use store::{InMemoryResourceStore, ResourceStore};
pub use stub::ResourceStub;
