//! High-level SDK for Archivault.
//!
//! [`Archive`] is the entry point for applications that edit an IIIF
//! document: it owns the current vault snapshot, routes every edit through
//! the vault and trash operations and records each one in the undo history.

pub mod archive;
pub mod config;
pub mod error;

pub use archive::{Archive, BatchSummary, PurgeSummary};
pub use config::ArchiveConfig;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use archivault_types::{Entity, EntityId, EntityPatch, EntityUpdate, ResourceType};
pub use archivault_vault::{IntegrityReport, NormalizedState, VaultError};
pub use archivault_trash::{RestoreOptions, TrashStats};
pub use archivault_cache::{InMemoryHandleAllocator, InMemoryResourceStore, VirtualizedCache};
