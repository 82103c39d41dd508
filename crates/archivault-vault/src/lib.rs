//! Normalized entity store for Archivault.
//!
//! The vault holds a IIIF resource hierarchy as one flat, indexed snapshot
//! ([`NormalizedState`]) instead of a nested JSON tree. Every mutation is a
//! pure function from one snapshot to the next; snapshots share all untouched
//! indices and entity bodies, which keeps undo history cheap.
//!
//! # Key Types
//!
//! - [`NormalizedState`] -- one immutable version of the resource graph
//! - [`TrashedEntity`] -- a soft-deleted entity with its restore context
//! - [`VaultError`] -- why an operation produced no new snapshot
//! - [`IntegrityReport`] -- cross-index consistency check
//!
//! # Example
//!
//! ```
//! use archivault_types::{Entity, EntityId, ResourceType};
//! use archivault_vault::{ops, NormalizedState};
//!
//! let s0 = NormalizedState::new();
//! let s1 = ops::add_entity(&s0, Entity::new("m", ResourceType::Manifest)).unwrap();
//! let canvas = Entity::new("c", ResourceType::Canvas);
//! let s2 = ops::add_child(&s1, &EntityId::new("m"), canvas, None).unwrap();
//! assert_eq!(s2.children("m"), &[EntityId::new("c")]);
//! assert!(s1.children("m").is_empty());
//! ```

pub mod error;
pub mod integrity;
pub mod ops;
pub mod query;
pub mod state;
pub mod wire;

pub use error::{VaultError, VaultResult};
pub use integrity::{check_integrity, IntegrityIssue, IntegrityReport, IssueKind};
pub use ops::{
    add_child, add_entity, add_structure, batch_update, link_child, move_entity, remove_child,
    remove_entity, reorder_children, set_root, update_dimensions, update_duration, update_entity,
};
pub use state::{Detachment, EdgeLists, Extensions, NormalizedState, TrashedEntity};
pub use wire::{denormalize, denormalize_entity, normalize};
