//! Foundation types for Archivault.
//!
//! This crate provides the identity, classification and body types shared by
//! every other Archivault crate. It knows nothing about snapshots or graphs;
//! it only answers "what is this resource" and "may this resource hold that
//! one".
//!
//! # Key Types
//!
//! - [`EntityId`] -- URI-shaped identifier of a IIIF resource
//! - [`ResourceType`] -- Collection, Manifest, Canvas, Range, AnnotationPage, Annotation
//! - [`RelationKind`] -- ownership (exclusive) or reference (shared) edges
//! - [`Entity`] -- the normalized body of one resource, without child lists
//! - [`EntityPatch`] -- a partial update applied by batch edits

pub mod entity;
pub mod error;
pub mod id;
pub mod resource;

pub use entity::{label_text, Entity, EntityPatch, EntityUpdate, KNOWN_PROPERTIES};
pub use error::TypeError;
pub use id::EntityId;
pub use resource::{relation_between, RelationKind, ResourceType};
