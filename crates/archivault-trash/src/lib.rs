//! Soft-delete service for Archivault.
//!
//! Moving an entity to the trash removes it from the live graph but keeps
//! enough context (original parent and position, referrers, children,
//! extension fields) to put it back. Trash records live inside the vault
//! snapshot itself, so undo/redo covers trash operations too.
//!
//! # Operations
//!
//! - [`move_to_trash`] / [`restore_from_trash`] -- single-entity lifecycle
//! - [`empty_trash`] / [`auto_cleanup`] -- permanent deletion, best effort
//! - [`batch_move_to_trash`] / [`batch_restore`] -- best-effort batches
//! - [`get_trash_stats`] -- counts, age range and expiry summary
//!
//! # Rules
//!
//! 1. An id is never live and trashed at the same time.
//! 2. The document root cannot be trashed.
//! 3. Corrupted records are reported and skipped, never fatal.
//! 4. Records without a timestamp are never auto-cleaned.

pub mod config;
pub mod service;
pub mod stats;

pub use config::TrashConfig;
pub use service::{
    auto_cleanup, auto_cleanup_at, batch_move_to_trash, batch_restore, delete_permanently,
    empty_trash, get_trashed_ids, is_trashed, move_to_trash, move_to_trash_at, restore_from_trash,
    BatchOutcome, PurgeOutcome, RestoreOptions,
};
pub use stats::{
    format_relative_time, get_days_until_expiration, get_trash_stats, get_trash_stats_at,
    TrashStats,
};
