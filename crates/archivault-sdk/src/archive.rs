use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use archivault_cache::{BlobHandleAllocator, ResourceStore, VirtualizedCache};
use archivault_history::HistoryManager;
use archivault_trash::{self as trash, RestoreOptions, TrashStats};
use archivault_types::{Entity, EntityId, EntityPatch, EntityUpdate};
use archivault_vault::{
    self as vault, check_integrity, IntegrityReport, NormalizedState, VaultError, VaultResult,
};

use crate::config::ArchiveConfig;
use crate::error::{SdkError, SdkResult};

/// What a purge pass did, without the resulting snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct PurgeSummary {
    pub deleted_count: usize,
    pub purged_ids: Vec<EntityId>,
    pub errors: Vec<VaultError>,
}

/// What a best-effort batch did, without the resulting snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSummary {
    pub processed_count: usize,
    pub failed_count: usize,
    pub errors: Vec<(EntityId, VaultError)>,
}

/// One open IIIF document with undoable edits.
///
/// Every mutating call runs the matching pure vault or trash operation on
/// the current snapshot and records the result as one undo step. A failed
/// call records nothing and leaves the document as it was.
pub struct Archive {
    current: NormalizedState,
    history: HistoryManager<NormalizedState>,
    config: ArchiveConfig,
}

impl Archive {
    /// An empty document.
    pub fn new(config: ArchiveConfig) -> Self {
        Self::from_state(NormalizedState::new(), config)
    }

    /// Open an existing snapshot.
    pub fn from_state(state: NormalizedState, config: ArchiveConfig) -> Self {
        Self {
            history: HistoryManager::with_initial(state.clone(), config.history.clone()),
            current: state,
            config,
        }
    }

    /// Open a nested IIIF Presentation 3 document.
    pub fn from_json(document: &Value, config: ArchiveConfig) -> SdkResult<Self> {
        let state = vault::normalize(document)?;
        info!(
            root = ?state.root_id(),
            entities = state.entity_count(),
            "opened archive"
        );
        Ok(Self::from_state(state, config))
    }

    /// Parse and open a JSON document.
    pub fn from_json_str(text: &str, config: ArchiveConfig) -> SdkResult<Self> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_json(&document, config)
    }

    /// The current document as nested IIIF JSON.
    pub fn to_json(&self) -> SdkResult<Value> {
        vault::denormalize(&self.current).ok_or(SdkError::NoRoot)
    }

    pub fn state(&self) -> &NormalizedState {
        &self.current
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// A resource cache sized by this archive's config.
    pub fn open_cache(
        &self,
        store: Arc<dyn ResourceStore>,
        handles: Arc<dyn BlobHandleAllocator>,
    ) -> VirtualizedCache {
        VirtualizedCache::new(self.config.cache.clone(), store, handles)
    }

    fn apply<F>(&mut self, op: F) -> SdkResult<()>
    where
        F: FnOnce(&NormalizedState) -> VaultResult<NormalizedState>,
    {
        let next = op(&self.current)?;
        if self.history.push(next.clone()) {
            self.current = next;
        }
        Ok(())
    }

    // ---- Vault mutations ----

    pub fn add_entity(&mut self, entity: Entity) -> SdkResult<()> {
        self.apply(|s| vault::add_entity(s, entity))
    }

    pub fn add_child(
        &mut self,
        parent_id: &EntityId,
        child: Entity,
        index: Option<usize>,
    ) -> SdkResult<()> {
        self.apply(|s| vault::add_child(s, parent_id, child, index))
    }

    pub fn link_child(
        &mut self,
        parent_id: &EntityId,
        child_id: &EntityId,
        index: Option<usize>,
    ) -> SdkResult<()> {
        self.apply(|s| vault::link_child(s, parent_id, child_id, index))
    }

    pub fn add_structure(
        &mut self,
        manifest_id: &EntityId,
        range: Entity,
        index: Option<usize>,
    ) -> SdkResult<()> {
        self.apply(|s| vault::add_structure(s, manifest_id, range, index))
    }

    pub fn remove_child(&mut self, parent_id: &EntityId, child_id: &EntityId) -> SdkResult<()> {
        self.apply(|s| vault::remove_child(s, parent_id, child_id))
    }

    pub fn remove_entity(&mut self, id: &EntityId) -> SdkResult<()> {
        self.apply(|s| vault::remove_entity(s, id))
    }

    pub fn reorder_children(
        &mut self,
        parent_id: &EntityId,
        new_order: &[EntityId],
    ) -> SdkResult<()> {
        self.apply(|s| vault::reorder_children(s, parent_id, new_order))
    }

    pub fn move_entity(
        &mut self,
        id: &EntityId,
        new_parent_id: &EntityId,
        index: Option<usize>,
    ) -> SdkResult<()> {
        self.apply(|s| vault::move_entity(s, id, new_parent_id, index))
    }

    pub fn update_entity(&mut self, id: &EntityId, patch: &EntityPatch) -> SdkResult<()> {
        self.apply(|s| vault::update_entity(s, id, patch))
    }

    pub fn batch_update(&mut self, updates: &[EntityUpdate]) -> SdkResult<()> {
        self.apply(|s| vault::batch_update(s, updates))
    }

    pub fn update_dimensions(&mut self, id: &EntityId, width: f64, height: f64) -> SdkResult<()> {
        self.apply(|s| vault::update_dimensions(s, id, width, height))
    }

    pub fn update_duration(&mut self, id: &EntityId, duration: f64) -> SdkResult<()> {
        self.apply(|s| vault::update_duration(s, id, duration))
    }

    pub fn set_root(&mut self, id: &EntityId) -> SdkResult<()> {
        self.apply(|s| vault::set_root(s, id))
    }

    // ---- Trash ----

    pub fn move_to_trash(&mut self, id: &EntityId) -> SdkResult<()> {
        self.apply(|s| trash::move_to_trash(s, id))
    }

    pub fn restore_from_trash(&mut self, id: &EntityId, options: &RestoreOptions) -> SdkResult<()> {
        self.apply(|s| trash::restore_from_trash(s, id, options))
    }

    /// Purge one trash record immediately.
    pub fn delete_permanently(&mut self, id: &EntityId) -> SdkResult<()> {
        self.apply(|s| trash::delete_permanently(s, id))
    }

    pub fn empty_trash(&mut self) -> PurgeSummary {
        let outcome = trash::empty_trash(&self.current);
        self.record(outcome.state);
        PurgeSummary {
            deleted_count: outcome.deleted_count,
            purged_ids: outcome.purged_ids,
            errors: outcome.errors,
        }
    }

    /// Purge records older than the configured retention window.
    pub fn auto_cleanup(&mut self) -> PurgeSummary {
        let outcome = trash::auto_cleanup(&self.current, self.config.trash.retention_days);
        self.record(outcome.state);
        PurgeSummary {
            deleted_count: outcome.deleted_count,
            purged_ids: outcome.purged_ids,
            errors: outcome.errors,
        }
    }

    pub fn batch_move_to_trash(&mut self, ids: &[EntityId]) -> BatchSummary {
        let outcome = trash::batch_move_to_trash(&self.current, ids);
        self.record(outcome.state);
        BatchSummary {
            processed_count: outcome.processed_count,
            failed_count: outcome.failed_count,
            errors: outcome.errors,
        }
    }

    pub fn batch_restore(&mut self, ids: &[EntityId], options: &RestoreOptions) -> BatchSummary {
        let outcome = trash::batch_restore(&self.current, ids, options);
        self.record(outcome.state);
        BatchSummary {
            processed_count: outcome.processed_count,
            failed_count: outcome.failed_count,
            errors: outcome.errors,
        }
    }

    pub fn trash_stats(&self) -> TrashStats {
        trash::get_trash_stats_at(&self.current, &self.config.trash, Utc::now())
    }

    fn record(&mut self, next: NormalizedState) {
        if self.history.push(next.clone()) {
            self.current = next;
        }
    }

    // ---- History ----

    /// Step back one edit. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(previous) => {
                self.current = previous.clone();
                true
            }
            None => false,
        }
    }

    /// Re-apply one undone edit. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(next) => {
                self.current = next.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run several edits as one undo step.
    ///
    /// If `edits` fails, every change it made is rolled back and the error is
    /// returned.
    pub fn batch<R, F>(&mut self, edits: F) -> SdkResult<R>
    where
        F: FnOnce(&mut Self) -> SdkResult<R>,
    {
        self.history.begin_batch();
        match edits(self) {
            Ok(value) => {
                self.history.end_batch();
                Ok(value)
            }
            Err(e) => {
                if let Some(before) = self.history.cancel_batch() {
                    self.current = before.clone();
                }
                debug!(error = %e, "rolled back batch");
                Err(e)
            }
        }
    }

    pub fn check_integrity(&self) -> IntegrityReport {
        check_integrity(&self.current)
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("root", &self.current.root_id())
            .field("entities", &self.current.entity_count())
            .field("trashed", &self.current.trashed().len())
            .field("undo_depth", &self.history.undo_depth())
            .finish()
    }
}
