//! Soft deletion, restore and purge.
//!
//! Every function takes a snapshot and returns a new one, like the vault
//! operations. `Live → Trashed → {Restored → Live | Purged → gone}`: an id is
//! never live and trashed at the same time.
//!
//! Trashing cuts the entity out of the graph but leaves its owned
//! descendants live and unattached, so a restore can re-link them. Purging a
//! record hard-deletes any owned children it left orphaned.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use archivault_types::{relation_between, Entity, EntityId, RelationKind, ResourceType};
use archivault_vault::{NormalizedState, TrashedEntity, VaultError, VaultResult};

/// Where to put a restored entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Preferred parent. Ignored if not live or not type-compatible.
    pub parent_id: Option<EntityId>,
}

impl RestoreOptions {
    pub fn under(parent_id: impl Into<EntityId>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
        }
    }
}

/// Result of a purge pass.
#[derive(Clone, Debug)]
pub struct PurgeOutcome {
    pub state: NormalizedState,
    /// Number of trash records removed.
    pub deleted_count: usize,
    pub purged_ids: Vec<EntityId>,
    /// Records that were skipped, with the reason.
    pub errors: Vec<VaultError>,
}

/// Result of a best-effort batch.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub state: NormalizedState,
    pub processed_count: usize,
    pub failed_count: usize,
    pub errors: Vec<(EntityId, VaultError)>,
}

// ---------------------------------------------------------------
// Move to trash
// ---------------------------------------------------------------

/// Soft-delete a live entity, stamped with the current time.
pub fn move_to_trash(state: &NormalizedState, id: &EntityId) -> VaultResult<NormalizedState> {
    move_to_trash_at(state, id, Utc::now())
}

/// Soft-delete a live entity, stamped with `now`.
pub fn move_to_trash_at(
    state: &NormalizedState,
    id: &EntityId,
    now: DateTime<Utc>,
) -> VaultResult<NormalizedState> {
    if state.is_trashed(id) {
        return Err(VaultError::Trashed(id.clone()));
    }
    if !state.contains(id) {
        return Err(VaultError::NotFound(id.clone()));
    }
    if state.root_id() == Some(id) {
        return Err(VaultError::RootProtected(id.clone()));
    }

    let mut next = state.clone();
    let detached = next.detach(id);
    let (entity, extensions) = next
        .remove_record(id)
        .ok_or_else(|| VaultError::NotFound(id.clone()))?;

    debug!(
        %id,
        parent = ?detached.parent,
        children = detached.items.len(),
        "moved entity to trash"
    );
    next.insert_trashed(
        id.clone(),
        TrashedEntity {
            entity: Some(Entity::clone(&entity)),
            trashed_at: Some(now),
            original_parent_id: detached.parent,
            original_index: detached.index,
            member_of_collections: detached.referrers,
            child_ids: detached.items,
            structure_ids: detached.structures,
            extensions,
        },
    );
    Ok(next)
}

/// Trash each id in turn; failures are collected, not fatal.
pub fn batch_move_to_trash(state: &NormalizedState, ids: &[EntityId]) -> BatchOutcome {
    let now = Utc::now();
    run_batch(state, ids, |s, id| move_to_trash_at(s, id, now))
}

// ---------------------------------------------------------------
// Restore
// ---------------------------------------------------------------

/// Bring a trashed entity back to the live graph.
///
/// The entity goes under `options.parent_id` when that parent is live and
/// accepts it, else back under its original parent (at its original position
/// when possible), else it is restored unattached. Surviving referrers and
/// children are re-linked.
pub fn restore_from_trash(
    state: &NormalizedState,
    id: &EntityId,
    options: &RestoreOptions,
) -> VaultResult<NormalizedState> {
    let record = state
        .trashed_record(id)
        .ok_or_else(|| VaultError::NotFound(id.clone()))?;
    let entity = record
        .entity
        .clone()
        .ok_or_else(|| VaultError::CorruptedRecord(id.clone()))?;
    if state.contains(id) {
        return Err(VaultError::DuplicateId(id.clone()));
    }

    let mut next = state.clone();
    let record = next
        .take_trashed(id)
        .ok_or_else(|| VaultError::NotFound(id.clone()))?;
    let kind = entity.kind;
    next.insert_entity(entity);
    next.set_extensions(id, record.extensions.clone());

    let requested = options
        .parent_id
        .as_ref()
        .filter(|p| accepts(&next, p, id, kind))
        .map(|p| (p.clone(), None));
    if requested.is_none() {
        if let Some(p) = &options.parent_id {
            warn!(%id, parent = %p, "requested restore parent unavailable, falling back");
        }
    }
    let original = record
        .original_parent_id
        .as_ref()
        .filter(|p| accepts(&next, p, id, kind))
        .map(|p| (p.clone(), record.original_index));

    let parent = requested.or(original);
    if let Some((parent_id, index)) = &parent {
        attach(&mut next, parent_id, id, kind, *index);
    }

    for referrer in &record.member_of_collections {
        if parent.as_ref().is_some_and(|(p, _)| p == referrer) {
            continue;
        }
        let relation = next.get_type(referrer).and_then(|t| relation_between(t, kind));
        if relation == Some(RelationKind::Reference) && !next.would_create_cycle(referrer, id) {
            next.link(referrer, id, RelationKind::Reference, None);
        }
    }

    for child in &record.child_ids {
        let Some(relation) = next.get_type(child).and_then(|t| relation_between(kind, t)) else {
            continue;
        };
        let free = relation == RelationKind::Reference || next.parent(child).is_none();
        if free && !next.would_create_cycle(id, child) {
            next.link(id, child, relation, None);
        }
    }
    for range in &record.structure_ids {
        if next.get_type(range) == Some(ResourceType::Range) && next.parent(range).is_none() {
            next.link_structure(id, range, None);
        }
    }

    debug!(%id, parent = ?parent.map(|(p, _)| p), "restored entity from trash");
    Ok(next)
}

fn accepts(state: &NormalizedState, parent: &EntityId, id: &EntityId, kind: ResourceType) -> bool {
    let Some(parent_type) = state.get_type(parent) else {
        return false;
    };
    let structural = parent_type == ResourceType::Manifest && kind == ResourceType::Range;
    (structural || relation_between(parent_type, kind).is_some())
        && !state.would_create_cycle(parent, id)
}

fn attach(
    state: &mut NormalizedState,
    parent: &EntityId,
    id: &EntityId,
    kind: ResourceType,
    index: Option<usize>,
) {
    match state.get_type(parent) {
        Some(ResourceType::Manifest) if kind == ResourceType::Range => {
            state.link_structure(parent, id, index)
        }
        Some(parent_type) => {
            if let Some(relation) = relation_between(parent_type, kind) {
                state.link(parent, id, relation, index);
            }
        }
        None => {}
    }
}

/// Restore each id in turn under the same options.
pub fn batch_restore(
    state: &NormalizedState,
    ids: &[EntityId],
    options: &RestoreOptions,
) -> BatchOutcome {
    run_batch(state, ids, |s, id| restore_from_trash(s, id, options))
}

fn run_batch<F>(state: &NormalizedState, ids: &[EntityId], mut op: F) -> BatchOutcome
where
    F: FnMut(&NormalizedState, &EntityId) -> VaultResult<NormalizedState>,
{
    let mut current = state.clone();
    let mut processed_count = 0;
    let mut errors = Vec::new();
    for id in ids {
        match op(&current, id) {
            Ok(next) => {
                current = next;
                processed_count += 1;
            }
            Err(e) => errors.push((id.clone(), e)),
        }
    }
    BatchOutcome {
        state: current,
        processed_count,
        failed_count: errors.len(),
        errors,
    }
}

// ---------------------------------------------------------------
// Purge
// ---------------------------------------------------------------

/// Permanently remove one trash record.
///
/// Owned children left unattached by the trash operation are hard-deleted
/// along with everything they own.
pub fn delete_permanently(state: &NormalizedState, id: &EntityId) -> VaultResult<NormalizedState> {
    let record = state
        .trashed_record(id)
        .ok_or_else(|| VaultError::NotFound(id.clone()))?;
    let kind = record
        .kind()
        .ok_or_else(|| VaultError::CorruptedRecord(id.clone()))?;

    let owned_items = if kind.items_relation() == Some(RelationKind::Ownership) {
        record.child_ids.as_slice()
    } else {
        &[][..]
    };
    let mut next = state.clone();
    for orphan in owned_items.iter().chain(&record.structure_ids) {
        if next.contains(orphan) && next.parent(orphan).is_none() {
            next.delete_cascade(orphan);
        }
    }
    next.take_trashed(id);
    Ok(next)
}

/// Purge every trash record. Corrupted records are reported and left in place.
pub fn empty_trash(state: &NormalizedState) -> PurgeOutcome {
    let ids: Vec<EntityId> = state.trashed().keys().cloned().collect();
    purge(state, ids)
}

/// Purge records older than `max_age_days`, measured from now.
pub fn auto_cleanup(state: &NormalizedState, max_age_days: i64) -> PurgeOutcome {
    auto_cleanup_at(state, max_age_days, Utc::now())
}

/// Purge records trashed more than `max_age_days` before `now`. Records
/// without a timestamp are kept.
///
/// A negative window, or one reaching back past the representable calendar,
/// purges nothing.
pub fn auto_cleanup_at(
    state: &NormalizedState,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> PurgeOutcome {
    if max_age_days < 0 {
        warn!(max_age_days, "negative retention window, nothing purged");
        return purge(state, Vec::new());
    }
    let Some(cutoff) = TimeDelta::try_days(max_age_days).and_then(|d| now.checked_sub_signed(d))
    else {
        debug!(max_age_days, "retention window exceeds calendar range, nothing purged");
        return purge(state, Vec::new());
    };
    let ids: Vec<EntityId> = state
        .trashed()
        .iter()
        .filter(|(_, record)| record.trashed_at.is_some_and(|t| t < cutoff))
        .map(|(id, _)| id.clone())
        .collect();
    purge(state, ids)
}

fn purge(state: &NormalizedState, ids: Vec<EntityId>) -> PurgeOutcome {
    let mut current = state.clone();
    let mut purged_ids = Vec::new();
    let mut errors = Vec::new();
    for id in ids {
        match delete_permanently(&current, &id) {
            Ok(next) => {
                current = next;
                purged_ids.push(id);
            }
            Err(e) => {
                warn!(%id, error = %e, "skipping trash record");
                errors.push(e);
            }
        }
    }
    if !purged_ids.is_empty() || !errors.is_empty() {
        info!(purged = purged_ids.len(), skipped = errors.len(), "purged trash");
    }
    PurgeOutcome {
        state: current,
        deleted_count: purged_ids.len(),
        purged_ids,
        errors,
    }
}

// ---------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------

/// Ids of every trash record, sorted.
pub fn get_trashed_ids(state: &NormalizedState) -> Vec<EntityId> {
    state.trashed().keys().cloned().collect()
}

/// Returns `true` if `id` is in the trash.
pub fn is_trashed(state: &NormalizedState, id: &str) -> bool {
    state.is_trashed(id)
}
