//! Pure mutation operations.
//!
//! Every function here takes a snapshot by reference and returns a new one.
//! The input is never modified, so an `Err` always leaves the caller holding
//! the original, untouched snapshot: there is no partially-applied result.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use archivault_types::{
    relation_between, Entity, EntityId, EntityPatch, EntityUpdate, RelationKind, ResourceType,
};

use crate::error::{VaultError, VaultResult};
use crate::state::NormalizedState;

fn live_type(state: &NormalizedState, id: &EntityId) -> VaultResult<ResourceType> {
    state
        .get_type(id.as_str())
        .ok_or_else(|| VaultError::NotFound(id.clone()))
}

fn ensure_new(state: &NormalizedState, id: &EntityId) -> VaultResult<()> {
    if state.is_trashed(id.as_str()) {
        return Err(VaultError::Trashed(id.clone()));
    }
    if state.contains(id.as_str()) {
        return Err(VaultError::DuplicateId(id.clone()));
    }
    Ok(())
}

fn relation(parent: ResourceType, child: ResourceType) -> VaultResult<RelationKind> {
    relation_between(parent, child).ok_or(VaultError::InvalidChildType { parent, child })
}

// ---------------------------------------------------------------
// Insertion
// ---------------------------------------------------------------

/// Insert an unattached entity. The first entity of an empty store becomes
/// the document root.
pub fn add_entity(state: &NormalizedState, entity: Entity) -> VaultResult<NormalizedState> {
    ensure_new(state, &entity.id)?;
    let mut next = state.clone();
    if next.is_empty() && next.root_id().is_none() {
        next.set_root(Some(entity.id.clone()));
    }
    debug!(id = %entity.id, kind = %entity.kind, "added entity");
    next.insert_entity(entity);
    Ok(next)
}

/// Insert `child` into `parent_id`'s `items` at `index` (append when `None`).
///
/// For reference edges an already-live child is linked rather than
/// duplicated, and its stored body is kept. For ownership edges the child
/// must be new; use [`move_entity`] to re-home an owned entity.
pub fn add_child(
    state: &NormalizedState,
    parent_id: &EntityId,
    child: Entity,
    index: Option<usize>,
) -> VaultResult<NormalizedState> {
    let parent_type = live_type(state, parent_id)?;
    let kind = relation(parent_type, child.kind)?;

    match state.get_type(child.id.as_str()) {
        Some(existing) if existing != child.kind => Err(VaultError::DuplicateId(child.id)),
        Some(_) if kind == RelationKind::Ownership => Err(VaultError::DuplicateId(child.id)),
        Some(_) => link_child(state, parent_id, &child.id, index),
        None => {
            ensure_new(state, &child.id)?;
            let mut next = state.clone();
            let child_id = child.id.clone();
            next.insert_entity(child);
            next.link(parent_id, &child_id, kind, index);
            debug!(parent = %parent_id, child = %child_id, ?kind, "added child");
            Ok(next)
        }
    }
}

/// Add a reference edge from `parent_id` to an existing entity.
pub fn link_child(
    state: &NormalizedState,
    parent_id: &EntityId,
    child_id: &EntityId,
    index: Option<usize>,
) -> VaultResult<NormalizedState> {
    let parent_type = live_type(state, parent_id)?;
    let child_type = live_type(state, child_id)?;
    let kind = relation(parent_type, child_type)?;
    if kind == RelationKind::Ownership && state.parent(child_id.as_str()).is_some() {
        return Err(VaultError::DuplicateId(child_id.clone()));
    }
    if state.children(parent_id.as_str()).contains(child_id) {
        return Err(VaultError::DuplicateId(child_id.clone()));
    }
    if state.would_create_cycle(parent_id.as_str(), child_id.as_str()) {
        return Err(VaultError::CycleDetected {
            parent: parent_id.clone(),
            child: child_id.clone(),
        });
    }
    let mut next = state.clone();
    next.link(parent_id, child_id, kind, index);
    debug!(parent = %parent_id, child = %child_id, ?kind, "linked child");
    Ok(next)
}

/// Insert a new range into a manifest's `structures`.
pub fn add_structure(
    state: &NormalizedState,
    manifest_id: &EntityId,
    range: Entity,
    index: Option<usize>,
) -> VaultResult<NormalizedState> {
    let parent = live_type(state, manifest_id)?;
    if parent != ResourceType::Manifest || range.kind != ResourceType::Range {
        return Err(VaultError::InvalidChildType {
            parent,
            child: range.kind,
        });
    }
    ensure_new(state, &range.id)?;
    let mut next = state.clone();
    let range_id = range.id.clone();
    next.insert_entity(range);
    next.link_structure(manifest_id, &range_id, index);
    Ok(next)
}

// ---------------------------------------------------------------
// Removal
// ---------------------------------------------------------------

/// Remove the edge `parent_id → child_id`.
///
/// An owned child is deleted together with everything it owns; a
/// referenced child only loses the pointer and stays live.
pub fn remove_child(
    state: &NormalizedState,
    parent_id: &EntityId,
    child_id: &EntityId,
) -> VaultResult<NormalizedState> {
    let parent_type = live_type(state, parent_id)?;
    live_type(state, child_id)?;

    let in_items = state.children(parent_id.as_str()).contains(child_id);
    let in_structures = state.structures_of(parent_id.as_str()).contains(child_id);
    let mut next = state.clone();
    match parent_type.items_relation() {
        Some(RelationKind::Reference) if in_items => {
            next.unlink(parent_id, child_id);
            debug!(parent = %parent_id, child = %child_id, "removed reference");
        }
        Some(RelationKind::Ownership) if in_items => {
            let deleted = next.delete_cascade(child_id);
            debug!(
                parent = %parent_id,
                child = %child_id,
                deleted = deleted.len(),
                "removed owned child"
            );
        }
        _ if in_structures => {
            next.delete_cascade(child_id);
        }
        _ => return Err(VaultError::NotFound(child_id.clone())),
    }
    Ok(next)
}

/// Hard-delete a live entity and everything it owns.
pub fn remove_entity(state: &NormalizedState, id: &EntityId) -> VaultResult<NormalizedState> {
    live_type(state, id)?;
    let mut next = state.clone();
    let deleted = next.delete_cascade(id);
    debug!(%id, deleted = deleted.len(), "removed entity");
    Ok(next)
}

// ---------------------------------------------------------------
// Ordering and moves
// ---------------------------------------------------------------

/// Replace the order of `parent_id`'s `items`.
///
/// `new_order` must be exactly a permutation of the current children (same
/// ids, same multiplicity); anything else is a `LengthMismatch`, so a partial
/// list can never silently drop children.
pub fn reorder_children(
    state: &NormalizedState,
    parent_id: &EntityId,
    new_order: &[EntityId],
) -> VaultResult<NormalizedState> {
    live_type(state, parent_id)?;
    let current = state.children(parent_id.as_str());
    if !is_permutation(current, new_order) {
        return Err(VaultError::LengthMismatch {
            parent: parent_id.clone(),
            expected: current.len(),
            actual: new_order.len(),
        });
    }
    let mut next = state.clone();
    next.replace_items(parent_id, new_order.to_vec());
    Ok(next)
}

fn is_permutation(current: &[EntityId], proposed: &[EntityId]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a: Vec<&EntityId> = current.iter().collect();
    let mut b: Vec<&EntityId> = proposed.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Move an entity under a new parent at `index` (append when `None`).
///
/// The entity leaves its owner or, for reference-edge children, its primary
/// (first) referrer. Detach and insert happen on one private copy, so either
/// both succeed or the caller keeps the original snapshot.
pub fn move_entity(
    state: &NormalizedState,
    entity_id: &EntityId,
    new_parent_id: &EntityId,
    index: Option<usize>,
) -> VaultResult<NormalizedState> {
    let child_type = live_type(state, entity_id)?;
    let parent_type = live_type(state, new_parent_id)?;
    let kind = relation(parent_type, child_type)?;

    let mut next = state.clone();
    if let Some(from) = state.primary_parent(entity_id.as_str()) {
        next.unlink(from, entity_id);
    }
    if next.would_create_cycle(new_parent_id.as_str(), entity_id.as_str()) {
        return Err(VaultError::CycleDetected {
            parent: new_parent_id.clone(),
            child: entity_id.clone(),
        });
    }
    if next.children(new_parent_id.as_str()).contains(entity_id) {
        return Err(VaultError::DuplicateId(entity_id.clone()));
    }
    next.link(new_parent_id, entity_id, kind, index);
    debug!(id = %entity_id, to = %new_parent_id, ?index, "moved entity");
    Ok(next)
}

// ---------------------------------------------------------------
// Property updates
// ---------------------------------------------------------------

/// Apply every patch to one snapshot, all or nothing.
///
/// If any id is not live the result is `PartialFailure` listing every such
/// id, and no patch is applied.
pub fn batch_update(
    state: &NormalizedState,
    updates: &[EntityUpdate],
) -> VaultResult<NormalizedState> {
    let mut seen = HashSet::new();
    let invalid_ids: Vec<EntityId> = updates
        .iter()
        .filter(|u| !state.contains(u.id.as_str()))
        .filter(|u| seen.insert(u.id.clone()))
        .map(|u| u.id.clone())
        .collect();
    if !invalid_ids.is_empty() {
        return Err(VaultError::PartialFailure { invalid_ids });
    }

    let mut next = state.clone();
    for update in updates {
        patch_in_place(&mut next, &update.id, &update.patch);
    }
    debug!(count = updates.len(), "applied batch update");
    Ok(next)
}

/// Apply one patch.
pub fn update_entity(
    state: &NormalizedState,
    id: &EntityId,
    patch: &EntityPatch,
) -> VaultResult<NormalizedState> {
    live_type(state, id)?;
    let mut next = state.clone();
    patch_in_place(&mut next, id, patch);
    Ok(next)
}

fn patch_in_place(state: &mut NormalizedState, id: &EntityId, patch: &EntityPatch) {
    if let Some(current) = state.get_entity(id.as_str()) {
        let mut body = Entity::clone(current);
        patch.apply(&mut body);
        state.put_entity(Arc::new(body));
    }
}

/// Set pixel width and height. Both must be finite, whole and strictly
/// positive; invalid values are rejected, never clamped.
pub fn update_dimensions(
    state: &NormalizedState,
    id: &EntityId,
    width: f64,
    height: f64,
) -> VaultResult<NormalizedState> {
    live_type(state, id)?;
    let width = whole_positive(id, "width", width)?;
    let height = whole_positive(id, "height", height)?;
    let mut next = state.clone();
    if let Some(current) = state.get_entity(id.as_str()) {
        let mut body = Entity::clone(current);
        body.width = Some(width);
        body.height = Some(height);
        next.put_entity(Arc::new(body));
    }
    Ok(next)
}

/// Set the duration in seconds. Must be finite and strictly positive.
pub fn update_duration(
    state: &NormalizedState,
    id: &EntityId,
    duration: f64,
) -> VaultResult<NormalizedState> {
    live_type(state, id)?;
    let duration = positive(id, "duration", duration)?;
    let mut next = state.clone();
    if let Some(current) = state.get_entity(id.as_str()) {
        let mut body = Entity::clone(current);
        body.duration = Some(duration);
        next.put_entity(Arc::new(body));
    }
    Ok(next)
}

fn positive(id: &EntityId, field: &'static str, value: f64) -> VaultResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(VaultError::InvalidDimension {
            id: id.clone(),
            field,
            value,
        })
    }
}

fn whole_positive(id: &EntityId, field: &'static str, value: f64) -> VaultResult<u64> {
    let value = positive(id, field, value)?;
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(VaultError::InvalidDimension {
            id: id.clone(),
            field,
            value,
        });
    }
    Ok(value as u64)
}

/// Make a live entity the document root.
pub fn set_root(state: &NormalizedState, id: &EntityId) -> VaultResult<NormalizedState> {
    live_type(state, id)?;
    let mut next = state.clone();
    next.set_root(Some(id.clone()));
    Ok(next)
}
