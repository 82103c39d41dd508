//! IIIF Presentation 3 JSON-LD in and out of the normalized form.
//!
//! [`normalize`] flattens a nested document into a [`NormalizedState`],
//! moving `items`/`structures` nesting into the graph indices and every key
//! the store does not model into the per-entity extension bag. [`denormalize`]
//! rebuilds the nested tree from `rootId`.
//!
//! Extension values are carried as parsed `serde_json::Value`s with key order
//! preserved, so a document that went in comes back out with the same keys in
//! the same order. On output, `@`-prefixed keys (`@context`) are written
//! before `id`, other extension keys after the child lists.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::debug;

use archivault_types::{
    relation_between, Entity, EntityId, RelationKind, ResourceType, KNOWN_PROPERTIES,
};

use crate::error::{VaultError, VaultResult};
use crate::state::{Extensions, NormalizedState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Items,
    Structures,
}

/// Flatten a nested IIIF document into a fresh snapshot.
///
/// A resource listed more than once (a manifest in two collections, a canvas
/// referenced from a range) becomes one entity; later occurrences only fill
/// in fields the first one lacked.
pub fn normalize(document: &Value) -> VaultResult<NormalizedState> {
    let mut state = NormalizedState::new();
    let root = ingest(&mut state, document, None)?;
    state.set_root(Some(root));
    debug!(entities = state.entity_count(), "normalized document");
    Ok(state)
}

fn ingest(
    state: &mut NormalizedState,
    value: &Value,
    parent: Option<(&EntityId, ResourceType, Slot)>,
) -> VaultResult<EntityId> {
    let object = value
        .as_object()
        .ok_or_else(|| VaultError::InvalidDocument("resource is not a JSON object".into()))?;
    let id = match object.get("id").and_then(Value::as_str) {
        Some(raw) => EntityId::parse(raw)?,
        None => return Err(VaultError::InvalidDocument("resource without an id".into())),
    };
    let kind: ResourceType = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| VaultError::InvalidDocument(format!("{id} has no type")))?
        .parse()?;

    let mut known = Map::new();
    known.insert("id".into(), Value::String(id.to_string()));
    known.insert("type".into(), Value::String(kind.as_str().into()));
    let mut extensions = Extensions::new();
    for (key, v) in object {
        match key.as_str() {
            "id" | "type" | "items" | "structures" => {}
            k if KNOWN_PROPERTIES.contains(&k) => {
                known.insert(key.clone(), v.clone());
            }
            _ => {
                extensions.insert(key.clone(), v.clone());
            }
        }
    }

    match state.get_type(&id) {
        Some(existing) if existing != kind => return Err(VaultError::DuplicateId(id)),
        Some(_) => merge_missing(state, &id, known, extensions)?,
        None => {
            let entity: Entity = serde_json::from_value(Value::Object(known))
                .map_err(|e| VaultError::InvalidDocument(format!("{id}: {e}")))?;
            state.insert_entity(entity);
            state.set_extensions(&id, Some(extensions));
        }
    }

    if let Some((parent_id, parent_type, slot)) = parent {
        attach(state, parent_id, parent_type, &id, kind, slot)?;
    }

    for (slot, key) in [(Slot::Items, "items"), (Slot::Structures, "structures")] {
        let Some(list) = object.get(key) else {
            continue;
        };
        let list = list
            .as_array()
            .ok_or_else(|| VaultError::InvalidDocument(format!("{id}: `{key}` is not an array")))?;
        for child in list {
            ingest(state, child, Some((&id, kind, slot)))?;
        }
    }
    Ok(id)
}

fn attach(
    state: &mut NormalizedState,
    parent_id: &EntityId,
    parent_type: ResourceType,
    id: &EntityId,
    kind: ResourceType,
    slot: Slot,
) -> VaultResult<()> {
    let invalid = VaultError::InvalidChildType {
        parent: parent_type,
        child: kind,
    };
    let relation = match slot {
        Slot::Items => relation_between(parent_type, kind).ok_or(invalid)?,
        Slot::Structures
            if parent_type == ResourceType::Manifest && kind == ResourceType::Range =>
        {
            RelationKind::Ownership
        }
        Slot::Structures => return Err(invalid),
    };
    if relation == RelationKind::Ownership {
        if let Some(owner) = state.parent(id) {
            if owner != parent_id {
                return Err(VaultError::DuplicateId(id.clone()));
            }
        }
    }
    if state.would_create_cycle(parent_id, id) {
        return Err(VaultError::CycleDetected {
            parent: parent_id.clone(),
            child: id.clone(),
        });
    }
    match slot {
        Slot::Items => state.link(parent_id, id, relation, None),
        Slot::Structures => state.link_structure(parent_id, id, None),
    }
    Ok(())
}

fn merge_missing(
    state: &mut NormalizedState,
    id: &EntityId,
    known: Map<String, Value>,
    extensions: Extensions,
) -> VaultResult<()> {
    let Some(current) = state.get_entity(id) else {
        return Ok(());
    };
    let mut body = match serde_json::to_value(current.as_ref()) {
        Ok(Value::Object(map)) => map,
        _ => return Err(VaultError::InvalidDocument(format!("{id}: body is not an object"))),
    };
    let before = body.len();
    for (key, v) in known {
        body.entry(key).or_insert(v);
    }
    if body.len() != before {
        let merged: Entity = serde_json::from_value(Value::Object(body))
            .map_err(|e| VaultError::InvalidDocument(format!("{id}: {e}")))?;
        state.insert_entity(merged);
    }

    if !extensions.is_empty() {
        let mut bag = state.extensions(id).cloned().unwrap_or_default();
        for (key, v) in extensions {
            bag.entry(key).or_insert(v);
        }
        state.set_extensions(id, Some(bag));
    }
    Ok(())
}

/// Rebuild the nested document rooted at `rootId`.
///
/// Returns `None` when the snapshot has no live root.
pub fn denormalize(state: &NormalizedState) -> Option<Value> {
    let root = state.root_id()?;
    denormalize_entity(state, root)
}

/// Rebuild the nested subtree of one live entity.
///
/// Children reached through a reference edge are embedded in full unless they
/// have an owner elsewhere, in which case only `{id, type}` is written (a
/// range pointing at a canvas its manifest already carries).
pub fn denormalize_entity(state: &NormalizedState, id: &str) -> Option<Value> {
    let mut path = HashSet::new();
    build(state, id, &mut path)
}

fn build<'a>(
    state: &'a NormalizedState,
    id: &'a str,
    path: &mut HashSet<&'a str>,
) -> Option<Value> {
    let entity = state.get_entity(id)?;
    if !path.insert(id) {
        return Some(reference(entity));
    }

    let mut out = Map::new();
    let extensions = state.extensions(id);
    if let Some(ext) = extensions {
        for (key, v) in ext.iter().filter(|(k, _)| k.starts_with('@')) {
            out.insert(key.clone(), v.clone());
        }
    }
    if let Ok(Value::Object(body)) = serde_json::to_value(entity.as_ref()) {
        out.extend(body);
    }

    let by_reference = entity.kind.items_relation() == Some(RelationKind::Reference);
    let mut items = Vec::new();
    for child in state.children(id) {
        let value = match state.get_entity(child) {
            Some(c) if by_reference && state.parent(child).is_some() => Some(reference(c)),
            Some(_) => build(state, child, path),
            None => None,
        };
        items.extend(value);
    }
    if !items.is_empty() || entity.kind.is_listing_node() {
        out.insert("items".into(), Value::Array(items));
    }

    let structures: Vec<Value> = state
        .structures_of(id)
        .iter()
        .filter_map(|range| build(state, range, path))
        .collect();
    if !structures.is_empty() {
        out.insert("structures".into(), Value::Array(structures));
    }

    if let Some(ext) = extensions {
        for (key, v) in ext.iter().filter(|(k, _)| !k.starts_with('@')) {
            out.insert(key.clone(), v.clone());
        }
    }

    path.remove(id);
    Some(Value::Object(out))
}

fn reference(entity: &Entity) -> Value {
    json!({ "id": entity.id, "type": entity.kind })
}
