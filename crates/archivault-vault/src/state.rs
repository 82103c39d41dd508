//! The normalized snapshot and its index-maintaining primitives.
//!
//! [`NormalizedState`] is one immutable version of the whole resource graph.
//! Every index is held behind an `Arc`, and every entity body is an
//! `Arc<Entity>`, so cloning a snapshot copies a handful of pointers. The
//! `&mut self` primitives in this module copy-on-write only the index or
//! bucket they touch; all other parts stay shared with earlier snapshots.
//!
//! The primitives keep the forward and reverse indices consistent with each
//! other but do NOT enforce relationship rules, cycle freedom or trash
//! exclusion. Those checks live in the pure operations of [`crate::ops`] and
//! in the trash service, which always work on a private clone.
//!
//! # Invariants
//!
//! - `type_index[id] == t` exactly when `entities[t]` holds `id`.
//! - `reverse_refs[c] == p` exactly when `c` is in `references[p]` or
//!   `structures[p]`.
//! - `p` is in `member_of_collections[c]` exactly when `c` is in
//!   `collection_members[p]`.
//! - No edge list is stored empty.
//! - No id is both live and in `trashed_entities`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use archivault_types::{Entity, EntityId, RelationKind, ResourceType};

/// Per-type storage of entity bodies.
pub type EntityBucket = HashMap<EntityId, Arc<Entity>>;

/// Ordered adjacency lists keyed by the parent id.
pub type EdgeLists = HashMap<EntityId, Vec<EntityId>>;

/// Unrecognized JSON-LD fields of one entity, in document order.
pub type Extensions = Map<String, Value>;

/// A soft-deleted entity together with the context needed to restore it.
///
/// `entity` and `trashed_at` are optional so that damaged records can be
/// loaded, reported and skipped rather than failing the whole document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedEntity {
    #[serde(default)]
    pub entity: Option<Entity>,
    #[serde(default)]
    pub trashed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_parent_id: Option<EntityId>,
    #[serde(default)]
    pub original_index: Option<usize>,
    #[serde(default)]
    pub member_of_collections: Vec<EntityId>,
    #[serde(default)]
    pub child_ids: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structure_ids: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl TrashedEntity {
    /// Type of the trashed entity, if the payload survived.
    pub fn kind(&self) -> Option<ResourceType> {
        self.entity.as_ref().map(|e| e.kind)
    }
}

/// Edges captured when an entity is cut out of the live graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detachment {
    /// The owner, or the first referrer for reference-edge children.
    pub parent: Option<EntityId>,
    /// Position the entity held in `parent`'s list.
    pub index: Option<usize>,
    /// Every referrer that listed the entity.
    pub referrers: Vec<EntityId>,
    /// The entity's own `items`, in order.
    pub items: Vec<EntityId>,
    /// The entity's own `structures`, in order.
    pub structures: Vec<EntityId>,
}

/// One immutable version of the normalized resource graph.
///
/// Equality compares shared `Arc`s by pointer before falling back to their
/// contents, so two snapshots that differ in one bucket cost one bucket's
/// comparison.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedState {
    pub(crate) entities: BTreeMap<ResourceType, Arc<EntityBucket>>,
    pub(crate) type_index: Arc<HashMap<EntityId, ResourceType>>,
    /// Owned `items` per owner.
    pub(crate) references: Arc<EdgeLists>,
    /// Owner of every owned child (items and structures).
    pub(crate) reverse_refs: Arc<HashMap<EntityId, EntityId>>,
    /// Owned ranges per manifest.
    pub(crate) structures: Arc<EdgeLists>,
    /// Referenced `items` per referrer.
    pub(crate) collection_members: Arc<EdgeLists>,
    pub(crate) member_of_collections: Arc<EdgeLists>,
    pub(crate) root_id: Option<EntityId>,
    pub(crate) extensions: Arc<HashMap<EntityId, Extensions>>,
    pub(crate) trashed_entities: Arc<BTreeMap<EntityId, TrashedEntity>>,
}

impl NormalizedState {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Entity records
    // ---------------------------------------------------------------

    /// Insert or replace an entity body. Edges are untouched.
    pub fn insert_entity(&mut self, entity: Entity) {
        self.put_entity(Arc::new(entity));
    }

    /// Insert or replace a shared entity body. Edges are untouched.
    pub fn put_entity(&mut self, entity: Arc<Entity>) {
        let id = entity.id.clone();
        let kind = entity.kind;
        if let Some(old) = self.type_index.get(&id).copied() {
            if old != kind {
                self.remove_from_bucket(old, &id);
            }
        }
        Arc::make_mut(self.entities.entry(kind).or_default()).insert(id.clone(), entity);
        Arc::make_mut(&mut self.type_index).insert(id, kind);
    }

    /// Remove an entity's body, type entry and extensions. Edges are untouched.
    ///
    /// Clears `root_id` if it pointed at the removed entity.
    pub fn remove_record(&mut self, id: &EntityId) -> Option<(Arc<Entity>, Option<Extensions>)> {
        let kind = Arc::make_mut(&mut self.type_index).remove(id)?;
        let entity = self.remove_from_bucket(kind, id)?;
        let extensions = if self.extensions.contains_key(id) {
            Arc::make_mut(&mut self.extensions).remove(id)
        } else {
            None
        };
        if self.root_id.as_ref() == Some(id) {
            self.root_id = None;
        }
        Some((entity, extensions))
    }

    fn remove_from_bucket(&mut self, kind: ResourceType, id: &EntityId) -> Option<Arc<Entity>> {
        let bucket = self.entities.get_mut(&kind)?;
        if !bucket.contains_key(id) {
            return None;
        }
        let removed = Arc::make_mut(bucket).remove(id);
        if bucket.is_empty() {
            self.entities.remove(&kind);
        }
        removed
    }

    /// Replace (or clear, with `None` or an empty map) an entity's extension bag.
    pub fn set_extensions(&mut self, id: &EntityId, extensions: Option<Extensions>) {
        match extensions {
            Some(ext) if !ext.is_empty() => {
                Arc::make_mut(&mut self.extensions).insert(id.clone(), ext);
            }
            _ => {
                if self.extensions.contains_key(id) {
                    Arc::make_mut(&mut self.extensions).remove(id);
                }
            }
        }
    }

    /// Set the top-level resource of the document.
    pub fn set_root(&mut self, root: Option<EntityId>) {
        self.root_id = root;
    }

    // ---------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------

    /// Add `child` to `parent`'s `items` list with the given edge kind.
    ///
    /// Appends when `index` is `None` or past the end. Linking an edge that
    /// already exists is a no-op. An ownership link replaces any previous
    /// owner in the reverse index; callers unlink first.
    pub fn link(
        &mut self,
        parent: &EntityId,
        child: &EntityId,
        kind: RelationKind,
        index: Option<usize>,
    ) {
        match kind {
            RelationKind::Ownership => {
                let list = Arc::make_mut(&mut self.references)
                    .entry(parent.clone())
                    .or_default();
                if !list.contains(child) {
                    insert_at(list, child.clone(), index);
                }
                Arc::make_mut(&mut self.reverse_refs).insert(child.clone(), parent.clone());
            }
            RelationKind::Reference => {
                let list = Arc::make_mut(&mut self.collection_members)
                    .entry(parent.clone())
                    .or_default();
                if !list.contains(child) {
                    insert_at(list, child.clone(), index);
                }
                let back = Arc::make_mut(&mut self.member_of_collections)
                    .entry(child.clone())
                    .or_default();
                if !back.contains(parent) {
                    back.push(parent.clone());
                }
            }
        }
    }

    /// Add an owned range to a manifest's `structures` list.
    pub fn link_structure(&mut self, manifest: &EntityId, range: &EntityId, index: Option<usize>) {
        let list = Arc::make_mut(&mut self.structures)
            .entry(manifest.clone())
            .or_default();
        if !list.contains(range) {
            insert_at(list, range.clone(), index);
        }
        Arc::make_mut(&mut self.reverse_refs).insert(range.clone(), manifest.clone());
    }

    /// Remove the edge `parent → child`, whichever kind it is.
    ///
    /// Returns the position the child held, or `None` if there was no edge.
    pub fn unlink(&mut self, parent: &EntityId, child: &EntityId) -> Option<usize> {
        if let Some(pos) = position(&self.references, parent, child) {
            remove_at(Arc::make_mut(&mut self.references), parent, pos);
            self.clear_owner(parent, child);
            return Some(pos);
        }
        if let Some(pos) = position(&self.structures, parent, child) {
            remove_at(Arc::make_mut(&mut self.structures), parent, pos);
            self.clear_owner(parent, child);
            return Some(pos);
        }
        if let Some(pos) = position(&self.collection_members, parent, child) {
            remove_at(Arc::make_mut(&mut self.collection_members), parent, pos);
            if let Some(back) = position(&self.member_of_collections, child, parent) {
                remove_at(Arc::make_mut(&mut self.member_of_collections), child, back);
            }
            return Some(pos);
        }
        None
    }

    fn clear_owner(&mut self, parent: &EntityId, child: &EntityId) {
        if self.reverse_refs.get(child) == Some(parent) {
            Arc::make_mut(&mut self.reverse_refs).remove(child);
        }
    }

    /// Replace `parent`'s `items` list wholesale.
    ///
    /// The caller guarantees `order` is a permutation of the current list, so
    /// the reverse indices stay valid.
    pub fn replace_items(&mut self, parent: &EntityId, order: Vec<EntityId>) {
        let lists = if self.references.contains_key(parent) {
            Arc::make_mut(&mut self.references)
        } else if self.collection_members.contains_key(parent) {
            Arc::make_mut(&mut self.collection_members)
        } else {
            return;
        };
        lists.insert(parent.clone(), order);
    }

    /// Cut `id` out of the graph: from its owner, from every referrer, and
    /// from its own children. The entity record itself stays.
    pub fn detach(&mut self, id: &EntityId) -> Detachment {
        let parent = self.primary_parent(id).cloned();
        let index = parent.as_ref().and_then(|p| {
            position(&self.references, p, id)
                .or_else(|| position(&self.structures, p, id))
                .or_else(|| position(&self.collection_members, p, id))
        });
        let referrers = self.referrers(id).to_vec();

        if let Some(owner) = self.reverse_refs.get(id).cloned() {
            self.unlink(&owner, id);
        }
        for referrer in &referrers {
            self.unlink(referrer, id);
        }

        let items = self.children(id).to_vec();
        for child in &items {
            self.unlink(id, child);
        }
        let structures = self.structures_of(id).to_vec();
        for range in &structures {
            self.unlink(id, range);
        }

        Detachment {
            parent,
            index,
            referrers,
            items,
            structures,
        }
    }

    /// Hard-delete `id` and every entity it owns, transitively.
    ///
    /// Referenced members are only unlinked. Returns the deleted ids, the
    /// requested entity first.
    pub fn delete_cascade(&mut self, id: &EntityId) -> Vec<EntityId> {
        let mut doomed = vec![id.clone()];
        doomed.extend(self.owned_descendants(id));
        let mut deleted = Vec::with_capacity(doomed.len());
        for target in doomed {
            if !self.type_index.contains_key(&target) {
                continue;
            }
            self.detach(&target);
            if self.remove_record(&target).is_some() {
                deleted.push(target);
            }
        }
        deleted
    }

    // ---------------------------------------------------------------
    // Trash records
    // ---------------------------------------------------------------

    /// Store a trash record under `id`.
    pub fn insert_trashed(&mut self, id: EntityId, record: TrashedEntity) {
        Arc::make_mut(&mut self.trashed_entities).insert(id, record);
    }

    /// Remove and return the trash record for `id`.
    pub fn take_trashed(&mut self, id: &EntityId) -> Option<TrashedEntity> {
        if !self.trashed_entities.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.trashed_entities).remove(id)
    }
}

impl PartialEq for NormalizedState {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id
            && self.entities.len() == other.entities.len()
            && self
                .entities
                .iter()
                .zip(&other.entities)
                .all(|((ka, a), (kb, b))| ka == kb && same_bucket(a, b))
            && same(&self.type_index, &other.type_index)
            && same(&self.references, &other.references)
            && same(&self.reverse_refs, &other.reverse_refs)
            && same(&self.structures, &other.structures)
            && same(&self.collection_members, &other.collection_members)
            && same(&self.member_of_collections, &other.member_of_collections)
            && same(&self.extensions, &other.extensions)
            && same(&self.trashed_entities, &other.trashed_entities)
    }
}

fn same<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

fn same_bucket(a: &Arc<EntityBucket>, b: &Arc<EntityBucket>) -> bool {
    Arc::ptr_eq(a, b)
        || (a.len() == b.len()
            && a.iter().all(|(id, body)| b.get(id).is_some_and(|other| same(body, other))))
}

fn insert_at(list: &mut Vec<EntityId>, id: EntityId, index: Option<usize>) {
    match index {
        Some(i) if i < list.len() => list.insert(i, id),
        _ => list.push(id),
    }
}

fn position(lists: &EdgeLists, parent: &EntityId, child: &EntityId) -> Option<usize> {
    lists.get(parent)?.iter().position(|c| c == child)
}

fn remove_at(lists: &mut EdgeLists, key: &EntityId, pos: usize) {
    if let Some(list) = lists.get_mut(key) {
        list.remove(pos);
        if list.is_empty() {
            lists.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn manifest_with_canvases() -> NormalizedState {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("m", ResourceType::Manifest));
        for c in ["c1", "c2", "c3"] {
            s.insert_entity(Entity::new(c, ResourceType::Canvas));
            s.link(&id("m"), &id(c), RelationKind::Ownership, None);
        }
        s.set_root(Some(id("m")));
        s
    }

    #[test]
    fn insert_and_remove_record() {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("a", ResourceType::Canvas));
        assert_eq!(s.type_index.get("a"), Some(&ResourceType::Canvas));
        let (body, ext) = s.remove_record(&id("a")).unwrap();
        assert_eq!(body.id, id("a"));
        assert!(ext.is_none());
        assert!(s.entities.is_empty());
        assert!(s.remove_record(&id("a")).is_none());
    }

    #[test]
    fn put_entity_moves_bucket_on_type_change() {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("a", ResourceType::Canvas));
        s.insert_entity(Entity::new("a", ResourceType::Range));
        assert!(!s.entities.contains_key(&ResourceType::Canvas));
        assert_eq!(s.type_index.get("a"), Some(&ResourceType::Range));
    }

    #[test]
    fn link_respects_index_and_is_idempotent() {
        let mut s = manifest_with_canvases();
        s.insert_entity(Entity::new("c0", ResourceType::Canvas));
        s.link(&id("m"), &id("c0"), RelationKind::Ownership, Some(0));
        s.link(&id("m"), &id("c0"), RelationKind::Ownership, Some(2));
        assert_eq!(s.references["m"], vec![id("c0"), id("c1"), id("c2"), id("c3")]);
        assert_eq!(s.reverse_refs.get("c0"), Some(&id("m")));
    }

    #[test]
    fn link_index_past_end_appends() {
        let mut s = manifest_with_canvases();
        s.insert_entity(Entity::new("c9", ResourceType::Canvas));
        s.link(&id("m"), &id("c9"), RelationKind::Ownership, Some(99));
        assert_eq!(s.references["m"].last(), Some(&id("c9")));
    }

    #[test]
    fn unlink_clears_reverse_and_empty_lists() {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("col", ResourceType::Collection));
        s.insert_entity(Entity::new("m", ResourceType::Manifest));
        s.link(&id("col"), &id("m"), RelationKind::Reference, None);
        assert_eq!(s.member_of_collections["m"], vec![id("col")]);
        assert_eq!(s.unlink(&id("col"), &id("m")), Some(0));
        assert!(s.collection_members.is_empty());
        assert!(s.member_of_collections.is_empty());
        assert_eq!(s.unlink(&id("col"), &id("m")), None);
    }

    #[test]
    fn detach_captures_context() {
        let mut s = manifest_with_canvases();
        s.insert_entity(Entity::new("p1", ResourceType::AnnotationPage));
        s.link(&id("c2"), &id("p1"), RelationKind::Ownership, None);

        let d = s.detach(&id("c2"));
        assert_eq!(d.parent, Some(id("m")));
        assert_eq!(d.index, Some(1));
        assert_eq!(d.items, vec![id("p1")]);
        assert_eq!(s.references["m"], vec![id("c1"), id("c3")]);
        assert!(s.reverse_refs.get("p1").is_none());
        assert!(s.type_index.contains_key("c2"));
    }

    #[test]
    fn delete_cascade_removes_owned_subtree() {
        let mut s = manifest_with_canvases();
        s.insert_entity(Entity::new("p1", ResourceType::AnnotationPage));
        s.link(&id("c1"), &id("p1"), RelationKind::Ownership, None);
        s.insert_entity(Entity::new("a1", ResourceType::Annotation));
        s.link(&id("p1"), &id("a1"), RelationKind::Ownership, None);

        let deleted = s.delete_cascade(&id("m"));
        assert_eq!(deleted.len(), 6);
        assert_eq!(deleted[0], id("m"));
        assert!(s.type_index.is_empty());
        assert!(s.references.is_empty());
        assert!(s.reverse_refs.is_empty());
        assert!(s.root_id.is_none());
    }

    #[test]
    fn delete_cascade_keeps_referenced_members() {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("col", ResourceType::Collection));
        s.insert_entity(Entity::new("m", ResourceType::Manifest));
        s.link(&id("col"), &id("m"), RelationKind::Reference, None);
        assert_eq!(s.delete_cascade(&id("col")), vec![id("col")]);
        assert!(s.type_index.contains_key("m"));
        assert!(s.member_of_collections.is_empty());
    }

    #[test]
    fn clone_shares_untouched_buckets() {
        let s = manifest_with_canvases();
        let mut next = s.clone();
        next.insert_entity(Entity::new("m2", ResourceType::Manifest));
        assert!(Arc::ptr_eq(
            &s.entities[&ResourceType::Canvas],
            &next.entities[&ResourceType::Canvas]
        ));
        assert!(!Arc::ptr_eq(
            &s.entities[&ResourceType::Manifest],
            &next.entities[&ResourceType::Manifest]
        ));
        assert!(Arc::ptr_eq(&s.references, &next.references));
    }

    #[test]
    fn equality_short_circuits_on_shared_parts() {
        let mut s = manifest_with_canvases();
        let mut odd = Entity::new("c1", ResourceType::Canvas);
        odd.duration = Some(f64::NAN);
        s.insert_entity(odd);

        // NaN never equals itself, so only pointer identity makes these equal.
        let copy = s.clone();
        assert!(s == copy);

        let mut rebuilt = copy.clone();
        rebuilt.insert_entity(Entity::clone(&s.get_entity("c1").unwrap()));
        assert!(s != rebuilt);

        let mut relabeled = s.clone();
        relabeled.insert_entity(Entity::new("c2", ResourceType::Canvas).with_label("Two"));
        assert!(s != relabeled);
        relabeled.insert_entity(Entity::new("c2", ResourceType::Canvas));
        assert!(s == relabeled);
    }

    #[test]
    fn trashed_record_serde_tolerates_missing_fields() {
        let record: TrashedEntity = serde_json::from_str(r#"{"originalParentId": null}"#).unwrap();
        assert!(record.entity.is_none());
        assert!(record.trashed_at.is_none());
        assert!(record.kind().is_none());
    }
}
