//! Read-only queries over a [`NormalizedState`].

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use archivault_types::{Entity, EntityId, RelationKind, ResourceType};

use crate::state::{Extensions, NormalizedState, TrashedEntity};

impl NormalizedState {
    /// Id of the top-level resource, if set.
    pub fn root_id(&self) -> Option<&EntityId> {
        self.root_id.as_ref()
    }

    /// Look up a live entity body.
    pub fn get_entity(&self, id: &str) -> Option<&Arc<Entity>> {
        let kind = self.type_index.get(id)?;
        self.entities.get(kind)?.get(id)
    }

    /// Type of a live entity, in O(1).
    pub fn get_type(&self, id: &str) -> Option<ResourceType> {
        self.type_index.get(id).copied()
    }

    /// Returns `true` if `id` is live.
    pub fn contains(&self, id: &str) -> bool {
        self.type_index.contains_key(id)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.type_index.len()
    }

    /// Returns `true` if there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.type_index.is_empty()
    }

    /// Live entities of one type, sorted by id.
    pub fn entities_of_type(&self, kind: ResourceType) -> Vec<&Arc<Entity>> {
        let mut out: Vec<_> = self
            .entities
            .get(&kind)
            .map(|bucket| bucket.values().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Live entity count per type. Types with no entities are omitted.
    pub fn counts_by_type(&self) -> BTreeMap<ResourceType, usize> {
        self.entities
            .iter()
            .map(|(kind, bucket)| (*kind, bucket.len()))
            .collect()
    }

    /// The ordered `items` of `id` (owned or referenced, depending on type).
    pub fn children(&self, id: &str) -> &[EntityId] {
        let lists = match self.get_type(id).and_then(|t| t.items_relation()) {
            Some(RelationKind::Ownership) => &self.references,
            Some(RelationKind::Reference) => &self.collection_members,
            None => return &[],
        };
        lists.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The ordered `structures` (owned ranges) of a manifest.
    pub fn structures_of(&self, id: &str) -> &[EntityId] {
        self.structures.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The exclusive owner of `id`, if it has one.
    pub fn parent(&self, id: &str) -> Option<&EntityId> {
        self.reverse_refs.get(id)
    }

    /// Every entity listing `id` through a reference edge, in link order.
    pub fn referrers(&self, id: &str) -> &[EntityId] {
        self.member_of_collections
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The owner, else the first referrer.
    pub fn primary_parent(&self, id: &str) -> Option<&EntityId> {
        self.parent(id).or_else(|| self.referrers(id).first())
    }

    /// Owner followed by referrers.
    pub fn parents(&self, id: &str) -> Vec<EntityId> {
        self.parent(id)
            .into_iter()
            .chain(self.referrers(id))
            .cloned()
            .collect()
    }

    /// Collections that reference `id`.
    pub fn collections_containing(&self, id: &str) -> Vec<EntityId> {
        self.referrers(id)
            .iter()
            .filter(|r| self.get_type(r.as_str()) == Some(ResourceType::Collection))
            .cloned()
            .collect()
    }

    /// Every ancestor of `id` through both edge kinds, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<EntityId> {
        let mut visited: HashSet<EntityId> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<EntityId> = self.parents(id).into();
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            queue.extend(self.parents(current.as_str()));
            out.push(current);
        }
        out
    }

    /// Every descendant of `id` through `items` and `structures`, breadth first.
    pub fn descendants(&self, id: &str) -> Vec<EntityId> {
        self.walk_down(id, false)
    }

    /// Descendants reachable through ownership edges only.
    pub fn owned_descendants(&self, id: &str) -> Vec<EntityId> {
        self.walk_down(id, true)
    }

    fn walk_down(&self, id: &str, owned_only: bool) -> Vec<EntityId> {
        let mut visited: HashSet<&EntityId> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<&EntityId> = self.child_edges(id, owned_only).collect();
        while let Some(current) = queue.pop_front() {
            if current.as_str() == id || !visited.insert(current) {
                continue;
            }
            out.push(current.clone());
            queue.extend(self.child_edges(current.as_str(), owned_only));
        }
        out
    }

    fn child_edges(&self, node: &str, owned_only: bool) -> impl Iterator<Item = &EntityId> + '_ {
        let items = match self.get_type(node).and_then(|t| t.items_relation()) {
            Some(RelationKind::Reference) if owned_only => &[][..],
            _ => self.children(node),
        };
        self.structures_of(node).iter().chain(items)
    }

    /// Returns `true` if placing `child` under `parent` would make `child`
    /// its own ancestor.
    pub fn would_create_cycle(&self, parent: &str, child: &str) -> bool {
        parent == child || self.ancestors(parent).iter().any(|a| a.as_str() == child)
    }

    /// Passthrough fields of a live entity.
    pub fn extensions(&self, id: &str) -> Option<&Extensions> {
        self.extensions.get(id)
    }

    // ---------------------------------------------------------------
    // Trash
    // ---------------------------------------------------------------

    /// All trash records, keyed by id.
    pub fn trashed(&self) -> &BTreeMap<EntityId, TrashedEntity> {
        &self.trashed_entities
    }

    /// The trash record for `id`.
    pub fn trashed_record(&self, id: &str) -> Option<&TrashedEntity> {
        self.trashed_entities.get(id)
    }

    /// Returns `true` if `id` is in the trash.
    pub fn is_trashed(&self, id: &str) -> bool {
        self.trashed_entities.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    /// col ─ref→ {m1, sub}; sub ─ref→ m1; m1 ─own→ {c1, c2}; c1 ─own→ p1
    fn sample() -> NormalizedState {
        let mut s = NormalizedState::new();
        s.insert_entity(Entity::new("col", ResourceType::Collection));
        s.insert_entity(Entity::new("sub", ResourceType::Collection));
        s.insert_entity(Entity::new("m1", ResourceType::Manifest));
        s.insert_entity(Entity::new("c1", ResourceType::Canvas));
        s.insert_entity(Entity::new("c2", ResourceType::Canvas));
        s.insert_entity(Entity::new("p1", ResourceType::AnnotationPage));
        s.link(&id("col"), &id("m1"), RelationKind::Reference, None);
        s.link(&id("col"), &id("sub"), RelationKind::Reference, None);
        s.link(&id("sub"), &id("m1"), RelationKind::Reference, None);
        s.link(&id("m1"), &id("c1"), RelationKind::Ownership, None);
        s.link(&id("m1"), &id("c2"), RelationKind::Ownership, None);
        s.link(&id("c1"), &id("p1"), RelationKind::Ownership, None);
        s.set_root(Some(id("col")));
        s
    }

    #[test]
    fn children_follow_type_relation() {
        let s = sample();
        assert_eq!(s.children("col"), &[id("m1"), id("sub")]);
        assert_eq!(s.children("m1"), &[id("c1"), id("c2")]);
        assert!(s.children("p1").is_empty());
        assert!(s.children("missing").is_empty());
    }

    #[test]
    fn parent_and_referrers() {
        let s = sample();
        assert_eq!(s.parent("c1"), Some(&id("m1")));
        assert_eq!(s.parent("m1"), None);
        assert_eq!(s.referrers("m1"), &[id("col"), id("sub")]);
        assert_eq!(s.primary_parent("m1"), Some(&id("col")));
        assert_eq!(s.collections_containing("m1"), vec![id("col"), id("sub")]);
    }

    #[test]
    fn ancestors_cover_both_edge_kinds() {
        let s = sample();
        let a = s.ancestors("p1");
        assert_eq!(a[0], id("c1"));
        assert_eq!(a[1], id("m1"));
        assert!(a.contains(&id("col")));
        assert!(a.contains(&id("sub")));
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn descendants_and_owned_descendants() {
        let s = sample();
        let d = s.descendants("col");
        assert_eq!(d.len(), 5);
        assert!(s.owned_descendants("col").is_empty());
        assert_eq!(s.owned_descendants("m1"), vec![id("c1"), id("c2"), id("p1")]);
    }

    #[test]
    fn cycle_detection() {
        let s = sample();
        assert!(s.would_create_cycle("m1", "m1"));
        assert!(s.would_create_cycle("sub", "col"));
        assert!(!s.would_create_cycle("col", "sub"));
    }

    #[test]
    fn counts_and_listing() {
        let s = sample();
        assert_eq!(s.entity_count(), 6);
        let counts = s.counts_by_type();
        assert_eq!(counts[&ResourceType::Canvas], 2);
        assert_eq!(counts.get(&ResourceType::Range), None);
        let canvases: Vec<_> = s
            .entities_of_type(ResourceType::Canvas)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(canvases, vec![id("c1"), id("c2")]);
    }

    #[test]
    fn get_entity_and_type() {
        let s = sample();
        assert_eq!(s.get_entity("c2").unwrap().kind, ResourceType::Canvas);
        assert_eq!(s.get_type("col"), Some(ResourceType::Collection));
        assert!(s.get_entity("nope").is_none());
        assert!(!s.is_trashed("c2"));
    }
}
