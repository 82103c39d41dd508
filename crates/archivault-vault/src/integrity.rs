use std::collections::{HashMap, HashSet};

use serde::Serialize;

use archivault_types::{relation_between, EntityId, ResourceType};

use crate::state::NormalizedState;

/// Result of cross-checking every index of a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub entity_count: usize,
    pub trashed_count: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    /// Returns `true` if no issue was found.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// One inconsistency found in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub id: EntityId,
    pub kind: IssueKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    TypeIndexMismatch,
    DanglingEdge,
    InvalidRelation,
    OwnerMismatch,
    MultipleOwners,
    ReferrerMismatch,
    LiveAndTrashed,
    CorruptedTrashRecord,
    MissingRoot,
}

/// Verify every index against the others, plus live/trashed exclusion.
pub fn check_integrity(state: &NormalizedState) -> IntegrityReport {
    let mut issues = Vec::new();
    let mut push = |id: &EntityId, kind: IssueKind, description: String| {
        issues.push(IntegrityIssue {
            id: id.clone(),
            kind,
            description,
        });
    };

    // Bodies and the type index must describe the same set.
    for (kind, bucket) in &state.entities {
        for (id, entity) in bucket.iter() {
            if state.type_index.get(id) != Some(kind) || entity.kind != *kind {
                push(id, IssueKind::TypeIndexMismatch, format!("stored under {kind}"));
            }
        }
    }
    for (id, kind) in state.type_index.iter() {
        let present = state.entities.get(kind).is_some_and(|b| b.contains_key(id));
        if !present {
            push(id, IssueKind::TypeIndexMismatch, format!("indexed as {kind} without a body"));
        }
    }

    // Ownership: items and structures against the reverse index.
    let mut owners: HashMap<&EntityId, Vec<&EntityId>> = HashMap::new();
    for (lists, structural) in [(&state.references, false), (&state.structures, true)] {
        for (parent, children) in lists.iter() {
            for child in children {
                owners.entry(child).or_default().push(parent);
                check_edge(state, parent, child, structural, &mut push);
            }
        }
    }
    for (child, parents) in &owners {
        if parents.len() > 1 {
            push(child, IssueKind::MultipleOwners, format!("owned by {} parents", parents.len()));
        }
        if state.reverse_refs.get(*child) != Some(parents[0]) {
            push(child, IssueKind::OwnerMismatch, format!("owner should be {}", parents[0]));
        }
    }
    for (child, owner) in state.reverse_refs.iter() {
        if !owners.contains_key(child) {
            let description = format!("records owner {owner} that does not list it");
            push(child, IssueKind::OwnerMismatch, description);
        }
    }

    // References: forward and backward lists must mirror each other.
    let mut forward: HashSet<(&EntityId, &EntityId)> = HashSet::new();
    for (parent, children) in state.collection_members.iter() {
        for child in children {
            forward.insert((parent, child));
            check_edge(state, parent, child, false, &mut push);
        }
    }
    let mut backward: HashSet<(&EntityId, &EntityId)> = HashSet::new();
    for (child, parents) in state.member_of_collections.iter() {
        for parent in parents {
            backward.insert((parent, child));
        }
    }
    for (parent, child) in forward.symmetric_difference(&backward) {
        push(child, IssueKind::ReferrerMismatch, format!("reference from {parent} is one-sided"));
    }

    for (id, record) in state.trashed_entities.iter() {
        if state.contains(id) {
            push(id, IssueKind::LiveAndTrashed, "both live and in the trash".into());
        }
        if record.entity.is_none() {
            push(id, IssueKind::CorruptedTrashRecord, "trash record has no entity".into());
        }
    }

    if let Some(root) = &state.root_id {
        if !state.contains(root) {
            push(root, IssueKind::MissingRoot, "root is not a live entity".into());
        }
    }

    issues.sort_by(|a, b| a.id.cmp(&b.id));
    IntegrityReport {
        entity_count: state.entity_count(),
        trashed_count: state.trashed_entities.len(),
        issues,
    }
}

fn check_edge(
    state: &NormalizedState,
    parent: &EntityId,
    child: &EntityId,
    structural: bool,
    push: &mut impl FnMut(&EntityId, IssueKind, String),
) {
    let (Some(p), Some(c)) = (state.get_type(parent), state.get_type(child)) else {
        let description = format!("edge {parent} -> {child} has a missing endpoint");
        push(child, IssueKind::DanglingEdge, description);
        return;
    };
    let allowed = if structural {
        p == ResourceType::Manifest && c == ResourceType::Range
    } else {
        relation_between(p, c).is_some_and(|r| Some(r) == p.items_relation())
    };
    if !allowed {
        push(child, IssueKind::InvalidRelation, format!("{c} listed under {p}"));
    }
}
