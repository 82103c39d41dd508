use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The IIIF resource classes the store keeps in its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Collection,
    Manifest,
    Canvas,
    Range,
    AnnotationPage,
    Annotation,
}

impl ResourceType {
    /// Every resource type, in hierarchy order.
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Collection,
        ResourceType::Manifest,
        ResourceType::Canvas,
        ResourceType::Range,
        ResourceType::AnnotationPage,
        ResourceType::Annotation,
    ];

    /// The JSON-LD `type` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Collection => "Collection",
            ResourceType::Manifest => "Manifest",
            ResourceType::Canvas => "Canvas",
            ResourceType::Range => "Range",
            ResourceType::AnnotationPage => "AnnotationPage",
            ResourceType::Annotation => "Annotation",
        }
    }

    /// Returns `true` for the types that get a stub in tree listings.
    pub fn is_listing_node(&self) -> bool {
        matches!(self, ResourceType::Collection | ResourceType::Manifest)
    }

    /// Edge kind used by this type's `items` list, `None` for leaves.
    pub fn items_relation(&self) -> Option<RelationKind> {
        match self {
            ResourceType::Collection | ResourceType::Range => Some(RelationKind::Reference),
            ResourceType::Manifest | ResourceType::Canvas | ResourceType::AnnotationPage => {
                Some(RelationKind::Ownership)
            }
            ResourceType::Annotation => None,
        }
    }

    /// Child types reachable through this type's `items` list.
    pub fn item_types(&self) -> &'static [ResourceType] {
        match self {
            ResourceType::Collection => &[ResourceType::Collection, ResourceType::Manifest],
            ResourceType::Manifest => &[ResourceType::Canvas],
            ResourceType::Canvas => &[ResourceType::AnnotationPage],
            ResourceType::AnnotationPage => &[ResourceType::Annotation],
            ResourceType::Range => &[ResourceType::Range, ResourceType::Canvas],
            ResourceType::Annotation => &[],
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // IIIF Presentation 2 documents prefix types with `sc:`/`oa:`.
        let bare = s.rsplit(':').next().unwrap_or(s);
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == bare)
            .ok_or_else(|| TypeError::UnknownResourceType(s.to_string()))
    }
}

/// The two kinds of parent→child edge in the resource graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Exclusive, hierarchical: the child has exactly one owner and dies with it.
    Ownership,
    /// Shared pointer: the child may be listed by many referrers.
    Reference,
}

/// Relationship rule for placing `child` in the `items` list of `parent`.
///
/// Returns `None` when the pair is not an allowed combination. Ranges held in
/// a manifest's `structures` list are not covered here; they are owned by the
/// manifest through a separate slot.
pub fn relation_between(parent: ResourceType, child: ResourceType) -> Option<RelationKind> {
    use ResourceType::*;
    match (parent, child) {
        (Collection, Collection) | (Collection, Manifest) => Some(RelationKind::Reference),
        (Range, Range) | (Range, Canvas) => Some(RelationKind::Reference),
        (Manifest, Canvas) | (Canvas, AnnotationPage) | (AnnotationPage, Annotation) => {
            Some(RelationKind::Ownership)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for t in ResourceType::ALL {
            assert_eq!(t.as_str().parse::<ResourceType>().unwrap(), t);
        }
    }

    #[test]
    fn parse_accepts_prefixed_v2_types() {
        assert_eq!("sc:Manifest".parse::<ResourceType>().unwrap(), ResourceType::Manifest);
        assert!("Choice".parse::<ResourceType>().is_err());
    }

    #[test]
    fn ownership_pairs() {
        use ResourceType::*;
        assert_eq!(relation_between(Manifest, Canvas), Some(RelationKind::Ownership));
        assert_eq!(relation_between(Canvas, AnnotationPage), Some(RelationKind::Ownership));
        assert_eq!(relation_between(AnnotationPage, Annotation), Some(RelationKind::Ownership));
    }

    #[test]
    fn reference_pairs() {
        use ResourceType::*;
        assert_eq!(relation_between(Collection, Manifest), Some(RelationKind::Reference));
        assert_eq!(relation_between(Collection, Collection), Some(RelationKind::Reference));
        assert_eq!(relation_between(Range, Canvas), Some(RelationKind::Reference));
        assert_eq!(relation_between(Range, Range), Some(RelationKind::Reference));
    }

    #[test]
    fn rejected_pairs() {
        use ResourceType::*;
        assert_eq!(relation_between(Collection, Canvas), None);
        assert_eq!(relation_between(Manifest, Manifest), None);
        assert_eq!(relation_between(Canvas, Annotation), None);
        assert_eq!(relation_between(Annotation, Annotation), None);
        assert_eq!(relation_between(Manifest, Range), None);
    }

    #[test]
    fn item_types_agree_with_relation_table() {
        for parent in ResourceType::ALL {
            for child in ResourceType::ALL {
                assert_eq!(
                    parent.item_types().contains(&child),
                    relation_between(parent, child).is_some(),
                    "{parent} -> {child}"
                );
            }
        }
    }

    #[test]
    fn items_relation_matches_pairs() {
        for parent in ResourceType::ALL {
            for child in parent.item_types() {
                assert_eq!(relation_between(parent, *child), parent.items_relation());
            }
        }
        assert_eq!(ResourceType::Annotation.items_relation(), None);
    }

    #[test]
    fn serde_uses_iiif_names() {
        let json = serde_json::to_string(&ResourceType::AnnotationPage).unwrap();
        assert_eq!(json, "\"AnnotationPage\"");
    }
}
