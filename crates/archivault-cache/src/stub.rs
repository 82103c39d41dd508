//! Lightweight summaries of collections and manifests.
//!
//! A stub is what a tree view shows before the full body is loaded: label,
//! counts and the ids of listable children.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use archivault_types::{label_text, EntityId, ResourceType};

/// Summary of one Collection or Manifest.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStub {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Length of the resource's `items`.
    pub child_count: usize,
    /// Canvases directly in `items` (manifests) or in member manifests
    /// (collections).
    pub canvas_count: usize,
    /// Ids of child collections and manifests, in order.
    pub children: Vec<EntityId>,
    pub loaded: bool,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Parse one resource into a stub, together with the full body of every
/// listable descendant (itself included) in pre-order.
pub(crate) fn build_stubs(value: &Value, out: &mut Vec<(ResourceStub, Value)>) -> Option<usize> {
    let object = value.as_object()?;
    let id = EntityId::new(object.get("id")?.as_str()?);
    let kind: ResourceType = object.get("type")?.as_str()?.parse().ok()?;
    if !kind.is_listing_node() {
        return None;
    }

    let items: &[Value] = object
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let slot = out.len();
    out.push((
        ResourceStub {
            id,
            kind,
            label: object
                .get("label")
                .and_then(label_text)
                .unwrap_or_else(|| "Untitled".to_string()),
            summary: object.get("summary").and_then(label_text),
            thumbnail: object.get("thumbnail").and_then(thumbnail_url),
            child_count: items.len(),
            canvas_count: 0,
            children: Vec::new(),
            loaded: true,
            last_accessed: None,
        },
        value.clone(),
    ));

    let mut canvas_count = 0;
    let mut children = Vec::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) == Some("Canvas") {
            canvas_count += 1;
            continue;
        }
        let before = out.len();
        if let Some(nested) = build_stubs(item, out) {
            canvas_count += nested;
            children.push(out[before].0.id.clone());
        }
    }
    let stub = &mut out[slot].0;
    stub.canvas_count = canvas_count;
    stub.children = children;
    Some(canvas_count)
}

fn thumbnail_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(list) => list.iter().find_map(thumbnail_url),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
