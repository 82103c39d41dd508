//! Normalized entity bodies and partial updates.
//!
//! An [`Entity`] carries the descriptive properties of one IIIF resource.
//! Child lists (`items`, `structures`) are deliberately absent: in the
//! normalized store ordering lives in the graph indices, never in bodies.
//! JSON keys not listed in [`KNOWN_PROPERTIES`] are kept outside the body in
//! the store's extension bag.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::id::EntityId;
use crate::resource::ResourceType;

/// JSON-LD keys that map onto [`Entity`] fields (besides `id` and `type`).
pub const KNOWN_PROPERTIES: &[&str] = &[
    "label",
    "summary",
    "metadata",
    "requiredStatement",
    "rights",
    "navDate",
    "thumbnail",
    "behavior",
    "viewingDirection",
    "provider",
    "homepage",
    "seeAlso",
    "rendering",
    "service",
    "width",
    "height",
    "duration",
    "format",
    "motivation",
    "body",
    "target",
];

/// The normalized body of a single IIIF resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_statement: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewing_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub see_also: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
}

impl Entity {
    /// Create a bare entity with only identity fields set.
    pub fn new(id: impl Into<EntityId>, kind: ResourceType) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            summary: None,
            metadata: None,
            required_statement: None,
            rights: None,
            nav_date: None,
            thumbnail: None,
            behavior: None,
            viewing_direction: None,
            provider: None,
            homepage: None,
            see_also: None,
            rendering: None,
            service: None,
            width: None,
            height: None,
            duration: None,
            format: None,
            motivation: None,
            body: None,
            target: None,
        }
    }

    /// Set an English label (`{"en": [text]}`).
    pub fn with_label(mut self, text: &str) -> Self {
        self.label = Some(json!({ "en": [text] }));
        self
    }

    /// Set pixel dimensions.
    pub fn with_dimensions(mut self, width: u64, height: u64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// First human-readable label string, if any.
    pub fn label_text(&self) -> Option<String> {
        self.label.as_ref().and_then(label_text)
    }
}

/// Extract the first string from a IIIF language map (or a bare string).
///
/// `{"en": ["Title"], "fr": ["Titre"]}` yields `"Title"`; the `none` and `en`
/// keys are preferred over other languages.
pub fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(values) => values.iter().find_map(label_text),
        Value::Object(map) => ["none", "en"]
            .iter()
            .filter_map(|k| map.get(*k))
            .chain(map.values())
            .find_map(label_text),
        _ => None,
    }
}

/// A partial update to an entity's descriptive properties.
///
/// `None` leaves the field unchanged. Identity (`id`, `type`) and graph
/// structure cannot be patched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityPatch {
    pub label: Option<Value>,
    pub summary: Option<Value>,
    pub metadata: Option<Value>,
    pub required_statement: Option<Value>,
    pub rights: Option<String>,
    pub nav_date: Option<String>,
    pub thumbnail: Option<Value>,
    pub behavior: Option<Vec<String>>,
    pub viewing_direction: Option<String>,
    pub provider: Option<Value>,
    pub homepage: Option<Value>,
}

impl EntityPatch {
    /// A patch that only replaces the label with an English string.
    pub fn label(text: &str) -> Self {
        Self {
            label: Some(json!({ "en": [text] })),
            ..Default::default()
        }
    }

    /// Returns `true` if applying this patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every set field onto `entity`.
    pub fn apply(&self, entity: &mut Entity) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        set(&mut entity.label, &self.label);
        set(&mut entity.summary, &self.summary);
        set(&mut entity.metadata, &self.metadata);
        set(&mut entity.required_statement, &self.required_statement);
        set(&mut entity.rights, &self.rights);
        set(&mut entity.nav_date, &self.nav_date);
        set(&mut entity.thumbnail, &self.thumbnail);
        set(&mut entity.behavior, &self.behavior);
        set(&mut entity.viewing_direction, &self.viewing_direction);
        set(&mut entity.provider, &self.provider);
        set(&mut entity.homepage, &self.homepage);
    }
}

/// One element of a batch edit: which entity, and what to change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub id: EntityId,
    pub patch: EntityPatch,
}

impl EntityUpdate {
    pub fn new(id: impl Into<EntityId>, patch: EntityPatch) -> Self {
        Self {
            id: id.into(),
            patch,
        }
    }
}
