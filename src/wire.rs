//! Wire-level JSON:API shapes exchanged with the adapter.

use crate::record::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A top-level response document: `{data, included?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// `null`, a single resource object or an array of resource objects.
    #[serde(default)]
    pub data: Value,
    /// Side-loaded resources related to the primary data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Value>,
}

impl Document {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            included: Vec::new(),
        }
    }

    pub fn with_included(mut self, included: Vec<Value>) -> Self {
        self.included = included;
        self
    }
}

/// A single resource object in dash-cased wire form.
///
/// `attributes` and `relationships` are optional on the wire; serialization into a
/// resource requires the containers to exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Map<String, Value>>,
}

impl WireResource {
    /// An empty resource with both containers present, ready to be filled by descriptors.
    pub fn envelope(resource_type: impl Into<String>, id: Option<EntityId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes: Some(Map::new()),
            relationships: Some(Map::new()),
        }
    }
}

/// A request payload built by the serializer: target URL plus the JSON:API document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireEnvelope {
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: Option<EntityId>,
    /// `{"data": <resource object>}`.
    pub data: Value,
}
