//! # Entity Records
//!
//! The unit of cached state. An [`EntityRecord`] is what the identity cache stores for
//! every `(type, id)` pair, whether it is a placeholder waiting for a fetch or a fully
//! resolved entity.
//!
//! Relationships never embed other records. A linkage is either a raw
//! [`Related::Reference`] straight from the wire or a [`Related::Resolved`] handle that
//! is known to be present in the cache; facades follow the handle on demand.

use crate::schema::FieldKind;
use crate::schema::SchemaError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an entity within its type.
///
/// The wire may carry ids as strings or numbers; both are normalized to their string
/// form so that `3` and `"3"` address the same cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id from a JSON string or number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        EntityId::from_value(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("id must be a string or number, got {raw}")))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for EntityId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

macro_rules! id_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for EntityId {
            fn from(id: $ty) -> Self {
                Self(id.to_string())
            }
        })*
    };
}

id_from_int!(i32, i64, u32, u64, usize);

/// The identity-map key: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(resource_type: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// The `{type, id}` resource identifier object used on the wire.
    pub fn linkage(&self) -> Value {
        json!({ "type": self.resource_type, "id": self.id })
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.id)
    }
}

/// One linkage inside a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Related {
    /// A `{type, id}` reference as it arrived on the wire.
    Reference(EntityKey),
    /// A reference whose target has been found in the identity cache.
    Resolved(EntityKey),
}

impl Related {
    pub fn key(&self) -> &EntityKey {
        match self {
            Related::Reference(key) | Related::Resolved(key) => key,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Related::Resolved(_))
    }
}

/// The `data` member of a relationship, in the shape the payload provided it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelationshipData {
    #[default]
    Null,
    One(Related),
    Many(Vec<Related>),
}

impl RelationshipData {
    /// Parses a wire `data` member without consulting any schema.
    pub fn parse(field: &str, data: Option<&Value>) -> Result<Self, SchemaError> {
        match data {
            None | Some(Value::Null) => Ok(RelationshipData::Null),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| parse_linkage(field, item).map(Related::Reference))
                .collect::<Result<Vec<_>, _>>()
                .map(RelationshipData::Many),
            Some(item) => parse_linkage(field, item).map(|key| RelationshipData::One(Related::Reference(key))),
        }
    }

    /// Wire shape of the payload: `null`, `object` or `array`.
    pub fn shape(&self) -> &'static str {
        match self {
            RelationshipData::Null => "null",
            RelationshipData::One(_) => "object",
            RelationshipData::Many(_) => "array",
        }
    }

    /// The `{type, id}` linkage (or array of them) for this relationship.
    pub fn linkage(&self) -> Value {
        match self {
            RelationshipData::Null => Value::Null,
            RelationshipData::One(related) => related.key().linkage(),
            RelationshipData::Many(items) => Value::Array(items.iter().map(|r| r.key().linkage()).collect()),
        }
    }

    /// Every key this relationship points at.
    pub fn keys(&self) -> Vec<&EntityKey> {
        match self {
            RelationshipData::Null => Vec::new(),
            RelationshipData::One(related) => vec![related.key()],
            RelationshipData::Many(items) => items.iter().map(Related::key).collect(),
        }
    }
}

/// Reads a `{type, id}` resource identifier object.
pub(crate) fn parse_linkage(field: &str, value: &Value) -> Result<EntityKey, SchemaError> {
    let malformed = |reason: &str| SchemaError::MalformedLinkage {
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let object = value.as_object().ok_or_else(|| malformed("expected an object"))?;
    let resource_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing `type`"))?;
    let id = object
        .get("id")
        .and_then(EntityId::from_value)
        .ok_or_else(|| malformed("missing `id`"))?;
    Ok(EntityKey::new(resource_type, id))
}

/// A non-fatal schema/payload mismatch noticed while normalizing a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    /// The payload carries a relationship the schema does not declare.
    UndeclaredRelationship { field: String },
    /// The payload shape disagrees with the declared relationship kind.
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: &'static str,
    },
    /// A linkage could not be read and the relationship was dropped.
    MalformedLinkage { field: String, reason: String },
    /// Diagnostic produced by the post-fetch integrity pass.
    Integrity(String),
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::UndeclaredRelationship { field } => {
                write!(f, "undefined relationship in model, got relationship key [ {field} ], skipping")
            }
            SchemaWarning::KindMismatch { field, expected, found } => {
                write!(f, "relationship `{field}` defined as {expected} but got {found}")
            }
            SchemaWarning::MalformedLinkage { field, reason } => {
                write!(f, "relationship `{field}` dropped: {reason}")
            }
            SchemaWarning::Integrity(message) => f.write_str(message),
        }
    }
}

/// An entity as held by the identity cache.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub resource_type: String,
    /// `None` for a record built for creation that has not been saved yet.
    pub id: Option<EntityId>,
    /// camelCase field name to value.
    pub attributes: Map<String, Value>,
    /// camelCase field name to linkage data.
    pub relationships: BTreeMap<String, RelationshipData>,
    /// `true` once a fetch or save has populated the record.
    pub resolved: bool,
    /// Fully qualified resource URL.
    pub url: String,
    /// Warnings collected while the record was normalized and resolved.
    pub warnings: Vec<SchemaWarning>,
}

impl EntityRecord {
    pub fn new(resource_type: impl Into<String>, id: Option<EntityId>, url: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            resolved: false,
            url: url.into(),
            warnings: Vec::new(),
        }
    }

    pub fn key(&self) -> Option<EntityKey> {
        self.id
            .as_ref()
            .map(|id| EntityKey::new(self.resource_type.clone(), id.clone()))
    }

    /// JSON view of the record, in internal (camelCase) form.
    pub fn to_json(&self) -> Value {
        let relationships: Map<String, Value> = self
            .relationships
            .iter()
            .map(|(field, data)| (field.clone(), json!({ "data": data.linkage() })))
            .collect();
        json!({
            "type": self.resource_type,
            "id": self.id,
            "attributes": self.attributes,
            "relationships": relationships,
            "url": self.url,
            "_resolved": self.resolved,
        })
    }
}
