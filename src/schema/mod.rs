//! # Schema Descriptors
//!
//! A resource schema maps field names to [`Field`] descriptors. Each descriptor knows
//! its kind, the name it travels under on the wire, its default value, and how to move
//! a value between an [`EntityRecord`] and a [`WireResource`].
//!
//! Descriptors hold no store state. Relationship deserialization takes a [`Resolve`]
//! implementation at call time, so the same schema serves unit tests (a closure
//! resolver), the store's normalization pass ([`ReferenceResolver`]) and anything else
//! that wants to turn `{type, id}` pairs into values.
//!
//! ```rust
//! use jsonapi_store::schema::{Field, Schema};
//!
//! let schema = Schema::new()
//!     .field("id", Field::key())
//!     .field("firstName", Field::attribute())
//!     .field("address", Field::has_one().related("address"))
//!     .field("friends", Field::has_many().related("person"));
//!
//! assert_eq!(schema.get("firstName").unwrap().wire_name("firstName"), "first-name");
//! ```

pub mod casing;

use crate::record::{parse_linkage, EntityId, EntityKey, EntityRecord, Related, RelationshipData};
use crate::wire::WireResource;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Key,
    Attribute,
    HasOne,
    HasMany,
}

impl FieldKind {
    pub fn is_relationship(self) -> bool {
        matches!(self, FieldKind::HasOne | FieldKind::HasMany)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Key => "key",
            FieldKind::Attribute => "attribute",
            FieldKind::HasOne => "has-one",
            FieldKind::HasMany => "has-many",
        })
    }
}

/// Errors raised by descriptor serialize/deserialize.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("data requires a `{0}` field")]
    MissingContainer(&'static str),
    #[error("no resolver bound while deserializing relationship `{0}`")]
    NoResolver(String),
    #[error("relationship `{field}` is declared {expected} but holds {found}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: &'static str,
    },
    #[error("relationship `{field}` has a malformed linkage: {reason}")]
    MalformedLinkage { field: String, reason: String },
}

/// Turns a `{type, id}` reference into a caller-chosen value.
pub trait Resolve {
    type Output;

    fn resolve(&self, resource_type: &str, id: &EntityId) -> Self::Output;
}

impl<F, T> Resolve for F
where
    F: Fn(&str, &EntityId) -> T,
{
    type Output = T;

    fn resolve(&self, resource_type: &str, id: &EntityId) -> T {
        self(resource_type, id)
    }
}

/// Resolver used while normalizing responses: every reference stays a raw
/// [`Related::Reference`] until the relationship resolver finds it in the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

impl Resolve for ReferenceResolver {
    type Output = Related;

    fn resolve(&self, resource_type: &str, id: &EntityId) -> Related {
        Related::Reference(EntityKey::new(resource_type, id.clone()))
    }
}

/// Result of [`Field::deserialize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialized<T> {
    /// The envelope does not mention the field at all.
    Missing,
    /// Key or attribute value.
    Value(Value),
    /// Has-one: `None` for an empty (`null`) relationship.
    One(Option<T>),
    /// Has-many.
    Many(Vec<T>),
}

/// A field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// The resource identifier; travels as the envelope `id`.
    Key,
    Attribute {
        wire_name: Option<String>,
        default: Option<Value>,
    },
    HasOne {
        wire_name: Option<String>,
        related: Option<String>,
    },
    HasMany {
        wire_name: Option<String>,
        related: Option<String>,
    },
}

impl Field {
    pub fn key() -> Self {
        Field::Key
    }

    pub fn attribute() -> Self {
        Field::Attribute {
            wire_name: None,
            default: None,
        }
    }

    pub fn has_one() -> Self {
        Field::HasOne {
            wire_name: None,
            related: None,
        }
    }

    pub fn has_many() -> Self {
        Field::HasMany {
            wire_name: None,
            related: None,
        }
    }

    /// Overrides the wire name. Ignored for [`Field::Key`].
    pub fn named(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Field::Key => {}
            Field::Attribute { wire_name, .. }
            | Field::HasOne { wire_name, .. }
            | Field::HasMany { wire_name, .. } => *wire_name = Some(name.into()),
        }
        self
    }

    /// Sets an attribute's default. Relationship defaults are fixed (`null` / `[]`).
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        if let Field::Attribute { default, .. } = &mut self {
            *default = Some(value.into());
        }
        self
    }

    /// Declares the resource type a relationship points at, which lets scalar ids be
    /// assigned to it through [`crate::Model::set`].
    pub fn related(mut self, resource_type: impl Into<String>) -> Self {
        match &mut self {
            Field::HasOne { related, .. } | Field::HasMany { related, .. } => *related = Some(resource_type.into()),
            Field::Key | Field::Attribute { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Key => FieldKind::Key,
            Field::Attribute { .. } => FieldKind::Attribute,
            Field::HasOne { .. } => FieldKind::HasOne,
            Field::HasMany { .. } => FieldKind::HasMany,
        }
    }

    pub fn related_type(&self) -> Option<&str> {
        match self {
            Field::HasOne { related, .. } | Field::HasMany { related, .. } => related.as_deref(),
            Field::Key | Field::Attribute { .. } => None,
        }
    }

    /// The name the field travels under: the override, or the dash-cased field key.
    pub fn wire_name(&self, key: &str) -> String {
        match self {
            Field::Key => "id".to_string(),
            Field::Attribute { wire_name, .. }
            | Field::HasOne { wire_name, .. }
            | Field::HasMany { wire_name, .. } => wire_name.clone().unwrap_or_else(|| casing::camel_to_dash(key)),
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            Field::Key | Field::HasOne { .. } => Value::Null,
            Field::Attribute { default, .. } => default.clone().unwrap_or(Value::Null),
            Field::HasMany { .. } => json!([]),
        }
    }

    /// Writes `source`'s value for `key` into `target`.
    pub fn serialize(&self, source: &EntityRecord, target: &mut WireResource, key: &str) -> Result<(), SchemaError> {
        match self {
            Field::Key => {
                target.id = source.id.clone();
            }
            Field::Attribute { default, .. } => {
                let attributes = target
                    .attributes
                    .as_mut()
                    .ok_or(SchemaError::MissingContainer("attributes"))?;
                let value = source.attributes.get(key).or(default.as_ref());
                if let Some(value) = value {
                    attributes.insert(self.wire_name(key), value.clone());
                }
            }
            Field::HasOne { .. } | Field::HasMany { .. } => {
                let relationships = target
                    .relationships
                    .as_mut()
                    .ok_or(SchemaError::MissingContainer("relationships"))?;
                let data = match (self.kind(), source.relationships.get(key)) {
                    (_, Some(data @ RelationshipData::One(_))) if self.kind() == FieldKind::HasOne => data.linkage(),
                    (_, Some(data @ RelationshipData::Many(_))) if self.kind() == FieldKind::HasMany => data.linkage(),
                    (_, None | Some(RelationshipData::Null)) => self.default_value(),
                    (expected, Some(data)) => {
                        return Err(SchemaError::KindMismatch {
                            field: key.to_string(),
                            expected,
                            found: data.shape(),
                        })
                    }
                };
                relationships.insert(self.wire_name(key), json!({ "data": data }));
            }
        }
        Ok(())
    }

    /// Reads the field `key` out of a wire envelope.
    ///
    /// Relationship references go through `resolver`; a non-empty relationship with no
    /// resolver bound is an error.
    pub fn deserialize<R: Resolve>(
        &self,
        envelope: &WireResource,
        key: &str,
        resolver: Option<&R>,
    ) -> Result<Deserialized<R::Output>, SchemaError> {
        match self {
            Field::Key => Ok(envelope
                .id
                .as_ref()
                .map(|id| Deserialized::Value(json!(id)))
                .unwrap_or(Deserialized::Missing)),
            Field::Attribute { .. } => Ok(envelope
                .attributes
                .as_ref()
                .and_then(|attributes| attributes.get(&self.wire_name(key)))
                .map(|value| Deserialized::Value(value.clone()))
                .unwrap_or(Deserialized::Missing)),
            Field::HasOne { .. } => {
                let Some(relationship) = self.wire_relationship(envelope, key) else {
                    return Ok(Deserialized::Missing);
                };
                match relationship.get("data") {
                    None | Some(Value::Null) => Ok(Deserialized::One(None)),
                    Some(Value::Array(_)) => Err(SchemaError::KindMismatch {
                        field: key.to_string(),
                        expected: FieldKind::HasOne,
                        found: "array",
                    }),
                    Some(linkage) => {
                        let target = parse_linkage(key, linkage)?;
                        let resolver = resolver.ok_or_else(|| SchemaError::NoResolver(key.to_string()))?;
                        Ok(Deserialized::One(Some(resolver.resolve(&target.resource_type, &target.id))))
                    }
                }
            }
            Field::HasMany { .. } => {
                let Some(relationship) = self.wire_relationship(envelope, key) else {
                    return Ok(Deserialized::Missing);
                };
                match relationship.get("data") {
                    None | Some(Value::Null) => Ok(Deserialized::Many(Vec::new())),
                    Some(Value::Array(items)) if items.is_empty() => Ok(Deserialized::Many(Vec::new())),
                    Some(Value::Array(items)) => {
                        let resolver = resolver.ok_or_else(|| SchemaError::NoResolver(key.to_string()))?;
                        items
                            .iter()
                            .map(|item| {
                                parse_linkage(key, item)
                                    .map(|target| resolver.resolve(&target.resource_type, &target.id))
                            })
                            .collect::<Result<Vec<_>, _>>()
                            .map(Deserialized::Many)
                    }
                    Some(_) => Err(SchemaError::KindMismatch {
                        field: key.to_string(),
                        expected: FieldKind::HasMany,
                        found: "object",
                    }),
                }
            }
        }
    }

    fn wire_relationship<'a>(&self, envelope: &'a WireResource, key: &str) -> Option<&'a Value> {
        envelope
            .relationships
            .as_ref()
            .and_then(|relationships| relationships.get(&self.wire_name(key)))
    }
}

/// Field name to descriptor. Immutable once handed to the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a field.
    pub fn field(mut self, key: impl Into<String>, field: Field) -> Self {
        self.fields.insert(key.into(), field);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// Finds the field travelling under `wire_name`.
    pub fn by_wire_name(&self, wire_name: &str) -> Option<(&str, &Field)> {
        self.fields
            .iter()
            .find(|(key, field)| field.wire_name(key) == wire_name)
            .map(|(key, field)| (key.as_str(), field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_resolver(resource_type: &str, id: &EntityId) -> EntityKey {
        EntityKey::new(resource_type, id.clone())
    }

    fn people(count: u32) -> Vec<EntityKey> {
        (0..count).map(|id| EntityKey::new("person", id)).collect()
    }

    #[test]
    fn test_attribute_round_trip() {
        let name = Field::attribute().named("name");
        assert_eq!(name.kind(), FieldKind::Attribute);

        let mut source = EntityRecord::new("person", None, "");
        source.attributes.insert("name".into(), json!("Test"));
        let mut data = WireResource::envelope("person", None);

        name.serialize(&source, &mut data, "name").unwrap();
        assert_eq!(data.attributes.as_ref().unwrap()["name"], "Test");

        let deserialized = name.deserialize(&data, "name", None::<&ReferenceResolver>).unwrap();
        assert_eq!(deserialized, Deserialized::Value(json!("Test")));
    }

    #[test]
    fn test_attribute_falls_back_to_default() {
        let role = Field::attribute().with_default("member");
        let source = EntityRecord::new("person", None, "");
        let mut data = WireResource::envelope("person", None);

        role.serialize(&source, &mut data, "role").unwrap();
        assert_eq!(data.attributes.unwrap()["role"], "member");
    }

    #[test]
    fn test_attribute_requires_container() {
        let source = EntityRecord::new("person", None, "");
        let mut data = WireResource {
            resource_type: "person".into(),
            ..WireResource::default()
        };
        let err = Field::attribute().serialize(&source, &mut data, "name").unwrap_err();
        assert_eq!(err, SchemaError::MissingContainer("attributes"));
        assert_eq!(err.to_string(), "data requires a `attributes` field");
    }

    #[test]
    fn test_has_one_round_trip() {
        let friend_field = Field::has_one().named("friend");
        let friend = people(1).remove(0);

        let mut source = EntityRecord::new("person", Some(9.into()), "");
        source
            .relationships
            .insert("friend".into(), RelationshipData::One(Related::Reference(friend.clone())));
        let mut data = WireResource::envelope("person", None);

        friend_field.serialize(&source, &mut data, "friend").unwrap();
        let relationships = data.relationships.as_ref().unwrap();
        assert_eq!(relationships["friend"]["data"]["type"], "person");
        assert_eq!(relationships["friend"]["data"]["id"], "0");

        let resolver = key_resolver;
        let deserialized = friend_field.deserialize(&data, "friend", Some(&resolver)).unwrap();
        assert_eq!(deserialized, Deserialized::One(Some(friend)));
    }

    #[test]
    fn test_has_one_without_resolver_fails() {
        let friend_field = Field::has_one().named("friend");
        let data = WireResource {
            resource_type: "person".into(),
            relationships: Some(
                json!({ "friend": { "data": { "type": "person", "id": 0 } } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            ..WireResource::default()
        };

        let err = friend_field.deserialize(&data, "friend", None::<&ReferenceResolver>).unwrap_err();
        assert_eq!(err, SchemaError::NoResolver("friend".into()));
    }

    #[test]
    fn test_has_one_null_needs_no_resolver() {
        let data = WireResource {
            resource_type: "person".into(),
            relationships: Some(json!({ "address": { "data": null } }).as_object().cloned().unwrap()),
            ..WireResource::default()
        };
        let result = Field::has_one().deserialize(&data, "address", None::<&ReferenceResolver>);
        assert_eq!(result.unwrap(), Deserialized::One(None));
    }

    #[test]
    fn test_has_many_round_trip() {
        let friends_field = Field::has_many().named("friend");
        let friends = people(4);

        let mut source = EntityRecord::new("person", None, "");
        source.relationships.insert(
            "friend".into(),
            RelationshipData::Many(friends.iter().cloned().map(Related::Reference).collect()),
        );
        let mut data = WireResource::envelope("person", None);

        friends_field.serialize(&source, &mut data, "friend").unwrap();
        let expected: Vec<Value> = friends.iter().map(EntityKey::linkage).collect();
        assert_eq!(data.relationships.as_ref().unwrap()["friend"]["data"], Value::Array(expected));

        let deserialized = friends_field
            .deserialize(&data, "friend", Some(&ReferenceResolver))
            .unwrap();
        assert_eq!(
            deserialized,
            Deserialized::Many(friends.into_iter().map(Related::Reference).collect())
        );
    }

    #[test]
    fn test_relationship_defaults_when_unset() {
        let source = EntityRecord::new("person", None, "");
        let mut data = WireResource::envelope("person", None);

        Field::has_one().serialize(&source, &mut data, "address").unwrap();
        Field::has_many().serialize(&source, &mut data, "friends").unwrap();

        let relationships = data.relationships.unwrap();
        assert_eq!(relationships["address"], json!({ "data": null }));
        assert_eq!(relationships["friends"], json!({ "data": [] }));
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let data = WireResource {
            resource_type: "person".into(),
            relationships: Some(
                json!({ "address": { "data": [{ "type": "address", "id": 1 }] } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            ..WireResource::default()
        };
        let err = Field::has_one()
            .deserialize(&data, "address", Some(&ReferenceResolver))
            .unwrap_err();
        assert!(matches!(err, SchemaError::KindMismatch { expected: FieldKind::HasOne, found: "array", .. }));
    }

    #[test]
    fn test_wire_names() {
        let schema = Schema::new()
            .field("lastName", Field::attribute())
            .field("nick", Field::attribute().named("handle"));

        assert_eq!(schema.get("lastName").unwrap().wire_name("lastName"), "last-name");
        assert_eq!(schema.by_wire_name("handle").map(|(key, _)| key), Some("nick"));
        assert!(schema.by_wire_name("nick").is_none());
    }
}
