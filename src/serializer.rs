//! # Request Serializer
//!
//! Moves entities between their internal form ([`EntityRecord`], camelCase keys) and
//! their wire form ([`WireResource`], dash-case keys).
//!
//! - [`to_wire_envelope`] runs every schema field's `serialize` and pairs the payload
//!   with the URL it targets. A relationship held in the wrong shape is sent as the
//!   declared kind's default (`null` or `[]`).
//! - [`from_wire_envelope`] normalizes a fetched resource object. Declared fields go
//!   through their descriptors; undeclared attributes are kept (camelCased), undeclared
//!   relationships are kept with a warning. Payloads whose relationship shape contradicts
//!   the schema are kept as provided and flagged, never rejected.

use crate::error::{Result, StoreError};
use crate::record::{EntityRecord, RelationshipData, SchemaWarning};
use crate::registry::ResourceDefinition;
use crate::schema::{casing, Deserialized, Field, ReferenceResolver, SchemaError};
use crate::wire::{WireEnvelope, WireResource};
use serde_json::{json, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// POST to the collection URL.
    Create,
    /// PATCH to the entity URL; requires an id.
    Update,
}

pub fn to_wire_envelope(
    definition: &ResourceDefinition,
    record: &EntityRecord,
    kind: RequestKind,
) -> Result<WireEnvelope> {
    let url = match (kind, &record.id) {
        (RequestKind::Create, _) => definition.collection_url(),
        (RequestKind::Update, Some(id)) => definition.url_for(id),
        (RequestKind::Update, None) => return Err(StoreError::Unsaved(definition.name.clone())),
    };

    let mut resource = WireResource::envelope(definition.name.clone(), record.id.clone());
    for (key, field) in definition.schema.iter() {
        match field.serialize(record, &mut resource, key) {
            // Fetched with the wrong shape: the declared kind's empty value goes out instead.
            Err(SchemaError::KindMismatch { field: name, expected, found }) => {
                warn!(resource_type = %definition.name, field = %name, %expected, found, "Sending default for mismatched relationship");
                if let Some(relationships) = resource.relationships.as_mut() {
                    relationships.insert(field.wire_name(key), json!({ "data": field.default_value() }));
                }
            }
            other => other?,
        }
    }

    let data = serde_json::to_value(&resource).map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
    Ok(WireEnvelope {
        url,
        resource_type: definition.name.clone(),
        id: record.id.clone(),
        data: json!({ "data": data }),
    })
}

/// Normalizes one wire resource into a resolved record. Relationship references stay
/// raw until the resolver looks them up.
pub fn from_wire_envelope(definition: &ResourceDefinition, resource: &WireResource) -> Result<EntityRecord> {
    let id = resource.id.clone().ok_or_else(|| {
        StoreError::MalformedResponse(format!("`{}` resource without an id", resource.resource_type))
    })?;
    let mut record = EntityRecord::new(resource.resource_type.clone(), Some(id.clone()), definition.url_for(&id));
    record.resolved = true;

    let mut seen_attributes = Vec::new();
    let mut seen_relationships = Vec::new();

    for (key, field) in definition.schema.iter() {
        match field {
            Field::Key => {}
            Field::Attribute { .. } => {
                seen_attributes.push(field.wire_name(key));
                if let Deserialized::Value(value) = field.deserialize(resource, key, None::<&ReferenceResolver>)? {
                    record.attributes.insert(key.to_string(), casing::from_wire(&value));
                }
            }
            Field::HasOne { .. } | Field::HasMany { .. } => {
                let wire_name = field.wire_name(key);
                let data = match field.deserialize(resource, key, Some(&ReferenceResolver)) {
                    Ok(Deserialized::Missing) | Ok(Deserialized::Value(_)) => None,
                    Ok(Deserialized::One(related)) => Some(related.map_or(RelationshipData::Null, RelationshipData::One)),
                    Ok(Deserialized::Many(items)) => Some(RelationshipData::Many(items)),
                    Err(SchemaError::KindMismatch { field: name, expected, found }) => {
                        warn!(resource_type = %record.resource_type, field = %name, %expected, found, "Relationship kind mismatch");
                        record.warnings.push(SchemaWarning::KindMismatch {
                            field: name,
                            expected,
                            found,
                        });
                        keep_as_provided(&mut record, key, wire_relationship_data(resource, &wire_name))
                    }
                    Err(SchemaError::MalformedLinkage { field: name, reason }) => {
                        warn!(resource_type = %record.resource_type, field = %name, %reason, "Dropping malformed relationship");
                        record.warnings.push(SchemaWarning::MalformedLinkage { field: name, reason });
                        None
                    }
                    Err(e) => return Err(e.into()),
                };
                if let Some(data) = data {
                    record.relationships.insert(key.to_string(), data);
                }
                seen_relationships.push(wire_name);
            }
        }
    }

    if let Some(attributes) = &resource.attributes {
        for (wire_key, value) in attributes {
            if !seen_attributes.contains(wire_key) {
                record
                    .attributes
                    .insert(casing::dash_to_camel(wire_key), casing::from_wire(value));
            }
        }
    }

    if let Some(relationships) = &resource.relationships {
        for (wire_key, value) in relationships {
            if seen_relationships.contains(wire_key) {
                continue;
            }
            let key = casing::dash_to_camel(wire_key);
            warn!(resource_type = %record.resource_type, field = %wire_key, "Undefined relationship in model, skipping");
            record
                .warnings
                .push(SchemaWarning::UndeclaredRelationship { field: wire_key.clone() });
            if let Some(data) = keep_as_provided(&mut record, &key, value.get("data")) {
                record.relationships.insert(key, data);
            }
        }
    }

    Ok(record)
}

fn wire_relationship_data<'a>(resource: &'a WireResource, wire_name: &str) -> Option<&'a Value> {
    resource
        .relationships
        .as_ref()
        .and_then(|relationships| relationships.get(wire_name))
        .and_then(|relationship| relationship.get("data"))
}

/// Parses relationship data without a schema, recording a warning if even that fails.
fn keep_as_provided(record: &mut EntityRecord, key: &str, data: Option<&Value>) -> Option<RelationshipData> {
    match RelationshipData::parse(key, data) {
        Ok(data) => Some(data),
        Err(SchemaError::MalformedLinkage { field, reason }) => {
            record.warnings.push(SchemaWarning::MalformedLinkage { field, reason });
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntityKey, Related};
    use crate::schema::{FieldKind, Schema};

    fn person() -> ResourceDefinition {
        ResourceDefinition {
            name: "person".into(),
            path: "people".into(),
            host: "/".into(),
            schema: Schema::new()
                .field("id", Field::key())
                .field("firstName", Field::attribute())
                .field("role", Field::attribute().with_default("member"))
                .field("address", Field::has_one())
                .field("friends", Field::has_many()),
        }
    }

    fn wire(value: Value) -> WireResource {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalizes_declared_fields() {
        let resource = wire(json!({
            "type": "person",
            "id": 3,
            "attributes": { "first-name": "Test3", "nick-name": "t" },
            "relationships": {
                "address": { "data": { "type": "address", "id": 9 } },
                "friends": { "data": [{ "type": "person", "id": 4 }] }
            }
        }));

        let record = from_wire_envelope(&person(), &resource).unwrap();
        assert!(record.resolved);
        assert_eq!(record.url, "/people/3");
        assert_eq!(record.attributes["firstName"], "Test3");
        // Undeclared attributes are kept under their camelCase name.
        assert_eq!(record.attributes["nickName"], "t");
        assert_eq!(
            record.relationships["address"],
            RelationshipData::One(Related::Reference(EntityKey::new("address", 9)))
        );
        assert_eq!(record.relationships["friends"].keys(), vec![&EntityKey::new("person", 4)]);
        assert!(record.warnings.is_empty());
    }

    #[test]
    fn test_kind_mismatch_keeps_payload_shape() {
        let resource = wire(json!({
            "type": "person",
            "id": 1,
            "relationships": {
                "address": { "data": [{ "type": "address", "id": 9 }] },
                "pets": { "data": null }
            }
        }));

        let record = from_wire_envelope(&person(), &resource).unwrap();
        assert_eq!(record.relationships["address"].shape(), "array");
        assert_eq!(record.relationships["pets"], RelationshipData::Null);
        assert!(record.warnings.contains(&SchemaWarning::KindMismatch {
            field: "address".into(),
            expected: FieldKind::HasOne,
            found: "array",
        }));
        assert!(record
            .warnings
            .contains(&SchemaWarning::UndeclaredRelationship { field: "pets".into() }));
    }

    #[test]
    fn test_resource_without_id_is_malformed() {
        let err = from_wire_envelope(&person(), &wire(json!({ "type": "person" }))).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));
    }

    #[test]
    fn test_update_envelope_targets_entity_url() {
        let mut record = EntityRecord::new("person", Some(3.into()), "/people/3");
        record.attributes.insert("firstName".into(), json!("Ada"));
        record.relationships.insert(
            "friends".into(),
            RelationshipData::Many(vec![Related::Resolved(EntityKey::new("person", 4))]),
        );

        let envelope = to_wire_envelope(&person(), &record, RequestKind::Update).unwrap();
        assert_eq!(envelope.url, "/people/3");
        assert_eq!(
            envelope.data,
            json!({
                "data": {
                    "type": "person",
                    "id": "3",
                    "attributes": { "first-name": "Ada", "role": "member" },
                    "relationships": {
                        "address": { "data": null },
                        "friends": { "data": [{ "type": "person", "id": "4" }] }
                    }
                }
            })
        );
    }

    #[test]
    fn test_create_envelope_omits_missing_id() {
        let record = EntityRecord::new("person", None, "/people");
        let envelope = to_wire_envelope(&person(), &record, RequestKind::Create).unwrap();
        assert_eq!(envelope.url, "/people");
        assert!(envelope.data["data"].get("id").is_none());

        let err = to_wire_envelope(&person(), &record, RequestKind::Update).unwrap_err();
        assert!(matches!(err, StoreError::Unsaved(_)));
    }

    #[test]
    fn test_attribute_values_are_sent_unchanged() {
        let mut record = EntityRecord::new("person", Some(3.into()), "/people/3");
        record
            .attributes
            .insert("firstName".into(), json!({ "userID": 5, "HTML": "x", "homeTown": "Oslo" }));

        let envelope = to_wire_envelope(&person(), &record, RequestKind::Update).unwrap();
        assert_eq!(
            envelope.data["data"]["attributes"]["first-name"],
            json!({ "userID": 5, "HTML": "x", "homeTown": "Oslo" })
        );
    }

    #[test]
    fn test_mismatched_relationship_is_sent_as_default() {
        let mut record = EntityRecord::new("person", Some(1.into()), "/people/1");
        record.relationships.insert(
            "address".into(),
            RelationshipData::Many(vec![Related::Reference(EntityKey::new("address", 9))]),
        );
        record.relationships.insert(
            "friends".into(),
            RelationshipData::One(Related::Reference(EntityKey::new("person", 2))),
        );

        let envelope = to_wire_envelope(&person(), &record, RequestKind::Update).unwrap();
        let relationships = &envelope.data["data"]["relationships"];
        assert_eq!(relationships["address"], json!({ "data": null }));
        assert_eq!(relationships["friends"], json!({ "data": [] }));
    }
}
