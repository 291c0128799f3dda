//! # Integrity Checker
//!
//! Compares a fetched wire resource against its declared schema and reports, as plain
//! strings, what does not line up:
//!
//! - missing `id` or `type`,
//! - over-fetch: attribute or relationship keys the schema does not declare,
//! - under-fetch: declared attributes or relationships absent from the payload,
//!   relationship data of the wrong shape,
//! - required fields with no data.
//!
//! The checker works on raw JSON and never fails; a payload without `attributes` or
//! `relationships` containers is simply treated as empty. Whether a diagnostic is fatal
//! is the caller's decision.

use crate::schema::{Field, Schema};
use serde_json::{Map, Value};

pub fn check_integrity(schema: &Schema, data: &Value, required_fields: &[&str]) -> Vec<String> {
    let mut errors = Vec::new();
    let empty = Map::new();

    if data.get("id").map_or(true, Value::is_null) {
        errors.push("ID Key is required, not found in response".to_string());
    }
    if data.get("type").map_or(true, Value::is_null) {
        errors.push("Type field is required, not found in response".to_string());
    }

    let attributes = data.get("attributes").and_then(Value::as_object).unwrap_or(&empty);
    let relationships = data.get("relationships").and_then(Value::as_object).unwrap_or(&empty);

    for key in attributes.keys() {
        if !matches!(schema.by_wire_name(key), Some((_, Field::Attribute { .. }))) {
            errors.push(format!("{key} not found in model attributes are you overfetching?"));
        }
    }
    for key in relationships.keys() {
        if !matches!(schema.by_wire_name(key), Some((_, Field::HasOne { .. } | Field::HasMany { .. }))) {
            errors.push(format!("{key} not found in model relationships are you overfetching?"));
        }
    }

    for (key, field) in schema.iter() {
        let wire_name = field.wire_name(key);
        match field {
            Field::Key => {}
            Field::Attribute { .. } => {
                if !attributes.contains_key(&wire_name) {
                    errors.push(format!("{key} not found in data attributes are you underfetching?"));
                }
            }
            Field::HasOne { .. } => match relationships.get(&wire_name).and_then(|r| r.get("data")) {
                None => errors.push(format!("{key} not found in data relationships are you underfetching?")),
                Some(Value::Null | Value::Object(_)) => {}
                Some(_) => errors.push(format!("{key} not object type but marked as hasOne is this correct?")),
            },
            Field::HasMany { .. } => match relationships.get(&wire_name).and_then(|r| r.get("data")) {
                None => errors.push(format!("{key} not found in data relationships are you underfetching?")),
                Some(Value::Array(_)) => {}
                Some(_) => errors.push(format!("{key} not array type but marked as hasMany is this correct?")),
            },
        }
    }

    for &field_name in required_fields {
        let Some(field) = schema.get(field_name) else {
            errors.push(format!("required field [{field_name}] is not declared in the model"));
            continue;
        };
        let wire_name = field.wire_name(field_name);
        match field {
            Field::Key => {}
            Field::Attribute { .. } => {
                if attributes.get(&wire_name).map_or(true, Value::is_null) {
                    errors.push(format!("attribute [{field_name}] Marked as required but is null"));
                }
            }
            Field::HasOne { .. } | Field::HasMany { .. } => {
                let data = relationships.get(&wire_name).and_then(|r| r.get("data"));
                if data.map_or(true, Value::is_null) {
                    errors.push(format!("relationship [{field_name}] Marked as required but is null"));
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::new()
            .field("id", Field::key())
            .field("firstName", Field::attribute())
            .field("address", Field::has_one())
            .field("friends", Field::has_many())
    }

    fn complete() -> Value {
        json!({
            "type": "person",
            "id": 1,
            "attributes": { "first-name": "Ada" },
            "relationships": {
                "address": { "data": null },
                "friends": { "data": [] }
            }
        })
    }

    #[test]
    fn test_matching_payload_is_clean() {
        assert!(check_integrity(&person(), &complete(), &[]).is_empty());
    }

    #[test]
    fn test_detects_overfetching() {
        let mut data = complete();
        data["attributes"]["age"] = json!(36);
        data["relationships"]["pets"] = json!({ "data": [] });

        let errors = check_integrity(&person(), &data, &[]);
        assert_eq!(
            errors,
            vec![
                "age not found in model attributes are you overfetching?",
                "pets not found in model relationships are you overfetching?",
            ]
        );
    }

    #[test]
    fn test_detects_underfetching_and_wrong_shapes() {
        let data = json!({
            "type": "person",
            "id": 1,
            "relationships": {
                "address": { "data": [] },
                "friends": { "links": {} }
            }
        });

        let errors = check_integrity(&person(), &data, &[]);
        assert!(errors.contains(&"firstName not found in data attributes are you underfetching?".to_string()));
        assert!(errors.contains(&"address not object type but marked as hasOne is this correct?".to_string()));
        assert!(errors.contains(&"friends not found in data relationships are you underfetching?".to_string()));
    }

    #[test]
    fn test_required_fields() {
        let mut data = complete();
        data["attributes"]["first-name"] = Value::Null;

        let errors = check_integrity(&person(), &data, &["firstName", "address", "friends", "nickname"]);
        assert_eq!(
            errors,
            vec![
                "attribute [firstName] Marked as required but is null",
                "relationship [address] Marked as required but is null",
                "required field [nickname] is not declared in the model",
            ]
        );
    }

    #[test]
    fn test_missing_identity_and_containers_never_panic() {
        let errors = check_integrity(&person(), &json!({}), &["firstName"]);
        assert!(errors.contains(&"ID Key is required, not found in response".to_string()));
        assert!(errors.contains(&"Type field is required, not found in response".to_string()));
        assert!(errors.contains(&"attribute [firstName] Marked as required but is null".to_string()));

        assert!(!check_integrity(&person(), &json!("not an object"), &[]).is_empty());
    }
}
