//! # Key Casing
//!
//! Internal records use camelCase keys (`firstName`), the wire uses dash-case
//! (`first-name`). The two transforms here are purely lexical and are exact inverses
//! for field names made of ASCII letters.
//!
//! [`from_wire`] applies the dash-to-camel transform recursively to whole fetched JSON
//! values. Keys that start with [`INTERNAL_MARKER`] are reserved for store-private data;
//! neither they nor anything below them is rewritten. Nothing rewrites keys on the way
//! out: attribute values are sent as they are held.

use serde_json::{Map, Value};

/// Prefix of keys that are never rewritten by the recursive transforms.
pub const INTERNAL_MARKER: char = '_';

/// Converts `firstName` into `first-name`.
///
/// A hyphen is inserted between a letter and a following uppercase letter, then the
/// whole string is lowercased. A leading uppercase letter gets no hyphen.
pub fn camel_to_dash(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c.to_ascii_lowercase());
        if c.is_ascii_alphabetic() {
            if let Some(next) = chars.peek() {
                if next.is_ascii_uppercase() {
                    out.push('-');
                }
            }
        }
    }
    out
}

/// Converts `first-name` into `firstName`.
///
/// Only a hyphen followed by a lowercase ASCII letter is a word boundary; any other
/// hyphen is kept as is.
pub fn dash_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    out.push(next.to_ascii_uppercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Recursively rewrites every object key from dash-case to camelCase.
pub fn from_wire(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if key.starts_with(INTERNAL_MARKER) {
                    out.insert(key.clone(), inner.clone());
                } else {
                    out.insert(dash_to_camel(key), from_wire(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(from_wire).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_to_dash() {
        assert_eq!(camel_to_dash("firstName"), "first-name");
        assert_eq!(camel_to_dash("name"), "name");
        assert_eq!(camel_to_dash("dateOfBirth"), "date-of-birth");
        assert_eq!(camel_to_dash("Name"), "name");
    }

    #[test]
    fn test_dash_to_camel() {
        assert_eq!(dash_to_camel("first-name"), "firstName");
        assert_eq!(dash_to_camel("date-of-birth"), "dateOfBirth");
        assert_eq!(dash_to_camel("x-1"), "x-1");
        assert_eq!(dash_to_camel("trailing-"), "trailing-");
    }

    #[test]
    fn test_round_trip_over_lowercase_words() {
        let words = ["name", "last", "of", "birth", "a", "zip"];
        for first in words {
            for second in words {
                for third in words {
                    let mut name = first.to_string();
                    for word in [second, third] {
                        let mut chars = word.chars();
                        if let Some(c) = chars.next() {
                            name.push(c.to_ascii_uppercase());
                            name.push_str(chars.as_str());
                        }
                    }
                    assert_eq!(dash_to_camel(&camel_to_dash(&name)), name);
                }
            }
        }
    }

    #[test]
    fn test_from_wire_rewrites_nested_keys() {
        let wire = json!({
            "type": "person",
            "attributes": {
                "first-name": "Ada",
                "home-address": { "street-name": "Main" },
                "tags": [{ "tag-name": "x" }, "plain"]
            },
            "_private-key": { "keep-me": 1 }
        });

        let internal = from_wire(&wire);
        assert_eq!(internal["attributes"]["firstName"], "Ada");
        assert_eq!(internal["attributes"]["homeAddress"]["streetName"], "Main");
        assert_eq!(internal["attributes"]["tags"][0]["tagName"], "x");
        assert_eq!(internal["attributes"]["tags"][1], "plain");
        // Reserved keys and everything below them are left untouched.
        assert_eq!(internal["_private-key"]["keep-me"], 1);
    }

    #[test]
    fn test_from_wire_keeps_camel_and_upper_case_keys() {
        let wire = json!({ "userID": 5, "HTML": "x", "nested": { "zipCode": "1" } });
        assert_eq!(from_wire(&wire), wire);
    }
}
