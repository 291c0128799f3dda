//! # Resource Registry
//!
//! Maps a resource name to its schema, host and URL path. Registration happens once per
//! name; the definitions are immutable afterwards and shared as `Arc`s.

use crate::error::{Result, StoreError};
use crate::record::EntityId;
use crate::schema::{Field, FieldKind, Schema};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Registration parameters. A bare name converts with `path = name + "s"` and the
/// store's default host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceConfig {
    pub name: String,
    pub path: Option<String>,
    pub host: Option<String>,
}

impl ResourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl From<&str> for ResourceConfig {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceConfig {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A registered resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub name: String,
    pub path: String,
    pub host: String,
    pub schema: Schema,
}

impl ResourceDefinition {
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), self.path)
    }

    pub fn url_for(&self, id: &EntityId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    pub fn dump(&self) -> ResourceDump {
        let mut attributes = Map::new();
        let mut relationships = Map::new();
        let mut fields = BTreeMap::new();

        for (key, field) in self.schema.iter() {
            match field {
                Field::Key => {}
                Field::Attribute { .. } => {
                    attributes.insert(key.to_string(), field.default_value());
                }
                Field::HasOne { .. } | Field::HasMany { .. } => {
                    relationships.insert(key.to_string(), field.default_value());
                }
            }
            fields.insert(
                key.to_string(),
                FieldDump {
                    kind: field.kind(),
                    wire_name: field.wire_name(key),
                    default: field.default_value(),
                    related: field.related_type().map(str::to_string),
                },
            );
        }

        ResourceDump {
            name: self.name.clone(),
            path: self.path.clone(),
            host: self.host.clone(),
            resource_type: self.name.clone(),
            id: Value::Null,
            attributes,
            relationships,
            fields,
        }
    }
}

/// Plain snapshot of a registration: metadata, an empty defaulted record keyed by field
/// name, and the field descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDump {
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_path")]
    pub path: String,
    #[serde(rename = "_host")]
    pub host: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: Value,
    pub attributes: Map<String, Value>,
    pub relationships: Map<String, Value>,
    pub fields: BTreeMap<String, FieldDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDump {
    pub kind: FieldKind,
    pub wire_name: String,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

#[derive(Debug, Default)]
pub struct Registry {
    resources: HashMap<String, Arc<ResourceDefinition>>,
}

impl Registry {
    /// Registers `schema` under `config.name`, falling back to `default_host`.
    pub fn register(
        &mut self,
        config: ResourceConfig,
        schema: Schema,
        default_host: &str,
    ) -> Result<Arc<ResourceDefinition>> {
        if config.name.is_empty() {
            return Err(StoreError::MissingResourceName);
        }
        if schema.is_empty() {
            return Err(StoreError::MissingSchema(config.name));
        }
        if self.resources.contains_key(&config.name) {
            return Err(StoreError::DuplicateResource(config.name));
        }

        let definition = Arc::new(ResourceDefinition {
            path: config.path.unwrap_or_else(|| format!("{}s", config.name)),
            host: config.host.unwrap_or_else(|| default_host.to_string()),
            name: config.name,
            schema,
        });
        self.resources.insert(definition.name.clone(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResourceDefinition>> {
        self.resources.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }
}
