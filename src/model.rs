//! # Model Facade
//!
//! A [`Model`] is a read/write view over one entity: a handle to the store plus a
//! snapshot of the cached record. Reads of attributes come from the snapshot; reads of
//! relationships follow the stored keys into the cache at call time. Writes change the
//! snapshot only, until [`Model::save`] or [`Model::update`] sends them to the adapter.
//!
//! The snapshot does not track the cache. Another operation replacing the same entity
//! leaves this facade stale until [`Model::refresh`].

use crate::adapter::EntityRef;
use crate::error::{Result, StoreError};
use crate::record::{parse_linkage, EntityId, EntityKey, EntityRecord, Related, RelationshipData, SchemaWarning};
use crate::registry::ResourceDefinition;
use crate::schema::{Field, FieldKind};
use crate::serializer::RequestKind;
use crate::store::Store;
use crate::wire::Document;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{info, instrument, warn};

/// Result of [`Model::get`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// `id`, `type`, `url`, an attribute (or a value nested inside one), or an empty
    /// has-one relationship (`null`).
    Value(Value),
    One(Box<Model>),
    Many(Vec<Model>),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            FieldValue::One(model) => Some(*model),
            _ => None,
        }
    }

    pub fn into_models(self) -> Option<Vec<Model>> {
        match self {
            FieldValue::Many(models) => Some(models),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Model {
    store: Store,
    record: EntityRecord,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub(crate) fn new(store: Store, record: EntityRecord) -> Self {
        Self { store, record }
    }

    pub fn key(&self) -> Option<EntityKey> {
        self.record.key()
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.record.id.as_ref()
    }

    pub fn resource_type(&self) -> &str {
        &self.record.resource_type
    }

    pub fn url(&self) -> &str {
        &self.record.url
    }

    pub fn is_resolved(&self) -> bool {
        self.record.resolved
    }

    pub fn record(&self) -> &EntityRecord {
        &self.record
    }

    pub fn into_record(self) -> EntityRecord {
        self.record
    }

    /// Warnings collected while this entity was normalized.
    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.record.warnings
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.record.attributes.get(name)
    }

    /// The `{type, id}` linkage pointing at this entity, for use with [`Model::set`].
    /// `null` while the entity has no id.
    pub fn linkage(&self) -> Value {
        self.key().map_or(Value::Null, |key| key.linkage())
    }

    pub fn to_json(&self) -> Value {
        self.record.to_json()
    }

    /// Reads a dotted path.
    ///
    /// The first segment is looked up as `id`/`type`/`url`, then as an attribute, then as
    /// a relationship. Remaining segments descend into nested attribute values or, for a
    /// has-one relationship, into the related model. Related entities that are not cached
    /// come back as unresolved models.
    pub async fn get(&self, path: &str) -> Result<Option<FieldValue>> {
        let segments: Vec<&str> = path.split('.').collect();
        self.get_segments(&segments).await
    }

    fn get_segments<'a>(&'a self, segments: &'a [&'a str]) -> BoxFuture<'a, Result<Option<FieldValue>>> {
        async move {
            let Some((&first, rest)) = segments.split_first() else {
                return Ok(None);
            };

            if rest.is_empty() {
                let top_level = match first {
                    "id" => self.record.id.as_ref().map(|id| json!(id)),
                    "type" => Some(json!(self.record.resource_type)),
                    "url" => Some(json!(self.record.url)),
                    _ => None,
                };
                if let Some(value) = top_level {
                    return Ok(Some(FieldValue::Value(value)));
                }
            }

            if let Some(value) = self.record.attributes.get(first) {
                return Ok(descend(value, rest).map(FieldValue::Value));
            }

            match self.record.relationships.get(first) {
                None => Ok(None),
                Some(RelationshipData::Null) => Ok(rest.is_empty().then_some(FieldValue::Value(Value::Null))),
                Some(RelationshipData::One(related)) => {
                    let model = self.store.attach(related.key()).await?;
                    if rest.is_empty() {
                        Ok(Some(FieldValue::One(Box::new(model))))
                    } else {
                        model.get_segments(rest).await
                    }
                }
                Some(RelationshipData::Many(items)) => {
                    if !rest.is_empty() {
                        return Ok(None);
                    }
                    let models = try_join_all(items.iter().map(|item| self.store.attach(item.key()))).await?;
                    Ok(Some(FieldValue::Many(models)))
                }
            }
        }
        .boxed()
    }

    /// Writes a dotted path into the snapshot.
    ///
    /// Relationship fields accept a `{type, id}` object, a `{data: ..}` wrapper, an array
    /// of either (has-many), `null`, or bare ids when the field declares its related type.
    /// Attribute writes may create nested objects. Fields outside the schema can only be
    /// written when the record already carries them.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let segments: Vec<&str> = path.split('.').collect();
        let Some((&first, rest)) = segments.split_first() else {
            return Err(StoreError::UnknownField(path.to_string()));
        };
        let definition = self.store.definition(&self.record.resource_type)?;

        match (first, definition.schema.get(first)) {
            (_, Some(Field::Key)) | ("id", None) if rest.is_empty() => self.set_id(&definition, &value),
            ("type" | "url", None) => Err(StoreError::InvalidValue {
                field: path.to_string(),
                reason: "read-only".to_string(),
            }),
            (_, Some(field)) if field.kind().is_relationship() => {
                if !rest.is_empty() {
                    return Err(StoreError::InvalidValue {
                        field: path.to_string(),
                        reason: "nested writes go through the related model".to_string(),
                    });
                }
                let data = relationship_from_value(field, first, value)?;
                self.record.relationships.insert(first.to_string(), data);
                Ok(())
            }
            (_, Some(Field::Attribute { .. })) => {
                set_nested(&mut self.record.attributes, first, rest, value);
                Ok(())
            }
            (_, None) if self.record.attributes.contains_key(first) => {
                set_nested(&mut self.record.attributes, first, rest, value);
                Ok(())
            }
            _ => Err(StoreError::UnknownField(path.to_string())),
        }
    }

    fn set_id(&mut self, definition: &ResourceDefinition, value: &Value) -> Result<()> {
        let id = match value {
            Value::Null => None,
            other => Some(EntityId::from_value(other).ok_or_else(|| StoreError::InvalidValue {
                field: "id".to_string(),
                reason: format!("expected a string or number, got {other}"),
            })?),
        };
        self.record.url = match &id {
            Some(id) => definition.url_for(id),
            None => definition.collection_url(),
        };
        self.record.id = id;
        Ok(())
    }

    /// Creates the entity when it is not resolved yet, updates it otherwise. The
    /// response replaces both the cached record and this snapshot.
    ///
    /// A relationship fetched with the wrong shape (see [`SchemaWarning::KindMismatch`])
    /// is sent as `null`/`[]` until it is `set` to a valid value.
    #[instrument(skip(self), fields(resource_type = %self.record.resource_type, id = ?self.record.id))]
    pub async fn save(&mut self) -> Result<()> {
        if self.record.resolved {
            return self.update().await;
        }

        let envelope = self.store.prepare_request(&self.record, RequestKind::Create)?;
        let document = self
            .store
            .adapter()
            .save_item(&envelope, self.store.headers())
            .await
            .map_err(|e| {
                warn!(url = %envelope.url, error = %e, "Create failed");
                e
            })?;

        let record = self.absorb(document).await?.ok_or_else(|| {
            StoreError::MalformedResponse(format!("create of `{}` returned no entity", self.record.resource_type))
        })?;
        info!(id = ?record.id, "Created");
        self.record = record;
        Ok(())
    }

    /// Sends the snapshot to the entity URL. An empty response keeps the local snapshot,
    /// which is then cached as resolved.
    #[instrument(skip(self), fields(resource_type = %self.record.resource_type, id = ?self.record.id))]
    pub async fn update(&mut self) -> Result<()> {
        if self.record.id.is_none() {
            return Err(StoreError::Unsaved(self.record.resource_type.clone()));
        }

        let envelope = self.store.prepare_request(&self.record, RequestKind::Update)?;
        let document = self
            .store
            .adapter()
            .update_item(&envelope, self.store.headers())
            .await
            .map_err(|e| {
                warn!(url = %envelope.url, error = %e, "Update failed");
                e
            })?;

        match self.absorb(document).await? {
            Some(record) => self.record = record,
            None => {
                self.record.resolved = true;
                self.store.cache().upsert(self.record.clone()).await?;
            }
        }
        info!("Updated");
        Ok(())
    }

    /// Deletes the entity through the adapter, then evicts it from the cache. The
    /// snapshot stays readable and is marked unresolved.
    #[instrument(skip(self), fields(resource_type = %self.record.resource_type, id = ?self.record.id))]
    pub async fn delete(&mut self) -> Result<()> {
        let key = self
            .key()
            .ok_or_else(|| StoreError::Unsaved(self.record.resource_type.clone()))?;
        let definition = self.store.definition(&key.resource_type)?;
        let entity = EntityRef {
            url: definition.url_for(&key.id),
            resource_type: key.resource_type.clone(),
            id: Some(key.id.clone()),
        };

        self.store
            .adapter()
            .delete_item(&entity, self.store.headers())
            .await
            .map_err(|e| {
                warn!(url = %entity.url, error = %e, "Delete failed");
                e
            })?;
        self.store.cache().remove(key).await?;
        self.record.resolved = false;
        info!("Deleted");
        Ok(())
    }

    /// Re-reads the snapshot from the cache. Returns `false` when the entity is not
    /// cached (unsaved, evicted), leaving the snapshot untouched.
    pub async fn refresh(&mut self) -> Result<bool> {
        let Some(key) = self.key() else {
            return Ok(false);
        };
        match self.store.cache().lookup(key).await? {
            Some(record) => {
                self.record = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn absorb(&self, document: Document) -> Result<Option<EntityRecord>> {
        Ok(self.store.store_response(document, 0).await?.into_iter().next())
    }
}

fn descend(value: &Value, path: &[&str]) -> Option<Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn set_nested(attributes: &mut Map<String, Value>, first: &str, rest: &[&str], value: Value) {
    let mut slot = attributes.entry(first.to_string()).or_insert(Value::Null);
    for segment in rest {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        slot = match slot {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            _ => return,
        };
    }
    *slot = value;
}

fn relationship_from_value(field: &Field, name: &str, value: Value) -> Result<RelationshipData> {
    let invalid = |reason: String| StoreError::InvalidValue {
        field: name.to_string(),
        reason,
    };

    let value = match value {
        Value::Object(mut wrapper) if wrapper.contains_key("data") && !wrapper.contains_key("type") => {
            wrapper.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    let to_related = |item: &Value| -> Result<Related> {
        if item.is_object() {
            return Ok(Related::Reference(parse_linkage(name, item)?));
        }
        let id = EntityId::from_value(item)
            .ok_or_else(|| invalid(format!("expected a {{type, id}} object or an id, got {item}")))?;
        let related_type = field
            .related_type()
            .ok_or_else(|| invalid("a bare id needs a related type on the field".to_string()))?;
        Ok(Related::Reference(EntityKey::new(related_type, id)))
    };

    match (field.kind(), value) {
        (FieldKind::HasMany, Value::Null) => Ok(RelationshipData::Many(Vec::new())),
        (_, Value::Null) => Ok(RelationshipData::Null),
        (FieldKind::HasMany, Value::Array(items)) => items
            .iter()
            .map(to_related)
            .collect::<Result<Vec<_>>>()
            .map(RelationshipData::Many),
        (FieldKind::HasMany, _) => Err(invalid("has-many expects an array".to_string())),
        (_, Value::Array(_)) => Err(invalid("has-one expects a single entity".to_string())),
        (_, item) => to_related(&item).map(RelationshipData::One),
    }
}
