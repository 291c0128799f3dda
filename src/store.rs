//! # Store
//!
//! The entry point. A [`Store`] owns one resource registry, one identity cache task and
//! one adapter; cloning it clones a handle to the same state.
//!
//! ```rust,no_run
//! use jsonapi_store::adapter::mock::MockAdapter;
//! use jsonapi_store::schema::{Field, Schema};
//! use jsonapi_store::{ResourceConfig, Store, StoreOptions};
//!
//! # async fn demo() -> jsonapi_store::Result<()> {
//! let store = Store::new(MockAdapter::new(), StoreOptions::default());
//! let people = store.resource(
//!     ResourceConfig::new("person").path("people"),
//!     Schema::new().field("id", Field::key()).field("firstName", Field::attribute()),
//! )?;
//!
//! let person = people.find(3).await?;
//! println!("{:?}", person.get("firstName").await?);
//! # Ok(())
//! # }
//! ```
//!
//! `find` places a placeholder in the cache before fetching, so every entity touched by a
//! request occupies exactly one cache slot. Responses are normalized, written to the
//! cache and then relationship-resolved (see [`crate::resolver`]).

use crate::adapter::{Adapter, CollectionRef, EntityRef, Headers};
use crate::cache::{CacheClient, Claimed, IdentityCache};
use crate::error::{Result, StoreError};
use crate::integrity;
use crate::lifecycle::StoreOptions;
use crate::model::Model;
use crate::record::{EntityId, EntityKey, EntityRecord, RelationshipData, SchemaWarning};
use crate::registry::{Registry, ResourceConfig, ResourceDefinition, ResourceDump};
use crate::schema::{Field, Schema};
use crate::serializer::{self, RequestKind};
use crate::wire::{Document, WireEnvelope, WireResource};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    registry: RwLock<Registry>,
    cache: CacheClient,
    adapter: Arc<dyn Adapter>,
    options: StoreOptions,
    headers: Headers,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Creates a store and spawns its identity cache. Must be called inside a Tokio
    /// runtime.
    pub fn new(adapter: impl Adapter + 'static, options: StoreOptions) -> Self {
        Self::with_adapter(Arc::new(adapter), options)
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    fn with_adapter(adapter: Arc<dyn Adapter>, options: StoreOptions) -> Self {
        let (actor, cache) = IdentityCache::new(options.cache_buffer);
        let handle = tokio::spawn(actor.run());
        info!(host = %options.host, "Store started");

        Self {
            inner: Arc::new(StoreInner {
                registry: RwLock::new(Registry::default()),
                cache,
                adapter,
                headers: options.request_headers(),
                options,
                handle: Mutex::new(Some(handle)),
            }),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    pub(crate) fn cache(&self) -> &CacheClient {
        &self.inner.cache
    }

    pub(crate) fn adapter(&self) -> &dyn Adapter {
        self.inner.adapter.as_ref()
    }

    pub(crate) fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers a resource type. A bare name registers `name` at path `name + "s"` on
    /// the store's host.
    pub fn resource(&self, config: impl Into<ResourceConfig>, schema: Schema) -> Result<ResourceHandle> {
        let definition = self
            .registry_mut()
            .register(config.into(), schema, &self.inner.options.host)?;
        info!(resource = %definition.name, path = %definition.path, host = %definition.host, "Registered resource");
        Ok(ResourceHandle {
            store: self.clone(),
            definition,
        })
    }

    /// Whether `resource_type` has been registered (not whether anything is cached).
    #[doc(alias = "has")]
    pub fn in_store(&self, resource_type: &str) -> bool {
        self.registry().contains(resource_type)
    }

    pub(crate) fn definition(&self, resource_type: &str) -> Result<Arc<ResourceDefinition>> {
        self.registry()
            .get(resource_type)
            .ok_or_else(|| StoreError::UnknownResource(resource_type.to_string()))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Returns the entity `(resource_type, id)`, fetching it unless a resolved copy is
    /// cached.
    pub async fn find(&self, resource_type: &str, id: impl Into<EntityId>) -> Result<Model> {
        if resource_type.is_empty() {
            return Err(StoreError::MissingArgument("type"));
        }
        let id = id.into();
        if id.as_str().is_empty() {
            return Err(StoreError::MissingArgument("id"));
        }
        let record = self.find_record(EntityKey::new(resource_type, id), 0).await?;
        Ok(Model::new(self.clone(), record))
    }

    #[instrument(name = "find", skip(self), fields(resource_type = %key.resource_type, id = %key.id))]
    pub(crate) async fn find_record(&self, key: EntityKey, depth: usize) -> Result<EntityRecord> {
        match self.claim(&key).await? {
            Claimed::Existing(record) if record.resolved => {
                debug!("Cache hit");
                Ok(record)
            }
            Claimed::Existing(record) | Claimed::Inserted(record) => self.fetch_record(&key, &record.url, depth).await,
        }
    }

    /// Places a placeholder for `key` unless the cache already holds a record for it.
    pub(crate) async fn claim(&self, key: &EntityKey) -> Result<Claimed> {
        let definition = self.definition(&key.resource_type)?;
        let placeholder = placeholder(&definition, Some(key.id.clone()));
        Ok(self.inner.cache.insert_if_absent(placeholder).await?)
    }

    /// Fetches `key` from `url` and stores the response, resolving it at `depth`.
    pub(crate) async fn fetch_record(&self, key: &EntityKey, url: &str, depth: usize) -> Result<EntityRecord> {
        let entity = EntityRef {
            url: url.to_string(),
            resource_type: key.resource_type.clone(),
            id: Some(key.id.clone()),
        };
        let document = self
            .inner
            .adapter
            .get_item(&entity, &self.inner.headers)
            .await
            .map_err(|e| {
                warn!(url = %entity.url, error = %e, "Fetch failed");
                e
            })?;
        info!(resource_type = %key.resource_type, id = %key.id, "Fetched");

        self.store_response(document, depth)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::MalformedResponse(format!("no entity returned for {key}")))
    }

    /// Fetches the whole collection of `resource_type`.
    #[instrument(skip(self))]
    pub async fn find_all(&self, resource_type: &str) -> Result<Vec<Model>> {
        if resource_type.is_empty() {
            return Err(StoreError::MissingArgument("type"));
        }
        let definition = self.definition(resource_type)?;
        let collection = CollectionRef {
            url: definition.collection_url(),
            resource_type: definition.name.clone(),
        };
        let document = self
            .inner
            .adapter
            .get_all(&collection, &self.inner.headers)
            .await
            .map_err(|e| {
                warn!(url = %collection.url, error = %e, "Fetch failed");
                e
            })?;

        let records = self.store_response(document, 0).await?;
        info!(count = records.len(), "Fetched collection");
        Ok(records.into_iter().map(|record| Model::new(self.clone(), record)).collect())
    }

    /// Cache lookup without any fetch.
    pub async fn find_item(&self, resource_type: &str, id: impl Into<EntityId>) -> Result<Option<EntityRecord>> {
        Ok(self.inner.cache.lookup(EntityKey::new(resource_type, id)).await?)
    }

    /// With an id, behaves like [`Store::find`]; without one, builds a new unsaved model
    /// defaulted from the schema.
    pub async fn model(&self, resource_type: &str, id: Option<EntityId>) -> Result<Model> {
        match id {
            Some(id) => self.find(resource_type, id).await,
            None => self.create(resource_type),
        }
    }

    /// A new, unresolved model for creation flows. Nothing is cached until it is saved.
    pub fn create(&self, resource_type: &str) -> Result<Model> {
        let definition = self.definition(resource_type)?;
        Ok(Model::new(self.clone(), placeholder(&definition, None)))
    }

    /// A facade for `key`: the cached record, or a detached unresolved placeholder when
    /// nothing is cached yet.
    pub(crate) async fn attach(&self, key: &EntityKey) -> Result<Model> {
        let cached = self.inner.cache.lookup(key.clone()).await?;
        let record = match cached {
            Some(record) => record,
            None => match self.definition(&key.resource_type) {
                Ok(definition) => placeholder(&definition, Some(key.id.clone())),
                Err(_) => EntityRecord::new(key.resource_type.clone(), Some(key.id.clone()), ""),
            },
        };
        Ok(Model::new(self.clone(), record))
    }

    // -------------------------------------------------------------------------
    // Normalization
    // -------------------------------------------------------------------------

    /// Writes every entity of a response document into the cache and resolves the
    /// relationships of the primary data. Side-loaded (`included`) entities are cached
    /// first so that references to them need no fetch.
    pub(crate) async fn store_response(&self, document: Document, depth: usize) -> Result<Vec<EntityRecord>> {
        for included in &document.included {
            let record = self.normalize(included)?;
            self.inner.cache.upsert(record).await?;
        }

        let primary = match document.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            item @ Value::Object(_) => vec![item],
            other => {
                return Err(StoreError::MalformedResponse(format!(
                    "primary data must be an object or an array, got {other}"
                )))
            }
        };

        let mut records = Vec::with_capacity(primary.len());
        for item in &primary {
            let record = self.normalize(item)?;
            self.inner.cache.upsert(record.clone()).await?;
            records.push(record);
        }

        try_join_all(records.into_iter().map(|record| self.resolve(record, depth))).await
    }

    fn normalize(&self, value: &Value) -> Result<EntityRecord> {
        let resource: WireResource =
            serde_json::from_value(value.clone()).map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
        let definition = self.definition(&resource.resource_type)?;
        let mut record = serializer::from_wire_envelope(&definition, &resource)?;

        if self.inner.options.check_integrity {
            for diagnostic in integrity::check_integrity(&definition.schema, value, &[]) {
                warn!(resource_type = %record.resource_type, id = ?record.id, %diagnostic, "Integrity");
                record.warnings.push(SchemaWarning::Integrity(diagnostic));
            }
        }
        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Requests & introspection
    // -------------------------------------------------------------------------

    /// Runs the integrity checker for a registered resource over a raw wire resource.
    pub fn check_integrity(&self, resource_type: &str, data: &Value, required_fields: &[&str]) -> Result<Vec<String>> {
        let definition = self.definition(resource_type)?;
        Ok(integrity::check_integrity(&definition.schema, data, required_fields))
    }

    /// Builds the adapter payload for `record`.
    pub fn prepare_request(&self, record: &EntityRecord, kind: RequestKind) -> Result<WireEnvelope> {
        let definition = self.definition(&record.resource_type)?;
        serializer::to_wire_envelope(&definition, record, kind)
    }

    /// Every cached record, grouped by type.
    pub async fn to_json(&self) -> Result<Value> {
        let snapshot = self.inner.cache.snapshot().await?;
        let grouped: Map<String, Value> = snapshot
            .into_iter()
            .map(|(resource_type, records)| {
                let records = records.iter().map(EntityRecord::to_json).collect();
                (resource_type, Value::Array(records))
            })
            .collect();
        Ok(Value::Object(grouped))
    }

    /// Stops the identity cache and waits for its task. Every handle to this store fails
    /// with [`CacheError::ActorClosed`](crate::cache::CacheError::ActorClosed) afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down store...");
        self.inner.cache.shutdown().await?;

        let handle = self.inner.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Identity cache task failed: {:?}", e);
                return Err(crate::cache::CacheError::ActorDropped.into());
            }
        }
        info!("Store shutdown complete.");
        Ok(())
    }
}

/// An unresolved record with schema defaults: has-one `null`, has-many `[]`, and every
/// attribute that declares a default.
fn placeholder(definition: &ResourceDefinition, id: Option<EntityId>) -> EntityRecord {
    let url = match &id {
        Some(id) => definition.url_for(id),
        None => definition.collection_url(),
    };
    let mut record = EntityRecord::new(definition.name.clone(), id, url);
    for (key, field) in definition.schema.iter() {
        match field {
            Field::Key => {}
            Field::Attribute { default, .. } => {
                if let Some(default) = default {
                    record.attributes.insert(key.to_string(), default.clone());
                }
            }
            Field::HasOne { .. } => {
                record.relationships.insert(key.to_string(), RelationshipData::Null);
            }
            Field::HasMany { .. } => {
                record.relationships.insert(key.to_string(), RelationshipData::Many(Vec::new()));
            }
        }
    }
    record
}

/// Handle returned by [`Store::resource`], bound to one resource type.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    store: Store,
    definition: Arc<ResourceDefinition>,
}

impl ResourceHandle {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    pub async fn find(&self, id: impl Into<EntityId>) -> Result<Model> {
        self.store.find(&self.definition.name, id).await
    }

    pub async fn find_all(&self) -> Result<Vec<Model>> {
        self.store.find_all(&self.definition.name).await
    }

    pub fn create(&self) -> Result<Model> {
        self.store.create(&self.definition.name)
    }

    pub fn dump(&self) -> ResourceDump {
        self.definition.dump()
    }

    pub fn stringify(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.dump())
    }
}

/// Builder for [`Store`]; `build` fails without an adapter.
#[derive(Default)]
pub struct StoreBuilder {
    adapter: Option<Arc<dyn Adapter>>,
    options: StoreOptions,
}

impl StoreBuilder {
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    pub fn max_resolution_depth(mut self, depth: usize) -> Self {
        self.options.max_resolution_depth = depth;
        self
    }

    pub fn check_integrity(mut self, enabled: bool) -> Self {
        self.options.check_integrity = enabled;
        self
    }

    pub fn build(self) -> Result<Store> {
        let adapter = self.adapter.ok_or(StoreError::MissingAdapter)?;
        Ok(Store::with_adapter(adapter, self.options))
    }
}
