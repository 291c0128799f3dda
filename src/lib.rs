//! # JSON:API Store
//!
//! > **A normalized entity store for JSON:API resources.**
//!
//! This crate sits between application code and a remote API that speaks JSON:API
//! documents (`{type, id, attributes, relationships}`). It fetches entities through a
//! pluggable [`Adapter`], keeps exactly one cached record per `(type, id)`, resolves
//! relationships lazily, and hands entities back as [`Model`] facades that can be read,
//! modified and saved.
//!
//! ## Core Concepts
//!
//! ### Schemas
//! Each resource type is registered once with a [`Schema`](schema::Schema): field name to
//! [`Field`](schema::Field) descriptor (`key`, `attribute`, `has_one`, `has_many`).
//! Descriptors know their wire name (dash-cased by default) and default value, and move
//! values between the internal camelCase record and the dash-cased wire resource.
//!
//! ### The Identity Cache
//! The cache is an actor: one Tokio task owns every record and processes requests
//! sequentially. The store and each model talk to it through a cloneable
//! [`CacheClient`](cache::CacheClient). `find` places a placeholder with an atomic
//! insert-if-absent before fetching, so concurrent lookups never duplicate an entity.
//!
//! ### Relationship Resolution
//! Fetched records are cached first and then resolved: references to cached entities are
//! marked resolved, missing ones are fetched concurrently, pass after pass, until nothing
//! is left. A per-record fetched set and a depth cap turn non-converging graphs into
//! [`StoreError::ResolutionCycle`]. See [`resolver`].
//!
//! ### Diagnostics
//! Payloads that disagree with the schema are not rejected. Kind mismatches and
//! undeclared relationships become [`SchemaWarning`](record::SchemaWarning)s on the
//! record; the [`integrity`] checker reports over- and under-fetching as plain strings.
//!
//! ## Module Tour
//!
//! - [`schema`]: field descriptors, casing transforms.
//! - [`registry`]: resource registration and dumps.
//! - [`cache`]: the identity cache actor and its client.
//! - [`store`]: the [`Store`] entry point and [`ResourceHandle`].
//! - [`model`]: the [`Model`] facade.
//! - [`serializer`], [`integrity`]: wire conversion and payload validation.
//! - [`adapter`]: the transport trait and [`MockAdapter`](adapter::mock::MockAdapter).
//! - [`lifecycle`]: [`StoreOptions`] and tracing setup.
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=debug cargo run
//! ```

pub mod adapter;
pub mod cache;
pub mod error;
pub mod integrity;
pub mod lifecycle;
pub mod model;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod store;
pub mod wire;

pub use adapter::{Adapter, AdapterError};
pub use error::{Result, StoreError};
pub use lifecycle::StoreOptions;
pub use model::{FieldValue, Model};
pub use record::{EntityId, EntityKey, EntityRecord};
pub use registry::ResourceConfig;
pub use store::{ResourceHandle, Store, StoreBuilder};
pub use wire::Document;
