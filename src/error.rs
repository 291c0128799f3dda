//! # Store Errors
//!
//! Each layer owns its error type ([`SchemaError`], [`CacheError`], [`AdapterError`]);
//! [`StoreError`] aggregates them for callers of the store and model APIs.
//!
//! - **Configuration** errors (duplicate registration, missing adapter, missing schema,
//!   missing arguments) and **lookup** errors (unknown resource type) are returned before
//!   any I/O happens.
//! - **Resolution** errors (adapter failures, non-converging relationship resolution,
//!   malformed responses) surface from the async operations. A record that was partially
//!   resolved when the error hit stays cached with raw references.
//! - Integrity diagnostics are never errors; see [`crate::integrity`].

use crate::adapter::AdapterError;
use crate::cache::CacheError;
use crate::record::EntityKey;
use crate::schema::SchemaError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("resource `{0}` is already registered")]
    DuplicateResource(String),
    #[error("resource configuration requires a name")]
    MissingResourceName,
    #[error("resource `{0}` requires a schema")]
    MissingSchema(String),
    #[error("store requires an adapter")]
    MissingAdapter,
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),
    #[error("resource `{0}` is not registered")]
    UnknownResource(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("relationship resolution did not converge at {key} (depth {depth})")]
    ResolutionCycle { key: EntityKey, depth: usize },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("{0} has no id and has not been saved")]
    Unsaved(String),
    #[error("`{0}` is not a field of this model")]
    UnknownField(String),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
