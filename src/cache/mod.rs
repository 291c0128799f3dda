//! # Identity Cache
//!
//! An in-memory identity map of `(type, id)` to [`EntityRecord`](crate::record::EntityRecord),
//! owned by a single Tokio task.
//!
//! - [`IdentityCache`]: the actor. It owns the buckets and answers requests sequentially.
//! - [`CacheClient`]: the cloneable handle the store and model facades use.
//! - [`CacheRequest`]: the message protocol between them.
//!
//! Within a type there is never more than one record per id: writes replace by id, and
//! placeholders are placed with an atomic insert-if-absent.

mod actor;
mod client;
mod error;
mod message;

pub use actor::IdentityCache;
pub use client::CacheClient;
pub use error::CacheError;
pub use message::{CacheRequest, Claimed, Response};
