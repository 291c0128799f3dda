//! # Cache Messages
//!
//! Requests sent from a [`CacheClient`](super::CacheClient) to the
//! [`IdentityCache`](super::IdentityCache) task. Every request carries a oneshot
//! sender for its reply.

use super::error::CacheError;
use crate::record::{EntityKey, EntityRecord};
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// One-shot response channel used by the cache actor.
pub type Response<T> = oneshot::Sender<Result<T, CacheError>>;

/// Outcome of [`CacheRequest::InsertIfAbsent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Claimed {
    /// The record was stored; no entry existed for its key.
    Inserted(EntityRecord),
    /// An entry already existed and was left untouched.
    Existing(EntityRecord),
}

#[derive(Debug)]
pub enum CacheRequest {
    Lookup {
        key: EntityKey,
        respond_to: Response<Option<EntityRecord>>,
    },
    /// Replace-by-id: any record with the same key is removed, then this one appended.
    Upsert {
        record: EntityRecord,
        respond_to: Response<()>,
    },
    /// Atomic check-and-insert used when placing placeholders.
    InsertIfAbsent {
        record: EntityRecord,
        respond_to: Response<Claimed>,
    },
    Remove {
        key: EntityKey,
        respond_to: Response<Option<EntityRecord>>,
    },
    Snapshot {
        respond_to: Response<BTreeMap<String, Vec<EntityRecord>>>,
    },
    /// Stops the event loop after replying.
    Shutdown { respond_to: Response<()> },
}
