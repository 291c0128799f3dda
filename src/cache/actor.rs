//! # Identity Cache Actor
//!
//! The one owner of cached entity records. The actor holds a bucket per resource type
//! and processes requests from its channel one at a time, so the buckets need no lock:
//! two callers can never interleave a check with an insert.
//!
//! Buckets are plain vectors searched linearly by id. They keep insertion order, which
//! [`CacheRequest::Snapshot`] exposes; an upsert moves the record to the end.

use super::client::CacheClient;
use super::error::CacheError;
use super::message::{CacheRequest, Claimed};
use crate::record::{EntityKey, EntityRecord};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct IdentityCache {
    receiver: mpsc::Receiver<CacheRequest>,
    buckets: HashMap<String, Vec<EntityRecord>>,
}

impl IdentityCache {
    pub fn new(buffer_size: usize) -> (Self, CacheClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            buckets: HashMap::new(),
        };
        (actor, CacheClient::new(sender))
    }

    /// Runs the event loop until every client is dropped or a shutdown request arrives.
    pub async fn run(mut self) {
        info!("Identity cache started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Lookup { key, respond_to } => {
                    let record = self.position(&key).map(|(bucket, index)| bucket[index].clone());
                    debug!(resource_type = %key.resource_type, id = %key.id, found = record.is_some(), "Lookup");
                    let _ = respond_to.send(Ok(record));
                }
                CacheRequest::Upsert { record, respond_to } => {
                    let _ = respond_to.send(self.upsert(record));
                }
                CacheRequest::InsertIfAbsent { record, respond_to } => {
                    let result = match record.key() {
                        None => Err(CacheError::MissingId(record.resource_type.clone())),
                        Some(key) => match self.position(&key) {
                            Some((bucket, index)) => {
                                debug!(resource_type = %key.resource_type, id = %key.id, "Already cached");
                                Ok(Claimed::Existing(bucket[index].clone()))
                            }
                            None => {
                                let bucket = self.buckets.entry(key.resource_type.clone()).or_default();
                                bucket.push(record.clone());
                                debug!(resource_type = %key.resource_type, id = %key.id, size = bucket.len(), "Placeholder");
                                Ok(Claimed::Inserted(record))
                            }
                        },
                    };
                    let _ = respond_to.send(result);
                }
                CacheRequest::Remove { key, respond_to } => {
                    let removed = self.buckets.get_mut(&key.resource_type).and_then(|bucket| {
                        let index = bucket.iter().position(|r| r.id.as_ref() == Some(&key.id))?;
                        Some(bucket.remove(index))
                    });
                    debug!(resource_type = %key.resource_type, id = %key.id, removed = removed.is_some(), "Remove");
                    let _ = respond_to.send(Ok(removed));
                }
                CacheRequest::Snapshot { respond_to } => {
                    let snapshot: BTreeMap<String, Vec<EntityRecord>> = self
                        .buckets
                        .iter()
                        .map(|(resource_type, records)| (resource_type.clone(), records.clone()))
                        .collect();
                    let _ = respond_to.send(Ok(snapshot));
                }
                CacheRequest::Shutdown { respond_to } => {
                    let _ = respond_to.send(Ok(()));
                    break;
                }
            }
        }

        let sizes: BTreeMap<&str, usize> = self
            .buckets
            .iter()
            .map(|(resource_type, records)| (resource_type.as_str(), records.len()))
            .collect();
        info!(?sizes, "Identity cache shutdown");
    }

    fn position(&self, key: &EntityKey) -> Option<(&Vec<EntityRecord>, usize)> {
        let bucket = self.buckets.get(&key.resource_type)?;
        let index = bucket.iter().position(|r| r.id.as_ref() == Some(&key.id))?;
        Some((bucket, index))
    }

    fn upsert(&mut self, record: EntityRecord) -> Result<(), CacheError> {
        let key = record
            .key()
            .ok_or_else(|| CacheError::MissingId(record.resource_type.clone()))?;
        let bucket = self.buckets.entry(key.resource_type.clone()).or_default();
        bucket.retain(|r| r.id.as_ref() != Some(&key.id));
        bucket.push(record);
        debug!(resource_type = %key.resource_type, id = %key.id, size = bucket.len(), "Upsert");
        Ok(())
    }
}
