//! # Relationship Resolution
//!
//! Turns the raw `{type, id}` references of a freshly normalized record into
//! [`Related::Resolved`] handles, fetching whatever the cache does not hold yet.
//!
//! One pass walks every declared relationship:
//!
//! - a reference whose target is cached (resolved or still a placeholder) is marked
//!   resolved in place;
//! - a reference whose target is absent is scheduled for a fetch;
//! - `null` relationships, already resolved handles and relationships whose payload shape
//!   contradicts the schema are left as they are.
//!
//! Scheduled fetches of one pass run concurrently; once they all settle the pass is
//! repeated. Each fetch first claims the target's cache slot, so when sibling records
//! resolved side by side share a target only one of them fetches it. Each fetch
//! resolves its own entity one level deeper.
//!
//! Two guards make the process finite. A target scheduled a second time by the same
//! record (its fetch did not leave it in the cache) and a nesting depth beyond
//! [`StoreOptions::max_resolution_depth`](crate::StoreOptions) both fail with
//! [`StoreError::ResolutionCycle`]. The record being resolved is already cached before the
//! first pass, so mutual references between two entities converge instead of recursing.

use crate::cache::Claimed;
use crate::error::{Result, StoreError};
use crate::record::{EntityKey, EntityRecord, Related, RelationshipData};
use crate::schema::FieldKind;
use crate::store::Store;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use tracing::{debug, debug_span, instrument, Instrument};

impl Store {
    pub(crate) fn resolve(&self, record: EntityRecord, depth: usize) -> BoxFuture<'_, Result<EntityRecord>> {
        let span = debug_span!("resolve", key = ?record.key(), depth);
        async move {
            let mut record = record;
            let Some(key) = record.key() else {
                return Ok(record);
            };
            if !has_references(&record) {
                return Ok(record);
            }
            if depth > self.options().max_resolution_depth {
                return Err(StoreError::ResolutionCycle { key, depth });
            }

            let definition = self.definition(&record.resource_type)?;
            let mut fetched: HashSet<EntityKey> = HashSet::new();

            loop {
                let mut pending: Vec<EntityKey> = Vec::new();

                for (name, data) in record.relationships.iter_mut() {
                    // Undeclared relationships were flagged during normalization.
                    let Some(field) = definition.schema.get(name) else {
                        continue;
                    };
                    let updated = match (field.kind(), &*data) {
                        (FieldKind::HasOne, RelationshipData::One(Related::Reference(target))) => {
                            if self.cache().lookup(target.clone()).await?.is_some() {
                                Some(RelationshipData::One(Related::Resolved(target.clone())))
                            } else {
                                push_unique(&mut pending, target.clone());
                                None
                            }
                        }
                        (FieldKind::HasMany, RelationshipData::Many(items)) => {
                            Some(self.resolve_many(items, &mut pending).await?)
                        }
                        _ => None,
                    };
                    if let Some(updated) = updated {
                        *data = updated;
                    }
                }

                if pending.is_empty() {
                    break;
                }
                for target in &pending {
                    if !fetched.insert(target.clone()) {
                        return Err(StoreError::ResolutionCycle {
                            key: target.clone(),
                            depth,
                        });
                    }
                }

                debug!(pending = pending.len(), "Scheduling fetches");
                try_join_all(pending.into_iter().map(|target| self.fetch_related(target, depth + 1))).await?;
            }

            self.cache().upsert(record.clone()).await?;
            debug!("Resolved");
            Ok(record)
        }
        .instrument(span)
        .boxed()
    }

    /// Fetches a related entity unless another resolution has claimed its slot in the
    /// meantime; the claimed placeholder then counts as cached on the next pass.
    #[instrument(name = "find", skip(self, target), fields(resource_type = %target.resource_type, id = %target.id))]
    async fn fetch_related(&self, target: EntityKey, depth: usize) -> Result<()> {
        match self.claim(&target).await? {
            Claimed::Inserted(placeholder) => {
                self.fetch_record(&target, &placeholder.url, depth).await?;
            }
            Claimed::Existing(_) => debug!(key = %target, "Already claimed"),
        }
        Ok(())
    }

    /// Resolves the cached elements of a has-many relationship. Elements already resolved
    /// keep their order; newly resolved ones are appended after them, deduplicated by key.
    /// Unresolved references stay in front and are added to `pending`.
    async fn resolve_many(&self, items: &[Related], pending: &mut Vec<EntityKey>) -> Result<RelationshipData> {
        let mut resolved: Vec<Related> = Vec::new();
        let mut waiting: Vec<Related> = Vec::new();

        for item in items.iter().filter(|item| item.is_resolved()) {
            if !resolved.iter().any(|r| r.key() == item.key()) {
                resolved.push(item.clone());
            }
        }

        for item in items.iter().filter(|item| !item.is_resolved()) {
            let target = item.key();
            if resolved.iter().any(|r| r.key() == target) || waiting.iter().any(|r| r.key() == target) {
                continue;
            }
            if self.cache().lookup(target.clone()).await?.is_some() {
                resolved.push(Related::Resolved(target.clone()));
            } else {
                waiting.push(item.clone());
                push_unique(pending, target.clone());
            }
        }

        waiting.extend(resolved);
        Ok(RelationshipData::Many(waiting))
    }
}

fn has_references(record: &EntityRecord) -> bool {
    record.relationships.values().any(|data| match data {
        RelationshipData::Null => false,
        RelationshipData::One(related) => !related.is_resolved(),
        RelationshipData::Many(items) => items.iter().any(|item| !item.is_resolved()),
    })
}

fn push_unique(pending: &mut Vec<EntityKey>, key: EntityKey) {
    if !pending.contains(&key) {
        pending.push(key);
    }
}
