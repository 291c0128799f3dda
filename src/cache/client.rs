//! # Cache Client
//!
//! Async handle to the identity cache. Cloning is cheap: the client only holds the
//! channel sender, so the store and every model facade can carry one.

use super::error::CacheError;
use super::message::{CacheRequest, Claimed};
use crate::record::{EntityKey, EntityRecord};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone)]
pub struct CacheClient {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheClient {
    pub fn new(sender: mpsc::Sender<CacheRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, CacheError>>) -> CacheRequest,
    ) -> Result<T, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)?
    }

    pub async fn lookup(&self, key: EntityKey) -> Result<Option<EntityRecord>, CacheError> {
        self.request(|respond_to| CacheRequest::Lookup { key, respond_to }).await
    }

    pub async fn upsert(&self, record: EntityRecord) -> Result<(), CacheError> {
        self.request(|respond_to| CacheRequest::Upsert { record, respond_to }).await
    }

    pub async fn insert_if_absent(&self, record: EntityRecord) -> Result<Claimed, CacheError> {
        self.request(|respond_to| CacheRequest::InsertIfAbsent { record, respond_to })
            .await
    }

    pub async fn remove(&self, key: EntityKey) -> Result<Option<EntityRecord>, CacheError> {
        self.request(|respond_to| CacheRequest::Remove { key, respond_to }).await
    }

    pub async fn snapshot(&self) -> Result<BTreeMap<String, Vec<EntityRecord>>, CacheError> {
        self.request(|respond_to| CacheRequest::Snapshot { respond_to }).await
    }

    pub async fn shutdown(&self) -> Result<(), CacheError> {
        self.request(|respond_to| CacheRequest::Shutdown { respond_to }).await
    }
}
