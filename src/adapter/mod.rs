//! # Transport Adapter
//!
//! The store never performs I/O itself. Every network operation goes through an
//! [`Adapter`] injected at construction, which receives fully built URLs and payloads and
//! returns JSON:API [`Document`]s.
//!
//! [`mock::MockAdapter`] is an expectation-driven implementation for tests and demos.

pub mod mock;

use crate::record::EntityId;
use crate::wire::{Document, WireEnvelope};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Request headers, passed to every adapter call.
pub type Headers = BTreeMap<String, String>;

/// Target of a single-entity request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: Option<EntityId>,
}

/// Target of a collection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRef {
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// Failures reported by an adapter. They reach the store's caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("adapter does not support `{0}`")]
    Unsupported(&'static str),
}

#[async_trait]
pub trait Adapter: Send + Sync {
    async fn get_item(&self, entity: &EntityRef, headers: &Headers) -> Result<Document, AdapterError>;

    async fn get_all(&self, collection: &CollectionRef, headers: &Headers) -> Result<Document, AdapterError>;

    async fn save_item(&self, envelope: &WireEnvelope, headers: &Headers) -> Result<Document, AdapterError>;

    async fn update_item(&self, envelope: &WireEnvelope, headers: &Headers) -> Result<Document, AdapterError>;

    async fn delete_item(&self, _entity: &EntityRef, _headers: &Headers) -> Result<(), AdapterError> {
        Err(AdapterError::Unsupported("delete_item"))
    }
}
