//! # Mock Adapter
//!
//! An [`Adapter`] driven by expectations, for exercising the store without a server.
//!
//! Expectations are keyed by operation and URL and consumed in registration order. Every
//! call is recorded, so tests can assert on traffic (`count`, `requests`) as well as on
//! results. A call with no matching expectation fails with
//! [`AdapterError::Transport`].
//!
//! ```rust,ignore
//! let mock = MockAdapter::new();
//! mock.expect_get_item("/people/3")
//!     .return_ok(Document::new(json!({ "type": "person", "id": 3 })));
//!
//! let store = Store::new(mock.clone(), StoreOptions::default());
//! // ...
//! mock.verify(); // Ensures all expectations were met
//! ```

use super::{Adapter, AdapterError, CollectionRef, EntityRef, Headers};
use crate::wire::{Document, WireEnvelope};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Adapter operations, as recorded by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetItem,
    GetAll,
    SaveItem,
    UpdateItem,
    DeleteItem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::GetItem => "get_item",
            Operation::GetAll => "get_all",
            Operation::SaveItem => "save_item",
            Operation::UpdateItem => "update_item",
            Operation::DeleteItem => "delete_item",
        })
    }
}

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub operation: Operation,
    pub url: String,
    /// The `{"data": ...}` payload of save/update calls.
    pub body: Option<Value>,
    pub headers: Headers,
}

enum Reply {
    Document(Result<Document, AdapterError>),
    Unit(Result<(), AdapterError>),
}

struct Expectation {
    operation: Operation,
    url: String,
    reply: Reply,
}

type Expectations = Arc<Mutex<VecDeque<Expectation>>>;

/// A cloneable mock adapter; clones share expectations and the request log.
#[derive(Clone, Default)]
pub struct MockAdapter {
    expectations: Expectations,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockAdapter {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_get_item(&self, url: impl Into<String>) -> DocumentExpectationBuilder {
        self.document_builder(Operation::GetItem, url)
    }

    pub fn expect_get_all(&self, url: impl Into<String>) -> DocumentExpectationBuilder {
        self.document_builder(Operation::GetAll, url)
    }

    pub fn expect_save_item(&self, url: impl Into<String>) -> DocumentExpectationBuilder {
        self.document_builder(Operation::SaveItem, url)
    }

    pub fn expect_update_item(&self, url: impl Into<String>) -> DocumentExpectationBuilder {
        self.document_builder(Operation::UpdateItem, url)
    }

    pub fn expect_delete_item(&self, url: impl Into<String>) -> UnitExpectationBuilder {
        UnitExpectationBuilder {
            operation: Operation::DeleteItem,
            url: url.into(),
            expectations: self.expectations.clone(),
        }
    }

    fn document_builder(&self, operation: Operation, url: impl Into<String>) -> DocumentExpectationBuilder {
        DocumentExpectationBuilder {
            operation,
            url: url.into(),
            expectations: self.expectations.clone(),
        }
    }

    /// Every call received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls received for `operation`.
    pub fn count(&self, operation: Operation) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            let remaining: Vec<String> = exps.iter().map(|e| format!("{} {}", e.operation, e.url)).collect();
            panic!("Not all expectations were met. {} remaining: {:?}", exps.len(), remaining);
        }
    }

    fn record(&self, operation: Operation, url: &str, body: Option<Value>, headers: &Headers) -> Option<Reply> {
        debug!(%operation, url, "Mock adapter call");
        self.requests.lock().unwrap().push(RecordedRequest {
            operation,
            url: url.to_string(),
            body,
            headers: headers.clone(),
        });

        let mut exps = self.expectations.lock().unwrap();
        let index = exps.iter().position(|e| e.operation == operation && e.url == url)?;
        exps.remove(index).map(|e| e.reply)
    }

    fn reply_document(&self, operation: Operation, url: &str, body: Option<Value>, headers: &Headers) -> Result<Document, AdapterError> {
        match self.record(operation, url, body, headers) {
            Some(Reply::Document(result)) => result,
            _ => Err(unexpected(operation, url)),
        }
    }
}

fn unexpected(operation: Operation, url: &str) -> AdapterError {
    AdapterError::Transport(format!("unexpected {operation} {url}"))
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn get_item(&self, entity: &EntityRef, headers: &Headers) -> Result<Document, AdapterError> {
        self.reply_document(Operation::GetItem, &entity.url, None, headers)
    }

    async fn get_all(&self, collection: &CollectionRef, headers: &Headers) -> Result<Document, AdapterError> {
        self.reply_document(Operation::GetAll, &collection.url, None, headers)
    }

    async fn save_item(&self, envelope: &WireEnvelope, headers: &Headers) -> Result<Document, AdapterError> {
        self.reply_document(Operation::SaveItem, &envelope.url, Some(envelope.data.clone()), headers)
    }

    async fn update_item(&self, envelope: &WireEnvelope, headers: &Headers) -> Result<Document, AdapterError> {
        self.reply_document(Operation::UpdateItem, &envelope.url, Some(envelope.data.clone()), headers)
    }

    async fn delete_item(&self, entity: &EntityRef, headers: &Headers) -> Result<(), AdapterError> {
        match self.record(Operation::DeleteItem, &entity.url, None, headers) {
            Some(Reply::Unit(result)) => result,
            _ => Err(unexpected(Operation::DeleteItem, &entity.url)),
        }
    }
}

/// Builder for expectations answered with a document.
pub struct DocumentExpectationBuilder {
    operation: Operation,
    url: String,
    expectations: Expectations,
}

impl DocumentExpectationBuilder {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, document: Document) {
        self.push(Ok(document));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: AdapterError) {
        self.push(Err(error));
    }

    fn push(self, result: Result<Document, AdapterError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            operation: self.operation,
            url: self.url,
            reply: Reply::Document(result),
        });
    }
}

/// Builder for `delete_item` expectations.
pub struct UnitExpectationBuilder {
    operation: Operation,
    url: String,
    expectations: Expectations,
}

impl UnitExpectationBuilder {
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: AdapterError) {
        self.push(Err(error));
    }

    fn push(self, result: Result<(), AdapterError>) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation {
            operation: self.operation,
            url: self.url,
            reply: Reply::Unit(result),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_ref(id: u32) -> EntityRef {
        EntityRef {
            url: format!("/people/{id}"),
            resource_type: "person".into(),
            id: Some(id.into()),
        }
    }

    #[tokio::test]
    async fn test_expectations_are_matched_by_url() {
        let mock = MockAdapter::new();
        mock.expect_get_item("/people/2")
            .return_ok(Document::new(json!({ "type": "person", "id": 2 })));
        mock.expect_get_item("/people/1")
            .return_err(AdapterError::Status { status: 404, message: "Not Found".into() });

        let headers = Headers::new();
        let err = mock.get_item(&person_ref(1), &headers).await.unwrap_err();
        assert!(matches!(err, AdapterError::Status { status: 404, .. }));

        let doc = mock.get_item(&person_ref(2), &headers).await.unwrap();
        assert_eq!(doc.data["id"], 2);

        assert_eq!(mock.count(Operation::GetItem), 2);
        mock.verify();
    }

    #[tokio::test]
    async fn test_unexpected_call_is_an_error() {
        let mock = MockAdapter::new();
        let err = mock.delete_item(&person_ref(1), &Headers::new()).await.unwrap_err();
        assert_eq!(err, AdapterError::Transport("unexpected delete_item /people/1".into()));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_panics_on_leftovers() {
        let mock = MockAdapter::new();
        mock.expect_delete_item("/people/1").return_ok();
        mock.verify();
    }
}
