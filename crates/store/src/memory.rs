//! In-process implementation of `RemoteStore`

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::filter::Filter;
use crate::{Document, RemoteStore};

/// A request issued against a `MemoryStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    GetAll { collection: String },
    GetFiltered { collection: String, field: String },
    Set { collection: String, id: String },
    Update { collection: String, id: String },
    ArrayUnion { collection: String, id: String, field: String },
    Delete { collection: String, id: String },
}

impl Operation {
    pub fn get_all(collection: &str) -> Self {
        Operation::GetAll {
            collection: collection.to_string(),
        }
    }

    pub fn get_filtered(collection: &str, field: &str) -> Self {
        Operation::GetFiltered {
            collection: collection.to_string(),
            field: field.to_string(),
        }
    }

    pub fn set(collection: &str, id: &str) -> Self {
        Operation::Set {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn update(collection: &str, id: &str) -> Self {
        Operation::Update {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn array_union(collection: &str, id: &str, field: &str) -> Self {
        Operation::ArrayUnion {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
        }
    }

    pub fn delete(collection: &str, id: &str) -> Self {
        Operation::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Document store held in memory.
///
/// Collections keep insertion order. Every write is journaled so callers can
/// inspect what reached the store, and individual reads or writes can be made
/// to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    journal: RwLock<Vec<Operation>>,
    failures: RwLock<Vec<Operation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records directly, bypassing the journal.
    pub async fn seed(&self, collection: &str, documents: Vec<Document>) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Current contents of a collection
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = self.collections.read().await;
        collections.get(collection).cloned().unwrap_or_default()
    }

    /// Every write that was applied, oldest first
    pub async fn writes(&self) -> Vec<Operation> {
        self.journal.read().await.clone()
    }

    /// Make the next attempt of exactly this operation fail with `Unavailable`.
    pub async fn fail_on(&self, operation: Operation) {
        self.failures.write().await.push(operation);
    }

    async fn check_injected(&self, operation: &Operation) -> Result<(), StoreError> {
        let mut failures = self.failures.write().await;
        if let Some(pos) = failures.iter().position(|f| f == operation) {
            failures.remove(pos);
            return Err(StoreError::Unavailable(format!("{:?} rejected", operation)));
        }
        Ok(())
    }

    async fn record(&self, operation: Operation) {
        debug!("memory store write: {:?}", operation);
        self.journal.write().await.push(operation);
    }
}

fn has_id(document: &Document, id: &str) -> bool {
    document.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_injected(&Operation::get_all(collection)).await?;
        Ok(self.documents(collection).await)
    }

    async fn get_filtered(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_injected(&Operation::get_filtered(collection, filter.field()))
            .await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
    ) -> Result<(), StoreError> {
        let operation = Operation::set(collection, id);
        self.check_injected(&operation).await?;
        document.insert("id".to_string(), Value::String(id.to_string()));

        {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|d| has_id(d, id)) {
                Some(existing) => *existing = document,
                None => docs.push(document),
            }
        }
        self.record(operation).await;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let operation = Operation::update(collection, id);
        self.check_injected(&operation).await?;

        {
            let mut collections = self.collections.write().await;
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            existing.extend(fields);
        }
        self.record(operation).await;
        Ok(())
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let operation = Operation::array_union(collection, id, field);
        self.check_injected(&operation).await?;

        {
            let mut collections = self.collections.write().await;
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
                .ok_or_else(|| StoreError::not_found(collection, id))?;

            let slot = existing
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            let items = slot.as_array_mut().ok_or_else(|| {
                StoreError::InvalidParameters(format!("field '{}' is not an array", field))
            })?;
            if !items.contains(&value) {
                items.push(value);
            }
        }
        self.record(operation).await;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let operation = Operation::delete(collection, id);
        self.check_injected(&operation).await?;

        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.retain(|d| !has_id(d, id));
        }
        self.record(operation).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_replaces_in_place() {
        let store = MemoryStore::new();
        store
            .set("categories", "c-1", doc(json!({ "name": "Dairy" })))
            .await
            .unwrap();
        store
            .set("categories", "c-2", doc(json!({ "name": "Bakery" })))
            .await
            .unwrap();
        store
            .set("categories", "c-1", doc(json!({ "name": "Milk & Co" })))
            .await
            .unwrap();

        let docs = store.documents("categories").await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get("id"), Some(&json!("c-1")));
        assert_eq!(docs[0].get("name"), Some(&json!("Milk & Co")));
        assert_eq!(store.writes().await.len(), 3);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .seed(
                "products",
                vec![doc(json!({ "id": "p-1", "name": "Milk", "purchased": false }))],
            )
            .await;

        store
            .update("products", "p-1", doc(json!({ "purchased": true })))
            .await
            .unwrap();

        let docs = store.documents("products").await;
        assert_eq!(docs[0].get("name"), Some(&json!("Milk")));
        assert_eq!(docs[0].get("purchased"), Some(&json!(true)));

        let missing = store
            .update("products", "nope", doc(json!({ "purchased": true })))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_array_union_is_idempotent() {
        let store = MemoryStore::new();
        store
            .seed("lists", vec![doc(json!({ "id": "l-1", "sharedWith": [] }))])
            .await;

        for _ in 0..2 {
            store
                .array_union("lists", "l-1", "sharedWith", json!("b@example.com"))
                .await
                .unwrap();
        }

        let docs = store.documents("lists").await;
        assert_eq!(docs[0].get("sharedWith"), Some(&json!(["b@example.com"])));
    }

    #[tokio::test]
    async fn test_filters() {
        let store = MemoryStore::new();
        store
            .seed(
                "lists",
                vec![
                    doc(json!({ "id": "l-1", "ownerId": "u-1", "sharedWith": ["b@example.com"] })),
                    doc(json!({ "id": "l-2", "ownerId": "u-2", "sharedWith": [] })),
                ],
            )
            .await;

        let owned = store
            .get_filtered("lists", &Filter::eq("ownerId", "u-2"))
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].get("id"), Some(&json!("l-2")));

        let shared = store
            .get_filtered(
                "lists",
                &Filter::array_contains("sharedWith", "b@example.com"),
            )
            .await
            .unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].get("id"), Some(&json!("l-1")));

        let none = store
            .get_filtered("missing", &Filter::eq("id", "x"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store
            .seed("products", vec![doc(json!({ "id": "p-1" }))])
            .await;
        store.fail_on(Operation::delete("products", "p-1")).await;

        let first = store.delete("products", "p-1").await;
        assert!(matches!(first, Err(StoreError::Unavailable(_))));
        assert_eq!(store.documents("products").await.len(), 1);
        assert!(store.writes().await.is_empty());

        store.delete("products", "p-1").await.unwrap();
        assert!(store.documents("products").await.is_empty());
        assert_eq!(store.writes().await, vec![Operation::delete("products", "p-1")]);
    }

    #[tokio::test]
    async fn test_injected_read_failure() {
        let store = MemoryStore::new();
        store
            .seed("categories", vec![doc(json!({ "id": "c-1", "listId": "l-1" }))])
            .await;
        store.fail_on(Operation::get_all("products")).await;
        store
            .fail_on(Operation::get_filtered("categories", "listId"))
            .await;

        // other collections and fields are unaffected
        assert!(store.get_all("categories").await.is_ok());
        assert!(store
            .get_filtered("categories", &Filter::eq("id", "c-1"))
            .await
            .is_ok());

        let all = store.get_all("products").await;
        assert!(matches!(all, Err(StoreError::Unavailable(_))));
        let filtered = store
            .get_filtered("categories", &Filter::eq("listId", "l-1"))
            .await;
        assert!(matches!(filtered, Err(StoreError::Unavailable(_))));

        let retried = store
            .get_filtered("categories", &Filter::eq("listId", "l-1"))
            .await
            .unwrap();
        assert_eq!(retried.len(), 1);
        assert!(store.writes().await.is_empty());
    }
}
