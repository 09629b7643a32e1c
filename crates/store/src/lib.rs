//! Remote document store client for shoplist
//!
//! This crate provides the persistence boundary for the shopping-list core:
//! collections of untyped JSON records keyed by generated identifiers.
//!
//! # Features
//!
//! - Full-collection and filtered reads (`eq`, array-contains)
//! - Create-or-replace, partial field update and delete by id
//! - Atomic array-union append on a single field
//! - A PostgREST-backed client and an in-process store

mod error;
mod filter;
mod memory;
mod postgrest;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{ApiErrorDetails, StoreError};
pub use filter::Filter;
pub use memory::{MemoryStore, Operation};
pub use postgrest::PostgrestStore;

/// A single untyped record
pub type Document = serde_json::Map<String, Value>;

/// Operations the shopping-list core needs from a document database.
///
/// Every method resolves independently; nothing here is transactional.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every record of a collection, in store order.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Fetch the records of a collection matching `filter`.
    async fn get_filtered(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Create or replace the record with the given id.
    async fn set(&self, collection: &str, id: &str, document: Document)
        -> Result<(), StoreError>;

    /// Merge `fields` into an existing record.
    async fn update(&self, collection: &str, id: &str, fields: Document)
        -> Result<(), StoreError>;

    /// Append `value` to the array stored in `field` unless already present.
    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Delete the record with the given id. Deleting a missing record succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
