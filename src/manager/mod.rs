//! The list/category/product manager
//!
//! `ListManager` owns the in-memory view of the active list and mediates every
//! change between the presentation layer and the remote store. Mutating
//! operations take `&mut self`; readers get clones through [`ListManager::snapshot`]
//! and learn about changes through [`ListManager::subscribe`].
//!
//! Local state is updated optimistically for renames, toggles, edits and
//! deletes; creations and sharing update local state only after the store
//! confirms. Store failures are returned to the caller and never rolled back.

mod categories;
mod lists;
mod products;

use std::sync::Arc;

use shoplist_auth::{IdentityProvider, Principal};
use shoplist_store::RemoteStore;
use tokio::sync::broadcast;

use crate::config::DEFAULT_PERSONAL_LIST_NAME;
use crate::error::{Error, Result};
use crate::models::{Category, Product, Record, ShoppingList};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// State-change notification for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The accessible lists changed (provisioning, creation, rename, sharing)
    Lists,
    /// A list was entered and its categories and products loaded
    ActiveList(String),
    Categories,
    Selection(Option<String>),
    /// The filtered product view needs re-rendering
    Products,
}

/// Read-only copy of the manager state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub lists: Vec<ShoppingList>,
    pub active_list: Option<ShoppingList>,
    pub categories: Vec<Category>,
    pub selected_category: Option<String>,
    pub visible_products: Vec<Product>,
}

pub struct ListManager {
    store: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityProvider>,
    personal_list_name: String,
    lists: Vec<ShoppingList>,
    active_list: Option<String>,
    categories: Vec<Category>,
    products: Vec<Product>,
    selected_category: Option<String>,
    changes: broadcast::Sender<Change>,
}

impl ListManager {
    pub fn new(store: Arc<dyn RemoteStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            identity,
            personal_list_name: DEFAULT_PERSONAL_LIST_NAME.to_string(),
            lists: Vec::new(),
            active_list: None,
            categories: Vec::new(),
            products: Vec::new(),
            selected_category: None,
            changes,
        }
    }

    /// Set the name used when provisioning a list for a principal with none
    pub fn with_personal_list_name(mut self, name: &str) -> Self {
        self.personal_list_name = name.to_string();
        self
    }

    /// Receive change notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            lists: self.lists.clone(),
            active_list: self.active_list().cloned(),
            categories: self.categories.clone(),
            selected_category: self.selected_category.clone(),
            visible_products: self.visible_products(),
        }
    }

    /// Lists the current principal may access, as last resolved
    pub fn lists(&self) -> &[ShoppingList] {
        &self.lists
    }

    pub fn active_list(&self) -> Option<&ShoppingList> {
        let id = self.active_list.as_deref()?;
        self.lists.iter().find(|l| l.id == id)
    }

    /// Categories of the active list, in load/creation order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    /// Products of the active list, in load/creation order
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    fn principal(&self) -> Result<Principal> {
        self.identity
            .current_principal()
            .ok_or(Error::NotAuthenticated)
    }

    /// Create or replace a record in its collection.
    async fn save<R: Record>(&self, record: &R) -> Result<()> {
        self.store
            .set(R::collection(), record.id(), record.to_document()?)
            .await?;
        Ok(())
    }

    fn notify(&self, change: Change) {
        // no subscriber is not an error
        let _ = self.changes.send(change);
    }
}

/// Trimmed text, or a validation error naming `what` when blank.
fn required_text(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", what)));
    }
    Ok(trimmed.to_string())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("  Milk ", "name").unwrap(), "Milk");
        match required_text(" \t\n", "category name") {
            Err(Error::Validation(msg)) => assert_eq!(msg, "category name cannot be empty"),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_snapshot_of_new_manager_is_empty() {
        let (manager, _store) = manager();
        assert_eq!(manager.snapshot(), Snapshot::default());
        assert!(manager.active_list().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_tracks_selection() {
        let (mut manager, _store) = opened().await;
        let list_id = active_id(&manager);
        let dairy = manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.active_list.map(|l| l.id), Some(list_id));
        assert_eq!(snapshot.selected_category, Some(dairy.id));
        assert_eq!(snapshot.visible_products, vec![milk]);
    }
}
