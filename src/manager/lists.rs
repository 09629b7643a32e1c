//! List resolution, provisioning, sharing and list entry

use serde_json::{json, Value};
use shoplist_auth::Principal;
use shoplist_store::Filter;
use tracing::{debug, info};

use super::{required_text, Change, ListManager};
use crate::error::{Error, Result};
use crate::models::{document, Category, Product, Record, ShoppingList, CATEGORIES, LISTS, PRODUCTS};

impl ListManager {
    /// Lists owned by the principal followed by lists shared with its email.
    ///
    /// The two queries are independent, so a list that is both owned and
    /// shared with the owner's own email appears twice.
    pub async fn resolve_accessible_lists(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ShoppingList>> {
        let owned = self
            .store
            .get_filtered(LISTS, &Filter::eq("ownerId", principal.id.as_str()))
            .await?;
        let shared = self
            .store
            .get_filtered(
                LISTS,
                &Filter::array_contains("sharedWith", principal.email.as_str()),
            )
            .await?;

        let mut lists = ShoppingList::from_documents(owned);
        lists.extend(ShoppingList::from_documents(shared));
        debug!(
            "resolved {} accessible lists for {}",
            lists.len(),
            principal.id
        );
        Ok(lists)
    }

    /// Resolve the principal's lists, provisioning a personal list when there
    /// are none, and enter the first one.
    ///
    /// The lists and the entered list's contents are applied together, so a
    /// failed load leaves the previous session's state untouched.
    pub async fn open_session(&mut self) -> Result<()> {
        let principal = self.principal()?;
        let mut lists = self.resolve_accessible_lists(&principal).await?;

        if lists.is_empty() {
            let list = ShoppingList::new(&self.personal_list_name, &principal.id);
            self.save(&list).await?;
            info!("provisioned '{}' for {}", list.name, principal.id);
            lists.push(list);
        }

        let first = lists[0].id.clone();
        let loaded = self.load_list(&first).await?;

        self.lists = lists;
        self.notify(Change::Lists);
        self.apply_list(&first, loaded);
        Ok(())
    }

    /// Create a list owned by the current principal. The active list is unchanged.
    pub async fn create_list(&mut self, name: &str) -> Result<ShoppingList> {
        let name = required_text(name, "list name")?;
        let principal = self.principal()?;

        let list = ShoppingList::new(&name, &principal.id);
        self.save(&list).await?;
        debug!("created list {}", list.id);

        self.lists.push(list.clone());
        self.notify(Change::Lists);
        Ok(list)
    }

    pub async fn rename_list(&mut self, list_id: &str, name: &str) -> Result<()> {
        let name = required_text(name, "list name")?;
        let list = self
            .lists
            .iter_mut()
            .find(|l| l.id == list_id)
            .ok_or_else(|| Error::not_found(format!("list {}", list_id)))?;
        if list.name == name {
            return Ok(());
        }

        list.name = name.clone();
        self.notify(Change::Lists);
        self.store
            .update(LISTS, list_id, document(json!({ "name": name })))
            .await?;
        Ok(())
    }

    /// Grant access to a list by email.
    ///
    /// The email is appended with an atomic array-union; the local copy is
    /// updated once the store confirms.
    pub async fn share_list(&mut self, list_id: &str, email: &str) -> Result<()> {
        let email = required_text(email, "email")?;
        if !self.lists.iter().any(|l| l.id == list_id) {
            return Err(Error::not_found(format!("list {}", list_id)));
        }

        self.store
            .array_union(LISTS, list_id, "sharedWith", Value::String(email.clone()))
            .await?;
        info!("shared list {} with {}", list_id, email);

        let mut changed = false;
        for list in self.lists.iter_mut().filter(|l| l.id == list_id) {
            changed |= list.add_shared(&email);
        }
        if changed {
            self.notify(Change::Lists);
        }
        Ok(())
    }

    /// Make `list_id` the active list and load its categories and products.
    ///
    /// Nothing is replaced unless both fetches succeed. The first category
    /// becomes selected.
    pub async fn enter_list(&mut self, list_id: &str) -> Result<()> {
        if !self.lists.iter().any(|l| l.id == list_id) {
            return Err(Error::not_found(format!("list {}", list_id)));
        }

        let loaded = self.load_list(list_id).await?;
        self.apply_list(list_id, loaded);
        Ok(())
    }

    /// Categories are fetched by `listId`; products are fetched in full and
    /// kept when their category belongs to the list.
    async fn load_list(&self, list_id: &str) -> Result<LoadedList> {
        let category_docs = self
            .store
            .get_filtered(CATEGORIES, &Filter::eq("listId", list_id))
            .await?;
        let product_docs = self.store.get_all(PRODUCTS).await?;

        let categories = Category::from_documents(category_docs);
        let products = Product::from_documents(product_docs)
            .into_iter()
            .filter(|p| categories.iter().any(|c| c.id == p.category_id))
            .collect();
        Ok(LoadedList {
            categories,
            products,
        })
    }

    fn apply_list(&mut self, list_id: &str, loaded: LoadedList) {
        info!(
            "entered list {}: {} categories, {} products",
            list_id,
            loaded.categories.len(),
            loaded.products.len()
        );

        self.active_list = Some(list_id.to_string());
        self.selected_category = loaded.categories.first().map(|c| c.id.clone());
        self.categories = loaded.categories;
        self.products = loaded.products;
        self.notify(Change::ActiveList(list_id.to_string()));
    }
}

/// Contents of a list, fetched but not yet applied
struct LoadedList {
    categories: Vec<Category>,
    products: Vec<Product>,
}
