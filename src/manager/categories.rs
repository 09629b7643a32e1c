//! Category operations on the active list

use serde_json::json;
use shoplist_store::Filter;
use tracing::{debug, warn};

use super::{required_text, Change, ListManager};
use crate::error::{Error, Result};
use crate::models::{document, Category, CATEGORIES, PRODUCTS};

impl ListManager {
    /// Create a category under `list_id`.
    ///
    /// The record is persisted before it shows up locally, and it only shows
    /// up when `list_id` is the active list. The first category of the active
    /// list becomes the selection.
    pub async fn add_category(&mut self, list_id: &str, name: &str) -> Result<Category> {
        let name = required_text(name, "category name")?;
        if !self.lists.iter().any(|l| l.id == list_id) {
            return Err(Error::not_found(format!("list {}", list_id)));
        }

        let category = Category::new(list_id, &name);
        self.save(&category).await?;
        debug!("added category {} to list {}", category.id, list_id);

        if self.active_list.as_deref() == Some(list_id) {
            self.categories.push(category.clone());
            self.notify(Change::Categories);
            if self.selected_category.is_none() {
                self.selected_category = Some(category.id.clone());
                self.notify(Change::Selection(self.selected_category.clone()));
            }
        }
        Ok(category)
    }

    pub async fn rename_category(&mut self, category_id: &str, name: &str) -> Result<()> {
        let name = required_text(name, "category name")?;
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| Error::not_found(format!("category {}", category_id)))?;
        if category.name == name {
            return Ok(());
        }

        category.name = name.clone();
        self.notify(Change::Categories);
        self.store
            .update(CATEGORIES, category_id, document(json!({ "name": name })))
            .await?;
        Ok(())
    }

    /// Delete a category together with its products.
    ///
    /// Local state drops the category and its products at once. At the store
    /// the products go first, one request each; their failures are only
    /// logged. A failure deleting the category record itself is returned.
    pub async fn delete_category(&mut self, category_id: &str) -> Result<()> {
        let position = self
            .categories
            .iter()
            .position(|c| c.id == category_id)
            .ok_or_else(|| Error::not_found(format!("category {}", category_id)))?;

        self.categories.remove(position);
        self.products.retain(|p| p.category_id != category_id);
        self.notify(Change::Categories);
        if self.selected_category.as_deref() == Some(category_id) {
            self.selected_category = self.categories.first().map(|c| c.id.clone());
            self.notify(Change::Selection(self.selected_category.clone()));
        }
        self.notify(Change::Products);

        match self
            .store
            .get_filtered(PRODUCTS, &Filter::eq("categoryId", category_id))
            .await
        {
            Ok(children) => {
                for child in children {
                    let Some(id) = child.get("id").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    if let Err(e) = self.store.delete(PRODUCTS, id).await {
                        warn!("failed to delete product {} of category {}: {}", id, category_id, e);
                    }
                }
            }
            Err(e) => warn!("failed to query products of category {}: {}", category_id, e),
        }

        self.store.delete(CATEGORIES, category_id).await?;
        debug!("deleted category {}", category_id);
        Ok(())
    }

    /// Number of loaded products under a category
    pub fn product_count(&self, category_id: &str) -> usize {
        self.products
            .iter()
            .filter(|p| p.category_id == category_id)
            .count()
    }

    /// Select a category of the active list.
    ///
    /// An id that is not a loaded category falls back to the first category.
    /// Returns the selection in effect afterwards.
    pub fn select_category(&mut self, category_id: &str) -> Option<String> {
        let selected = if self.categories.iter().any(|c| c.id == category_id) {
            Some(category_id.to_string())
        } else {
            self.categories.first().map(|c| c.id.clone())
        };

        if selected != self.selected_category {
            self.selected_category = selected.clone();
            self.notify(Change::Selection(selected.clone()));
        }
        selected
    }
}
