//! Product operations under the selected category

use serde_json::json;
use tracing::debug;

use super::{required_text, Change, ListManager};
use crate::error::{Error, Result};
use crate::models::{document, Product, PRODUCTS};

impl ListManager {
    /// Create a product under the selected category.
    pub async fn add_product(&mut self, name: &str) -> Result<Product> {
        let category_id = self
            .selected_category
            .clone()
            .ok_or_else(|| Error::validation("no category selected"))?;
        let name = required_text(name, "product name")?;

        let product = Product::new(&category_id, &name);
        self.save(&product).await?;
        debug!("added product {} to category {}", product.id, category_id);

        self.products.push(product.clone());
        self.notify(Change::Products);
        Ok(product)
    }

    pub async fn set_purchased(&mut self, product_id: &str, purchased: bool) -> Result<()> {
        self.product_mut(product_id)?.purchased = purchased;
        self.notify(Change::Products);
        self.store
            .update(PRODUCTS, product_id, document(json!({ "purchased": purchased })))
            .await?;
        Ok(())
    }

    /// Replace name and note in one write. The note may be empty.
    pub async fn edit_product(&mut self, product_id: &str, name: &str, note: &str) -> Result<()> {
        let name = required_text(name, "product name")?;
        let product = self.product_mut(product_id)?;
        product.name = name.clone();
        product.note = note.to_string();
        self.notify(Change::Products);

        self.store
            .update(
                PRODUCTS,
                product_id,
                document(json!({ "name": name, "note": note })),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_product(&mut self, product_id: &str) -> Result<()> {
        let position = self
            .products
            .iter()
            .position(|p| p.id == product_id)
            .ok_or_else(|| Error::not_found(format!("product {}", product_id)))?;
        self.products.remove(position);
        self.notify(Change::Products);

        self.store.delete(PRODUCTS, product_id).await?;
        Ok(())
    }

    /// Loaded products under `category_id`, in insertion order
    pub fn filter_by_category(&self, category_id: &str) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect()
    }

    /// Products under the selected category
    pub fn visible_products(&self) -> Vec<Product> {
        match &self.selected_category {
            Some(id) => self.filter_by_category(id),
            None => Vec::new(),
        }
    }

    fn product_mut(&mut self, product_id: &str) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| Error::not_found(format!("product {}", product_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::Record;
    use shoplist_store::{Operation, StoreError};

    #[tokio::test]
    async fn test_add_product_requires_selection() {
        let (mut manager, store) = opened().await;
        let writes_before = store.writes().await.len();

        let result = manager.add_product("Milk").await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(manager.products().is_empty());
        assert_eq!(store.writes().await.len(), writes_before);
    }

    #[tokio::test]
    async fn test_add_product_defaults() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        let dairy = manager.add_category(&list_id, "Dairy").await.unwrap();

        let milk = manager.add_product(" Milk ").await.unwrap();

        assert_eq!(milk.name, "Milk");
        assert_eq!(milk.category_id, dairy.id);
        assert!(!milk.purchased);
        assert_eq!(milk.note, "");
        assert_eq!(
            Product::from_documents(store.documents(PRODUCTS).await),
            vec![milk]
        );

        let blank = manager.add_product("  ").await;
        assert!(matches!(blank, Err(Error::Validation(_))));
        assert_eq!(manager.products().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_product_failure_keeps_local_removal() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        store.fail_on(Operation::delete(PRODUCTS, &milk.id)).await;

        let result = manager.delete_product(&milk.id).await;

        assert!(matches!(
            result,
            Err(Error::Store(StoreError::Unavailable(_)))
        ));
        assert!(manager.products().is_empty());
        assert_eq!(store.documents(PRODUCTS).await.len(), 1);
    }

    #[tokio::test]
    async fn test_set_purchased_always_notifies() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        let mut rx = manager.subscribe();

        manager.set_purchased(&milk.id, false).await.unwrap();
        manager.set_purchased(&milk.id, true).await.unwrap();

        assert_eq!(drain(&mut rx), vec![Change::Products, Change::Products]);
        assert!(manager.products()[0].purchased);
        assert_eq!(
            store.documents(PRODUCTS).await[0].get("purchased"),
            Some(&json!(true))
        );

        let missing = manager.set_purchased("nope", true).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_purchased_failure_keeps_local_value() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        store.fail_on(Operation::update(PRODUCTS, &milk.id)).await;

        let result = manager.set_purchased(&milk.id, true).await;

        assert!(matches!(result, Err(Error::Store(_))));
        assert!(manager.products()[0].purchased);
        assert_eq!(
            store.documents(PRODUCTS).await[0].get("purchased"),
            Some(&json!(false))
        );
    }

    #[tokio::test]
    async fn test_edit_product() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();

        manager
            .edit_product(&milk.id, "Oat milk", "barista edition")
            .await
            .unwrap();
        manager.edit_product(&milk.id, "Oat milk", "").await.unwrap();

        let stored = store.documents(PRODUCTS).await;
        let stored = &stored[0];
        assert_eq!(stored.get("name"), Some(&json!("Oat milk")));
        assert_eq!(stored.get("note"), Some(&json!("")));
        assert_eq!(manager.products()[0].note, "");
        let updates = store
            .writes()
            .await
            .into_iter()
            .filter(|w| *w == Operation::update(PRODUCTS, &milk.id))
            .count();
        assert_eq!(updates, 2);
    }

    #[tokio::test]
    async fn test_edit_product_blank_name_changes_nothing() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        let writes_before = store.writes().await.len();

        let result = manager.edit_product(&milk.id, "", "note").await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(manager.products()[0].name, "Milk");
        assert_eq!(manager.products()[0].note, "");
        assert_eq!(store.writes().await.len(), writes_before);
    }

    #[tokio::test]
    async fn test_delete_product() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        manager.add_category(&list_id, "Dairy").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        let cheese = manager.add_product("Cheese").await.unwrap();

        manager.delete_product(&milk.id).await.unwrap();

        assert_eq!(manager.products(), &[cheese]);
        assert_eq!(store.documents(PRODUCTS).await.len(), 1);

        let again = manager.delete_product(&milk.id).await;
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_filter_by_category_preserves_order() {
        let (mut manager, store) = opened().await;
        let list_id = active_id(&manager);
        let dairy = manager.add_category(&list_id, "Dairy").await.unwrap();
        let bakery = manager.add_category(&list_id, "Bakery").await.unwrap();
        let milk = manager.add_product("Milk").await.unwrap();
        manager.select_category(&bakery.id);
        let bread = manager.add_product("Bread").await.unwrap();
        manager.select_category(&dairy.id);
        let cheese = manager.add_product("Cheese").await.unwrap();
        let writes_before = store.writes().await.len();

        assert_eq!(manager.filter_by_category(&dairy.id), vec![milk.clone(), cheese.clone()]);
        assert_eq!(manager.filter_by_category(&bakery.id), vec![bread]);
        assert!(manager.filter_by_category("nope").is_empty());
        assert_eq!(manager.visible_products(), vec![milk, cheese]);
        assert_eq!(store.writes().await.len(), writes_before);
    }
}
