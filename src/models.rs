//! Domain records: lists, categories and products

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shoplist_store::Document;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

/// Collection holding `ShoppingList` records
pub const LISTS: &str = "lists";
/// Collection holding `Category` records
pub const CATEGORIES: &str = "categories";
/// Collection holding `Product` records
pub const PRODUCTS: &str = "products";

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A record stored in one of the remote collections
pub trait Record: Serialize + DeserializeOwned + Sized {
    fn collection() -> &'static str;

    fn id(&self) -> &str;

    fn to_document(&self) -> Result<Document> {
        Ok(document(serde_json::to_value(self)?))
    }

    /// Records without an `id` (or with mistyped fields) are skipped.
    fn from_documents(documents: Vec<Document>) -> Vec<Self> {
        documents
            .into_iter()
            .filter_map(|doc| {
                if !doc.get("id").map(Value::is_string).unwrap_or(false) {
                    warn!("skipping {} record without id", Self::collection());
                    return None;
                }
                match serde_json::from_value::<Self>(Value::Object(doc)) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("skipping malformed {} record: {}", Self::collection(), e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Turn a `json!({...})` literal into a field map for partial updates.
pub(crate) fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// A named, owned, optionally shared collection of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: String,
    /// Emails the list is shared with, in the order they were added
    #[serde(default)]
    pub shared_with: Vec<String>,
}

impl ShoppingList {
    pub fn new(name: &str, owner_id: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            shared_with: Vec::new(),
        }
    }

    pub fn is_shared_with(&self, email: &str) -> bool {
        self.shared_with.iter().any(|e| e == email)
    }

    /// Returns false when the email was already present.
    pub fn add_shared(&mut self, email: &str) -> bool {
        if self.is_shared_with(email) {
            return false;
        }
        self.shared_with.push(email.to_string());
        true
    }
}

impl Record for ShoppingList {
    fn collection() -> &'static str {
        LISTS
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// A named grouping of products within one list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub name: String,
}

impl Category {
    pub fn new(list_id: &str, name: &str) -> Self {
        Self {
            id: new_id(),
            list_id: list_id.to_string(),
            name: name.to_string(),
        }
    }
}

impl Record for Category {
    fn collection() -> &'static str {
        CATEGORIES
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub purchased: bool,
    #[serde(default)]
    pub note: String,
}

impl Product {
    pub fn new(category_id: &str, name: &str) -> Self {
        Self {
            id: new_id(),
            category_id: category_id.to_string(),
            name: name.to_string(),
            purchased: false,
            note: String::new(),
        }
    }
}

impl Record for Product {
    fn collection() -> &'static str {
        PRODUCTS
    }

    fn id(&self) -> &str {
        &self.id
    }
}
