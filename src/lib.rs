//! Shared shopping-list core
//!
//! Lists hold categories, categories hold products, and every change is
//! synchronized with a remote document store. Lists can be shared with other
//! users by email.
//!
//! `ShopList` wires the auth client and the PostgREST-backed store together
//! from a [`Config`]; [`ListManager`] holds the in-memory state of the active
//! list and is what a presentation layer drives.

pub mod config;
pub mod error;
pub mod manager;
pub mod models;

use std::sync::Arc;

use reqwest::Client;
use shoplist_auth::Auth;
use shoplist_store::PostgrestStore;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::manager::{Change, ListManager, Snapshot};
pub use crate::models::{Category, Product, Record, ShoppingList};
pub use shoplist_auth::{IdentityProvider, Principal, StaticIdentity};
pub use shoplist_store::{Filter, MemoryStore, RemoteStore, StoreError};

/// The main entry point for the shoplist client
pub struct ShopList {
    config: Config,
    http_client: Client,
    auth: Arc<Auth>,
}

impl ShopList {
    /// Create a new client from a configuration
    ///
    /// # Example
    ///
    /// ```
    /// use shoplist::{Config, ShopList};
    ///
    /// let config = Config::new("https://your-project-url.supabase.co", "your-anon-key")?;
    /// let shoplist = ShopList::new(config)?;
    /// assert!(shoplist.auth().get_session().is_none());
    /// # Ok::<(), shoplist::Error>(())
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let auth = Auth::new(config.url.as_str(), &config.anon_key, http_client.clone());

        Ok(Self {
            config,
            http_client,
            auth: Arc::new(auth),
        })
    }

    /// Create a client from `SHOPLIST_URL` and `SHOPLIST_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the auth client for sign up, sign in and sign out
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// A store client carrying the signed-in user's access token, if any.
    ///
    /// Build the store after signing in; the token is captured at this point.
    pub fn store(&self) -> Result<PostgrestStore> {
        let store = PostgrestStore::new(
            self.config.url.as_str(),
            &self.config.anon_key,
            self.http_client.clone(),
        )?;
        match self.auth.access_token() {
            Some(token) => Ok(store.with_auth(&token)?),
            None => Ok(store),
        }
    }

    /// Sign in with email and password and return a manager for that user.
    ///
    /// Blank credentials fail with [`Error::Auth`] before any request is made.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<ListManager> {
        self.auth.sign_in_with_password(email, password).await?;
        self.manager()
    }

    /// A manager for the signed-in user, backed by [`ShopList::store`]
    pub fn manager(&self) -> Result<ListManager> {
        let store = Arc::new(self.store()?);
        let identity: Arc<dyn IdentityProvider> = self.auth.clone();
        Ok(ListManager::new(store, identity)
            .with_personal_list_name(&self.config.personal_list_name))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::manager::{Change, ListManager, Snapshot};
    pub use crate::models::{Category, Product, ShoppingList};
    pub use crate::ShopList;
}
