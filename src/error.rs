//! Error handling for the shoplist core

use shoplist_auth::AuthError;
use shoplist_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Unified error type for the shoplist crate
#[derive(Error, Debug)]
pub enum Error {
    /// Blank required text or a missing selection; raised before any store call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// An operation needs a signed-in principal
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A list, category or product id unknown to the manager
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
