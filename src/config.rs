//! Configuration for the shoplist client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Name given to the list provisioned for a principal with no lists
pub const DEFAULT_PERSONAL_LIST_NAME: &str = "Personal List";

/// Connection and behaviour settings.
/// It's recommended to load these values from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend (auth under `/auth/v1`, store under `/rest/v1`)
    pub url: Url,

    /// Anonymous API key sent with every request
    pub anon_key: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Name of the auto-provisioned list
    pub personal_list_name: String,
}

impl Config {
    /// Creates a new configuration, validating the URL.
    pub fn new(url_str: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.is_empty() {
            return Err(Error::Config("anon_key cannot be empty".to_string()));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            personal_list_name: DEFAULT_PERSONAL_LIST_NAME.to_string(),
        })
    }

    /// Reads `SHOPLIST_URL` and `SHOPLIST_ANON_KEY`.
    pub fn from_env() -> Result<Self> {
        let url_str = std::env::var("SHOPLIST_URL").map_err(|_| {
            Error::Config("SHOPLIST_URL environment variable not found".to_string())
        })?;
        let anon_key = std::env::var("SHOPLIST_ANON_KEY").map_err(|_| {
            Error::Config("SHOPLIST_ANON_KEY environment variable not found".to_string())
        })?;
        Self::new(&url_str, &anon_key)
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the name of the auto-provisioned list
    pub fn with_personal_list_name(mut self, value: &str) -> Self {
        self.personal_list_name = value.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotenv::dotenv;

    #[test]
    fn config_new_valid() {
        let config = Config::new("http://localhost:54321", "dummy-anon-key").unwrap();

        // Url::parse adds the trailing slash
        assert_eq!(config.url.as_str(), "http://localhost:54321/");
        assert_eq!(config.anon_key, "dummy-anon-key");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.personal_list_name, "Personal List");
    }

    #[test]
    fn config_new_invalid_url() {
        match Config::new("not a valid url", "some_anon_key") {
            Err(Error::Url(_)) => {}
            other => panic!("Expected Url error, got {:?}", other),
        }
    }

    #[test]
    fn config_new_empty_key() {
        match Config::new("http://localhost:54321", "") {
            Err(Error::Config(msg)) => assert!(msg.contains("anon_key cannot be empty")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn config_builders() {
        let config = Config::new("http://localhost:54321", "key")
            .unwrap()
            .with_request_timeout(None)
            .with_personal_list_name("La meva llista");

        assert_eq!(config.request_timeout, None);
        assert_eq!(config.personal_list_name, "La meva llista");
    }

    #[test]
    fn config_from_env() {
        dotenv().ok();

        std::env::set_var("SHOPLIST_URL", "http://localhost:12345");
        std::env::set_var("SHOPLIST_ANON_KEY", "env-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.url.as_str(), "http://localhost:12345/");
        assert_eq!(config.anon_key, "env-key");
    }
}
