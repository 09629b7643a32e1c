//! PostgREST-backed implementation of `RemoteStore`

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use url::Url;

use crate::error::StoreError;
use crate::filter::Filter;
use crate::{Document, RemoteStore};

/// Name of the SQL function performing the atomic array append
const ARRAY_UNION_RPC: &str = "array_union";

/// Store client talking to a PostgREST endpoint (`{base_url}/rest/v1`)
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    base_url: String,
    http_client: Client,
    headers: HeaderMap,
}

impl PostgrestStore {
    /// Create a new store client
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            StoreError::InvalidParameters("API key is not a valid header value".to_string())
        })?;
        headers.insert("apikey", key);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            headers,
        })
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, StoreError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            StoreError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            StoreError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Authenticate requests with a user access token
    pub fn with_auth(self, token: &str) -> Result<Self, StoreError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    fn collection_url(
        &self,
        collection: &str,
        params: &[(&str, String)],
    ) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, collection))?;
        for (key, value) in params {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    fn id_filter(id: &str) -> (&'static str, String) {
        ("id", format!("eq.{}", id))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(StoreError::NetworkError)?;

        if !response.status().is_success() {
            return Err(StoreError::from_response(response).await);
        }
        Ok(response)
    }

    async fn select(&self, url: Url) -> Result<Vec<Document>, StoreError> {
        let response = self.send(self.http_client.get(url)).await?;
        response
            .json::<Vec<Document>>()
            .await
            .map_err(|e| StoreError::DeserializationError(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        debug!("GET all from {}", collection);
        let url = self.collection_url(collection, &[("select", "*".to_string())])?;
        self.select(url).await
    }

    async fn get_filtered(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        debug!("GET {} where {:?}", collection, filter);
        let url = self.collection_url(
            collection,
            &[
                ("select", "*".to_string()),
                (filter.field(), filter.to_query_value()?),
            ],
        )?;
        self.select(url).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        mut document: Document,
    ) -> Result<(), StoreError> {
        debug!("UPSERT {}/{}", collection, id);
        document.insert("id".to_string(), Value::String(id.to_string()));
        let url = self.collection_url(collection, &[])?;

        self.send(
            self.http_client
                .post(url)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&document),
        )
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        debug!("PATCH {}/{} {:?}", collection, id, fields.keys());
        let url = self.collection_url(collection, &[Self::id_filter(id)])?;

        let response = self
            .send(
                self.http_client
                    .patch(url)
                    .header("Prefer", "return=representation")
                    .json(&fields),
            )
            .await?;

        // PostgREST answers a PATCH that matched nothing with an empty array
        let body_text = response.text().await.map_err(|e| {
            StoreError::DeserializationError(format!("Failed to read response body: {}", e))
        })?;
        if body_text.trim().is_empty() {
            return Ok(());
        }
        let updated: Vec<Value> = serde_json::from_str(&body_text)
            .map_err(|e| StoreError::DeserializationError(e.to_string()))?;
        if updated.is_empty() {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        debug!("RPC {} on {}/{}.{}", ARRAY_UNION_RPC, collection, id, field);
        let url = Url::parse(&format!(
            "{}/rest/v1/rpc/{}",
            self.base_url, ARRAY_UNION_RPC
        ))?;
        let params = json!({
            "collection": collection,
            "id": id,
            "field": field,
            "value": value,
        });

        self.send(self.http_client.post(url).json(&params)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        debug!("DELETE {}/{}", collection, id);
        let url = self.collection_url(collection, &[Self::id_filter(id)])?;

        self.send(
            self.http_client
                .delete(url)
                .header("Prefer", "return=minimal"),
        )
        .await?;
        Ok(())
    }
}
