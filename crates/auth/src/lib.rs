//! Identity provider for shoplist
//!
//! The shopping-list core only needs to know who is signed in: a stable
//! user id and an email address. This crate defines that boundary
//! (`IdentityProvider`) and provides a client for a GoTrue-compatible auth
//! API that signs users up, in and out with email and password.

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

/// The authenticated user as far as the shopping-list core is concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

impl Principal {
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
        }
    }
}

/// Supplies the current principal, or `None` when nobody is signed in.
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;
}

/// ユーザー情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// セッション情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    pub user: User,
}

/// Trim both fields and reject blank ones before any request is made.
pub fn validate_credentials(email: &str, password: &str) -> Result<(String, String), AuthError> {
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "email and password are both required".to_string(),
        ));
    }
    Ok((email.to_string(), password.to_string()))
}

/// Auth クライアント
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    current_session: Arc<RwLock<Option<Session>>>,
}

impl Auth {
    /// 新しい Auth クライアントを作成
    ///
    /// Successful sign-up, sign-in and refresh replace the held session.
    pub fn new(url: &str, key: &str, http_client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            current_session: Arc::new(RwLock::new(None)),
        }
    }

    /// ユーザー登録
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let (email, password) = validate_credentials(email, password)?;
        let url = format!("{}/auth/v1/signup", self.url);
        debug!("signing up {}", email);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.token_request(&url, &payload).await
    }

    /// メール・パスワードでログイン
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let (email, password) = validate_credentials(email, password)?;
        let url = format!("{}/auth/v1/token?grant_type=password", self.url);
        debug!("signing in {}", email);

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.token_request(&url, &payload).await
    }

    /// セッションをリフレッシュ
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.url);

        let payload = serde_json::json!({
            "refresh_token": session.refresh_token,
        });
        self.token_request(&url, &payload).await
    }

    /// サインアウト
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let url = format!("{}/auth/v1/logout", self.url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        self.store_session(None);
        info!("signed out user {}", session.user.id);
        Ok(())
    }

    /// 現在のセッションを取得
    pub fn get_session(&self) -> Option<Session> {
        self.current_session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Access token of the current session, for authenticating store requests
    pub fn access_token(&self) -> Option<String> {
        self.get_session().map(|s| s.access_token)
    }

    async fn token_request(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Session, AuthError> {
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        let session: Session = response.json().await?;
        info!("session established for user {}", session.user.id);

        self.store_session(Some(session.clone()));
        Ok(session)
    }

    fn store_session(&self, session: Option<Session>) {
        let mut write_guard = self
            .current_session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *write_guard = session;
    }
}

impl IdentityProvider for Auth {
    /// A session whose user has no email does not yield a principal.
    fn current_principal(&self) -> Option<Principal> {
        let session = self.get_session()?;
        let email = session.user.email?;
        Some(Principal {
            id: session.user.id,
            email,
        })
    }
}

/// A fixed identity, for offline use and tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    principal: Option<Principal>,
}

impl StaticIdentity {
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            principal: Some(Principal::new(id, email)),
        }
    }

    /// Nobody signed in
    pub fn anonymous() -> Self {
        Self { principal: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_principal(&self) -> Option<Principal> {
        self.principal.clone()
    }
}
