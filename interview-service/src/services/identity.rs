//! User provisioning against the identity provider.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::json;
use service_core::observability::inject_trace_headers;
use std::collections::BTreeSet;
use std::sync::Mutex;
use thiserror::Error;

const ADMIN_API_KEY_HEADER: &str = "X-Admin-Api-Key";
const CREATE_USER_PATH: &str = "/auth/admin/users";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User already exists")]
    UsernameExists,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Identity provider error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub username: String,
}

/// Creates accounts whose temporary password is delivered by email.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn admin_create_user(
        &self,
        email: &str,
        request_id: Option<&str>,
    ) -> Result<CreatedUser, IdentityError>;
}

/// Calls the auth service admin API.
pub struct AuthServiceIdentityProvider {
    client: Client,
    base_url: String,
    admin_api_key: Option<String>,
}

impl AuthServiceIdentityProvider {
    pub fn new(base_url: impl Into<String>, admin_api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_api_key,
        }
    }
}

#[async_trait]
impl IdentityProvider for AuthServiceIdentityProvider {
    async fn admin_create_user(
        &self,
        email: &str,
        request_id: Option<&str>,
    ) -> Result<CreatedUser, IdentityError> {
        let url = format!("{}{}", self.base_url, CREATE_USER_PATH);

        let mut headers = HeaderMap::new();
        inject_trace_headers(&mut headers, request_id);

        let mut request = self.client.post(&url).headers(headers).json(&json!({
            "username": email,
            "email": email,
            "email_verified": true,
            "send_temporary_password": true,
        }));
        if let Some(key) = &self.admin_api_key {
            request = request.header(ADMIN_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send POST request to {}: {}", url, e);
            IdentityError::Other(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(CreatedUser {
                username: email.to_string(),
            });
        }

        let detail = response.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT => Err(IdentityError::UsernameExists),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(IdentityError::InvalidParameter(detail))
            }
            _ => Err(IdentityError::Other(format!(
                "Auth service returned {}: {}",
                status, detail
            ))),
        }
    }
}

/// Keeps created usernames in memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    users: Mutex<BTreeSet<String>>,
    unavailable: bool,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails with a non-specific error.
    pub fn unavailable() -> Self {
        Self {
            users: Mutex::default(),
            unavailable: true,
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(username)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn admin_create_user(
        &self,
        email: &str,
        _request_id: Option<&str>,
    ) -> Result<CreatedUser, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Other("identity provider unavailable".to_string()));
        }
        if email.is_empty() {
            return Err(IdentityError::InvalidParameter("username is empty".to_string()));
        }

        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        if !users.insert(email.to_string()) {
            return Err(IdentityError::UsernameExists);
        }
        Ok(CreatedUser {
            username: email.to_string(),
        })
    }
}
