//! Request and response envelopes exchanged with the hosting platform.
//!
//! A request arrives as `{httpMethod, path, body?, requestContext}` where the
//! authorizer attaches the caller's identity claims; a handler answers with
//! `{statusCode, headers, body}` where `body` is JSON text.

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use std::collections::BTreeMap;

pub const CORS_ALLOW_ORIGIN_HEADER: &str = "Access-Control-Allow-Origin";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(alias = "method", default = "default_method")]
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_context: Option<RequestContext>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<Authorizer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}

/// Identity claims asserted by the authorizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "cognito:groups",
        alias = "groups",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub groups: Option<GroupsClaim>,
}

/// Group membership as delivered by the authorizer: one name, a
/// comma-separated list, or an already-structured list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupsClaim {
    List(Vec<String>),
    Single(String),
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_claims(mut self, claims: Claims) -> Self {
        let context = self.request_context.get_or_insert_with(Default::default);
        context.authorizer = Some(Authorizer {
            claims: Some(claims),
        });
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let context = self.request_context.get_or_insert_with(Default::default);
        context.request_id = Some(request_id.into());
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_context
            .as_ref()
            .and_then(|c| c.request_id.as_deref())
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.request_context
            .as_ref()
            .and_then(|c| c.authorizer.as_ref())
            .and_then(|a| a.claims.as_ref())
    }

    /// Decode the JSON body. An absent or blank body decodes as `{}`.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let raw = self
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or("{}");
        serde_json::from_str(raw)
            .map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e)))
    }
}

impl Claims {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Default::default()
        }
    }

    pub fn with_groups(mut self, groups: GroupsClaim) -> Self {
        self.groups = Some(groups);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    fn with_status(status: StatusCode, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CORS_ALLOW_ORIGIN_HEADER.to_string(), "*".to_string());
        Self {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    pub fn json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self::with_status(status, body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::from_error(&AppError::InternalError(anyhow::anyhow!(
                    "Failed to serialize response: {}",
                    e
                )))
            }
        }
    }

    pub fn no_content() -> Self {
        Self::with_status(StatusCode::NO_CONTENT, String::new())
    }

    pub fn from_error(err: &AppError) -> Self {
        Self::with_status(err.status_code(), err.body().to_string())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_json_content_type(self) -> Self {
        self.with_header(CONTENT_TYPE_HEADER, "application/json")
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Parsed JSON body; `Value::Null` for an empty or non-JSON body.
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let has_content_type = self
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE_HEADER));

        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }
        if !has_content_type && !self.body.is_empty() {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        response
    }
}
