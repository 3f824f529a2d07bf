//! Self-service account creation.

use super::questions::{log_error, panic_error};
use crate::dtos::{ApiRequest, ApiResponse, SignupRequest, SignupResponse};
use crate::services::{IdentityError, IdentityProvider};
use axum::http::StatusCode;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use service_core::error::AppError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.+-]+@[\w.-]+\.[A-Za-z]{2,}$").expect("email pattern is valid")
});

pub const SIGNUP_SUCCESS_MESSAGE: &str =
    "Account created! Check your email for a temporary password. You must change it on first login.";
pub const SIGNUP_FAILURE_MESSAGE: &str = "Failed to create account. Please try again later.";

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[derive(Clone)]
pub struct SignupHandler {
    identity: Arc<dyn IdentityProvider>,
}

impl SignupHandler {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let request_id = request.request_id().unwrap_or("-").to_string();

        let outcome = AssertUnwindSafe(self.sign_up(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic)));

        let response = match outcome {
            Ok(created) => ApiResponse::json(StatusCode::OK, &created),
            Err(err) => {
                log_error(&err, &request_id, "signup");
                ApiResponse::from_error(&err)
            }
        };
        response.with_json_content_type()
    }

    async fn sign_up(&self, request: &ApiRequest) -> Result<SignupResponse, AppError> {
        let body: SignupRequest = request.json_body()?;
        let email = body.normalized_email();

        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email format"));
        }

        match self
            .identity
            .admin_create_user(&email, request.request_id())
            .await
        {
            Ok(user) => {
                tracing::info!(username = %user.username, "Account created");
                Ok(SignupResponse {
                    message: SIGNUP_SUCCESS_MESSAGE.to_string(),
                    username: user.username,
                })
            }
            Err(IdentityError::UsernameExists) => {
                Err(AppError::validation("User already exists"))
            }
            Err(IdentityError::InvalidParameter(detail)) => {
                tracing::warn!(detail = %detail, "Identity provider rejected parameters");
                Err(AppError::validation("Invalid parameters provided"))
            }
            Err(IdentityError::Other(detail)) => {
                // Caller only sees the generic message.
                tracing::error!(detail = %detail, "Account creation failed");
                Err(AppError::InternalError(anyhow::anyhow!(
                    SIGNUP_FAILURE_MESSAGE
                )))
            }
        }
    }
}
