//! Model-inference provider abstractions.
//!
//! Answer grading talks to a [`TextProvider`]; the Gemini implementation is
//! used in deployments and the mock one in tests and local runs.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiConfig, GeminiTextProvider};
pub use mock::MockTextProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Empty response from provider")]
    EmptyResponse,
}

impl ProviderError {
    /// Stable name used as a metrics dimension.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "NotConfigured",
            ProviderError::ApiError(_) => "ApiError",
            ProviderError::RateLimited => "RateLimited",
            ProviderError::ContentFiltered => "ContentFiltered",
            ProviderError::NetworkError(_) => "NetworkError",
            ProviderError::EmptyResponse => "EmptyResponse",
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    /// Request trace correlation for the outgoing call.
    pub request_id: Option<String>,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}
