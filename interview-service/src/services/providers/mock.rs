//! Mock text provider for tests and local runs.

use super::{FinishReason, GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;

const DEFAULT_FEEDBACK: &str = r#"{"is_correct": true, "score": 75, "strengths": ["Clear structure"], "improvements": ["Add a concrete example"], "suggestions": ["Mention trade-offs"], "marcus_comment": "Solid answer, keep going!"}"#;

enum Behavior {
    Respond(String),
    Fail,
}

/// Returns a canned completion and remembers the prompts it was given.
pub struct MockTextProvider {
    behavior: Behavior,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    pub fn new() -> Self {
        Self::with_response(DEFAULT_FEEDBACK)
    }

    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Respond(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an API error.
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        match &self.behavior {
            Behavior::Respond(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.len() as i32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            Behavior::Fail => Err(ProviderError::ApiError(
                "Mock provider configured to fail".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.behavior {
            Behavior::Respond(_) => Ok(()),
            Behavior::Fail => Err(ProviderError::NotConfigured(
                "Mock provider configured to fail".to_string(),
            )),
        }
    }
}
