//! Grades a candidate's free-text answer with the interview-coach model.

use super::questions::{log_error, panic_error};
use crate::dtos::{ApiRequest, ApiResponse, EvaluationRequest, Feedback};
use crate::services::providers::{GenerationParams, TextProvider};
use crate::services::Metrics;
use axum::http::StatusCode;
use futures::FutureExt;
use serde_json::Value;
use service_core::error::AppError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_TOKENS: i32 = 1000;

#[derive(Clone)]
pub struct EvaluationHandler {
    provider: Arc<dyn TextProvider>,
    metrics: Metrics,
    max_tokens: i32,
}

impl EvaluationHandler {
    pub fn new(provider: Arc<dyn TextProvider>, metrics: Metrics) -> Self {
        Self {
            provider,
            metrics,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let request_id = request.request_id().unwrap_or("-").to_string();

        let outcome = AssertUnwindSafe(self.evaluate(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic)));

        match outcome {
            Ok(feedback) => ApiResponse::json(StatusCode::OK, &feedback),
            Err(err) => {
                if err.is_server_error() {
                    self.metrics.evaluation_failure(err.kind());
                }
                log_error(&err, &request_id, "evaluate_answer");
                ApiResponse::from_error(&err)
            }
        }
    }

    async fn evaluate(&self, request: &ApiRequest) -> Result<Value, AppError> {
        let body: EvaluationRequest = request.json_body()?;
        let (question, answer) = match (body.question.as_deref(), body.answer.as_deref()) {
            (Some(q), Some(a)) if !q.trim().is_empty() && !a.trim().is_empty() => (q, a),
            _ => return Err(AppError::validation("Missing question or answer")),
        };
        let competency = body.competency();

        let params = GenerationParams {
            max_tokens: Some(self.max_tokens),
            request_id: request.request_id().map(str::to_string),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .provider
            .generate(&build_prompt(question, answer, competency), &params)
            .await
            .map_err(|e| {
                tracing::error!(error_type = e.error_type(), error = %e, "Model invocation failed");
                AppError::dependency(e)
            })?;
        self.metrics
            .ai_response_time(start.elapsed().as_secs_f64() * 1000.0);

        tracing::debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Model responded"
        );

        let feedback: Value = serde_json::from_str(strip_code_fence(&response.text))
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid feedback JSON: {}", e)))?;
        if !feedback.is_object() {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Invalid feedback JSON: expected an object"
            )));
        }

        match serde_json::from_value::<Feedback>(feedback.clone()) {
            Ok(graded) => {
                self.metrics
                    .answer_evaluated(graded.score, competency, graded.is_correct);
                self.metrics.user_engagement(graded.score);
            }
            Err(e) => tracing::warn!(error = %e, "Feedback missing expected fields"),
        }
        self.metrics.evaluation_success();

        Ok(feedback)
    }
}

pub fn build_prompt(question: &str, answer: &str, competency: &str) -> String {
    format!(
        r#"You are Marcus, an AI interview coach for AWS.
You evaluate candidate answers for L4 Systems Engineer and
Systems Development Engineer roles.

Evaluate this candidate's answer:

Question: {question}
Candidate's Answer: {answer}
Competency: {competency}

Respond ONLY with valid JSON in this exact format:
{{
  "is_correct": true/false,
  "score": 0-100,
  "strengths": ["point1", "point2"],
  "improvements": ["point1", "point2"],
  "suggestions": ["point1", "point2"],
  "marcus_comment": "Your encouraging message here"
}}

Be constructive, specific, and encouraging."#
    )
}

/// Remove a surrounding markdown fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if !text.starts_with("```") {
        return text;
    }
    let inner = text.trim_matches('`').trim();
    inner.strip_prefix("json").map(str::trim).unwrap_or(inner)
}
