//! Router for the question bank: list, fetch, create, update and delete.

use crate::dtos::{ApiRequest, ApiResponse};
use crate::models::{NewQuestion, QuestionPatch};
use crate::services::{AccessPolicy, CallerIdentity, Metrics, QuestionRepository};
use axum::http::StatusCode;
use futures::FutureExt;
use serde_json::json;
use service_core::error::AppError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

const COLLECTION_PATH: &str = "/questions";
const ITEM_PATH_TEMPLATE: &str = "/questions/{id}";
const FALLBACK_TEMPLATE: &str = "fallback";

/// Body of the response to unmatched routes; doubles as a liveness check.
pub const FALLBACK_MESSAGE: &str = "Hello from Lambda!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    List,
    Create,
    Get(&'a str),
    Update(&'a str),
    Delete(&'a str),
    Fallback,
}

impl<'a> Route<'a> {
    pub fn resolve(method: &str, path: &'a str) -> Self {
        let method = method.to_ascii_uppercase();

        if path == COLLECTION_PATH {
            return match method.as_str() {
                "GET" => Route::List,
                "POST" => Route::Create,
                _ => Route::Fallback,
            };
        }

        let id = match path
            .strip_prefix(COLLECTION_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(id) if !id.is_empty() && !id.contains('/') => id,
            _ => return Route::Fallback,
        };

        match method.as_str() {
            "GET" => Route::Get(id),
            "PUT" => Route::Update(id),
            "DELETE" => Route::Delete(id),
            _ => Route::Fallback,
        }
    }

    /// Path template for metric labels; ids never appear in it.
    pub fn template(&self) -> &'static str {
        match self {
            Route::List | Route::Create => COLLECTION_PATH,
            Route::Get(_) | Route::Update(_) | Route::Delete(_) => ITEM_PATH_TEMPLATE,
            Route::Fallback => FALLBACK_TEMPLATE,
        }
    }

    /// Operation name used in logs and the latency metric.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Route::List => Some("list_questions"),
            Route::Create => Some("create_question"),
            Route::Get(_) => Some("get_question"),
            Route::Update(_) => Some("update_question"),
            Route::Delete(_) => Some("delete_question"),
            Route::Fallback => None,
        }
    }
}

#[derive(Clone)]
pub struct QuestionsHandler {
    repository: QuestionRepository,
    policy: Arc<dyn AccessPolicy>,
    metrics: Metrics,
}

impl QuestionsHandler {
    pub fn new(
        repository: QuestionRepository,
        policy: Arc<dyn AccessPolicy>,
        metrics: Metrics,
    ) -> Self {
        Self {
            repository,
            policy,
            metrics,
        }
    }

    /// Handle one request. Never fails: every error, including a panic,
    /// becomes a response.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let start = Instant::now();
        let route = Route::resolve(&request.http_method, &request.path);
        let request_id = request.request_id().unwrap_or("-").to_string();

        tracing::info!(
            request_id = %request_id,
            method = %request.http_method,
            path = %request.path,
            "Incoming request"
        );

        let outcome = AssertUnwindSafe(self.dispatch(route, &request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_error(panic)));

        if let Some(operation) = route.operation() {
            self.metrics
                .api_latency(start.elapsed().as_secs_f64() * 1000.0, operation);
        }

        match outcome {
            Ok(response) => response,
            Err(err) => {
                log_error(&err, &request_id, route.operation().unwrap_or("fallback"));
                ApiResponse::from_error(&err)
            }
        }
    }

    async fn dispatch(&self, route: Route<'_>, request: &ApiRequest) -> Result<ApiResponse, AppError> {
        match route {
            Route::List => {
                let questions = self.repository.list_all().await?;
                self.metrics.questions_retrieved(questions.len());
                Ok(ApiResponse::json(StatusCode::OK, &questions))
            }
            Route::Get(id) => match self.repository.get(id).await? {
                Some(question) => {
                    self.metrics.question_viewed(question.category_name());
                    Ok(ApiResponse::json(StatusCode::OK, &question))
                }
                None => {
                    self.metrics.question_not_found();
                    Err(AppError::not_found())
                }
            },
            Route::Create => {
                self.authorize(request, "create_question")?;
                let input: NewQuestion = request.json_body()?;
                let question = self.repository.create(input).await?;
                Ok(ApiResponse::json(StatusCode::CREATED, &question))
            }
            Route::Update(id) => {
                self.authorize(request, "update_question")?;
                let patch: QuestionPatch = request.json_body()?;
                let question = self.repository.update(id, patch).await?;
                Ok(ApiResponse::json(StatusCode::OK, &question))
            }
            Route::Delete(id) => {
                self.authorize(request, "delete_question")?;
                self.repository.delete(id).await?;
                Ok(ApiResponse::no_content())
            }
            Route::Fallback => Ok(ApiResponse::json(
                StatusCode::OK,
                &json!({ "message": FALLBACK_MESSAGE }),
            )),
        }
    }

    fn authorize(&self, request: &ApiRequest, operation: &str) -> Result<(), AppError> {
        let identity = CallerIdentity::from_claims(request.claims());
        match self.policy.require_admin(&identity, operation) {
            None => Ok(()),
            Some(denial) => Err(denial.into()),
        }
    }
}

pub(crate) fn panic_error(panic: Box<dyn std::any::Any + Send>) -> AppError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    AppError::InternalError(anyhow::anyhow!(message))
}

pub(crate) fn log_error(err: &AppError, request_id: &str, operation: &str) {
    if err.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            operation = %operation,
            error_kind = err.kind(),
            error = %err,
            "Request failed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            operation = %operation,
            error_kind = err.kind(),
            error = %err,
            "Request rejected"
        );
    }
}
