use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Dependency error: {0:#}")]
    DependencyError(anyhow::Error),

    #[error("{0:#}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0:#}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError(message.into())
    }

    pub fn not_found() -> Self {
        AppError::NotFound("Not found".to_string())
    }

    pub fn dependency(err: impl Into<anyhow::Error>) -> Self {
        AppError::DependencyError(err.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DependencyError(_)
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "ValidationError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Forbidden(_) => "ForbiddenError",
            AppError::DependencyError(_) => "DependencyError",
            AppError::InternalError(_) => "UnexpectedError",
            AppError::ConfigError(_) => "ConfigError",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// JSON body sent to the caller for this error.
    pub fn body(&self) -> Value {
        match self {
            AppError::ValidationError(msg) | AppError::NotFound(msg) => json!({ "error": msg }),
            AppError::Forbidden(msg) => json!({ "error": "Forbidden", "message": msg }),
            AppError::DependencyError(err) | AppError::InternalError(err) => {
                json!({ "error": format!("{:#}", err) })
            }
            AppError::ConfigError(_) => json!({ "error": self.to_string() }),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DependencyError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::validation("Missing required field: category");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(
            err.body(),
            json!({ "error": "Missing required field: category" })
        );
    }

    #[test]
    fn test_not_found_body() {
        let err = AppError::not_found();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.body(), json!({ "error": "Not found" }));
    }

    #[test]
    fn test_forbidden_body_carries_fixed_error() {
        let err = AppError::Forbidden("Admin access required".to_string());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.body()["error"], "Forbidden");
        assert_eq!(err.body()["message"], "Admin access required");
    }

    #[test]
    fn test_dependency_error_surfaces_message() {
        let err = AppError::dependency(anyhow::anyhow!("connection reset"));
        assert!(err.is_server_error());
        assert_eq!(err.kind(), "DependencyError");
        assert_eq!(err.body()["error"], "connection reset");
    }

    #[test]
    fn test_anyhow_converts_to_unexpected() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(err.kind(), "UnexpectedError");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
