//! Typed errors and HTTP mapping.

use crate::response::ModelContext;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {field}: '{value}'")]
    InvalidSegment { field: &'static str, value: String },
    #[error("a service has already been added using id={0}")]
    DuplicateEndpoint(String),
    #[error("invalid meta: {0}")]
    InvalidMeta(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("unsupported method for routing: {0}")]
    InvalidMethod(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method {0} is not allowed on this endpoint")]
    MethodNotAllowed(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Request payload does not follow the registered schema.
    #[error("Schema validation failed: {message}")]
    Validation { message: String, path: Option<String> },
    /// Payload is well formed but cannot be predicted on.
    #[error("invalid model input: {0}")]
    InvalidInput(String),
    #[error("prediction: {0}")]
    Prediction(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_model_input"),
            AppError::Prediction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "prediction_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }

    /// Build the JSON error body, honoring what the context allows to be returned.
    pub fn to_body(&self, ctx: &ErrorContext) -> ErrorBody {
        let (_, code) = self.status_and_code();
        let mut details = serde_json::Map::new();
        if let AppError::Validation { path: Some(path), .. } = self {
            details.insert("path".into(), Value::String(path.clone()));
        }
        if let Some(user_data) = &ctx.user_data {
            details.insert("user_data".into(), user_data.clone());
        }
        ErrorBody {
            request_id: ctx.request_id.clone(),
            model_context: ctx.model_context.clone(),
            error: ErrorDetail {
                code: code.to_string(),
                message: ctx.include_message.then(|| self.to_string()),
                details: (!details.is_empty()).then_some(Value::Object(details)),
            },
        }
    }

    pub fn into_response_with(self, ctx: &ErrorContext) -> Response {
        let body = self.to_body(ctx);
        (self.status(), Json(body)).into_response()
    }
}

/// Request-scoped information attached to an error response.
#[derive(Clone, Debug)]
pub struct ErrorContext {
    pub request_id: Option<String>,
    pub model_context: Option<ModelContext>,
    pub user_data: Option<Value>,
    pub include_message: bool,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            model_context: None,
            user_data: None,
            include_message: true,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_context: Option<ModelContext>,
    pub error: ErrorDetail,
}

#[derive(Serialize, Debug)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(&ErrorContext::default())
    }
}
