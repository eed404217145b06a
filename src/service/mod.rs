//! Services: named, versioned endpoints registered on a `ModelApp`.

mod context;
mod prediction;

pub use context::{RequestSchema, ResponseSchema, ServiceContext};
pub use prediction::{AdditionalChecks, PredictionService, PredictionServiceBuilder, LIVE_MESSAGE};

use crate::error::AppError;
use async_trait::async_trait;
use axum::http::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Ready,
    NotReady,
}

/// What a service sees of an HTTP request. The body has already been parsed and,
/// when enabled, validated against the request schema for `method`.
#[derive(Clone, Debug)]
pub struct ServiceRequest {
    pub method: Method,
    pub request_id: String,
    pub body: Option<Value>,
}

#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn context(&self) -> &ServiceContext;

    fn status(&self) -> ServiceStatus {
        ServiceStatus::Ready
    }

    /// HTTP methods routed to `serve`.
    fn methods(&self) -> Vec<Method> {
        vec![Method::POST]
    }

    /// Produce the response payload. JSON objects are augmented with
    /// `request_id` and `model_context` before being returned.
    async fn serve(self: Arc<Self>, request: ServiceRequest) -> Result<Value, AppError>;
}
