//! porter: expose machine-learning models as validated, documented REST services.
//!
//! Register one or more [`Service`]s on a [`ModelApp`] and serve its router with axum.
//! [`PredictionService`] covers the common case of a model predicting on JSON instances.

pub mod app;
pub mod config;
pub mod datascience;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;

pub use app::{ModelApp, ServeError};
pub use config::{AppConfig, ResponseOptions, ServerConfig, ServiceConfig};
pub use datascience::{BoxError, Model, PostProcessor, PreProcessor, Record};
pub use error::{AppError, ConfigError};
pub use extractors::{RequestId, REQUEST_ID_HEADER};
pub use response::ModelContext;
pub use schema::openapi::build_openapi;
pub use schema::{ApiObject, SchemaValidator, SchemaViolation};
pub use service::{
    PredictionService, PredictionServiceBuilder, Service, ServiceContext, ServiceRequest, ServiceStatus,
};
pub use state::AppState;
