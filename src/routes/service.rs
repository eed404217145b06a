//! Routes for a single registered service.

use super::path_variants;
use crate::config::ResponseOptions;
use crate::error::ConfigError;
use crate::handlers::{method_not_allowed, serve_request, ServiceState};
use crate::service::Service;
use axum::http::Method;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use std::sync::Arc;

/// Route every method the service accepts to `serve_request`, with and without the trailing slash.
/// Other methods get a JSON 405.
pub fn service_routes(service: Arc<dyn Service>, options: Arc<ResponseOptions>) -> Result<Router, ConfigError> {
    let endpoint = service.context().endpoint().to_string();
    let mut methods = service.methods();
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods.dedup();
    if methods.is_empty() {
        return Err(ConfigError::InvalidMethod(format!("service {} accepts no methods", endpoint)));
    }
    let has_get = methods.contains(&Method::GET);
    let mut method_router = MethodRouter::<ServiceState>::new();
    for method in methods {
        // GET routes already answer HEAD
        if method == Method::HEAD && has_get {
            continue;
        }
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| ConfigError::InvalidMethod(method.to_string()))?;
        method_router = method_router.on(filter, serve_request);
    }
    let method_router = method_router.fallback(method_not_allowed);
    let mut router = Router::new();
    for path in path_variants(&endpoint) {
        router = router.route(&path, method_router.clone());
    }
    Ok(router.with_state(ServiceState { service, options }))
}
