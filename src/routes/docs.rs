//! Documentation routes.

use super::path_variants;
use crate::config::AppConfig;
use crate::handlers::{docs_json, docs_page, DocsState};
use crate::schema::openapi::docs_html;
use axum::{routing::get, Router};
use serde_json::Value;
use std::sync::Arc;

/// GET `docs_url` (Swagger UI) and GET `docs_json_url` (OpenAPI document).
pub fn docs_routes(config: &AppConfig, document: Value) -> Router {
    let state = DocsState {
        document: Arc::new(document),
        page: docs_html(&config.name, &config.docs_json_url).into(),
    };
    let mut router = Router::new();
    for path in path_variants(&config.docs_url) {
        router = router.route(&path, get(docs_page));
    }
    for path in path_variants(&config.docs_json_url) {
        router = router.route(&path, get(docs_json));
    }
    router.with_state(state)
}
