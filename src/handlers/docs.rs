//! OpenAPI document and Swagger UI page.

use axum::{extract::State, response::Html, Json};
use serde_json::Value;
use std::sync::Arc;

/// Generated once when the router is built.
#[derive(Clone)]
pub struct DocsState {
    pub document: Arc<Value>,
    pub page: Arc<str>,
}

pub async fn docs_json(State(state): State<DocsState>) -> Json<Value> {
    Json(state.document.as_ref().clone())
}

pub async fn docs_page(State(state): State<DocsState>) -> Html<String> {
    Html(state.page.to_string())
}
