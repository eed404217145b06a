//! Liveness, readiness, root and fallback handlers.

use crate::error::AppError;
use crate::response::{app_state_body, AppStateBody};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Json,
};

pub const ROOT_MESSAGE: &str = "Send POST requests to /<namespace>/<model-name>/<api-version>/<action>/";

pub async fn alive(State(state): State<AppState>) -> Json<AppStateBody> {
    let body = app_state_body(&state);
    tracing::debug!(?body, "liveness check");
    Json(body)
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<AppStateBody>) {
    let body = app_state_body(&state);
    let status = if body.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    tracing::debug!(?body, status = status.as_u16(), "readiness check");
    (status, Json(body))
}

pub async fn root(State(state): State<AppState>) -> Response {
    let config = &state.info.config;
    if config.expose_docs {
        Redirect::to(&config.docs_url).into_response()
    } else {
        ROOT_MESSAGE.into_response()
    }
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
