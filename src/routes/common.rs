//! Common routes: liveness, readiness, root.

use crate::handlers::{alive, ready, root};
use crate::schema::openapi::{LIVENESS_PATH, READINESS_PATH};
use crate::state::AppState;
use axum::{routing::get, Router};

/// GET /-/alive, GET /-/ready, GET /.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route(LIVENESS_PATH, get(alive))
        .route(READINESS_PATH, get(ready))
        .route("/", get(root))
        .with_state(state)
}
