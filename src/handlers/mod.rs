//! HTTP handlers for health checks, service dispatch and documentation.

pub mod docs;
pub mod health;
pub mod service;

pub use docs::{docs_json, docs_page, DocsState};
pub use health::{alive, not_found, ready, root, ROOT_MESSAGE};
pub use service::{method_not_allowed, serve_request, ServiceState};
