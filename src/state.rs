//! Shared application state for all routes. Built once by `ModelApp::router` and read-only afterwards.

use crate::config::AppConfig;
use crate::service::Service;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub info: Arc<AppInfo>,
    pub services: Arc<Vec<Arc<dyn Service>>>,
}

pub struct AppInfo {
    pub config: AppConfig,
    /// When the app was built; reported by health checks.
    pub deployed_on: DateTime<Utc>,
}
