//! `ModelApp`: registers services and builds the axum router.

use crate::config::{validate_meta, validate_url_path, AppConfig};
use crate::error::ConfigError;
use crate::handlers::not_found;
use crate::routes::{common_routes, docs_routes, path_variants, service_routes};
use crate::schema::openapi::{build_openapi, LIVENESS_PATH, READINESS_PATH};
use crate::service::Service;
use crate::state::{AppInfo, AppState};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::OpenApi;

pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

pub struct ModelApp {
    config: AppConfig,
    services: Vec<Arc<dyn Service>>,
}

impl ModelApp {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        validate_meta(&config.meta)?;
        validate_url_path("docs_url", &config.docs_url)?;
        validate_url_path("docs_json_url", &config.docs_json_url)?;
        if path_variants(&config.docs_url)
            .iter()
            .any(|p| path_variants(&config.docs_json_url).contains(p))
        {
            return Err(ConfigError::Validation(format!(
                "docs_url and docs_json_url must differ: {}",
                config.docs_url
            )));
        }
        if config.expose_docs {
            let builtin = [LIVENESS_PATH, READINESS_PATH, "/"];
            for (field, url) in [("docs_url", &config.docs_url), ("docs_json_url", &config.docs_json_url)] {
                if let Some(path) = path_variants(url).into_iter().find(|p| builtin.contains(&p.as_str())) {
                    return Err(ConfigError::Validation(format!(
                        "{} collides with reserved path {}",
                        field, path
                    )));
                }
            }
        }
        Ok(Self {
            config,
            services: Vec::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn services(&self) -> &[Arc<dyn Service>] {
        &self.services
    }

    pub fn add_service<S: Service>(&mut self, service: S) -> Result<&mut Self, ConfigError> {
        self.add_shared(Arc::new(service))
    }

    /// Register a service that is already behind an `Arc`.
    pub fn add_shared(&mut self, service: Arc<dyn Service>) -> Result<&mut Self, ConfigError> {
        let id = service.context().id().to_string();
        if self.services.iter().any(|s| s.context().id() == id) {
            return Err(ConfigError::DuplicateEndpoint(id));
        }
        let taken = self.reserved_paths();
        if let Some(path) = path_variants(&id).into_iter().find(|p| taken.contains(p)) {
            return Err(ConfigError::Validation(format!(
                "service endpoint {} collides with reserved path {}",
                id, path
            )));
        }
        if service.methods().is_empty() {
            return Err(ConfigError::InvalidMethod(format!("service {} accepts no methods", id)));
        }
        tracing::info!(service = %service.context().name(), endpoint = %id, "service added");
        self.services.push(service);
        Ok(self)
    }

    /// Register several services, stopping at the first error.
    pub fn add_services<I>(&mut self, services: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn Service>>,
    {
        for service in services {
            self.add_shared(service)?;
        }
        Ok(self)
    }

    fn reserved_paths(&self) -> HashSet<String> {
        let mut paths: HashSet<String> = [LIVENESS_PATH, READINESS_PATH, "/"]
            .into_iter()
            .map(String::from)
            .collect();
        if self.config.expose_docs {
            paths.extend(path_variants(&self.config.docs_url));
            paths.extend(path_variants(&self.config.docs_json_url));
        }
        paths
    }

    /// OpenAPI document for the services registered so far.
    pub fn openapi(&self) -> OpenApi {
        build_openapi(&self.config, &self.services)
    }

    /// Build the router. Docs are generated here so every registered service is included.
    pub fn router(&self) -> Result<Router, ConfigError> {
        let state = AppState {
            info: Arc::new(AppInfo {
                config: self.config.clone(),
                deployed_on: Utc::now(),
            }),
            services: Arc::new(self.services.clone()),
        };
        let options = Arc::new(self.config.response.clone());
        let mut router = common_routes(state);
        for service in &self.services {
            router = router.merge(service_routes(Arc::clone(service), Arc::clone(&options))?);
        }
        if self.config.expose_docs {
            let document = serde_json::to_value(self.openapi())
                .map_err(|e| ConfigError::Validation(format!("openapi document: {}", e)))?;
            router = router.merge(docs_routes(&self.config, document));
        }
        Ok(router
            .fallback(not_found)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.body_limit))
            .layer(TraceLayer::new_for_http()))
    }

    /// Serve on an already bound listener until the process is stopped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServeError> {
        let router = self.router()?;
        tracing::info!(app = %self.config.name, "listening on {}", listener.local_addr()?);
        axum::serve(listener, router).await?;
        Ok(())
    }

    pub async fn run(&self, addr: impl ToSocketAddrs) -> Result<(), ServeError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::datascience::{BoxError, Record};
    use crate::service::PredictionService;
    use serde_json::Value;

    fn service(name: &str) -> PredictionService {
        let model = |records: &[Record]| -> Result<Vec<Value>, BoxError> { Ok(vec![Value::from(1); records.len()]) };
        PredictionService::builder(ServiceConfig::new(name, "v1"), model)
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_endpoint_rejected() {
        let mut app = ModelApp::new(AppConfig::new("test")).unwrap();
        app.add_service(service("a")).unwrap();
        let err = app.add_service(service("a")).err().unwrap();
        assert!(matches!(err, ConfigError::DuplicateEndpoint(ref id) if id == "/a/v1/prediction/"));
        assert_eq!(app.services().len(), 1);
    }

    #[test]
    fn reserved_paths_rejected() {
        let mut app = ModelApp::new(AppConfig::new("test").expose_docs(true).docs_url("/a/v1/prediction/")).unwrap();
        assert!(app.add_service(service("a")).is_err());
    }

    #[test]
    fn docs_urls_must_differ() {
        assert!(ModelApp::new(AppConfig::new("test").docs_url("/d/").docs_json_url("/d")).is_err());
        assert!(ModelApp::new(AppConfig::new("test").docs_url("docs")).is_err());
    }

    #[test]
    fn docs_urls_cannot_shadow_builtin_routes() {
        for url in ["/-/alive", "/-/ready/", "/"] {
            let err = ModelApp::new(AppConfig::new("test").expose_docs(true).docs_url(url)).err().unwrap();
            assert!(err.to_string().contains("reserved path"), "{}", url);
        }
        assert!(ModelApp::new(AppConfig::new("test").expose_docs(true).docs_json_url("/-/alive")).is_err());
        // only routed when exposed
        assert!(ModelApp::new(AppConfig::new("test").docs_url("/")).is_ok());
        assert!(ModelApp::new(AppConfig::new("test").expose_docs(true).docs_url("/docs/:page")).is_err());
    }

    #[test]
    fn docs_router_builds_with_custom_urls() {
        let mut app = ModelApp::new(
            AppConfig::new("test").expose_docs(true).docs_url("/api/docs").docs_json_url("/api/openapi.json"),
        )
        .unwrap();
        app.add_service(service("a")).unwrap();
        assert!(app.router().is_ok());
    }

    #[test]
    fn app_meta_values_are_strings() {
        let meta = serde_json::json!({"team": 1}).as_object().cloned().unwrap();
        assert!(ModelApp::new(AppConfig::new("test").meta(meta)).is_err());
    }
}
