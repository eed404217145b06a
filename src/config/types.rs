//! Programmatic configuration for apps and services.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_DOCS_URL: &str = "/docs/";
pub const DEFAULT_DOCS_JSON_URL: &str = "/_docs.json";
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// What is included in response bodies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOptions {
    #[serde(default = "default_true")]
    pub return_request_id: bool,
    #[serde(default = "default_true")]
    pub return_message_on_error: bool,
    /// Echo the request body back in error responses. Useful while debugging clients.
    #[serde(default)]
    pub return_user_data_on_error: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            return_request_id: true,
            return_message_on_error: true,
            return_user_data_on_error: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// App-level settings. Metadata shows up in health checks and in the generated docs.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub meta: Map<String, Value>,
    pub expose_docs: bool,
    pub docs_url: String,
    pub docs_json_url: String,
    pub response: ResponseOptions,
    pub body_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            description: None,
            version: None,
            meta: Map::new(),
            expose_docs: false,
            docs_url: DEFAULT_DOCS_URL.to_string(),
            docs_json_url: DEFAULT_DOCS_JSON_URL.to_string(),
            response: ResponseOptions::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    pub fn expose_docs(mut self, expose: bool) -> Self {
        self.expose_docs = expose;
        self
    }

    pub fn docs_url(mut self, url: impl Into<String>) -> Self {
        self.docs_url = url.into();
        self
    }

    pub fn docs_json_url(mut self, url: impl Into<String>) -> Self {
        self.docs_json_url = url.into();
        self
    }

    pub fn response_options(mut self, options: ResponseOptions) -> Self {
        self.response = options;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

/// Settings shared by every service. The routed endpoint is
/// `{namespace}/{name}/{api_version}/{action}/`.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub name: String,
    pub api_version: String,
    pub namespace: String,
    pub action: Option<String>,
    /// Extra metadata returned in `model_context`. Values must be strings.
    pub meta: Map<String, Value>,
    pub log_api_calls: bool,
    pub validate_request_data: bool,
    /// Debug only: mismatches are logged, never returned to the client.
    pub validate_response_data: bool,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_version: api_version.into(),
            namespace: String::new(),
            action: None,
            meta: Map::new(),
            log_api_calls: false,
            validate_request_data: false,
            validate_response_data: false,
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    pub fn log_api_calls(mut self, enabled: bool) -> Self {
        self.log_api_calls = enabled;
        self
    }

    pub fn validate_request_data(mut self, enabled: bool) -> Self {
        self.validate_request_data = enabled;
        self
    }

    pub fn validate_response_data(mut self, enabled: bool) -> Self {
        self.validate_response_data = enabled;
        self
    }
}

/// Where the server binds. Read from the environment by `ServerConfig::from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
