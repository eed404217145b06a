//! Per-service state shared by every service kind: identity, routing, schemas and toggles.

use crate::config::{normalize_namespace, validate_meta, validate_segment, ServiceConfig};
use crate::error::{AppError, ConfigError};
use crate::response::ModelContext;
use crate::schema::{builtin, ApiObject, SchemaValidator, SchemaViolation};
use axum::http::{Method, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestSchema {
    pub schema: ApiObject,
    pub description: Option<String>,
    validator: SchemaValidator,
}

pub struct ResponseSchema {
    pub status: StatusCode,
    pub schema: ApiObject,
    pub description: Option<String>,
    validator: SchemaValidator,
}

pub struct ServiceContext {
    name: String,
    api_version: String,
    namespace: String,
    action: String,
    meta: Map<String, Value>,
    endpoint: String,
    log_api_calls: bool,
    validate_request_data: bool,
    validate_response_data: bool,
    request_schemas: HashMap<Method, RequestSchema>,
    response_schemas: HashMap<Method, Vec<ResponseSchema>>,
}

impl ServiceContext {
    /// `default_action` is used when the config does not name one.
    pub fn new(config: ServiceConfig, default_action: &str) -> Result<Self, ConfigError> {
        validate_segment("name", &config.name)?;
        validate_segment("api_version", &config.api_version)?;
        let action = config.action.unwrap_or_else(|| default_action.to_string());
        validate_segment("action", &action)?;
        let namespace = normalize_namespace(&config.namespace)?;
        validate_meta(&config.meta)?;
        if config.validate_response_data {
            tracing::warn!(
                service = %config.name,
                "validate_response_data may significantly impact latency; use only while developing"
            );
        }
        let endpoint = format!("{}/{}/{}/{}/", namespace, config.name, config.api_version, action);
        let mut ctx = Self {
            name: config.name,
            api_version: config.api_version,
            namespace,
            action,
            meta: config.meta,
            endpoint,
            log_api_calls: config.log_api_calls,
            validate_request_data: config.validate_request_data,
            validate_response_data: config.validate_response_data,
            request_schemas: HashMap::new(),
            response_schemas: HashMap::new(),
        };
        // errors porter itself may return from any service
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            ctx.add_response_schema(Method::POST, status, builtin::model_context_error(), None)?;
        }
        Ok(ctx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Unique per app; the endpoint doubles as the id.
    pub fn id(&self) -> &str {
        &self.endpoint
    }

    pub fn log_api_calls(&self) -> bool {
        self.log_api_calls
    }

    pub fn validate_request_data(&self) -> bool {
        self.validate_request_data
    }

    pub fn validate_response_data(&self) -> bool {
        self.validate_response_data
    }

    pub fn model_context(&self) -> ModelContext {
        ModelContext {
            model_name: self.name.clone(),
            api_version: self.api_version.clone(),
            model_meta: self.meta.clone(),
        }
    }

    /// Register (or replace) the request schema for `method`.
    pub fn add_request_schema(
        &mut self,
        method: Method,
        schema: ApiObject,
        description: Option<&str>,
    ) -> Result<(), ConfigError> {
        let validator = SchemaValidator::compile(&schema)?;
        self.request_schemas.insert(
            method,
            RequestSchema {
                schema,
                description: description.map(str::to_string),
                validator,
            },
        );
        Ok(())
    }

    /// Register (or replace) the response schema for `method` and `status`.
    pub fn add_response_schema(
        &mut self,
        method: Method,
        status: StatusCode,
        schema: ApiObject,
        description: Option<&str>,
    ) -> Result<(), ConfigError> {
        let validator = SchemaValidator::compile(&schema)?;
        let entry = ResponseSchema {
            status,
            schema,
            description: description.map(str::to_string),
            validator,
        };
        let list = self.response_schemas.entry(method).or_default();
        list.retain(|r| r.status != status);
        list.push(entry);
        list.sort_by_key(|r| r.status.as_u16());
        Ok(())
    }

    pub fn request_schema(&self, method: &Method) -> Option<&RequestSchema> {
        self.request_schemas.get(method)
    }

    pub fn response_schemas(&self, method: &Method) -> &[ResponseSchema] {
        self.response_schemas.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn response_schema(&self, method: &Method, status: StatusCode) -> Option<&ResponseSchema> {
        self.response_schemas(method).iter().find(|r| r.status == status)
    }

    /// Methods with at least one registered schema.
    pub fn documented_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .request_schemas
            .keys()
            .chain(self.response_schemas.keys())
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        methods
    }

    /// Reject a request body that does not follow the schema for `method`.
    /// No-op unless request validation is enabled and a schema is registered.
    pub fn check_request(&self, method: &Method, body: &Value) -> Result<(), AppError> {
        if !self.validate_request_data {
            return Ok(());
        }
        match self.request_schemas.get(method) {
            Some(s) => s.validator.validate(body).map_err(AppError::from),
            None => Ok(()),
        }
    }

    /// Violation of the response schema for `method`/`status`, if response validation is enabled.
    pub fn check_response(&self, method: &Method, status: StatusCode, payload: &Value) -> Option<SchemaViolation> {
        if !self.validate_response_data {
            return None;
        }
        self.response_schema(method, status)
            .and_then(|s| s.validator.validate(payload).err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_from_parts() {
        let ctx = ServiceContext::new(ServiceConfig::new("a-model", "v1"), "prediction").unwrap();
        assert_eq!(ctx.endpoint(), "/a-model/v1/prediction/");
        assert_eq!(ctx.id(), ctx.endpoint());

        let ctx = ServiceContext::new(
            ServiceConfig::new("user-ratings", "v2").namespace("datascience/").action("score"),
            "prediction",
        )
        .unwrap();
        assert_eq!(ctx.endpoint(), "/datascience/user-ratings/v2/score/");
        assert_eq!(ctx.namespace(), "/datascience");
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ServiceContext::new(ServiceConfig::new("", "v1"), "prediction").is_err());
        assert!(ServiceContext::new(ServiceConfig::new("m", "v 1"), "prediction").is_err());
        let meta = json!({"version": 2}).as_object().cloned().unwrap();
        assert!(ServiceContext::new(ServiceConfig::new("m", "v1").meta(meta), "prediction").is_err());
    }

    #[test]
    fn default_error_schemas_registered() {
        let ctx = ServiceContext::new(ServiceConfig::new("m", "v1"), "prediction").unwrap();
        let statuses: Vec<u16> = ctx.response_schemas(&Method::POST).iter().map(|r| r.status.as_u16()).collect();
        assert_eq!(statuses, [400, 422, 500]);
        assert_eq!(ctx.documented_methods(), vec![Method::POST]);
    }

    #[test]
    fn request_check_respects_toggle() {
        let schema = ApiObject::object([("x", ApiObject::number())]);
        let mut off = ServiceContext::new(ServiceConfig::new("m", "v1"), "prediction").unwrap();
        off.add_request_schema(Method::POST, schema.clone(), None).unwrap();
        assert!(off.check_request(&Method::POST, &json!({})).is_ok());

        let mut on =
            ServiceContext::new(ServiceConfig::new("m", "v1").validate_request_data(true), "prediction").unwrap();
        on.add_request_schema(Method::POST, schema, None).unwrap();
        assert!(on.check_request(&Method::POST, &json!({"x": 1.5})).is_ok());
        let err = on.check_request(&Method::POST, &json!({})).unwrap_err();
        assert!(err.to_string().contains("\"x\""));
        // no schema for GET
        assert!(on.check_request(&Method::GET, &json!({})).is_ok());
    }

    #[test]
    fn response_check_reports_violation() {
        let mut ctx =
            ServiceContext::new(ServiceConfig::new("m", "v1").validate_response_data(true), "prediction").unwrap();
        ctx.add_response_schema(Method::POST, StatusCode::OK, ApiObject::object([("y", ApiObject::number())]), None)
            .unwrap();
        assert!(ctx.check_response(&Method::POST, StatusCode::OK, &json!({"y": 1})).is_none());
        let v = ctx.check_response(&Method::POST, StatusCode::OK, &json!({"y": "no"})).unwrap();
        assert_eq!(v.path, "/y");
    }
}
