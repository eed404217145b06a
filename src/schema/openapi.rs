//! OpenAPI generation from registered schemas.

use crate::config::AppConfig;
use crate::schema::{builtin, ApiObject, SchemaKind};
use crate::service::{Service, ServiceContext};
use axum::http::{Method, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, PathItem, PathItemBuilder};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    ResponseBuilder,
};

pub const HEALTH_CHECK_TAG: &str = "Health Check";
pub const LIVENESS_PATH: &str = "/-/alive";
pub const READINESS_PATH: &str = "/-/ready";

type Components = BTreeMap<String, RefOr<Schema>>;

impl ApiObject {
    /// OpenAPI form of this schema. Referenced sub-schemas are collected into `components`.
    pub fn to_openapi(&self, components: &mut Components) -> RefOr<Schema> {
        let inline = self.inline_openapi(components);
        match &self.reference_name {
            Some(name) => {
                components.insert(name.clone(), inline);
                RefOr::Ref(Ref::from_schema_name(name.clone()))
            }
            None => inline,
        }
    }

    fn inline_openapi(&self, components: &mut Components) -> RefOr<Schema> {
        if let SchemaKind::Array { items } = &self.kind {
            let array = ArrayBuilder::new()
                .items(items.to_openapi(components))
                .description(self.description.clone())
                .build();
            return RefOr::T(Schema::Array(array));
        }
        let schema_type = match &self.kind {
            SchemaKind::String => Type::String,
            SchemaKind::Number => Type::Number,
            SchemaKind::Integer => Type::Integer,
            SchemaKind::Boolean => Type::Boolean,
            _ => Type::Object,
        };
        let mut builder = ObjectBuilder::new()
            .schema_type(schema_type)
            .description(self.description.clone())
            .enum_values(self.enumeration.clone())
            .minimum(self.minimum)
            .maximum(self.maximum);
        match &self.kind {
            SchemaKind::Object { properties, .. } => {
                for (name, prop) in properties {
                    builder = builder.property(name.clone(), prop.to_openapi(components));
                }
                for name in self.required_names() {
                    builder = builder.required(name);
                }
            }
            SchemaKind::Map { values } => {
                builder = builder.additional_properties(Some(values.to_openapi(components)));
            }
            _ => {}
        }
        RefOr::T(Schema::Object(builder.build()))
    }
}

fn http_method(method: &Method) -> Option<HttpMethod> {
    Some(match *method {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::PATCH => HttpMethod::Patch,
        Method::DELETE => HttpMethod::Delete,
        Method::HEAD => HttpMethod::Head,
        Method::OPTIONS => HttpMethod::Options,
        Method::TRACE => HttpMethod::Trace,
        _ => return None,
    })
}

fn json_response(description: &str, schema: RefOr<Schema>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content("application/json", ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn status_description(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Response").to_string()
}

fn service_path_item(ctx: &ServiceContext, components: &mut Components) -> Option<PathItem> {
    let mut item = PathItemBuilder::new();
    let mut any = false;
    for method in ctx.documented_methods() {
        let Some(http) = http_method(&method) else {
            continue;
        };
        let mut op = OperationBuilder::new()
            .tags(Some(vec![ctx.name().to_string()]))
            .operation_id(Some(format!("{}_{}", method.as_str().to_lowercase(), ctx.id().trim_matches('/').replace('/', "_"))));
        if let Some(req) = ctx.request_schema(&method) {
            let body = RequestBodyBuilder::new()
                .description(req.description.clone())
                .content("application/json", ContentBuilder::new().schema(Some(req.schema.to_openapi(components))).build())
                .required(Some(Required::True))
                .build();
            op = op.request_body(Some(body));
        }
        for resp in ctx.response_schemas(&method) {
            let description = resp.description.clone().unwrap_or_else(|| status_description(resp.status));
            op = op.response(
                resp.status.as_u16().to_string(),
                json_response(&description, resp.schema.to_openapi(components)),
            );
        }
        item = item.operation(http, op.build());
        any = true;
    }
    any.then(|| item.build())
}

fn health_path_item(components: &mut Components) -> PathItem {
    let op = OperationBuilder::new()
        .tags(Some(vec![HEALTH_CHECK_TAG.to_string()]))
        .response("200", json_response("OK", builtin::health_check().to_openapi(components)))
        .build();
    PathItemBuilder::new().operation(HttpMethod::Get, op).build()
}

/// Build the OpenAPI document for the app and its services.
pub fn build_openapi(config: &AppConfig, services: &[Arc<dyn Service>]) -> OpenApi {
    let mut components = Components::new();
    let mut paths = PathsBuilder::new()
        .path(LIVENESS_PATH, health_path_item(&mut components))
        .path(READINESS_PATH, health_path_item(&mut components));
    for service in services {
        let ctx = service.context();
        if let Some(item) = service_path_item(ctx, &mut components) {
            paths = paths.path(ctx.endpoint(), item);
        }
    }
    let info = InfoBuilder::new()
        .title(config.name.clone())
        .version(config.version.clone().unwrap_or_else(|| "0.0.0".into()))
        .description(config.description.clone())
        .build();
    let mut schemas = ComponentsBuilder::new();
    for (name, schema) in components {
        schemas = schemas.schema(name, schema);
    }
    OpenApiBuilder::new()
        .info(info)
        .paths(paths.build())
        .components(Some(schemas.build()))
        .build()
}

/// Swagger UI page pointed at the JSON document.
pub fn docs_html(title: &str, docs_json_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##,
        title = title,
        url = docs_json_url
    )
}
