//! Schemas of the payloads porter itself produces. Used for docs and response validation.

use crate::schema::ApiObject;

pub fn request_id() -> ApiObject {
    ApiObject::string().description("A unique ID for the request.")
}

pub fn model_meta() -> ApiObject {
    ApiObject::map(ApiObject::string()).description("Additional meta data describing the model.")
}

pub fn app_meta() -> ApiObject {
    ApiObject::map(ApiObject::string()).description("Additional meta data describing the app.")
}

pub fn model_context() -> ApiObject {
    ApiObject::object([
        ("model_name", ApiObject::string().description("The name of the model.")),
        ("api_version", ApiObject::string().description("The model API version.")),
        ("model_meta", model_meta()),
    ])
    .description("Information identifying the model that served the request.")
    .reference_name("ModelContext")
}

pub fn error_detail() -> ApiObject {
    ApiObject::object([
        ("code", ApiObject::string().description("Machine readable error code.")),
        ("message", ApiObject::string().description("Human readable description of the error.")),
    ])
    .required(["code"])
    .reference_name("ErrorDetail")
}

/// Error raised while a service handled the request.
pub fn model_context_error() -> ApiObject {
    ApiObject::object([
        ("request_id", request_id()),
        ("model_context", model_context()),
        ("error", error_detail()),
    ])
    .required(["error"])
    .description("An error that occurred while serving a model.")
    .reference_name("ModelContextError")
}

pub fn health_check() -> ApiObject {
    let service = ApiObject::object([
        ("model_context", model_context()),
        ("status", ApiObject::string().enumeration(["READY", "NOT_READY"])),
        ("endpoint", ApiObject::string().description("Path the service is routed on.")),
    ]);
    ApiObject::object([
        ("porter_version", ApiObject::string().description("Version of porter serving the app.")),
        ("deployed_on", ApiObject::string().description("RFC 3339 timestamp of when the app was built.")),
        ("app_meta", app_meta()),
        ("services", ApiObject::map(service).description("Registered services keyed by id.")),
    ])
    .reference_name("HealthCheck")
}
