//! Request dispatch for registered services: parse, validate, serve, wrap, log.

use crate::config::ResponseOptions;
use crate::error::{AppError, ErrorContext};
use crate::extractors::RequestId;
use crate::response::service_payload;
use crate::service::{Service, ServiceRequest};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServiceState {
    pub service: Arc<dyn Service>,
    pub options: Arc<ResponseOptions>,
}

/// Empty bodies are `None`; anything else must be JSON regardless of content type.
fn parse_body(body: &Bytes) -> Result<Option<Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("request body is not valid JSON: {}", e)))
}

pub async fn serve_request(
    State(state): State<ServiceState>,
    RequestId(request_id): RequestId,
    method: Method,
    body: Bytes,
) -> Response {
    let ctx = state.service.context();
    let parsed = parse_body(&body);
    let request_data = parsed.as_ref().ok().cloned().flatten();

    let result = match parsed {
        Ok(body) => match body.as_ref().map(|b| ctx.check_request(&method, b)) {
            Some(Err(e)) => Err(e),
            _ => {
                Arc::clone(&state.service)
                    .serve(ServiceRequest {
                        method: method.clone(),
                        request_id: request_id.clone(),
                        body,
                    })
                    .await
            }
        },
        Err(e) => Err(e),
    };

    let returned_id = state.options.return_request_id.then_some(request_id.as_str());
    match result {
        Ok(data) => {
            let payload = service_payload(data, returned_id, &ctx.model_context());
            if let Some(violation) = ctx.check_response(&method, StatusCode::OK, &payload) {
                tracing::warn!(
                    request_id = %request_id,
                    service = %ctx.name(),
                    %violation,
                    "response does not follow the registered schema"
                );
            }
            if ctx.log_api_calls() {
                tracing::info!(
                    request_id = %request_id,
                    service = %ctx.name(),
                    request_data = %request_data.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                    response_data = %payload,
                    event = "api_call",
                    "api logging"
                );
            }
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(request_id = %request_id, service = %ctx.name(), error = %err, event = "exception");
            } else {
                tracing::warn!(request_id = %request_id, service = %ctx.name(), error = %err, "rejected request");
            }
            let user_data = if state.options.return_user_data_on_error {
                request_data
                    .clone()
                    .or_else(|| (!body.is_empty()).then(|| Value::String(String::from_utf8_lossy(&body).into_owned())))
            } else {
                None
            };
            let error_ctx = ErrorContext {
                request_id: returned_id.map(str::to_string),
                model_context: Some(ctx.model_context()),
                user_data,
                include_message: state.options.return_message_on_error,
            };
            if ctx.log_api_calls() {
                let body = serde_json::to_string(&err.to_body(&error_ctx)).unwrap_or_default();
                tracing::info!(
                    request_id = %request_id,
                    service = %ctx.name(),
                    request_data = %request_data.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                    response_data = %body,
                    event = "api_call",
                    "api logging"
                );
            }
            err.into_response_with(&error_ctx)
        }
    }
}

/// Methods the service does not accept. JSON error body plus an `Allow` header.
pub async fn method_not_allowed(State(state): State<ServiceState>, method: Method) -> Response {
    let mut allowed = state.service.methods();
    if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
        allowed.push(Method::HEAD);
    }
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(",");
    let ctx = ErrorContext {
        model_context: Some(state.service.context().model_context()),
        include_message: state.options.return_message_on_error,
        ..ErrorContext::default()
    };
    let mut response = AppError::MethodNotAllowed(method.to_string()).into_response_with(&ctx);
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_cases() {
        assert_eq!(parse_body(&Bytes::from_static(b"")).unwrap(), None);
        assert_eq!(parse_body(&Bytes::from_static(b"  \n")).unwrap(), None);
        assert_eq!(parse_body(&Bytes::from_static(b"{\"a\":1}")).unwrap(), Some(serde_json::json!({"a": 1})));
        let err = parse_body(&Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
