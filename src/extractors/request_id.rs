//! Extract the request id from `X-Request-ID`, or mint one.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

/// Header name for the request id. Default: `X-Request-ID`.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Extractor for the request id. Falls back to a fresh UUID v4 when the header is absent or blank.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
            .map(|s: &str| s.trim().to_string())
            .filter(|s: &String| !s.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(RequestId(value))
    }
}
