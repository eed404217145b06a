//! Standard response envelope helpers.

use crate::service::{Service, ServiceStatus};
use crate::state::AppState;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const REQUEST_ID_KEY: &str = "request_id";
pub const MODEL_CONTEXT_KEY: &str = "model_context";
pub const PREDICTIONS_KEY: &str = "predictions";
pub const ID_KEY: &str = "id";
pub const PREDICTION_KEY: &str = "prediction";

/// Identifies the service that produced a response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelContext {
    pub model_name: String,
    pub api_version: String,
    pub model_meta: Map<String, Value>,
}

/// Wrap a service payload with request/model identifying context.
/// Non-object payloads (e.g. plain strings) are returned untouched.
pub fn service_payload(data: Value, request_id: Option<&str>, ctx: &ModelContext) -> Value {
    let Value::Object(data) = data else {
        return data;
    };
    let mut payload = Map::new();
    if let Some(id) = request_id {
        payload.insert(REQUEST_ID_KEY.into(), Value::String(id.to_string()));
    }
    payload.insert(
        MODEL_CONTEXT_KEY.into(),
        serde_json::to_value(ctx).unwrap_or(Value::Null),
    );
    payload.extend(data);
    Value::Object(payload)
}

pub fn prediction_payload(id: Value, prediction: Value) -> Value {
    serde_json::json!({
        PREDICTIONS_KEY: {
            ID_KEY: id,
            PREDICTION_KEY: prediction
        }
    })
}

pub fn batch_prediction_payload(ids: Vec<Value>, predictions: Vec<Value>) -> Value {
    let items: Vec<Value> = ids
        .into_iter()
        .zip(predictions)
        .map(|(id, p)| serde_json::json!({ ID_KEY: id, PREDICTION_KEY: p }))
        .collect();
    serde_json::json!({ PREDICTIONS_KEY: items })
}

#[derive(Serialize, Debug)]
pub struct ServiceHealth {
    pub model_context: ModelContext,
    pub status: ServiceStatus,
    pub endpoint: String,
}

/// Body shared by the liveness and readiness checks.
#[derive(Serialize, Debug)]
pub struct AppStateBody {
    pub porter_version: &'static str,
    pub deployed_on: String,
    pub app_meta: Map<String, Value>,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl AppStateBody {
    /// Every registered service must be ready. An app with no services is ready.
    pub fn is_ready(&self) -> bool {
        self.services.values().all(|s| s.status == ServiceStatus::Ready)
    }
}

pub fn app_state_body(state: &AppState) -> AppStateBody {
    AppStateBody {
        porter_version: env!("CARGO_PKG_VERSION"),
        deployed_on: state.info.deployed_on.to_rfc3339(),
        app_meta: state.info.config.meta.clone(),
        services: state
            .services
            .iter()
            .map(|svc: &Arc<dyn Service>| {
                let ctx = svc.context();
                (
                    ctx.id().to_string(),
                    ServiceHealth {
                        model_context: ctx.model_context(),
                        status: svc.status(),
                        endpoint: ctx.endpoint().to_string(),
                    },
                )
            })
            .collect(),
    }
}
