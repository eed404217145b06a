//! PredictionService: validate instances, run the model, shape predictions.

use crate::config::ServiceConfig;
use crate::datascience::{select_columns, Model, PostProcessor, PreProcessor, Record};
use crate::error::{AppError, ConfigError};
use crate::response::{self, ID_KEY, PREDICTIONS_KEY, PREDICTION_KEY};
use crate::schema::{builtin, ApiObject};
use crate::service::{Service, ServiceContext, ServiceRequest};
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_ACTION: &str = "prediction";
pub const LIVE_MESSAGE: &str = "This endpoint is live. Send POST requests for predictions";

/// User check run on the parsed instances after schema validation. `Err` is returned to the client as 422.
pub type AdditionalChecks = Arc<dyn Fn(&[Record]) -> Result<(), String> + Send + Sync>;

pub struct PredictionService {
    context: ServiceContext,
    model: Arc<dyn Model>,
    preprocessor: Option<Arc<dyn PreProcessor>>,
    postprocessor: Option<Arc<dyn PostProcessor>>,
    batch_prediction: bool,
    additional_checks: Option<AdditionalChecks>,
    feature_columns: Option<Vec<String>>,
    required_features: Vec<String>,
}

pub struct PredictionServiceBuilder {
    config: ServiceConfig,
    model: Arc<dyn Model>,
    preprocessor: Option<Arc<dyn PreProcessor>>,
    postprocessor: Option<Arc<dyn PostProcessor>>,
    batch_prediction: bool,
    additional_checks: Option<AdditionalChecks>,
    feature_schema: Option<ApiObject>,
    prediction_schema: Option<ApiObject>,
}

impl PredictionServiceBuilder {
    pub fn preprocessor(mut self, p: impl PreProcessor + 'static) -> Self {
        self.preprocessor = Some(Arc::new(p));
        self
    }

    pub fn postprocessor(mut self, p: impl PostProcessor + 'static) -> Self {
        self.postprocessor = Some(Arc::new(p));
        self
    }

    /// Accept an array of instances instead of a single object.
    pub fn batch_prediction(mut self, enabled: bool) -> Self {
        self.batch_prediction = enabled;
        self
    }

    pub fn additional_checks<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Record]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.additional_checks = Some(Arc::new(f));
        self
    }

    /// Describes a single instance (without `id`). Must be an object schema.
    pub fn feature_schema(mut self, schema: ApiObject) -> Self {
        self.feature_schema = Some(schema);
        self
    }

    /// Describes a single prediction. Defaults to a number.
    pub fn prediction_schema(mut self, schema: ApiObject) -> Self {
        self.prediction_schema = Some(schema);
        self
    }

    pub fn build(self) -> Result<PredictionService, ConfigError> {
        let mut context = ServiceContext::new(self.config, DEFAULT_ACTION)?;
        context.add_response_schema(
            Method::GET,
            StatusCode::OK,
            ApiObject::string(),
            Some("Confirms the endpoint is live."),
        )?;

        let (feature_columns, required_features) = match &self.feature_schema {
            Some(schema) => {
                let properties = schema
                    .properties()
                    .ok_or_else(|| ConfigError::InvalidSchema("feature_schema must be an object".into()))?;
                let columns = properties.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
                let mut request = schema.with_leading_property(
                    ID_KEY,
                    ApiObject::integer().description("An ID uniquely identifying each instance in the POST body."),
                )?;
                if self.batch_prediction {
                    request = ApiObject::array(request);
                }
                context.add_request_schema(Method::POST, request, None)?;
                (Some(columns), schema.required_names())
            }
            None => (None, Vec::new()),
        };

        let response = prediction_response_schema(self.prediction_schema, self.batch_prediction);
        context.add_response_schema(Method::POST, StatusCode::OK, response, None)?;

        Ok(PredictionService {
            context,
            model: self.model,
            preprocessor: self.preprocessor,
            postprocessor: self.postprocessor,
            batch_prediction: self.batch_prediction,
            additional_checks: self.additional_checks,
            feature_columns,
            required_features,
        })
    }
}

fn prediction_response_schema(prediction: Option<ApiObject>, batch: bool) -> ApiObject {
    let reference = prediction.as_ref().and_then(|p| p.reference_name.clone());
    let mut item = ApiObject::object([
        (
            ID_KEY,
            ApiObject::integer().description("An ID uniquely identifying each instance in the POST body"),
        ),
        (
            PREDICTION_KEY,
            prediction.unwrap_or_else(|| ApiObject::number().description("Model Prediction")),
        ),
    ])
    .description("Model output");
    // the prediction keeps its own reference; the wrapper gets a derived one
    if let Some(name) = reference {
        item = item.reference_name(format!("{}Output", name));
    }
    if batch {
        item = ApiObject::array(item);
    }
    ApiObject::object([
        (response::REQUEST_ID_KEY, builtin::request_id()),
        (response::MODEL_CONTEXT_KEY, builtin::model_context()),
        (PREDICTIONS_KEY, item),
    ])
    .required([response::MODEL_CONTEXT_KEY, PREDICTIONS_KEY])
}

impl PredictionService {
    pub fn builder(config: ServiceConfig, model: impl Model + 'static) -> PredictionServiceBuilder {
        PredictionServiceBuilder {
            config,
            model: Arc::new(model),
            preprocessor: None,
            postprocessor: None,
            batch_prediction: false,
            additional_checks: None,
            feature_schema: None,
            prediction_schema: None,
        }
    }

    pub fn batch_prediction(&self) -> bool {
        self.batch_prediction
    }

    pub fn feature_columns(&self) -> Option<&[String]> {
        self.feature_columns.as_deref()
    }

    /// Turn the request body into instances, enforcing the batch/single shape.
    fn records_from(&self, body: Value) -> Result<Vec<Record>, AppError> {
        if self.batch_prediction {
            let Value::Array(items) = body else {
                return Err(AppError::InvalidInput(
                    "batch prediction expects an array of JSON objects".into(),
                ));
            };
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(m) => Ok(m),
                    _ => Err(AppError::InvalidInput(format!("instance {} is not a JSON object", i))),
                })
                .collect()
        } else {
            match body {
                Value::Object(m) => Ok(vec![m]),
                _ => Err(AppError::InvalidInput(
                    "expected a single JSON object; batch prediction is disabled".into(),
                )),
            }
        }
    }

    /// Features → preprocessor → model → postprocessor. Blocking; runs on the blocking pool.
    fn run_model(&self, records: &[Record]) -> Result<Vec<Value>, AppError> {
        let features = match &self.feature_columns {
            Some(columns) => select_columns(records, columns, &self.required_features).map_err(|missing| {
                AppError::InvalidInput(format!(
                    "request payload is missing the following fields: {:?}",
                    missing
                ))
            })?,
            None => records.to_vec(),
        };
        let preprocessed = match &self.preprocessor {
            Some(p) => p.process(features).map_err(prediction_failure)?,
            None => features,
        };
        let mut predictions = self.model.predict(&preprocessed).map_err(prediction_failure)?;
        if let Some(p) = &self.postprocessor {
            predictions = p.process(records, &preprocessed, predictions).map_err(prediction_failure)?;
        }
        if predictions.len() != records.len() {
            return Err(AppError::Prediction(format!(
                "model returned {} predictions for {} instances",
                predictions.len(),
                records.len()
            )));
        }
        Ok(predictions)
    }
}

fn prediction_failure(e: crate::datascience::BoxError) -> AppError {
    AppError::Prediction(format!("Could not serve model results successfully: {}", e))
}

#[async_trait]
impl Service for PredictionService {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST]
    }

    async fn serve(self: Arc<Self>, request: ServiceRequest) -> Result<Value, AppError> {
        if request.method == Method::GET {
            return Ok(Value::String(LIVE_MESSAGE.into()));
        }
        let body = request
            .body
            .ok_or_else(|| AppError::BadRequest("request body is required".into()))?;
        let records = self.records_from(body)?;
        let ids = records
            .iter()
            .map(|r| r.get(ID_KEY).cloned())
            .collect::<Option<Vec<Value>>>()
            .ok_or_else(|| AppError::InvalidInput(format!("every instance requires an '{}' field", ID_KEY)))?;

        // user checks may assume the standard checks have passed
        if let Some(check) = &self.additional_checks {
            check(&records).map_err(AppError::InvalidInput)?;
        }

        let svc = Arc::clone(&self);
        let predictions = tokio::task::spawn_blocking(move || svc.run_model(&records))
            .await
            .map_err(|e| AppError::Internal(format!("Could not serve model results successfully: {}", e)))??;

        if self.batch_prediction {
            Ok(response::batch_prediction_payload(ids, predictions))
        } else {
            let id = ids.into_iter().next().unwrap_or(Value::Null);
            let prediction = predictions.into_iter().next().unwrap_or(Value::Null);
            Ok(response::prediction_payload(id, prediction))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datascience::BoxError;
    use serde_json::json;

    fn doubling_model(input: &[Record]) -> Result<Vec<Value>, BoxError> {
        input
            .iter()
            .map(|r| -> Result<Value, BoxError> {
                let x = r.get("x").and_then(Value::as_f64).ok_or("x must be a number")?;
                Ok(json!(x * 2.0))
            })
            .collect()
    }

    fn request(body: Value) -> ServiceRequest {
        ServiceRequest {
            method: Method::POST,
            request_id: "rid".into(),
            body: Some(body),
        }
    }

    #[tokio::test]
    async fn single_instance_prediction() {
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), doubling_model)
                .build()
                .unwrap(),
        );
        let out = svc.serve(request(json!({"id": 7, "x": 2}))).await.unwrap();
        assert_eq!(out, json!({"predictions": {"id": 7, "prediction": 4.0}}));
    }

    #[tokio::test]
    async fn batch_shape_is_enforced() {
        let single = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), doubling_model)
                .build()
                .unwrap(),
        );
        let err = single.serve(request(json!([{"id": 1, "x": 1}]))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let batch = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v2"), doubling_model)
                .batch_prediction(true)
                .build()
                .unwrap(),
        );
        let err = batch.clone().serve(request(json!({"id": 1, "x": 1}))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let out = batch
            .serve(request(json!([{"id": 1, "x": 1}, {"id": 2, "x": 5}])))
            .await
            .unwrap();
        assert_eq!(out["predictions"][1], json!({"id": 2, "prediction": 10.0}));
    }

    #[tokio::test]
    async fn processors_and_feature_projection() {
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), |input: &[Record]| -> Result<Vec<Value>, BoxError> {
                // id must have been projected away
                assert!(input.iter().all(|r| !r.contains_key("id")));
                doubling_model(input)
            })
            .feature_schema(ApiObject::object([("x", ApiObject::number())]))
            .preprocessor(|mut input: Vec<Record>| -> Result<Vec<Record>, BoxError> {
                for r in input.iter_mut() {
                    let x = r["x"].as_f64().unwrap_or(0.0);
                    r.insert("x".into(), json!(x + 1.0));
                }
                Ok(input)
            })
            .postprocessor(|raw: &[Record], _pre: &[Record], preds: Vec<Value>| -> Result<Vec<Value>, BoxError> {
                assert!(raw[0].contains_key("id"));
                Ok(preds.into_iter().map(|p| json!(p.as_f64().unwrap_or(0.0) * 10.0)).collect())
            })
            .build()
            .unwrap(),
        );
        assert_eq!(svc.feature_columns(), Some(&["x".to_string()][..]));
        let out = svc.serve(request(json!({"id": 1, "x": 1, "extra": true}))).await.unwrap();
        assert_eq!(out["predictions"]["prediction"], 40.0);
    }

    #[tokio::test]
    async fn optional_features_may_be_absent() {
        let seen = |input: &[Record]| -> Result<Vec<Value>, BoxError> {
            Ok(input.iter().map(|r| json!(r.len())).collect())
        };
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("partial", "v1").validate_request_data(true), seen)
                .feature_schema(
                    ApiObject::object([("a", ApiObject::number()), ("b", ApiObject::number())]).required(["a"]),
                )
                .build()
                .unwrap(),
        );
        let body = json!({"id": 1, "a": 2.0});
        svc.context().check_request(&Method::POST, &body).unwrap();
        let out = svc.clone().serve(request(body)).await.unwrap();
        assert_eq!(out["predictions"]["prediction"], 1);

        let err = svc.serve(request(json!({"id": 2, "b": 1.0}))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("\"a\""));
    }

    #[tokio::test]
    async fn missing_id_and_checks_are_client_errors() {
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), doubling_model)
                .additional_checks(|records: &[Record]| {
                    if records.iter().any(|r| r.get("x") == Some(&json!(0))) {
                        Err("x must be non-zero".to_string())
                    } else {
                        Ok(())
                    }
                })
                .build()
                .unwrap(),
        );
        let err = svc.clone().serve(request(json!({"x": 1}))).await.unwrap_err();
        assert!(err.to_string().contains("'id'"));
        let err = svc.serve(request(json!({"id": 1, "x": 0}))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("non-zero"));
    }

    #[tokio::test]
    async fn model_failures_are_server_errors() {
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), doubling_model)
                .build()
                .unwrap(),
        );
        let err = svc.clone().serve(request(json!({"id": 1, "x": "nan"}))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let short = Arc::new(
            PredictionService::builder(ServiceConfig::new("short", "v1"), |_: &[Record]| -> Result<Vec<Value>, BoxError> {
                Ok(vec![])
            })
            .build()
            .unwrap(),
        );
        let err = short.serve(request(json!({"id": 1}))).await.unwrap_err();
        assert!(err.to_string().contains("0 predictions for 1 instances"));
    }

    #[tokio::test]
    async fn get_reports_liveness() {
        let svc = Arc::new(
            PredictionService::builder(ServiceConfig::new("double", "v1"), doubling_model)
                .build()
                .unwrap(),
        );
        let out = svc
            .serve(ServiceRequest {
                method: Method::GET,
                request_id: "rid".into(),
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(out, Value::String(LIVE_MESSAGE.into()));
    }

    #[test]
    fn schemas_follow_batch_flag() {
        let features = ApiObject::object([("x", ApiObject::number())]);
        let single = PredictionService::builder(ServiceConfig::new("m", "v1"), doubling_model)
            .feature_schema(features.clone())
            .build()
            .unwrap();
        let req = single.context().request_schema(&Method::POST).unwrap();
        assert_eq!(req.schema.type_name(), "object");
        assert_eq!(req.schema.required_names(), ["id", "x"]);

        let batch = PredictionService::builder(ServiceConfig::new("m", "v2"), doubling_model)
            .feature_schema(features)
            .batch_prediction(true)
            .build()
            .unwrap();
        assert_eq!(batch.context().request_schema(&Method::POST).unwrap().schema.type_name(), "array");
        assert!(batch.context().response_schema(&Method::POST, StatusCode::OK).is_some());
        assert!(batch.context().response_schema(&Method::GET, StatusCode::OK).is_some());
    }

    #[test]
    fn feature_schema_must_be_object() {
        let err = PredictionService::builder(ServiceConfig::new("m", "v1"), doubling_model)
            .feature_schema(ApiObject::number())
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("feature_schema"));
    }
}
