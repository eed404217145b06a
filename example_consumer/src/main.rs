//! Example consumer: serves a toy rating model with porter.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Then: `curl -X POST localhost:8000/datascience/user-ratings/v2/prediction/ -d '[{"id": 1, "user_id": 3, "genre": "comedy", "average_rating": 6.5}]'`

use porter::{
    ApiObject, AppConfig, BoxError, ModelApp, PredictionService, Record, ResponseOptions, ServerConfig, ServiceConfig,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

const GENRES: [&str; 3] = ["comedy", "action", "drama"];

fn feature_schema() -> ApiObject {
    ApiObject::object([
        ("user_id", ApiObject::integer().description("The user ID.")),
        ("genre", ApiObject::string().enumeration(GENRES).description("The title's genre.")),
        (
            "average_rating",
            ApiObject::number().minimum(0.0).maximum(10.0).description("The title's average rating."),
        ),
    ])
}

/// Nudges the average rating toward 5 and boosts comedies.
fn rating_model(records: &[Record]) -> Result<Vec<Value>, BoxError> {
    records
        .iter()
        .map(|r| -> Result<Value, BoxError> {
            let avg = r.get("average_rating").and_then(Value::as_f64).ok_or("average_rating must be a number")?;
            let bonus = if r.get("genre").and_then(Value::as_str) == Some("comedy") { 0.5 } else { 0.0 };
            Ok(json!(((avg + 5.0) / 2.0 + bonus).min(10.0)))
        })
        .collect()
}

fn no_duplicate_ids(records: &[Record]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for r in records {
        if let Some(id) = r.get("id").and_then(Value::as_i64) {
            if !seen.insert(id) {
                return Err(format!("duplicate id {}", id));
            }
        }
    }
    Ok(())
}

fn meta(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("porter=info,example_consumer=info")),
        )
        .init();

    let server = ServerConfig::from_env()?;
    let app_config = AppConfig::new("user-ratings-demo")
        .description("Predict how a user would rate a title.")
        .version("0.1.0")
        .meta(meta(&[("team", "datascience")]))
        .expose_docs(true)
        .response_options(ResponseOptions::from_env()?);
    let mut app = ModelApp::new(app_config)?;

    let ratings = PredictionService::builder(
        ServiceConfig::new("user-ratings", "v2")
            .namespace("datascience")
            .meta(meta(&[("algorithm", "average-blend")]))
            .validate_request_data(true)
            .log_api_calls(true),
        rating_model,
    )
    .feature_schema(feature_schema())
    .prediction_schema(ApiObject::number().minimum(0.0).maximum(10.0))
    .batch_prediction(true)
    .additional_checks(no_duplicate_ids)
    .build()?;
    app.add_service(ratings)?;

    let single = PredictionService::builder(ServiceConfig::new("user-ratings", "v1").namespace("datascience"), rating_model)
        .feature_schema(feature_schema())
        .build()?;
    app.add_service(single)?;

    tracing::info!("docs at http://{}/docs/", server.addr());
    app.run(server.addr()).await
}
