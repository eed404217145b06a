//! Interfaces for the data science objects a `PredictionService` serves.
//!
//! Closures with the matching signature implement each trait, so small models
//! can be registered without a dedicated type.

use serde_json::{Map, Value};

/// One instance to predict on: a JSON object from the request body.
pub type Record = Map<String, Value>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub trait Model: Send + Sync {
    /// Return one prediction per record, in order.
    fn predict(&self, input: &[Record]) -> Result<Vec<Value>, BoxError>;
}

pub trait PreProcessor: Send + Sync {
    fn process(&self, input: Vec<Record>) -> Result<Vec<Record>, BoxError>;
}

pub trait PostProcessor: Send + Sync {
    /// `input` is the raw request data and `preprocessed` what the model saw.
    fn process(&self, input: &[Record], preprocessed: &[Record], predictions: Vec<Value>) -> Result<Vec<Value>, BoxError>;
}

impl<F> Model for F
where
    F: Fn(&[Record]) -> Result<Vec<Value>, BoxError> + Send + Sync,
{
    fn predict(&self, input: &[Record]) -> Result<Vec<Value>, BoxError> {
        self(input)
    }
}

impl<F> PreProcessor for F
where
    F: Fn(Vec<Record>) -> Result<Vec<Record>, BoxError> + Send + Sync,
{
    fn process(&self, input: Vec<Record>) -> Result<Vec<Record>, BoxError> {
        self(input)
    }
}

impl<F> PostProcessor for F
where
    F: Fn(&[Record], &[Record], Vec<Value>) -> Result<Vec<Value>, BoxError> + Send + Sync,
{
    fn process(&self, input: &[Record], preprocessed: &[Record], predictions: Vec<Value>) -> Result<Vec<Value>, BoxError> {
        self(input, preprocessed, predictions)
    }
}

/// Keep only `columns` of each record. Absent columns are skipped unless listed in `required`.
/// Fails with the list of required columns missing from any record.
pub fn select_columns(records: &[Record], columns: &[String], required: &[String]) -> Result<Vec<Record>, Vec<String>> {
    let mut missing: Vec<String> = Vec::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let mut selected = Map::new();
        for col in columns {
            match record.get(col) {
                Some(v) => {
                    selected.insert(col.clone(), v.clone());
                }
                None if required.contains(col) => {
                    if !missing.contains(col) {
                        missing.push(col.clone());
                    }
                }
                None => {}
            }
        }
        out.push(selected);
    }
    if missing.is_empty() {
        Ok(out)
    } else {
        Err(missing)
    }
}
