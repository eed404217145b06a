//! Compiled schema validation with deterministic, path-qualified diagnostics.

use crate::error::{AppError, ConfigError};
use crate::schema::ApiObject;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fmt;

/// One mismatch between a value and its schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value; `/` is the root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: {}", self.path, self.message)
    }
}

impl From<SchemaViolation> for AppError {
    fn from(v: SchemaViolation) -> Self {
        AppError::Validation {
            message: v.to_string(),
            path: Some(v.path),
        }
    }
}

pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn compile(schema: &ApiObject) -> Result<Self, ConfigError> {
        schema.check()?;
        let raw = schema.to_json_schema();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&raw)
            .map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// All violations, sorted by path then message.
    pub fn violations(&self, value: &Value) -> Vec<SchemaViolation> {
        let mut out: Vec<SchemaViolation> = match self.compiled.validate(value) {
            Ok(()) => return Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let pointer = e.instance_path.to_string();
                    SchemaViolation {
                        path: if pointer.is_empty() { "/".into() } else { pointer },
                        message: e.to_string(),
                    }
                })
                .collect(),
        };
        out.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
        out.dedup();
        out
    }

    /// First violation in path order, if any.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        match self.violations(value).into_iter().next() {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.compiled.is_valid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rating_schema() -> ApiObject {
        ApiObject::object([
            ("id", ApiObject::integer()),
            ("user_id", ApiObject::integer()),
            ("genre", ApiObject::string().enumeration(["comedy", "action", "drama"])),
            ("average_rating", ApiObject::number().minimum(0.0).maximum(10.0)),
        ])
    }

    fn valid() -> Value {
        json!({"id": 0, "user_id": 1, "genre": "action", "average_rating": 7.9})
    }

    #[test]
    fn conforming_payload_is_accepted() {
        let v = SchemaValidator::compile(&rating_schema()).unwrap();
        assert!(v.validate(&valid()).is_ok());
        assert!(v.is_valid(&valid()));
    }

    #[test]
    fn every_missing_required_property_is_named() {
        let v = SchemaValidator::compile(&rating_schema()).unwrap();
        for key in ["id", "user_id", "genre", "average_rating"] {
            let mut payload = valid();
            payload.as_object_mut().unwrap().remove(key);
            let err = v.validate(&payload).unwrap_err();
            assert_eq!(err.path, "/");
            assert!(err.message.contains(key), "{} not named in {}", key, err.message);
        }
    }

    #[test]
    fn enumeration_and_bounds_report_field_path() {
        let v = SchemaValidator::compile(&rating_schema()).unwrap();
        let mut payload = valid();
        payload["genre"] = json!("horror");
        assert_eq!(v.validate(&payload).unwrap_err().path, "/genre");

        let mut payload = valid();
        payload["average_rating"] = json!(11);
        assert_eq!(v.validate(&payload).unwrap_err().path, "/average_rating");
    }

    #[test]
    fn nested_array_path_is_deterministic() {
        let v = SchemaValidator::compile(&ApiObject::array(rating_schema())).unwrap();
        let mut second = valid();
        second["user_id"] = json!("one");
        let mut third = valid();
        third["average_rating"] = json!(-1);
        let payload = json!([valid(), second, third]);
        let all = v.violations(&payload);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path, "/1/user_id");
        assert_eq!(all[1].path, "/2/average_rating");
        assert_eq!(v.validate(&payload).unwrap_err(), all[0]);
    }

    #[test]
    fn optional_properties_may_be_absent() {
        let schema = rating_schema().required(["id"]);
        let v = SchemaValidator::compile(&schema).unwrap();
        assert!(v.validate(&json!({"id": 5})).is_ok());
        assert!(v.validate(&json!({"genre": "drama"})).is_err());
    }

    #[test]
    fn map_values_are_checked() {
        let v = SchemaValidator::compile(&ApiObject::map(ApiObject::string())).unwrap();
        assert!(v.validate(&json!({"a": "b"})).is_ok());
        assert_eq!(v.validate(&json!({"a": 1})).unwrap_err().path, "/a");
    }

    #[test]
    fn type_mismatch_at_root() {
        let v = SchemaValidator::compile(&rating_schema()).unwrap();
        let err = v.validate(&json!([valid()])).unwrap_err();
        assert_eq!(err.path, "/");
        let app: AppError = err.into();
        assert_eq!(app.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
