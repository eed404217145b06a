//! Declarative payload schemas.
//!
//! An [`ApiObject`] tree describes the shape of a JSON payload. The same tree is
//! compiled into a [`SchemaValidator`] to check requests/responses and converted
//! to OpenAPI for the generated docs.

pub mod builtin;
pub mod openapi;
pub mod validator;

pub use validator::{SchemaValidator, SchemaViolation};

use crate::error::ConfigError;
use serde_json::{json, Map, Value};

/// Which properties of an object must be present.
#[derive(Clone, Debug, PartialEq)]
pub enum Required {
    All,
    Only(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    Integer,
    Boolean,
    Array {
        items: Box<ApiObject>,
    },
    Object {
        properties: Vec<(String, ApiObject)>,
        required: Required,
    },
    /// Free-form object whose values all follow one schema.
    Map {
        values: Box<ApiObject>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiObject {
    pub kind: SchemaKind,
    pub description: Option<String>,
    /// When set, docs emit the schema once under `components/schemas` and `$ref` it.
    pub reference_name: Option<String>,
    pub enumeration: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl ApiObject {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
            reference_name: None,
            enumeration: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: ApiObject) -> Self {
        Self::of(SchemaKind::Array { items: Box::new(items) })
    }

    /// Object with every property required.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, ApiObject)>,
        K: Into<String>,
    {
        Self::of(SchemaKind::Object {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            required: Required::All,
        })
    }

    pub fn map(values: ApiObject) -> Self {
        Self::of(SchemaKind::Map { values: Box::new(values) })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn reference_name(mut self, name: impl Into<String>) -> Self {
        self.reference_name = Some(name.into());
        self
    }

    pub fn enumeration<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    /// Restrict the required properties of an object. An empty list makes every property optional.
    /// No effect on other kinds.
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let SchemaKind::Object { required, .. } = &mut self.kind {
            *required = Required::Only(names.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Properties of an object schema, in declaration order.
    pub fn properties(&self) -> Option<&[(String, ApiObject)]> {
        match &self.kind {
            SchemaKind::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Return a copy of this object schema with `(name, schema)` prepended.
    /// An existing property of the same name is replaced.
    pub fn with_leading_property(&self, name: &str, schema: ApiObject) -> Result<Self, ConfigError> {
        let SchemaKind::Object { properties, required } = &self.kind else {
            return Err(ConfigError::InvalidSchema("expected an object schema".into()));
        };
        let mut props = vec![(name.to_string(), schema)];
        props.extend(properties.iter().filter(|(k, _)| k != name).cloned());
        let required = match required {
            Required::All => Required::All,
            Required::Only(names) => {
                let mut names = names.clone();
                if !names.iter().any(|n| n == name) {
                    names.insert(0, name.to_string());
                }
                Required::Only(names)
            }
        };
        Ok(Self {
            kind: SchemaKind::Object {
                properties: props,
                required,
            },
            ..self.clone()
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::Integer => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object { .. } | SchemaKind::Map { .. } => "object",
        }
    }

    /// Names of the required properties, resolved against the declared ones.
    pub fn required_names(&self) -> Vec<String> {
        match &self.kind {
            SchemaKind::Object {
                properties,
                required: Required::All,
            } => properties.iter().map(|(k, _)| k.clone()).collect(),
            SchemaKind::Object {
                required: Required::Only(names),
                ..
            } => names.clone(),
            _ => Vec::new(),
        }
    }

    /// Structural checks that a JSON Schema compiler would not catch.
    pub fn check(&self) -> Result<(), ConfigError> {
        if let Some(values) = &self.enumeration {
            if values.is_empty() {
                return Err(ConfigError::InvalidSchema("enumeration must not be empty".into()));
            }
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(ConfigError::InvalidSchema(format!("minimum {} exceeds maximum {}", min, max)));
            }
        }
        match &self.kind {
            SchemaKind::Array { items } => items.check(),
            SchemaKind::Map { values } => values.check(),
            SchemaKind::Object { properties, required } => {
                if let Required::Only(names) = required {
                    for name in names {
                        if !properties.iter().any(|(k, _)| k == name) {
                            return Err(ConfigError::InvalidSchema(format!(
                                "required property '{}' is not declared",
                                name
                            )));
                        }
                    }
                }
                properties.iter().try_for_each(|(_, p)| p.check())
            }
            _ => Ok(()),
        }
    }

    /// Plain JSON Schema (draft 7) with every reference inlined.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!(self.type_name()));
        if let Some(d) = &self.description {
            out.insert("description".into(), json!(d));
        }
        if let Some(values) = &self.enumeration {
            out.insert("enum".into(), Value::Array(values.clone()));
        }
        if let Some(min) = self.minimum {
            out.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            out.insert("maximum".into(), json!(max));
        }
        match &self.kind {
            SchemaKind::Array { items } => {
                out.insert("items".into(), items.to_json_schema());
            }
            SchemaKind::Object { properties, .. } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_schema()))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
                out.insert("required".into(), json!(self.required_names()));
            }
            SchemaKind::Map { values } => {
                out.insert("additionalProperties".into(), values.to_json_schema());
            }
            _ => {}
        }
        Value::Object(out)
    }
}
