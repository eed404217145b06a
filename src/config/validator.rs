//! Config validation: route segments, URLs and metadata.

use crate::error::ConfigError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._~-]+$").expect("static regex"))
}

/// A single URL path segment (service name, api version, action).
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if segment_regex().is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSegment {
            field,
            value: value.to_string(),
        })
    }
}

/// Namespace may span several segments. Result starts with `/` and has no trailing `/`, or is empty.
pub fn normalize_namespace(namespace: &str) -> Result<String, ConfigError> {
    let trimmed = namespace.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for part in trimmed.split('/') {
        validate_segment("namespace", part).map_err(|_| ConfigError::InvalidSegment {
            field: "namespace",
            value: namespace.to_string(),
        })?;
    }
    Ok(format!("/{}", trimmed))
}

/// Docs URLs must be absolute, literal paths: no whitespace, route captures or wildcards.
pub fn validate_url_path(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let literal = !value.contains(|c: char| c.is_whitespace() || matches!(c, ':' | '*' | '?' | '#'));
    if value.starts_with('/') && literal {
        Ok(())
    } else {
        Err(ConfigError::InvalidSegment {
            field,
            value: value.to_string(),
        })
    }
}

/// Metadata must be a flat map of strings.
pub fn validate_meta(meta: &Map<String, Value>) -> Result<(), ConfigError> {
    for (key, value) in meta {
        if !value.is_string() {
            return Err(ConfigError::InvalidMeta(format!(
                "`meta` does not follow the proper schema, all values should be strings (key '{}')",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_is_normalized() {
        assert_eq!(normalize_namespace("").unwrap(), "");
        assert_eq!(normalize_namespace("/").unwrap(), "");
        assert_eq!(normalize_namespace("datascience").unwrap(), "/datascience");
        assert_eq!(normalize_namespace("/ds/team/").unwrap(), "/ds/team");
    }

    #[test]
    fn bad_segments_are_rejected() {
        assert!(validate_segment("name", "my-model").is_ok());
        assert!(validate_segment("api_version", "1.0.0-alpha").is_ok());
        assert!(validate_segment("name", "").is_err());
        assert!(validate_segment("name", "a/b").is_err());
        assert!(validate_segment("name", "has space").is_err());
        assert!(normalize_namespace("a//b").is_err());
    }

    #[test]
    fn meta_values_must_be_strings() {
        let ok = json!({"owner": "ds-team"});
        assert!(validate_meta(ok.as_object().unwrap()).is_ok());
        let bad = json!({"owner": 1});
        let err = validate_meta(bad.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn docs_urls_must_be_absolute() {
        assert!(validate_url_path("docs_url", "/docs/").is_ok());
        assert!(validate_url_path("docs_url", "docs").is_err());
        assert!(validate_url_path("docs_url", "/docs/:page").is_err());
        assert!(validate_url_path("docs_json_url", "/*rest").is_err());
    }
}
