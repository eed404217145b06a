//! Load process-level settings from environment variables.

use crate::config::types::{ResponseOptions, ServerConfig};
use crate::error::ConfigError;

pub const HOST_VAR: &str = "PORTER_HOST";
pub const PORT_VAR: &str = "PORTER_PORT";
pub const RETURN_REQUEST_ID_VAR: &str = "PORTER_RETURN_REQUEST_ID";
pub const RETURN_MESSAGE_ON_ERROR_VAR: &str = "PORTER_RETURN_MESSAGE_ON_ERROR";
pub const RETURN_USER_DATA_ON_ERROR_VAR: &str = "PORTER_RETURN_USER_DATA_ON_ERROR";

impl ServerConfig {
    /// Read bind settings from `PORTER_HOST` / `PORTER_PORT`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let host = lookup(HOST_VAR).unwrap_or(defaults.host);
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Load(format!("{} must be a port number, got '{}'", PORT_VAR, raw)))?,
            None => defaults.port,
        };
        Ok(Self { host, port })
    }
}

impl ResponseOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            return_request_id: flag(&lookup, RETURN_REQUEST_ID_VAR, defaults.return_request_id)?,
            return_message_on_error: flag(&lookup, RETURN_MESSAGE_ON_ERROR_VAR, defaults.return_message_on_error)?,
            return_user_data_on_error: flag(
                &lookup,
                RETURN_USER_DATA_ON_ERROR_VAR,
                defaults.return_user_data_on_error,
            )?,
        })
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Load(format!("{} must be a boolean, got '{}'", var, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn server_defaults_apply() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.addr(), "127.0.0.1:8000");
    }

    #[test]
    fn server_port_parsed() {
        let cfg = ServerConfig::from_lookup(lookup(&[(HOST_VAR, "0.0.0.0"), (PORT_VAR, "9000")])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:9000");
        assert!(ServerConfig::from_lookup(lookup(&[(PORT_VAR, "http")])).is_err());
    }

    #[test]
    fn response_flags_parsed() {
        let opts = ResponseOptions::from_lookup(lookup(&[
            (RETURN_USER_DATA_ON_ERROR_VAR, "yes"),
            (RETURN_REQUEST_ID_VAR, "0"),
        ]))
        .unwrap();
        assert!(opts.return_user_data_on_error);
        assert!(!opts.return_request_id);
        assert!(opts.return_message_on_error);
        assert!(ResponseOptions::from_lookup(lookup(&[(RETURN_REQUEST_ID_VAR, "maybe")])).is_err());
    }
}
