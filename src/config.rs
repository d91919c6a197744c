//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::cache::NetworkErrorMode;
use crate::dynamo::{DEFAULT_PRIMARY_FIELD, DEFAULT_TTL_FIELD, DEFAULT_VALUE_FIELD};
use crate::error::{CacheError, Result};

// == Encoder Kind ==
/// Value encoder used by the server's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderKind {
    /// Plain JSON text
    #[default]
    Json,
    /// JSON wrapped in base64
    Base64,
}

impl FromStr for EncoderKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(EncoderKind::Json),
            "base64" => Ok(EncoderKind::Base64),
            other => Err(CacheError::InvalidArgument(format!(
                "Unsupported encoder: {other}"
            ))),
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderKind::Json => write!(f, "json"),
            EncoderKind::Base64 => write!(f, "base64"),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Name of the backing table
    pub table_name: String,
    /// Optional namespace prepended to every key
    pub key_prefix: Option<String>,
    /// Attribute holding the key
    pub primary_field: String,
    /// Attribute holding the expiry timestamp
    pub ttl_field: String,
    /// Attribute holding the encoded value
    pub value_field: String,
    /// How read paths handle store network failures
    pub network_error_mode: NetworkErrorMode,
    /// Value encoder
    pub encoder: EncoderKind,
    /// TTL sweeper interval in seconds
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `TABLE_NAME` - Backing table (default: cache)
    /// - `KEY_PREFIX` - Key namespace (default: none)
    /// - `PRIMARY_FIELD`, `TTL_FIELD`, `VALUE_FIELD` - Attribute names
    ///   (default: id, ttl, value)
    /// - `NETWORK_ERROR_MODE` - ignore, warning or throw (default: warning)
    /// - `ENCODER` - json or base64 (default: json)
    /// - `SWEEP_INTERVAL` - TTL sweep frequency in seconds (default: 1)
    ///
    /// Unparseable numbers fall back to their defaults; an unknown network
    /// error mode or encoder is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            table_name: env::var("TABLE_NAME").unwrap_or(defaults.table_name),
            key_prefix: env::var("KEY_PREFIX").ok().filter(|p| !p.is_empty()),
            primary_field: env::var("PRIMARY_FIELD").unwrap_or(defaults.primary_field),
            ttl_field: env::var("TTL_FIELD").unwrap_or(defaults.ttl_field),
            value_field: env::var("VALUE_FIELD").unwrap_or(defaults.value_field),
            network_error_mode: match env::var("NETWORK_ERROR_MODE") {
                Ok(mode) => mode.parse()?,
                Err(_) => defaults.network_error_mode,
            },
            encoder: match env::var("ENCODER") {
                Ok(encoder) => encoder.parse()?,
                Err(_) => defaults.encoder,
            },
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            table_name: "cache".to_string(),
            key_prefix: None,
            primary_field: DEFAULT_PRIMARY_FIELD.to_string(),
            ttl_field: DEFAULT_TTL_FIELD.to_string(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
            network_error_mode: NetworkErrorMode::Warning,
            encoder: EncoderKind::Json,
            sweep_interval: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.table_name, "cache");
        assert_eq!(config.key_prefix, None);
        assert_eq!(config.primary_field, "id");
        assert_eq!(config.ttl_field, "ttl");
        assert_eq!(config.value_field, "value");
        assert_eq!(config.network_error_mode, NetworkErrorMode::Warning);
        assert_eq!(config.encoder, EncoderKind::Json);
        assert_eq!(config.sweep_interval, 1);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "SERVER_PORT",
            "TABLE_NAME",
            "KEY_PREFIX",
            "PRIMARY_FIELD",
            "TTL_FIELD",
            "VALUE_FIELD",
            "NETWORK_ERROR_MODE",
            "ENCODER",
            "SWEEP_INTERVAL",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.table_name, "cache");
        assert_eq!(config.network_error_mode, NetworkErrorMode::Warning);
        assert_eq!(config.encoder, EncoderKind::Json);
        assert_eq!(config.sweep_interval, 1);
    }

    #[test]
    fn test_encoder_kind_parse() {
        assert_eq!("json".parse::<EncoderKind>().unwrap(), EncoderKind::Json);
        assert_eq!("BASE64".parse::<EncoderKind>().unwrap(), EncoderKind::Base64);
        assert!(matches!(
            "xml".parse::<EncoderKind>(),
            Err(CacheError::InvalidArgument(_))
        ));
        assert_eq!(EncoderKind::Base64.to_string(), "base64");
    }
}
