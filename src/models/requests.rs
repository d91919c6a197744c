//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds; without it the record never expires
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    /// Reserved characters are left to the cache itself.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for PUT /set-multiple
#[derive(Debug, Clone, Deserialize)]
pub struct SetMultipleRequest {
    pub values: HashMap<String, Value>,
    /// TTL in seconds shared by every value
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Request body for POST /get-multiple
#[derive(Debug, Clone, Deserialize)]
pub struct GetMultipleRequest {
    pub keys: Vec<String>,
    /// Returned for keys that are not hits
    #[serde(default)]
    pub default: Option<Value>,
}

/// Request body for POST /delete-multiple
#[derive(Debug, Clone, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"a": [1, 2]}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"a": [1, 2]}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!("test"),
            ttl: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_get_multiple_request_default_is_optional() {
        let req: GetMultipleRequest = serde_json::from_str(r#"{"keys": ["a", "b"]}"#).unwrap();
        assert_eq!(req.keys, vec!["a", "b"]);
        assert!(req.default.is_none());

        let req: GetMultipleRequest =
            serde_json::from_str(r#"{"keys": [], "default": 0}"#).unwrap();
        assert_eq!(req.default, Some(json!(0)));
    }

    #[test]
    fn test_set_multiple_request_deserialize() {
        let req: SetMultipleRequest =
            serde_json::from_str(r#"{"values": {"a": 1, "b": "two"}, "ttl": 30}"#).unwrap();
        assert_eq!(req.values.len(), 2);
        assert_eq!(req.values["b"], json!("two"));
        assert_eq!(req.ttl, Some(30));
    }
}
