//! Base64 wrapper around another encoder.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::ItemEncoder;
use crate::error::{CacheError, Result};

/// Base64-encodes the payload of an inner encoder.
///
/// Guarantees an ASCII payload whatever byte range the inner encoder emits.
pub struct Base64ItemEncoder<V> {
    inner: Arc<dyn ItemEncoder<V>>,
}

impl<V> Base64ItemEncoder<V> {
    pub fn new(inner: impl ItemEncoder<V> + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn from_shared(inner: Arc<dyn ItemEncoder<V>>) -> Self {
        Self { inner }
    }
}

impl<V> ItemEncoder<V> for Base64ItemEncoder<V> {
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        let raw = self.inner.encode(value)?;
        Ok(STANDARD.encode(raw).into_bytes())
    }

    fn decode(&self, raw: &[u8]) -> Result<V> {
        let decoded = STANDARD
            .decode(raw)
            .map_err(|e| CacheError::Encoding(format!("Invalid base64 payload: {e}")))?;
        self.inner.decode(&decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{JsonItemEncoder, SerializeItemEncoder};
    use serde_json::{json, Value};

    #[test]
    fn test_wraps_serialize_encoder() {
        let encoder = Base64ItemEncoder::new(SerializeItemEncoder::new());
        let value = vec![(1u64, "a".to_string()), (u64::MAX, "\u{0}\u{ff}".to_string())];

        let raw = encoder.encode(&value).unwrap();
        assert!(raw.is_ascii());
        let decoded: Vec<(u64, String)> = encoder.decode(&raw).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_wraps_json_encoder() {
        let encoder = Base64ItemEncoder::new(JsonItemEncoder::new());
        let value = json!({"name": "cache", "tags": ["a", "b"]});

        let raw = encoder.encode(&value).unwrap();
        assert_eq!(
            String::from_utf8(raw.clone()).unwrap(),
            STANDARD.encode(br#"{"name":"cache","tags":["a","b"]}"#)
        );
        let decoded: Value = encoder.decode(&raw).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_invalid_base64_fails() {
        let encoder: Base64ItemEncoder<Value> = Base64ItemEncoder::new(JsonItemEncoder::new());
        assert!(matches!(
            encoder.decode(b"***"),
            Err(CacheError::Encoding(_))
        ));
    }
}
