//! JSON encoder backed by serde_json.

use serde::{de::DeserializeOwned, Serialize};

use super::ItemEncoder;
use crate::error::{CacheError, Result};

/// Encodes values as JSON text.
///
/// Values without a JSON form (e.g. maps keyed by tuples) fail with
/// [`CacheError::Encoding`]. An empty object decodes to an empty mapping
/// whatever shape it was written from; no normalization is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonItemEncoder {
    pretty: bool,
}

impl JsonItemEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits indented JSON.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl<V> ItemEncoder<V> for JsonItemEncoder
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| CacheError::Encoding(format!("JSON Error: {e}")))
    }

    fn decode(&self, raw: &[u8]) -> Result<V> {
        serde_json::from_slice(raw).map_err(|e| CacheError::Encoding(format!("JSON Error: {e}")))
    }
}
