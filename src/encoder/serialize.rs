//! Native binary encoder backed by bincode.

use serde::{de::DeserializeOwned, Serialize};

use super::ItemEncoder;
use crate::error::{CacheError, Result};

/// Full-fidelity binary encoding; the default strategy.
///
/// Payloads are raw bytes and are stored as binary attributes. Wrap it in
/// [`super::Base64ItemEncoder`] when only text can be stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeItemEncoder;

impl SerializeItemEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl<V> ItemEncoder<V> for SerializeItemEncoder
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CacheError::Encoding(e.to_string()))
    }

    fn decode(&self, raw: &[u8]) -> Result<V> {
        bincode::deserialize(raw).map_err(|e| CacheError::Encoding(e.to_string()))
    }
}
