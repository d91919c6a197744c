//! Value Encoder Module
//!
//! Pluggable strategies turning cached values into storable payloads and back.

mod base64_encoder;
mod json;
mod serialize;

pub use base64_encoder::Base64ItemEncoder;
pub use json::JsonItemEncoder;
pub use serialize::SerializeItemEncoder;

use crate::error::Result;

// == Item Encoder ==
/// Converts values of type `V` to an opaque payload and back.
///
/// `decode(encode(v))` must be equivalent to `v` for every value the
/// strategy supports.
pub trait ItemEncoder<V>: Send + Sync {
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    fn decode(&self, raw: &[u8]) -> Result<V>;
}
