//! Payload encoding.
//!
//! The lifecycle code only ever sees [`serde_json::Value`]; turning values
//! into wire bytes and back is the codec's job.

use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Converts between wire bytes and JSON values.
pub trait Codec: Send + Sync {
    /// Encode a value for a request body.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decode a response body.
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// Plain JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Encode a typed payload through a codec.
pub fn encode<T: Serialize>(codec: &dyn Codec, payload: &T) -> Result<Vec<u8>> {
    codec.encode(&serde_json::to_value(payload)?)
}

/// Decode a typed payload through a codec.
pub fn decode<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_value(codec.decode(bytes)?)?)
}
