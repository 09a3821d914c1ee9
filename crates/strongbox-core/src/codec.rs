use serde_json::Value;

use crate::error::Result;

/// Turns a snapshot value into the canonical bytes that get hashed and
/// encrypted, and back.
pub trait SnapshotCodec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;

    /// Codec name for logs.
    fn name(&self) -> &str;
}

/// Compact JSON. Object keys come out sorted, so equal values always encode
/// to equal bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &str {
        "json"
    }
}
