//! Built-in codecs.

use super::registry::{Decoder, Encoder};
use crate::error::StoreError;
use crate::types::Timestamp;
use serde_json::Value;

/// Discriminator used for timestamps.
pub const TIMESTAMP_TYPE: &str = "datetime";

/// Timestamp → ISO-8601 string.
pub fn timestamp_encoder() -> Encoder {
    Encoder::new(TIMESTAMP_TYPE, |ts: &Timestamp| Ok(Value::String(ts.to_iso8601())))
}

/// ISO-8601 string → timestamp.
pub fn timestamp_decoder() -> Decoder {
    Decoder::new(TIMESTAMP_TYPE, |payload| match payload {
        Value::String(s) => Timestamp::parse_iso8601(&s)
            .map_err(|e| StoreError::Deserialization(format!("{}: {}", s, e))),
        other => Err(StoreError::Deserialization(format!(
            "expected ISO-8601 string, got {}",
            other
        ))),
    })
}
