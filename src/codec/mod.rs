//! Value codec registry.
//!
//! Converts typed values to and from the generic JSON tree. Encoded values
//! are wrapped as `{"__type__": <name>, "value": <payload>}`; untagged nodes
//! are plain JSON and decode to themselves.

mod builtin;
mod registry;

pub use builtin::{timestamp_decoder, timestamp_encoder, TIMESTAMP_TYPE};
pub use registry::{CodecRegistry, Decoded, Decoder, Encoder, TYPE_TAG, VALUE_TAG};
