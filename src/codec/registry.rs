//! Encoder/decoder registry.

use crate::error::{Result, StoreError};
use crate::record::{AnyRecord, Record};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Key holding the type discriminator of an encoded node.
pub const TYPE_TAG: &str = "__type__";

/// Key holding the payload of an encoded node.
pub const VALUE_TAG: &str = "value";

type CheckFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
type EncodeFn = Box<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;
type NameCheckFn = Box<dyn Fn(&str) -> bool + Send + Sync>;
type DecodeFn = Box<dyn Fn(Value) -> Result<Decoded> + Send + Sync>;

/// One-way conversion from a typed value to its JSON payload.
pub struct Encoder {
    type_name: String,
    check: CheckFn,
    encode: EncodeFn,
}

impl Encoder {
    /// Encoder for values of exactly type `T`.
    pub fn new<T, F>(type_name: impl Into<String>, encode: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        Self {
            type_name,
            check: Box::new(|value: &dyn Any| value.is::<T>()),
            encode: Box::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
                Some(value) => encode(value),
                None => Err(StoreError::NotSerializable(name.clone())),
            }),
        }
    }

    /// Encoder for a record type; the payload is the record's field mapping.
    pub fn for_record<R: Record>() -> Self {
        Self::new(R::TYPE_NAME, |record: &R| Ok(serde_json::to_value(record)?))
    }

    /// Replace the match check.
    pub fn with_check(
        mut self,
        check: impl Fn(&dyn Any) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.check = Box::new(check);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn check(&self, value: &dyn Any) -> bool {
        (self.check)(value)
    }

    /// Encode into a tagged node.
    pub fn encode(&self, value: &dyn Any) -> Result<Value> {
        let payload = (self.encode)(value)?;
        let mut node = Map::new();
        node.insert(TYPE_TAG.to_string(), Value::String(self.type_name.clone()));
        node.insert(VALUE_TAG.to_string(), payload);
        Ok(Value::Object(node))
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encoder(type={})", self.type_name)
    }
}

/// Result of decoding one node.
pub enum Decoded {
    /// Untagged JSON, passed through unchanged.
    Plain(Value),
    /// A typed value such as a timestamp.
    Value(Box<dyn Any + Send>),
    /// A record, as its concrete type behind the erased trait.
    Record(Box<dyn AnyRecord>),
}

impl Decoded {
    pub fn into_value<T: Any>(self) -> Option<T> {
        match self {
            Decoded::Value(value) => value.downcast::<T>().ok().map(|value| *value),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Box<dyn AnyRecord>> {
        match self {
            Decoded::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_plain(self) -> Option<Value> {
        match self {
            Decoded::Plain(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Plain(value) => write!(f, "Plain({})", value),
            Decoded::Value(_) => f.write_str("Value(..)"),
            Decoded::Record(record) => write!(f, "Record({:?})", record),
        }
    }
}

/// One-way conversion from a JSON payload back to a typed value.
pub struct Decoder {
    type_name: String,
    check: NameCheckFn,
    decode: DecodeFn,
}

impl Decoder {
    /// Decoder producing a typed value for nodes tagged `type_name`.
    pub fn new<T, F>(type_name: impl Into<String>, decode: F) -> Self
    where
        T: Any + Send,
        F: Fn(Value) -> Result<T> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        Self {
            type_name,
            check: Box::new(move |tag: &str| tag == name),
            decode: Box::new(move |payload| {
                decode(payload).map(|value| Decoded::Value(Box::new(value)))
            }),
        }
    }

    /// Decoder rebuilding a record of type `R` from its field mapping.
    pub fn for_record<R: Record>() -> Self {
        Self {
            type_name: R::TYPE_NAME.to_string(),
            check: Box::new(|tag: &str| tag == R::TYPE_NAME),
            decode: Box::new(|payload| {
                let record: R = serde_json::from_value(payload).map_err(|e| {
                    StoreError::Deserialization(format!("{}: {}", R::TYPE_NAME, e))
                })?;
                Ok(Decoded::Record(Box::new(record)))
            }),
        }
    }

    /// Replace the discriminator check.
    pub fn with_check(mut self, check: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.check = Box::new(check);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn check(&self, tag: &str) -> bool {
        (self.check)(tag)
    }

    /// Decode the payload of a node whose tag passed [`Decoder::check`].
    pub fn decode(&self, payload: Value) -> Result<Decoded> {
        (self.decode)(payload)
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decoder(type={})", self.type_name)
    }
}

/// Registered encoders and decoders, keyed by type name.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    encoders: BTreeMap<String, Encoder>,
    decoders: BTreeMap<String, Decoder>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in codecs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.encoders.insert(super::TIMESTAMP_TYPE.to_string(), super::timestamp_encoder());
        registry.decoders.insert(super::TIMESTAMP_TYPE.to_string(), super::timestamp_decoder());
        registry
    }

    pub fn register_encoder(&mut self, encoder: Encoder) -> Result<()> {
        if self.encoders.contains_key(encoder.type_name()) {
            return Err(StoreError::DuplicateCodec(encoder.type_name().to_string()));
        }
        self.encoders.insert(encoder.type_name().to_string(), encoder);
        Ok(())
    }

    pub fn register_decoder(&mut self, decoder: Decoder) -> Result<()> {
        if self.decoders.contains_key(decoder.type_name()) {
            return Err(StoreError::DuplicateCodec(decoder.type_name().to_string()));
        }
        self.decoders.insert(decoder.type_name().to_string(), decoder);
        Ok(())
    }

    /// Register the encoder and decoder of a record type.
    ///
    /// Fails without registering anything if either half already exists.
    pub fn register_record<R: Record>(&mut self) -> Result<()> {
        if self.encoders.contains_key(R::TYPE_NAME) || self.decoders.contains_key(R::TYPE_NAME) {
            return Err(StoreError::DuplicateCodec(R::TYPE_NAME.to_string()));
        }
        self.register_encoder(Encoder::for_record::<R>())?;
        self.register_decoder(Decoder::for_record::<R>())
    }

    /// Idempotent variant of [`CodecRegistry::register_record`].
    ///
    /// Halves already registered under the type name are kept. Returns
    /// whether anything was added.
    pub fn ensure_record<R: Record>(&mut self) -> bool {
        let mut added = false;
        if !self.encoders.contains_key(R::TYPE_NAME) {
            self.encoders
                .insert(R::TYPE_NAME.to_string(), Encoder::for_record::<R>());
            added = true;
        }
        if !self.decoders.contains_key(R::TYPE_NAME) {
            self.decoders
                .insert(R::TYPE_NAME.to_string(), Decoder::for_record::<R>());
            added = true;
        }
        added
    }

    pub fn has_encoder(&self, type_name: &str) -> bool {
        self.encoders.contains_key(type_name)
    }

    pub fn has_decoder(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Encode a typed value into a tagged node.
    pub fn encode<T: Any>(&self, value: &T) -> Result<Value> {
        self.encode_any(value, std::any::type_name::<T>())
    }

    /// Encode a record under its concrete type name.
    pub fn encode_record(&self, record: &dyn AnyRecord) -> Result<Value> {
        self.encode_any(record.as_any(), record.type_name())
    }

    fn encode_any(&self, value: &dyn Any, display_name: &str) -> Result<Value> {
        let found: Vec<&Encoder> = self.encoders.values().filter(|e| e.check(value)).collect();
        match found.as_slice() {
            [encoder] => encoder.encode(value),
            [] => Err(StoreError::NotSerializable(display_name.to_string())),
            many => Err(StoreError::AmbiguousCodec {
                type_name: display_name.to_string(),
                matches: many.iter().map(|e| e.type_name().to_string()).collect(),
            }),
        }
    }

    /// Decode a node. Nodes without a string `__type__` tag pass through.
    pub fn decode(&self, node: Value) -> Result<Decoded> {
        let mut object = match node {
            Value::Object(object) if object.contains_key(TYPE_TAG) => object,
            other => return Ok(Decoded::Plain(other)),
        };
        let tag = match object.remove(TYPE_TAG) {
            Some(Value::String(tag)) => tag,
            Some(other) => return Err(StoreError::NotDeserializable(other.to_string())),
            None => return Err(StoreError::NotDeserializable("<untagged>".to_string())),
        };
        let payload = object.remove(VALUE_TAG).unwrap_or(Value::Null);

        let found: Vec<&Decoder> = self.decoders.values().filter(|d| d.check(&tag)).collect();
        match found.as_slice() {
            [decoder] => decoder.decode(payload),
            [] => Err(StoreError::NotDeserializable(tag)),
            many => Err(StoreError::AmbiguousCodec {
                type_name: tag,
                matches: many.iter().map(|d| d.type_name().to_string()).collect(),
            }),
        }
    }
}
