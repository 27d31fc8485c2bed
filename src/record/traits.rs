//! Record traits.

use super::{Identity, IdentityKey};
use crate::types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// A storable entity belonging to exactly one table.
///
/// Usually implemented through the [`record!`](crate::record!) macro, which
/// also wires up the identity-aware `PartialEq`.
pub trait Record:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Concrete type name, used as the codec discriminator.
    const TYPE_NAME: &'static str;

    fn identity(&self) -> &Identity;

    /// Mutable identity slot. Requires a key only the store holds.
    fn identity_mut(&mut self, key: IdentityKey) -> &mut Identity;

    fn id(&self) -> RecordId {
        self.identity().get()
    }

    /// Name of the table holding this type (lower-cased type name).
    fn table_name() -> String {
        Self::TYPE_NAME.to_lowercase()
    }

    /// Record equality: identity decides once either side is persisted,
    /// otherwise `fields_equal` does.
    fn same_entry(&self, other: &Self, fields_equal: impl FnOnce() -> bool) -> bool {
        match self.identity().decide_eq(other.identity()) {
            Some(equal) => equal,
            None => fields_equal(),
        }
    }
}

/// Type-erased record, as held in tables and produced by decoders.
pub trait AnyRecord: Any + Send + Sync + fmt::Debug {
    fn type_name(&self) -> &'static str;

    fn record_id(&self) -> RecordId;

    fn identity_slot(&mut self, key: IdentityKey) -> &mut Identity;

    fn as_any(&self) -> &dyn Any;

    fn clone_record(&self) -> Box<dyn AnyRecord>;

    /// Equality across erased records; different concrete types are never equal.
    fn record_eq(&self, other: &dyn AnyRecord) -> bool;
}

impl<R: Record> AnyRecord for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn record_id(&self) -> RecordId {
        self.id()
    }

    fn identity_slot(&mut self, key: IdentityKey) -> &mut Identity {
        self.identity_mut(key)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_record(&self) -> Box<dyn AnyRecord> {
        Box::new(self.clone())
    }

    fn record_eq(&self, other: &dyn AnyRecord) -> bool {
        other
            .as_any()
            .downcast_ref::<R>()
            .map_or(false, |other| self == other)
    }
}

impl dyn AnyRecord {
    pub fn downcast_ref<R: Record>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }

    pub fn is<R: Record>(&self) -> bool {
        self.as_any().is::<R>()
    }
}

impl Clone for Box<dyn AnyRecord> {
    fn clone(&self) -> Self {
        self.clone_record()
    }
}
