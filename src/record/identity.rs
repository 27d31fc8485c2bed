//! Store-assigned record identity.

use crate::types::RecordId;
use std::fmt;

/// Identity slot embedded in every record.
///
/// Outside this crate an `Identity` can only be created transient or cloned
/// along with its record; assigning a persisted id is reserved to the store.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Identity(RecordId);

/// Write access to a record's identity slot.
///
/// Only the store can create one, so code outside this crate cannot
/// reach [`Record::identity_mut`](crate::Record::identity_mut):
///
/// ```compile_fail
/// let key = warehub_store::record::IdentityKey(());
/// ```
#[derive(Debug)]
pub struct IdentityKey(());

impl IdentityKey {
    pub(crate) fn new() -> Self {
        IdentityKey(())
    }
}

impl Identity {
    /// A fresh, transient identity.
    pub fn transient() -> Self {
        Identity(RecordId::TRANSIENT)
    }

    pub fn get(&self) -> RecordId {
        self.0
    }

    pub fn is_transient(&self) -> bool {
        self.0.is_transient()
    }

    pub(crate) fn assign(&mut self, id: RecordId) {
        self.0 = id;
    }

    pub(crate) fn clear(&mut self) {
        self.0 = RecordId::TRANSIENT;
    }

    /// Decide equality of two records from their identities alone.
    ///
    /// Returns `None` when both are transient, in which case the records
    /// must be compared field by field.
    pub fn decide_eq(&self, other: &Identity) -> Option<bool> {
        match (self.is_transient(), other.is_transient()) {
            (true, true) => None,
            _ => Some(self.0 == other.0),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_transient() {
            f.write_str("Identity(transient)")
        } else {
            write!(f, "Identity({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_is_transient() {
        assert!(Identity::transient().is_transient());
        assert!(Identity::default().is_transient());
        assert_eq!(Identity::default().get(), RecordId(-1));
    }

    #[test]
    fn test_assign_and_clear() {
        let mut identity = Identity::transient();
        identity.assign(RecordId(4));
        assert_eq!(identity.get(), RecordId(4));
        identity.clear();
        assert!(identity.is_transient());
    }

    #[test]
    fn test_decide_eq() {
        let transient = Identity::transient();
        let mut a = Identity::transient();
        a.assign(RecordId(1));
        let mut b = Identity::transient();
        b.assign(RecordId(2));

        assert_eq!(transient.decide_eq(&transient), None);
        assert_eq!(a.decide_eq(&a), Some(true));
        assert_eq!(a.decide_eq(&b), Some(false));
        assert_eq!(a.decide_eq(&transient), Some(false));
        assert_eq!(transient.decide_eq(&a), Some(false));
    }
}
