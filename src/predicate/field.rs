//! Field accessors and comparison builders.

use super::expr::{CompareOp, Comparison, Predicate};
use crate::types::{RecordId, Timestamp};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// A value a predicate can test for equality.
///
/// String-like values expose their text so that equality against a literal
/// that compiles as a regular expression becomes a pattern search.
pub trait FieldValue: PartialEq + fmt::Debug + Send + Sync + 'static {
    fn as_text(&self) -> Option<&str> {
        None
    }
}

impl FieldValue for String {
    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn as_text(&self) -> Option<&str> {
        self.as_ref().and_then(FieldValue::as_text)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {}

impl<K, V> FieldValue for BTreeMap<K, V>
where
    K: PartialEq + fmt::Debug + Send + Sync + 'static,
    V: PartialEq + fmt::Debug + Send + Sync + 'static,
{
}

macro_rules! plain_field_values {
    ($($ty:ty),* $(,)?) => {
        $(impl FieldValue for $ty {})*
    };
}

plain_field_values!(bool, i32, i64, u32, u64, usize, f64, Timestamp, RecordId);

/// Accessor for one field of a record type.
pub struct Field<T, V> {
    name: &'static str,
    get: fn(&T) -> &V,
}

impl<T, V> Clone for Field<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Field<T, V> {}

impl<T, V> fmt::Debug for Field<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self.name)
    }
}

impl<T: 'static, V: 'static> Field<T, V> {
    pub const fn new(name: &'static str, get: fn(&T) -> &V) -> Self {
        Self { name, get }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value<'a>(&self, record: &'a T) -> &'a V {
        (self.get)(record)
    }

    pub fn lt(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: PartialOrd + fmt::Debug + Send + Sync,
    {
        self.ordered(CompareOp::Lt, other.into(), |a, b| a < b)
    }

    pub fn le(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: PartialOrd + fmt::Debug + Send + Sync,
    {
        self.ordered(CompareOp::Le, other.into(), |a, b| a <= b)
    }

    pub fn gt(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: PartialOrd + fmt::Debug + Send + Sync,
    {
        self.ordered(CompareOp::Gt, other.into(), |a, b| a > b)
    }

    pub fn ge(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: PartialOrd + fmt::Debug + Send + Sync,
    {
        self.ordered(CompareOp::Ge, other.into(), |a, b| a >= b)
    }

    /// Equality.
    ///
    /// If the literal is text that compiles as a regular expression, a record
    /// matches when the field's text contains a match for it. Otherwise, or
    /// when the field has no text, values are compared exactly.
    pub fn eq(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: FieldValue,
    {
        let literal = other.into();
        let label = format!("{:?}", literal);
        let matches = self.matcher(literal);
        Comparison::new(self.name, CompareOp::Eq, label, move |record: &T| matches(record)).into()
    }

    /// Negation of [`Field::eq`].
    pub fn ne(&self, other: impl Into<V>) -> Predicate<T>
    where
        V: FieldValue,
    {
        let literal = other.into();
        let label = format!("{:?}", literal);
        let matches = self.matcher(literal);
        Comparison::new(self.name, CompareOp::Ne, label, move |record: &T| !matches(record)).into()
    }

    fn ordered(
        &self,
        op: CompareOp,
        literal: V,
        cmp: fn(&V, &V) -> bool,
    ) -> Predicate<T>
    where
        V: fmt::Debug + Send + Sync,
    {
        let get = self.get;
        let label = format!("{:?}", literal);
        Comparison::new(self.name, op, label, move |record: &T| cmp(get(record), &literal)).into()
    }

    fn matcher(&self, literal: V) -> impl Fn(&T) -> bool + Send + Sync + 'static
    where
        V: FieldValue,
    {
        let get = self.get;
        let pattern = literal.as_text().and_then(|text| Regex::new(text).ok());
        move |record: &T| {
            let value = get(record);
            match (&pattern, value.as_text()) {
                (Some(pattern), Some(text)) => pattern.is_match(text),
                _ => *value == literal,
            }
        }
    }
}
