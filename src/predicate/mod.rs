//! Predicate algebra over record fields.
//!
//! Predicates are built from [`Field`] accessors (`Project::name().eq("foo")`)
//! and combined with [`Predicate::and`] / [`Predicate::or`]. The store
//! evaluates the resulting expression once per candidate record.

mod expr;
mod field;

pub use expr::{Comparison, CompareOp, Predicate};
pub use field::{Field, FieldValue};
