//! Predicate expression tree.

use crate::record::Record;
use crate::types::RecordId;
use std::fmt;
use std::sync::Arc;

/// Comparison operator of a leaf predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

type Test<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A single field comparison, already bound to its literal.
pub struct Comparison<T> {
    field: &'static str,
    op: CompareOp,
    literal: String,
    test: Test<T>,
}

impl<T> Comparison<T> {
    pub(crate) fn new(
        field: &'static str,
        op: CompareOp,
        literal: String,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            field,
            op,
            literal,
            test: Arc::new(test),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn evaluate(&self, record: &T) -> bool {
        (self.test)(record)
    }
}

impl<T> Clone for Comparison<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            op: self.op,
            literal: self.literal.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Comparison<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.symbol(), self.literal)
    }
}

/// Boolean filter over records of type `T`.
///
/// Evaluation is pure: a predicate never mutates the record it inspects.
pub enum Predicate<T> {
    /// Keeps every record.
    Always,
    /// Keeps no record.
    Never,
    Compare(Comparison<T>),
    And(Box<Predicate<T>>, Box<Predicate<T>>),
    Or(Box<Predicate<T>>, Box<Predicate<T>>),
}

impl<T> Predicate<T> {
    /// Predicate from an arbitrary test, labelled for debug output.
    pub fn from_fn(
        label: &'static str,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Predicate::Compare(Comparison::new(label, CompareOp::Eq, "<fn>".to_string(), test))
    }

    pub fn and(self, other: Predicate<T>) -> Predicate<T> {
        match (self, other) {
            (Predicate::Always, p) | (p, Predicate::Always) => p,
            (a, b) => Predicate::And(Box::new(a), Box::new(b)),
        }
    }

    pub fn or(self, other: Predicate<T>) -> Predicate<T> {
        match (self, other) {
            (Predicate::Never, p) | (p, Predicate::Never) => p,
            (a, b) => Predicate::Or(Box::new(a), Box::new(b)),
        }
    }

    /// True when the predicate keeps everything without inspecting records.
    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    pub fn evaluate(&self, record: &T) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Never => false,
            Predicate::Compare(cmp) => cmp.evaluate(record),
            Predicate::And(a, b) => a.evaluate(record) && b.evaluate(record),
            Predicate::Or(a, b) => a.evaluate(record) || b.evaluate(record),
        }
    }
}

impl<T: Record> Predicate<T> {
    /// Matches the record stored under `id`.
    pub fn id_eq(id: RecordId) -> Self {
        Predicate::Compare(Comparison::new("id", CompareOp::Eq, id.to_string(), move |record: &T| {
            record.id() == id
        }))
    }
}

impl<T> From<bool> for Predicate<T> {
    fn from(keep: bool) -> Self {
        if keep {
            Predicate::Always
        } else {
            Predicate::Never
        }
    }
}

impl<T> From<Comparison<T>> for Predicate<T> {
    fn from(cmp: Comparison<T>) -> Self {
        Predicate::Compare(cmp)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Always => Predicate::Always,
            Predicate::Never => Predicate::Never,
            Predicate::Compare(cmp) => Predicate::Compare(cmp.clone()),
            Predicate::And(a, b) => Predicate::And(a.clone(), b.clone()),
            Predicate::Or(a, b) => Predicate::Or(a.clone(), b.clone()),
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => f.write_str("true"),
            Predicate::Never => f.write_str("false"),
            Predicate::Compare(cmp) => write!(f, "{:?}", cmp),
            Predicate::And(a, b) => write!(f, "({:?} && {:?})", a, b),
            Predicate::Or(a, b) => write!(f, "({:?} || {:?})", a, b),
        }
    }
}
