//! Dialect-agnostic model of a MongoDB operation (the "query IR").
//!
//! Dialect parsers turn host-language syntax (driver calls, Spring Criteria
//! chains, `@Query` annotations) into [`Node`] trees. Every downstream
//! feature — autocompletion, field-existence linting, type-mismatch linting —
//! consumes this model instead of the source syntax that produced it.
//!
//! Nodes are immutable once built and are rebuilt from scratch on every
//! analysis pass; the model holds no reference back into a live syntax tree
//! beyond the opaque source handle `S` each node carries.

mod bson;
mod namespace;
mod node;
mod schema;

pub use bson::{BsonType, ConstantValue};
pub use namespace::Namespace;
pub use node::{
    CollectionReference, CommandType, Component, ComponentKind, DialectName, FieldReference, Name,
    Node, ValueReference,
};
pub use schema::CollectionSchema;

use std::fmt;

/// A byte-span into an analyzed source string.
///
/// Dialect crates use `Span` as the source handle `S` of [`Node`]: it is the
/// vocabulary diagnostics are anchored in, and it keeps the IR independent of
/// any syntax-tree lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}
