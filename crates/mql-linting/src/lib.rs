//! Query linting against live collection schemas.
//!
//! A parsed query says which namespace it targets, which fields it touches
//! and what values it compares them with; a [`SchemaProvider`] says what
//! actually exists. The checks here report the differences: queries whose
//! target could not be inferred or does not exist, fields the collection has
//! never contained, and comparisons whose value type can never match.

use mql_model::{CollectionSchema, Namespace, Node};

mod fields;
mod target;

/// What a deployment looks like, as far as the linter needs to know.
///
/// Implementations typically sit on top of a live connection with caching;
/// tests use an in-memory map.
pub trait SchemaProvider {
    fn databases(&self) -> Vec<String>;
    fn collections(&self, database: &str) -> Vec<String>;
    fn schema_of(&self, namespace: &Namespace) -> Option<CollectionSchema>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LintKind {
    NoNamespaceInferred,
    DatabaseDoesNotExist,
    CollectionDoesNotExist,
    FieldDoesNotExist,
    FieldValueTypeMismatch,
}

/// One finding, anchored to the source location of the offending piece of
/// the query.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic<S> {
    pub kind: LintKind,
    pub source: S,
    pub message: String,
}

/// Runs every check against one parsed query.
///
/// Queries whose collection reference is still `OnlyCollection` report
/// [`LintKind::NoNamespaceInferred`]; callers connected to a deployment
/// should promote the reference with
/// [`CollectionReference::with_database`](mql_model::CollectionReference::with_database)
/// first.
pub fn lint_query<S: Clone>(
    query: &Node<S>,
    provider: &impl SchemaProvider,
) -> Vec<Diagnostic<S>> {
    let mut diagnostics = Vec::new();
    let schema = target::check(query, provider, &mut diagnostics);
    if let Some(schema) = schema {
        fields::check(query, &schema, &mut diagnostics);
    }
    tracing::debug!(count = diagnostics.len(), "linted query");
    diagnostics
}
