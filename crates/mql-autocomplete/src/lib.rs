//! Completion suggestions backed by live deployment metadata.
//!
//! The same [`SchemaProvider`] the linter consumes also answers what can be
//! typed next: database names, collection names inside a database, and field
//! names (with their schema types) inside a namespace. [`complete_fields_at`]
//! ties this to source positions, suggesting fields only where a query
//! actually reads them.

use mql_dialects::{driver, extract_collection_reference};
use mql_java_parse::JavaExpr;
use mql_linting::SchemaProvider;
use mql_model::{BsonType, CollectionReference, Namespace};

/// What a completion entry stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Database,
    Collection,
    Field,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Database => "MongoDB Database",
            EntryKind::Collection => "MongoDB Collection",
            EntryKind::Field => "MongoDB Field",
        }
    }
}

/// One completion suggestion. Field entries carry their schema type so the
/// caller can render it next to the name.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub entry: String,
    pub kind: EntryKind,
    pub ty: Option<BsonType>,
}

/// Outcome of a completion request.
#[derive(Clone, Debug, PartialEq)]
pub enum Completions {
    Entries(Vec<Entry>),
    /// The namespace exists but no schema is known for it, so fields cannot
    /// be suggested.
    NoSchema(Namespace),
    DatabaseDoesNotExist(String),
}

pub fn complete_databases(provider: &impl SchemaProvider) -> Completions {
    let entries = provider
        .databases()
        .into_iter()
        .map(|database| Entry {
            entry: database,
            kind: EntryKind::Database,
            ty: None,
        })
        .collect();
    Completions::Entries(entries)
}

pub fn complete_collections(provider: &impl SchemaProvider, database: &str) -> Completions {
    if !provider.databases().iter().any(|d| d == database) {
        return Completions::DatabaseDoesNotExist(database.to_string());
    }
    let entries = provider
        .collections(database)
        .into_iter()
        .map(|collection| Entry {
            entry: collection,
            kind: EntryKind::Collection,
            ty: None,
        })
        .collect();
    Completions::Entries(entries)
}

pub fn complete_fields(provider: &impl SchemaProvider, namespace: &Namespace) -> Completions {
    let Some(schema) = provider.schema_of(namespace) else {
        return Completions::NoSchema(namespace.clone());
    };
    let entries = schema
        .all_field_names_qualified()
        .into_iter()
        .map(|field| {
            let ty = schema.type_of(&field);
            Entry {
                entry: field,
                kind: EntryKind::Field,
                ty: Some(ty),
            }
        })
        .collect();
    Completions::Entries(entries)
}

/// Field suggestions for a source position, or `None` when the position is
/// not inside a query's `Filters`/`Updates` surface or the query's namespace
/// could not be resolved.
pub fn complete_fields_at(
    expr: &JavaExpr<'_>,
    provider: &impl SchemaProvider,
) -> Option<Completions> {
    if !driver::is_in_query(expr) {
        return None;
    }
    let query = driver::attachment(expr)?;
    let CollectionReference::Known { namespace, .. } = extract_collection_reference(&query) else {
        return None;
    };
    tracing::debug!(%namespace, "completing fields");
    Some(complete_fields(provider, &namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mql_model::CollectionSchema;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct Library;

    impl SchemaProvider for Library {
        fn databases(&self) -> Vec<String> {
            vec!["library".into()]
        }

        fn collections(&self, database: &str) -> Vec<String> {
            if database == "library" {
                vec!["books".into()]
            } else {
                Vec::new()
            }
        }

        fn schema_of(&self, namespace: &Namespace) -> Option<CollectionSchema> {
            (namespace == &Namespace::new("library", "books")).then(|| {
                CollectionSchema::new(
                    namespace.clone(),
                    BsonType::Object(BTreeMap::from([
                        ("title".to_string(), BsonType::String),
                        ("year".to_string(), BsonType::Int32),
                    ])),
                )
            })
        }
    }

    #[test]
    fn databases_complete_by_name() {
        let Completions::Entries(entries) = complete_databases(&Library) else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry, "library");
        assert_eq!(entries[0].kind, EntryKind::Database);
        assert_eq!(entries[0].ty, None);
    }

    #[test]
    fn collections_complete_inside_a_known_database() {
        let Completions::Entries(entries) = complete_collections(&Library, "library") else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry, "books");
        assert_eq!(entries[0].kind, EntryKind::Collection);
    }

    #[test]
    fn unknown_databases_are_reported() {
        assert_eq!(
            complete_collections(&Library, "archive"),
            Completions::DatabaseDoesNotExist("archive".into())
        );
    }

    #[test]
    fn fields_complete_with_their_schema_type() {
        let namespace = Namespace::new("library", "books");
        let Completions::Entries(entries) = complete_fields(&Library, &namespace) else {
            panic!("expected entries");
        };
        let title = entries.iter().find(|e| e.entry == "title").expect("title");
        assert_eq!(title.kind, EntryKind::Field);
        assert_eq!(title.ty, Some(BsonType::String));
    }

    #[test]
    fn namespaces_without_a_schema_report_no_model() {
        let namespace = Namespace::new("library", "magazines");
        assert_eq!(
            complete_fields(&Library, &namespace),
            Completions::NoSchema(namespace)
        );
    }
}
