//! Checks on the namespace a query targets.

use mql_model::{CollectionReference, CollectionSchema, Node};

use crate::{Diagnostic, LintKind, SchemaProvider};

/// Validates the query's target against the deployment and fetches its
/// schema when the target resolves.
pub(crate) fn check<S: Clone>(
    query: &Node<S>,
    provider: &impl SchemaProvider,
    diagnostics: &mut Vec<Diagnostic<S>>,
) -> Option<CollectionSchema> {
    let Some(reference) = query.collection_reference() else {
        diagnostics.push(no_namespace(query));
        return None;
    };
    match reference {
        CollectionReference::Unknown | CollectionReference::OnlyCollection { .. } => {
            diagnostics.push(no_namespace(query));
            None
        }
        CollectionReference::Known {
            database_source,
            collection_source,
            namespace,
        } => {
            if !provider.databases().contains(&namespace.database) {
                diagnostics.push(Diagnostic {
                    kind: LintKind::DatabaseDoesNotExist,
                    source: database_source
                        .as_ref()
                        .unwrap_or(query.source())
                        .clone(),
                    message: format!("database \"{}\" does not exist", namespace.database),
                });
                return None;
            }
            if !provider
                .collections(&namespace.database)
                .contains(&namespace.collection)
            {
                diagnostics.push(Diagnostic {
                    kind: LintKind::CollectionDoesNotExist,
                    source: collection_source.clone(),
                    message: format!(
                        "collection \"{}\" does not exist in database \"{}\"",
                        namespace.collection, namespace.database
                    ),
                });
                return None;
            }
            provider.schema_of(namespace)
        }
    }
}

fn no_namespace<S: Clone>(query: &Node<S>) -> Diagnostic<S> {
    Diagnostic {
        kind: LintKind::NoNamespaceInferred,
        source: query.source().clone(),
        message: "could not determine the collection this query targets".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mql_model::{BsonType, Component, Namespace};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct OneCollection;

    impl SchemaProvider for OneCollection {
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
                    BsonType::Object(BTreeMap::from([("title".to_string(), BsonType::String)])),
                )
            })
        }
    }

    fn query_against(database: &str, collection: &str) -> Node<u32> {
        Node::new(
            0,
            vec![Component::HasCollectionReference(
                CollectionReference::Known {
                    database_source: Some(1),
                    collection_source: 2,
                    namespace: Namespace::new(database, collection),
                },
            )],
        )
    }

    #[test]
    fn a_resolved_target_yields_its_schema() {
        let mut diagnostics = Vec::new();
        let schema = check(&query_against("library", "books"), &OneCollection, &mut diagnostics);
        assert!(schema.is_some());
        assert_eq!(diagnostics, Vec::new());
    }

    #[test]
    fn missing_databases_are_reported_at_their_source() {
        let mut diagnostics = Vec::new();
        let schema = check(&query_against("archive", "books"), &OneCollection, &mut diagnostics);
        assert!(schema.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, LintKind::DatabaseDoesNotExist);
        assert_eq!(diagnostics[0].source, 1);
    }

    #[test]
    fn missing_collections_are_reported_at_their_source() {
        let mut diagnostics = Vec::new();
        check(&query_against("library", "magazines"), &OneCollection, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, LintKind::CollectionDoesNotExist);
        assert_eq!(diagnostics[0].source, 2);
    }

    #[test]
    fn unresolved_targets_are_reported_once() {
        let query: Node<u32> = Node::new(
            7,
            vec![Component::HasCollectionReference(
                CollectionReference::Unknown,
            )],
        );
        let mut diagnostics = Vec::new();
        check(&query, &OneCollection, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, LintKind::NoNamespaceInferred);
        assert_eq!(diagnostics[0].source, 7);
    }
}
