//! Dialect parser for Spring Data repository methods annotated with
//! `@Query`. The JSON filter string is opaque at this level; what the model
//! captures is the command the method runs and the collection it targets.

use mql_java_parse::{java_type_name, ClassDecl, MethodDecl};
use mql_model::{CollectionReference, CommandType, Component, DialectName, Node, Span};

use crate::document::extract_model_collection;

/// Behavior knobs for repositories. `exists = true` queries historically
/// mapped to a find, and some consumers want them reported as such.
#[derive(Clone, Debug)]
pub struct SpringQueryConfig {
    pub exists_command: CommandType,
}

impl Default for SpringQueryConfig {
    fn default() -> Self {
        SpringQueryConfig {
            exists_command: CommandType::FindOne,
        }
    }
}

/// Repository interfaces whose first type argument is the model class.
const REPOSITORY_INTERFACES: &[&str] = &[
    "MongoRepository",
    "ReactiveMongoRepository",
    "CrudRepository",
    "ListCrudRepository",
    "PagingAndSortingRepository",
    "Repository",
];

/// Parses one annotated repository method. Returns `None` when the method
/// carries no `@Query` annotation.
pub fn parse_method(
    repository: &ClassDecl<'_>,
    method: &MethodDecl<'_>,
    config: &SpringQueryConfig,
) -> Option<Node<Span>> {
    let annotation = method
        .annotations()
        .into_iter()
        .find(|a| a.simple_name == "Query")?;
    tracing::debug!(method = ?method.name(), "parsing spring @Query method");

    let command = if flag_is_set(&annotation, "count") {
        CommandType::CountDocuments
    } else if flag_is_set(&annotation, "exists") {
        config.exists_command
    } else if flag_is_set(&annotation, "delete") {
        CommandType::DeleteMany
    } else {
        command_from_return_type(method)
    };

    Some(Node::new(
        annotation.span,
        vec![
            Component::HasSourceDialect(DialectName::SpringQuery),
            Component::IsCommand(command),
            Component::HasCollectionReference(repository_collection(repository)),
        ],
    ))
}

/// Parses every `@Query` method a repository interface declares.
pub fn parse_repository(
    repository: &ClassDecl<'_>,
    config: &SpringQueryConfig,
) -> Vec<Node<Span>> {
    repository
        .methods()
        .iter()
        .filter_map(|method| parse_method(repository, method, config))
        .collect()
}

fn flag_is_set(annotation: &mql_java_parse::ParsedAnnotation, key: &str) -> bool {
    annotation.arg(key).is_some_and(|value| value.text == "true")
}

/// Without an explicit flag the return type decides: anything stream- or
/// collection-shaped reads many documents, everything else reads one.
fn command_from_return_type(method: &MethodDecl<'_>) -> CommandType {
    let Some(return_type) = method.return_type_text() else {
        return CommandType::FindOne;
    };
    if return_type.ends_with("[]") {
        return CommandType::FindMany;
    }
    let many = matches!(
        java_type_name(&return_type).as_str(),
        "Iterable"
            | "Collection"
            | "List"
            | "Set"
            | "Stream"
            | "Streamable"
            | "Iterator"
            | "Page"
            | "Slice"
            | "Window"
            | "Flux"
    );
    if many {
        CommandType::FindMany
    } else {
        CommandType::FindOne
    }
}

/// The collection comes from the model class named as the repository's first
/// type argument, through its `@Document` mapping.
fn repository_collection(repository: &ClassDecl<'_>) -> CollectionReference<Span> {
    for interface in REPOSITORY_INTERFACES {
        let arguments = repository.interface_type_arguments(interface);
        let Some(model_name) = arguments.first() else {
            continue;
        };
        let Some(model) = repository.set().class_named(&java_type_name(model_name)) else {
            return CollectionReference::Unknown;
        };
        return extract_model_collection(&model);
    }
    CollectionReference::Unknown
}
