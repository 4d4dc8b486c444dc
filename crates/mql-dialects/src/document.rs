//! Maps Spring Data model classes to the collection they are stored in.
//!
//! `@Document("name")` and `@Document(collection = "name")` name the
//! collection explicitly; an annotated class without either stores into the
//! decapitalized class name. A class without the annotation inherits it from
//! its superclass or interfaces.

use mql_java_parse::ClassDecl;
use mql_model::{CollectionReference, Span};

const MAX_HIERARCHY_HOPS: usize = 8;

/// The collection a model class maps to. The database is configured outside
/// the source code, so the best possible answer is `OnlyCollection`.
pub fn extract_model_collection(class: &ClassDecl<'_>) -> CollectionReference<Span> {
    collection_of(class, MAX_HIERARCHY_HOPS).unwrap_or(CollectionReference::Unknown)
}

fn collection_of(class: &ClassDecl<'_>, depth: usize) -> Option<CollectionReference<Span>> {
    if depth == 0 {
        return None;
    }
    for annotation in class.annotations() {
        if annotation.simple_name != "Document" {
            continue;
        }
        let explicit = annotation
            .string_arg("value")
            .or_else(|| annotation.string_arg("collection"))
            .filter(|(name, _)| !name.trim().is_empty());
        if let Some((collection, collection_source)) = explicit {
            return Some(CollectionReference::OnlyCollection {
                collection_source,
                collection: collection.to_owned(),
            });
        }
        let name = class.name()?;
        return Some(CollectionReference::OnlyCollection {
            collection_source: annotation.span,
            collection: decapitalize(name),
        });
    }

    // Unannotated: the mapping may live on a parent type.
    let set = class.set();
    if let Some(parent) = class.superclass_name().and_then(|n| set.class_named(&n)) {
        if let Some(reference) = collection_of(&parent, depth - 1) {
            return Some(reference);
        }
    }
    for interface in class.interface_names() {
        if let Some(parent) = set.class_named(&interface) {
            if let Some(reference) = collection_of(&parent, depth - 1) {
                return Some(reference);
            }
        }
    }
    None
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
