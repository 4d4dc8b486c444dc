//! Sampled shape of a collection, used to validate field references.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{BsonType, Namespace};

/// The merged shape of the documents sampled from one collection.
///
/// `data` is the root document type, usually a [`BsonType::Object`]. Fields
/// observed with several types show up as [`BsonType::AnyOf`] unions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub namespace: Namespace,
    pub data: BsonType,
}

impl CollectionSchema {
    pub fn new(namespace: Namespace, data: BsonType) -> Self {
        Self { namespace, data }
    }

    /// The type of a field addressed with dot notation (`"address.city"`).
    ///
    /// Arrays are transparent, matching server semantics: `"tags.label"`
    /// addresses the `label` field of the array's elements. A path that leads
    /// nowhere is `Null` (the type of a missing field).
    pub fn type_of(&self, dotted_path: &str) -> BsonType {
        let mut current = self.data.clone();
        for segment in dotted_path.split('.') {
            current = step_into(&current, segment);
            if current.is_null() {
                break;
            }
        }
        current
    }

    /// Every field the schema knows about, as sorted dotted paths.
    ///
    /// Nested objects contribute both the parent path and the qualified leaf
    /// paths; unions and arrays are traversed.
    pub fn all_field_names_qualified(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        collect_names(&self.data, "", &mut names);
        names.into_iter().collect()
    }
}

fn step_into(ty: &BsonType, segment: &str) -> BsonType {
    match ty {
        BsonType::Object(fields) => fields.get(segment).cloned().unwrap_or(BsonType::Null),
        BsonType::Array(element) => step_into(element, segment),
        BsonType::AnyOf(members) => {
            BsonType::any_of(members.iter().map(|member| step_into(member, segment)))
        }
        _ => BsonType::Null,
    }
}

fn collect_names(ty: &BsonType, prefix: &str, into: &mut BTreeSet<String>) {
    match ty {
        BsonType::Object(fields) => {
            for (name, field_ty) in fields {
                let qualified = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                collect_names(field_ty, &qualified, into);
                into.insert(qualified);
            }
        }
        BsonType::Array(element) => collect_names(element, prefix, into),
        BsonType::AnyOf(members) => {
            for member in members {
                collect_names(member, prefix, into);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn sample_schema() -> CollectionSchema {
        let address = BsonType::Object(BTreeMap::from([
            ("city".to_string(), BsonType::String),
            ("zip".to_string(), BsonType::any_of([BsonType::String, BsonType::Int32])),
        ]));
        let tags = BsonType::Array(Box::new(BsonType::Object(BTreeMap::from([(
            "label".to_string(),
            BsonType::String,
        )]))));
        CollectionSchema::new(
            Namespace::new("prod", "users"),
            BsonType::Object(BTreeMap::from([
                ("_id".to_string(), BsonType::ObjectId),
                ("address".to_string(), address),
                ("tags".to_string(), tags),
            ])),
        )
    }

    #[test]
    fn type_of_resolves_dotted_paths() {
        let schema = sample_schema();
        assert_eq!(schema.type_of("_id"), BsonType::ObjectId);
        assert_eq!(schema.type_of("address.city"), BsonType::String);
        assert_eq!(
            schema.type_of("address.zip"),
            BsonType::any_of([BsonType::String, BsonType::Int32])
        );
    }

    #[test]
    fn type_of_looks_through_arrays() {
        assert_eq!(sample_schema().type_of("tags.label"), BsonType::String);
    }

    #[test]
    fn missing_paths_type_as_null() {
        let schema = sample_schema();
        assert_eq!(schema.type_of("nope"), BsonType::Null);
        assert_eq!(schema.type_of("address.country"), BsonType::Null);
        assert_eq!(schema.type_of("_id.inner"), BsonType::Null);
    }

    #[test]
    fn qualified_names_cover_nested_and_array_fields() {
        assert_eq!(
            sample_schema().all_field_names_qualified(),
            vec![
                "_id".to_string(),
                "address".to_string(),
                "address.city".to_string(),
                "address.zip".to_string(),
                "tags".to_string(),
                "tags.label".to_string(),
            ]
        );
    }
}
