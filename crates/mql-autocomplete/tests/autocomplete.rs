use std::collections::BTreeMap;

use mql_autocomplete::{complete_fields_at, Completions, EntryKind};
use mql_java_parse::{JavaExpr, SourceSet};
use mql_linting::SchemaProvider;
use mql_model::{BsonType, CollectionSchema, Namespace};
use pretty_assertions::assert_eq;

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

/// The first string literal of the fixture, standing in for the caret.
fn first_string_literal(set: &SourceSet) -> JavaExpr<'_> {
    for id in set.file_ids() {
        if let Some(literal) = set.root(id).find_all("string_literal").into_iter().next() {
            return literal;
        }
    }
    panic!("fixture contains no string literal");
}

#[test]
fn fields_are_suggested_inside_a_filter() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoClient;
import com.mongodb.client.model.Filters;

class Repository {
    private MongoClient client;

    void run() {
        client.getDatabase("library").getCollection("books")
            .find(Filters.eq("", true));
    }
}
"#])
    .unwrap();

    // caret inside Filters.eq: the database/collection literals come first,
    // the field literal is the third
    let field_literal = set
        .root(mql_java_parse::FileId(0))
        .find_all("string_literal")
        .into_iter()
        .nth(2)
        .expect("field literal");

    let Some(Completions::Entries(entries)) = complete_fields_at(&field_literal, &Library) else {
        panic!("expected field entries");
    };
    let names: Vec<&str> = entries.iter().map(|e| e.entry.as_str()).collect();
    assert_eq!(names, vec!["title", "year"]);
    assert!(entries.iter().all(|e| e.kind == EntryKind::Field));
}

#[test]
fn positions_outside_a_query_get_no_suggestions() {
    let set = SourceSet::parse(&[r#"
class Plain {
    void run() {
        log("not a query");
    }
}
"#])
    .unwrap();

    let literal = first_string_literal(&set);
    assert_eq!(complete_fields_at(&literal, &Library), None);
}

#[test]
fn unresolved_namespaces_get_no_suggestions() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoDatabase;
import com.mongodb.client.model.Filters;

class Repository {
    private MongoDatabase database;

    void run(String name) {
        database.getCollection(name).find(Filters.eq("title", "Dune"));
    }
}
"#])
    .unwrap();

    let literal = set
        .root(mql_java_parse::FileId(0))
        .find_all("string_literal")
        .into_iter()
        .next()
        .expect("literal");
    assert_eq!(complete_fields_at(&literal, &Library), None);
}
