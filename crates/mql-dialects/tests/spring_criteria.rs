use mql_dialects::spring_criteria;
use mql_java_parse::SourceSet;
use mql_model::{
    CollectionReference, CommandType, DialectName, Name, Node, Span, ValueReference,
};
use pretty_assertions::assert_eq;

const MODEL: &str = r#"
import org.springframework.data.mongodb.core.mapping.Document;

@Document("books")
public class Book {}
"#;

fn parse_first_query(set: &SourceSet) -> Node<Span> {
    for id in set.file_ids() {
        for call in set.root(id).find_all("method_invocation") {
            if spring_criteria::is_candidate_for_query(&call) {
                let top = spring_criteria::attachment(&call).unwrap_or(call);
                return spring_criteria::parse(&top);
            }
        }
    }
    panic!("fixture contains no template query");
}

fn collection_name(node: &Node<Span>) -> Option<&str> {
    match node.collection_reference()? {
        CollectionReference::OnlyCollection { collection, .. } => Some(collection),
        CollectionReference::Known { namespace, .. } => Some(&namespace.collection),
        CollectionReference::Unknown => None,
    }
}

fn field_name(node: &Node<Span>) -> Option<&str> {
    node.field_reference().and_then(|f| f.field_name())
}

#[test]
fn template_find_with_a_criteria_query() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void released() {
        template.find(query(where("released").is(true)), Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.source_dialect(), Some(DialectName::SpringCriteria));
    assert_eq!(query.command(), Some(CommandType::FindMany));
    assert_eq!(collection_name(&query), Some("books"));

    let [filter] = query.filter() else {
        panic!("expected one filter node, got {:?}", query.filter());
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("released"));
}

#[test]
fn chained_criteria_parse_in_source_order() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void nineties() {
        template.find(query(where("year").gte(1990).lt(2000).and("released").is(true)), Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let summary: Vec<_> = query
        .filter()
        .iter()
        .map(|node| (node.named(), field_name(node).map(str::to_owned)))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some(Name::Gte), Some("year".into())),
            (Some(Name::Lt), Some("year".into())),
            (Some(Name::Eq), Some("released".into())),
        ]
    );
}

#[test]
fn criteria_combinators_nest_their_operands() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import org.springframework.data.mongodb.core.query.Criteria;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void either() {
        template.find(
            query(new Criteria().orOperator(where("hidden").is(false), where("owner").is("me"))),
            Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [or] = query.filter() else {
        panic!("expected one top filter");
    };
    assert_eq!(or.named(), Some(Name::Or));
    let fields: Vec<_> = or.filter().iter().map(field_name).collect();
    assert_eq!(fields, vec![Some("hidden"), Some("owner")]);
}

#[test]
fn find_by_id_synthesizes_the_id_filter() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;

class BookService {
    private MongoTemplate template;

    void byId(String id) {
        template.findById(id, Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::FindOne));
    let [filter] = query.filter() else {
        panic!("expected the synthesized filter");
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("_id"));
}

#[test]
fn update_first_carries_filter_and_updates() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import org.springframework.data.mongodb.core.query.Update;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void release(String title) {
        template.updateFirst(
            query(where("title").is(title)),
            new Update().set("released", true).unset("draft"),
            Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::UpdateOne));

    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(field_name(filter), Some("title"));

    let summary: Vec<_> = query
        .updates()
        .iter()
        .map(|node| (node.named(), field_name(node).map(str::to_owned)))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some(Name::Set), Some("released".into())),
            (Some(Name::Unset), Some("draft".into())),
        ]
    );
}

#[test]
fn the_static_update_factory_spells_set() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import org.springframework.data.mongodb.core.query.Update;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void releaseAll() {
        template.updateMulti(query(where("draft").is(false)), Update.update("released", true), Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::UpdateMany));
    let [set_node] = query.updates() else {
        panic!("expected one update node");
    };
    assert_eq!(set_node.named(), Some(Name::Set));
    assert_eq!(field_name(set_node), Some("released"));
    let Some(ValueReference::Constant { value, .. }) = set_node.value_reference() else {
        panic!("expected a constant value");
    };
    assert_eq!(value, &mql_model::ConstantValue::Boolean(true));
}

#[test]
fn fluent_chains_parse_like_template_methods() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void released() {
        template.query(Book.class).matching(query(where("released").is(true))).all();
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::FindMany));
    assert_eq!(collection_name(&query), Some("books"));
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(field_name(filter), Some("released"));
}

#[test]
fn fluent_update_terminals_reclassify_the_command() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import org.springframework.data.mongodb.core.query.Update;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void releaseFirst() {
        template.update(Book.class)
            .matching(query(where("draft").is(true)))
            .apply(new Update().set("released", true))
            .first();
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::UpdateOne));
    let [set_node] = query.updates() else {
        panic!("expected one update node");
    };
    assert_eq!(set_node.named(), Some(Name::Set));
}

#[test]
fn an_explicit_collection_string_overrides_the_model_class() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void archived() {
        template.find(query(where("archived").is(true)), Book.class, "archivedBooks");
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(collection_name(&query), Some("archivedBooks"));
}

#[test]
fn count_and_remove_map_to_their_commands() {
    let set = SourceSet::parse(&[MODEL, r#"
import org.springframework.data.mongodb.core.MongoTemplate;
import static org.springframework.data.mongodb.core.query.Criteria.where;
import static org.springframework.data.mongodb.core.query.Query.query;

class BookService {
    private MongoTemplate template;

    void purge() {
        template.remove(query(where("archived").is(true)), Book.class);
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::DeleteMany));
}
