use mql_dialects::driver;
use mql_java_parse::{JavaExpr, SourceSet};
use mql_model::{
    BsonType, CommandType, ConstantValue, FieldReference, Name, Node, Span, ValueReference,
};
use pretty_assertions::assert_eq;

fn parse_first_query(set: &SourceSet) -> Node<Span> {
    let query = first_candidate(set);
    driver::parse(&query)
}

fn first_candidate(set: &SourceSet) -> JavaExpr<'_> {
    for id in set.file_ids() {
        for call in set.root(id).find_all("method_invocation") {
            if driver::is_candidate_for_query(&call) {
                if let Some(top) = driver::attachment(&call) {
                    return top;
                }
            }
        }
    }
    panic!("fixture contains no driver query");
}

fn field_name(node: &Node<Span>) -> Option<&str> {
    node.field_reference().and_then(|f| f.field_name())
}

#[test]
fn find_with_an_equality_filter() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void allReleased() {
        collection.find(Filters.eq("released", true));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::FindMany));

    let [filter] = query.filter() else {
        panic!("expected one filter node, got {:?}", query.filter());
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("released"));
    let Some(ValueReference::Constant { value, ty, .. }) = filter.value_reference() else {
        panic!("expected a constant value, got {:?}", filter.value_reference());
    };
    assert_eq!(value, &ConstantValue::Boolean(true));
    // constants travel boxed, so the value type admits null
    assert_eq!(ty, &BsonType::Boolean.nullable());
}

#[test]
fn static_imports_resolve_like_qualified_calls() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import org.bson.Document;
import static com.mongodb.client.model.Filters.eq;

class Repository {
    private MongoCollection<Document> collection;

    void byTitle(String title) {
        collection.find(eq("title", title));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("title"));
    // the value is a method parameter: runtime, but typed
    assert_eq!(
        filter.value_reference().and_then(|v| v.ty()),
        Some(&BsonType::String.nullable())
    );
}

#[test]
fn boolean_combinators_nest_their_operands() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void inPrintRun() {
        collection.find(Filters.and(Filters.gte("year", 1990), Filters.lt("year", 2000)));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [and] = query.filter() else {
        panic!("expected one top filter");
    };
    assert_eq!(and.named(), Some(Name::And));

    let names: Vec<_> = and.filter().iter().map(|child| child.named()).collect();
    assert_eq!(names, vec![Some(Name::Gte), Some(Name::Lt)]);
    let fields: Vec<_> = and.filter().iter().map(field_name).collect();
    assert_eq!(fields, vec![Some("year"), Some("year")]);
}

#[test]
fn single_argument_eq_targets_the_id_field() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void byId(String id) {
        collection.find(Filters.eq(id));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("_id"));
}

#[test]
fn in_with_constant_varargs_builds_an_array_constant() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void classics() {
        collection.find(Filters.in("title", "Dune", "Neuromancer", "Hyperion"));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(filter.named(), Some(Name::In));
    let Some(ValueReference::Constant { value, ty, .. }) = filter.value_reference() else {
        panic!("expected a constant value, got {:?}", filter.value_reference());
    };
    assert_eq!(
        value,
        &ConstantValue::Array(vec![
            ConstantValue::String("Dune".into()),
            ConstantValue::String("Neuromancer".into()),
            ConstantValue::String("Hyperion".into()),
        ])
    );
    assert_eq!(
        ty,
        &BsonType::Array(Box::new(BsonType::String.nullable()))
    );
}

#[test]
fn in_with_a_runtime_iterable_keeps_the_element_type() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import java.util.List;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void byYears(List<Integer> years) {
        collection.find(Filters.in("year", years));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    let Some(ValueReference::Runtime { ty, .. }) = filter.value_reference() else {
        panic!("expected a runtime value, got {:?}", filter.value_reference());
    };
    assert_eq!(ty, &BsonType::Array(Box::new(BsonType::Int32.nullable())));
}

#[test]
fn a_leading_client_session_shifts_the_arguments() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.ClientSession;
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void inTransaction(ClientSession session) {
        collection.deleteMany(session, Filters.eq("archived", true));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::DeleteMany));
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(field_name(filter), Some("archived"));
}

#[test]
fn update_operators_parse_next_to_the_filter() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import com.mongodb.client.model.Updates;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    void release(String title) {
        collection.updateOne(
            Filters.eq("title", title),
            Updates.combine(Updates.set("released", true), Updates.unset("draft")));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::UpdateOne));

    let [combine] = query.updates() else {
        panic!("expected one update node");
    };
    assert_eq!(combine.named(), Some(Name::Combine));
    let [set_node, unset_node] = combine.filter() else {
        panic!("expected two combined updates");
    };
    assert_eq!(set_node.named(), Some(Name::Set));
    assert_eq!(field_name(set_node), Some("released"));
    assert_eq!(unset_node.named(), Some(Name::Unset));
    assert_eq!(field_name(unset_node), Some("draft"));
    assert!(unset_node.value_reference().is_none());
}

#[test]
fn filters_built_by_helper_methods_are_chased() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Bson;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    private Bson releasedFilter() {
        return Filters.eq("released", true);
    }

    void released() {
        collection.find(releasedFilter());
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(filter.named(), Some(Name::Eq));
    assert_eq!(field_name(filter), Some("released"));
}

#[test]
fn first_over_a_find_chain_is_a_single_document_read() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private MongoCollection<Document> collection;

    Document firstReleased() {
        return collection.find(Filters.eq("released", true)).first();
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::FindOne));
    let [filter] = query.filter() else {
        panic!("expected the inner find's filter");
    };
    assert_eq!(filter.named(), Some(Name::Eq));
}

#[test]
fn constants_resolve_through_static_fields() {
    let set = SourceSet::parse(&[r#"
import com.mongodb.client.MongoCollection;
import com.mongodb.client.model.Filters;
import org.bson.Document;

class Repository {
    private static final String FIELD = "re" + "leased";
    private MongoCollection<Document> collection;

    void released() {
        collection.countDocuments(Filters.eq(FIELD, 42L));
    }
}
"#])
    .unwrap();

    let query = parse_first_query(&set);
    assert_eq!(query.command(), Some(CommandType::CountDocuments));
    let [filter] = query.filter() else {
        panic!("expected one filter node");
    };
    assert_eq!(field_name(filter), Some("released"));
    assert_eq!(
        filter.value_reference().and_then(|v| v.ty()),
        Some(&BsonType::Int64.nullable())
    );
}
