//! Dialect parser for Spring Data's `MongoTemplate` / `Criteria` API:
//! `template.find(query(where("released").is(true)), Book.class)` and the
//! fluent `template.query(Book.class).matching(..)` chains.

use mql_java_parse::{java_type_name, JavaExpr, MethodCall, MAX_RESOLUTION_DEPTH};
use mql_model::{
    CollectionReference, CommandType, Component, DialectName, FieldReference, Name, Node, Span,
    ValueReference,
};

use crate::document::extract_model_collection;
use crate::values::{field_reference_for, value_reference_for};

/// Whether an expression is the top call of a template query.
pub fn is_candidate_for_query(expr: &JavaExpr<'_>) -> bool {
    let Some(call) = expr.meaningful().as_method_call() else {
        return false;
    };
    command_for(call.name).is_some() && receiver_is_template(&call)
}

/// The outermost ancestor that still classifies as a template query.
pub fn attachment<'s>(expr: &JavaExpr<'s>) -> Option<JavaExpr<'s>> {
    let mut best = None;
    let mut current = Some(*expr);
    while let Some(candidate) = current {
        if is_candidate_for_query(&candidate) {
            best = Some(candidate);
        }
        current = candidate.parent();
    }
    best
}

pub fn parse(expr: &JavaExpr<'_>) -> Node<Span> {
    tracing::debug!(span = ?expr.span(), "parsing spring-criteria query");

    let dialect = Component::HasSourceDialect(DialectName::SpringCriteria);
    let Some(call) = expr.meaningful().as_method_call() else {
        return Node::new(expr.span(), vec![dialect]);
    };

    let chain = receiver_chain(&call);
    let command = command_for(call.name)
        .map(|command| adjust_for_fluent_update(command, &chain))
        .unwrap_or(CommandType::Unknown);
    let collection = Component::HasCollectionReference(collection_of(&call, &chain));

    let mut components = vec![dialect, Component::IsCommand(command), collection];

    if call.name == "findById" {
        components.push(Component::HasFilter(vec![find_by_id_filter(&call)]));
        return Node::new(expr.span(), components);
    }

    let filter = criteria_argument(&call, &chain)
        .map(|criteria| parse_criteria(&criteria))
        .unwrap_or_default();
    components.push(Component::HasFilter(filter));

    if let Some(update) = update_argument(&call, &chain) {
        components.push(Component::HasUpdates(parse_update_chain(&update)));
    }

    Node::new(expr.span(), components)
}

fn command_for(name: &str) -> Option<CommandType> {
    let command = match name {
        "aggregate" | "aggregateStream" => CommandType::Aggregate,
        "count" | "exactCount" => CommandType::CountDocuments,
        "estimatedCount" => CommandType::EstimatedDocumentCount,
        "exists" => CommandType::FindOne,
        "find" | "findAll" | "scroll" | "stream" | "all" => CommandType::FindMany,
        "findDistinct" => CommandType::Distinct,
        "findAllAndRemove" | "remove" => CommandType::DeleteMany,
        "findAndModify" => CommandType::FindOneAndUpdate,
        "findAndRemove" => CommandType::FindOneAndDelete,
        "findAndReplace" => CommandType::FindOneAndReplace,
        "findById" | "findOne" | "one" | "oneValue" | "first" | "firstValue" => {
            CommandType::FindOne
        }
        "insert" => CommandType::InsertOne,
        "insertAll" => CommandType::InsertMany,
        "replace" => CommandType::ReplaceOne,
        "save" | "upsert" => CommandType::Upsert,
        "updateFirst" => CommandType::UpdateOne,
        "updateMulti" => CommandType::UpdateMany,
        _ => return None,
    };
    Some(command)
}

/// `template.update(Book.class).matching(..).apply(..).first()` terminates an
/// update, not a find; the chain disambiguates the terminal.
fn adjust_for_fluent_update(command: CommandType, chain: &[MethodCall<'_>]) -> CommandType {
    if !chain.iter().any(|c| c.name == "apply") {
        return command;
    }
    match command {
        CommandType::FindOne => CommandType::UpdateOne,
        CommandType::FindMany => CommandType::UpdateMany,
        other => other,
    }
}

/// Every call from the query terminal down to the template reference,
/// outermost first, the terminal itself included.
fn receiver_chain<'s>(call: &MethodCall<'s>) -> Vec<MethodCall<'s>> {
    let mut out = vec![call.clone()];
    let mut current = call.receiver;
    while let Some(receiver) = current {
        let Some(inner) = receiver.meaningful().as_method_call() else {
            break;
        };
        current = inner.receiver;
        out.push(inner);
    }
    out
}

fn receiver_is_template(call: &MethodCall<'_>) -> bool {
    let chain = receiver_chain(call);
    let Some(bottom) = chain.last() else {
        return false;
    };
    let Some(receiver) = bottom.receiver else {
        return false;
    };
    crate::values::static_type_text(&receiver).is_some_and(|ty| {
        ty.contains("MongoTemplate") || ty.contains("MongoOperations")
    })
}

/// Where the query stores or reads documents. Fluent chains carry the model
/// class in `query(Book.class)` / `update(Book.class)`; template methods take
/// it as a trailing argument, optionally overridden by an explicit collection
/// name string.
fn collection_of(call: &MethodCall<'_>, chain: &[MethodCall<'_>]) -> CollectionReference<Span> {
    if let Some(last) = call.args.last() {
        if call.args.len() >= 2 {
            if let Some(mql_model::ConstantValue::String(collection)) =
                mql_java_parse::resolve_constant(*last)
            {
                return CollectionReference::OnlyCollection {
                    collection_source: last.span(),
                    collection,
                };
            }
        }
    }
    for link in chain {
        for arg in &link.args {
            let Some(class_name) = class_literal_name(arg) else {
                continue;
            };
            let Some(class) = arg.set().class_named(&class_name) else {
                return CollectionReference::Unknown;
            };
            return extract_model_collection(&class);
        }
    }
    CollectionReference::Unknown
}

fn class_literal_name(expr: &JavaExpr<'_>) -> Option<String> {
    let expr = expr.meaningful();
    if expr.kind() != "class_literal" {
        return None;
    }
    expr.text().strip_suffix(".class").map(java_type_name)
}

/// `findById(id, Book.class)` has no criteria in source; the `_id` equality
/// is implied.
fn find_by_id_filter(call: &MethodCall<'_>) -> Node<Span> {
    let value = call
        .args
        .first()
        .map(value_reference_for)
        .unwrap_or(ValueReference::Unknown);
    let source = call.args.first().map(|a| a.span()).unwrap_or(call.call.span());
    Node::new(
        call.call.span(),
        vec![
            Component::Named(Name::Eq),
            Component::HasFieldReference(FieldReference::Inferred {
                field_name: "_id".into(),
            }),
            Component::HasValueReference(match value {
                ValueReference::Unknown => ValueReference::Runtime {
                    source,
                    ty: mql_model::BsonType::Any,
                },
                other => other,
            }),
        ],
    )
}

/// Finds the criteria expression feeding the query: the first argument of a
/// template method, or the `matching(..)` link of a fluent chain.
fn criteria_argument<'s>(
    call: &MethodCall<'s>,
    chain: &[MethodCall<'s>],
) -> Option<JavaExpr<'s>> {
    if let Some(matching) = chain.iter().find(|c| c.name == "matching") {
        return matching.args.first().copied();
    }
    call.args
        .first()
        .copied()
        .filter(|_| !matches!(call.name, "save" | "insert" | "insertAll" | "replace"))
}

fn update_argument<'s>(call: &MethodCall<'s>, chain: &[MethodCall<'s>]) -> Option<JavaExpr<'s>> {
    if let Some(apply) = chain.iter().find(|c| c.name == "apply") {
        return apply.args.first().copied();
    }
    matches!(
        call.name,
        "updateFirst" | "updateMulti" | "upsert" | "findAndModify"
    )
    .then(|| call.args.get(1).copied())
    .flatten()
}

/// Parses a criteria expression into filter nodes in source order.
///
/// A chain like `where("a").is(1).and("b").gt(2)` arrives tail-first, so the
/// calls are collected and walked in reverse: `where`/`and` set the current
/// field, operator calls close over it.
pub(crate) fn parse_criteria(expr: &JavaExpr<'_>) -> Vec<Node<Span>> {
    let Some(criteria) = resolve_criteria(expr, MAX_RESOLUTION_DEPTH) else {
        return Vec::new();
    };
    let mut links = receiver_chain(&criteria);
    links.reverse();

    let mut nodes = Vec::new();
    // `new Criteria("field")` seeds the chain the same way `where` does.
    let mut field: Option<FieldReference<Span>> = links
        .first()
        .and_then(|bottom| bottom.receiver)
        .and_then(|r| r.meaningful().as_object_creation())
        .filter(|(ty, _)| ty == "Criteria")
        .and_then(|(_, args)| args.first().map(|arg| field_reference_for(arg)));
    for link in links {
        match link.name {
            "where" | "and" => {
                field = link.args.first().map(field_reference_for);
            }
            "andOperator" | "orOperator" | "norOperator" => {
                let name = Name::from_canonical(link.name.trim_end_matches("Operator"));
                let children = link.args.iter().flat_map(|arg| parse_criteria(arg)).collect();
                nodes.push(Node::new(
                    link.call.span(),
                    vec![Component::Named(name), Component::HasFilter(children)],
                ));
            }
            "not" => {
                // `not()` negates the next operator in the chain; modeled as
                // a bare named node so consumers still see the operator list.
                nodes.push(Node::new(
                    link.call.span(),
                    vec![Component::Named(Name::Not)],
                ));
            }
            operator => {
                let mut components = vec![Component::Named(Name::from_canonical(operator))];
                if let Some(field) = field.clone() {
                    components.push(Component::HasFieldReference(field));
                }
                if let Some(value) = link.args.first() {
                    components.push(Component::HasValueReference(value_reference_for(value)));
                }
                nodes.push(Node::new(link.call.span(), components));
            }
        }
    }
    nodes
}

/// Unwraps `query(..)`, `new Query(..)` and variables down to the criteria
/// chain itself.
fn resolve_criteria<'s>(expr: &JavaExpr<'s>, depth: usize) -> Option<MethodCall<'s>> {
    if depth == 0 {
        return None;
    }
    let expr = expr.meaningful();
    if let Some((type_name, args)) = expr.as_object_creation() {
        if type_name == "Query" || type_name == "BasicQuery" {
            return resolve_criteria(args.first()?, depth - 1);
        }
        return None;
    }
    if let Some(call) = expr.as_method_call() {
        if call.name == "query" {
            return resolve_criteria(call.args.first()?, depth - 1);
        }
        if is_criteria_chain(&call) {
            return Some(call);
        }
        let declaration = call.resolve_declaration()?;
        return declaration
            .return_expressions()
            .into_iter()
            .find_map(|ret| resolve_criteria(&ret, depth - 1));
    }
    resolve_criteria(&expr.resolve()?.initializer()?, depth - 1)
}

/// `new Update().set("a", 1).unset("b")` and `Update.update("a", 1)` chains,
/// parsed into update nodes in source order.
pub(crate) fn parse_update_chain(expr: &JavaExpr<'_>) -> Vec<Node<Span>> {
    let Some(update) = resolve_update(expr, MAX_RESOLUTION_DEPTH) else {
        return Vec::new();
    };
    let mut links = receiver_chain(&update);
    links.reverse();

    let mut nodes = Vec::new();
    for link in links {
        // the static factory spells set as `update`
        let name = match link.name {
            "update" => Name::Set,
            other => Name::from_canonical(other),
        };
        let mut components = vec![Component::Named(name)];
        if let Some(field) = link.args.first() {
            components.push(Component::HasFieldReference(field_reference_for(field)));
        }
        if let Some(value) = link.args.get(1) {
            components.push(Component::HasValueReference(value_reference_for(value)));
        }
        nodes.push(Node::new(link.call.span(), components));
    }
    nodes
}

fn resolve_update<'s>(expr: &JavaExpr<'s>, depth: usize) -> Option<MethodCall<'s>> {
    if depth == 0 {
        return None;
    }
    let expr = expr.meaningful();
    if let Some(call) = expr.as_method_call() {
        if is_update_chain(&call) {
            return Some(call);
        }
        let declaration = call.resolve_declaration()?;
        return declaration
            .return_expressions()
            .into_iter()
            .find_map(|ret| resolve_update(&ret, depth - 1));
    }
    resolve_update(&expr.resolve()?.initializer()?, depth - 1)
}

fn is_update_chain(call: &MethodCall<'_>) -> bool {
    let chain = receiver_chain(call);
    let Some(bottom) = chain.last() else {
        return false;
    };
    if bottom.name == "update" {
        return true;
    }
    bottom
        .receiver
        .is_some_and(|r| r.meaningful().as_object_creation().is_some_and(|(ty, _)| ty == "Update"))
}

/// A criteria chain bottoms out at `Criteria.where(..)` (or a static-imported
/// `where(..)`), or at a `new Criteria(..)`.
fn is_criteria_chain(call: &MethodCall<'_>) -> bool {
    let chain = receiver_chain(call);
    let Some(bottom) = chain.last() else {
        return false;
    };
    if bottom.name == "where" {
        return true;
    }
    bottom
        .receiver
        .is_some_and(|r| r.meaningful().as_object_creation().is_some_and(|(ty, _)| ty == "Criteria"))
}
