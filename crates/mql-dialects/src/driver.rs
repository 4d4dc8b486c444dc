//! Dialect parser for queries written against the MongoDB Java driver:
//! `collection.find(Filters.eq("field", value))` and friends.

use mql_java_parse::{resolve_constant, JavaExpr, MethodCall, MAX_RESOLUTION_DEPTH};
use mql_model::{
    BsonType, CommandType, Component, ConstantValue, DialectName, FieldReference, Name, Node,
    Span, ValueReference,
};

use crate::namespace::extract_collection_reference;
use crate::pipeline::parse_pipeline;
use crate::values::{
    constant_type, field_reference_for, is_static_call_to, resolve_to_static_call,
    static_type_text, value_reference_for,
};

/// Whether an expression is the top call of a driver query.
pub fn is_candidate_for_query(expr: &JavaExpr<'_>) -> bool {
    command_for(expr) != CommandType::Unknown
}

/// The outermost ancestor that still classifies as a driver query; parsing
/// should start there so `collection.find(..).first()` is seen whole.
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

/// Parses a driver query into the dialect-independent model. Parsing never
/// fails: whatever could not be understood degrades to `Unknown` components.
pub fn parse(expr: &JavaExpr<'_>) -> Node<Span> {
    tracing::debug!(span = ?expr.span(), "parsing java-driver query");

    let dialect = Component::HasSourceDialect(DialectName::JavaDriver);
    let collection = Component::HasCollectionReference(extract_collection_reference(expr));

    let Some(call) = expr.meaningful().as_method_call() else {
        return Node::new(expr.span(), vec![dialect, collection]);
    };

    let command = command_for(expr);

    // Iterable terminals (`find(..).first()`) carry their arguments on the
    // call below the terminal.
    let query_call = match call.name {
        "first" | "cursor" | "iterator" | "into" => call
            .receiver
            .and_then(|r| r.meaningful().as_method_call())
            .unwrap_or_else(|| call.clone()),
        _ => call.clone(),
    };

    if receiver_is_collection(&query_call) {
        let mut components = vec![dialect, Component::IsCommand(command), collection];
        if command == CommandType::Aggregate {
            if let Some(arg) = argument(&query_call, 0) {
                components.push(Component::HasAggregation(parse_pipeline(&arg)));
            }
        } else {
            components.push(Component::HasFilter(filters_of(&query_call)));
            components.push(Component::HasUpdates(updates_of(&query_call)));
        }
        return Node::new(expr.span(), components);
    }

    // A call into one of the project's own methods: look for the real query
    // inside its body.
    if let Some(declaration) = query_call.resolve_declaration() {
        for ret in declaration.return_expressions() {
            for inner in ret.find_all("method_invocation") {
                let inner_query = parse(&inner);
                if !inner_query.filter().is_empty() {
                    return inner_query;
                }
            }
        }
    }

    Node::new(expr.span(), vec![dialect, collection, Component::IsCommand(command)])
}

fn command_for(expr: &JavaExpr<'_>) -> CommandType {
    let Some(call) = expr.meaningful().as_method_call() else {
        return CommandType::Unknown;
    };
    match call.name {
        "countDocuments" => CommandType::CountDocuments,
        "estimatedDocumentCount" => CommandType::EstimatedDocumentCount,
        "distinct" => CommandType::Distinct,
        "find" => CommandType::FindMany,
        "aggregate" => CommandType::Aggregate,
        "insertOne" => CommandType::InsertOne,
        "insertMany" => CommandType::InsertMany,
        "deleteOne" => CommandType::DeleteOne,
        "deleteMany" => CommandType::DeleteMany,
        "replaceOne" => CommandType::ReplaceOne,
        "updateOne" => CommandType::UpdateOne,
        "updateMany" => CommandType::UpdateMany,
        "findOneAndDelete" => CommandType::FindOneAndDelete,
        "findOneAndReplace" => CommandType::FindOneAndReplace,
        "findOneAndUpdate" => CommandType::FindOneAndUpdate,
        // `first()` closes whatever iterable the chain built.
        "first" => {
            if chain_contains(&call, "aggregate") {
                CommandType::Aggregate
            } else {
                CommandType::FindOne
            }
        }
        _ => CommandType::Unknown,
    }
}

fn chain_contains(call: &MethodCall<'_>, name: &str) -> bool {
    let mut current = call.receiver;
    while let Some(receiver) = current {
        let Some(inner) = receiver.meaningful().as_method_call() else {
            return false;
        };
        if inner.name == name {
            return true;
        }
        current = inner.receiver;
    }
    false
}

fn receiver_is_collection(call: &MethodCall<'_>) -> bool {
    let Some(receiver) = call.receiver else {
        return false;
    };
    if static_type_text(&receiver).is_some_and(|ty| ty.contains("MongoCollection")) {
        return true;
    }
    // Syntactic fallback for chains the resolver cannot type.
    let receiver = receiver.meaningful();
    if let Some(inner) = receiver.as_method_call() {
        return inner.name == "getCollection" || receiver_is_collection(&inner);
    }
    false
}

fn first_arg_is_session(call: &MethodCall<'_>) -> bool {
    call.args
        .first()
        .and_then(static_type_text)
        .is_some_and(|ty| ty.contains("ClientSession"))
}

fn argument<'s>(call: &MethodCall<'s>, index: usize) -> Option<JavaExpr<'s>> {
    let skip = usize::from(first_arg_is_session(call));
    call.args.get(index + skip).copied()
}

fn filters_of(call: &MethodCall<'_>) -> Vec<Node<Span>> {
    let Some(arg) = argument(call, 0) else {
        return Vec::new();
    };
    let Some(filter_call) = resolve_to_static_call(&arg, "Filters", MAX_RESOLUTION_DEPTH) else {
        return Vec::new();
    };
    parse_filter(&filter_call).into_iter().collect()
}

fn updates_of(call: &MethodCall<'_>) -> Vec<Node<Span>> {
    let Some(arg) = argument(call, 1) else {
        return Vec::new();
    };
    let Some(update_call) = resolve_to_static_call(&arg, "Updates", MAX_RESOLUTION_DEPTH) else {
        return Vec::new();
    };
    parse_update(&update_call).into_iter().collect()
}

pub(crate) fn parse_filter(call: &MethodCall<'_>) -> Option<Node<Span>> {
    let span = call.call.span();
    match call.name {
        "in" | "nin" => {
            let field_arg = call.args.first()?;
            let field = field_reference_for(field_arg);
            let value = in_operator_value(call);
            Some(Node::new(
                span,
                vec![
                    Component::Named(Name::from_canonical(call.name)),
                    Component::HasFieldReference(field),
                    Component::HasValueReference(value),
                ],
            ))
        }
        "and" | "or" | "nor" | "not" => Some(Node::new(
            span,
            vec![
                Component::Named(Name::from_canonical(call.name)),
                Component::HasFilter(
                    call.args
                        .iter()
                        .filter_map(|arg| {
                            resolve_to_static_call(arg, "Filters", MAX_RESOLUTION_DEPTH)
                        })
                        .filter_map(|inner| parse_filter(&inner))
                        .collect(),
                ),
            ],
        )),
        "eq" if call.args.len() == 1 => {
            // single-argument eq matches on _id
            let value_arg = call.args.first()?;
            Some(Node::new(
                span,
                vec![
                    Component::Named(Name::Eq),
                    Component::HasFieldReference(FieldReference::Known {
                        source: value_arg.span(),
                        field_name: "_id".into(),
                    }),
                    Component::HasValueReference(value_reference_for(value_arg)),
                ],
            ))
        }
        _ if call.args.len() == 2 => Some(Node::new(
            span,
            vec![
                Component::Named(Name::from_canonical(call.name)),
                Component::HasFieldReference(field_reference_for(&call.args[0])),
                Component::HasValueReference(value_reference_for(&call.args[1])),
            ],
        )),
        // not enough structure to commit to a shape
        _ => None,
    }
}

/// `in`/`nin` accept a trailing vararg, an array, or an iterable; the value
/// reference is always array-shaped.
fn in_operator_value(call: &MethodCall<'_>) -> ValueReference<Span> {
    let span = call.call.span();
    match call.args.len() {
        0 | 1 => ValueReference::Runtime {
            source: span,
            ty: BsonType::Array(Box::new(BsonType::Any)),
        },
        2 => {
            let arg = &call.args[1];
            if let Some(value) = resolve_constant(*arg) {
                let ty = BsonType::Array(Box::new(constant_type(&value)));
                return ValueReference::Constant {
                    source: arg.span(),
                    value: ConstantValue::Array(vec![value]),
                    ty,
                };
            }
            let declared = static_type_text(arg)
                .map(|ty| mql_java_parse::classify_type_text(&ty))
                .and_then(array_shape);
            ValueReference::Runtime {
                source: arg.span(),
                ty: declared.unwrap_or(BsonType::Array(Box::new(BsonType::Any))),
            }
        }
        _ => {
            let values: Vec<Option<ConstantValue>> =
                call.args[1..].iter().map(|arg| resolve_constant(*arg)).collect();
            if values.iter().all(Option::is_some) {
                let values: Vec<ConstantValue> = values.into_iter().flatten().collect();
                let element = BsonType::any_of(values.iter().map(constant_type));
                ValueReference::Constant {
                    source: span,
                    ty: BsonType::Array(Box::new(element)),
                    value: ConstantValue::Array(values),
                }
            } else {
                ValueReference::Runtime {
                    source: span,
                    ty: BsonType::Array(Box::new(BsonType::Any)),
                }
            }
        }
    }
}

fn array_shape(ty: BsonType) -> Option<BsonType> {
    match ty {
        BsonType::Array(_) => Some(ty),
        BsonType::AnyOf(members) => members
            .into_iter()
            .find(|member| matches!(member, BsonType::Array(_))),
        _ => None,
    }
}

fn parse_update(call: &MethodCall<'_>) -> Option<Node<Span>> {
    let span = call.call.span();
    match call.name {
        "combine" => Some(Node::new(
            span,
            vec![
                Component::Named(Name::Combine),
                Component::HasFilter(
                    call.args
                        .iter()
                        .filter_map(|arg| {
                            resolve_to_static_call(arg, "Updates", MAX_RESOLUTION_DEPTH)
                        })
                        .filter_map(|inner| parse_update(&inner))
                        .collect(),
                ),
            ],
        )),
        _ if call.args.len() == 2 => Some(Node::new(
            span,
            vec![
                Component::Named(Name::from_canonical(call.name)),
                Component::HasFieldReference(field_reference_for(&call.args[0])),
                Component::HasValueReference(value_reference_for(&call.args[1])),
            ],
        )),
        // one-argument operators like unset only name a field
        _ if call.args.len() == 1 => Some(Node::new(
            span,
            vec![
                Component::Named(Name::from_canonical(call.name)),
                Component::HasFieldReference(field_reference_for(&call.args[0])),
            ],
        )),
        _ => None,
    }
}

/// Whether a call belongs to the driver's `Filters`/`Updates` builder
/// surface, used to decide if a string literal is a field reference.
pub fn is_in_query(expr: &JavaExpr<'_>) -> bool {
    let mut current = Some(*expr);
    while let Some(candidate) = current {
        if let Some(call) = candidate.meaningful().as_method_call() {
            if is_static_call_to(&call, "Filters") || is_static_call_to(&call, "Updates") {
                return true;
            }
        }
        current = candidate.parent();
    }
    false
}
