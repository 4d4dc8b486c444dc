//! Aggregation pipeline parsing for the driver dialect.
//!
//! Pipelines arrive as `List.of(..)` / `Arrays.asList(..)` of `Aggregates.*`
//! stage builders, possibly behind variables or helper methods. Each stage
//! becomes one node; stages we do not model keep their position as an
//! unnamed node so downstream consumers see the pipeline's true length.

use mql_java_parse::{resolve_constant, JavaExpr, MethodCall, MAX_RESOLUTION_DEPTH};
use mql_model::{
    Component, ConstantValue, FieldReference, Name, Node, Span, ValueReference,
};

use crate::values::{
    computed_value, constant_type, field_reference_for, resolve_to_static_call,
    value_reference_for,
};

pub(crate) fn parse_pipeline(arg: &JavaExpr<'_>) -> Vec<Node<Span>> {
    let Some(stages) = resolve_stage_list(arg, MAX_RESOLUTION_DEPTH) else {
        return Vec::new();
    };
    stages.iter().map(parse_stage).collect()
}

/// Chases the pipeline argument to a literal stage list.
fn resolve_stage_list<'s>(expr: &JavaExpr<'s>, depth: usize) -> Option<Vec<JavaExpr<'s>>> {
    if depth == 0 {
        return None;
    }
    let expr = expr.meaningful();
    if let Some(call) = expr.as_method_call() {
        if is_list_factory(&call) {
            return Some(call.args);
        }
        let declaration = call.resolve_declaration()?;
        return declaration
            .return_expressions()
            .into_iter()
            .find_map(|ret| resolve_stage_list(&ret, depth - 1));
    }
    resolve_stage_list(&expr.resolve()?.initializer()?, depth - 1)
}

fn is_list_factory(call: &MethodCall<'_>) -> bool {
    let receiver = call
        .receiver
        .map(|r| r.meaningful())
        .filter(|r| r.kind() == "identifier")
        .map(|r| r.text().to_owned());
    matches!(
        (receiver.as_deref(), call.name),
        (Some("List"), "of") | (Some("Arrays"), "asList") | (Some("ImmutableList"), "of")
    )
}

fn parse_stage(expr: &JavaExpr<'_>) -> Node<Span> {
    let span = expr.span();
    let Some(stage) = resolve_to_static_call(expr, "Aggregates", MAX_RESOLUTION_DEPTH) else {
        return Node::new(span, vec![Component::Named(Name::Unknown)]);
    };
    let named = Component::Named(Name::from_canonical(stage.name));
    match stage.name {
        "match" => {
            let filters = stage
                .args
                .first()
                .and_then(|arg| resolve_to_static_call(arg, "Filters", MAX_RESOLUTION_DEPTH))
                .and_then(|call| crate::driver::parse_filter(&call))
                .into_iter()
                .collect();
            Node::new(span, vec![named, Component::HasFilter(filters)])
        }
        "project" => {
            let projections = stage
                .args
                .first()
                .and_then(|arg| resolve_to_static_call(arg, "Projections", MAX_RESOLUTION_DEPTH))
                .map(|call| parse_projections(&call))
                .unwrap_or_default();
            Node::new(span, vec![named, Component::HasProjections(projections)])
        }
        "sort" => {
            let sorts = stage
                .args
                .first()
                .and_then(|arg| resolve_to_static_call(arg, "Sorts", MAX_RESOLUTION_DEPTH))
                .map(|call| parse_sorts(&call))
                .unwrap_or_default();
            Node::new(span, vec![named, Component::HasSorts(sorts)])
        }
        "group" => parse_group(&stage, span),
        "addFields" => {
            let fields = stage.args.iter().filter_map(parse_added_field).collect();
            Node::new(span, vec![named, Component::HasAddedFields(fields)])
        }
        "unwind" => {
            let field = stage
                .args
                .first()
                .copied()
                .map(unwind_field_reference)
                .unwrap_or(FieldReference::Unknown);
            Node::new(span, vec![named, Component::HasFieldReference(field)])
        }
        _ => Node::new(span, vec![Component::Named(Name::Unknown)]),
    }
}

fn parse_projections(call: &MethodCall<'_>) -> Vec<Node<Span>> {
    match call.name {
        "include" | "exclude" => {
            let weight = if call.name == "include" { 1 } else { -1 };
            call.args
                .iter()
                .map(|arg| {
                    Node::new(
                        arg.span(),
                        vec![
                            Component::Named(Name::from_canonical(call.name)),
                            Component::HasFieldReference(field_reference_for(arg)),
                            Component::HasValueReference(ValueReference::Inferred { value: weight }),
                        ],
                    )
                })
                .collect()
        }
        // excludeId never names the field in source
        "excludeId" => vec![Node::new(
            call.call.span(),
            vec![
                Component::Named(Name::Exclude),
                Component::HasFieldReference(FieldReference::Inferred {
                    field_name: "_id".into(),
                }),
                Component::HasValueReference(ValueReference::Inferred { value: -1 }),
            ],
        )],
        "fields" => call
            .args
            .iter()
            .filter_map(|arg| resolve_to_static_call(arg, "Projections", MAX_RESOLUTION_DEPTH))
            .flat_map(|inner| parse_projections(&inner))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_sorts(call: &MethodCall<'_>) -> Vec<Node<Span>> {
    match call.name {
        "ascending" | "descending" => {
            let weight = if call.name == "ascending" { 1 } else { -1 };
            call.args
                .iter()
                .map(|arg| {
                    Node::new(
                        arg.span(),
                        vec![
                            Component::Named(Name::from_canonical(call.name)),
                            Component::HasFieldReference(field_reference_for(arg)),
                            Component::HasValueReference(ValueReference::Inferred { value: weight }),
                        ],
                    )
                })
                .collect()
        }
        "orderBy" => call
            .args
            .iter()
            .filter_map(|arg| resolve_to_static_call(arg, "Sorts", MAX_RESOLUTION_DEPTH))
            .flat_map(|inner| parse_sorts(&inner))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_group(stage: &MethodCall<'_>, span: Span) -> Node<Span> {
    // the group key always lands in _id
    let id_value = match stage.args.first() {
        Some(arg) => match resolve_constant(*arg) {
            Some(value) => ValueReference::Constant {
                source: arg.span(),
                ty: constant_type(&value),
                value,
            },
            None => computed_value(arg),
        },
        None => ValueReference::Unknown,
    };
    let accumulators = stage
        .args
        .iter()
        .skip(1)
        .filter_map(|arg| resolve_to_static_call(arg, "Accumulators", MAX_RESOLUTION_DEPTH))
        .filter_map(|call| parse_accumulator(&call))
        .collect();
    Node::new(
        span,
        vec![
            Component::Named(Name::Group),
            Component::HasFieldReference(FieldReference::Inferred {
                field_name: "_id".into(),
            }),
            Component::HasValueReference(id_value),
            Component::HasAccumulatedFields(accumulators),
        ],
    )
}

fn parse_accumulator(call: &MethodCall<'_>) -> Option<Node<Span>> {
    let name_arg = call.args.first()?;
    let field = match resolve_constant(*name_arg) {
        Some(ConstantValue::String(field_name)) => FieldReference::Computed { field_name },
        _ => FieldReference::Unknown,
    };
    let value = call
        .args
        .last()
        .filter(|_| call.args.len() > 1)
        .map(computed_value)
        .unwrap_or(ValueReference::Unknown);
    Some(Node::new(
        call.call.span(),
        vec![
            Component::Named(Name::from_canonical(call.name)),
            Component::HasFieldReference(field),
            Component::HasValueReference(value),
        ],
    ))
}

fn parse_added_field(arg: &JavaExpr<'_>) -> Option<Node<Span>> {
    let arg = arg.meaningful();
    let (type_name, ctor_args) = arg.as_object_creation()?;
    if type_name != "Field" && !type_name.starts_with("Field<") {
        return None;
    }
    let [name_arg, value_arg] = ctor_args.as_slice() else {
        return None;
    };
    Some(Node::new(
        arg.span(),
        vec![
            Component::HasFieldReference(field_reference_for(name_arg)),
            Component::HasValueReference(value_reference_for(value_arg)),
        ],
    ))
}

/// `$field` path syntax with the sigil stripped.
fn unwind_field_reference(arg: JavaExpr<'_>) -> FieldReference<Span> {
    match resolve_constant(arg) {
        Some(ConstantValue::String(path)) => FieldReference::Known {
            source: arg.span(),
            field_name: path.trim_start_matches('$').to_owned(),
        },
        _ => FieldReference::Unknown,
    }
}
