//! Namespace extraction for driver-style code.
//!
//! Follows the configuration chain feeding a query call until it finds
//! `getDatabase(..)` / `getCollection(..)`, resolving intermediate variables,
//! fields (including constructor-assigned ones) and helper methods along the
//! way. Only names decidable at analysis time count: an unresolved database
//! with a resolved collection degrades to `OnlyCollection`, anything less to
//! `Unknown`.

use mql_java_parse::{resolve_constant, ClassDecl, Definition, JavaExpr, MethodCall, MethodDecl};
use mql_model::{CollectionReference, ConstantValue, Namespace, Span};

const MAX_CHAIN_HOPS: usize = 16;

pub fn extract_collection_reference(expr: &JavaExpr<'_>) -> CollectionReference<Span> {
    tracing::debug!(span = ?expr.span(), "extracting collection reference");
    let Some(call) = expr.meaningful().as_method_call() else {
        return CollectionReference::Unknown;
    };
    let Some(receiver) = call.receiver else {
        return CollectionReference::Unknown;
    };

    let mut chain = Vec::new();
    collect_chain(receiver, &mut chain, MAX_CHAIN_HOPS);

    let collection = chain
        .iter()
        .find(|c| c.name == "getCollection")
        .and_then(constant_string_arg);
    let database = chain
        .iter()
        .find(|c| c.name == "getDatabase")
        .and_then(constant_string_arg);

    match (database, collection) {
        (Some((database, database_source)), Some((collection, collection_source))) => {
            CollectionReference::Known {
                database_source: Some(database_source),
                collection_source,
                namespace: Namespace::new(database, collection),
            }
        }
        (None, Some((collection, collection_source))) => CollectionReference::OnlyCollection {
            collection_source,
            collection,
        },
        _ => CollectionReference::Unknown,
    }
}

/// Walks a receiver expression down to the driver client, pushing every
/// method call on the way. Variables and fields are chased into their
/// initializers; fields without one are looked up in constructor and setter
/// assignments of the enclosing class.
fn collect_chain<'s>(expr: JavaExpr<'s>, out: &mut Vec<MethodCall<'s>>, depth: usize) {
    if depth == 0 {
        return;
    }
    let expr = expr.meaningful();

    if let Some(call) = expr.as_method_call() {
        let receiver = call.receiver;
        let is_local_helper = receiver.is_none() || receiver.is_some_and(|r| r.is_this());
        let declaration = is_local_helper.then(|| call.resolve_declaration()).flatten();
        out.push(call);
        match (receiver, declaration) {
            // a helper like `getCollection()` defined on the same class
            (_, Some(declaration)) => {
                for ret in declaration.return_expressions() {
                    collect_chain(ret, out, depth - 1);
                }
            }
            (Some(receiver), None) => collect_chain(receiver, out, depth - 1),
            (None, None) => {}
        }
        return;
    }

    if !matches!(expr.kind(), "identifier" | "field_access" | "this") {
        return;
    }
    let Some(definition) = expr.resolve() else {
        return;
    };
    if let Some(initializer) = definition.initializer() {
        collect_chain(initializer, out, depth - 1);
        return;
    }
    if let Definition::Field(field) = definition {
        let (Some(name), Some(class)) = (field.name(), field.declaring_class()) else {
            return;
        };
        let this_name = format!("this.{name}");
        for method in class.methods() {
            let Some(body) = method.body() else {
                continue;
            };
            for assignment in body.find_all("assignment_expression") {
                let Some(left) = assignment.child_by_field("left") else {
                    continue;
                };
                if left.text() != name && left.text() != this_name {
                    continue;
                }
                let Some(right) = assignment.child_by_field("right") else {
                    continue;
                };
                // A base-class constructor taking the handle as a parameter:
                // the real chain sits at the matching position of a subclass
                // `super(..)` call.
                if method.is_constructor() {
                    if let Some(index) = parameter_index(&method, &right) {
                        if let Some(forwarded) = super_constructor_argument(&class, index) {
                            collect_chain(forwarded, out, depth - 1);
                            continue;
                        }
                    }
                }
                collect_chain(right, out, depth - 1);
            }
        }
    }
}

/// The position of a constructor parameter the assignment forwards verbatim.
fn parameter_index(method: &MethodDecl<'_>, expr: &JavaExpr<'_>) -> Option<usize> {
    let name = expr.as_identifier()?;
    method
        .parameters()
        .iter()
        .position(|(_, parameter)| parameter.as_str() == name)
}

/// Finds a subclass constructor calling `super(..)` into `base` and returns
/// its argument at `index`.
fn super_constructor_argument<'s>(
    base: &ClassDecl<'s>,
    index: usize,
) -> Option<JavaExpr<'s>> {
    let base_name = base.name()?;
    for class in base.set().classes() {
        if class.superclass_name().as_deref() != Some(base_name) {
            continue;
        }
        for constructor in class.methods() {
            if !constructor.is_constructor() {
                continue;
            }
            let Some(body) = constructor.body() else {
                continue;
            };
            for invocation in body.find_all("explicit_constructor_invocation") {
                let is_super = invocation
                    .child_by_field("constructor")
                    .is_some_and(|c| c.kind() == "super");
                if !is_super {
                    continue;
                }
                if let Some(argument) = invocation
                    .child_by_field("arguments")
                    .and_then(|arguments| arguments.named_child(index))
                {
                    return Some(argument);
                }
            }
        }
    }
    None
}

fn constant_string_arg(call: &MethodCall<'_>) -> Option<(String, Span)> {
    let arg = call.args.first()?;
    match resolve_constant(*arg) {
        Some(ConstantValue::String(value)) => Some((value, arg.span())),
        _ => None,
    }
}
