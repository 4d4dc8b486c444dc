//! Shared field/value resolution used by every dialect parser.

use mql_java_parse::{classify_type_text, resolve_constant, JavaExpr, MethodCall};
use mql_model::{BsonType, Component, ConstantValue, FieldReference, Node, Span, ValueReference};

/// A field argument: a compile-time string, or nothing we can say.
pub(crate) fn field_reference_for(expr: &JavaExpr<'_>) -> FieldReference<Span> {
    match resolve_constant(*expr) {
        Some(ConstantValue::String(field_name)) => FieldReference::Known {
            source: expr.span(),
            field_name,
        },
        _ => FieldReference::Unknown,
    }
}

/// A value argument: constant if decidable, runtime-typed if the declared
/// Java type is visible, unknown otherwise.
pub(crate) fn value_reference_for(expr: &JavaExpr<'_>) -> ValueReference<Span> {
    if let Some(value) = resolve_constant(*expr) {
        let ty = constant_type(&value);
        return ValueReference::Constant {
            source: expr.span(),
            value,
            ty,
        };
    }
    match static_type_text(expr) {
        Some(ty) => ValueReference::Runtime {
            source: expr.span(),
            ty: classify_type_text(&ty),
        },
        None => ValueReference::Unknown,
    }
}

/// The type a resolved constant reaches the driver as. Literals travel boxed,
/// so every non-null constant admits `null` next to its value type; array
/// constants keep the union element-wise.
pub(crate) fn constant_type(value: &ConstantValue) -> BsonType {
    match value {
        ConstantValue::Null => BsonType::Null,
        ConstantValue::Array(items) => {
            BsonType::Array(Box::new(BsonType::any_of(items.iter().map(constant_type))))
        }
        other => other.bson_type().nullable(),
    }
}

/// A server-side expression (`"$field"`, accumulator bodies): wrapped as a
/// computed node carrying whatever we could resolve about it.
pub(crate) fn computed_value(expr: &JavaExpr<'_>) -> ValueReference<Span> {
    ValueReference::Computed {
        node: Box::new(Node::new(
            expr.span(),
            vec![Component::HasValueReference(value_reference_for(expr))],
        )),
    }
}

/// The declared Java type of an expression, where the source set knows it.
pub(crate) fn static_type_text(expr: &JavaExpr<'_>) -> Option<String> {
    let expr = expr.meaningful();
    if let Some(call) = expr.as_method_call() {
        return call.resolve_declaration()?.return_type_text();
    }
    if let Some((ty, _)) = expr.as_object_creation() {
        return Some(ty);
    }
    expr.resolve()?.type_text()
}

/// Whether a call is (syntactically) a static call into a known library
/// class: `Filters.eq(..)`, or a bare `eq(..)` under a matching static
/// import.
pub(crate) fn is_static_call_to(call: &MethodCall<'_>, class_name: &str) -> bool {
    if let Some(receiver) = &call.receiver {
        let receiver = receiver.meaningful();
        if !matches!(receiver.kind(), "identifier" | "field_access") {
            return false;
        }
        let text = receiver.text();
        return text.rsplit('.').next().unwrap_or(text) == class_name;
    }

    let file = call.call.set().file(call.call.file_id());
    let wildcard = format!(".{class_name}.*");
    let exact = format!(".{class_name}.{}", call.name);
    file.imports()
        .iter()
        .any(|import| import.is_static && (import.path.ends_with(&wildcard) || import.path.ends_with(&exact)))
}

/// Follows variables, fields and helper methods until a static call into
/// `class_name` appears, or gives up.
pub(crate) fn resolve_to_static_call<'s>(
    expr: &JavaExpr<'s>,
    class_name: &str,
    depth: usize,
) -> Option<MethodCall<'s>> {
    if depth == 0 {
        return None;
    }
    let expr = expr.meaningful();
    if let Some(call) = expr.as_method_call() {
        if is_static_call_to(&call, class_name) {
            return Some(call);
        }
        let declaration = call.resolve_declaration()?;
        return declaration
            .return_expressions()
            .into_iter()
            .find_map(|ret| resolve_to_static_call(&ret, class_name, depth - 1));
    }

    let definition = expr.resolve()?;
    resolve_to_static_call(&definition.initializer()?, class_name, depth - 1)
}
