//! Checks on the fields a query reads and writes.

use std::collections::BTreeSet;

use mql_dialects::format_type;
use mql_model::{BsonType, CollectionSchema, FieldReference, Name, Node, ValueReference};

use crate::{Diagnostic, LintKind};

/// Walks every node of the query and validates field references written in
/// source against the collection schema.
pub(crate) fn check<S: Clone>(
    query: &Node<S>,
    schema: &CollectionSchema,
    diagnostics: &mut Vec<Diagnostic<S>>,
) {
    let known_fields: BTreeSet<String> = schema.all_field_names_qualified().into_iter().collect();

    query.for_each_node(&mut |node| {
        let Some(FieldReference::Known { source, field_name }) = node.field_reference() else {
            return;
        };
        if !known_fields.contains(field_name) {
            diagnostics.push(Diagnostic {
                kind: LintKind::FieldDoesNotExist,
                source: source.clone(),
                message: format!(
                    "field \"{}\" does not exist in {}",
                    field_name, schema.namespace
                ),
            });
            return;
        }
        check_value_type(node, field_name, source, schema, diagnostics);
    });
}

/// Operators whose value is compared against the field's own type. Everything
/// else (`exists`, `size`, `type`, `regex`, ..) takes operator-specific
/// arguments and is skipped.
fn is_comparison(name: Name) -> bool {
    matches!(
        name,
        Name::Eq
            | Name::Ne
            | Name::Gt
            | Name::Gte
            | Name::Lt
            | Name::Lte
            | Name::In
            | Name::Nin
            | Name::All
            | Name::Set
    )
}

fn check_value_type<S: Clone>(
    node: &Node<S>,
    field_name: &str,
    field_source: &S,
    schema: &CollectionSchema,
    diagnostics: &mut Vec<Diagnostic<S>>,
) {
    let Some(name) = node.named() else {
        return;
    };
    if !is_comparison(name) {
        return;
    }
    let Some(value_ty) = node.value_reference().and_then(ValueReference::ty) else {
        return;
    };
    // An explicit null comparison is always expressible.
    if value_ty.is_null() {
        return;
    }

    // Java reference types classify as nullable unions; the null member says
    // nothing about the field being compared.
    let value_ty = strip_null(value_ty.clone());
    // in/nin/all compare each element of the candidate array
    let value_ty = match name {
        Name::In | Name::Nin | Name::All => strip_null(element_type(&value_ty)),
        _ => value_ty,
    };

    let field_ty = schema.type_of(field_name);
    if value_ty.is_assignable_to(&field_ty) {
        return;
    }
    diagnostics.push(Diagnostic {
        kind: LintKind::FieldValueTypeMismatch,
        source: field_source.clone(),
        message: format!(
            "\"{}\" is {}, but the query compares it with {}",
            field_name,
            format_type(&field_ty),
            format_type(&value_ty)
        ),
    });
}

fn element_type(ty: &BsonType) -> BsonType {
    match ty {
        BsonType::Array(element) => (**element).clone(),
        other => other.clone(),
    }
}

fn strip_null(ty: BsonType) -> BsonType {
    match ty {
        BsonType::AnyOf(members) => {
            BsonType::any_of(members.into_iter().filter(|m| !m.is_null()))
        }
        other => other,
    }
}
