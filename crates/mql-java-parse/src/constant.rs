//! Compile-time constant folding over Java expressions.

use mql_model::ConstantValue;

use crate::expr::{Definition, JavaExpr};

/// How many reference hops the resolver follows before giving up.
///
/// Guards against reference cycles (`static final String A = B; ... B = A;`)
/// which are invalid Java but perfectly representable syntax.
pub const MAX_RESOLUTION_DEPTH: usize = 32;

/// Resolves an expression to the constant it evaluates to, if the value is
/// fully decidable from the source set: literals, arithmetic negation,
/// string concatenation, and references to variables, fields and methods
/// whose value is itself constant.
pub fn resolve_constant(expr: JavaExpr<'_>) -> Option<ConstantValue> {
    resolve(expr, MAX_RESOLUTION_DEPTH)
}

fn resolve(expr: JavaExpr<'_>, depth: usize) -> Option<ConstantValue> {
    if depth == 0 {
        return None;
    }
    let expr = expr.meaningful();

    match expr.kind() {
        "string_literal" => expr.as_string_literal().map(ConstantValue::String),
        "decimal_integer_literal" | "hex_integer_literal" | "binary_integer_literal"
        | "octal_integer_literal" => parse_integer(expr.text()),
        "decimal_floating_point_literal" => parse_double(expr.text()),
        "true" => Some(ConstantValue::Boolean(true)),
        "false" => Some(ConstantValue::Boolean(false)),
        "null_literal" => Some(ConstantValue::Null),
        "character_literal" => {
            let raw = expr.text();
            let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
            Some(ConstantValue::String(crate::unescape_string_literal(inner)))
        }
        "unary_expression" => {
            let operator = expr.node().child(0)?;
            if operator.kind() != "-" {
                return None;
            }
            let operand = expr.wrap_node(expr.node().child_by_field_name("operand")?);
            match resolve(operand, depth - 1)? {
                ConstantValue::Int32(v) => Some(ConstantValue::Int32(-v)),
                ConstantValue::Int64(v) => Some(ConstantValue::Int64(-v)),
                ConstantValue::Double(v) => Some(ConstantValue::Double(-v)),
                _ => None,
            }
        }
        "binary_expression" => {
            let operator = expr.node().child_by_field_name("operator")?;
            if operator.kind() != "+" {
                return None;
            }
            let left = resolve(expr.wrap_node(expr.node().child_by_field_name("left")?), depth - 1)?;
            let right =
                resolve(expr.wrap_node(expr.node().child_by_field_name("right")?), depth - 1)?;
            fold_plus(left, right)
        }
        "identifier" | "field_access" => {
            let definition = expr.resolve()?;
            if matches!(definition, Definition::Parameter { .. }) {
                return None;
            }
            resolve(definition.initializer()?, depth - 1)
        }
        "method_invocation" => {
            let call = expr.as_method_call()?;
            if !call.args.is_empty() {
                return None;
            }
            let declaration = call.resolve_declaration()?;
            let returns = declaration.return_expressions();
            let first = resolve(*returns.first()?, depth - 1)?;
            // A method is only constant when every return agrees.
            for ret in &returns[1..] {
                if resolve(*ret, depth - 1)? != first {
                    return None;
                }
            }
            Some(first)
        }
        _ => None,
    }
}

fn fold_plus(left: ConstantValue, right: ConstantValue) -> Option<ConstantValue> {
    match (&left, &right) {
        (ConstantValue::String(_), _) | (_, ConstantValue::String(_)) => {
            Some(ConstantValue::String(format!("{left}{right}")))
        }
        (ConstantValue::Int32(a), ConstantValue::Int32(b)) => {
            Some(ConstantValue::Int32(a.wrapping_add(*b)))
        }
        (ConstantValue::Int64(a), ConstantValue::Int64(b)) => {
            Some(ConstantValue::Int64(a.wrapping_add(*b)))
        }
        (ConstantValue::Int32(a), ConstantValue::Int64(b))
        | (ConstantValue::Int64(b), ConstantValue::Int32(a)) => {
            Some(ConstantValue::Int64((*a as i64).wrapping_add(*b)))
        }
        (ConstantValue::Double(a), ConstantValue::Double(b)) => {
            Some(ConstantValue::Double(a + b))
        }
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<ConstantValue> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let (body, is_long) = match cleaned.strip_suffix(['l', 'L']) {
        Some(body) => (body, true),
        None => (cleaned.as_str(), false),
    };

    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (body, 10)
    };

    let value = i64::from_str_radix(digits, radix).ok()?;
    if is_long {
        return Some(ConstantValue::Int64(value));
    }
    match i32::try_from(value) {
        Ok(value) => Some(ConstantValue::Int32(value)),
        Err(_) => Some(ConstantValue::Int64(value)),
    }
}

fn parse_double(raw: &str) -> Option<ConstantValue> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let body = cleaned.strip_suffix(['f', 'F', 'd', 'D']).unwrap_or(&cleaned);
    body.parse::<f64>().ok().map(ConstantValue::Double)
}
