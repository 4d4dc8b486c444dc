//! Renders model types the way a Java driver user would write them.

use mql_model::BsonType;

/// Formats a type for display in driver-flavored surfaces (completion,
/// inlay text). Primitives use the unboxed spelling; a union with `Null`
/// renders as the boxed form of the remaining type.
pub fn format_type(ty: &BsonType) -> String {
    match ty {
        BsonType::Double => "double".into(),
        BsonType::String => "String".into(),
        BsonType::Object(_) => "Object".into(),
        BsonType::Array(element) => format!("List<{}>", format_type_nullable(element)),
        BsonType::ObjectId => "ObjectId".into(),
        BsonType::Boolean => "boolean".into(),
        BsonType::Date => "Date".into(),
        BsonType::Null => "null".into(),
        BsonType::Int32 => "int".into(),
        BsonType::Int64 => "long".into(),
        BsonType::Decimal128 => "BigDecimal".into(),
        BsonType::Any => "any".into(),
        BsonType::AnyOf(members) => {
            if members.contains(&BsonType::Null) {
                let rest = BsonType::any_of(
                    members.iter().filter(|m| !m.is_null()).cloned(),
                );
                format_type_nullable(&rest)
            } else {
                let mut formatted: Vec<String> = members.iter().map(format_type).collect();
                formatted.sort();
                formatted.join(" | ")
            }
        }
    }
}

fn format_type_nullable(ty: &BsonType) -> String {
    match ty {
        BsonType::Double => "Double".into(),
        BsonType::Boolean => "Boolean".into(),
        BsonType::Int32 => "Integer".into(),
        BsonType::Int64 => "Long".into(),
        BsonType::Array(element) => format!("List<{}>", format_type_nullable(element)),
        BsonType::AnyOf(members) => {
            // In nullable position `Null` is already implied by the boxing.
            match BsonType::any_of(members.iter().filter(|m| !m.is_null()).cloned()) {
                BsonType::AnyOf(rest) => {
                    let mut formatted: Vec<String> = rest.iter().map(format_type_nullable).collect();
                    formatted.sort();
                    formatted.join(" | ")
                }
                other => format_type_nullable(&other),
            }
        }
        other => format_type(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives_use_unboxed_spelling() {
        assert_eq!(format_type(&BsonType::Int32), "int");
        assert_eq!(format_type(&BsonType::Int64), "long");
        assert_eq!(format_type(&BsonType::Boolean), "boolean");
        assert_eq!(format_type(&BsonType::String), "String");
        assert_eq!(format_type(&BsonType::Decimal128), "BigDecimal");
    }

    #[test]
    fn nullable_unions_use_the_boxed_form() {
        assert_eq!(format_type(&BsonType::Int32.nullable()), "Integer");
        assert_eq!(format_type(&BsonType::Boolean.nullable()), "Boolean");
        assert_eq!(format_type(&BsonType::String.nullable()), "String");
        assert_eq!(format_type(&BsonType::Date.nullable()), "Date");
    }

    #[test]
    fn arrays_format_as_lists_of_boxed_elements() {
        assert_eq!(
            format_type(&BsonType::Array(Box::new(BsonType::Int32))),
            "List<Integer>"
        );
        assert_eq!(
            format_type(&BsonType::Array(Box::new(BsonType::Int32.nullable())).nullable()),
            "List<Integer>"
        );
    }

    #[test]
    fn non_nullable_unions_join_sorted_members() {
        assert_eq!(
            format_type(&BsonType::any_of([BsonType::String, BsonType::Int32])),
            "String | int"
        );
    }
}
