//! Mapping of Java type names onto the model's BSON type vocabulary.

use mql_model::BsonType;

/// The simple (unqualified) name of a type-like string, with whitespace,
/// generic arguments and array suffixes stripped.
pub fn java_type_name(raw: &str) -> String {
    let compact: String = raw.split_whitespace().collect();
    let no_generics = strip_generic_args(&compact);
    let no_array = no_generics.trim_end_matches("[]");
    no_array.rsplit('.').next().unwrap_or(no_array).to_string()
}

/// Classifies a Java type by its source text.
///
/// Primitives map straight to their BSON counterpart. Boxed and reference
/// types additionally admit `null`, so they classify as a union with `Null`.
/// Arrays and the common collection interfaces become `Array` of the element
/// type. Anything unrecognized is `Any`, never an error: an unknown type must
/// not produce false lint positives downstream.
pub fn classify_type_text(raw: &str) -> BsonType {
    let compact: String = raw.split_whitespace().collect();
    if compact.is_empty() {
        return BsonType::Any;
    }
    if let Some(element) = compact.strip_suffix("[]") {
        return BsonType::Array(Box::new(classify_type_text(element))).nullable();
    }

    match java_type_name(&compact).as_str() {
        "boolean" => BsonType::Boolean,
        "byte" | "short" | "int" => BsonType::Int32,
        "long" => BsonType::Int64,
        "float" | "double" => BsonType::Double,

        "Boolean" => BsonType::Boolean.nullable(),
        "Byte" | "Short" | "Integer" | "AtomicInteger" => BsonType::Int32.nullable(),
        "Long" | "BigInteger" | "AtomicLong" => BsonType::Int64.nullable(),
        "Float" | "Double" => BsonType::Double.nullable(),
        "BigDecimal" | "Decimal128" => BsonType::Decimal128.nullable(),
        "String" | "CharSequence" => BsonType::String.nullable(),
        "Date" | "Instant" | "LocalDate" | "LocalDateTime" | "LocalTime" => {
            BsonType::Date.nullable()
        }
        "ObjectId" => BsonType::ObjectId.nullable(),

        "Collection" | "Iterable" | "List" | "ArrayList" | "LinkedList" | "Set" | "HashSet"
        | "LinkedHashSet" | "SortedSet" | "TreeSet" => {
            let element = first_generic_arg(&compact)
                .map(|arg| classify_type_text(arg))
                .unwrap_or(BsonType::Any);
            BsonType::Array(Box::new(element)).nullable()
        }

        _ => BsonType::Any,
    }
}

fn strip_generic_args(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0u32;
    for ch in raw.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

fn first_generic_arg(raw: &str) -> Option<&str> {
    let open = raw.find('<')?;
    let inner = raw[open + 1..].strip_suffix('>')?;
    let mut depth = 0u32;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some(&inner[..idx]),
            _ => {}
        }
    }
    Some(inner)
}
