//! The BSON-like type vocabulary of the query IR.
//!
//! We do not reuse the driver's type tags because the model needs more
//! information than the wire format: nullability and composability (a value
//! that can be either an int or null, for example) are expressed with
//! [`BsonType::AnyOf`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A closed union of every value type the model understands.
///
/// `Any` and `AnyOf` are not BSON types per se: `Any` stands for a type we
/// could not narrow down, and `AnyOf` models dynamic schemas where a single
/// field holds values of several types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BsonType {
    Double,
    String,
    /// A map of field name to type.
    Object(BTreeMap<std::string::String, BsonType>),
    /// The type of the elements of the array.
    Array(Box<BsonType>),
    ObjectId,
    Boolean,
    Date,
    /// null, or a field that does not exist.
    Null,
    Int32,
    Int64,
    Decimal128,
    Any,
    AnyOf(BTreeSet<BsonType>),
}

impl BsonType {
    /// Builds a flattened, deduplicated union.
    ///
    /// Nested `AnyOf`s are merged into the top-level set, so the invariant
    /// that `AnyOf` never contains another `AnyOf` holds by construction.
    /// A union of one type collapses to that type; an empty union is `Any`.
    pub fn any_of(types: impl IntoIterator<Item = BsonType>) -> BsonType {
        let mut flat = BTreeSet::new();
        for ty in types {
            match ty {
                BsonType::AnyOf(inner) => flat.extend(inner),
                other => {
                    flat.insert(other);
                }
            }
        }

        match flat.len() {
            0 => BsonType::Any,
            1 => flat.into_iter().next().unwrap_or(BsonType::Any),
            _ => BsonType::AnyOf(flat),
        }
    }

    /// The nullable form of a type, as produced when classifying boxed or
    /// reference Java types.
    pub fn nullable(self) -> BsonType {
        BsonType::any_of([self, BsonType::Null])
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BsonType::Null)
    }

    /// Whether a value of this type can be stored where `field` is expected.
    ///
    /// `Any` is compatible in both directions. A union value is assignable
    /// when every member is; a union field accepts a value assignable to any
    /// member. Objects check field-wise, arrays check the element type.
    pub fn is_assignable_to(&self, field: &BsonType) -> bool {
        match (self, field) {
            (BsonType::Any, _) | (_, BsonType::Any) => true,
            (BsonType::AnyOf(members), _) => members.iter().all(|m| m.is_assignable_to(field)),
            (_, BsonType::AnyOf(members)) => members.iter().any(|m| self.is_assignable_to(m)),
            (BsonType::Array(value), BsonType::Array(field)) => value.is_assignable_to(field),
            (BsonType::Object(value), BsonType::Object(field)) => field
                .iter()
                .all(|(name, ty)| value.get(name).is_some_and(|v| v.is_assignable_to(ty))),
            (value, field) => value == field,
        }
    }
}

/// A value resolved from source at analysis time.
///
/// This is what the constant resolver produces and what
/// [`crate::ValueReference::Constant`] carries alongside the classified type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(std::string::String),
    Array(Vec<ConstantValue>),
}

impl ConstantValue {
    /// The BSON type of the runtime value this constant would become.
    pub fn bson_type(&self) -> BsonType {
        match self {
            ConstantValue::Null => BsonType::Null,
            ConstantValue::Boolean(_) => BsonType::Boolean,
            ConstantValue::Int32(_) => BsonType::Int32,
            ConstantValue::Int64(_) => BsonType::Int64,
            ConstantValue::Double(_) => BsonType::Double,
            ConstantValue::String(_) => BsonType::String,
            ConstantValue::Array(items) => {
                BsonType::Array(Box::new(BsonType::any_of(items.iter().map(|i| i.bson_type()))))
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstantValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Boolean(v) => write!(f, "{v}"),
            ConstantValue::Int32(v) => write!(f, "{v}"),
            ConstantValue::Int64(v) => write!(f, "{v}"),
            ConstantValue::Double(v) => write!(f, "{v}"),
            ConstantValue::String(v) => write!(f, "{v}"),
            ConstantValue::Array(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
