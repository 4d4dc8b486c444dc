//! Node and components, the building blocks of the query model.
//!
//! A [`Node`] has no meaning on its own; the [`Component`]s attached to it do.
//! `Filters.eq("myField", 42)` carries three semantic facts: the operation
//! has a name (`Named`), it refers to a field (`HasFieldReference`), and it
//! refers to a value (`HasValueReference`). A node holds at most one
//! component of each kind.

use serde::{Deserialize, Serialize};

use crate::{BsonType, ConstantValue, Namespace};

/// Canonical operation names across all dialects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Name {
    All,
    And,
    BitsAllClear,
    BitsAllSet,
    BitsAnyClear,
    BitsAnySet,
    Combine,
    ElemMatch,
    Eq,
    Exists,
    GeoIntersects,
    GeoWithin,
    GeoWithinBox,
    GeoWithinCenter,
    GeoWithinCenterSphere,
    GeoWithinPolygon,
    Gt,
    Gte,
    In,
    Lt,
    Lte,
    Ne,
    Near,
    NearSphere,
    Nin,
    Nor,
    Not,
    Or,
    Regex,
    Set,
    Size,
    Text,
    Type,
    Unset,
    Match,
    Project,
    Include,
    Exclude,
    Group,
    Sum,
    Avg,
    First,
    Last,
    Top,
    Bottom,
    Max,
    Min,
    Push,
    AddToSet,
    Sort,
    Ascending,
    Descending,
    AddFields,
    Unwind,
    Unknown,
}

impl Name {
    /// The canonical (driver-facing) spelling of the operation.
    pub fn canonical(&self) -> &'static str {
        match self {
            Name::All => "all",
            Name::And => "and",
            Name::BitsAllClear => "bitsAllClear",
            Name::BitsAllSet => "bitsAllSet",
            Name::BitsAnyClear => "bitsAnyClear",
            Name::BitsAnySet => "bitsAnySet",
            Name::Combine => "combine",
            Name::ElemMatch => "elemMatch",
            Name::Eq => "eq",
            Name::Exists => "exists",
            Name::GeoIntersects => "geoIntersects",
            Name::GeoWithin => "geoWithin",
            Name::GeoWithinBox => "geoWithinBox",
            Name::GeoWithinCenter => "geoWithinCenter",
            Name::GeoWithinCenterSphere => "geoWithinCenterSphere",
            Name::GeoWithinPolygon => "geoWithinPolygon",
            Name::Gt => "gt",
            Name::Gte => "gte",
            Name::In => "in",
            Name::Lt => "lt",
            Name::Lte => "lte",
            Name::Ne => "ne",
            Name::Near => "near",
            Name::NearSphere => "nearSphere",
            Name::Nin => "nin",
            Name::Nor => "nor",
            Name::Not => "not",
            Name::Or => "or",
            Name::Regex => "regex",
            Name::Set => "set",
            Name::Size => "size",
            Name::Text => "text",
            Name::Type => "type",
            Name::Unset => "unset",
            Name::Match => "match",
            Name::Project => "project",
            Name::Include => "include",
            Name::Exclude => "exclude",
            Name::Group => "group",
            Name::Sum => "sum",
            Name::Avg => "avg",
            Name::First => "first",
            Name::Last => "last",
            Name::Top => "top",
            Name::Bottom => "bottom",
            Name::Max => "max",
            Name::Min => "min",
            Name::Push => "push",
            Name::AddToSet => "addToSet",
            Name::Sort => "sort",
            Name::Ascending => "ascending",
            Name::Descending => "descending",
            Name::AddFields => "addFields",
            Name::Unwind => "unwind",
            Name::Unknown => "<unknown operator>",
        }
    }

    /// Total mapping from a canonical spelling; anything unrecognized is
    /// [`Name::Unknown`].
    pub fn from_canonical(canonical: &str) -> Name {
        match canonical {
            "all" => Name::All,
            "and" => Name::And,
            "bitsAllClear" => Name::BitsAllClear,
            "bitsAllSet" => Name::BitsAllSet,
            "bitsAnyClear" => Name::BitsAnyClear,
            "bitsAnySet" => Name::BitsAnySet,
            "combine" => Name::Combine,
            "elemMatch" => Name::ElemMatch,
            "eq" | "is" => Name::Eq,
            "exists" => Name::Exists,
            "geoIntersects" => Name::GeoIntersects,
            "geoWithin" => Name::GeoWithin,
            "geoWithinBox" => Name::GeoWithinBox,
            "geoWithinCenter" => Name::GeoWithinCenter,
            "geoWithinCenterSphere" => Name::GeoWithinCenterSphere,
            "geoWithinPolygon" => Name::GeoWithinPolygon,
            "gt" => Name::Gt,
            "gte" => Name::Gte,
            "in" => Name::In,
            "lt" => Name::Lt,
            "lte" => Name::Lte,
            "ne" => Name::Ne,
            "near" => Name::Near,
            "nearSphere" => Name::NearSphere,
            "nin" => Name::Nin,
            "nor" => Name::Nor,
            "not" => Name::Not,
            "or" => Name::Or,
            "regex" => Name::Regex,
            "set" => Name::Set,
            "size" => Name::Size,
            "text" => Name::Text,
            "type" => Name::Type,
            "unset" => Name::Unset,
            "match" => Name::Match,
            "project" => Name::Project,
            "include" => Name::Include,
            "exclude" => Name::Exclude,
            "group" => Name::Group,
            "sum" => Name::Sum,
            "avg" => Name::Avg,
            "first" => Name::First,
            "last" => Name::Last,
            "top" => Name::Top,
            "bottom" => Name::Bottom,
            "max" => Name::Max,
            "min" => Name::Min,
            "push" => Name::Push,
            "addToSet" => Name::AddToSet,
            "sort" => Name::Sort,
            "ascending" => Name::Ascending,
            "descending" => Name::Descending,
            "addFields" => Name::AddFields,
            "unwind" => Name::Unwind,
            _ => Name::Unknown,
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Top-level command classification of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    Aggregate,
    CountDocuments,
    DeleteMany,
    DeleteOne,
    Distinct,
    EstimatedDocumentCount,
    FindMany,
    FindOne,
    FindOneAndDelete,
    FindOneAndReplace,
    FindOneAndUpdate,
    InsertMany,
    InsertOne,
    ReplaceOne,
    UpdateMany,
    UpdateOne,
    Upsert,
    Unknown,
}

/// Which source idiom produced a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectName {
    JavaDriver,
    SpringCriteria,
    SpringQuery,
}

/// Where a query points to, as far as we could statically tell.
///
/// There is deliberately no sentinel string for "could not resolve": an
/// unresolved database with a resolved collection is `OnlyCollection`, and a
/// fully unresolved target is `Unknown`.
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionReference<S> {
    Known {
        database_source: Option<S>,
        collection_source: S,
        namespace: Namespace,
    },
    OnlyCollection {
        collection_source: S,
        collection: String,
    },
    Unknown,
}

impl<S> CollectionReference<S> {
    /// Promotes an `OnlyCollection` reference with a database supplied from
    /// outside the source code (for example a properties file). `Unknown`
    /// stays unknown.
    pub fn with_database(self, database: &str) -> CollectionReference<S> {
        match self {
            CollectionReference::Known {
                database_source,
                collection_source,
                namespace,
            } => CollectionReference::Known {
                database_source,
                collection_source,
                namespace: Namespace::new(database, namespace.collection),
            },
            CollectionReference::OnlyCollection {
                collection_source,
                collection,
            } => CollectionReference::Known {
                database_source: None,
                namespace: Namespace::new(database, collection.clone()),
                collection_source,
            },
            CollectionReference::Unknown => CollectionReference::Unknown,
        }
    }
}

/// A reference to a document field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldReference<S> {
    /// Written down in source, resolved to a string.
    Known { source: S, field_name: String },
    /// Suggested from a collection schema rather than source code.
    FromSchema {
        field_name: String,
        display_name: String,
    },
    /// Produced by the query itself (an accumulator output, for example).
    Computed { field_name: String },
    /// Implied by the operation (`_id` in a group stage).
    Inferred { field_name: String },
    Unknown,
}

impl<S> FieldReference<S> {
    pub fn field_name(&self) -> Option<&str> {
        match self {
            FieldReference::Known { field_name, .. }
            | FieldReference::FromSchema { field_name, .. }
            | FieldReference::Computed { field_name }
            | FieldReference::Inferred { field_name } => Some(field_name),
            FieldReference::Unknown => None,
        }
    }
}

/// A reference to a value in code.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueReference<S> {
    /// Statically known, with the classified type of the resolved value.
    Constant {
        source: S,
        value: ConstantValue,
        ty: BsonType,
    },
    /// Only knowable at runtime; the static type still tells us the shape.
    Runtime { source: S, ty: BsonType },
    /// An expression computed by the server (e.g. `"$field"` in a group id).
    Computed { node: Box<Node<S>> },
    /// Implied by the operation (projection/sort direction).
    Inferred { value: i64 },
    Unknown,
}

impl<S> ValueReference<S> {
    pub fn ty(&self) -> Option<&BsonType> {
        match self {
            ValueReference::Constant { ty, .. } | ValueReference::Runtime { ty, .. } => Some(ty),
            _ => None,
        }
    }
}

/// The discriminant of a [`Component`], used to uphold the one-per-kind rule
/// and for generic lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Named,
    IsCommand,
    HasCollectionReference,
    HasFieldReference,
    HasValueReference,
    HasChildren,
    HasFilter,
    HasUpdates,
    HasProjections,
    HasSorts,
    HasAddedFields,
    HasAccumulatedFields,
    HasAggregation,
    HasSourceDialect,
}

/// One semantic fact attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Component<S> {
    Named(Name),
    IsCommand(CommandType),
    HasCollectionReference(CollectionReference<S>),
    HasFieldReference(FieldReference<S>),
    HasValueReference(ValueReference<S>),
    /// Generic nesting (boolean combinators and the like).
    HasChildren(Vec<Node<S>>),
    HasFilter(Vec<Node<S>>),
    HasUpdates(Vec<Node<S>>),
    HasProjections(Vec<Node<S>>),
    HasSorts(Vec<Node<S>>),
    HasAddedFields(Vec<Node<S>>),
    HasAccumulatedFields(Vec<Node<S>>),
    HasAggregation(Vec<Node<S>>),
    HasSourceDialect(DialectName),
}

impl<S> Component<S> {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Named(_) => ComponentKind::Named,
            Component::IsCommand(_) => ComponentKind::IsCommand,
            Component::HasCollectionReference(_) => ComponentKind::HasCollectionReference,
            Component::HasFieldReference(_) => ComponentKind::HasFieldReference,
            Component::HasValueReference(_) => ComponentKind::HasValueReference,
            Component::HasChildren(_) => ComponentKind::HasChildren,
            Component::HasFilter(_) => ComponentKind::HasFilter,
            Component::HasUpdates(_) => ComponentKind::HasUpdates,
            Component::HasProjections(_) => ComponentKind::HasProjections,
            Component::HasSorts(_) => ComponentKind::HasSorts,
            Component::HasAddedFields(_) => ComponentKind::HasAddedFields,
            Component::HasAccumulatedFields(_) => ComponentKind::HasAccumulatedFields,
            Component::HasAggregation(_) => ComponentKind::HasAggregation,
            Component::HasSourceDialect(_) => ComponentKind::HasSourceDialect,
        }
    }

    fn child_nodes(&self) -> Option<&[Node<S>]> {
        match self {
            Component::HasChildren(c)
            | Component::HasFilter(c)
            | Component::HasUpdates(c)
            | Component::HasProjections(c)
            | Component::HasSorts(c)
            | Component::HasAddedFields(c)
            | Component::HasAccumulatedFields(c)
            | Component::HasAggregation(c) => Some(c),
            _ => None,
        }
    }
}

/// One operation or sub-expression of the reconstructed query.
///
/// Immutable after construction; parsers build a fresh tree on every pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Node<S> {
    source: S,
    components: Vec<Component<S>>,
}

impl<S> Node<S> {
    /// Builds a node, keeping only the first component of each kind.
    pub fn new(source: S, components: Vec<Component<S>>) -> Self {
        let mut seen = Vec::with_capacity(components.len());
        let mut kept = Vec::with_capacity(components.len());
        for component in components {
            let kind = component.kind();
            if seen.contains(&kind) {
                continue;
            }
            seen.push(kind);
            kept.push(component);
        }
        Node {
            source,
            components: kept,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn components(&self) -> &[Component<S>] {
        &self.components
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component<S>> {
        self.components.iter().find(|c| c.kind() == kind)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.component(kind).is_some()
    }

    pub fn named(&self) -> Option<Name> {
        match self.component(ComponentKind::Named) {
            Some(Component::Named(name)) => Some(*name),
            _ => None,
        }
    }

    pub fn command(&self) -> Option<CommandType> {
        match self.component(ComponentKind::IsCommand) {
            Some(Component::IsCommand(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn source_dialect(&self) -> Option<DialectName> {
        match self.component(ComponentKind::HasSourceDialect) {
            Some(Component::HasSourceDialect(dialect)) => Some(*dialect),
            _ => None,
        }
    }

    pub fn collection_reference(&self) -> Option<&CollectionReference<S>> {
        match self.component(ComponentKind::HasCollectionReference) {
            Some(Component::HasCollectionReference(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn field_reference(&self) -> Option<&FieldReference<S>> {
        match self.component(ComponentKind::HasFieldReference) {
            Some(Component::HasFieldReference(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn value_reference(&self) -> Option<&ValueReference<S>> {
        match self.component(ComponentKind::HasValueReference) {
            Some(Component::HasValueReference(reference)) => Some(reference),
            _ => None,
        }
    }

    pub fn filter(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasFilter)
    }

    pub fn updates(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasUpdates)
    }

    pub fn aggregation(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasAggregation)
    }

    pub fn projections(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasProjections)
    }

    pub fn sorts(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasSorts)
    }

    pub fn added_fields(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasAddedFields)
    }

    pub fn accumulated_fields(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasAccumulatedFields)
    }

    pub fn children(&self) -> &[Node<S>] {
        self.children_of(ComponentKind::HasChildren)
    }

    fn children_of(&self, kind: ComponentKind) -> &[Node<S>] {
        self.component(kind)
            .and_then(|c| c.child_nodes())
            .unwrap_or(&[])
    }

    /// Visits this node and every nested node (child sequences and computed
    /// value expressions) in depth-first order.
    pub fn for_each_node<'a>(&'a self, f: &mut impl FnMut(&'a Node<S>)) {
        f(self);
        for component in &self.components {
            if let Some(children) = component.child_nodes() {
                for child in children {
                    child.for_each_node(f);
                }
            }
            if let Component::HasValueReference(ValueReference::Computed { node }) = component {
                node.for_each_node(f);
            }
        }
    }
}
