// Strongly-typed schema tree. The JSON-Schema form lives in `emit`.
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde_json::Value;

/// Exact dialect marker written to, and required from, every compiled document.
pub const DIALECT: &str = "http://json-schema.org/draft-04/schema#";

/// Prefix of every reference emitted by the compiler.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

// ------------------------------- Nodes ------------------------------------ //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Number,
    String,
    Boolean,
    Null,
}

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Number => "number",
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Null => "null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(PrimitiveKind::Integer),
            "number" => Some(PrimitiveKind::Number),
            "string" => Some(PrimitiveKind::String),
            "boolean" => Some(PrimitiveKind::Boolean),
            "null" => Some(PrimitiveKind::Null),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaNode {
    Primitive { kind: PrimitiveKind, facets: Facets },
    /// `target` is a pointer such as `#/definitions/name`.
    Reference { target: String, facets: Facets },
    Object(ObjectType),
    Array(ArrayType),
    /// Alternatives are tried in order.
    Union(Vec<SchemaNode>),
    /// A node read from a compiled document that carries no usable discriminator.
    /// Kept verbatim so the document round-trips; reported when validated.
    Malformed { reason: String, raw: Value },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectType {
    /// `None` for the catch-all `{}`.
    pub properties: Option<IndexMap<String, SchemaNode>>,
    pub required: IndexSet<String>,
    /// When present, named properties are not consulted at all.
    pub additional: Option<Box<SchemaNode>>,
    pub facets: Facets,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayType {
    /// `None` for the catch-all `[]`.
    pub items: Option<Box<SchemaNode>>,
    pub facets: Facets,
}

impl SchemaNode {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        SchemaNode::Primitive { kind, facets: Facets::default() }
    }

    pub fn reference(name: &str) -> Self {
        SchemaNode::Reference { target: definition_pointer(name), facets: Facets::default() }
    }

    /// What facets attached to this node may constrain, if known without dereferencing.
    pub fn facet_target(&self) -> Option<FacetTarget> {
        match self {
            SchemaNode::Primitive { kind: PrimitiveKind::Integer | PrimitiveKind::Number, .. } => {
                Some(FacetTarget::Numeric)
            }
            SchemaNode::Primitive { kind: PrimitiveKind::String, .. } => Some(FacetTarget::String),
            SchemaNode::Primitive { .. } => Some(FacetTarget::Nothing),
            SchemaNode::Object(_) => Some(FacetTarget::Object),
            SchemaNode::Array(_) => Some(FacetTarget::Array),
            SchemaNode::Reference { .. } | SchemaNode::Union(_) | SchemaNode::Malformed { .. } => None,
        }
    }

    pub fn facets_mut(&mut self) -> Option<&mut Facets> {
        match self {
            SchemaNode::Primitive { facets, .. } | SchemaNode::Reference { facets, .. } => Some(facets),
            SchemaNode::Object(obj) => Some(&mut obj.facets),
            SchemaNode::Array(arr) => Some(&mut arr.facets),
            SchemaNode::Union(_) | SchemaNode::Malformed { .. } => None,
        }
    }
}

/// `#/definitions/<name>` with `~` and `/` escaped as in JSON Pointer.
pub fn definition_pointer(name: &str) -> String {
    format!("{DEFINITIONS_PREFIX}{}", name.replace('~', "~0").replace('/', "~1"))
}

// ------------------------------- Facets ----------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacetTarget {
    Numeric,
    String,
    Array,
    Object,
    /// booleans and null accept no facet
    Nothing,
}

impl fmt::Display for FacetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FacetTarget::Numeric => "numeric types",
            FacetTarget::String => "string types",
            FacetTarget::Array => "array types",
            FacetTarget::Object => "object types",
            FacetTarget::Nothing => "no type",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetName {
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    Pattern,
    MinLength,
    MaxLength,
    MinItems,
    MaxItems,
    MinProperties,
    MaxProperties,
}

impl FacetName {
    pub const ALL: [FacetName; 11] = [
        FacetName::Minimum,
        FacetName::Maximum,
        FacetName::ExclusiveMinimum,
        FacetName::ExclusiveMaximum,
        FacetName::Pattern,
        FacetName::MinLength,
        FacetName::MaxLength,
        FacetName::MinItems,
        FacetName::MaxItems,
        FacetName::MinProperties,
        FacetName::MaxProperties,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FacetName::Minimum => "minimum",
            FacetName::Maximum => "maximum",
            FacetName::ExclusiveMinimum => "exclusiveMinimum",
            FacetName::ExclusiveMaximum => "exclusiveMaximum",
            FacetName::Pattern => "pattern",
            FacetName::MinLength => "minLength",
            FacetName::MaxLength => "maxLength",
            FacetName::MinItems => "minItems",
            FacetName::MaxItems => "maxItems",
            FacetName::MinProperties => "minProperties",
            FacetName::MaxProperties => "maxProperties",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn target(self) -> FacetTarget {
        match self {
            FacetName::Minimum | FacetName::Maximum | FacetName::ExclusiveMinimum | FacetName::ExclusiveMaximum => {
                FacetTarget::Numeric
            }
            FacetName::Pattern | FacetName::MinLength | FacetName::MaxLength => FacetTarget::String,
            FacetName::MinItems | FacetName::MaxItems => FacetTarget::Array,
            FacetName::MinProperties | FacetName::MaxProperties => FacetTarget::Object,
        }
    }
}

impl fmt::Display for FacetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric bound; ordered so the tree stays `Eq`.
pub type Bound = OrderedFloat<f64>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FacetValue {
    Bound(Bound),
    Count(u64),
    Pattern(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub exclusive_minimum: Option<Bound>,
    pub exclusive_maximum: Option<Bound>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self == &Facets::default()
    }

    /// Stores `value` under `name`; returns false when the value has the wrong shape.
    pub fn set(&mut self, name: FacetName, value: FacetValue) -> bool {
        match (name, value) {
            (FacetName::Minimum, FacetValue::Bound(b)) => self.minimum = Some(b),
            (FacetName::Maximum, FacetValue::Bound(b)) => self.maximum = Some(b),
            (FacetName::ExclusiveMinimum, FacetValue::Bound(b)) => self.exclusive_minimum = Some(b),
            (FacetName::ExclusiveMaximum, FacetValue::Bound(b)) => self.exclusive_maximum = Some(b),
            (FacetName::Pattern, FacetValue::Pattern(p)) => self.pattern = Some(p),
            (FacetName::MinLength, FacetValue::Count(n)) => self.min_length = Some(n),
            (FacetName::MaxLength, FacetValue::Count(n)) => self.max_length = Some(n),
            (FacetName::MinItems, FacetValue::Count(n)) => self.min_items = Some(n),
            (FacetName::MaxItems, FacetValue::Count(n)) => self.max_items = Some(n),
            (FacetName::MinProperties, FacetValue::Count(n)) => self.min_properties = Some(n),
            (FacetName::MaxProperties, FacetValue::Count(n)) => self.max_properties = Some(n),
            _ => return false,
        }
        true
    }

    pub fn get(&self, name: FacetName) -> Option<FacetValue> {
        match name {
            FacetName::Minimum => self.minimum.map(FacetValue::Bound),
            FacetName::Maximum => self.maximum.map(FacetValue::Bound),
            FacetName::ExclusiveMinimum => self.exclusive_minimum.map(FacetValue::Bound),
            FacetName::ExclusiveMaximum => self.exclusive_maximum.map(FacetValue::Bound),
            FacetName::Pattern => self.pattern.clone().map(FacetValue::Pattern),
            FacetName::MinLength => self.min_length.map(FacetValue::Count),
            FacetName::MaxLength => self.max_length.map(FacetValue::Count),
            FacetName::MinItems => self.min_items.map(FacetValue::Count),
            FacetName::MaxItems => self.max_items.map(FacetValue::Count),
            FacetName::MinProperties => self.min_properties.map(FacetValue::Count),
            FacetName::MaxProperties => self.max_properties.map(FacetValue::Count),
        }
    }

    /// Present facets, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (FacetName, FacetValue)> + '_ {
        FacetName::ALL.into_iter().filter_map(|name| self.get(name).map(|v| (name, v)))
    }

    /// Copies every facet of `other` over `self`.
    pub fn merge(&mut self, other: &Facets) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }
}

// ------------------------------ Document ---------------------------------- //

pub type Definitions = IndexMap<String, SchemaNode>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDocument {
    /// Body of the `start` definition, merged into the document root.
    pub start: SchemaNode,
    pub definitions: Definitions,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SchemaDocument {
    pub fn new(start: SchemaNode, definitions: Definitions) -> Self {
        Self { start, definitions, title: None, description: None }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_names_round_trip_and_targets() {
        for name in FacetName::ALL {
            assert_eq!(FacetName::from_name(name.as_str()), Some(name));
        }
        assert_eq!(FacetName::from_name("minimumExclusive"), None);
        assert_eq!(FacetName::ExclusiveMaximum.target(), FacetTarget::Numeric);
        assert_eq!(FacetName::MaxProperties.target(), FacetTarget::Object);
    }

    #[test]
    fn facet_set_rejects_mismatched_value_shape() {
        let mut facets = Facets::default();
        assert!(!facets.set(FacetName::Pattern, FacetValue::Count(3)));
        assert!(facets.set(FacetName::MinLength, FacetValue::Count(3)));
        assert!(facets.set(FacetName::Minimum, FacetValue::Bound(OrderedFloat(-1.5))));
        let present: Vec<FacetName> = facets.iter().map(|(n, _)| n).collect();
        assert_eq!(present, vec![FacetName::Minimum, FacetName::MinLength]);
    }

    #[test]
    fn definition_pointer_escapes_separators() {
        assert_eq!(definition_pointer("person"), "#/definitions/person");
        assert_eq!(definition_pointer("a/b~c"), "#/definitions/a~1b~0c");
    }

    #[test]
    fn facet_target_by_node_kind() {
        assert_eq!(SchemaNode::primitive(PrimitiveKind::Integer).facet_target(), Some(FacetTarget::Numeric));
        assert_eq!(SchemaNode::primitive(PrimitiveKind::Null).facet_target(), Some(FacetTarget::Nothing));
        assert_eq!(SchemaNode::reference("x").facet_target(), None);
    }
}
