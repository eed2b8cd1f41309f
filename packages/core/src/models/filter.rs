//! Filter Operator Catalogs
//!
//! Each queryable field gets a `FilterOperatorSet` listing the comparison
//! operators it accepts. Nested objects get a nested catalog. Reference fields
//! are flagged with `on_reference_id` so that a filter written as
//! `{ author: { eq: "jane" } }` is evaluated against `author.id`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Comparison operator usable in a query filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOp {
    Eq,
    Ne,
    In,
    Nin,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    Regex,
    Contains,
    ContainsAny,
    ContainsNone,
    Size,
    Len,
    Exists,
    Dteq,
}

impl FilterOp {
    pub const ALL: [FilterOp; 17] = [
        FilterOp::Eq,
        FilterOp::Ne,
        FilterOp::In,
        FilterOp::Nin,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::Between,
        FilterOp::Regex,
        FilterOp::Contains,
        FilterOp::ContainsAny,
        FilterOp::ContainsNone,
        FilterOp::Size,
        FilterOp::Len,
        FilterOp::Exists,
        FilterOp::Dteq,
    ];

    /// Name used in query arguments
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::In => "in",
            FilterOp::Nin => "nin",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Between => "between",
            FilterOp::Regex => "regex",
            FilterOp::Contains => "contains",
            FilterOp::ContainsAny => "containsAny",
            FilterOp::ContainsNone => "containsNone",
            FilterOp::Size => "size",
            FilterOp::Len => "len",
            FilterOp::Exists => "exists",
            FilterOp::Dteq => "dteq",
        }
    }

    pub fn parse(name: &str) -> Option<FilterOp> {
        FilterOp::ALL.iter().copied().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of value a filter leaf compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterValueKind {
    String,
    Number,
    Date,
    Bool,
    List,
    ReferenceId,
    ReferenceIdList,
}

/// Operators allowed on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOperatorSet {
    pub kind: FilterValueKind,
    pub operators: BTreeSet<FilterOp>,
    /// Rewrite `field.op` into `field.id.op` when translating
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub on_reference_id: bool,
}

impl FilterOperatorSet {
    pub fn new(kind: FilterValueKind, operators: &[FilterOp]) -> Self {
        Self {
            kind,
            operators: operators.iter().copied().collect(),
            on_reference_id: false,
        }
    }

    pub fn on_reference_id(mut self) -> Self {
        self.on_reference_id = true;
        self
    }

    pub fn allows(&self, op: FilterOp) -> bool {
        self.operators.contains(&op)
    }
}

/// A catalog entry: either a leaf operator set or a nested object catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterField {
    Leaf(FilterOperatorSet),
    Object(FilterCatalog),
}

/// Filterable fields of a node type (or of a nested object)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCatalog {
    pub fields: BTreeMap<String, FilterField>,
}

impl FilterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FilterField> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, entry: FilterField) {
        self.fields.insert(field.into(), entry);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Operator set of a dotted leaf path, e.g. `meta.rating`
    pub fn leaf(&self, path: &str) -> Option<&FilterOperatorSet> {
        let mut catalog = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            match catalog.get(segment)? {
                FilterField::Leaf(set) if segments.peek().is_none() => return Some(set),
                FilterField::Object(inner) => catalog = inner,
                FilterField::Leaf(_) => return None,
            }
        }
        None
    }
}
