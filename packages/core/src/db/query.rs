//! Query Pipeline
//!
//! A `NodeQuery` is an explicit pipeline value: predicate, sort keys, offset
//! and limit. It is evaluated once against a candidate list that is already in
//! insertion order, so a stable sort keeps insertion order as the final
//! tie-break.
//!
//! # Architecture
//!
//! - **Predicate**: conjunction of `FieldCondition`s, each a dotted path plus a test
//! - **Coercion**: date-typed fields compare as instants, not as strings
//! - **Array semantics**: scalar tests against a list field match if any element matches
//! - **Sorting**: missing values sort first, then strings, numbers and booleans by value
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::db::{FieldCondition, FieldTest, NodeQuery, Predicate, SortKey};
//! use sitegraph_core::models::ContentNode;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let nodes: Vec<Arc<ContentNode>> = (1..=5)
//!     .map(|n| {
//!         Arc::new(ContentNode::new_with_id(
//!             n.to_string(),
//!             "Post".to_string(),
//!             json!({ "rank": n }),
//!         ))
//!     })
//!     .collect();
//!
//! let query = NodeQuery::new()
//!     .with_predicate(Predicate::new().and(FieldCondition::new("rank", FieldTest::Gt(json!(2)))))
//!     .with_sort(vec![SortKey::desc("rank")])
//!     .with_limit(2);
//!
//! let cursor = query.evaluate(nodes);
//! assert_eq!(cursor.matched, 3);
//! assert_eq!(cursor.ids(), vec!["5", "4"]);
//! ```

use crate::models::ContentNode;
use crate::utils::parse_date;
use chrono::SecondsFormat;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

/// How values of a condition are interpreted before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    #[default]
    None,
    /// Parse both sides as dates and compare instants
    Date,
}

/// A single comparison against a field value
#[derive(Debug, Clone)]
pub enum FieldTest {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Inclusive range
    Between(Value, Value),
    Regex(Regex),
    Contains(Value),
    ContainsAny(Vec<Value>),
    ContainsNone(Vec<Value>),
    /// List length
    Size(usize),
    /// String length in characters
    Len(usize),
    Exists(bool),
    /// Same instant once both sides are parsed as dates
    DateEq(Value),
}

/// A test applied to the value found at a dotted path
#[derive(Debug, Clone)]
pub struct FieldCondition {
    pub path: String,
    pub test: FieldTest,
    pub coercion: Coercion,
}

impl FieldCondition {
    pub fn new(path: impl Into<String>, test: FieldTest) -> Self {
        Self {
            path: path.into(),
            test,
            coercion: Coercion::None,
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn matches(&self, node: &ContentNode) -> bool {
        let value = node.lookup(&self.path);
        let value = value.as_deref().filter(|v| !v.is_null());
        let coercion = self.coercion;

        match &self.test {
            FieldTest::Eq(target) => eq_matches(value, target, coercion),
            FieldTest::Ne(target) => !eq_matches(value, target, coercion),
            FieldTest::In(targets) => targets.iter().any(|t| eq_matches(value, t, coercion)),
            FieldTest::Nin(targets) => !targets.iter().any(|t| eq_matches(value, t, coercion)),
            FieldTest::Gt(target) => any_ordered(value, target, coercion, Ordering::is_gt),
            FieldTest::Gte(target) => any_ordered(value, target, coercion, Ordering::is_ge),
            FieldTest::Lt(target) => any_ordered(value, target, coercion, Ordering::is_lt),
            FieldTest::Lte(target) => any_ordered(value, target, coercion, Ordering::is_le),
            FieldTest::Between(low, high) => each_element(value, |v| {
                ordered(v, low, coercion).is_some_and(Ordering::is_ge)
                    && ordered(v, high, coercion).is_some_and(Ordering::is_le)
            }),
            FieldTest::Regex(pattern) => {
                each_element(value, |v| v.as_str().is_some_and(|s| pattern.is_match(s)))
            }
            FieldTest::Contains(target) => elements(value)
                .iter()
                .any(|v| scalar_eq(v, target, coercion)),
            FieldTest::ContainsAny(targets) => elements(value)
                .iter()
                .any(|v| targets.iter().any(|t| scalar_eq(v, t, coercion))),
            FieldTest::ContainsNone(targets) => !elements(value)
                .iter()
                .any(|v| targets.iter().any(|t| scalar_eq(v, t, coercion))),
            FieldTest::Size(size) => match value {
                Some(Value::Array(items)) => items.len() == *size,
                Some(_) => false,
                None => *size == 0,
            },
            FieldTest::Len(len) => value
                .and_then(Value::as_str)
                .is_some_and(|s| s.chars().count() == *len),
            FieldTest::Exists(expected) => value.is_some() == *expected,
            FieldTest::DateEq(target) => {
                each_element(value, |v| scalar_eq(v, target, Coercion::Date))
            }
        }
    }
}

/// Conjunction of field conditions
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub conditions: Vec<FieldCondition>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: FieldCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, node: &ContentNode) -> bool {
        self.conditions.iter().all(|c| c.matches(node))
    }

    /// The exact value required for a unique-indexed built-in (`id` or `path`), if any
    pub fn exact_builtin(&self, builtin: &str) -> Option<&str> {
        self.conditions.iter().find_map(|c| match (&c.test, c.path == builtin) {
            (FieldTest::Eq(Value::String(s)), true) => Some(s.as_str()),
            _ => None,
        })
    }
}

/// One sort key of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
    pub coercion: Coercion,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
            coercion: Coercion::None,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
            coercion: Coercion::None,
        }
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }
}

/// Filter, sort and slice over a collection (or a belongs-to set)
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl NodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run the pipeline over candidates given in insertion order
    pub fn evaluate(&self, candidates: Vec<Arc<ContentNode>>) -> QueryCursor {
        let mut matched: Vec<Arc<ContentNode>> = if self.predicate.is_empty() {
            candidates
        } else {
            candidates
                .into_iter()
                .filter(|node| self.predicate.matches(node))
                .collect()
        };

        sort_nodes(&mut matched, &self.sort);

        let total = matched.len();
        let start = self.offset.min(total);
        let end = match self.limit {
            Some(limit) => start.saturating_add(limit).min(total),
            None => total,
        };
        matched.truncate(end);
        let nodes = matched.split_off(start);

        QueryCursor {
            matched: total,
            nodes,
        }
    }
}

/// Result of evaluating a `NodeQuery`
#[derive(Debug, Clone, Default)]
pub struct QueryCursor {
    /// Number of nodes that passed the predicate, before offset/limit
    pub matched: usize,
    /// The sorted, sliced nodes
    pub nodes: Vec<Arc<ContentNode>>,
}

impl QueryCursor {
    pub fn ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// Stable multi-key sort; missing values sort first in ascending order
pub fn sort_nodes(nodes: &mut Vec<Arc<ContentNode>>, keys: &[SortKey]) {
    if keys.is_empty() || nodes.len() < 2 {
        return;
    }

    let mut keyed: Vec<(Vec<Option<Value>>, Arc<ContentNode>)> = nodes
        .drain(..)
        .map(|node| {
            let values = keys
                .iter()
                .map(|key| sort_value(node.lookup(&key.field), key.coercion))
                .collect();
            (values, node)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        for (index, key) in keys.iter().enumerate() {
            let ordering = compare_json_values(a[index].as_ref(), b[index].as_ref());
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    nodes.extend(keyed.into_iter().map(|(_, node)| node));
}

/// Value a node sorts by under a key
///
/// Date-coerced strings become their UTC instant in a fixed-width RFC 3339
/// form, so string order is chronological order across offsets.
fn sort_value(value: Option<Cow<'_, Value>>, coercion: Coercion) -> Option<Value> {
    let value = value?;
    if coercion == Coercion::Date {
        if let Some(instant) = as_date(&value) {
            return Some(Value::String(
                instant.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ));
        }
    }
    Some(value.into_owned())
}

/// Compare two JSON values for sorting
///
/// Missing values are less than present ones; strings, numbers and booleans
/// compare by value; mixed types and containers compare by their JSON text.
pub fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(va), Some(vb)) => match (va, vb) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
            (Value::Number(na), Value::Number(nb)) => {
                let fa = na.as_f64().unwrap_or(0.0);
                let fb = nb.as_f64().unwrap_or(0.0);
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            }
            (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
            _ => va.to_string().cmp(&vb.to_string()),
        },
    }
}

fn elements(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        Some(v) => vec![v],
        None => Vec::new(),
    }
}

fn each_element(value: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    elements(value).into_iter().any(test)
}

fn eq_matches(value: Option<&Value>, target: &Value, coercion: Coercion) -> bool {
    match value {
        None => target.is_null(),
        Some(Value::Array(items)) if !target.is_array() => {
            items.iter().any(|v| scalar_eq(v, target, coercion))
        }
        Some(v) => scalar_eq(v, target, coercion),
    }
}

fn scalar_eq(value: &Value, target: &Value, coercion: Coercion) -> bool {
    if coercion == Coercion::Date {
        if let (Some(a), Some(b)) = (as_date(value), as_date(target)) {
            return a == b;
        }
    }

    match (value, target) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        // Ids and numeric strings compare loosely against numbers
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        _ => value == target,
    }
}

fn any_ordered(
    value: Option<&Value>,
    target: &Value,
    coercion: Coercion,
    accept: fn(Ordering) -> bool,
) -> bool {
    each_element(value, |v| ordered(v, target, coercion).is_some_and(accept))
}

/// Ordering of `value` relative to `target`, `None` when not comparable
fn ordered(value: &Value, target: &Value, coercion: Coercion) -> Option<Ordering> {
    if coercion == Coercion::Date {
        return match (as_date(value), as_date(target)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        };
    }

    match (value, target) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    value.as_str().and_then(parse_date)
}
