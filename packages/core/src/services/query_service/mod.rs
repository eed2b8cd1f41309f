//! Query Service - Filtered, Sorted, Paginated Node Queries
//!
//! This module resolves query arguments (`filter`, `sortBy`, `order`, `sort`,
//! `skip`, `perPage`, `page`, `limit`) into a page of edges, validated against
//! the synthesized filter catalog of the queried content type.
//!
//! # Architecture
//!
//! - **Plan**: filter arguments are translated once into a `Predicate`
//!   (reference fields are rewritten to `field.id`, date fields compare as
//!   instants, `$variables` are substituted), sort arguments into `SortKey`s,
//!   paging arguments into a `PageWindow`
//! - **Execute**: the plan runs as one `NodeQuery` against a store snapshot,
//!   either over a collection or over the belongs-to set of a node
//! - **Connection**: the page becomes edges whose `next`/`previous` point
//!   within the page only, plus `totalCount` and `pageInfo`
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::config::EngineConfig;
//! use sitegraph_core::db::ContentStore;
//! use sitegraph_core::models::{ContentNode, QueryArgs, SortOrder};
//! use sitegraph_core::services::{QueryService, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ContentStore::new();
//! for n in 1..=13 {
//!     store
//!         .insert(ContentNode::new_with_id(n.to_string(), "Post".into(), json!({"n": n})))
//!         .await?;
//! }
//!
//! let snapshot = store.snapshot().await;
//! let schema = Arc::new(Schema::infer(&snapshot));
//! let service = QueryService::new(schema, EngineConfig::default());
//!
//! let args = QueryArgs::new()
//!     .with_sort("n", SortOrder::Asc)
//!     .with_page(4, 4);
//! let page = service.resolve(&snapshot, "Post", &args)?;
//!
//! assert_eq!(page.total_count, 13);
//! assert_eq!(page.page_info.total_pages, 4);
//! assert_eq!(page.edges.len(), 1);
//! assert!(page.edges[0].next.is_none());
//! # Ok(())
//! # }
//! ```

use crate::config::EngineConfig;
use crate::db::{
    Coercion, ContentStore, FieldCondition, FieldTest, NodeQuery, Predicate, QueryCursor,
    SortKey, StoreSnapshot,
};
use crate::models::{
    Connection, Edge, FilterCatalog, FilterField, FilterOp, FilterOperatorSet,
    FilterValueKind, NodeKey, QueryArgs, SortOrder,
};
use crate::services::error::QueryError;
use crate::services::filter_synthesizer::builtin_filters;
use crate::services::pagination::PageWindow;
use crate::services::schema_service::Schema;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Where a query draws its candidate nodes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// All nodes of a content type
    Collection(String),
    /// All nodes referencing the given node
    BelongsTo(NodeKey),
}

/// A validated, translated query ready to run against a snapshot
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub source: QuerySource,
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub window: PageWindow,
}

impl QueryPlan {
    /// The plan restricted to its page
    pub fn node_query(&self) -> NodeQuery {
        NodeQuery {
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            offset: self.window.offset(),
            limit: Some(self.window.take()),
        }
    }

    /// The plan for a different page of the same result set
    pub fn for_page(&self, page: usize) -> QueryPlan {
        QueryPlan {
            window: self.window.with_page(page),
            ..self.clone()
        }
    }
}

/// Resolves paginated queries against store snapshots
#[derive(Debug, Clone)]
pub struct QueryService {
    schema: Arc<Schema>,
    config: EngineConfig,
}

impl QueryService {
    pub fn new(schema: Arc<Schema>, config: EngineConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a collection query
    pub fn resolve(
        &self,
        snapshot: &StoreSnapshot,
        type_name: &str,
        args: &QueryArgs,
    ) -> Result<Connection, QueryError> {
        self.resolve_with_variables(snapshot, type_name, args, &Map::new())
    }

    /// Resolve a collection query whose filter may contain `$variables`
    pub fn resolve_with_variables(
        &self,
        snapshot: &StoreSnapshot,
        type_name: &str,
        args: &QueryArgs,
        variables: &Map<String, Value>,
    ) -> Result<Connection, QueryError> {
        let plan = self.plan(QuerySource::Collection(type_name.to_string()), args, variables)?;
        let cursor = self.execute(snapshot, &plan)?;
        Ok(build_connection(cursor, &plan.window))
    }

    /// Paginate the nodes referencing `(target_type, target_id)`
    ///
    /// Only the built-in `id`, `path` and `typeName` fields can be filtered,
    /// since the referencing nodes may be of any type.
    pub fn resolve_belongs_to(
        &self,
        snapshot: &StoreSnapshot,
        target_type: &str,
        target_id: &str,
        args: &QueryArgs,
    ) -> Result<Connection, QueryError> {
        let source = QuerySource::BelongsTo(NodeKey::new(target_type, target_id));
        let plan = self.plan(source, args, &Map::new())?;
        let cursor = self.execute(snapshot, &plan)?;
        Ok(build_connection(cursor, &plan.window))
    }

    /// Resolve against the current state of a live store
    pub async fn resolve_live(
        &self,
        store: &ContentStore,
        type_name: &str,
        args: &QueryArgs,
    ) -> Result<Connection, QueryError> {
        let snapshot = store.snapshot().await;
        self.resolve(&snapshot, type_name, args)
    }

    /// Validate and translate query arguments
    ///
    /// # Errors
    ///
    /// - `QueryError::UnknownContentType` if a collection source has no schema
    /// - `QueryError::UnknownFilterField` for fields missing from the catalog
    /// - `QueryError::UnsupportedOperator` for operators the field does not offer
    /// - `QueryError::InvalidOperatorValue` / `InvalidRegex` / `MissingVariable`
    pub fn plan(
        &self,
        source: QuerySource,
        args: &QueryArgs,
        variables: &Map<String, Value>,
    ) -> Result<QueryPlan, QueryError> {
        let builtins;
        let (catalog, type_name) = match &source {
            QuerySource::Collection(type_name) => {
                let catalog = self
                    .schema
                    .filters(type_name)
                    .ok_or_else(|| QueryError::unknown_content_type(type_name))?;
                (catalog, type_name.as_str())
            }
            QuerySource::BelongsTo(_) => {
                builtins = builtin_filters();
                (&builtins, "belongsTo")
            }
        };

        let mut predicate = Predicate::new();
        if let Some(filter) = &args.filter {
            translate_filter(catalog, type_name, filter, variables, "", &mut predicate)?;
        }

        let sort = args
            .sort_keys()
            .into_iter()
            .map(|spec| {
                let leaf = catalog.leaf(&spec.by);
                let coercion = match leaf {
                    Some(set) if set.kind == FilterValueKind::Date => Coercion::Date,
                    _ => Coercion::None,
                };
                let field = match leaf {
                    Some(set) if set.on_reference_id => format!("{}.id", spec.by),
                    _ => spec.by,
                };
                SortKey {
                    field,
                    descending: spec.order == SortOrder::Desc,
                    coercion,
                }
            })
            .collect();

        Ok(QueryPlan {
            source,
            predicate,
            sort,
            window: PageWindow::from_args(args, &self.config),
        })
    }

    /// Run a plan's page against a snapshot
    pub fn execute(
        &self,
        snapshot: &StoreSnapshot,
        plan: &QueryPlan,
    ) -> Result<QueryCursor, QueryError> {
        let query = plan.node_query();
        let cursor = match &plan.source {
            QuerySource::Collection(type_name) => snapshot.chain(type_name, &query)?,
            QuerySource::BelongsTo(target) => snapshot.belongs_to(target, &query),
        };

        tracing::debug!(
            "Query {:?}: {} matched, page {} returned {}",
            plan.source,
            cursor.matched,
            plan.window.page,
            cursor.nodes.len()
        );
        Ok(cursor)
    }

    /// Number of pages a plan yields (computed with the resolver's own math)
    pub fn total_pages(&self, snapshot: &StoreSnapshot, plan: &QueryPlan) -> Result<usize, QueryError> {
        let count_only = NodeQuery {
            predicate: plan.predicate.clone(),
            sort: Vec::new(),
            offset: 0,
            limit: Some(0),
        };
        let matched = match &plan.source {
            QuerySource::Collection(type_name) => snapshot.chain(type_name, &count_only)?.matched,
            QuerySource::BelongsTo(target) => snapshot.belongs_to(target, &count_only).matched,
        };
        Ok(plan.window.total_pages(matched))
    }
}

fn build_connection(cursor: QueryCursor, window: &PageWindow) -> Connection {
    let nodes = cursor.nodes;
    let edges = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| Edge {
            node: Arc::clone(node),
            next: nodes.get(index + 1).cloned(),
            previous: index.checked_sub(1).and_then(|i| nodes.get(i)).cloned(),
        })
        .collect();

    Connection {
        total_count: window.total_count(cursor.matched),
        page_info: window.page_info(cursor.matched),
        edges,
    }
}

fn translate_filter(
    catalog: &FilterCatalog,
    type_name: &str,
    filter: &Value,
    variables: &Map<String, Value>,
    prefix: &str,
    predicate: &mut Predicate,
) -> Result<(), QueryError> {
    let Some(fields) = filter.as_object() else {
        let field = if prefix.is_empty() { "filter" } else { prefix };
        return Err(QueryError::invalid_value(field, "filter", "expected an object"));
    };

    for (field, operators) in fields {
        let path = if prefix.is_empty() {
            field.clone()
        } else {
            format!("{prefix}.{field}")
        };

        match catalog.get(field) {
            None => return Err(QueryError::unknown_filter_field(type_name, path)),
            Some(FilterField::Object(nested)) => {
                translate_filter(nested, type_name, operators, variables, &path, predicate)?
            }
            Some(FilterField::Leaf(set)) => {
                translate_leaf(set, &path, operators, variables, predicate)?
            }
        }
    }
    Ok(())
}

fn translate_leaf(
    set: &FilterOperatorSet,
    path: &str,
    operators: &Value,
    variables: &Map<String, Value>,
    predicate: &mut Predicate,
) -> Result<(), QueryError> {
    let Some(operators) = operators.as_object() else {
        return Err(QueryError::invalid_value(
            path,
            "filter",
            "expected an operator object such as { eq: ... }",
        ));
    };

    let target = if set.on_reference_id {
        format!("{path}.id")
    } else {
        path.to_string()
    };
    let coercion = if set.kind == FilterValueKind::Date {
        Coercion::Date
    } else {
        Coercion::None
    };

    for (name, raw) in operators {
        let op = FilterOp::parse(name)
            .filter(|op| set.allows(*op))
            .ok_or_else(|| QueryError::unsupported_operator(path, name))?;
        let value = substitute_variables(raw, variables)?;
        let test = field_test(op, value, path)?;
        predicate
            .conditions
            .push(FieldCondition::new(target.clone(), test).with_coercion(coercion));
    }
    Ok(())
}

fn field_test(op: FilterOp, value: Value, path: &str) -> Result<FieldTest, QueryError> {
    let invalid = |reason: &str| QueryError::invalid_value(path, op.as_str(), reason);

    let test = match op {
        FilterOp::Eq => FieldTest::Eq(value),
        FilterOp::Ne => FieldTest::Ne(value),
        FilterOp::Gt => FieldTest::Gt(value),
        FilterOp::Gte => FieldTest::Gte(value),
        FilterOp::Lt => FieldTest::Lt(value),
        FilterOp::Lte => FieldTest::Lte(value),
        FilterOp::Contains => FieldTest::Contains(value),
        FilterOp::Dteq => FieldTest::DateEq(value),
        FilterOp::In => FieldTest::In(into_list(value).ok_or_else(|| invalid("expected a list"))?),
        FilterOp::Nin => FieldTest::Nin(into_list(value).ok_or_else(|| invalid("expected a list"))?),
        FilterOp::ContainsAny => {
            FieldTest::ContainsAny(into_list(value).ok_or_else(|| invalid("expected a list"))?)
        }
        FilterOp::ContainsNone => {
            FieldTest::ContainsNone(into_list(value).ok_or_else(|| invalid("expected a list"))?)
        }
        FilterOp::Between => match into_list(value) {
            Some(bounds) if bounds.len() == 2 => {
                let mut bounds = bounds.into_iter();
                match (bounds.next(), bounds.next()) {
                    (Some(low), Some(high)) => FieldTest::Between(low, high),
                    _ => return Err(invalid("expected [low, high]")),
                }
            }
            _ => return Err(invalid("expected [low, high]")),
        },
        FilterOp::Regex => {
            let pattern = value
                .as_str()
                .ok_or_else(|| invalid("expected a pattern string"))?;
            FieldTest::Regex(compile_regex(pattern)?)
        }
        FilterOp::Size => FieldTest::Size(as_count(&value).ok_or_else(|| invalid("expected a non-negative integer"))?),
        FilterOp::Len => FieldTest::Len(as_count(&value).ok_or_else(|| invalid("expected a non-negative integer"))?),
        FilterOp::Exists => FieldTest::Exists(value.as_bool().ok_or_else(|| invalid("expected a boolean"))?),
    };
    Ok(test)
}

fn into_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}

/// Compile `pattern` or `/pattern/flags` (flags: `i`, `m`, `s`, `x`)
fn compile_regex(raw: &str) -> Result<Regex, QueryError> {
    let (pattern, flags) = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((pattern, flags)) if flags.chars().all(|c| "imsxgu".contains(c)) => (pattern, flags),
        _ => (raw, ""),
    };

    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|source| QueryError::InvalidRegex {
            pattern: raw.to_string(),
            source,
        })
}

/// Replace `"$name"` strings with the named query variable
fn substitute_variables(value: &Value, variables: &Map<String, Value>) -> Result<Value, QueryError> {
    match value {
        Value::String(s) => match variable_name(s) {
            Some(name) => variables
                .get(name)
                .cloned()
                .ok_or_else(|| QueryError::MissingVariable(name.to_string())),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| substitute_variables(item, variables))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Ok(value.clone()),
    }
}

fn variable_name(value: &str) -> Option<&str> {
    let name = value.strip_prefix('$')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some(name)
    } else {
        None
    }
}
