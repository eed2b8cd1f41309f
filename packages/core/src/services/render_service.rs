//! Render Enumerator
//!
//! Walks route definitions against a store snapshot and produces every
//! concrete output path of a static build, with the query variables its page
//! component needs.
//!
//! # Route shapes
//!
//! - **Static** → one entry
//! - **Templated** (`template: "Post"`) → one entry per node of the collection,
//!   the `:param` segments of the path filled from the node
//! - **Paginated** (query with `paginate: true`) → one entry per page
//!   `1..=totalPages`, page N ≥ 2 at `<base>/N`. A templated route may
//!   paginate per node, over a collection or the node's belongs-to set
//!
//! Page counts come from the same `PageWindow` math the query service uses,
//! so a built site has exactly the pages the live resolver reports.
//!
//! # Route parameters
//!
//! | Segment            | Value                                        |
//! |--------------------|----------------------------------------------|
//! | `:id`              | node id                                      |
//! | `:year` `:month` `:day` | parts of the node's `date` field        |
//! | `:<field>_raw`     | field value as-is                            |
//! | `:<field>`         | field value, slugified                       |
//!
//! A reference marker contributes its referenced id.

use crate::db::{ContentStore, StoreSnapshot};
use crate::models::{ContentNode, ReferenceMarker, RenderEntry, RouteDefinition, RouteQuery};
use crate::services::error::RenderError;
use crate::services::query_service::{QueryService, QuerySource};
use crate::utils::{parse_date, slugify};
use rayon::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

static ROUTE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap());

const RAW_SUFFIX: &str = "_raw";
const DATE_FIELD: &str = "date";

/// Enumerates render entries for a set of routes
#[derive(Debug, Clone)]
pub struct RenderService {
    query: QueryService,
}

impl RenderService {
    pub fn new(query: QueryService) -> Self {
        Self { query }
    }

    /// Enumerate all entries for `routes`, in route order
    ///
    /// Routes are processed on the rayon pool when `parallel_render` is set;
    /// the output order is the same either way. A later entry whose path was
    /// already produced is dropped with a warning.
    pub fn enumerate(
        &self,
        routes: &[RouteDefinition],
        snapshot: &StoreSnapshot,
    ) -> Result<Vec<RenderEntry>, RenderError> {
        let per_route: Vec<Vec<RenderEntry>> = if self.query.config().parallel_render {
            routes
                .par_iter()
                .map(|route| self.enumerate_route(route, snapshot))
                .collect::<Result<_, _>>()?
        } else {
            routes
                .iter()
                .map(|route| self.enumerate_route(route, snapshot))
                .collect::<Result<_, _>>()?
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for entry in per_route.into_iter().flatten() {
            if seen.insert(entry.path.clone()) {
                entries.push(entry);
            } else {
                tracing::warn!(
                    "Duplicate render path '{}' (component {}), keeping the first",
                    entry.path,
                    entry.component
                );
            }
        }

        tracing::info!(
            "Enumerated {} render entries from {} routes",
            entries.len(),
            routes.len()
        );
        Ok(entries)
    }

    /// Enumerate against the current state of a live store
    ///
    /// The walk runs on a blocking thread so callers on the async runtime are
    /// not stalled by large builds.
    pub async fn enumerate_store(
        &self,
        routes: Vec<RouteDefinition>,
        store: &ContentStore,
    ) -> Result<Vec<RenderEntry>, RenderError> {
        let snapshot = store.snapshot().await;
        let service = self.clone();

        tokio::task::spawn_blocking(move || service.enumerate(&routes, &snapshot))
            .await
            .map_err(|e| RenderError::task_failed(e.to_string()))?
    }

    fn enumerate_route(
        &self,
        route: &RouteDefinition,
        snapshot: &StoreSnapshot,
    ) -> Result<Vec<RenderEntry>, RenderError> {
        let entries = match &route.template {
            Some(collection) => self.enumerate_template(route, collection, snapshot)?,
            None => {
                let base = self.normalize(&route.path);
                match route.query.as_ref().filter(|q| q.paginate) {
                    Some(query) => {
                        let source = match (&query.source, query.belongs_to) {
                            (_, true) | (None, false) => {
                                return Err(RenderError::missing_data_source(&route.path))
                            }
                            (Some(source), false) => source,
                        };
                        if !snapshot.has_collection(source) {
                            return Err(RenderError::unknown_collection(&route.path, source));
                        }
                        self.paginate(
                            route,
                            &base,
                            QuerySource::Collection(source.clone()),
                            query,
                            Map::new(),
                            snapshot,
                        )?
                    }
                    None => vec![RenderEntry {
                        path: base,
                        component: route.component.clone(),
                        query_variables: Map::new(),
                        page_number: None,
                    }],
                }
            }
        };

        tracing::debug!("Route {} produced {} entries", route.path, entries.len());
        Ok(entries)
    }

    fn enumerate_template(
        &self,
        route: &RouteDefinition,
        collection: &str,
        snapshot: &StoreSnapshot,
    ) -> Result<Vec<RenderEntry>, RenderError> {
        let nodes = snapshot
            .collection(collection)
            .ok_or_else(|| RenderError::unknown_collection(&route.path, collection))?;
        let paginate = route.query.as_ref().filter(|q| q.paginate);

        let mut entries = Vec::new();
        for node in nodes.iter() {
            let (path, mut variables) = fill_route(&route.path, node)
                .map_err(|param| RenderError::missing_route_param(&route.path, param, &node.id))?;
            variables.insert("id".to_string(), Value::String(node.id.clone()));
            let base = self.normalize(&path);

            match paginate {
                Some(query) => {
                    let source = if query.belongs_to {
                        QuerySource::BelongsTo(node.key())
                    } else {
                        let source = query.source.as_deref().unwrap_or(collection);
                        if !snapshot.has_collection(source) {
                            return Err(RenderError::unknown_collection(&route.path, source));
                        }
                        QuerySource::Collection(source.to_string())
                    };
                    entries.extend(self.paginate(route, &base, source, query, variables, snapshot)?);
                }
                None => entries.push(RenderEntry {
                    path: base,
                    component: route.component.clone(),
                    query_variables: variables,
                    page_number: None,
                }),
            }
        }
        Ok(entries)
    }

    fn paginate(
        &self,
        route: &RouteDefinition,
        base: &str,
        source: QuerySource,
        query: &RouteQuery,
        variables: Map<String, Value>,
        snapshot: &StoreSnapshot,
    ) -> Result<Vec<RenderEntry>, RenderError> {
        let plan = self
            .query
            .plan(source, &query.args, &variables)
            .map_err(|e| RenderError::query(&route.path, e))?;
        let total_pages = self
            .query
            .total_pages(snapshot, &plan)
            .map_err(|e| RenderError::query(&route.path, e))?;

        Ok((1..=total_pages)
            .map(|page| {
                let mut query_variables = variables.clone();
                query_variables.insert("page".to_string(), Value::from(page));
                RenderEntry {
                    path: self.page_path(base, page),
                    component: route.component.clone(),
                    query_variables,
                    page_number: Some(page),
                }
            })
            .collect())
    }

    fn page_path(&self, base: &str, page: usize) -> String {
        if page < 2 {
            return base.to_string();
        }
        let trimmed = base.trim_end_matches('/');
        self.normalize(&format!("{trimmed}/{page}"))
    }

    /// Leading slash, no empty segments, trailing slash per config
    fn normalize(&self, path: &str) -> String {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return "/".to_string();
        }
        let mut normalized = format!("/{}", segments.join("/"));
        if self.query.config().trailing_slash {
            normalized.push('/');
        }
        normalized
    }
}

/// Fill `:param` segments from a node
///
/// Returns the filled path and the parameter values, or the name of the
/// first parameter the node has no value for.
fn fill_route(pattern: &str, node: &ContentNode) -> Result<(String, Map<String, Value>), String> {
    let mut variables = Map::new();
    let mut path = String::with_capacity(pattern.len());
    let mut last = 0;

    for captures in ROUTE_PARAM_RE.captures_iter(pattern) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = param_value(name.as_str(), node).ok_or_else(|| name.as_str().to_string())?;
        path.push_str(&pattern[last..whole.start()]);
        path.push_str(&value);
        variables.insert(name.as_str().to_string(), Value::String(value));
        last = whole.end();
    }
    path.push_str(&pattern[last..]);

    if variables.is_empty() {
        if let Some(own) = &node.path {
            return Ok((own.clone(), variables));
        }
    }
    Ok((path, variables))
}

fn param_value(name: &str, node: &ContentNode) -> Option<String> {
    match name {
        "id" => return Some(node.id.clone()),
        "year" | "month" | "day" if node.field(name).is_none() => {
            let date = parse_date(node.field(DATE_FIELD)?.as_str()?)?;
            let format = match name {
                "year" => "%Y",
                "month" => "%m",
                _ => "%d",
            };
            return Some(date.format(format).to_string());
        }
        _ => {}
    }

    let text = match name.strip_suffix(RAW_SUFFIX) {
        Some(field) if !field.is_empty() => segment_text(node.field(field)?)?,
        _ => slugify(&segment_text(node.field(name)?)?),
    };
    (!text.is_empty()).then_some(text)
}

fn segment_text(value: &Value) -> Option<String> {
    if let Some(marker) = ReferenceMarker::parse(value) {
        return marker.ids.into_iter().next();
    }
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
