//! Query Arguments and Results
//!
//! Plain key/value argument maps (`filter`, `sortBy`, `order`, `sort`, `skip`,
//! `perPage`, `page`, `limit`) and the paginated "connection" result shape
//! returned by the query resolver.

use crate::models::ContentNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    /// Dotted field path or built-in (`id`, `path`, `typeName`, `internal.originTimestamp`)
    pub by: String,
    #[serde(default = "default_order")]
    pub order: SortOrder,
}

fn default_order() -> SortOrder {
    SortOrder::Desc
}

impl SortSpec {
    pub fn asc(by: impl Into<String>) -> Self {
        Self {
            by: by.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(by: impl Into<String>) -> Self {
        Self {
            by: by.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Arguments of a collection or belongs-to query
///
/// # Examples
///
/// ```rust
/// use sitegraph_core::models::QueryArgs;
/// use serde_json::json;
///
/// let args: QueryArgs = serde_json::from_value(json!({
///     "filter": { "published": { "eq": true } },
///     "sortBy": "date",
///     "order": "DESC",
///     "perPage": 10,
///     "page": 2
/// }))
/// .unwrap();
///
/// assert_eq!(args.per_page, Some(10));
/// assert_eq!(args.sort_keys().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,

    /// Multi-key sort, applied after `sortBy`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(by.into());
        self.order = Some(order);
        self
    }

    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective sort keys: `sortBy`/`order` first, then `sort`.
    ///
    /// `order` without `sortBy` is ignored; `sortBy` without `order` sorts
    /// descending.
    pub fn sort_keys(&self) -> Vec<SortSpec> {
        let mut keys = Vec::with_capacity(self.sort.len() + 1);
        if let Some(by) = &self.sort_by {
            keys.push(SortSpec {
                by: by.clone(),
                order: self.order.unwrap_or(SortOrder::Desc),
            });
        }
        keys.extend(self.sort.iter().cloned());
        keys
    }
}

/// One result edge; `next`/`previous` point within the returned page only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub node: Arc<ContentNode>,
    pub next: Option<Arc<ContentNode>>,
    pub previous: Option<Arc<ContentNode>>,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_pages: usize,
    pub current_page: usize,
    pub per_page: usize,
    pub is_first: bool,
    pub is_last: bool,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// A resolved page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub total_count: usize,
    pub page_info: PageInfo,
    pub edges: Vec<Edge>,
}

impl Connection {
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<ContentNode>> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.edges.iter().map(|edge| edge.node.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_keys_order() {
        let args: QueryArgs = serde_json::from_value(json!({
            "sortBy": "date",
            "sort": [{"by": "title", "order": "asc"}]
        }))
        .unwrap();

        assert_eq!(
            args.sort_keys(),
            vec![SortSpec::desc("date"), SortSpec::asc("title")]
        );
    }

    #[test]
    fn test_order_without_sort_by_is_ignored() {
        let args = QueryArgs {
            order: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert!(args.sort_keys().is_empty());
    }

    #[test]
    fn test_camel_case_arguments() {
        let args: QueryArgs =
            serde_json::from_value(json!({"perPage": 4, "page": 2, "skip": 1, "limit": 9}))
                .unwrap();
        assert_eq!(args.per_page, Some(4));
        assert_eq!(args.page, Some(2));
        assert_eq!(args.skip, Some(1));
        assert_eq!(args.limit, Some(9));
    }
}
