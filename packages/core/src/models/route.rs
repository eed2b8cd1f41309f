//! Route Declarations and Render Entries
//!
//! Routes come from the page-definition layer. Three shapes are supported:
//!
//! - **Static**: `{ path: "/about", component: "About" }` → one entry
//! - **Templated**: `{ path: "/blog/:slug", component: "Post", template: "Post" }`
//!   → one entry per node of the `Post` collection
//! - **Paginated**: a static or templated route whose query carries the
//!   pagination directive → one entry per page
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::models::RouteDefinition;
//! use serde_json::json;
//!
//! let route: RouteDefinition = serde_json::from_value(json!({
//!     "path": "/blog",
//!     "component": "BlogIndex",
//!     "query": {
//!         "source": "Post",
//!         "paginate": true,
//!         "perPage": 10,
//!         "sortBy": "date"
//!     }
//! }))
//! .unwrap();
//!
//! assert!(route.is_paginated());
//! assert!(!route.is_templated());
//! ```

use crate::models::QueryArgs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a route query draws its nodes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    /// Collection (content type) to query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Query the nodes referencing the current template node instead of a collection
    #[serde(default)]
    pub belongs_to: bool,

    /// The pagination directive
    #[serde(default)]
    pub paginate: bool,

    #[serde(flatten)]
    pub args: QueryArgs,
}

/// A route declared by the page-definition layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDefinition {
    /// Static path, or a pattern with `:param` segments for templates
    pub path: String,

    /// Component rendering this route
    pub component: String,

    /// Collection this route is a template for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<RouteQuery>,
}

impl RouteDefinition {
    pub fn new_static(path: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            template: None,
            query: None,
        }
    }

    pub fn new_template(
        path: impl Into<String>,
        component: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            template: Some(collection.into()),
            query: None,
        }
    }

    pub fn with_query(mut self, query: RouteQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn is_templated(&self) -> bool {
        self.template.is_some()
    }

    pub fn is_paginated(&self) -> bool {
        self.query.as_ref().is_some_and(|q| q.paginate)
    }
}

impl RouteQuery {
    /// Paginated listing of a collection
    pub fn paginate_collection(source: impl Into<String>, args: QueryArgs) -> Self {
        Self {
            source: Some(source.into()),
            belongs_to: false,
            paginate: true,
            args,
        }
    }

    /// Paginated listing of the nodes referencing the current template node
    pub fn paginate_belongs_to(args: QueryArgs) -> Self {
        Self {
            source: None,
            belongs_to: true,
            paginate: true,
            args,
        }
    }
}

/// One concrete output page of a static build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEntry {
    pub path: String,
    pub component: String,
    pub query_variables: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
}
