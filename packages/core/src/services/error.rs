//! Service Layer Error Types
//!
//! This module defines error types for query resolution and render
//! enumeration. Inference problems are never errors: they are collected as
//! warnings (see `services::inference`).

use crate::db::StoreError;
use thiserror::Error;

/// Query resolution errors
///
/// These surface to the author of a query (a page or template), so messages
/// name the offending field and operator.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Filter names a field that has no filter catalog entry
    #[error("Unknown filter field '{field}' on type '{type_name}'")]
    UnknownFilterField { type_name: String, field: String },

    /// Operator exists but is not offered for this field's kind
    #[error("Operator '{operator}' is not supported on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    /// Operator value has the wrong shape (e.g. `in` without a list)
    #[error("Invalid value for '{field}.{operator}': {reason}")]
    InvalidOperatorValue {
        field: String,
        operator: String,
        reason: String,
    },

    /// `regex` operand is not a valid pattern
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    /// A `$variable` in the filter has no value
    #[error("Missing query variable: ${0}")]
    MissingVariable(String),

    /// No schema or collection for this content type
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// Field is not part of the synthesized type
    #[error("Unknown field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// Asset resolver rejected an image or file value
    #[error("Asset resolution failed: {0}")]
    Asset(#[from] anyhow::Error),

    /// Store lookup failed
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Create an unknown filter field error
    pub fn unknown_filter_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownFilterField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            field: field.into(),
            operator: operator.into(),
        }
    }

    /// Create an invalid operator value error
    pub fn invalid_value(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOperatorValue {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown content type error
    pub fn unknown_content_type(type_name: impl Into<String>) -> Self {
        Self::UnknownContentType(type_name.into())
    }

    /// Create an unknown field error
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}

/// Render enumeration errors
///
/// All of these abort the enumeration pass: a static build must never ship
/// with a silently missing page.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Templated or paginated route draws from a collection that does not exist
    #[error("Route '{route}' uses unknown collection '{type_name}'")]
    UnknownCollection { route: String, type_name: String },

    /// Paginated route names no collection and is not a belongs-to template
    #[error("Paginated route '{route}' has no resolvable data source")]
    MissingDataSource { route: String },

    /// Route pattern parameter has no value on a node
    #[error("Route '{route}' needs ':{param}' but node '{node_id}' has no value for it")]
    MissingRouteParam {
        route: String,
        param: String,
        node_id: String,
    },

    /// Query of a paginated route failed
    #[error("Query for route '{route}' failed: {source}")]
    Query { route: String, source: QueryError },

    /// Background enumeration task failed
    #[error("Render task failed: {0}")]
    TaskFailed(String),
}

impl RenderError {
    /// Create an unknown collection error
    pub fn unknown_collection(route: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnknownCollection {
            route: route.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a missing data source error
    pub fn missing_data_source(route: impl Into<String>) -> Self {
        Self::MissingDataSource {
            route: route.into(),
        }
    }

    /// Create a missing route parameter error
    pub fn missing_route_param(
        route: impl Into<String>,
        param: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self::MissingRouteParam {
            route: route.into(),
            param: param.into(),
            node_id: node_id.into(),
        }
    }

    /// Create a query failure error
    pub fn query(route: impl Into<String>, source: QueryError) -> Self {
        Self::Query {
            route: route.into(),
            source,
        }
    }

    /// Create a task failure error
    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }
}
