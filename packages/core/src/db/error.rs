//! Store Error Types
//!
//! This module defines error types for collection store operations: uniqueness
//! violations, missing nodes and collections, and node validation failures.

use crate::models::ValidationError;
use thiserror::Error;

/// Collection store operation errors
///
/// Duplicate `id`/`path` inserts are fatal for the caller; a source must not
/// produce two records with the same identity in one collection.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A node with this id already exists in the collection
    #[error("Duplicate id '{id}' in collection '{type_name}'")]
    DuplicateId { type_name: String, id: String },

    /// Another node in the collection already owns this path
    #[error("Duplicate path '{path}' in collection '{type_name}' (already used by '{existing_id}')")]
    DuplicatePath {
        type_name: String,
        path: String,
        existing_id: String,
    },

    /// Node does not exist
    #[error("Node not found: {type_name}/{id}")]
    NodeNotFound { type_name: String, id: String },

    /// No collection registered for this content type
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Node failed structural validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl StoreError {
    /// Create a duplicate id error
    pub fn duplicate_id(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate path error
    pub fn duplicate_path(
        type_name: impl Into<String>,
        path: impl Into<String>,
        existing_id: impl Into<String>,
    ) -> Self {
        Self::DuplicatePath {
            type_name: type_name.into(),
            path: path.into(),
            existing_id: existing_id.into(),
        }
    }

    /// Create a node not found error
    pub fn node_not_found(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Create an unknown collection error
    pub fn unknown_collection(type_name: impl Into<String>) -> Self {
        Self::UnknownCollection(type_name.into())
    }
}
