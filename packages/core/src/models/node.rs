//! Content Node Data Structures
//!
//! This module defines `ContentNode`, the universal record harvested from content
//! sources (files, APIs, markup) and stored per content type in a collection.
//!
//! # Architecture
//!
//! - **Universal Node**: Single struct represents every content type
//! - **Loosely Typed Fields**: All source data lives in the `fields` JSON object
//! - **Reference Markers**: Cross-collection links are `{typeName, id}` objects inside `fields`
//! - **Inferred Schema**: Field types are derived from the data, never declared up front
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::models::ContentNode;
//! use serde_json::json;
//!
//! let post = ContentNode::new_with_id(
//!     "post-1".to_string(),
//!     "Post".to_string(),
//!     json!({
//!         "title": "Hello World",
//!         "date": "2024-03-01",
//!         "tag": { "typeName": "Tag", "id": "rust" }
//!     }),
//! )
//! .with_path("/blog/hello-world");
//!
//! assert_eq!(post.field("title").unwrap(), "Hello World");
//! assert_eq!(post.references().len(), 1);
//! ```

use crate::models::reference::ReferenceMarker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for ContentNode operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid type name: {0}")]
    InvalidTypeName(String),

    #[error("Fields validation failed: {0}")]
    InvalidFields(String),
}

/// Source bookkeeping attached to every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalMeta {
    /// When the source produced this record
    pub origin_timestamp: DateTime<Utc>,

    /// Mime type of the originating content, if known (e.g. "text/markdown")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Default for InternalMeta {
    fn default() -> Self {
        Self {
            origin_timestamp: Utc::now(),
            mime_type: None,
        }
    }
}

/// A (typeName, id) pair identifying a node across the whole store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeKey {
    pub type_name: String,
    pub id: String,
}

impl NodeKey {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Universal content record.
///
/// # Fields
///
/// - `id`: Unique identifier within the node's collection
/// - `type_name`: Content type (collection name), e.g. "Post", "Tag"
/// - `path`: Optional URL path, unique within the collection when present
/// - `fields`: JSON object holding all source data (untyped, recursively nested)
/// - `internal`: Source bookkeeping (origin timestamp, mime type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Unique identifier within the collection
    pub id: String,

    /// Content type name
    pub type_name: String,

    /// URL path, unique within the collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// All source data (must be a JSON object)
    #[serde(default = "empty_fields")]
    pub fields: Value,

    /// Source bookkeeping
    #[serde(default)]
    pub internal: InternalMeta,
}

fn empty_fields() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ContentNode {
    /// Create a new node with an auto-generated UUID
    pub fn new(type_name: String, fields: Value) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), type_name, fields)
    }

    /// Create a new node with an explicit ID (source-provided identifiers)
    pub fn new_with_id(id: String, type_name: String, fields: Value) -> Self {
        Self {
            id,
            type_name,
            path: None,
            fields,
            internal: InternalMeta::default(),
        }
    }

    /// Set the URL path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the originating mime type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.internal.mime_type = Some(mime_type.into());
        self
    }

    /// Validate node structure and required fields
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - `type_name` is empty or contains whitespace
    /// - `fields` is not a JSON object
    /// - `path` is present but empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if self.type_name.is_empty() {
            return Err(ValidationError::MissingField("typeName".to_string()));
        }

        if self.type_name.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidTypeName(self.type_name.clone()));
        }

        if !self.fields.is_object() {
            return Err(ValidationError::InvalidFields(
                "fields must be a JSON object".to_string(),
            ));
        }

        if matches!(self.path.as_deref(), Some("")) {
            return Err(ValidationError::MissingField("path".to_string()));
        }

        Ok(())
    }

    /// Key identifying this node across the store
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.type_name.clone(), self.id.clone())
    }

    /// Get a top-level field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Look up a dotted path.
    ///
    /// The built-in names `id`, `typeName`, `path` and `internal.originTimestamp`
    /// resolve to node metadata; everything else walks `fields`. When a path
    /// crosses a list, the remaining segments are applied to every element and
    /// the results are flattened into one list (so `tags.id` on a list of
    /// reference markers yields the list of ids).
    pub fn lookup(&self, path: &str) -> Option<Cow<'_, Value>> {
        match path {
            "id" => return Some(Cow::Owned(Value::String(self.id.clone()))),
            "typeName" => return Some(Cow::Owned(Value::String(self.type_name.clone()))),
            "path" => return self.path.clone().map(|p| Cow::Owned(Value::String(p))),
            "internal.originTimestamp" => {
                return Some(Cow::Owned(Value::String(
                    self.internal.origin_timestamp.to_rfc3339(),
                )))
            }
            "internal.mimeType" => {
                return self
                    .internal
                    .mime_type
                    .clone()
                    .map(|m| Cow::Owned(Value::String(m)))
            }
            _ => {}
        }

        let segments: Vec<&str> = path.split('.').collect();
        lookup_segments(&self.fields, &segments)
    }

    /// All (typeName, id) pairs referenced anywhere in this node's fields
    ///
    /// Markers whose `typeName` is missing contribute nothing. A marker with a
    /// list of type names references its id(s) under every listed type.
    pub fn references(&self) -> Vec<NodeKey> {
        let mut keys = Vec::new();
        collect_references(&self.fields, &mut keys);
        keys.sort();
        keys.dedup();
        keys
    }

    /// Replace the fields (used by update operations)
    pub fn set_fields(&mut self, fields: Value) {
        self.fields = fields;
        self.internal.origin_timestamp = Utc::now();
    }
}

fn lookup_segments<'a>(value: &'a Value, segments: &[&str]) -> Option<Cow<'a, Value>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Cow::Borrowed(value));
    };

    match value {
        Value::Object(map) => lookup_segments(map.get(*head)?, rest),
        Value::Array(items) => {
            let mut collected = Vec::new();
            for item in items {
                match lookup_segments(item, segments) {
                    Some(Cow::Borrowed(Value::Array(inner))) => collected.extend(inner.iter().cloned()),
                    Some(Cow::Owned(Value::Array(inner))) => collected.extend(inner),
                    Some(found) => collected.push(found.into_owned()),
                    None => {}
                }
            }
            if collected.is_empty() {
                None
            } else {
                Some(Cow::Owned(Value::Array(collected)))
            }
        }
        _ => None,
    }
}

fn collect_references(value: &Value, out: &mut Vec<NodeKey>) {
    if let Some(marker) = ReferenceMarker::parse(value) {
        for type_name in &marker.type_names {
            for id in &marker.ids {
                out.push(NodeKey::new(type_name.clone(), id.clone()));
            }
        }
        return;
    }

    match value {
        Value::Object(map) => map.values().for_each(|v| collect_references(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        _ => {}
    }
}

/// Partial node update for PATCH-style source changes
///
/// `None` leaves the attribute untouched. For `path` the double-Option pattern
/// distinguishes "don't change" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.path = Some(path);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.fields.is_none() && self.path.is_none() && self.mime_type.is_none()
    }

    /// Apply this update to a node, producing the replacement value
    pub fn apply_to(&self, node: &ContentNode) -> ContentNode {
        let mut updated = node.clone();
        if let Some(fields) = &self.fields {
            updated.set_fields(fields.clone());
        }
        if let Some(path) = &self.path {
            updated.path = path.clone();
        }
        if let Some(mime_type) = &self.mime_type {
            updated.internal.mime_type = Some(mime_type.clone());
        }
        updated
    }
}

/// Result of a delete operation
///
/// Deletes are idempotent; `existed` reports whether anything was removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub existed: bool,
}

impl DeleteResult {
    pub fn existed() -> Self {
        Self { existed: true }
    }

    pub fn not_found() -> Self {
        Self { existed: false }
    }
}
