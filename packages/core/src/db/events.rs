//! Store Events
//!
//! Events emitted by `ContentStore` when data changes. They are published on a
//! tokio broadcast channel so watch-mode consumers (schema rebuilds, render
//! plan invalidation) can subscribe without coupling to the store.
//!
//! # Event Flow
//!
//! 1. `ContentStore` performs an insert, update or remove
//! 2. The event is sent on the broadcast channel after the write lock is released
//! 3. All subscribers receive the event asynchronously

use crate::models::ContentNode;
use serde::Serialize;
use std::sync::Arc;

/// Change notifications emitted by the content store
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    /// A new node was inserted
    NodeCreated { node: Arc<ContentNode> },

    /// An existing node was updated
    NodeUpdated { node: Arc<ContentNode> },

    /// A node was removed
    #[serde(rename_all = "camelCase")]
    NodeDeleted { type_name: String, id: String },
}

impl StoreEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            StoreEvent::NodeCreated { .. } => "node:created",
            StoreEvent::NodeUpdated { .. } => "node:updated",
            StoreEvent::NodeDeleted { .. } => "node:deleted",
        }
    }

    /// Content type affected by this event
    pub fn type_name(&self) -> &str {
        match self {
            StoreEvent::NodeCreated { node } | StoreEvent::NodeUpdated { node } => &node.type_name,
            StoreEvent::NodeDeleted { type_name, .. } => type_name,
        }
    }
}
