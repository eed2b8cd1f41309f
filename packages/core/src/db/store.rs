//! Content Store
//!
//! The indexed, mutable set of collections plus the belongs-to index.
//!
//! # Architecture
//!
//! - **Single writer**: mutations take the write half of a tokio `RwLock`
//! - **Consistent readers**: `snapshot()` clones the `Arc`s of every collection
//!   and of the belongs-to index; writers then proceed copy-on-write
//!   (`Arc::make_mut`), so a snapshot never observes a partial mutation
//! - **Events**: every successful write is published on a broadcast channel
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::db::ContentStore;
//! use sitegraph_core::models::{ContentNode, NodeKey};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ContentStore::new();
//! store
//!     .insert(ContentNode::new_with_id("t1".into(), "Tag".into(), json!({"title": "Rust"})))
//!     .await?;
//! store
//!     .insert(ContentNode::new_with_id(
//!         "a".into(),
//!         "Post".into(),
//!         json!({"tags": [{"typeName": "Tag", "id": "t1"}]}),
//!     ))
//!     .await?;
//!
//! let snapshot = store.snapshot().await;
//! let referencing = snapshot.referencing(&NodeKey::new("Tag", "t1"));
//! assert_eq!(referencing.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::config::EngineConfig;
use crate::db::belongs_to::BelongsToIndex;
use crate::db::collection::Collection;
use crate::db::error::StoreError;
use crate::db::events::StoreEvent;
use crate::db::query::{NodeQuery, Predicate, QueryCursor};
use crate::models::{ContentNode, DeleteResult, NodeKey, NodeUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default)]
struct StoreState {
    collections: BTreeMap<String, Arc<Collection>>,
    belongs_to: Arc<BelongsToIndex>,
    next_seq: u64,
}

/// Immutable, consistent view of the store
///
/// Cheap to clone; safe to move into blocking or parallel work.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    collections: BTreeMap<String, Arc<Collection>>,
    belongs_to: Arc<BelongsToIndex>,
}

impl StoreSnapshot {
    pub fn collection(&self, type_name: &str) -> Option<&Collection> {
        self.collections.get(type_name).map(Arc::as_ref)
    }

    pub fn has_collection(&self, type_name: &str) -> bool {
        self.collections.contains_key(type_name)
    }

    /// Registered content type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values().map(Arc::as_ref)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&Arc<ContentNode>> {
        self.by_id(&key.type_name, &key.id)
    }

    pub fn by_id(&self, type_name: &str, id: &str) -> Option<&Arc<ContentNode>> {
        self.collection(type_name)?.by_id(id)
    }

    pub fn belongs_to_index(&self) -> &BelongsToIndex {
        &self.belongs_to
    }

    pub fn find(
        &self,
        type_name: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Arc<ContentNode>>, StoreError> {
        Ok(self.require(type_name)?.find(predicate))
    }

    pub fn chain(&self, type_name: &str, query: &NodeQuery) -> Result<QueryCursor, StoreError> {
        Ok(self.require(type_name)?.chain(query))
    }

    /// Keys of stored nodes referencing `target`
    ///
    /// Index entries whose source node is no longer present are skipped.
    pub fn referencing(&self, target: &NodeKey) -> Vec<NodeKey> {
        self.belongs_to
            .referencing(target)
            .into_iter()
            .filter(|key| self.node(key).is_some())
            .collect()
    }

    /// Evaluate a query over every node referencing `(target_type, target_id)`
    ///
    /// Candidates are taken in store-wide insertion order, so ties in the
    /// requested sort are broken the same way as for a collection query.
    pub fn belongs_to(&self, target: &NodeKey, query: &NodeQuery) -> QueryCursor {
        let mut candidates: Vec<(u64, Arc<ContentNode>)> = self
            .belongs_to
            .referencing(target)
            .into_iter()
            .filter_map(|key| {
                let collection = self.collection(&key.type_name)?;
                let seq = collection.sequence_of(&key.id)?;
                let node = collection.by_id(&key.id)?;
                Some((seq, Arc::clone(node)))
            })
            .collect();
        candidates.sort_by_key(|(seq, _)| *seq);

        query.evaluate(candidates.into_iter().map(|(_, node)| node).collect())
    }

    fn require(&self, type_name: &str) -> Result<&Collection, StoreError> {
        self.collection(type_name)
            .ok_or_else(|| StoreError::unknown_collection(type_name))
    }
}

/// Indexed in-memory store of content nodes, one collection per content type
pub struct ContentStore {
    state: RwLock<StoreState>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_event_capacity(config.event_capacity)
    }

    fn with_event_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(StoreState::default()),
            event_tx,
        }
    }

    /// Subscribe to store events
    ///
    /// Returns a broadcast receiver that receives every node created, updated
    /// and deleted after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores send errors; having no subscribers is normal
    fn emit_event(&self, event: StoreEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Register an (initially empty) collection
    ///
    /// Returns `false` if it already existed. Content types with no nodes
    /// still need a collection so they can be queried and used as reference
    /// targets.
    pub async fn add_collection(&self, type_name: &str) -> bool {
        let mut state = self.state.write().await;
        if state.collections.contains_key(type_name) {
            return false;
        }
        state
            .collections
            .insert(type_name.to_string(), Arc::new(Collection::new(type_name)));
        tracing::debug!("Registered collection {}", type_name);
        true
    }

    /// Insert a new node, creating its collection on first use
    ///
    /// # Errors
    ///
    /// - `StoreError::Validation` for structurally invalid nodes
    /// - `StoreError::DuplicateId` / `StoreError::DuplicatePath`
    pub async fn insert(&self, node: ContentNode) -> Result<Arc<ContentNode>, StoreError> {
        // A rejected node must not register its collection
        node.validate()?;

        let inserted = {
            let mut state = self.state.write().await;
            let seq = state.next_seq;
            let collection = state
                .collections
                .entry(node.type_name.clone())
                .or_insert_with(|| Arc::new(Collection::new(node.type_name.clone())));
            let inserted = Arc::make_mut(collection).insert(node, seq)?;

            state.next_seq += 1;
            Arc::make_mut(&mut state.belongs_to).add_node(&inserted);
            inserted
        };

        tracing::debug!("Inserted {}/{}", inserted.type_name, inserted.id);
        self.emit_event(StoreEvent::NodeCreated {
            node: Arc::clone(&inserted),
        });
        Ok(inserted)
    }

    /// Insert many nodes, stopping at the first error
    pub async fn insert_many(
        &self,
        nodes: impl IntoIterator<Item = ContentNode>,
    ) -> Result<usize, StoreError> {
        let mut count = 0;
        for node in nodes {
            self.insert(node).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Update a node in place (it keeps its insertion position)
    pub async fn update(
        &self,
        type_name: &str,
        id: &str,
        update: NodeUpdate,
    ) -> Result<Arc<ContentNode>, StoreError> {
        let updated = {
            let mut state = self.state.write().await;
            let collection = state
                .collections
                .get_mut(type_name)
                .ok_or_else(|| StoreError::unknown_collection(type_name))?;

            if collection.by_id(id).is_none() {
                return Err(StoreError::node_not_found(type_name, id));
            }
            let (_, updated) = Arc::make_mut(collection).update(id, &update)?;

            Arc::make_mut(&mut state.belongs_to).update_node(&updated);
            updated
        };

        tracing::debug!("Updated {}/{}", type_name, id);
        self.emit_event(StoreEvent::NodeUpdated {
            node: Arc::clone(&updated),
        });
        Ok(updated)
    }

    /// Remove a node
    ///
    /// Idempotent: removing a missing node (or from a missing collection)
    /// returns `existed: false`.
    pub async fn remove(&self, type_name: &str, id: &str) -> DeleteResult {
        let removed = {
            let mut state = self.state.write().await;
            let Some(collection) = state.collections.get_mut(type_name) else {
                return DeleteResult::not_found();
            };
            if collection.by_id(id).is_none() {
                return DeleteResult::not_found();
            }

            let removed = Arc::make_mut(collection).remove(id);
            if let Some(node) = &removed {
                Arc::make_mut(&mut state.belongs_to).remove_node(&node.key());
            }
            removed
        };

        match removed {
            Some(_) => {
                tracing::debug!("Removed {}/{}", type_name, id);
                self.emit_event(StoreEvent::NodeDeleted {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                });
                DeleteResult::existed()
            }
            None => DeleteResult::not_found(),
        }
    }

    pub async fn by_id(&self, type_name: &str, id: &str) -> Option<Arc<ContentNode>> {
        let state = self.state.read().await;
        state
            .collections
            .get(type_name)
            .and_then(|c| c.by_id(id))
            .cloned()
    }

    pub async fn find(
        &self,
        type_name: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Arc<ContentNode>>, StoreError> {
        self.snapshot().await.find(type_name, predicate)
    }

    pub async fn chain(&self, type_name: &str, query: &NodeQuery) -> Result<QueryCursor, StoreError> {
        self.snapshot().await.chain(type_name, query)
    }

    pub async fn belongs_to(&self, target_type: &str, target_id: &str, query: &NodeQuery) -> QueryCursor {
        self.snapshot()
            .await
            .belongs_to(&NodeKey::new(target_type, target_id), query)
    }

    pub async fn len(&self, type_name: &str) -> usize {
        let state = self.state.read().await;
        state.collections.get(type_name).map_or(0, |c| c.len())
    }

    /// Consistent read-only view of all collections
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            collections: state.collections.clone(),
            belongs_to: Arc::clone(&state.belongs_to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(type_name: &str, id: &str, fields: serde_json::Value) -> ContentNode {
        ContentNode::new_with_id(id.to_string(), type_name.to_string(), fields)
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_writes() {
        let store = ContentStore::new();
        store.insert(node("Post", "a", json!({}))).await.unwrap();

        let before = store.snapshot().await;
        store.insert(node("Post", "b", json!({}))).await.unwrap();
        store
            .update("Post", "a", NodeUpdate::new().with_fields(json!({"title": "x"})))
            .await
            .unwrap();

        assert_eq!(before.collection("Post").unwrap().len(), 1);
        assert!(before.by_id("Post", "a").unwrap().field("title").is_none());

        let after = store.snapshot().await;
        assert_eq!(after.collection("Post").unwrap().len(), 2);
        assert_eq!(after.by_id("Post", "a").unwrap().field("title").unwrap(), "x");
    }

    #[tokio::test]
    async fn test_same_id_allowed_in_different_collections() {
        let store = ContentStore::new();
        store.insert(node("Post", "1", json!({}))).await.unwrap();
        store.insert(node("Tag", "1", json!({}))).await.unwrap();
        assert!(matches!(
            store.insert(node("Tag", "1", json!({}))).await,
            Err(StoreError::DuplicateId { .. })
        ));
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let store = ContentStore::new();
        let mut rx = store.subscribe();

        store.insert(node("Post", "a", json!({}))).await.unwrap();
        store
            .update("Post", "a", NodeUpdate::new().with_fields(json!({"n": 1})))
            .await
            .unwrap();
        assert!(store.remove("Post", "a").await.existed);
        assert!(!store.remove("Post", "a").await.existed);

        assert_eq!(rx.recv().await.unwrap().event_type(), "node:created");
        assert_eq!(rx.recv().await.unwrap().event_type(), "node:updated");
        assert_eq!(rx.recv().await.unwrap().event_type(), "node:deleted");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_belongs_to_follows_updates() {
        let store = ContentStore::new();
        store
            .insert(node("Post", "a", json!({"tag": {"typeName": "Tag", "id": "t1"}})))
            .await
            .unwrap();

        let cursor = store.belongs_to("Tag", "t1", &NodeQuery::new()).await;
        assert_eq!(cursor.ids(), vec!["a"]);

        store
            .update(
                "Post",
                "a",
                NodeUpdate::new().with_fields(json!({"tag": {"typeName": "Tag", "id": "t2"}})),
            )
            .await
            .unwrap();

        assert!(store.belongs_to("Tag", "t1", &NodeQuery::new()).await.nodes.is_empty());
        assert_eq!(store.belongs_to("Tag", "t2", &NodeQuery::new()).await.matched, 1);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let store = ContentStore::new();
        assert!(matches!(
            store.update("Post", "a", NodeUpdate::new()).await,
            Err(StoreError::UnknownCollection(_))
        ));

        store.add_collection("Post").await;
        assert!(matches!(
            store.update("Post", "a", NodeUpdate::new()).await,
            Err(StoreError::NodeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_chain_on_unknown_collection() {
        let store = ContentStore::new();
        assert!(matches!(
            store.chain("Nope", &NodeQuery::new()).await,
            Err(StoreError::UnknownCollection(_))
        ));
        assert!(store.add_collection("Nope").await);
        assert!(!store.add_collection("Nope").await);
        assert_eq!(store.chain("Nope", &NodeQuery::new()).await.unwrap().matched, 0);
    }

    #[test]
    fn test_insert_many_stops_at_first_error() {
        let store = ContentStore::new();
        let result = tokio_test::block_on(store.insert_many(vec![
            node("Post", "a", json!({})),
            node("Post", "a", json!({})),
            node("Post", "b", json!({})),
        ]));

        assert!(matches!(result, Err(StoreError::DuplicateId { .. })));
        assert_eq!(tokio_test::block_on(store.len("Post")), 1);
    }

    #[tokio::test]
    async fn test_rejected_insert_leaves_no_collection() {
        let store = ContentStore::new();

        let bad_type = store.insert(node("Blog Post", "a", json!({}))).await;
        assert!(matches!(bad_type, Err(StoreError::Validation(_))));
        let bad_fields = store.insert(node("Page", "b", json!([1, 2]))).await;
        assert!(matches!(bad_fields, Err(StoreError::Validation(_))));

        store.insert(node("Post", "c", json!({}))).await.unwrap();
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.type_names(), vec!["Post"]);
        assert!(snapshot.collection("Page").is_none());
    }
}
