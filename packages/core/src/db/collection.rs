//! Collection
//!
//! One indexed, insertion-ordered set of nodes of a single content type.
//!
//! - `id` is a unique index (O(1) point lookup)
//! - `path`, when present, is a unique index
//! - Iteration follows a store-wide insertion sequence, which is also the
//!   tie-break for every sort
//!
//! Collections are cloned copy-on-write by the store, so nodes are kept behind
//! `Arc` and a clone never copies node data.

use crate::db::error::StoreError;
use crate::db::query::{NodeQuery, Predicate, QueryCursor};
use crate::models::{ContentNode, NodeUpdate};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Collection {
    type_name: String,
    nodes: BTreeMap<u64, Arc<ContentNode>>,
    by_id: HashMap<String, u64>,
    by_path: HashMap<String, u64>,
}

impl Collection {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            nodes: BTreeMap::new(),
            by_id: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ContentNode>> {
        self.nodes.values()
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<ContentNode>> {
        self.by_id.get(id).and_then(|seq| self.nodes.get(seq))
    }

    pub fn by_path(&self, path: &str) -> Option<&Arc<ContentNode>> {
        self.by_path.get(path).and_then(|seq| self.nodes.get(seq))
    }

    /// Store-wide insertion sequence of a node
    pub fn sequence_of(&self, id: &str) -> Option<u64> {
        self.by_id.get(id).copied()
    }

    /// Insert a new node under the given insertion sequence
    ///
    /// # Errors
    ///
    /// - `StoreError::Validation` if the node is structurally invalid
    /// - `StoreError::DuplicateId` / `StoreError::DuplicatePath` on uniqueness violations
    pub fn insert(&mut self, node: ContentNode, seq: u64) -> Result<Arc<ContentNode>, StoreError> {
        node.validate()?;

        if self.by_id.contains_key(&node.id) {
            return Err(StoreError::duplicate_id(&self.type_name, &node.id));
        }
        if let Some(path) = &node.path {
            if let Some(existing) = self.by_path(path) {
                return Err(StoreError::duplicate_path(
                    &self.type_name,
                    path,
                    &existing.id,
                ));
            }
        }

        let node = Arc::new(node);
        self.by_id.insert(node.id.clone(), seq);
        if let Some(path) = &node.path {
            self.by_path.insert(path.clone(), seq);
        }
        self.nodes.insert(seq, Arc::clone(&node));
        Ok(node)
    }

    /// Apply an update in place, keeping the node's insertion position
    ///
    /// Returns `(previous, updated)`.
    pub fn update(
        &mut self,
        id: &str,
        update: &NodeUpdate,
    ) -> Result<(Arc<ContentNode>, Arc<ContentNode>), StoreError> {
        let seq = self
            .sequence_of(id)
            .ok_or_else(|| StoreError::node_not_found(&self.type_name, id))?;
        let previous = self
            .nodes
            .get(&seq)
            .cloned()
            .ok_or_else(|| StoreError::node_not_found(&self.type_name, id))?;

        let updated = update.apply_to(&previous);
        updated.validate()?;

        if let Some(path) = &updated.path {
            if let Some(existing) = self.by_path(path) {
                if existing.id != updated.id {
                    return Err(StoreError::duplicate_path(
                        &self.type_name,
                        path,
                        &existing.id,
                    ));
                }
            }
        }

        if let Some(old_path) = &previous.path {
            self.by_path.remove(old_path);
        }
        if let Some(path) = &updated.path {
            self.by_path.insert(path.clone(), seq);
        }

        let updated = Arc::new(updated);
        self.nodes.insert(seq, Arc::clone(&updated));
        Ok((previous, updated))
    }

    /// Remove a node, returning it if it existed
    pub fn remove(&mut self, id: &str) -> Option<Arc<ContentNode>> {
        let seq = self.by_id.remove(id)?;
        let node = self.nodes.remove(&seq)?;
        if let Some(path) = &node.path {
            self.by_path.remove(path);
        }
        Some(node)
    }

    /// All nodes matching a predicate, in insertion order
    ///
    /// Equality on `id` or `path` is answered from the unique indexes.
    pub fn find(&self, predicate: &Predicate) -> Vec<Arc<ContentNode>> {
        let indexed = predicate
            .exact_builtin("id")
            .map(|id| self.by_id(id))
            .or_else(|| predicate.exact_builtin("path").map(|p| self.by_path(p)));

        match indexed {
            Some(hit) => hit
                .filter(|node| predicate.matches(node))
                .cloned()
                .into_iter()
                .collect(),
            None => self
                .nodes
                .values()
                .filter(|node| predicate.matches(node))
                .cloned()
                .collect(),
        }
    }

    /// Evaluate a full query pipeline (find, sort, offset, limit)
    pub fn chain(&self, query: &NodeQuery) -> QueryCursor {
        let candidates = self.find(&query.predicate);
        let unfiltered = NodeQuery {
            predicate: Predicate::new(),
            sort: query.sort.clone(),
            offset: query.offset,
            limit: query.limit,
        };
        unfiltered.evaluate(candidates)
    }
}
