//! Belongs-To Index
//!
//! Reverse-reference index answering "which nodes reference N?" without a
//! full scan. For every referenced node key the index keeps the set of
//! referencing `(typeName, id)` pairs; an outgoing map remembers what each
//! node referenced so removal and update are incremental.
//!
//! Entries are keyed by the referenced key, not by the referenced node, so a
//! reference to a node that is not (yet) in the store is still indexed.

use crate::models::{ContentNode, NodeKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct BelongsToIndex {
    /// target → referencing type → referencing ids
    incoming: HashMap<NodeKey, BTreeMap<String, BTreeSet<String>>>,
    /// source → targets it references
    outgoing: HashMap<NodeKey, Vec<NodeKey>>,
}

impl BelongsToIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every reference held by a node
    pub fn add_node(&mut self, node: &ContentNode) {
        let source = node.key();
        let targets: Vec<NodeKey> = node
            .references()
            .into_iter()
            .filter(|target| *target != source)
            .collect();

        if targets.is_empty() {
            return;
        }

        for target in &targets {
            self.incoming
                .entry(target.clone())
                .or_default()
                .entry(source.type_name.clone())
                .or_default()
                .insert(source.id.clone());
        }
        self.outgoing.insert(source, targets);
    }

    /// Drop every reference previously indexed for a node
    pub fn remove_node(&mut self, source: &NodeKey) {
        let Some(targets) = self.outgoing.remove(source) else {
            return;
        };

        for target in targets {
            let Some(by_type) = self.incoming.get_mut(&target) else {
                continue;
            };
            if let Some(ids) = by_type.get_mut(&source.type_name) {
                ids.remove(&source.id);
                if ids.is_empty() {
                    by_type.remove(&source.type_name);
                }
            }
            if by_type.is_empty() {
                self.incoming.remove(&target);
            }
        }
    }

    /// Re-index a node whose fields changed
    pub fn update_node(&mut self, node: &ContentNode) {
        self.remove_node(&node.key());
        self.add_node(node);
    }

    /// Keys of all nodes referencing `target`, ordered by type then id
    pub fn referencing(&self, target: &NodeKey) -> Vec<NodeKey> {
        self.incoming
            .get(target)
            .map(|by_type| {
                by_type
                    .iter()
                    .flat_map(|(type_name, ids)| {
                        ids.iter().map(move |id| NodeKey::new(type_name.clone(), id.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `source` references `target`
    pub fn contains(&self, target: &NodeKey, source: &NodeKey) -> bool {
        self.incoming
            .get(target)
            .and_then(|by_type| by_type.get(&source.type_name))
            .is_some_and(|ids| ids.contains(&source.id))
    }

    /// Number of distinct referenced keys
    pub fn len(&self) -> usize {
        self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }
}
