//! Schema Inference Service
//!
//! Builds the queryable schema of every content type from the data itself.
//!
//! ## Pipeline
//!
//! 1. Take a consistent store snapshot
//! 2. Merge the fields of every node of each type (`field_merger`)
//! 3. Synthesize field types against the set of known content types
//!    (`type_synthesizer`), sharing one type registry and naming context
//! 4. Synthesize filter catalogs (`filter_synthesizer`)
//! 5. Surface all inference warnings once, at the end
//!
//! Inference is a single-threaded barrier: it runs after all nodes are
//! loaded and before queries or render enumeration start.
//!
//! ## Example Usage
//!
//! ```rust
//! # use sitegraph_core::db::ContentStore;
//! # use sitegraph_core::models::{ContentNode, FieldType};
//! # use sitegraph_core::services::SchemaService;
//! # use serde_json::json;
//! # use std::sync::Arc;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(ContentStore::new());
//! store
//!     .insert(ContentNode::new_with_id("1".into(), "Post".into(), json!({"title": "Hi", "views": 3})))
//!     .await?;
//!
//! let schema = SchemaService::new(store).build().await;
//! assert_eq!(schema.field_type("Post", "views"), Some(&FieldType::Int));
//! # Ok(())
//! # }
//! ```

use crate::db::{ContentStore, StoreSnapshot};
use crate::models::{
    FieldDefinition, FieldType, FilterCatalog, ObjectType, TypeRegistry, UnionType,
};
use crate::services::field_merger::merge_nodes;
use crate::services::filter_synthesizer::synthesize_filters;
use crate::services::inference::{InferenceContext, InferenceWarning};
use crate::services::type_synthesizer::TypeSynthesizer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Synthesized schema of one content type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSchema {
    pub name: String,
    pub node_count: usize,
    pub fields: BTreeMap<String, FieldType>,
    pub filters: FilterCatalog,
}

/// The complete inferred schema
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub node_types: BTreeMap<String, NodeTypeSchema>,
    pub types: TypeRegistry,
    pub warnings: Vec<InferenceWarning>,
}

impl Schema {
    /// Infer the schema of every collection in a snapshot
    pub fn infer(snapshot: &StoreSnapshot) -> Schema {
        let known_types: BTreeSet<String> =
            snapshot.type_names().into_iter().map(str::to_string).collect();
        let mut ctx = InferenceContext::new();

        let definitions: Vec<(String, usize, FieldDefinition)> = snapshot
            .collections()
            .map(|collection| {
                let definition = merge_nodes(
                    collection.type_name(),
                    collection.iter().map(Arc::as_ref),
                    &mut ctx,
                );
                (
                    collection.type_name().to_string(),
                    collection.len(),
                    definition,
                )
            })
            .collect();

        let mut types = TypeRegistry::default();
        let mut node_types = BTreeMap::new();
        {
            let mut synthesizer = TypeSynthesizer::new(&known_types, &mut types, &mut ctx);
            for (name, node_count, definition) in &definitions {
                let fields = synthesizer.synthesize_node_fields(name, definition);
                let filters = synthesize_filters(definition, name, &known_types);
                node_types.insert(
                    name.clone(),
                    NodeTypeSchema {
                        name: name.clone(),
                        node_count: *node_count,
                        fields,
                        filters,
                    },
                );
            }
        }

        let warnings = ctx.into_warnings();
        for warning in &warnings {
            tracing::warn!("Schema inference: {}", warning);
        }
        tracing::info!(
            "Inferred schema: {} node types, {} object types, {} unions, {} warnings",
            node_types.len(),
            types.objects.len(),
            types.unions.len(),
            warnings.len()
        );

        Schema {
            node_types,
            types,
            warnings,
        }
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeTypeSchema> {
        self.node_types.get(name)
    }

    pub fn is_node_type(&self, name: &str) -> bool {
        self.node_types.contains_key(name)
    }

    pub fn filters(&self, type_name: &str) -> Option<&FilterCatalog> {
        self.node_type(type_name).map(|t| &t.filters)
    }

    /// Top-level field type of a node type
    pub fn field_type(&self, type_name: &str, field: &str) -> Option<&FieldType> {
        self.node_type(type_name)?.fields.get(field)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.object(name)
    }

    pub fn union_type(&self, name: &str) -> Option<&UnionType> {
        self.types.union(name)
    }
}

/// Builds schemas from the live store
pub struct SchemaService {
    store: Arc<ContentStore>,
}

impl SchemaService {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Infer a fresh schema from the current store contents
    pub async fn build(&self) -> Schema {
        let snapshot = self.store.snapshot().await;
        Schema::infer(&snapshot)
    }
}
