//! Field Resolver
//!
//! Resolves the synthesized fields of a node at query time.
//!
//! - Plain values pass through unchanged
//! - Nested objects resolve field by field against their named object type
//! - Single references look up the target node by id; union references use
//!   the `typeName` carried by the marker
//! - Reference lists behave as a small sub-query (`sortBy`/`order`/`sort`,
//!   `skip`, `limit`) over the referenced nodes, in their listed order
//! - Image and File values go through an `AssetResolver`, lazily, only when
//!   the field is actually requested
//!
//! References whose target is not in the store resolve to `Null`.

use crate::db::{Coercion, NodeQuery, SortKey, StoreSnapshot};
use crate::models::{ContentNode, FieldType, QueryArgs, ReferenceMarker, SortOrder};
use crate::services::error::QueryError;
use crate::services::schema_service::Schema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Resolves Image and File field values into their public form
///
/// Implementations typically copy or transform the asset and return its URL
/// and metadata. Called only for fields a query actually selects.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve an image path relative to the node that declares it
    async fn resolve_image(&self, node: &ContentNode, value: &str) -> anyhow::Result<Value>;

    /// Resolve a file path relative to the node that declares it
    async fn resolve_file(&self, node: &ContentNode, value: &str) -> anyhow::Result<Value>;
}

/// Returns asset values unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughAssets;

#[async_trait]
impl AssetResolver for PassthroughAssets {
    async fn resolve_image(&self, _node: &ContentNode, value: &str) -> anyhow::Result<Value> {
        Ok(Value::String(value.to_string()))
    }

    async fn resolve_file(&self, _node: &ContentNode, value: &str) -> anyhow::Result<Value> {
        Ok(Value::String(value.to_string()))
    }
}

/// A resolved field value
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedField {
    Null,
    Value(Value),
    Node(Arc<ContentNode>),
    List(Vec<ResolvedField>),
    Object(BTreeMap<String, ResolvedField>),
}

impl ResolvedField {
    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedField::Null)
    }

    /// The node, if this resolved to a single reference
    pub fn as_node(&self) -> Option<&Arc<ContentNode>> {
        match self {
            ResolvedField::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Ids of the nodes in a resolved reference list
    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            ResolvedField::List(items) => items
                .iter()
                .filter_map(|item| item.as_node().map(|n| n.id.as_str()))
                .collect(),
            ResolvedField::Node(node) => vec![node.id.as_str()],
            _ => Vec::new(),
        }
    }
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<ResolvedField, QueryError>> + Send + 'a>>;

/// Resolves node fields against a schema and a store snapshot
#[derive(Clone)]
pub struct FieldResolver {
    schema: Arc<Schema>,
    assets: Arc<dyn AssetResolver>,
}

impl FieldResolver {
    pub fn new(schema: Arc<Schema>, assets: Arc<dyn AssetResolver>) -> Self {
        Self { schema, assets }
    }

    /// Resolver whose assets resolve to their raw values
    pub fn passthrough(schema: Arc<Schema>) -> Self {
        Self::new(schema, Arc::new(PassthroughAssets))
    }

    /// Resolve one top-level field of a node
    ///
    /// `args` only applies to reference list fields.
    pub async fn resolve(
        &self,
        snapshot: &StoreSnapshot,
        node: &ContentNode,
        field: &str,
        args: &QueryArgs,
    ) -> Result<ResolvedField, QueryError> {
        let field_type = self
            .schema
            .field_type(&node.type_name, field)
            .ok_or_else(|| QueryError::unknown_field(&node.type_name, field))?;

        match field_type {
            FieldType::Reference { is_list: true, .. } | FieldType::Union { is_list: true, .. } => {
                Ok(resolve_reference_list(
                    snapshot,
                    &self.schema,
                    field_type,
                    node.field(field),
                    args,
                ))
            }
            _ => {
                self.resolve_value(snapshot, node, field_type, node.field(field))
                    .await
            }
        }
    }

    /// Resolve every synthesized field of a node
    pub async fn resolve_all(
        &self,
        snapshot: &StoreSnapshot,
        node: &ContentNode,
    ) -> Result<BTreeMap<String, ResolvedField>, QueryError> {
        let schema = self
            .schema
            .node_type(&node.type_name)
            .ok_or_else(|| QueryError::unknown_content_type(&node.type_name))?;

        let mut resolved = BTreeMap::new();
        for name in schema.fields.keys() {
            let value = self
                .resolve(snapshot, node, name, &QueryArgs::default())
                .await?;
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    fn resolve_value<'a>(
        &'a self,
        snapshot: &'a StoreSnapshot,
        node: &'a ContentNode,
        field_type: &'a FieldType,
        value: Option<&'a Value>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let Some(value) = value.filter(|v| !v.is_null()) else {
                return Ok(ResolvedField::Null);
            };

            let resolved = match field_type {
                FieldType::Image => match value.as_str() {
                    Some(path) => ResolvedField::Value(self.assets.resolve_image(node, path).await?),
                    None => ResolvedField::Value(value.clone()),
                },
                FieldType::File => match value.as_str() {
                    Some(path) => ResolvedField::Value(self.assets.resolve_file(node, path).await?),
                    None => ResolvedField::Value(value.clone()),
                },
                FieldType::Object { type_name } => {
                    let object = self
                        .schema
                        .object_type(type_name)
                        .ok_or_else(|| QueryError::unknown_content_type(type_name))?;
                    let mut fields = BTreeMap::new();
                    for (key, nested) in &object.fields {
                        let resolved = self
                            .resolve_value(snapshot, node, nested, value.get(key))
                            .await?;
                        fields.insert(key.clone(), resolved);
                    }
                    ResolvedField::Object(fields)
                }
                FieldType::List { of_type } => {
                    let items = match value {
                        Value::Array(items) => items.iter().collect(),
                        single => vec![single],
                    };
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(
                            self.resolve_value(snapshot, node, of_type, Some(item))
                                .await?,
                        );
                    }
                    ResolvedField::List(resolved)
                }
                FieldType::Reference { is_list: false, .. }
                | FieldType::Union { is_list: false, .. } => {
                    match reference_targets(snapshot, field_type, value).into_iter().next() {
                        Some(target) => ResolvedField::Node(target),
                        None => ResolvedField::Null,
                    }
                }
                FieldType::Reference { is_list: true, .. } | FieldType::Union { is_list: true, .. } => {
                    resolve_reference_list(
                        snapshot,
                        &self.schema,
                        field_type,
                        Some(value),
                        &QueryArgs::default(),
                    )
                }
                FieldType::String
                | FieldType::Int
                | FieldType::Float
                | FieldType::Bool
                | FieldType::Date => ResolvedField::Value(value.clone()),
            };
            Ok(resolved)
        })
    }
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldResolver")
            .field("node_types", &self.schema.node_types.len())
            .finish_non_exhaustive()
    }
}

fn resolve_reference_list(
    snapshot: &StoreSnapshot,
    schema: &Schema,
    field_type: &FieldType,
    value: Option<&Value>,
    args: &QueryArgs,
) -> ResolvedField {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return ResolvedField::List(Vec::new());
    };

    let targets = field_type.target_types();
    let sort = args
        .sort_keys()
        .into_iter()
        .map(|spec| {
            // Dates order by instant, as they do in collection queries
            let is_date = targets
                .iter()
                .any(|t| schema.field_type(t, &spec.by) == Some(&FieldType::Date));
            SortKey {
                descending: spec.order == SortOrder::Desc,
                coercion: if is_date { Coercion::Date } else { Coercion::None },
                field: spec.by,
            }
        })
        .collect();
    let query = NodeQuery {
        sort,
        offset: args.skip.unwrap_or(0),
        limit: args.limit,
        ..Default::default()
    };

    let cursor = query.evaluate(reference_targets(snapshot, field_type, value));
    ResolvedField::List(cursor.nodes.into_iter().map(ResolvedField::Node).collect())
}

/// Stored nodes a reference value points at, in listed order
fn reference_targets(
    snapshot: &StoreSnapshot,
    field_type: &FieldType,
    value: &Value,
) -> Vec<Arc<ContentNode>> {
    let markers: Vec<ReferenceMarker> = match value {
        Value::Array(items) => items.iter().filter_map(ReferenceMarker::parse).collect(),
        single => ReferenceMarker::parse(single).into_iter().collect(),
    };

    let mut targets = Vec::new();
    for marker in markers {
        for id in &marker.ids {
            let found = match field_type {
                FieldType::Reference { type_name, .. } => snapshot.by_id(type_name, id),
                FieldType::Union { members, .. } => marker
                    .type_names
                    .iter()
                    .filter(|t| members.contains(*t))
                    .find_map(|t| snapshot.by_id(t, id)),
                _ => None,
            };
            if let Some(node) = found {
                targets.push(Arc::clone(node));
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ContentStore;
    use crate::models::SortSpec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAssets {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetResolver for CountingAssets {
        async fn resolve_image(&self, node: &ContentNode, value: &str) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"src": format!("/assets/{}/{}", node.id, value.trim_start_matches("./"))}))
        }

        async fn resolve_file(&self, _node: &ContentNode, value: &str) -> anyhow::Result<Value> {
            anyhow::bail!("file not found: {value}")
        }
    }

    async fn fixture() -> (StoreSnapshot, Arc<Schema>) {
        let store = ContentStore::new();
        let nodes = vec![
            ContentNode::new_with_id("jane".into(), "Author".into(), json!({"name": "Jane"})),
            ContentNode::new_with_id("t1".into(), "Tag".into(), json!({"title": "b", "rank": 2, "published": "2024-03-01T00:00:00Z"})),
            ContentNode::new_with_id("t2".into(), "Tag".into(), json!({"title": "a", "rank": 1, "published": "2024-03-01T02:00:00+05:00"})),
            ContentNode::new_with_id("t3".into(), "Tag".into(), json!({"title": "c", "rank": 3, "published": "2024-03-02"})),
            ContentNode::new_with_id(
                "p1".into(),
                "Post".into(),
                json!({
                    "title": "Hello",
                    "cover": "./cover.png",
                    "attachment": "./notes.pdf",
                    "author": {"typeName": "Author", "id": "jane"},
                    "related": {"typeName": ["Author", "Tag"], "id": "t2"},
                    "tags": [
                        {"typeName": "Tag", "id": "t1"},
                        {"typeName": "Tag", "id": "t2"},
                        {"typeName": "Tag", "id": "gone"},
                        {"typeName": "Tag", "id": "t3"}
                    ],
                    "meta": {"thumb": "./thumb.jpg", "words": 120}
                }),
            ),
        ];
        store.insert_many(nodes).await.unwrap();
        let snapshot = store.snapshot().await;
        let schema = Arc::new(Schema::infer(&snapshot));
        (snapshot, schema)
    }

    #[tokio::test]
    async fn test_single_and_union_references() {
        let (snapshot, schema) = fixture().await;
        let resolver = FieldResolver::passthrough(schema);
        let post = snapshot.by_id("Post", "p1").unwrap().clone();

        let author = resolver
            .resolve(&snapshot, &post, "author", &QueryArgs::default())
            .await
            .unwrap();
        assert_eq!(author.as_node().unwrap().id, "jane");

        let related = resolver
            .resolve(&snapshot, &post, "related", &QueryArgs::default())
            .await
            .unwrap();
        assert_eq!(related.as_node().unwrap().type_name, "Tag");
    }

    #[tokio::test]
    async fn test_reference_list_sub_query() {
        let (snapshot, schema) = fixture().await;
        let resolver = FieldResolver::passthrough(schema);
        let post = snapshot.by_id("Post", "p1").unwrap().clone();

        let all = resolver
            .resolve(&snapshot, &post, "tags", &QueryArgs::default())
            .await
            .unwrap();
        assert_eq!(all.node_ids(), vec!["t1", "t2", "t3"]);

        let args = QueryArgs::new()
            .with_sort("rank", SortOrder::Asc)
            .with_skip(1)
            .with_limit(1);
        let sliced = resolver.resolve(&snapshot, &post, "tags", &args).await.unwrap();
        assert_eq!(sliced.node_ids(), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_reference_list_sorts_dates_by_instant() {
        let (snapshot, schema) = fixture().await;
        let resolver = FieldResolver::passthrough(schema);
        let post = snapshot.by_id("Post", "p1").unwrap().clone();

        let args = QueryArgs {
            sort: vec![SortSpec::asc("published")],
            ..Default::default()
        };
        let sorted = resolver.resolve(&snapshot, &post, "tags", &args).await.unwrap();
        assert_eq!(sorted.node_ids(), vec!["t2", "t1", "t3"]);
    }

    #[tokio::test]
    async fn test_assets_resolve_lazily_through_resolver() {
        let (snapshot, schema) = fixture().await;
        let assets = Arc::new(CountingAssets {
            calls: AtomicUsize::new(0),
        });
        let resolver = FieldResolver::new(schema, assets.clone());
        let post = snapshot.by_id("Post", "p1").unwrap().clone();

        resolver
            .resolve(&snapshot, &post, "title", &QueryArgs::default())
            .await
            .unwrap();
        assert_eq!(assets.calls.load(Ordering::SeqCst), 0);

        let cover = resolver
            .resolve(&snapshot, &post, "cover", &QueryArgs::default())
            .await
            .unwrap();
        assert_eq!(
            cover,
            ResolvedField::Value(json!({"src": "/assets/p1/cover.png"}))
        );

        let meta = resolver
            .resolve(&snapshot, &post, "meta", &QueryArgs::default())
            .await
            .unwrap();
        let ResolvedField::Object(fields) = meta else {
            panic!("expected object, got {meta:?}");
        };
        assert_eq!(fields["words"], ResolvedField::Value(json!(120)));
        assert_eq!(assets.calls.load(Ordering::SeqCst), 2);

        let err = resolver
            .resolve(&snapshot, &post, "attachment", &QueryArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Asset(_)));
    }

    #[tokio::test]
    async fn test_unknown_field_is_an_error() {
        let (snapshot, schema) = fixture().await;
        let resolver = FieldResolver::passthrough(schema);
        let post = snapshot.by_id("Post", "p1").unwrap().clone();

        let err = resolver
            .resolve(&snapshot, &post, "nope", &QueryArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));

        let all = resolver.resolve_all(&snapshot, &post).await.unwrap();
        assert!(all.contains_key("tags"));
        assert!(!all.contains_key("nope"));
    }
}
