//! Belongs-To Index Tests
//!
//! Reverse references must track inserts, updates and removals through the
//! public store API, and resolve through the query service.

#[cfg(test)]
mod belongs_to_tests {
    use anyhow::Result;
    use serde_json::json;
    use sitegraph_core::config::EngineConfig;
    use sitegraph_core::db::{ContentStore, NodeQuery};
    use sitegraph_core::models::{reference, ContentNode, NodeKey, NodeUpdate, QueryArgs};
    use sitegraph_core::services::{QueryService, Schema};
    use std::sync::Arc;

    async fn store_with_tags() -> Result<ContentStore> {
        let store = ContentStore::new();
        store
            .insert(ContentNode::new_with_id("rust".into(), "Tag".into(), json!({})))
            .await?;
        store
            .insert(ContentNode::new_with_id("go".into(), "Tag".into(), json!({})))
            .await?;
        Ok(store)
    }

    #[tokio::test]
    async fn test_insert_update_remove_keep_index_current() -> Result<()> {
        let store = store_with_tags().await?;
        store
            .insert(ContentNode::new_with_id(
                "p1".into(),
                "Post".into(),
                json!({"tags": reference::create_reference_list("Tag", &["rust", "go"])}),
            ))
            .await?;
        store
            .insert(ContentNode::new_with_id(
                "p2".into(),
                "Post".into(),
                json!({"meta": {"tag": reference::create_reference("Tag", "rust")}}),
            ))
            .await?;

        let cursor = store.belongs_to("Tag", "rust", &NodeQuery::new()).await;
        assert_eq!(cursor.ids(), vec!["p1", "p2"]);

        store
            .update(
                "Post",
                "p1",
                NodeUpdate::new().with_fields(json!({"tags": reference::create_reference_list("Tag", &["go"])})),
            )
            .await?;
        let cursor = store.belongs_to("Tag", "rust", &NodeQuery::new()).await;
        assert_eq!(cursor.ids(), vec!["p2"]);

        store.remove("Post", "p2").await;
        let snapshot = store.snapshot().await;
        assert!(snapshot.referencing(&NodeKey::new("Tag", "rust")).is_empty());
        assert_eq!(
            snapshot.referencing(&NodeKey::new("Tag", "go")),
            vec![NodeKey::new("Post", "p1")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_self_references_are_ignored() -> Result<()> {
        let store = ContentStore::new();
        store
            .insert(ContentNode::new_with_id(
                "a".into(),
                "Page".into(),
                json!({"parent": reference::create_reference("Page", "a")}),
            ))
            .await?;

        let cursor = store.belongs_to("Page", "a", &NodeQuery::new()).await;
        assert_eq!(cursor.matched, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_belongs_to_resolves_across_types() -> Result<()> {
        let store = store_with_tags().await?;
        store
            .insert(ContentNode::new_with_id(
                "p1".into(),
                "Post".into(),
                json!({"tag": reference::create_reference("Tag", "rust")}),
            ))
            .await?;
        store
            .insert(ContentNode::new_with_id(
                "v1".into(),
                "Video".into(),
                json!({"tags": reference::create_reference_list("Tag", &["rust"])}),
            ))
            .await?;

        let snapshot = store.snapshot().await;
        let service = QueryService::new(Arc::new(Schema::infer(&snapshot)), EngineConfig::default());

        let all = service.resolve_belongs_to(&snapshot, "Tag", "rust", &QueryArgs::new())?;
        assert_eq!(all.ids(), vec!["p1", "v1"]);

        let videos = service.resolve_belongs_to(
            &snapshot,
            "Tag",
            "rust",
            &QueryArgs::new().with_filter(json!({"typeName": {"eq": "Video"}})),
        )?;
        assert_eq!(videos.ids(), vec!["v1"]);
        assert_eq!(videos.total_count, 1);
        Ok(())
    }
}
