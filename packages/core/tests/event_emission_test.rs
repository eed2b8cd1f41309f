//! Event Emission Tests
//!
//! Verifies the store emits exactly one event per successful write, after the
//! write is visible, and nothing for failed or no-op writes.

#[cfg(test)]
mod event_emission_tests {
    use anyhow::Result;
    use serde_json::json;
    use sitegraph_core::db::{ContentStore, StoreEvent};
    use sitegraph_core::models::{ContentNode, NodeUpdate};
    use tokio::time::{timeout, Duration};

    fn post(id: &str) -> ContentNode {
        ContentNode::new_with_id(id.to_string(), "Post".to_string(), json!({"title": id}))
    }

    #[tokio::test]
    async fn test_insert_emits_node_created_event() -> Result<()> {
        let store = ContentStore::new();
        let mut rx = store.subscribe();

        store.insert(post("p1")).await?;

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Event should be emitted within 1 second")
            .expect("Should receive event");

        match event {
            StoreEvent::NodeCreated { node } => {
                assert_eq!(node.id, "p1");
                assert_eq!(node.type_name, "Post");
                // The write is already visible when the event arrives
                assert!(store.by_id("Post", "p1").await.is_some());
            }
            _ => panic!("Expected NodeCreated event, got {:?}", event),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_remove_events() -> Result<()> {
        let store = ContentStore::new();
        store.insert(post("p1")).await?;
        let mut rx = store.subscribe();

        store
            .update("Post", "p1", NodeUpdate::new().with_fields(json!({"title": "changed"})))
            .await?;
        let result = store.remove("Post", "p1").await;
        assert!(result.existed);

        let updated = rx.recv().await?;
        assert_eq!(updated.event_type(), "node:updated");
        if let StoreEvent::NodeUpdated { node } = &updated {
            assert_eq!(node.fields["title"], "changed");
        }

        let deleted = rx.recv().await?;
        assert_eq!(deleted.event_type(), "node:deleted");
        assert_eq!(deleted.type_name(), "Post");

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_and_noop_writes_emit_nothing() -> Result<()> {
        let store = ContentStore::new();
        store.insert(post("p1")).await?;
        let mut rx = store.subscribe();

        assert!(store.insert(post("p1")).await.is_err());
        assert!(!store.remove("Post", "missing").await.existed);
        assert!(store
            .update("Post", "missing", NodeUpdate::new())
            .await
            .is_err());

        let nothing = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(nothing.is_err(), "No event expected, got {:?}", nothing);

        Ok(())
    }
}
