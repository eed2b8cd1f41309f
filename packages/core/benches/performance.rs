//! Performance benchmarks for SiteGraph core operations
//!
//! Run with: `cargo bench -p sitegraph-core`
//!
//! These benchmarks measure critical path performance:
//! - Schema inference over a few thousand nodes
//! - Filtered, sorted page resolution
//! - Render enumeration of templated and paginated routes

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use sitegraph_core::config::EngineConfig;
use sitegraph_core::db::{ContentStore, StoreSnapshot};
use sitegraph_core::models::{
    reference, ContentNode, QueryArgs, RouteDefinition, RouteQuery, SortOrder,
};
use sitegraph_core::services::{QueryService, RenderService, Schema};
use std::sync::Arc;
use tokio::runtime::Runtime;

const TAGS: usize = 50;
const POSTS: usize = 5_000;

/// Populate a store with tags and posts referencing them
async fn setup_snapshot() -> StoreSnapshot {
    let store = ContentStore::new();
    for t in 0..TAGS {
        store
            .insert(ContentNode::new_with_id(
                format!("tag-{t}"),
                "Tag".to_string(),
                json!({"title": format!("Tag {t}")}),
            ))
            .await
            .unwrap();
    }
    for p in 0..POSTS {
        let tag_a = format!("tag-{}", p % TAGS);
        let tag_b = format!("tag-{}", (p * 7) % TAGS);
        store
            .insert(ContentNode::new_with_id(
                format!("post-{p}"),
                "Post".to_string(),
                json!({
                    "title": format!("Post number {p}"),
                    "views": (p * 37) % 1000,
                    "date": format!("2024-{:02}-{:02}", p % 12 + 1, p % 28 + 1),
                    "draft": p % 5 == 0,
                    "cover": format!("./images/{p}.jpg"),
                    "tags": reference::create_reference_list("Tag", &[&tag_a, &tag_b]),
                }),
            ))
            .await
            .unwrap();
    }
    store.snapshot().await
}

fn bench_schema_inference(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let snapshot = rt.block_on(setup_snapshot());

    c.bench_function("infer_schema_5000_posts", |b| {
        b.iter(|| black_box(Schema::infer(&snapshot)))
    });
}

fn bench_query_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let snapshot = rt.block_on(setup_snapshot());
    let service = QueryService::new(Arc::new(Schema::infer(&snapshot)), EngineConfig::default());

    let args = QueryArgs::new()
        .with_filter(json!({"draft": {"eq": false}, "tags": {"contains": "tag-3"}}))
        .with_sort("views", SortOrder::Desc)
        .with_page(2, 20);

    c.bench_function("resolve_filtered_sorted_page", |b| {
        b.iter(|| black_box(service.resolve(&snapshot, "Post", &args).unwrap()))
    });
}

fn bench_render_enumeration(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let snapshot = rt.block_on(setup_snapshot());
    let query = QueryService::new(Arc::new(Schema::infer(&snapshot)), EngineConfig::default());
    let render = RenderService::new(query);

    let routes = vec![
        RouteDefinition::new_static("/", "Home"),
        RouteDefinition::new_static("/blog", "Blog").with_query(RouteQuery::paginate_collection(
            "Post",
            QueryArgs::new().with_sort("date", SortOrder::Desc).with_page(1, 10),
        )),
        RouteDefinition::new_template("/blog/:year/:title", "Post", "Post"),
        RouteDefinition::new_template("/tag/:id", "Tag", "Tag")
            .with_query(RouteQuery::paginate_belongs_to(QueryArgs::new().with_page(1, 10))),
    ];

    c.bench_function("enumerate_routes", |b| {
        b.iter(|| black_box(render.enumerate(&routes, &snapshot).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_schema_inference,
    bench_query_resolution,
    bench_render_enumeration
);
criterion_main!(benches);
