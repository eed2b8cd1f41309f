//! Collection Store Layer
//!
//! This module holds all content in memory:
//!
//! - One `Collection` per content type with unique `id` and `path` indexes
//! - A `BelongsToIndex` answering "which nodes reference N?"
//! - An explicit query pipeline (`NodeQuery`: predicate, sort, offset, limit)
//! - `StoreEvent`s broadcast on every change
//!
//! # Architecture
//!
//! `ContentStore` serializes writers behind a tokio `RwLock`. Readers work on
//! a `StoreSnapshot`, an `Arc`-shared view that writers never mutate in place,
//! so resolvers and the render enumerator always see a consistent state.

mod belongs_to;
mod collection;
mod error;
pub mod events;
pub mod query;
mod store;

pub use belongs_to::BelongsToIndex;
pub use collection::Collection;
pub use error::StoreError;
pub use events::StoreEvent;
pub use query::{
    compare_json_values, Coercion, FieldCondition, FieldTest, NodeQuery, Predicate, QueryCursor,
    SortKey,
};
pub use store::{ContentStore, StoreSnapshot};
