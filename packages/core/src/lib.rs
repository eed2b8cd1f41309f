//! SiteGraph Core - Content Graph, Schema Inference and Static Page Enumeration
//!
//! This crate ingests untyped content nodes from many sources, infers a typed
//! schema from the data, answers filtered and paginated queries over it, and
//! enumerates every page a static build has to render.
//!
//! # Architecture
//!
//! - **Collection Store**: One in-memory collection per content type, with id and
//!   path indexes and a belongs-to (reverse reference) index
//! - **Schema Inference**: Field merging, type synthesis and filter synthesis over
//!   a store snapshot; ambiguities become warnings, never errors
//! - **Query Resolution**: Filter, sort and paginate against the inferred schema,
//!   with one shared page-math implementation
//! - **Render Enumeration**: Static, templated and paginated routes expanded to
//!   concrete paths, in parallel across routes
//!
//! # Modules
//!
//! - [`models`] - Data structures (ContentNode, FieldType, QueryArgs, routes)
//! - [`db`] - Collection store, belongs-to index, query evaluation
//! - [`services`] - Schema, query, field resolution and render services
//! - [`config`] - Engine configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`utils`] - Date parsing and slugs

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::{ContentStore, StoreError, StoreSnapshot};
pub use models::*;
pub use services::*;
