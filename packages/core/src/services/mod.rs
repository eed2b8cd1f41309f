//! Engine Services
//!
//! This module contains the schema, query and render services:
//!
//! - `SchemaService` / `Schema` - Infers field types and filter catalogs from stored nodes
//!   (built on `field_merger`, `type_synthesizer` and `filter_synthesizer`)
//! - `QueryService` - Filtered, sorted, paginated queries over collections and belongs-to sets
//! - `FieldResolver` - Query-time resolution of references, nested objects and assets
//! - `RenderService` - Enumerates every concrete output path of a static build
//!
//! Services are pure readers over a `StoreSnapshot`; only the store mutates.

pub mod error;
pub mod field_merger;
pub mod field_resolver;
pub mod filter_synthesizer;
pub mod inference;
pub mod pagination;
pub mod query_service;
pub mod render_service;
pub mod schema_service;
pub mod type_synthesizer;

pub use error::{QueryError, RenderError};
pub use field_merger::merge_nodes;
pub use field_resolver::{AssetResolver, FieldResolver, PassthroughAssets, ResolvedField};
pub use filter_synthesizer::{builtin_filters, synthesize_filters, BUILTIN_FILTER_FIELDS};
pub use inference::{InferenceContext, InferenceWarning};
pub use pagination::PageWindow;
pub use query_service::{QueryPlan, QueryService, QuerySource};
pub use render_service::RenderService;
pub use schema_service::{NodeTypeSchema, Schema, SchemaService};
pub use type_synthesizer::{classify_string, TypeSynthesizer};
