//! Data Models
//!
//! This module contains the core data structures used throughout SiteGraph:
//!
//! - `ContentNode` - Universal record for all content types
//! - `ReferenceMarker` - Structural `{typeName, id}` cross-collection links
//! - `FieldDefinition` - Accumulated structural shape of a field
//! - `FieldType` / `TypeRegistry` - Synthesized queryable types
//! - `FilterCatalog` - Per-field filter operators
//! - `QueryArgs` / `Connection` - Query arguments and paginated results
//! - `RouteDefinition` / `RenderEntry` - Static build planning

mod field_definition;
mod field_type;
mod filter;
mod node;
mod query_args;
pub mod reference;
mod route;

pub use field_definition::{FieldDefinition, ScalarKind, StringClass};
pub use field_type::{FieldType, ObjectType, TypeRegistry, UnionType, REFERENCE_LIST_ARGUMENTS};
pub use filter::{FilterCatalog, FilterField, FilterOp, FilterOperatorSet, FilterValueKind};
pub use node::{ContentNode, DeleteResult, InternalMeta, NodeKey, NodeUpdate, ValidationError};
pub use query_args::{Connection, Edge, PageInfo, QueryArgs, SortOrder, SortSpec};
pub use reference::ReferenceMarker;
pub use route::{RenderEntry, RouteDefinition, RouteQuery};
