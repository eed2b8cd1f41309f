//! Inference Context
//!
//! Explicit state threaded through one schema-inference pass:
//!
//! - **Warnings**: every recoverable problem (missing reference type name,
//!   unknown reference targets, conflicting shapes) is recorded here and
//!   surfaced once when the pass finishes
//! - **Type names**: nested object and union types are named
//!   deterministically from `(owner, field path)`; a request for the same
//!   key returns the same name, while a different key that produces an
//!   already-used name gets a numeric suffix from a per-name counter
//!
//! Nothing here is global, so concurrent builds never share counters.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A recoverable inference problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InferenceWarning {
    /// A reference marker without a usable `typeName`; the value was skipped
    #[serde(rename_all = "camelCase")]
    MissingReferenceTypeName { type_name: String, field_path: String },

    /// Reference targets that are not known content types; they were dropped
    #[serde(rename_all = "camelCase")]
    UnknownReferenceTypes {
        type_name: String,
        field_path: String,
        unknown: Vec<String>,
    },

    /// A reference field with no known target type; the field was omitted
    #[serde(rename_all = "camelCase")]
    NoKnownReferenceTypes { type_name: String, field_path: String },

    /// Two samples had incompatible structure; the first shape was kept
    #[serde(rename_all = "camelCase")]
    ConflictingShapes { type_name: String, field_path: String },
}

impl fmt::Display for InferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceWarning::MissingReferenceTypeName {
                type_name,
                field_path,
            } => write!(
                f,
                "{type_name}.{field_path}: reference without typeName was skipped"
            ),
            InferenceWarning::UnknownReferenceTypes {
                type_name,
                field_path,
                unknown,
            } => write!(
                f,
                "{type_name}.{field_path}: unknown reference type(s) {}",
                unknown.join(", ")
            ),
            InferenceWarning::NoKnownReferenceTypes {
                type_name,
                field_path,
            } => write!(
                f,
                "{type_name}.{field_path}: no known reference type, field omitted"
            ),
            InferenceWarning::ConflictingShapes {
                type_name,
                field_path,
            } => write!(
                f,
                "{type_name}.{field_path}: conflicting value shapes, keeping the first"
            ),
        }
    }
}

/// Which named type is being allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedTypeKind {
    Object,
    Union,
}

#[derive(Debug, Default)]
pub struct InferenceContext {
    warnings: Vec<InferenceWarning>,
    /// (owner, field path, kind) → allocated name
    allocated: HashMap<(String, String, NamedTypeKind), String>,
    /// allocated names currently in use
    taken: HashMap<String, (String, String, NamedTypeKind)>,
    /// base name → last numeric suffix handed out
    collisions: HashMap<String, usize>,
}

impl InferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: InferenceWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    pub fn warnings(&self) -> &[InferenceWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<InferenceWarning> {
        self.warnings
    }

    /// Deterministic name for the type of `owner.field_path`
    ///
    /// `Post` + `meta.author` → `PostMetaAuthor` (objects) or
    /// `PostMetaAuthorUnion` (unions).
    pub fn type_name_for(&mut self, owner: &str, field_path: &str, kind: NamedTypeKind) -> String {
        let key = (owner.to_string(), field_path.to_string(), kind);
        if let Some(name) = self.allocated.get(&key) {
            return name.clone();
        }

        let mut base = format!("{}{}", owner, pascal_case_path(field_path));
        if kind == NamedTypeKind::Union {
            base.push_str("Union");
        }

        let mut name = base.clone();
        while self.taken.contains_key(&name) {
            let counter = self.collisions.entry(base.clone()).or_insert(1);
            *counter += 1;
            name = format!("{base}{counter}");
        }

        self.taken.insert(name.clone(), key.clone());
        self.allocated.insert(key, name.clone());
        name
    }
}

/// `meta.author_name` → `MetaAuthorName`
pub fn pascal_case_path(path: &str) -> String {
    path.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case_path() {
        assert_eq!(pascal_case_path("meta.author"), "MetaAuthor");
        assert_eq!(pascal_case_path("related_posts"), "RelatedPosts");
        assert_eq!(pascal_case_path("seo-meta.og"), "SeoMetaOg");
    }

    #[test]
    fn test_names_are_memoized_per_key() {
        let mut ctx = InferenceContext::new();
        let a = ctx.type_name_for("Post", "meta", NamedTypeKind::Object);
        let b = ctx.type_name_for("Post", "meta", NamedTypeKind::Object);
        assert_eq!(a, "PostMeta");
        assert_eq!(a, b);
    }

    #[test]
    fn test_colliding_names_get_a_suffix() {
        let mut ctx = InferenceContext::new();
        let dotted = ctx.type_name_for("Post", "meta.author", NamedTypeKind::Object);
        let flat = ctx.type_name_for("Post", "metaAuthor", NamedTypeKind::Object);
        let under = ctx.type_name_for("Post", "meta_author", NamedTypeKind::Object);

        assert_eq!(dotted, "PostMetaAuthor");
        assert_eq!(flat, "PostMetaAuthor2");
        assert_eq!(under, "PostMetaAuthor3");
        // Asking again never allocates a new name
        assert_eq!(
            ctx.type_name_for("Post", "metaAuthor", NamedTypeKind::Object),
            "PostMetaAuthor2"
        );
    }

    #[test]
    fn test_union_names() {
        let mut ctx = InferenceContext::new();
        assert_eq!(
            ctx.type_name_for("Post", "related", NamedTypeKind::Union),
            "PostRelatedUnion"
        );
    }

    #[test]
    fn test_duplicate_warnings_are_collapsed() {
        let mut ctx = InferenceContext::new();
        let warning = InferenceWarning::MissingReferenceTypeName {
            type_name: "Post".to_string(),
            field_path: "author".to_string(),
        };
        ctx.warn(warning.clone());
        ctx.warn(warning);
        assert_eq!(ctx.warnings().len(), 1);
    }
}
