//! Synthesized Field Types
//!
//! `FieldType` is the queryable, strongly typed counterpart of a
//! `FieldDefinition`. Nested object types and reference unions are stored by
//! name in a `TypeRegistry`; field types only carry the name, so cyclic type
//! graphs (Post → Tag → Post) never form ownership cycles and are resolved
//! lazily by name at query time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Queryable type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Date,
    Image,
    File,
    /// Named nested object type, see `TypeRegistry::objects`
    #[serde(rename_all = "camelCase")]
    Object { type_name: String },
    #[serde(rename_all = "camelCase")]
    List { of_type: Box<FieldType> },
    /// Reference(s) into exactly one node type
    #[serde(rename_all = "camelCase")]
    Reference { type_name: String, is_list: bool },
    /// Reference(s) into any of several node types, see `TypeRegistry::unions`
    #[serde(rename_all = "camelCase")]
    Union {
        type_name: String,
        members: Vec<String>,
        is_list: bool,
    },
}

/// Arguments a reference list field accepts (it behaves as a small paginated sub-query)
pub const REFERENCE_LIST_ARGUMENTS: &[&str] = &["sortBy", "order", "sort", "skip", "limit"];

impl FieldType {
    /// Field arguments exposed by this type
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            FieldType::Reference { is_list: true, .. } | FieldType::Union { is_list: true, .. } => {
                REFERENCE_LIST_ARGUMENTS
            }
            _ => &[],
        }
    }

    /// Node type names this field can resolve to
    pub fn target_types(&self) -> Vec<&str> {
        match self {
            FieldType::Reference { type_name, .. } => vec![type_name.as_str()],
            FieldType::Union { members, .. } => members.iter().map(String::as_str).collect(),
            FieldType::List { of_type } => of_type.target_types(),
            _ => Vec::new(),
        }
    }
}

/// A named nested object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub name: String,
    /// Node type that owns the field this object was inferred from
    pub owner: String,
    /// Dotted field path within the owner
    pub field_path: String,
    pub fields: BTreeMap<String, FieldType>,
}

/// A named union of node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionType {
    pub name: String,
    pub owner: String,
    pub field_path: String,
    pub members: Vec<String>,
}

/// Name-keyed store of every synthesized object and union type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    pub objects: BTreeMap<String, ObjectType>,
    pub unions: BTreeMap<String, UnionType>,
}

impl TypeRegistry {
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn union(&self, name: &str) -> Option<&UnionType> {
        self.unions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.unions.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_serialization_contract() {
        let ty = FieldType::List {
            of_type: Box::new(FieldType::Reference {
                type_name: "Tag".to_string(),
                is_list: false,
            }),
        };
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["kind"], "list");
        assert_eq!(json["ofType"]["kind"], "reference");
        assert_eq!(json["ofType"]["typeName"], "Tag");
        assert_eq!(json["ofType"]["isList"], false);

        let back: FieldType = serde_json::from_value(json).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn test_reference_list_exposes_arguments() {
        let list = FieldType::Reference {
            type_name: "Tag".to_string(),
            is_list: true,
        };
        let single = FieldType::Reference {
            type_name: "Tag".to_string(),
            is_list: false,
        };
        assert_eq!(list.arguments(), REFERENCE_LIST_ARGUMENTS);
        assert!(list.arguments().contains(&"sort"));
        assert!(single.arguments().is_empty());
        assert!(FieldType::String.arguments().is_empty());
    }

    #[test]
    fn test_target_types() {
        let union = FieldType::Union {
            type_name: "PostRelatedUnion".to_string(),
            members: vec!["Page".to_string(), "Post".to_string()],
            is_list: true,
        };
        assert_eq!(union.target_types(), vec!["Page", "Post"]);
        let list = FieldType::List {
            of_type: Box::new(FieldType::Reference {
                type_name: "Tag".to_string(),
                is_list: false,
            }),
        };
        assert_eq!(list.target_types(), vec!["Tag"]);
        assert!(FieldType::Image.target_types().is_empty());
    }
}
