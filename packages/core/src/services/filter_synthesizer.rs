//! Filter Synthesizer
//!
//! Derives the per-field filter operator catalog of a node type from the same
//! merged `FieldDefinition` the type synthesizer consumes.
//!
//! | Field kind        | Operators                                              |
//! |-------------------|--------------------------------------------------------|
//! | string/image/file | eq, ne, in, nin, regex, len                            |
//! | number            | eq, ne, in, nin, gt, gte, lt, lte, between             |
//! | date              | string set + gt, gte, lt, lte, between, dteq           |
//! | boolean           | eq, ne, in, nin                                        |
//! | list              | size, contains, containsAny, containsNone              |
//! | reference         | eq, ne, in, nin on the referenced id                   |
//! | reference list    | contains, containsAny, containsNone, size on the ids   |
//!
//! Every leaf also accepts `exists`. Nested objects get nested catalogs.
//! Pruning follows the type synthesizer: references with no known target
//! type are dropped, then objects with no filterable leaf and lists whose
//! element was dropped. Every node type additionally gets the built-in `id`,
//! `path` and `typeName` string filters.

use crate::models::{
    FieldDefinition, FilterCatalog, FilterField, FilterOp, FilterOperatorSet, FilterValueKind,
    ScalarKind, StringClass,
};
use std::collections::{BTreeMap, BTreeSet};

const STRING_OPS: &[FilterOp] = &[
    FilterOp::Eq,
    FilterOp::Ne,
    FilterOp::In,
    FilterOp::Nin,
    FilterOp::Regex,
    FilterOp::Len,
];

const NUMBER_OPS: &[FilterOp] = &[
    FilterOp::Eq,
    FilterOp::Ne,
    FilterOp::In,
    FilterOp::Nin,
    FilterOp::Gt,
    FilterOp::Gte,
    FilterOp::Lt,
    FilterOp::Lte,
    FilterOp::Between,
];

const DATE_EXTRA_OPS: &[FilterOp] = &[
    FilterOp::Gt,
    FilterOp::Gte,
    FilterOp::Lt,
    FilterOp::Lte,
    FilterOp::Between,
    FilterOp::Dteq,
];

const BOOL_OPS: &[FilterOp] = &[FilterOp::Eq, FilterOp::Ne, FilterOp::In, FilterOp::Nin];

const LIST_OPS: &[FilterOp] = &[
    FilterOp::Size,
    FilterOp::Contains,
    FilterOp::ContainsAny,
    FilterOp::ContainsNone,
];

/// Names of the node metadata filters present on every node type
pub const BUILTIN_FILTER_FIELDS: &[&str] = &["id", "path", "typeName"];

/// Filter catalog of a node type from its merged root definition
///
/// `known_types` are the content types present in the store; references
/// naming none of them are not filterable.
pub fn synthesize_filters(
    root: &FieldDefinition,
    owner: &str,
    known_types: &BTreeSet<String>,
) -> FilterCatalog {
    let mut catalog = match root {
        FieldDefinition::Object(children) => object_catalog(children, known_types),
        _ => FilterCatalog::new(),
    };

    for builtin in BUILTIN_FILTER_FIELDS {
        catalog.insert(*builtin, FilterField::Leaf(string_set()));
    }

    tracing::debug!(
        "Synthesized {} filter fields for {}",
        catalog.len(),
        owner
    );
    catalog
}

/// Catalog with only the built-in metadata filters
pub fn builtin_filters() -> FilterCatalog {
    let mut catalog = FilterCatalog::new();
    for builtin in BUILTIN_FILTER_FIELDS {
        catalog.insert(*builtin, FilterField::Leaf(string_set()));
    }
    catalog
}

fn object_catalog(
    children: &BTreeMap<String, FieldDefinition>,
    known_types: &BTreeSet<String>,
) -> FilterCatalog {
    let mut catalog = FilterCatalog::new();
    for (key, def) in children {
        if let Some(field) = filter_field(def, known_types) {
            catalog.insert(key.clone(), field);
        }
    }
    catalog
}

fn filter_field(def: &FieldDefinition, known_types: &BTreeSet<String>) -> Option<FilterField> {
    let set = match def {
        FieldDefinition::Scalar(ScalarKind::String(StringClass::Date)) => {
            let mut ops = STRING_OPS.to_vec();
            ops.extend_from_slice(DATE_EXTRA_OPS);
            leaf(FilterValueKind::Date, &ops)
        }
        FieldDefinition::Scalar(ScalarKind::String(_)) => string_set(),
        FieldDefinition::Scalar(ScalarKind::Number { .. }) => leaf(FilterValueKind::Number, NUMBER_OPS),
        FieldDefinition::Scalar(ScalarKind::Bool) => leaf(FilterValueKind::Bool, BOOL_OPS),
        FieldDefinition::List(element) => {
            filter_field(element, known_types)?;
            leaf(FilterValueKind::List, LIST_OPS)
        }
        FieldDefinition::Object(children) => {
            let nested = object_catalog(children, known_types);
            return (!nested.is_empty()).then_some(FilterField::Object(nested));
        }
        FieldDefinition::Reference { type_names, is_list } if type_names.is_empty() => {
            return filter_field(&FieldDefinition::untyped_reference(*is_list), known_types);
        }
        FieldDefinition::Reference { type_names, .. }
            if !type_names.iter().any(|t| known_types.contains(t)) =>
        {
            return None
        }
        FieldDefinition::Reference { is_list: false, .. } => {
            leaf(FilterValueKind::ReferenceId, BOOL_OPS).on_reference_id()
        }
        FieldDefinition::Reference { is_list: true, .. } => {
            leaf(FilterValueKind::ReferenceIdList, LIST_OPS).on_reference_id()
        }
    };
    Some(FilterField::Leaf(set))
}

fn string_set() -> FilterOperatorSet {
    leaf(FilterValueKind::String, STRING_OPS)
}

/// Operator set with `exists` added
fn leaf(kind: FilterValueKind, ops: &[FilterOp]) -> FilterOperatorSet {
    let mut set = FilterOperatorSet::new(kind, ops);
    set.operators.insert(FilterOp::Exists);
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(fields: Vec<(&str, FieldDefinition)>) -> FieldDefinition {
        FieldDefinition::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn reference(target: &str, is_list: bool) -> FieldDefinition {
        FieldDefinition::Reference {
            type_names: BTreeSet::from([target.to_string()]),
            is_list,
        }
    }

    fn known() -> BTreeSet<String> {
        BTreeSet::from(["Post".to_string(), "Tag".to_string()])
    }

    #[test]
    fn test_operator_sets_by_kind() {
        let catalog = synthesize_filters(
            &root(vec![
                ("title", FieldDefinition::Scalar(ScalarKind::String(StringClass::Plain))),
                ("date", FieldDefinition::Scalar(ScalarKind::String(StringClass::Date))),
                (
                    "rank",
                    FieldDefinition::Scalar(ScalarKind::Number {
                        integral: true,
                        fits_i32: true,
                    }),
                ),
                ("draft", FieldDefinition::Scalar(ScalarKind::Bool)),
                (
                    "keywords",
                    FieldDefinition::List(Box::new(FieldDefinition::Scalar(ScalarKind::String(
                        StringClass::Plain,
                    )))),
                ),
            ]),
            "Post",
            &known(),
        );

        let title = catalog.leaf("title").unwrap();
        assert!(title.allows(FilterOp::Regex));
        assert!(!title.allows(FilterOp::Gt));

        let date = catalog.leaf("date").unwrap();
        assert_eq!(date.kind, FilterValueKind::Date);
        assert!(date.allows(FilterOp::Dteq));
        assert!(date.allows(FilterOp::Regex));
        assert!(date.allows(FilterOp::Between));

        let rank = catalog.leaf("rank").unwrap();
        assert!(rank.allows(FilterOp::Between));
        assert!(!rank.allows(FilterOp::Regex));
        assert!(!rank.allows(FilterOp::Len));

        let draft = catalog.leaf("draft").unwrap();
        assert_eq!(draft.operators.len(), 5);

        let keywords = catalog.leaf("keywords").unwrap();
        assert!(keywords.allows(FilterOp::ContainsAny));
        assert!(!keywords.allows(FilterOp::Eq));

        for set in [title, date, rank, draft, keywords] {
            assert!(set.allows(FilterOp::Exists));
        }
    }

    #[test]
    fn test_references_filter_on_id() {
        let catalog = synthesize_filters(
            &root(vec![("tag", reference("Tag", false)), ("tags", reference("Tag", true))]),
            "Post",
            &known(),
        );

        let tag = catalog.leaf("tag").unwrap();
        assert!(tag.on_reference_id);
        assert!(tag.allows(FilterOp::In));
        assert!(!tag.allows(FilterOp::Regex));

        let tags = catalog.leaf("tags").unwrap();
        assert!(tags.on_reference_id);
        assert!(tags.allows(FilterOp::Contains));
        assert!(!tags.allows(FilterOp::Eq));
    }

    #[test]
    fn test_unknown_reference_targets_are_pruned() {
        let catalog = synthesize_filters(
            &root(vec![
                ("author", reference("Ghost", false)),
                (
                    "mixed",
                    FieldDefinition::Reference {
                        type_names: BTreeSet::from(["Ghost".to_string(), "Tag".to_string()]),
                        is_list: true,
                    },
                ),
                (
                    "meta",
                    FieldDefinition::Object(BTreeMap::from([(
                        "g".to_string(),
                        reference("Ghost", false),
                    )])),
                ),
                (
                    "credits",
                    FieldDefinition::List(Box::new(FieldDefinition::Object(BTreeMap::from([(
                        "who".to_string(),
                        reference("Ghost", false),
                    )])))),
                ),
                (
                    "seo",
                    FieldDefinition::Object(BTreeMap::from([(
                        "title".to_string(),
                        FieldDefinition::Scalar(ScalarKind::String(StringClass::Plain)),
                    )])),
                ),
            ]),
            "Post",
            &known(),
        );

        assert!(catalog.get("author").is_none());
        assert!(catalog.get("meta").is_none());
        assert!(catalog.get("credits").is_none());
        assert!(catalog.leaf("mixed").unwrap().on_reference_id);
        assert!(catalog.leaf("seo.title").is_some());
    }

    #[test]
    fn test_untyped_reference_filters_on_its_id() {
        let catalog = synthesize_filters(
            &root(vec![(
                "author",
                FieldDefinition::Reference {
                    type_names: BTreeSet::new(),
                    is_list: false,
                },
            )]),
            "Post",
            &known(),
        );

        let id = catalog.leaf("author.id").unwrap();
        assert_eq!(id.kind, FilterValueKind::String);
        assert!(!id.on_reference_id);
    }

    #[test]
    fn test_builtins_are_always_present() {
        let catalog = synthesize_filters(&root(vec![]), "Empty", &known());
        for builtin in BUILTIN_FILTER_FIELDS {
            assert!(catalog.leaf(builtin).unwrap().allows(FilterOp::Eq));
        }
        assert_eq!(catalog, builtin_filters());
    }
}
