//! Field Merger
//!
//! Folds the `fields` maps of every node of one content type into a single
//! structural `FieldDefinition` (always an `Object` at the root).
//!
//! # Rules
//!
//! - `null`, empty lists and empty objects carry no shape and are skipped, so
//!   an absent value never overwrites a shape inferred from another node
//! - A list whose first element is a reference marker is a reference list;
//!   the `typeName`s of all its marker elements accumulate across nodes
//! - Other lists fold all element shapes into one element definition
//! - An object with exactly the `{typeName, id}` key set is a reference
//!   (a list reference if its `id` is a list); other objects recurse
//! - A marker without a `typeName` warns and contributes no target type, but
//!   keeps the field a reference
//! - Numbers widen from Int to Float on the first non-integral sample
//! - Strings are classified (date, image, file, plain) per sample and widen
//!   to plain text on disagreement
//!
//! # Examples
//!
//! ```rust
//! use sitegraph_core::models::{ContentNode, FieldDefinition, ScalarKind};
//! use sitegraph_core::services::{merge_nodes, InferenceContext};
//! use serde_json::json;
//!
//! let nodes = vec![
//!     ContentNode::new_with_id("1".into(), "Post".into(), json!({"number": 1})),
//!     ContentNode::new_with_id("2".into(), "Post".into(), json!({"number": 1.5})),
//! ];
//!
//! let mut ctx = InferenceContext::new();
//! let FieldDefinition::Object(fields) = merge_nodes("Post", &nodes, &mut ctx) else {
//!     unreachable!()
//! };
//! assert_eq!(
//!     fields["number"],
//!     FieldDefinition::Scalar(ScalarKind::Number { integral: false, fits_i32: false })
//! );
//! ```

use crate::models::{ContentNode, FieldDefinition, ReferenceMarker, ScalarKind};
use crate::services::inference::{InferenceContext, InferenceWarning};
use crate::services::type_synthesizer::classify_string;
use serde_json::{Map, Number, Value};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Merge the fields of every node of `type_name` into one definition
pub fn merge_nodes<I>(type_name: &str, nodes: I, ctx: &mut InferenceContext) -> FieldDefinition
where
    I: IntoIterator,
    I::Item: Borrow<ContentNode>,
{
    let mut root = BTreeMap::new();
    for node in nodes {
        if let Some(fields) = node.borrow().fields.as_object() {
            merge_object(&mut root, fields, "", type_name, ctx);
        }
    }
    FieldDefinition::Object(root)
}

fn merge_object(
    target: &mut BTreeMap<String, FieldDefinition>,
    fields: &Map<String, Value>,
    prefix: &str,
    owner: &str,
    ctx: &mut InferenceContext,
) {
    for (key, value) in fields {
        let path = join_path(prefix, key);
        let Some(observed) = observe(value, &path, owner, ctx) else {
            continue;
        };

        match target.get_mut(key) {
            Some(existing) => {
                if !existing.widen(observed) {
                    ctx.warn(InferenceWarning::ConflictingShapes {
                        type_name: owner.to_string(),
                        field_path: path,
                    });
                }
            }
            None => {
                target.insert(key.clone(), observed);
            }
        }
    }
}

/// Shape of a single value, `None` if it carries no shape
fn observe(
    value: &Value,
    path: &str,
    owner: &str,
    ctx: &mut InferenceContext,
) -> Option<FieldDefinition> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(FieldDefinition::Scalar(ScalarKind::Bool)),
        Value::Number(n) => Some(FieldDefinition::Scalar(number_kind(n))),
        Value::String(s) => Some(FieldDefinition::Scalar(ScalarKind::String(
            classify_string(s),
        ))),
        Value::Array(items) => observe_list(items, path, owner, ctx),
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => match ReferenceMarker::parse(value) {
            Some(marker) if marker.is_missing_type_name() => {
                ctx.warn(missing_type_name(owner, path));
                Some(FieldDefinition::Reference {
                    type_names: BTreeSet::new(),
                    is_list: marker.id_is_list,
                })
            }
            Some(marker) => Some(FieldDefinition::Reference {
                type_names: marker.type_names.into_iter().collect(),
                is_list: marker.id_is_list,
            }),
            None => {
                let mut children = BTreeMap::new();
                merge_object(&mut children, map, path, owner, ctx);
                if children.is_empty() {
                    None
                } else {
                    Some(FieldDefinition::Object(children))
                }
            }
        },
    }
}

fn observe_list(
    items: &[Value],
    path: &str,
    owner: &str,
    ctx: &mut InferenceContext,
) -> Option<FieldDefinition> {
    let first = items.iter().find(|v| !v.is_null())?;

    if ReferenceMarker::is_marker(first) {
        let mut type_names = BTreeSet::new();
        for item in items {
            match ReferenceMarker::parse(item) {
                Some(marker) if marker.is_missing_type_name() => {
                    ctx.warn(missing_type_name(owner, path));
                }
                Some(marker) => type_names.extend(marker.type_names),
                None => {}
            }
        }
        return Some(FieldDefinition::Reference {
            type_names,
            is_list: true,
        });
    }

    let mut element: Option<FieldDefinition> = None;
    for item in items {
        let Some(observed) = observe(item, path, owner, ctx) else {
            continue;
        };
        match element.as_mut() {
            Some(existing) => {
                if !existing.widen(observed) {
                    ctx.warn(InferenceWarning::ConflictingShapes {
                        type_name: owner.to_string(),
                        field_path: path.to_string(),
                    });
                }
            }
            None => element = Some(observed),
        }
    }

    element.map(|e| FieldDefinition::List(Box::new(e)))
}

fn number_kind(n: &Number) -> ScalarKind {
    let (integral, fits_i32) = if let Some(i) = n.as_i64() {
        (true, i32::try_from(i).is_ok())
    } else if n.is_u64() {
        (true, false)
    } else {
        let f = n.as_f64().unwrap_or(f64::NAN);
        let integral = f.is_finite() && f.fract() == 0.0;
        let fits = integral && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX);
        (integral, fits)
    };
    ScalarKind::Number { integral, fits_i32 }
}

fn missing_type_name(owner: &str, path: &str) -> InferenceWarning {
    InferenceWarning::MissingReferenceTypeName {
        type_name: owner.to_string(),
        field_path: path.to_string(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StringClass;
    use serde_json::json;

    fn merge(samples: &[Value]) -> (BTreeMap<String, FieldDefinition>, InferenceContext) {
        let nodes: Vec<ContentNode> = samples
            .iter()
            .enumerate()
            .map(|(i, f)| ContentNode::new_with_id(i.to_string(), "Post".to_string(), f.clone()))
            .collect();
        let mut ctx = InferenceContext::new();
        let FieldDefinition::Object(fields) = merge_nodes("Post", &nodes, &mut ctx) else {
            panic!("root must be an object");
        };
        (fields, ctx)
    }

    fn int() -> FieldDefinition {
        FieldDefinition::Scalar(ScalarKind::Number {
            integral: true,
            fits_i32: true,
        })
    }

    fn float() -> FieldDefinition {
        FieldDefinition::Scalar(ScalarKind::Number {
            integral: false,
            fits_i32: false,
        })
    }

    #[test]
    fn test_int_then_float_widens_to_float() {
        let (fields, _) = merge(&[json!({"n": 1}), json!({"n": 1.5}), json!({"n": 2})]);
        assert_eq!(fields["n"], float());

        let (fields, _) = merge(&[json!({"n": 1.5}), json!({"n": 1})]);
        assert_eq!(fields["n"], float());
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let (fields, _) = merge(&[json!({"a": []}), json!({"a": [1, 2]})]);
        assert_eq!(fields["a"], FieldDefinition::List(Box::new(int())));

        let (fields, _) = merge(&[json!({"a": [1]}), json!({"a": []}), json!({"a": null})]);
        assert_eq!(fields["a"], FieldDefinition::List(Box::new(int())));

        let (fields, _) = merge(&[json!({"a": {}, "b": null, "c": []})]);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_reference_list_accumulates_type_names() {
        let (fields, _) = merge(&[
            json!({"related": [{"typeName": "Post", "id": "1"}, {"typeName": "Page", "id": "2"}]}),
            json!({"related": [{"typeName": "Author", "id": "3"}]}),
        ]);
        assert_eq!(
            fields["related"],
            FieldDefinition::Reference {
                type_names: BTreeSet::from([
                    "Author".to_string(),
                    "Page".to_string(),
                    "Post".to_string()
                ]),
                is_list: true,
            }
        );
    }

    #[test]
    fn test_marker_with_id_list_is_a_list_reference() {
        let (fields, _) = merge(&[json!({"tags": {"typeName": "Tag", "id": ["a", "b"]}})]);
        assert_eq!(
            fields["tags"],
            FieldDefinition::Reference {
                type_names: BTreeSet::from(["Tag".to_string()]),
                is_list: true,
            }
        );
    }

    #[test]
    fn test_reference_stays_sticky_across_nodes() {
        let (fields, _) = merge(&[
            json!({"author": {"typeName": "Author", "id": "jane"}}),
            json!({"author": "jane"}),
        ]);
        assert!(fields["author"].is_reference());
    }

    #[test]
    fn test_missing_type_name_warns_and_keeps_marker_shape() {
        let (fields, ctx) = merge(&[json!({
            "author": {"typeName": null, "id": "x"},
            "tags": [{"typeName": "Tag", "id": "a"}, {"typeName": "", "id": "b"}]
        })]);

        assert_eq!(
            fields["author"],
            FieldDefinition::Reference {
                type_names: BTreeSet::new(),
                is_list: false,
            }
        );
        assert_eq!(
            fields["tags"],
            FieldDefinition::Reference {
                type_names: BTreeSet::from(["Tag".to_string()]),
                is_list: true,
            }
        );
        assert_eq!(ctx.warnings().len(), 2);
    }

    #[test]
    fn test_untyped_marker_widens_with_typed_markers() {
        let (fields, _) = merge(&[
            json!({"author": {"typeName": null, "id": "x"}}),
            json!({"author": {"typeName": "Author", "id": "jane"}}),
        ]);

        assert_eq!(
            fields["author"],
            FieldDefinition::Reference {
                type_names: BTreeSet::from(["Author".to_string()]),
                is_list: false,
            }
        );
    }

    #[test]
    fn test_nested_objects_recurse() {
        let (fields, _) = merge(&[
            json!({"meta": {"rating": 4}}),
            json!({"meta": {"published": "2024-01-01"}}),
        ]);
        let FieldDefinition::Object(meta) = &fields["meta"] else {
            panic!("meta must be an object");
        };
        assert_eq!(meta["rating"], int());
        assert_eq!(
            meta["published"],
            FieldDefinition::Scalar(ScalarKind::String(StringClass::Date))
        );
    }

    #[test]
    fn test_conflicting_shapes_keep_first_and_warn() {
        let (fields, ctx) = merge(&[json!({"x": [1]}), json!({"x": {"a": 1}})]);
        assert_eq!(fields["x"], FieldDefinition::List(Box::new(int())));
        assert!(matches!(
            ctx.warnings()[0],
            InferenceWarning::ConflictingShapes { .. }
        ));
    }

    #[test]
    fn test_large_integers_are_not_i32() {
        let (fields, _) = merge(&[json!({"big": 4_000_000_000_i64})]);
        assert_eq!(
            fields["big"],
            FieldDefinition::Scalar(ScalarKind::Number {
                integral: true,
                fits_i32: false
            })
        );
    }
}
