//! Reference Markers
//!
//! A reference marker is a field value shaped exactly as
//! `{ "typeName": string | [string], "id": string | [string] }`.
//! The key set is the only discriminator between a reference and an ordinary
//! nested object, so detection requires an exact match: no extra keys, no
//! missing keys.

use serde_json::{json, Value};

const TYPE_NAME_KEY: &str = "typeName";
const ID_KEY: &str = "id";

/// Parsed view of a reference marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMarker {
    /// Referenced type names (empty when the marker's `typeName` is missing)
    pub type_names: Vec<String>,
    /// Referenced ids
    pub ids: Vec<String>,
    /// Whether `id` was given as a list
    pub id_is_list: bool,
}

impl ReferenceMarker {
    /// Returns true if the value has exactly the `{typeName, id}` key set
    pub fn is_marker(value: &Value) -> bool {
        match value.as_object() {
            Some(map) => {
                map.len() == 2 && map.contains_key(TYPE_NAME_KEY) && map.contains_key(ID_KEY)
            }
            None => false,
        }
    }

    /// Parse a marker, returning `None` if the value is not marker-shaped
    pub fn parse(value: &Value) -> Option<Self> {
        if !Self::is_marker(value) {
            return None;
        }

        let type_names = string_list(&value[TYPE_NAME_KEY]);
        let id_value = &value[ID_KEY];
        let id_is_list = id_value.is_array();
        let ids = string_list(id_value);

        Some(Self {
            type_names,
            ids,
            id_is_list,
        })
    }

    /// True when the marker names no type to resolve against
    pub fn is_missing_type_name(&self) -> bool {
        self.type_names.is_empty()
    }
}

/// Build a single reference marker value
pub fn create_reference(type_name: &str, id: &str) -> Value {
    json!({ "typeName": type_name, "id": id })
}

/// Build a marker referencing several ids of one type
pub fn create_reference_list(type_name: &str, ids: &[&str]) -> Value {
    json!({ "typeName": type_name, "id": ids })
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items.iter().flat_map(string_list).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_key_set_required() {
        assert!(ReferenceMarker::is_marker(&json!({"typeName": "Tag", "id": "a"})));
        assert!(!ReferenceMarker::is_marker(&json!({"typeName": "Tag"})));
        assert!(!ReferenceMarker::is_marker(
            &json!({"typeName": "Tag", "id": "a", "title": "x"})
        ));
        assert!(!ReferenceMarker::is_marker(&json!("Tag:a")));
    }

    #[test]
    fn test_parse_list_forms() {
        let marker = ReferenceMarker::parse(&json!({"typeName": ["Post", "Page"], "id": ["1", "2"]}))
            .unwrap();
        assert_eq!(marker.type_names, vec!["Post", "Page"]);
        assert_eq!(marker.ids, vec!["1", "2"]);
        assert!(marker.id_is_list);
    }

    #[test]
    fn test_missing_type_name_is_still_a_marker() {
        let marker = ReferenceMarker::parse(&json!({"typeName": null, "id": "x"})).unwrap();
        assert!(marker.is_missing_type_name());
        assert_eq!(marker.ids, vec!["x"]);
    }

    #[test]
    fn test_builders() {
        assert_eq!(create_reference("Tag", "a"), json!({"typeName": "Tag", "id": "a"}));
        assert_eq!(
            create_reference_list("Tag", &["a", "b"]),
            json!({"typeName": "Tag", "id": ["a", "b"]})
        );
    }
}
