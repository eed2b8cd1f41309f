//! Structural Field Definitions
//!
//! A `FieldDefinition` is the accumulated shape of one field across every node
//! of a content type. Definitions only ever widen:
//!
//! - Int widens to Float once any non-integral sample is seen
//! - Differing string classes (date, image, file) widen to plain text
//! - Differing scalar kinds widen to plain text
//! - Reference target sets grow, single references widen to reference lists
//! - A field recognized as a reference stays a reference (sticky)
//!
//! Widening is a pure function over the variants so the rules can be tested
//! without any store or schema.

use std::collections::{BTreeMap, BTreeSet};

/// Heuristic class of a string sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringClass {
    Date,
    Image,
    File,
    Plain,
}

impl StringClass {
    /// Least upper bound of two classes
    pub fn join(self, other: StringClass) -> StringClass {
        if self == other {
            self
        } else {
            StringClass::Plain
        }
    }
}

/// Shape of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String(StringClass),
    /// `integral`: every sample so far had no fractional part.
    /// `fits_i32`: every sample so far is exactly representable as an i32.
    Number { integral: bool, fits_i32: bool },
    Bool,
}

impl ScalarKind {
    /// Least upper bound of two scalar kinds
    pub fn widen(self, other: ScalarKind) -> ScalarKind {
        match (self, other) {
            (ScalarKind::String(a), ScalarKind::String(b)) => ScalarKind::String(a.join(b)),
            (
                ScalarKind::Number {
                    integral: ia,
                    fits_i32: fa,
                },
                ScalarKind::Number {
                    integral: ib,
                    fits_i32: fb,
                },
            ) => ScalarKind::Number {
                integral: ia && ib,
                fits_i32: fa && fb,
            },
            (ScalarKind::Bool, ScalarKind::Bool) => ScalarKind::Bool,
            _ => ScalarKind::String(StringClass::Plain),
        }
    }
}

/// Accumulated structural shape of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefinition {
    Scalar(ScalarKind),
    List(Box<FieldDefinition>),
    Object(BTreeMap<String, FieldDefinition>),
    Reference {
        type_names: BTreeSet<String>,
        is_list: bool,
    },
}

impl FieldDefinition {
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldDefinition::Reference { .. })
    }

    /// Shape kept for a reference whose markers never named a type: the
    /// marker read as a plain object with a string `id`
    pub fn untyped_reference(is_list: bool) -> FieldDefinition {
        let object = FieldDefinition::Object(BTreeMap::from([(
            "id".to_string(),
            FieldDefinition::Scalar(ScalarKind::String(StringClass::Plain)),
        )]));
        if is_list {
            FieldDefinition::List(Box::new(object))
        } else {
            object
        }
    }

    /// Merge another observed shape into this one.
    ///
    /// Returns `false` when the shapes conflict structurally (e.g. an object
    /// observed where a list was established); the established shape is kept
    /// and the caller decides whether to report it.
    pub fn widen(&mut self, other: FieldDefinition) -> bool {
        match (self, other) {
            (
                FieldDefinition::Reference {
                    type_names,
                    is_list,
                },
                FieldDefinition::Reference {
                    type_names: more,
                    is_list: other_list,
                },
            ) => {
                type_names.extend(more);
                *is_list |= other_list;
                true
            }
            // Sticky: once a reference, later non-reference shapes are ignored
            (FieldDefinition::Reference { .. }, _) => true,
            (this, other @ FieldDefinition::Reference { .. }) => {
                *this = other;
                true
            }
            (FieldDefinition::Scalar(a), FieldDefinition::Scalar(b)) => {
                *a = a.widen(b);
                true
            }
            (FieldDefinition::List(a), FieldDefinition::List(b)) => a.widen(*b),
            (FieldDefinition::Object(a), FieldDefinition::Object(b)) => {
                let mut consistent = true;
                for (key, def) in b {
                    match a.get_mut(&key) {
                        Some(existing) => consistent &= existing.widen(def),
                        None => {
                            a.insert(key, def);
                        }
                    }
                }
                consistent
            }
            _ => false,
        }
    }
}
