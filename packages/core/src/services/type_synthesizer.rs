//! Type Synthesizer
//!
//! Turns merged `FieldDefinition`s into queryable `FieldType`s.
//!
//! # Architecture
//!
//! - **Scalars**: strings map to Date/Image/File/String by sample class,
//!   numbers to Int (every sample an i32) or Float, booleans to Bool
//! - **Objects**: children are synthesized first; an object whose children
//!   are all omitted is omitted itself, otherwise it becomes a named object
//!   type registered in the `TypeRegistry`
//! - **References**: target types are filtered against the known content
//!   types. One target yields a reference, several a named union, none
//!   omits the field. Markers that never named a type keep their value as
//!   an object with an `id`
//! - **Naming**: object and union names come from the `InferenceContext`,
//!   memoized by `(owner, field path)`
//!
//! String classification also lives here; the field merger calls it per
//! sample so classes can widen like any other scalar.

use crate::models::{
    FieldDefinition, FieldType, ObjectType, ScalarKind, StringClass, TypeRegistry, UnionType,
};
use crate::services::inference::{InferenceContext, InferenceWarning, NamedTypeKind};
use crate::utils::is_date_string;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Extensions recognized as images
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "bmp", "tif", "tiff", "ico",
];

/// Non-image extensions recognized as downloadable files
pub const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "txt", "csv", "md",
    "json", "xml", "yaml", "yml", "zip", "gz", "tar", "rar", "7z", "mp3", "wav", "ogg", "mp4",
    "webm", "mov", "avi", "epub",
];

/// `scheme:` prefix of an absolute URL (`https://`, `mailto:`, `data:`)
static URL_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap());

/// Classify one string sample
///
/// - Date: ISO-8601 family (`2024-03-01`, `2024-03-01T10:00:00Z`), never a pure number
/// - Image: a resolvable path with an image extension
/// - File: a resolvable path with a known non-image extension
///
/// A resolvable path is relative (`./a.png`, `../a.png`, `img/a.png`) or
/// root-absolute (`/a.png`). URLs, protocol-relative `//host/a.png` and bare
/// names like `photo.png` or `example.com` stay plain text.
pub fn classify_string(value: &str) -> StringClass {
    if is_date_string(value) {
        return StringClass::Date;
    }

    if !is_resolvable_path(value) {
        return StringClass::Plain;
    }

    match extension(value) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => StringClass::Image,
        Some(ext) if FILE_EXTENSIONS.contains(&ext.as_str()) => StringClass::File,
        _ => StringClass::Plain,
    }
}

fn is_resolvable_path(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    if value.starts_with("//") || URL_SCHEME_RE.is_match(value) {
        return false;
    }
    value.starts_with("./") || value.starts_with("../") || value.contains('/')
}

fn extension(value: &str) -> Option<String> {
    let path = value.split(['?', '#']).next().unwrap_or(value);
    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Synthesizes field types for one schema build
///
/// Shares the type registry and inference context across all node types so
/// names stay unique and warnings are collected in one place.
pub struct TypeSynthesizer<'a> {
    known_types: &'a BTreeSet<String>,
    registry: &'a mut TypeRegistry,
    ctx: &'a mut InferenceContext,
}

impl<'a> TypeSynthesizer<'a> {
    pub fn new(
        known_types: &'a BTreeSet<String>,
        registry: &'a mut TypeRegistry,
        ctx: &'a mut InferenceContext,
    ) -> Self {
        Self {
            known_types,
            registry,
            ctx,
        }
    }

    /// Field types of a node type from its merged root definition
    pub fn synthesize_node_fields(
        &mut self,
        owner: &str,
        root: &FieldDefinition,
    ) -> BTreeMap<String, FieldType> {
        match root {
            FieldDefinition::Object(children) => self.synthesize_children(owner, "", children),
            _ => BTreeMap::new(),
        }
    }

    /// Synthesize one field, `None` if it must be omitted
    pub fn synthesize(
        &mut self,
        def: &FieldDefinition,
        owner: &str,
        field_path: &str,
    ) -> Option<FieldType> {
        match def {
            FieldDefinition::Scalar(kind) => Some(scalar_type(*kind)),
            FieldDefinition::List(element) => self
                .synthesize(element, owner, field_path)
                .map(|of_type| FieldType::List {
                    of_type: Box::new(of_type),
                }),
            FieldDefinition::Object(children) => {
                let fields = self.synthesize_children(owner, field_path, children);
                if fields.is_empty() {
                    return None;
                }

                let name = self
                    .ctx
                    .type_name_for(owner, field_path, NamedTypeKind::Object);
                self.registry.objects.insert(
                    name.clone(),
                    ObjectType {
                        name: name.clone(),
                        owner: owner.to_string(),
                        field_path: field_path.to_string(),
                        fields,
                    },
                );
                Some(FieldType::Object { type_name: name })
            }
            FieldDefinition::Reference { type_names, is_list } if type_names.is_empty() => {
                self.synthesize(&FieldDefinition::untyped_reference(*is_list), owner, field_path)
            }
            FieldDefinition::Reference {
                type_names,
                is_list,
            } => self.synthesize_reference(type_names, *is_list, owner, field_path),
        }
    }

    fn synthesize_children(
        &mut self,
        owner: &str,
        prefix: &str,
        children: &BTreeMap<String, FieldDefinition>,
    ) -> BTreeMap<String, FieldType> {
        children
            .iter()
            .filter_map(|(key, def)| {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                self.synthesize(def, owner, &path)
                    .map(|field_type| (key.clone(), field_type))
            })
            .collect()
    }

    fn synthesize_reference(
        &mut self,
        type_names: &BTreeSet<String>,
        is_list: bool,
        owner: &str,
        field_path: &str,
    ) -> Option<FieldType> {
        let (known, unknown): (Vec<&String>, Vec<&String>) = type_names
            .iter()
            .partition(|name| self.known_types.contains(name.as_str()));

        if !unknown.is_empty() {
            self.ctx.warn(InferenceWarning::UnknownReferenceTypes {
                type_name: owner.to_string(),
                field_path: field_path.to_string(),
                unknown: unknown.into_iter().cloned().collect(),
            });
        }

        match known.as_slice() {
            [] => {
                self.ctx.warn(InferenceWarning::NoKnownReferenceTypes {
                    type_name: owner.to_string(),
                    field_path: field_path.to_string(),
                });
                None
            }
            [single] => Some(FieldType::Reference {
                type_name: (*single).clone(),
                is_list,
            }),
            several => {
                let members: Vec<String> = several.iter().map(|s| (*s).clone()).collect();
                let name = self
                    .ctx
                    .type_name_for(owner, field_path, NamedTypeKind::Union);
                self.registry.unions.insert(
                    name.clone(),
                    UnionType {
                        name: name.clone(),
                        owner: owner.to_string(),
                        field_path: field_path.to_string(),
                        members: members.clone(),
                    },
                );
                Some(FieldType::Union {
                    type_name: name,
                    members,
                    is_list,
                })
            }
        }
    }
}

fn scalar_type(kind: ScalarKind) -> FieldType {
    match kind {
        ScalarKind::String(StringClass::Date) => FieldType::Date,
        ScalarKind::String(StringClass::Image) => FieldType::Image,
        ScalarKind::String(StringClass::File) => FieldType::File,
        ScalarKind::String(StringClass::Plain) => FieldType::String,
        ScalarKind::Number {
            integral: true,
            fits_i32: true,
        } => FieldType::Int,
        ScalarKind::Number { .. } => FieldType::Float,
        ScalarKind::Bool => FieldType::Bool,
    }
}
