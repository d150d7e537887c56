//! Schema validation: raw documents to typed configuration

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::parser::RawDocument;
use crate::schema::{FieldRef, Schema, Scope};
use crate::value::{CoerceError, Entry, FieldKind};

/// Which file a document is validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The installation-wide file; must carry its own required fields
    Global,
    /// A per-client overlay; may be partial
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: required field is missing")]
    MissingField { field: FieldRef },

    #[error("{field}: expected {expected}, found {value:?}")]
    Type {
        field: FieldRef,
        expected: FieldKind,
        value: String,
    },

    #[error("{field}: {value:?} is not one of {}", .allowed.join(", "))]
    InvalidEnumValue {
        field: FieldRef,
        value: String,
        allowed: Vec<String>,
    },
}

impl ValidationError {
    pub fn field(&self) -> &FieldRef {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::Type { field, .. }
            | ValidationError::InvalidEnumValue { field, .. } => field,
        }
    }
}

/// Every validation failure of one document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated configuration of one file: section -> key -> entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypedConfig {
    sections: BTreeMap<String, BTreeMap<String, Entry>>,
}

impl TypedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Entry> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Entry>)> {
        self.sections.iter().map(|(name, entries)| (name.as_str(), entries))
    }

    /// All entries, sorted by section then key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Entry)> {
        self.sections.iter().flat_map(|(section, entries)| {
            entries
                .iter()
                .map(move |(key, entry)| (section.as_str(), key.as_str(), entry))
        })
    }

    /// Entries the schema does not describe.
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.iter().filter_map(|(section, key, entry)| match entry {
            Entry::Extension(raw) => Some((section, key, raw.as_str())),
            Entry::Known(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validate a parsed document against the schema.
///
/// Known keys are coerced to their declared type, unknown keys are kept
/// as extensions. For the global layer, required global fields without a
/// default must be present. All errors are returned together.
pub fn validate(
    doc: &RawDocument,
    schema: &Schema,
    layer: Layer,
) -> Result<TypedConfig, ValidationErrors> {
    let mut sections: BTreeMap<String, BTreeMap<String, Entry>> = BTreeMap::new();
    let mut errors = Vec::new();

    for section in doc.sections() {
        for (key, raw) in section.entries() {
            let entry = match schema.field(section.name(), key) {
                Some(spec) => match spec.coerce(raw) {
                    Ok(value) => Entry::Known(value),
                    Err(CoerceError::Type) => {
                        errors.push(ValidationError::Type {
                            field: FieldRef::new(section.name(), key),
                            expected: spec.kind,
                            value: raw.to_string(),
                        });
                        continue;
                    }
                    Err(CoerceError::NotAllowed) => {
                        errors.push(ValidationError::InvalidEnumValue {
                            field: FieldRef::new(section.name(), key),
                            value: raw.to_string(),
                            allowed: spec.allowed.clone(),
                        });
                        continue;
                    }
                },
                None => Entry::Extension(raw.to_string()),
            };
            sections
                .entry(section.name().to_string())
                .or_default()
                .insert(key.to_string(), entry);
        }
    }

    if layer == Layer::Global {
        errors.extend(
            schema
                .fields()
                .filter(|(_, _, spec)| {
                    spec.required && spec.scope == Scope::Global && spec.default.is_none()
                })
                .filter(|(section, key, _)| !doc.contains(section, key))
                .map(|(section, key, _)| ValidationError::MissingField {
                    field: FieldRef::new(section, key),
                }),
        );
    }

    if errors.is_empty() {
        Ok(TypedConfig { sections })
    } else {
        Err(ValidationErrors(errors))
    }
}
