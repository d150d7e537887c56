//! Field schema for ini configuration files.
//!
//! This module provides:
//! - Field descriptors (type, requiredness, default, allowed values, scope)
//! - Loading a schema from a TOML description
//! - The embedded ILIAS schema, usable as a starting template
//! - Schema file discovery (search upward from current directory)

mod file;
mod init;
mod toml_schema;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::value::{coerce, CoerceError, FieldKind, Value};

pub use file::{find_file_upward, find_schema_file, load_schema, SchemaError};
pub use init::{write_schema_template, write_schema_template_in, SCHEMA_FILE_NAME, SCHEMA_TEMPLATE};
pub use toml_schema::{FieldToml, SchemaToml};

/// Which file a field belongs to. Requiredness of global fields is
/// checked when the global file is validated; client fields are only
/// checked once a client is merged over the global layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    #[default]
    Client,
}

/// Address of a field: `(section, key)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FieldRef {
    pub section: String,
    pub key: String,
}

impl FieldRef {
    pub fn new(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}

/// Descriptor of one schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub required: bool,
    /// Default value, already coerced to `kind`
    pub default: Option<Value>,
    /// Allowed values (enum fields only)
    pub allowed: Vec<String>,
    pub scope: Scope,
}

impl FieldSpec {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            allowed: Vec::new(),
            scope: Scope::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub(crate) fn coerce(&self, raw: &str) -> Result<Value, CoerceError> {
        coerce(self.kind, raw, &self.allowed)
    }
}

/// Mapping from `(section, key)` to field descriptors. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    sections: BTreeMap<String, BTreeMap<String, FieldSpec>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The embedded ILIAS schema, parsed once per process.
    pub fn builtin() -> &'static Schema {
        static BUILTIN: OnceLock<Schema> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Schema::from_toml_str(SCHEMA_TEMPLATE).expect("embedded schema template is valid")
        })
    }

    /// Parse and check a TOML schema description.
    pub fn from_toml_str(content: &str) -> Result<Schema, SchemaError> {
        let description: SchemaToml = toml::from_str(content)?;
        description.into_schema()
    }

    /// Add or replace a field.
    pub fn with_field(
        mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        spec: FieldSpec,
    ) -> Self {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(key.into(), spec);
        self
    }

    pub fn field(&self, section: &str, key: &str) -> Option<&FieldSpec> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.field(section, key).is_some()
    }

    /// All fields, sorted by section then key.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str, &FieldSpec)> {
        self.sections.iter().flat_map(|(section, fields)| {
            fields
                .iter()
                .map(move |(key, spec)| (section.as_str(), key.as_str(), spec))
        })
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
