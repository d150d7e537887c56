//! TOML representation of a schema file

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldRef, FieldSpec, Schema, SchemaError, Scope};
use crate::parser::{is_key_name, is_section_name};
use crate::value::{coerce, FieldKind};

/// Root of a schema file: `[section.key]` tables describing each field.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaToml {
    pub sections: BTreeMap<String, BTreeMap<String, FieldToml>>,
}

/// One `[section.key]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldToml {
    /// bool, integer, string, enum or path
    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Field must resolve to a value (default: false)
    #[serde(default)]
    pub required: bool,

    /// Default in raw ini form, coerced when the schema is loaded
    pub default: Option<String>,

    /// Allowed values for enum fields
    pub allowed: Option<Vec<String>>,

    /// global or client (default: client)
    #[serde(default)]
    pub scope: Scope,
}

impl SchemaToml {
    /// Check names, enum sets and defaults, and build the schema.
    pub fn into_schema(self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new();
        for (section, fields) in self.sections {
            if !is_section_name(&section) {
                return Err(SchemaError::InvalidName { name: section });
            }
            for (key, field) in fields {
                if !is_key_name(&key) {
                    return Err(SchemaError::InvalidName {
                        name: format!("{section}.{key}"),
                    });
                }
                let spec = field.into_spec(FieldRef::new(section.as_str(), key.as_str()))?;
                schema = schema.with_field(section.as_str(), key, spec);
            }
        }
        Ok(schema)
    }
}

impl FieldToml {
    fn into_spec(self, field: FieldRef) -> Result<FieldSpec, SchemaError> {
        let allowed = match (self.kind, self.allowed) {
            (FieldKind::Enum, Some(values)) if !values.is_empty() => values,
            (FieldKind::Enum, _) => return Err(SchemaError::EmptyEnum { field }),
            (_, Some(_)) => return Err(SchemaError::AllowedOnNonEnum { field }),
            (_, None) => Vec::new(),
        };

        let default = match self.default {
            Some(raw) => match coerce(self.kind, &raw, &allowed) {
                Ok(value) => Some(value),
                Err(_) => {
                    return Err(SchemaError::InvalidDefault {
                        field,
                        value: raw,
                        kind: self.kind,
                    })
                }
            },
            None => None,
        };

        Ok(FieldSpec {
            kind: self.kind,
            required: self.required,
            default,
            allowed,
            scope: self.scope,
        })
    }
}
