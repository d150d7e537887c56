//! Configuration merging logic
//!
//! Priority: client file > global file > schema defaults

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::schema::{FieldRef, FieldSpec, Schema, Scope};
use crate::validate::TypedConfig;
use crate::value::Entry;

/// Where an effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Client,
    Global,
    Default,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Client => "client",
            Origin::Global => "global",
            Origin::Default => "default",
        }
    }
}

/// An effective entry and its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub entry: Entry,
    pub origin: Origin,
}

/// Required fields that no layer and no default could provide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved required field(s): {}", join_fields(.0))]
pub struct UnresolvedRequiredFields(pub Vec<FieldRef>);

fn join_fields(fields: &[FieldRef]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolved configuration for one context (global alone, or a client).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    #[serde(flatten)]
    sections: BTreeMap<String, BTreeMap<String, Resolved>>,
    /// Schema fields with no value from any source
    #[serde(skip)]
    unset: BTreeSet<FieldRef>,
}

impl EffectiveConfig {
    pub fn get(&self, section: &str, key: &str) -> Option<&Resolved> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    /// Declared by the schema but resolved by nothing.
    pub fn is_unset(&self, section: &str, key: &str) -> bool {
        self.unset.contains(&FieldRef::new(section, key))
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Resolved>)> {
        self.sections.iter().map(|(name, entries)| (name.as_str(), entries))
    }

    /// All resolved entries, sorted by section then key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Resolved)> {
        self.sections.iter().flat_map(|(section, entries)| {
            entries
                .iter()
                .map(move |(key, resolved)| (section.as_str(), key.as_str(), resolved))
        })
    }

    /// Same as [`iter`](Self::iter) without origins.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Entry)> {
        self.iter()
            .map(|(section, key, resolved)| (section, key, &resolved.entry))
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merge a client layer over a global layer.
///
/// Every required field of the schema must resolve; all that do not are
/// reported together.
pub fn merge(
    global: &TypedConfig,
    client: &TypedConfig,
    schema: &Schema,
) -> Result<EffectiveConfig, UnresolvedRequiredFields> {
    merge_layers(global, Some(client), schema, |_| true)
}

/// Resolve a global layer on its own. Only global-scoped required fields
/// are enforced; client fields are expected once a client is merged.
pub fn resolve(
    global: &TypedConfig,
    schema: &Schema,
) -> Result<EffectiveConfig, UnresolvedRequiredFields> {
    merge_layers(global, None, schema, |spec| spec.scope == Scope::Global)
}

fn merge_layers(
    global: &TypedConfig,
    client: Option<&TypedConfig>,
    schema: &Schema,
    enforced: impl Fn(&FieldSpec) -> bool,
) -> Result<EffectiveConfig, UnresolvedRequiredFields> {
    let mut keys: BTreeSet<(&str, &str)> = schema.fields().map(|(s, k, _)| (s, k)).collect();
    keys.extend(global.iter().map(|(s, k, _)| (s, k)));
    if let Some(client) = client {
        keys.extend(client.iter().map(|(s, k, _)| (s, k)));
    }

    let mut sections: BTreeMap<String, BTreeMap<String, Resolved>> = BTreeMap::new();
    let mut unset = BTreeSet::new();
    let mut missing = Vec::new();

    for (section, key) in keys {
        let spec = schema.field(section, key);

        let resolved = client
            .and_then(|c| c.get(section, key))
            .map(|entry| (entry.clone(), Origin::Client))
            .or_else(|| {
                global
                    .get(section, key)
                    .map(|entry| (entry.clone(), Origin::Global))
            })
            .or_else(|| {
                spec.and_then(|s| s.default.clone())
                    .map(|value| (Entry::Known(value), Origin::Default))
            });

        match resolved {
            Some((entry, origin)) => {
                sections
                    .entry(section.to_string())
                    .or_default()
                    .insert(key.to_string(), Resolved { entry, origin });
            }
            None => {
                // Only schema fields can be unresolved
                let field = FieldRef::new(section, key);
                if spec.is_some_and(|s| s.required && enforced(s)) {
                    missing.push(field);
                } else {
                    unset.insert(field);
                }
            }
        }
    }

    if missing.is_empty() {
        Ok(EffectiveConfig { sections, unset })
    } else {
        Err(UnresolvedRequiredFields(missing))
    }
}
