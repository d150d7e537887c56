//! Read-only typed access to an effective configuration

use std::path::Path;

use thiserror::Error;

use crate::merge::{EffectiveConfig, Origin};
use crate::value::{Entry, FieldKind, Value};

/// Prefix of dotted paths that only match extension entries.
pub const EXTENSIONS_NAMESPACE: &str = "extensions";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Neither described by the schema nor present as an extension
    #[error("unknown configuration key {section}.{key}")]
    UnknownKey { section: String, key: String },

    /// Known to the schema, but no layer or default provided a value
    #[error("configuration key {section}.{key} has no value")]
    Unset { section: String, key: String },

    #[error("configuration key {section}.{key} is {found}, not {expected}")]
    TypeMismatch {
        section: String,
        key: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("configuration key {section}.{key} has invalid value {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("invalid configuration path {path:?}, expected section.key")]
    InvalidPath { path: String },
}

/// Typed lookups over an [`EffectiveConfig`]. Cheap to copy; any number
/// of accessors may share one config.
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    config: &'a EffectiveConfig,
}

impl<'a> Settings<'a> {
    pub fn new(config: &'a EffectiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a EffectiveConfig {
        self.config
    }

    pub fn entry(&self, section: &str, key: &str) -> Result<&'a Entry, AccessError> {
        let config = self.config;
        match config.get(section, key) {
            Some(resolved) => Ok(&resolved.entry),
            None if config.is_unset(section, key) => Err(AccessError::Unset {
                section: section.to_string(),
                key: key.to_string(),
            }),
            None => Err(AccessError::UnknownKey {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Value of `section.key`; extensions are returned as strings.
    pub fn get(&self, section: &str, key: &str) -> Result<Value, AccessError> {
        self.entry(section, key).map(Entry::to_value)
    }

    /// Value of `section.key`, or `fallback` when it has none.
    pub fn get_or_default(&self, section: &str, key: &str, fallback: Value) -> Value {
        self.get(section, key).unwrap_or(fallback)
    }

    pub fn origin(&self, section: &str, key: &str) -> Option<Origin> {
        self.config.get(section, key).map(|r| r.origin)
    }

    /// Dotted lookup: `db.host`, or `extensions.debian.data_dir` to
    /// match extension entries only.
    pub fn lookup(&self, path: &str) -> Result<Value, AccessError> {
        if let Some(rest) = path
            .strip_prefix(EXTENSIONS_NAMESPACE)
            .and_then(|r| r.strip_prefix('.'))
        {
            let (section, key) = split_path(rest)?;
            return match self.entry(section, key) {
                Ok(Entry::Extension(raw)) => Ok(Value::String(raw.clone())),
                _ => Err(AccessError::UnknownKey {
                    section: section.to_string(),
                    key: key.to_string(),
                }),
            };
        }

        let (section, key) = split_path(path)?;
        self.get(section, key)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool, AccessError> {
        let entry = self.entry(section, key)?;
        entry
            .as_known()
            .and_then(Value::as_bool)
            .ok_or_else(|| mismatch(section, key, FieldKind::Bool, entry))
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64, AccessError> {
        let entry = self.entry(section, key)?;
        entry
            .as_known()
            .and_then(Value::as_int)
            .ok_or_else(|| mismatch(section, key, FieldKind::Integer, entry))
    }

    /// Text of a string, enum or extension entry.
    pub fn get_str(&self, section: &str, key: &str) -> Result<&'a str, AccessError> {
        let entry = self.entry(section, key)?;
        match entry {
            Entry::Extension(raw) => Ok(raw),
            Entry::Known(value) => value
                .as_str()
                .ok_or_else(|| mismatch(section, key, FieldKind::String, entry)),
        }
    }

    pub fn get_path(&self, section: &str, key: &str) -> Result<&'a Path, AccessError> {
        let entry = self.entry(section, key)?;
        entry
            .as_known()
            .and_then(Value::as_path)
            .ok_or_else(|| mismatch(section, key, FieldKind::Path, entry))
    }

    /// All extension entries as `(section, key, raw)`.
    pub fn extensions(&self) -> impl Iterator<Item = (&'a str, &'a str, &'a str)> {
        let config = self.config;
        config
            .entries()
            .filter_map(|(section, key, entry)| match entry {
                Entry::Extension(raw) => Some((section, key, raw.as_str())),
                Entry::Known(_) => None,
            })
    }
}

fn split_path(path: &str) -> Result<(&str, &str), AccessError> {
    match path.split_once('.') {
        Some((section, key)) if !section.is_empty() && !key.is_empty() => Ok((section, key)),
        _ => Err(AccessError::InvalidPath {
            path: path.to_string(),
        }),
    }
}

fn mismatch(section: &str, key: &str, expected: FieldKind, entry: &Entry) -> AccessError {
    AccessError::TypeMismatch {
        section: section.to_string(),
        key: key.to_string(),
        expected,
        found: entry.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use crate::parser::parse;
    use crate::schema::{FieldSpec, Schema, Scope};
    use crate::validate::{validate, Layer};

    fn config() -> EffectiveConfig {
        let schema = Schema::new()
            .with_field(
                "log",
                "level",
                FieldSpec::new(FieldKind::Enum)
                    .allowed(["DEBUG", "WARNING"])
                    .default_value(Value::Enum("WARNING".to_string()))
                    .scope(Scope::Global),
            )
            .with_field(
                "server",
                "absolute_path",
                FieldSpec::new(FieldKind::Path).scope(Scope::Global),
            )
            .with_field("db", "host", FieldSpec::new(FieldKind::String))
            .with_field("db", "port", FieldSpec::new(FieldKind::String))
            .with_field("session", "expire", FieldSpec::new(FieldKind::Integer))
            .with_field("cache", "activate_global_cache", FieldSpec::new(FieldKind::Bool));

        let global = validate(
            &parse(
                "[server]\nabsolute_path = \"/srv/www/ilias\"\n[debian]\ndata_dir = \"/var/opt/ilias\"\n",
            )
            .unwrap(),
            &schema,
            Layer::Global,
        )
        .unwrap();
        let client = validate(
            &parse("[db]\nhost = \"localhost\"\n[session]\nexpire = \"7200\"\n[cache]\nactivate_global_cache = \"0\"\n")
                .unwrap(),
            &schema,
            Layer::Client,
        )
        .unwrap();
        merge(&global, &client, &schema).unwrap()
    }

    #[test]
    fn test_get_known_value() {
        let config = config();
        let settings = Settings::new(&config);

        assert_eq!(
            settings.get("db", "host"),
            Ok(Value::String("localhost".to_string()))
        );
        assert_eq!(settings.get_int("session", "expire"), Ok(7200));
        assert_eq!(settings.get_bool("cache", "activate_global_cache"), Ok(false));
        assert_eq!(
            settings.get_path("server", "absolute_path"),
            Ok(Path::new("/srv/www/ilias"))
        );
        assert_eq!(settings.get_str("log", "level"), Ok("WARNING"));
        assert_eq!(settings.origin("log", "level"), Some(Origin::Default));
    }

    #[test]
    fn test_get_unknown_key() {
        let config = config();
        let settings = Settings::new(&config);

        assert_eq!(
            settings.get("db", "socket"),
            Err(AccessError::UnknownKey {
                section: "db".to_string(),
                key: "socket".to_string(),
            })
        );
    }

    #[test]
    fn test_get_unset_schema_key() {
        let config = config();
        let settings = Settings::new(&config);

        assert!(matches!(
            settings.get("db", "port"),
            Err(AccessError::Unset { .. })
        ));
    }

    #[test]
    fn test_get_or_default_never_fails() {
        let config = config();
        let settings = Settings::new(&config);
        let fallback = Value::String("3306".to_string());

        assert_eq!(settings.get_or_default("db", "port", fallback.clone()), fallback);
        assert_eq!(
            settings.get_or_default("nope", "nothing", fallback.clone()),
            fallback
        );
        assert_eq!(
            settings.get_or_default("db", "host", fallback),
            Value::String("localhost".to_string())
        );
    }

    #[test]
    fn test_typed_getter_mismatch() {
        let config = config();
        let settings = Settings::new(&config);

        assert_eq!(
            settings.get_bool("session", "expire"),
            Err(AccessError::TypeMismatch {
                section: "session".to_string(),
                key: "expire".to_string(),
                expected: FieldKind::Bool,
                found: FieldKind::Integer,
            })
        );
        assert!(settings.get_str("session", "expire").is_err());
    }

    #[test]
    fn test_lookup_dotted_paths() {
        let config = config();
        let settings = Settings::new(&config);

        assert_eq!(settings.lookup("session.expire"), Ok(Value::Integer(7200)));
        assert_eq!(
            settings.lookup("debian.data_dir"),
            Ok(Value::String("/var/opt/ilias".to_string()))
        );
        assert_eq!(
            settings.lookup("extensions.debian.data_dir"),
            Ok(Value::String("/var/opt/ilias".to_string()))
        );
        assert!(matches!(
            settings.lookup("extensions.db.host"),
            Err(AccessError::UnknownKey { .. })
        ));
        assert!(matches!(
            settings.lookup("nodot"),
            Err(AccessError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_extensions_listed() {
        let config = config();
        let settings = Settings::new(&config);

        let extensions: Vec<_> = settings.extensions().collect();
        assert_eq!(extensions, [("debian", "data_dir", "/var/opt/ilias")]);
    }

    #[test]
    fn test_accessors_share_config() {
        let config = config();
        let a = Settings::new(&config);
        let b = a;

        assert_eq!(a.get("db", "host"), b.get("db", "host"));
    }
}
