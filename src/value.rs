//! Typed configuration values and coercion from raw ini strings

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bool,
    Integer,
    String,
    Enum,
    Path,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::String => "string",
            FieldKind::Enum => "enum",
            FieldKind::Path => "path",
        };
        f.write_str(name)
    }
}

/// A configuration value after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    String(String),
    Enum(String),
    Path(PathBuf),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Boolean(_) => FieldKind::Bool,
            Value::Integer(_) => FieldKind::Integer,
            Value::String(_) => FieldKind::String,
            Value::Enum(_) => FieldKind::Enum,
            Value::Path(_) => FieldKind::Path,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Text of string and enum values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }
}

/// Renders the value in its ini form (booleans as `0`/`1`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) | Value::Enum(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// A stored configuration entry: either typed by the schema or an
/// extension key the schema does not describe, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Known(Value),
    Extension(String),
}

impl Entry {
    pub fn is_extension(&self) -> bool {
        matches!(self, Entry::Extension(_))
    }

    pub fn as_known(&self) -> Option<&Value> {
        match self {
            Entry::Known(v) => Some(v),
            Entry::Extension(_) => None,
        }
    }

    /// Extensions surface as plain strings.
    pub fn to_value(&self) -> Value {
        match self {
            Entry::Known(v) => v.clone(),
            Entry::Extension(raw) => Value::String(raw.clone()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Entry::Known(v) => v.kind(),
            Entry::Extension(_) => FieldKind::String,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Known(v) => v.fmt(f),
            Entry::Extension(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoerceError {
    /// Raw text does not have the shape of the declared kind
    Type,
    /// Enum value outside the allowed set
    NotAllowed,
}

/// Coerce a raw ini string into a value of the given kind.
pub(crate) fn coerce(kind: FieldKind, raw: &str, allowed: &[String]) -> Result<Value, CoerceError> {
    match kind {
        FieldKind::Bool => match raw {
            "0" => Ok(Value::Boolean(false)),
            "1" => Ok(Value::Boolean(true)),
            _ => Err(CoerceError::Type),
        },
        // i64 parsing accepts exactly an optional sign followed by ASCII digits
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| CoerceError::Type),
        FieldKind::Enum => {
            if allowed.iter().any(|a| a == raw) {
                Ok(Value::Enum(raw.to_string()))
            } else {
                Err(CoerceError::NotAllowed)
            }
        }
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Path => Ok(Value::Path(normalize_path(raw))),
    }
}

/// Strip trailing slashes; a path made only of slashes collapses to `/`.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() && !raw.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<String> {
        vec!["DEBUG".to_string(), "WARNING".to_string()]
    }

    #[test]
    fn test_bool_accepts_only_zero_and_one() {
        assert_eq!(coerce(FieldKind::Bool, "0", &[]), Ok(Value::Boolean(false)));
        assert_eq!(coerce(FieldKind::Bool, "1", &[]), Ok(Value::Boolean(true)));
        assert_eq!(coerce(FieldKind::Bool, "true", &[]), Err(CoerceError::Type));
        assert_eq!(coerce(FieldKind::Bool, "", &[]), Err(CoerceError::Type));
        assert_eq!(coerce(FieldKind::Bool, " 1", &[]), Err(CoerceError::Type));
    }

    #[test]
    fn test_integer_with_optional_sign() {
        assert_eq!(coerce(FieldKind::Integer, "7200", &[]), Ok(Value::Integer(7200)));
        assert_eq!(coerce(FieldKind::Integer, "-1", &[]), Ok(Value::Integer(-1)));
        assert_eq!(coerce(FieldKind::Integer, "+12", &[]), Ok(Value::Integer(12)));
    }

    #[test]
    fn test_integer_rejects_non_digits() {
        for raw in ["", "12a", "1.5", "--1", " 3", "99999999999999999999"] {
            assert_eq!(coerce(FieldKind::Integer, raw, &[]), Err(CoerceError::Type), "{raw}");
        }
    }

    #[test]
    fn test_enum_checks_allowed_set() {
        assert_eq!(
            coerce(FieldKind::Enum, "DEBUG", &levels()),
            Ok(Value::Enum("DEBUG".to_string()))
        );
        assert_eq!(
            coerce(FieldKind::Enum, "debug", &levels()),
            Err(CoerceError::NotAllowed)
        );
    }

    #[test]
    fn test_path_strips_trailing_slashes() {
        assert_eq!(
            coerce(FieldKind::Path, "/srv/www/ilias//", &[]),
            Ok(Value::Path(PathBuf::from("/srv/www/ilias")))
        );
        assert_eq!(coerce(FieldKind::Path, "///", &[]), Ok(Value::Path(PathBuf::from("/"))));
        assert_eq!(coerce(FieldKind::Path, "", &[]), Ok(Value::Path(PathBuf::new())));
    }

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(
            coerce(FieldKind::String, "  spaced/ ", &[]),
            Ok(Value::String("  spaced/ ".to_string()))
        );
    }

    #[test]
    fn test_display_uses_ini_form() {
        assert_eq!(Value::Boolean(true).to_string(), "1");
        assert_eq!(Value::Integer(-1).to_string(), "-1");
        assert_eq!(Entry::Extension("raw".to_string()).to_string(), "raw");
    }

    #[test]
    fn test_extension_surfaces_as_string() {
        let entry = Entry::Extension("/var/opt/ilias".to_string());
        assert!(entry.is_extension());
        assert_eq!(entry.to_value(), Value::String("/var/opt/ilias".to_string()));
        assert_eq!(entry.kind(), FieldKind::String);
    }
}
