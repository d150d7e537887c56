//! Schema file discovery and loading

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{FieldRef, Schema, SCHEMA_FILE_NAME};
use crate::value::FieldKind;

/// Error type for schema loading
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse schema file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid section or key name {name:?} in schema")]
    InvalidName { name: String },

    #[error("{field}: enum field needs at least one allowed value")]
    EmptyEnum { field: FieldRef },

    #[error("{field}: `allowed` is only valid for enum fields")]
    AllowedOnNonEnum { field: FieldRef },

    #[error("{field}: default {value:?} is not a valid {kind}")]
    InvalidDefault {
        field: FieldRef,
        value: String,
        kind: FieldKind,
    },
}

/// Search upward from `start_dir` for a file with the given name.
///
/// If `stop_at_git_root` is true, stops searching when a `.git` directory is found.
/// Returns `None` if the file is not found.
pub fn find_file_upward(
    start_dir: &Path,
    filename: &str,
    stop_at_git_root: bool,
) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let file_path = current.join(filename);
        if file_path.is_file() {
            return Some(file_path);
        }

        if stop_at_git_root && current.join(".git").exists() {
            return None;
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Find `ilconf.schema.toml` by searching upward from the given directory,
/// stopping at the git repository root.
pub fn find_schema_file(start_dir: &Path) -> Option<PathBuf> {
    find_file_upward(start_dir, SCHEMA_FILE_NAME, true)
}

/// Load and check a schema file.
pub fn load_schema(path: &Path) -> Result<Schema, SchemaError> {
    let content = fs::read_to_string(path)?;
    Schema::from_toml_str(&content)
}
