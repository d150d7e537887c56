//! Loading global and client files through the full pipeline:
//! read, parse, validate, merge.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::merge::{merge, resolve, EffectiveConfig, UnresolvedRequiredFields};
use crate::parser::{parse, ParseError};
use crate::schema::Schema;
use crate::settings::Settings;
use crate::validate::{validate, Layer, TypedConfig, ValidationErrors};

/// Error type for loading a configuration file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: ParseError },

    #[error("invalid configuration in {}: {source}", path.display())]
    Validation {
        path: PathBuf,
        source: ValidationErrors,
    },

    #[error("incomplete configuration for {}: {source}", path.display())]
    Unresolved {
        path: PathBuf,
        source: UnresolvedRequiredFields,
    },
}

impl LoadError {
    /// File the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::Validation { path, .. }
            | LoadError::Unresolved { path, .. } => path,
        }
    }
}

/// A loaded global file: its validated layer and the configuration it
/// resolves to on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    path: PathBuf,
    layer: TypedConfig,
    effective: EffectiveConfig,
}

impl GlobalConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layer(&self) -> &TypedConfig {
        &self.layer
    }

    pub fn effective(&self) -> &EffectiveConfig {
        &self.effective
    }

    pub fn settings(&self) -> Settings<'_> {
        Settings::new(&self.effective)
    }
}

/// Runs the pipeline against one schema.
#[derive(Debug, Clone, Copy)]
pub struct Loader<'s> {
    schema: &'s Schema,
}

impl<'s> Loader<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Parse and validate `text` as one layer; `path` only labels errors.
    pub fn layer_from_str(
        &self,
        text: &str,
        path: &Path,
        layer: Layer,
    ) -> Result<TypedConfig, LoadError> {
        let doc = parse(text).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), sections = doc.sections().len(), "parsed");

        let typed = validate(&doc, self.schema, layer).map_err(|source| LoadError::Validation {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            entries = typed.len(),
            extensions = typed.extensions().count(),
            "validated"
        );
        Ok(typed)
    }

    pub fn read_layer(&self, path: &Path, layer: Layer) -> Result<TypedConfig, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.layer_from_str(&text, path, layer)
    }

    pub fn load_global(&self, path: &Path) -> Result<GlobalConfig, LoadError> {
        let layer = self.read_layer(path, Layer::Global)?;
        let effective = resolve(&layer, self.schema).map_err(|source| LoadError::Unresolved {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded global configuration");

        Ok(GlobalConfig {
            path: path.to_path_buf(),
            layer,
            effective,
        })
    }

    pub fn load_client(
        &self,
        global: &GlobalConfig,
        path: &Path,
    ) -> Result<EffectiveConfig, LoadError> {
        let client = self.read_layer(path, Layer::Client)?;
        let effective =
            merge(&global.layer, &client, self.schema).map_err(|source| LoadError::Unresolved {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            path = %path.display(),
            global = %global.path.display(),
            "loaded client configuration"
        );
        Ok(effective)
    }
}

/// Load a global file against the built-in schema.
pub fn load_global_config(path: &Path) -> Result<GlobalConfig, LoadError> {
    Loader::new(Schema::builtin()).load_global(path)
}

/// Load a client file over `global` against the built-in schema.
pub fn load_client_config(global: &GlobalConfig, path: &Path) -> Result<EffectiveConfig, LoadError> {
    Loader::new(Schema::builtin()).load_client(global, path)
}

pub fn accessor(config: &EffectiveConfig) -> Settings<'_> {
    Settings::new(config)
}
