pub mod commands;
pub mod db;
pub mod loader;
pub mod merge;
mod output;
pub mod parser;
pub mod progress;
pub mod render;
pub mod schema;
pub mod settings;
pub mod validate;
pub mod value;
pub mod walker;

pub use db::DbParams;
pub use loader::{
    accessor, load_client_config, load_global_config, GlobalConfig, LoadError, Loader,
};
pub use merge::{merge, resolve, EffectiveConfig, Origin, Resolved, UnresolvedRequiredFields};
pub use output::{
    format_load_error, print_load_error, should_use_colors, unified_diff, Colors, OutputContext,
    OutputMode, ScanResult,
};
pub use parser::{parse, LineError, LineErrorKind, ParseError, RawDocument, Section, GUARD_LINE};
pub use progress::ProgressReporter;
pub use render::{render, render_effective};
pub use schema::{
    find_schema_file, load_schema, write_schema_template, write_schema_template_in, FieldRef,
    FieldSpec, Schema, SchemaError, Scope, SCHEMA_FILE_NAME, SCHEMA_TEMPLATE,
};
pub use settings::{AccessError, Settings, EXTENSIONS_NAMESPACE};
pub use validate::{validate, Layer, TypedConfig, ValidationError, ValidationErrors};
pub use value::{Entry, FieldKind, Value};
pub use walker::{
    clients_dir, discover_clients, find_global_ini, find_installations, ClientIni, EXCLUDED_FOLDERS,
    GLOBAL_INI,
};
