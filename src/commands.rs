//! Subcommand bodies shared by the binary

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::loader::{GlobalConfig, LoadError, Loader};
use crate::merge::EffectiveConfig;
use crate::output::{self, OutputContext, ScanResult};
use crate::progress::ProgressReporter;
use crate::render::render_effective;
use crate::schema::{find_schema_file, load_schema, write_schema_template_in, Schema, SchemaError};
use crate::settings::{AccessError, Settings};
use crate::value::Value;
use crate::walker::{clients_dir, discover_clients, find_installations};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("schema {}: {source}", path.display())]
    Schema { path: PathBuf, source: SchemaError },

    #[error("cannot list clients in {}: {source}", path.display())]
    Discovery { path: PathBuf, source: io::Error },

    #[error("failed to write schema template: {0}")]
    Init(io::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether a command that reports its own diagnostics found problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Problems,
}

/// Schema for this run: `explicit`, else an `ilconf.schema.toml` found
/// upward from `cwd`, else the built-in one.
pub fn resolve_schema(
    explicit: Option<&Path>,
    cwd: Option<&Path>,
) -> Result<Cow<'static, Schema>, CommandError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| cwd.and_then(find_schema_file));

    match path {
        Some(path) => {
            let schema = load_schema(&path).map_err(|source| CommandError::Schema {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), fields = schema.len(), "using schema file");
            Ok(Cow::Owned(schema))
        }
        None => {
            debug!("using built-in schema");
            Ok(Cow::Borrowed(Schema::builtin()))
        }
    }
}

/// Load the global file and each client, printing every diagnostic.
pub fn check(
    loader: &Loader<'_>,
    global: &Path,
    clients: &[PathBuf],
    ctx: &OutputContext,
) -> Outcome {
    let global = match loader.load_global(global) {
        Ok(global) => global,
        Err(e) => {
            output::print_load_error(&e, ctx);
            return Outcome::Problems;
        }
    };
    output::print_ok(global.path(), ctx);

    let mut outcome = Outcome::Clean;
    for client in clients {
        match loader.load_client(&global, client) {
            Ok(_) => output::print_ok(client, ctx),
            Err(e) => {
                output::print_load_error(&e, ctx);
                outcome = Outcome::Problems;
            }
        }
    }
    outcome
}

/// Effective configuration of the client, or of the global file alone.
fn effective(
    loader: &Loader<'_>,
    global: &GlobalConfig,
    client: Option<&Path>,
) -> Result<EffectiveConfig, LoadError> {
    match client {
        Some(path) => loader.load_client(global, path),
        None => Ok(global.effective().clone()),
    }
}

pub fn show(
    loader: &Loader<'_>,
    global: &Path,
    client: Option<&Path>,
    json: bool,
    origin: bool,
) -> Result<String, CommandError> {
    let global = loader.load_global(global)?;
    let config = effective(loader, &global, client)?;

    if json {
        let mut text = serde_json::to_string_pretty(&config)?;
        text.push('\n');
        return Ok(text);
    }
    Ok(render_effective(&config, origin))
}

/// Value at a dotted path; `fallback` replaces any lookup failure.
pub fn get(
    loader: &Loader<'_>,
    global: &Path,
    client: Option<&Path>,
    path: &str,
    fallback: Option<&str>,
) -> Result<Value, CommandError> {
    let global = loader.load_global(global)?;
    let config = effective(loader, &global, client)?;
    let settings = Settings::new(&config);

    match (settings.lookup(path), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(e), Some(fallback)) => {
            debug!(path, error = %e, "using fallback value");
            Ok(Value::String(fallback.to_string()))
        }
        (Err(e), None) => Err(e.into()),
    }
}

/// Unified diff from the global configuration to the client's.
pub fn diff(loader: &Loader<'_>, global: &Path, client: &Path) -> Result<String, CommandError> {
    let global_config = loader.load_global(global)?;
    let client_config = loader.load_client(&global_config, client)?;

    Ok(output::unified_diff(
        &global.display().to_string(),
        &client.display().to_string(),
        &render_effective(global_config.effective(), false),
        &render_effective(&client_config, false),
    ))
}

/// Print an error the way the binary reports failed commands.
pub fn report_error(err: &CommandError, ctx: &OutputContext) {
    match err {
        CommandError::Load(e) => output::print_load_error(e, ctx),
        e => eprintln!("{}Error:{} {e}", ctx.colors.error, ctx.colors.reset()),
    }
}

/// Discover and load every client of an installation.
///
/// `target` is either an `ilias.ini.php` or a directory searched for
/// installations; `dir` overrides the clients directory of a single
/// installation.
pub fn scan(
    loader: &Loader<'_>,
    target: &Path,
    dir: Option<&Path>,
    ctx: &OutputContext,
) -> Result<ScanResult, CommandError> {
    let result = if target.is_dir() {
        scan_tree(loader, target, dir, ctx)?
    } else {
        let global = loader.load_global(target)?;
        scan_clients(loader, &global, dir, ctx)?
    };

    output::print_scan_summary(&result, ctx);
    Ok(result)
}

/// Scan every installation found below `start_dir`. An installation that
/// cannot be loaded counts as one failure.
fn scan_tree(
    loader: &Loader<'_>,
    start_dir: &Path,
    dir: Option<&Path>,
    ctx: &OutputContext,
) -> Result<ScanResult, CommandError> {
    if dir.is_some() {
        output::print_warning("--clients-dir is ignored when scanning a directory", ctx);
    }

    let installations =
        find_installations(start_dir).map_err(|source| CommandError::Discovery {
            path: start_dir.to_path_buf(),
            source,
        })?;
    info!(dir = %start_dir.display(), count = installations.len(), "discovered installations");

    if installations.is_empty() {
        output::print_warning(
            &format!("no installations found in {}", start_dir.display()),
            ctx,
        );
    }

    let mut result = ScanResult::default();
    for path in &installations {
        let scanned = loader
            .load_global(path)
            .map_err(CommandError::from)
            .and_then(|global| {
                output::print_ok(global.path(), ctx);
                scan_clients(loader, &global, None, ctx)
            });
        match scanned {
            Ok(scanned) => result += scanned,
            Err(e) => {
                result.failed += 1;
                report_error(&e, ctx);
            }
        }
    }
    Ok(result)
}

fn scan_clients(
    loader: &Loader<'_>,
    global: &GlobalConfig,
    dir: Option<&Path>,
    ctx: &OutputContext,
) -> Result<ScanResult, CommandError> {
    let settings = global.settings();

    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => clients_dir(global.path(), &settings)?,
    };
    let inifile = settings.get_str("clients", "inifile")?;
    let clients = discover_clients(&dir, inifile).map_err(|source| CommandError::Discovery {
        path: dir.clone(),
        source,
    })?;
    info!(dir = %dir.display(), count = clients.len(), "discovered clients");

    if clients.is_empty() {
        output::print_warning(&format!("no clients found in {}", dir.display()), ctx);
    }

    let progress = ProgressReporter::new(clients.len(), ctx.show_progress);
    let mut result = ScanResult::default();
    for client in &clients {
        progress.start_client(&client.id);
        match loader.load_client(global, &client.path) {
            Ok(_) => {
                result.loaded += 1;
                if !progress.is_visible() {
                    output::print_client_ok(&client.id, &client.path, ctx);
                }
            }
            Err(e) => {
                result.failed += 1;
                progress.println(&output::format_load_error(&e, &ctx.colors));
            }
        }
        progress.finish_client();
    }
    progress.finish();

    Ok(result)
}

pub fn init_schema(dir: Option<&Path>) -> Result<PathBuf, CommandError> {
    write_schema_template_in(dir).map_err(CommandError::Init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputMode;
    use std::fs;
    use tempfile::TempDir;

    const GLOBAL: &str = r#"; <?php exit; ?>
[server]
http_path = "https://ilias.example.org"
absolute_path = "/srv/www/ilias"
[clients]
path = "data"
inifile = "client.ini.php"
datadir = "/srv/www/data"
"#;

    fn client_ini(host: Option<&str>) -> String {
        let mut text = String::from(
            "[client]\nname = \"Default\"\n[db]\nuser = \"u\"\npass = \"p\"\nname = \"ilias\"\n",
        );
        if let Some(host) = host {
            text.push_str(&format!("host = \"{host}\"\n"));
        }
        text
    }

    fn install_at(root: &Path, clients: &[(&str, Option<&str>)]) -> PathBuf {
        let global = root.join("ilias.ini.php");
        fs::create_dir_all(root).unwrap();
        fs::write(&global, GLOBAL).unwrap();
        for (id, host) in clients {
            let client_dir = root.join("data").join(id);
            fs::create_dir_all(&client_dir).unwrap();
            fs::write(client_dir.join("client.ini.php"), client_ini(*host)).unwrap();
        }
        global
    }

    fn installation(clients: &[(&str, Option<&str>)]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let global = install_at(dir.path(), clients);
        (dir, global)
    }

    fn quiet() -> OutputContext {
        OutputContext::new(OutputMode::Quiet, false, false)
    }

    #[test]
    fn test_resolve_schema_prefers_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[db.host]\ntype = \"string\"\n").unwrap();

        let schema = resolve_schema(Some(&path), None).unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_resolve_schema_builtin_fallback() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let schema = resolve_schema(None, Some(dir.path())).unwrap();
        assert!(matches!(schema, Cow::Borrowed(_)));
    }

    #[test]
    fn test_resolve_schema_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[db.host]\ntype = \"float\"\n").unwrap();

        let result = resolve_schema(Some(&path), None);
        assert!(matches!(result, Err(CommandError::Schema { .. })));
    }

    #[test]
    fn test_check_reports_failing_client() {
        let (dir, global) = installation(&[("good", Some("localhost")), ("bad", None)]);
        let loader = Loader::new(Schema::builtin());
        let clients = [
            dir.path().join("data/good/client.ini.php"),
            dir.path().join("data/bad/client.ini.php"),
        ];

        assert_eq!(check(&loader, &global, &clients[..1], &quiet()), Outcome::Clean);
        assert_eq!(check(&loader, &global, &clients, &quiet()), Outcome::Problems);
    }

    #[test]
    fn test_get_with_fallback() {
        let (dir, global) = installation(&[("default", Some("db.local"))]);
        let loader = Loader::new(Schema::builtin());
        let client = dir.path().join("data/default/client.ini.php");

        assert_eq!(
            get(&loader, &global, Some(&client), "db.host", None).unwrap(),
            Value::String("db.local".to_string())
        );
        assert_eq!(
            get(&loader, &global, None, "db.host", Some("fallback")).unwrap(),
            Value::String("fallback".to_string())
        );
        assert!(matches!(
            get(&loader, &global, None, "db.host", None),
            Err(CommandError::Access(AccessError::Unset { .. }))
        ));
    }

    #[test]
    fn test_show_json() {
        let (dir, global) = installation(&[("default", Some("localhost"))]);
        let loader = Loader::new(Schema::builtin());
        let client = dir.path().join("data/default/client.ini.php");

        let text = show(&loader, &global, Some(&client), true, false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["db"]["host"]["entry"], "localhost");
        assert_eq!(json["db"]["host"]["origin"], "client");
        assert_eq!(json["session"]["expire"]["entry"], 7200);
        assert_eq!(json["session"]["expire"]["origin"], "default");
    }

    #[test]
    fn test_diff_shows_client_additions() {
        let (dir, global) = installation(&[("default", Some("localhost"))]);
        let loader = Loader::new(Schema::builtin());
        let client = dir.path().join("data/default/client.ini.php");

        let text = diff(&loader, &global, &client).unwrap();
        assert!(text.contains("+host = \"localhost\""));
    }

    #[test]
    fn test_scan_counts_failures() {
        let (_dir, global) = installation(&[("a", Some("localhost")), ("b", None)]);
        let loader = Loader::new(Schema::builtin());

        let result = scan(&loader, &global, None, &quiet()).unwrap();
        assert_eq!(result, ScanResult { loaded: 1, failed: 1 });
    }

    #[test]
    fn test_scan_missing_clients_dir() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("ilias.ini.php");
        fs::write(&global, GLOBAL).unwrap();
        let loader = Loader::new(Schema::builtin());

        let result = scan(&loader, &global, None, &quiet());
        assert!(matches!(result, Err(CommandError::Discovery { .. })));
    }

    #[test]
    fn test_scan_directory_of_installations() {
        let root = TempDir::new().unwrap();
        for (name, clients) in [
            ("site1", &[("a", Some("localhost"))][..]),
            ("site2", &[("b", Some("localhost")), ("c", None)][..]),
            ("Backup", &[("old", None)][..]),
        ] {
            install_at(&root.path().join(name), clients);
        }
        let loader = Loader::new(Schema::builtin());

        let result = scan(&loader, root.path(), None, &quiet()).unwrap();
        assert_eq!(result, ScanResult { loaded: 2, failed: 1 });
    }

    #[test]
    fn test_scan_directory_counts_broken_installation() {
        let root = TempDir::new().unwrap();
        install_at(&root.path().join("site"), &[("a", Some("localhost"))]);
        fs::create_dir(root.path().join("broken")).unwrap();
        fs::write(root.path().join("broken/ilias.ini.php"), "[server\n").unwrap();
        let loader = Loader::new(Schema::builtin());

        let result = scan(&loader, root.path(), None, &quiet()).unwrap();
        assert_eq!(result, ScanResult { loaded: 1, failed: 1 });
    }

    #[test]
    fn test_scan_directory_without_installations() {
        let root = TempDir::new().unwrap();
        let loader = Loader::new(Schema::builtin());

        let result = scan(&loader, root.path(), None, &quiet()).unwrap();
        assert_eq!(result, ScanResult::default());
    }
}
