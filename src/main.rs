use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use ilconf::commands::{self, CommandError, Outcome};
use ilconf::{should_use_colors, Loader, OutputContext, OutputMode};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "ILCONF_LOG";

#[derive(Parser)]
#[command(name = "ilconf")]
#[command(version, about = "Load and validate ILIAS ini.php configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Schema file (overrides auto-discovery of ilconf.schema.toml)
    #[arg(long, global = true, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Print only diagnostics and requested values
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Force coloured output
    #[arg(long, global = true)]
    color: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load the global file and clients, report every problem
    Check {
        /// Path to ilias.ini.php
        global: PathBuf,

        /// Client ini file to check against the global file
        #[arg(long = "client", value_name = "PATH")]
        clients: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Show {
        global: PathBuf,

        #[arg(long, value_name = "PATH")]
        client: Option<PathBuf>,

        /// Print JSON instead of ini
        #[arg(long)]
        json: bool,

        /// Annotate each value with where it came from
        #[arg(long, conflicts_with = "json")]
        origin: bool,
    },

    /// Print one value, addressed as section.key
    Get {
        global: PathBuf,

        /// section.key, or extensions.section.key
        key: String,

        #[arg(long, value_name = "PATH")]
        client: Option<PathBuf>,

        /// Printed when the key has no value
        #[arg(long, value_name = "VALUE")]
        default: Option<String>,
    },

    /// Show what a client changes relative to the global file
    Diff {
        global: PathBuf,

        #[arg(long, value_name = "PATH")]
        client: PathBuf,
    },

    /// Discover and load every client of one or more installations
    Scan {
        /// ilias.ini.php, or a directory to search for installations
        path: PathBuf,

        /// Directory holding the client directories (default: from [clients] path)
        #[arg(long, value_name = "DIR")]
        clients_dir: Option<PathBuf>,
    },

    /// Generate a template ilconf.schema.toml
    InitSchema {
        /// Target directory (default: current directory)
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let ctx = OutputContext::new(
        mode,
        should_use_colors(cli.color, cli.no_color),
        !cli.quiet,
    );

    match run(&cli, &ctx) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Problems) => ExitCode::from(1),
        Err(e) => {
            commands::report_error(&e, &ctx);
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("ilconf=debug"),
        _ => EnvFilter::new("trace"),
    };

    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn run(cli: &Cli, ctx: &OutputContext) -> Result<Outcome, CommandError> {
    match &cli.command {
        Command::Check { global, clients } => {
            with_loader(cli, |loader| Ok(commands::check(loader, global, clients, ctx)))
        }
        Command::Show {
            global,
            client,
            json,
            origin,
        } => with_loader(cli, |loader| {
            let text = commands::show(loader, global, client.as_deref(), *json, *origin)?;
            print!("{text}");
            Ok(Outcome::Clean)
        }),
        Command::Get {
            global,
            key,
            client,
            default,
        } => with_loader(cli, |loader| {
            let value = commands::get(loader, global, client.as_deref(), key, default.as_deref())?;
            println!("{value}");
            Ok(Outcome::Clean)
        }),
        Command::Diff { global, client } => with_loader(cli, |loader| {
            print!("{}", commands::diff(loader, global, client)?);
            Ok(Outcome::Clean)
        }),
        Command::Scan { path, clients_dir } => with_loader(cli, |loader| {
            let result = commands::scan(loader, path, clients_dir.as_deref(), ctx)?;
            if result.has_failures() {
                Ok(Outcome::Problems)
            } else {
                Ok(Outcome::Clean)
            }
        }),
        Command::InitSchema { dir } => {
            let path = commands::init_schema(dir.as_deref())?;
            if !ctx.is_quiet() {
                println!("Created {}", path.display());
            }
            Ok(Outcome::Clean)
        }
    }
}

/// Resolve the schema for this run and hand a loader over it to `f`.
fn with_loader<T>(
    cli: &Cli,
    f: impl FnOnce(&Loader<'_>) -> Result<T, CommandError>,
) -> Result<T, CommandError> {
    let cwd = std::env::current_dir().ok();
    let schema = commands::resolve_schema(cli.schema.as_deref(), cwd.as_deref())?;
    f(&Loader::new(&schema))
}
