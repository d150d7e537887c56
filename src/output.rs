use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::ops::AddAssign;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

use crate::loader::LoadError;

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Normal,
    /// Only diagnostics and requested values
    Quiet,
}

/// ANSI escapes for the message prefixes; empty when colours are off.
#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub error: &'static str,
    pub warning: &'static str,
    pub success: &'static str,
    pub info: &'static str,
    enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                error: "",
                warning: "",
                success: "",
                info: "",
                enabled,
            };
        }
        Self {
            error: "\x1b[31m",
            warning: "\x1b[33m",
            success: "\x1b[32m",
            info: "\x1b[36m",
            enabled,
        }
    }

    pub fn reset(&self) -> &'static str {
        if self.enabled {
            RESET
        } else {
            ""
        }
    }
}

/// `--no-color` beats `--color`, which beats `NO_COLOR`; otherwise
/// colour only when stdout is a terminal.
pub fn should_use_colors(force_color: bool, no_color: bool) -> bool {
    if no_color {
        return false;
    }
    if force_color {
        return true;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}

pub struct OutputContext {
    pub mode: OutputMode,
    pub colors: Colors,
    pub show_progress: bool,
}

impl OutputContext {
    pub fn new(mode: OutputMode, use_colors: bool, show_progress: bool) -> Self {
        Self {
            mode,
            colors: Colors::new(use_colors),
            show_progress,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }
}

/// Outcome of loading several clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub loaded: usize,
    pub failed: usize,
}

impl ScanResult {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl AddAssign for ScanResult {
    fn add_assign(&mut self, other: Self) {
        self.loaded += other.loaded;
        self.failed += other.failed;
    }
}

/// Headline plus one indented line per individual problem.
pub fn format_load_error(err: &LoadError, colors: &Colors) -> String {
    let mut out = format!("{}Error:{} {err}\n", colors.error, colors.reset());

    // Writing into a String cannot fail
    match err {
        LoadError::Io { .. } => {}
        LoadError::Parse { source, .. } => {
            for line_error in &source.errors {
                let _ = writeln!(out, "  - {line_error}");
            }
        }
        LoadError::Validation { source, .. } => {
            for validation_error in source.iter() {
                let _ = writeln!(out, "  - {validation_error}");
            }
        }
        LoadError::Unresolved { source, .. } => {
            for field in &source.0 {
                let _ = writeln!(out, "  - {field}: no value in client, global or default");
            }
        }
    }
    out
}

pub fn print_load_error(err: &LoadError, ctx: &OutputContext) {
    eprint!("{}", format_load_error(err, &ctx.colors));
}

pub fn print_ok(path: &Path, ctx: &OutputContext) {
    if ctx.is_quiet() {
        return;
    }
    println!(
        "{}OK:{} {}",
        ctx.colors.success,
        ctx.colors.reset(),
        path.display()
    );
}

pub fn print_client_ok(id: &str, path: &Path, ctx: &OutputContext) {
    if ctx.is_quiet() {
        return;
    }
    println!(
        "{}OK:{} {} ({})",
        ctx.colors.success,
        ctx.colors.reset(),
        id,
        path.display()
    );
}

pub fn print_warning(message: &str, ctx: &OutputContext) {
    if ctx.is_quiet() {
        return;
    }
    eprintln!(
        "{}Warning:{} {message}",
        ctx.colors.warning,
        ctx.colors.reset()
    );
}

/// Unified diff with three lines of context; empty when equal.
pub fn unified_diff(old_label: &str, new_label: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let groups = diff.grouped_ops(3);
    if groups.is_empty() {
        return String::new();
    }

    let mut out = format!("--- {old_label}\n+++ {new_label}\n");
    for (idx, group) in groups.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }

        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                let _ = write!(out, "{sign}{change}");
            }
        }
    }
    out
}

pub fn print_scan_summary(result: &ScanResult, ctx: &OutputContext) {
    if ctx.is_quiet() {
        return;
    }

    println!();
    let mut parts = vec![format!(
        "{}{} client(s) loaded{}",
        ctx.colors.success,
        result.loaded,
        ctx.colors.reset()
    )];
    if result.failed > 0 {
        parts.push(format!(
            "{}{} failed{}",
            ctx.colors.error,
            result.failed,
            ctx.colors.reset()
        ));
    }
    println!("{}", parts.join(", "));
}
