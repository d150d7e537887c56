//! Serialization back to ini text

use std::fmt::Write;

use crate::merge::{EffectiveConfig, Origin};
use crate::parser::GUARD_LINE;
use crate::validate::TypedConfig;
use crate::value::Entry;

/// Render a validated layer. Parsing and validating the output against
/// the same schema yields an equal [`TypedConfig`].
pub fn render(config: &TypedConfig) -> String {
    let mut out = String::new();
    out.push_str(GUARD_LINE);
    out.push('\n');

    for (name, entries) in config.sections() {
        push_section(
            &mut out,
            name,
            entries.iter().map(|(key, entry)| (key.as_str(), entry, None)),
        );
    }
    out
}

/// Render an effective configuration. With `annotate`, each value is
/// preceded by a comment naming where it came from.
pub fn render_effective(config: &EffectiveConfig, annotate: bool) -> String {
    let mut out = String::new();
    out.push_str(GUARD_LINE);
    out.push('\n');

    for (name, entries) in config.sections() {
        push_section(
            &mut out,
            name,
            entries.iter().map(|(key, resolved)| {
                let origin = annotate.then_some(resolved.origin);
                (key.as_str(), &resolved.entry, origin)
            }),
        );
    }
    out
}

fn push_section<'a>(
    out: &mut String,
    name: &str,
    entries: impl Iterator<Item = (&'a str, &'a Entry, Option<Origin>)>,
) {
    // Writing into a String cannot fail
    let _ = writeln!(out, "[{name}]");
    for (key, entry, origin) in entries {
        if let Some(origin) = origin {
            let label = match entry {
                Entry::Extension(_) => format!("{} (extension)", origin.as_str()),
                Entry::Known(_) => origin.as_str().to_string(),
            };
            let _ = writeln!(out, "; {label}");
        }
        let _ = writeln!(out, "{key} = \"{entry}\"");
    }
    out.push('\n');
}
