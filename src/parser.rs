//! Parser for sectioned `key = "value"` ini text.
//!
//! Grammar, one construct per line:
//! - an optional execution guard on the first line (`; <?php exit; ?>`)
//! - `;` comments and blank lines
//! - `[section]` headers, names matching `[A-Za-z0-9_]+`
//! - `key = "value"` assignments; the value is everything between the
//!   first and the last double quote
//!
//! Every offending line is collected before the parse fails.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Guard line written at the top of rendered files.
pub const GUARD_LINE: &str = "; <?php exit; ?>";

struct Patterns {
    guard: Regex,
    header: Regex,
    section_name: Regex,
    key_name: Regex,
    assignment: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        guard: Regex::new(r"^;?\s*<\?php\s+exit\s*;?\s*\?>$").unwrap(),
        header: Regex::new(r"^\[(.*)\]$").unwrap(),
        section_name: Regex::new(r"^[A-Za-z0-9_]+$").unwrap(),
        key_name: Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap(),
        assignment: Regex::new(r#"^([A-Za-z0-9_.\-]+)\s*=\s*"(.*)"$"#).unwrap(),
    })
}

pub(crate) fn is_section_name(name: &str) -> bool {
    patterns().section_name.is_match(name)
}

pub(crate) fn is_key_name(name: &str) -> bool {
    patterns().key_name.is_match(name)
}

/// A named group of key/value pairs in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Last assignment wins but keeps the slot of the first one.
    fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }
}

/// Untyped result of parsing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    sections: Vec<Section>,
}

impl RawDocument {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineErrorKind {
    /// Line is neither comment, header, assignment nor blank
    MalformedLine { content: String },
    /// Assignment before the first section header
    OrphanKey { key: String },
    InvalidSectionName { name: String },
    DuplicateSection { name: String },
}

impl fmt::Display for LineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineErrorKind::MalformedLine { content } => write!(f, "malformed line {content:?}"),
            LineErrorKind::OrphanKey { key } => {
                write!(f, "key {key:?} appears before any section header")
            }
            LineErrorKind::InvalidSectionName { name } => {
                write!(f, "invalid section name {name:?}")
            }
            LineErrorKind::DuplicateSection { name } => {
                write!(f, "section [{name}] is declared more than once")
            }
        }
    }
}

/// A single offending line, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct LineError {
    pub line: usize,
    pub kind: LineErrorKind,
}

/// All offending lines of a document, in line order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} invalid line(s), first at {}", .errors.len(), first_line(.errors))]
pub struct ParseError {
    pub errors: Vec<LineError>,
}

fn first_line(errors: &[LineError]) -> String {
    errors
        .first()
        .map_or_else(|| "?".to_string(), |e| format!("line {}", e.line))
}

#[derive(Clone, Copy)]
enum State {
    BeforeFirstSection,
    InSection(usize),
    // After a rejected header: assignments are checked but dropped
    Discarding,
}

/// Parse ini text into a [`RawDocument`].
pub fn parse(text: &str) -> Result<RawDocument, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let p = patterns();

    let mut sections: Vec<Section> = Vec::new();
    let mut errors = Vec::new();
    let mut state = State::BeforeFirstSection;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();

        if idx == 0 && p.guard.is_match(line) {
            continue;
        }

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(caps) = p.header.captures(line) {
            let name = &caps[1];
            if !is_section_name(name) {
                errors.push(LineError {
                    line: line_no,
                    kind: LineErrorKind::InvalidSectionName {
                        name: name.to_string(),
                    },
                });
                state = State::Discarding;
            } else if sections.iter().any(|s| s.name == name) {
                errors.push(LineError {
                    line: line_no,
                    kind: LineErrorKind::DuplicateSection {
                        name: name.to_string(),
                    },
                });
                state = State::Discarding;
            } else {
                sections.push(Section::new(name));
                state = State::InSection(sections.len() - 1);
            }
            continue;
        }

        if let Some(caps) = p.assignment.captures(line) {
            let (key, value) = (&caps[1], &caps[2]);
            match state {
                State::BeforeFirstSection => errors.push(LineError {
                    line: line_no,
                    kind: LineErrorKind::OrphanKey {
                        key: key.to_string(),
                    },
                }),
                State::InSection(i) => sections[i].set(key, value),
                State::Discarding => {}
            }
            continue;
        }

        errors.push(LineError {
            line: line_no,
            kind: LineErrorKind::MalformedLine {
                content: line.to_string(),
            },
        });
    }

    if errors.is_empty() {
        Ok(RawDocument { sections })
    } else {
        Err(ParseError { errors })
    }
}
