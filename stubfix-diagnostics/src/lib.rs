//! Parser for mypy output.
//!
//! Turns the checker's text into ordered [`DiagnosticRecord`]s. Any line that is neither a
//! diagnostic nor one of the two known summary lines is an error: a change in the checker's
//! output format must surface, not be skipped.

use std::sync::LazyLock;

use regex::Regex;
use stubfix_types::diagnostic::{Category, DiagnosticRecord, UnrecognizedDiagnostic};
use thiserror::Error;
use tracing::{debug, warn};

static DIAGNOSTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<path>.+?):(?P<line>\d+):(?:(?P<column>\d+):)? (?P<severity>error|note|warning): (?P<message>.*)$",
    )
    .expect("diagnostic pattern")
});

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Found \d+ errors? in \d+ files? \(checked \d+ source files?\)$")
        .expect("summary pattern")
});

static CODE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<message>.*?)\s+\[(?P<code>[a-z][a-z0-9-]*)\]$").expect("code suffix pattern")
});

static NAME_NOT_DEFINED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^Name "(.+)" is not defined"#).expect("name pattern"));

const STATIC_MISMATCH: &str =
    r#"Overload does not consistently use the "@staticmethod" decorator on all function signatures."#;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagnosticError {
    #[error("unexpected checker output at line {index}: {line:?}")]
    MalformedLine { index: usize, line: String },

    #[error("malformed summary at line {index}: {line:?}")]
    MalformedSummary { index: usize, line: String },

    #[error("invalid line number at line {index}: {line:?}")]
    LineNumber { index: usize, line: String },
}

/// Result of one pass over checker output, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiagnostics {
    pub records: Vec<DiagnosticRecord>,
    pub unrecognized: Vec<UnrecognizedDiagnostic>,
}

impl ParsedDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.unrecognized.is_empty()
    }
}

/// Maps a message (code suffix already removed) to its category. The first matching pattern wins.
pub fn categorize(message: &str) -> Option<(Category, Option<String>)> {
    if let Some(caps) = NAME_NOT_DEFINED_RE.captures(message) {
        return Some((Category::NameNotDefined, Some(caps[1].to_string())));
    }
    if message == STATIC_MISMATCH {
        return Some((Category::StaticMismatch, None));
    }
    let override_incompatible = (message.contains("Signature of")
        && message.contains("incompatible with supertype"))
        || message.contains(" is incompatible with supertype ")
        || message.contains(" incompatible with return type ")
        || message.contains("is incompatible with definition in base class");
    if override_incompatible {
        return Some((Category::OverrideIncompatible, None));
    }
    if message.contains("Overloaded function signature")
        && message.contains("will never be matched: signature")
        && message.contains("parameter type(s) are the same or broader")
    {
        return Some((Category::OverloadUnreachable, None));
    }
    if message.starts_with("Unused \"type: ignore") {
        return Some((Category::UnusedIgnore, None));
    }
    None
}

/// Splits a trailing `[code]` off a message.
pub fn split_error_code(message: &str) -> (&str, Option<&str>) {
    match CODE_SUFFIX_RE.captures(message) {
        Some(caps) => match (caps.name("message"), caps.name("code")) {
            (Some(m), Some(c)) => (m.as_str(), Some(c.as_str())),
            _ => (message, None),
        },
        None => (message, None),
    }
}

pub fn parse_diagnostics(output: &str) -> Result<ParsedDiagnostics, DiagnosticError> {
    let mut parsed = ParsedDiagnostics::default();

    for (index, raw) in output.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with("Success:") {
            debug!("checker reported no issues");
            return Ok(ParsedDiagnostics::default());
        }
        if line.starts_with("Found ") && !DIAGNOSTIC_RE.is_match(line) {
            if SUMMARY_RE.is_match(line) {
                continue;
            }
            return Err(DiagnosticError::MalformedSummary {
                index: index + 1,
                line: line.to_string(),
            });
        }

        let Some(caps) = DIAGNOSTIC_RE.captures(line) else {
            return Err(DiagnosticError::MalformedLine {
                index: index + 1,
                line: line.to_string(),
            });
        };
        if &caps["severity"] != "error" {
            continue;
        }

        let line_error = || DiagnosticError::LineNumber {
            index: index + 1,
            line: line.to_string(),
        };
        let source_line: u32 = caps["line"].parse().map_err(|_| line_error())?;
        let column = match caps.name("column") {
            Some(c) => Some(c.as_str().parse::<u32>().map_err(|_| line_error())?),
            None => None,
        };
        let (message, code) = split_error_code(&caps["message"]);

        match categorize(message) {
            Some((category, extracted_name)) => parsed.records.push(DiagnosticRecord {
                line: source_line,
                column,
                category,
                raw_message: message.to_string(),
                extracted_name,
                code: code.map(str::to_string),
            }),
            None => {
                warn!(line = source_line, message = %message, "unrecognized diagnostic");
                parsed.unrecognized.push(UnrecognizedDiagnostic {
                    line: source_line,
                    raw_message: message.to_string(),
                });
            }
        }
    }

    debug!(
        records = parsed.records.len(),
        unrecognized = parsed.unrecognized.len(),
        "parsed checker output"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_suffix_is_split() {
        assert_eq!(
            split_error_code("Name \"QtGui\" is not defined  [name-defined]"),
            ("Name \"QtGui\" is not defined", Some("name-defined"))
        );
        assert_eq!(split_error_code("no code here"), ("no code here", None));
    }

    #[test]
    fn categories_follow_pattern_order() {
        assert_eq!(
            categorize("Name \"QtCore.Qt\" is not defined"),
            Some((Category::NameNotDefined, Some("QtCore.Qt".to_string())))
        );
        assert_eq!(categorize(STATIC_MISMATCH), Some((Category::StaticMismatch, None)));
        assert_eq!(
            categorize(
                "Return type \"int\" of \"x\" incompatible with return type \"str\" in supertype \"A\""
            ),
            Some((Category::OverrideIncompatible, None))
        );
        assert_eq!(categorize("Something else entirely"), None);
    }
}
