//! Diagnostic reader: turns compiler output lines into edit descriptors.
//!
//! Every grammar lives behind [`DiagnosticParser`] so a change in compiler
//! output format shows up at exactly one boundary. Reading is strict: a line
//! that does not match the active pattern fails the whole read instead of
//! being skipped.

use regex::{Captures, Regex};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// A planned edit extracted from one diagnostic line.
///
/// `line` and `column` are 0-based; diagnostics report them 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDescriptor {
    /// File path exactly as the diagnostic reported it
    pub file: PathBuf,
    /// 0-based line index
    pub line: usize,
    /// 0-based column (characters)
    pub column: usize,
    /// Per-diagnostic replacement text, when the diagnostic carries one
    pub payload: Option<String>,
}

#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("diagnostic line {line_number} does not match the {pattern} pattern: {text:?}")]
    Unmatched {
        line_number: usize,
        pattern: &'static str,
        text: String,
    },

    #[error("diagnostic line {line_number}: {field} must be 1-based, found 0")]
    ZeroPosition {
        line_number: usize,
        field: &'static str,
    },

    #[error("diagnostic line {line_number}: {field} {value:?} is not a valid number")]
    InvalidNumber {
        line_number: usize,
        field: &'static str,
        value: String,
    },

    #[error("Failed to read diagnostics: {0}")]
    Io(#[from] std::io::Error),
}

/// A diagnostic grammar.
pub trait DiagnosticParser {
    /// Short name used in error messages.
    fn pattern_name(&self) -> &'static str;

    /// Parse one diagnostic line. `line_number` is the 1-based position of
    /// `text` in the diagnostic stream and is only used for error reporting.
    fn parse_line(&self, text: &str, line_number: usize) -> Result<EditDescriptor, DiagnosticError>;
}

/// Matches `<path>:<line>:<col>: ... cannot initialize a variable of type '<type>'`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastDiagnosticParser;

/// Matches `<path>:<line>:<col>` at the start of the line; the message is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionParser;

fn cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^([\w._\-/]+):(\d+):(\d+):.+cannot initialize a variable of type '(.+?)'",
        )
        .expect("Invalid cast diagnostic regex pattern")
    })
}

fn position_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([\w._\-/]+):(\d+):(\d+)").expect("Invalid position regex pattern")
    })
}

impl DiagnosticParser for CastDiagnosticParser {
    fn pattern_name(&self) -> &'static str {
        "cast"
    }

    fn parse_line(&self, text: &str, line_number: usize) -> Result<EditDescriptor, DiagnosticError> {
        let caps = cast_re()
            .captures(text)
            .ok_or_else(|| DiagnosticError::Unmatched {
                line_number,
                pattern: self.pattern_name(),
                text: text.to_string(),
            })?;
        let mut descriptor = descriptor_from(&caps, line_number)?;
        descriptor.payload = Some(caps[4].to_string());
        Ok(descriptor)
    }
}

impl DiagnosticParser for PositionParser {
    fn pattern_name(&self) -> &'static str {
        "position"
    }

    fn parse_line(&self, text: &str, line_number: usize) -> Result<EditDescriptor, DiagnosticError> {
        let caps = position_re()
            .captures(text)
            .ok_or_else(|| DiagnosticError::Unmatched {
                line_number,
                pattern: self.pattern_name(),
                text: text.to_string(),
            })?;
        descriptor_from(&caps, line_number)
    }
}

/// Build a payload-less descriptor from the shared path/line/column groups.
fn descriptor_from(caps: &Captures<'_>, line_number: usize) -> Result<EditDescriptor, DiagnosticError> {
    Ok(EditDescriptor {
        file: PathBuf::from(&caps[1]),
        line: zero_based(&caps[2], "line", line_number)?,
        column: zero_based(&caps[3], "column", line_number)?,
        payload: None,
    })
}

fn zero_based(value: &str, field: &'static str, line_number: usize) -> Result<usize, DiagnosticError> {
    let number: usize = value.parse().map_err(|_| DiagnosticError::InvalidNumber {
        line_number,
        field,
        value: value.to_string(),
    })?;
    number
        .checked_sub(1)
        .ok_or(DiagnosticError::ZeroPosition { line_number, field })
}

/// Read every line of `reader` as a diagnostic, preserving order.
///
/// Fails on the first line the parser rejects.
pub fn read_descriptors<R, P>(reader: R, parser: &P) -> Result<Vec<EditDescriptor>, DiagnosticError>
where
    R: BufRead,
    P: DiagnosticParser + ?Sized,
{
    let mut descriptors = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        descriptors.push(parser.parse_line(&line, index + 1)?);
    }
    tracing::debug!(
        pattern = parser.pattern_name(),
        count = descriptors.len(),
        "parsed diagnostics"
    );
    Ok(descriptors)
}

/// Convenience wrapper over [`read_descriptors`] for in-memory text.
pub fn parse_descriptors<P>(text: &str, parser: &P) -> Result<Vec<EditDescriptor>, DiagnosticError>
where
    P: DiagnosticParser + ?Sized,
{
    read_descriptors(text.as_bytes(), parser)
}
