//! Identifier rename at reported positions.

use super::{locate_line, EditPlanner, PatchError};
use crate::diagnostic::EditDescriptor;
use crate::edit::{Edit, EditVerification};
use crate::text::char_to_byte;
use std::path::Path;

/// Whether the text under a reported position is checked before renaming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameCheck {
    /// The span must read exactly `old_name`
    #[default]
    Verify,
    /// Trust the position and overwrite `old_name.len()` characters blindly
    Unchecked,
}

/// Replaces `old_name` with `new_name` at every reported position.
///
/// The span starts at the reported column and is as many characters wide
/// as `old_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    old_name: String,
    new_name: String,
    check: RenameCheck,
}

impl Rename {
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::with_check(old_name, new_name, RenameCheck::Verify)
    }

    /// Rename without checking the span content.
    pub fn unchecked(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::with_check(old_name, new_name, RenameCheck::Unchecked)
    }

    pub fn with_check(
        old_name: impl Into<String>,
        new_name: impl Into<String>,
        check: RenameCheck,
    ) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            check,
        }
    }
}

impl EditPlanner for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn plan(
        &self,
        file: &Path,
        descriptor: &EditDescriptor,
        content: &str,
    ) -> Result<Edit, PatchError> {
        let span = locate_line(file, content, descriptor.line)?;
        let text = span.content(content);
        let width = self.old_name.chars().count();

        let out_of_range = || PatchError::ColumnOutOfRange {
            file: file.to_path_buf(),
            line: descriptor.line,
            column: descriptor.column,
            width,
            line_len: text.chars().count(),
        };
        let start = char_to_byte(text, descriptor.column).ok_or_else(out_of_range)?;
        let end = descriptor
            .column
            .checked_add(width)
            .and_then(|column| char_to_byte(text, column))
            .ok_or_else(out_of_range)?;

        let found = &text[start..end];
        let verification = match self.check {
            RenameCheck::Verify => {
                if found != self.old_name {
                    return Err(PatchError::Mismatch {
                        file: file.to_path_buf(),
                        line: descriptor.line,
                        column: descriptor.column,
                        expected: self.old_name.clone(),
                        found: found.to_string(),
                    });
                }
                EditVerification::ExactMatch(self.old_name.clone())
            }
            RenameCheck::Unchecked => EditVerification::Unchecked,
        };

        Ok(Edit::with_verification(
            file,
            span.start + start,
            span.start + end,
            self.new_name.clone(),
            verification,
        ))
    }
}
