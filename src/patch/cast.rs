//! Cast insertion: `x = value` becomes `x = (Type) value`.

use super::{locate_line, EditPlanner, PatchError};
use crate::diagnostic::EditDescriptor;
use crate::edit::Edit;
use std::path::Path;

/// Character that marks where the initializer starts.
pub const CAST_ANCHOR: char = '=';

/// Inserts the diagnostic's type as a parenthesized cast after the first
/// `=` on the reported line, skipping the one character that follows it.
///
/// The reported column is ignored. Running twice inserts two casts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastInsertion;

/// Text inserted for `type_name`.
pub fn cast_text(type_name: &str) -> String {
    format!("({type_name}) ")
}

impl EditPlanner for CastInsertion {
    fn name(&self) -> &'static str {
        "cast"
    }

    fn plan(
        &self,
        file: &Path,
        descriptor: &EditDescriptor,
        content: &str,
    ) -> Result<Edit, PatchError> {
        let type_name = descriptor
            .payload
            .as_deref()
            .ok_or_else(|| PatchError::MissingPayload {
                file: file.to_path_buf(),
                line: descriptor.line,
            })?;

        let span = locate_line(file, content, descriptor.line)?;
        let text = span.content(content);

        let anchor = text
            .find(CAST_ANCHOR)
            .ok_or_else(|| PatchError::AnchorNotFound {
                file: file.to_path_buf(),
                line: descriptor.line,
                anchor: CAST_ANCHOR,
            })?;
        let after_anchor = anchor + CAST_ANCHOR.len_utf8();

        let gap = text[after_anchor..]
            .chars()
            .next()
            .ok_or_else(|| PatchError::AnchorAtLineEnd {
                file: file.to_path_buf(),
                line: descriptor.line,
                anchor: CAST_ANCHOR,
            })?;

        let offset = span.start + after_anchor + gap.len_utf8();
        Ok(Edit::insert(file, offset, cast_text(type_name)))
    }
}
