//! Line table helpers for mapping diagnostic positions onto file contents.
//!
//! Lines are split the way `readlines` splits them: every line keeps its
//! terminator, and a trailing terminator does not open an extra empty line.
//! Columns count characters, not bytes.

/// Byte span of one line inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// First byte of the line
    pub start: usize,
    /// End of the line content, before any `\n` or `\r\n`
    pub content_end: usize,
}

impl LineSpan {
    /// The line text without its terminator.
    pub fn content<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.content_end]
    }
}

/// Number of lines in `source`.
pub fn line_count(source: &str) -> usize {
    source.split_inclusive('\n').count()
}

/// Locate the 0-based `line` in `source`.
pub fn line_span(source: &str, line: usize) -> Option<LineSpan> {
    let mut start = 0;
    for (index, raw) in source.split_inclusive('\n').enumerate() {
        let end = start + raw.len();
        if index == line {
            let content = raw
                .strip_suffix('\n')
                .map(|s| s.strip_suffix('\r').unwrap_or(s))
                .unwrap_or(raw);
            return Some(LineSpan {
                start,
                content_end: start + content.len(),
            });
        }
        start = end;
    }
    None
}

/// Byte offset of the character at `column` within `text`.
///
/// `column` may equal the character count, which addresses the end of the text.
pub fn char_to_byte(text: &str, column: usize) -> Option<usize> {
    let mut count = 0;
    for (byte, _) in text.char_indices() {
        if count == column {
            return Some(byte);
        }
        count += 1;
    }
    (count == column).then_some(text.len())
}
