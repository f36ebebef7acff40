use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Cast insertion and rename both compile down to this single primitive.
/// Intelligence lives in locating the span, not in applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Path to the file to edit (resolved against the workspace)
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// Accept whatever the span holds
    Unchecked,
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Unchecked => true,
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at {file}:{byte_start}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("Overlapping edits in {file}: [{byte_start}, {byte_end})")]
    Overlap {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Edit splits a UTF-8 character at [{byte_start}, {byte_end})")]
    InvalidUtf8Edit { byte_start: usize, byte_end: usize },
}

/// Result of applying an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    /// Edit was successfully applied
    Applied,
    /// Span already held the new text; nothing changed
    AlreadyApplied,
}

impl Edit {
    /// Create a new edit that expects `expected_before` at the span.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl Into<String>,
    ) -> Self {
        Self::with_verification(
            file,
            byte_start,
            byte_end,
            new_text,
            EditVerification::ExactMatch(expected_before.into()),
        )
    }

    /// Create a zero-width insertion at `byte_offset`.
    pub fn insert(file: impl Into<PathBuf>, byte_offset: usize, text: impl Into<String>) -> Self {
        Self::new(file, byte_offset, byte_offset, text, "")
    }

    /// Create an edit with explicit verification strategy.
    pub fn with_verification(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        verification: EditVerification,
    ) -> Self {
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: verification,
        }
    }

    fn same_replacement(&self, other: &Edit) -> bool {
        self.byte_start == other.byte_start
            && self.byte_end == other.byte_end
            && self.new_text == other.new_text
    }

    fn is_insertion(&self) -> bool {
        self.byte_start == self.byte_end
    }

    /// Validate the edit against the given content.
    ///
    /// Returns the current text at [byte_start, byte_end) if validation succeeds.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        let current_text = content
            .get(self.byte_start..self.byte_end)
            .ok_or(EditError::InvalidUtf8Edit {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
            })?;

        // Insertions always apply; a replacement whose span already holds
        // the new text is reported as already applied.
        if !self.is_insertion() && current_text == self.new_text {
            return Ok(current_text);
        }

        if !self.expected_before.matches(current_text) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current_text.to_string(),
            });
        }

        Ok(current_text)
    }

    /// Apply this edit to `content` in memory.
    pub fn apply_to_str(&self, content: &str) -> Result<(EditResult, String), EditError> {
        let current_text = self.validate(content)?;
        if !self.is_insertion() && current_text == self.new_text {
            return Ok((EditResult::AlreadyApplied, content.to_string()));
        }

        let mut new_content = String::with_capacity(
            content.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        new_content.push_str(&content[..self.byte_start]);
        new_content.push_str(&self.new_text);
        new_content.push_str(&content[self.byte_end..]);

        Ok((EditResult::Applied, new_content))
    }

    /// Apply this edit to `original` (the file content as last read) and
    /// persist the result atomically.
    ///
    /// Returns the new file content alongside the outcome.
    pub fn commit(&self, original: &str) -> Result<(EditResult, String), EditError> {
        let (result, new_content) = self.apply_to_str(original)?;
        if result == EditResult::Applied {
            write_file(&self.file, &new_content)?;
        }
        Ok((result, new_content))
    }

    /// Read the file, apply this edit, and write it back atomically.
    pub fn apply(&self) -> Result<EditResult, EditError> {
        let original = fs::read_to_string(&self.file)?;
        self.commit(&original).map(|(result, _)| result)
    }

    /// Apply several edits to the same content in a single pass.
    ///
    /// Spans are resolved against `content` as given. Edits are applied
    /// bottom-to-top so earlier offsets stay valid; results are returned in
    /// the order the edits were passed in.
    ///
    /// A replacement that repeats an earlier one (same span, same text) is
    /// folded into it and reported as [`EditResult::AlreadyApplied`].
    /// Repeated insertions are not folded: each one inserts its text.
    pub fn apply_batch_to_str(
        edits: &[Edit],
        content: &str,
    ) -> Result<(Vec<EditResult>, String), EditError> {
        for edit in edits {
            edit.validate(content)?;
        }

        let mut order: Vec<usize> = Vec::with_capacity(edits.len());
        for (index, edit) in edits.iter().enumerate() {
            let repeated = !edit.is_insertion()
                && order.iter().any(|&kept| edit.same_replacement(&edits[kept]));
            if repeated {
                tracing::debug!(
                    file = %edit.file.display(),
                    byte_start = edit.byte_start,
                    "folding repeated replacement"
                );
            } else {
                order.push(index);
            }
        }

        // Descending by start. Insertions at the same offset go in input
        // order, each landing in front of the previous one, which matches
        // applying them one at a time.
        order.sort_by(|&a, &b| edits[b].byte_start.cmp(&edits[a].byte_start).then(a.cmp(&b)));

        // For non-overlapping regions: earlier edit's end <= later edit's start
        for window in order.windows(2) {
            let (later, earlier) = (&edits[window[0]], &edits[window[1]]);
            if earlier.byte_end > later.byte_start
                || (earlier.byte_start == later.byte_start
                    && !(earlier.is_insertion() && later.is_insertion()))
            {
                return Err(EditError::Overlap {
                    file: later.file.clone(),
                    byte_start: earlier.byte_start,
                    byte_end: later.byte_end.max(earlier.byte_end),
                });
            }
        }

        let mut new_content = content.to_string();
        let mut results = vec![EditResult::AlreadyApplied; edits.len()];

        for index in order {
            let edit = &edits[index];
            let current_text = &new_content[edit.byte_start..edit.byte_end];

            if !edit.is_insertion() && current_text == edit.new_text {
                continue;
            }

            new_content.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
            results[index] = EditResult::Applied;
        }

        Ok((results, new_content))
    }
}

/// Write `content` to `path` atomically and bump its mtime so incremental
/// builds pick up the change.
pub fn write_file(path: &Path, content: &str) -> Result<(), EditError> {
    atomic_write(path, content.as_bytes())?;
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;
    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the original permissions; NamedTempFile creates files as 0600
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
