//! Patch pipelines: turn edit descriptors into file edits and apply them.
//!
//! Each pipeline is an [`EditPlanner`] that maps one descriptor onto one
//! [`Edit`] against the current file content. [`run_patches`] drives a
//! planner over a descriptor list:
//!
//! - [`ApplyMode::Sequential`] re-reads the target before every descriptor,
//!   so each edit sees the ones before it. Column positions on a line that
//!   was already edited must account for the earlier length change.
//! - [`ApplyMode::Batch`] plans every edit of a file against the content as
//!   it was before the run and writes each file once.
//!
//! The first failure aborts the run. Files already written stay written.

pub mod cast;
pub mod rename;

pub use cast::CastInsertion;
pub use rename::{Rename, RenameCheck};

use crate::diagnostic::EditDescriptor;
use crate::edit::{write_file, Edit, EditError, EditResult};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::text::{line_count, line_span, LineSpan};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{file}:{}: line is out of range (file has {line_count} lines)", .line + 1)]
    LineOutOfRange {
        file: PathBuf,
        line: usize,
        line_count: usize,
    },

    #[error(
        "{file}:{}:{}: {width} character(s) from here run past the end of the line ({line_len} characters)",
        .line + 1,
        .column + 1
    )]
    ColumnOutOfRange {
        file: PathBuf,
        line: usize,
        column: usize,
        width: usize,
        line_len: usize,
    },

    #[error("{file}:{}: no '{anchor}' on line", .line + 1)]
    AnchorNotFound {
        file: PathBuf,
        line: usize,
        anchor: char,
    },

    #[error("{file}:{}: nothing follows '{anchor}' on the same line", .line + 1)]
    AnchorAtLineEnd {
        file: PathBuf,
        line: usize,
        anchor: char,
    },

    #[error("{file}:{}:{}: expected {expected:?}, found {found:?}", .line + 1, .column + 1)]
    Mismatch {
        file: PathBuf,
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("{file}:{}: diagnostic carries no replacement text", .line + 1)]
    MissingPayload { file: PathBuf, line: usize },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Maps one descriptor onto one edit of the file content it targets.
pub trait EditPlanner {
    /// Short pipeline name for logs and reports.
    fn name(&self) -> &'static str;

    /// Plan the edit for `descriptor` against `content`, the current text of
    /// `file`.
    fn plan(
        &self,
        file: &Path,
        descriptor: &EditDescriptor,
        content: &str,
    ) -> Result<Edit, PatchError>;
}

/// Look up a 0-based line or fail with [`PatchError::LineOutOfRange`].
pub(crate) fn locate_line(file: &Path, content: &str, line: usize) -> Result<LineSpan, PatchError> {
    line_span(content, line).ok_or_else(|| PatchError::LineOutOfRange {
        file: file.to_path_buf(),
        line,
        line_count: line_count(content),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyMode {
    /// Read, edit, and write the target once per descriptor
    #[default]
    Sequential,
    /// Plan all edits of a file against its pre-run content, write once
    Batch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    pub mode: ApplyMode,
    /// Plan and splice in memory only
    pub dry_run: bool,
}

/// One edit as it was (or would be) applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedEdit {
    pub file: PathBuf,
    /// 1-based, as reported by the diagnostic
    pub line: usize,
    /// 1-based, as reported by the diagnostic
    pub column: usize,
    pub new_text: String,
    pub outcome: EditResult,
}

impl AppliedEdit {
    fn new(file: &Path, descriptor: &EditDescriptor, edit: &Edit, outcome: EditResult) -> Self {
        Self {
            file: file.to_path_buf(),
            line: descriptor.line + 1,
            column: descriptor.column + 1,
            new_text: edit.new_text.clone(),
            outcome,
        }
    }
}

/// Content of a touched file before the run and after its last edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub before: String,
    pub after: String,
}

impl FileChange {
    pub fn is_changed(&self) -> bool {
        self.before != self.after
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[must_use = "RunReport should be reported to the user"]
pub struct RunReport {
    pub pipeline: &'static str,
    pub dry_run: bool,
    /// In descriptor order
    pub edits: Vec<AppliedEdit>,
    #[serde(skip)]
    pub files: BTreeMap<PathBuf, FileChange>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(EditResult::Applied)
    }

    pub fn already_applied(&self) -> usize {
        self.count(EditResult::AlreadyApplied)
    }

    fn count(&self, outcome: EditResult) -> usize {
        self.edits.iter().filter(|e| e.outcome == outcome).count()
    }

    fn record(&mut self, path: &Path, before: &str, after: String) {
        self.files
            .entry(path.to_path_buf())
            .or_insert_with(|| FileChange {
                before: before.to_string(),
                after: String::new(),
            })
            .after = after;
    }
}

fn read_source(path: &Path) -> Result<String, PatchError> {
    fs::read_to_string(path).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply every descriptor with `planner`, in order, stopping at the first
/// error.
pub fn run_patches<P>(
    planner: &P,
    descriptors: &[EditDescriptor],
    guard: &WorkspaceGuard,
    options: PatchOptions,
) -> Result<RunReport, PatchError>
where
    P: EditPlanner + ?Sized,
{
    let mut report = RunReport {
        pipeline: planner.name(),
        dry_run: options.dry_run,
        ..RunReport::default()
    };

    match options.mode {
        ApplyMode::Sequential => run_sequential(planner, descriptors, guard, options, &mut report)?,
        ApplyMode::Batch => run_batch(planner, descriptors, guard, options, &mut report)?,
    }

    tracing::info!(
        pipeline = report.pipeline,
        applied = report.applied(),
        already_applied = report.already_applied(),
        files = report.files.len(),
        dry_run = report.dry_run,
        "run finished"
    );
    Ok(report)
}

fn run_sequential<P>(
    planner: &P,
    descriptors: &[EditDescriptor],
    guard: &WorkspaceGuard,
    options: PatchOptions,
    report: &mut RunReport,
) -> Result<(), PatchError>
where
    P: EditPlanner + ?Sized,
{
    for descriptor in descriptors {
        let path = guard.validate_path(&descriptor.file)?;

        // A dry run has nothing on disk to re-read, so it continues from
        // the in-memory result of the previous edit.
        let content = match report.files.get(&path) {
            Some(change) if options.dry_run => change.after.clone(),
            _ => read_source(&path)?,
        };

        let edit = planner.plan(&path, descriptor, &content)?;
        tracing::debug!(
            file = %path.display(),
            line = descriptor.line + 1,
            byte_start = edit.byte_start,
            byte_end = edit.byte_end,
            new_text = %edit.new_text,
            "planned edit"
        );

        let (outcome, updated) = if options.dry_run {
            edit.apply_to_str(&content)?
        } else {
            edit.commit(&content)?
        };
        if outcome == EditResult::Applied && !options.dry_run {
            tracing::info!(file = %path.display(), line = descriptor.line + 1, "wrote edit");
        }

        report.edits.push(AppliedEdit::new(&path, descriptor, &edit, outcome));
        report.record(&path, &content, updated);
    }
    Ok(())
}

fn run_batch<P>(
    planner: &P,
    descriptors: &[EditDescriptor],
    guard: &WorkspaceGuard,
    options: PatchOptions,
    report: &mut RunReport,
) -> Result<(), PatchError>
where
    P: EditPlanner + ?Sized,
{
    // Group by resolved file, keeping first-seen order
    let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        let path = guard.validate_path(&descriptor.file)?;
        match groups.iter_mut().find(|(p, _)| *p == path) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((path, vec![index])),
        }
    }

    let mut edits: Vec<(usize, AppliedEdit)> = Vec::with_capacity(descriptors.len());

    for (path, indices) in groups {
        let content = read_source(&path)?;

        let planned = indices
            .iter()
            .map(|&i| planner.plan(&path, &descriptors[i], &content))
            .collect::<Result<Vec<_>, _>>()?;

        let (outcomes, updated) = Edit::apply_batch_to_str(&planned, &content)?;

        if !options.dry_run && updated != content {
            write_file(&path, &updated)?;
            tracing::info!(file = %path.display(), edits = planned.len(), "wrote batch");
        }

        for ((&index, edit), outcome) in indices.iter().zip(&planned).zip(outcomes) {
            edits.push((index, AppliedEdit::new(&path, &descriptors[index], edit, outcome)));
        }
        report.record(&path, &content, updated);
    }

    edits.sort_by_key(|(index, _)| *index);
    report.edits = edits.into_iter().map(|(_, edit)| edit).collect();
    Ok(())
}
