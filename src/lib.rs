//! Diag Patcher: mechanical source edits driven by compiler diagnostics
//!
//! Reads `file:line:column` diagnostics, turns each one into an
//! [`EditDescriptor`], and splices text into the reported file:
//!
//! - **cast**: `x = value` becomes `x = (Type) value` for every
//!   `cannot initialize a variable of type 'Type'` error
//! - **rename**: the identifier at each reported position is replaced
//!
//! # Architecture
//!
//! Diagnostic grammars sit behind [`DiagnosticParser`]. Pipelines are
//! [`EditPlanner`]s that compile a descriptor down to a single [`Edit`], a
//! verified byte-span replacement. [`run_patches`] drives a planner over a
//! batch and stops at the first failure.
//!
//! # Safety
//!
//! - Rename verifies the text under each position before replacing it
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement
//! - Line terminators are preserved byte-for-byte
//!
//! # Example
//!
//! ```no_run
//! use diag_patcher::{
//!     parse_descriptors, run_patches, PatchOptions, PositionParser, Rename, WorkspaceGuard,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let descriptors = parse_descriptors("src/foo.c:3:7\n", &PositionParser)?;
//! let guard = WorkspaceGuard::new(".", Vec::<&str>::new())?;
//! let report = run_patches(
//!     &Rename::new("count", "total"),
//!     &descriptors,
//!     &guard,
//!     PatchOptions::default(),
//! )?;
//! println!("{} edits applied", report.applied());
//! # Ok(())
//! # }
//! ```

pub mod diagnostic;
pub mod edit;
pub mod patch;
pub mod safety;
pub mod text;

// Re-exports
pub use diagnostic::{
    parse_descriptors, read_descriptors, CastDiagnosticParser, DiagnosticError,
    DiagnosticParser, EditDescriptor, PositionParser,
};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use patch::{
    run_patches, AppliedEdit, ApplyMode, CastInsertion, EditPlanner, FileChange, PatchError,
    PatchOptions, Rename, RenameCheck, RunReport,
};
pub use safety::{SafetyError, WorkspaceGuard};
