//! End-to-end library tests: diagnostics text in, patched files out.

mod cast_pipeline;
mod rename_pipeline;

use diag_patcher::WorkspaceGuard;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a workspace holding the given files (parent directories included).
pub fn setup_workspace(files: &[(&str, &str)]) -> (TempDir, WorkspaceGuard) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let guard = WorkspaceGuard::new(dir.path(), Vec::<PathBuf>::new()).unwrap();
    (dir, guard)
}

pub fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name)).unwrap()
}
