use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves diagnostic paths and keeps edits inside the target workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Canonical paths of directories that must never be edited
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in excluded directory: {path} (excluded: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Cannot resolve {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root`.
    ///
    /// The root is canonicalized to handle symlinks. `excluded` entries are
    /// resolved against the root when relative; entries that do not exist
    /// are ignored. The workspace's `.git` directory is always excluded.
    pub fn new<I, P>(workspace_root: impl AsRef<Path>, excluded: I) -> Result<Self, SafetyError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let forbidden_paths = std::iter::once(PathBuf::from(".git"))
            .chain(excluded.into_iter().map(|p| p.as_ref().to_path_buf()))
            .filter_map(|p| workspace_root.join(p).canonicalize().ok())
            .collect();

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// Relative paths are resolved against the workspace root, the way a
    /// compiler run from that directory reports them. Returns the
    /// canonicalized absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        // Canonicalize to resolve symlinks and .. components
        let canonical = canonicalize(&absolute)?;

        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical,
                workspace: self.workspace_root.clone(),
            });
        }

        if let Some(forbidden) = self
            .forbidden_paths
            .iter()
            .find(|forbidden| canonical.starts_with(forbidden))
        {
            return Err(SafetyError::ForbiddenPath {
                path: canonical,
                forbidden: forbidden.clone(),
            });
        }

        Ok(canonical)
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}
