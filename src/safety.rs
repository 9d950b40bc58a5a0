use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names below the root that are never rewritten.
const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".git"];

/// Write boundary for in-place rewriting: files must resolve inside the
/// project root and outside installed packages and VCS metadata.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical project root
    workspace_root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
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
    /// The root is canonicalized so symlinked roots compare correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            workspace_root: canonicalize(workspace_root.as_ref())?,
        })
    }

    /// Check that `path` may be rewritten, returning its canonical form.
    /// Relative paths are resolved against the root.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        // Resolves symlinks and `..`
        let canonical = canonicalize(&absolute)?;

        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.clone(),
                workspace: self.workspace_root.clone(),
            });
        };

        let mut forbidden = self.workspace_root.clone();
        for component in relative.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            forbidden.push(name);
            if FORBIDDEN_DIRS.iter().any(|dir| name == std::ffi::OsStr::new(dir)) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.clone(),
                    forbidden,
                });
            }
        }

        Ok(canonical)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}
