//! Scoped working-directory changes.
//!
//! The process cwd is global mutable state; during a fan-out this guard is
//! its sole owner. Construction chdirs into the repository, `Drop` restores
//! the previous directory on every exit path, including early abandonment
//! of the iterator holding the guard.

use super::EngineError;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct DirGuard {
    previous: PathBuf,
    target: PathBuf,
}

impl DirGuard {
    /// Chdir into `subpath` resolved against `root`.
    ///
    /// Leading slashes are stripped before joining so a misconfigured
    /// absolute repository path cannot override the join and escape the
    /// project root; `..` traversal past the root is rejected the same way.
    pub fn change(root: &Path, subpath: &str) -> Result<Self, EngineError> {
        let relative = subpath.trim_start_matches('/');
        let target = normalize(&root.join(relative));

        if !target.starts_with(root) || !target.is_dir() {
            return Err(EngineError::DirectoryNotFound(target));
        }

        let previous = std::env::current_dir()?;
        std::env::set_current_dir(&target)?;
        debug!("entered {}", target.display());

        Ok(Self { previous, target })
    }

    /// The absolute directory this guard switched into.
    pub fn path(&self) -> &Path {
        &self.target
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        // Restoration is best-effort; the previous directory may have been
        // removed while the guard was held.
        if std::env::set_current_dir(&self.previous).is_ok() {
            debug!("restored {}", self.previous.display());
        }
    }
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
