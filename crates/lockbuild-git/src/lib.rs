//! Mark a file as `skip-worktree` in the Git index.
//!
//! Projects that derive their version from the SCM would otherwise report a dirty working tree
//! (and a local version suffix) while `pyproject.toml` carries the locked groups.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use cargo_util::ProcessBuilder;
use tracing::{debug, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Git executable not found. Ensure that Git is installed and available.")]
    GitNotFound,
    #[error(transparent)]
    Other(#[from] which::Error),
    #[error("Failed to update the Git index for `{}`", path.display())]
    UpdateIndex {
        path: PathBuf,
        #[source]
        err: anyhow::Error,
    },
}

/// A global cache of the result of `which git`.
pub static GIT: LazyLock<Result<PathBuf, GitError>> = LazyLock::new(|| {
    which::which("git").map_err(|err| match err {
        which::Error::CannotFindBinaryPath => GitError::GitNotFound,
        err => GitError::Other(err),
    })
});

/// Set or clear the `skip-worktree` bit of `path` in the index of the repository containing it.
#[instrument(skip_all, fields(path = %path.display(), skip_worktree = skip))]
pub fn update_skip_worktree(path: &Path, skip: bool) -> Result<(), GitError> {
    let Ok(git) = GIT.as_ref() else {
        return Err(GitError::GitNotFound);
    };

    let mut cmd = ProcessBuilder::new(git);
    cmd.arg("update-index")
        .arg(if skip {
            "--skip-worktree"
        } else {
            "--no-skip-worktree"
        })
        .arg(path);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        cmd.cwd(parent);
    }
    debug!("Running {cmd}");

    cmd.exec_with_output()
        .map(|_| ())
        .map_err(|err| GitError::UpdateIndex {
            path: path.to_path_buf(),
            err,
        })
}

/// Marks a file as `skip-worktree` for as long as the guard is alive.
///
/// Failures are not fatal: a missing `git` or a file outside a repository only means the build
/// may see a dirty working tree.
#[derive(Debug)]
pub struct SkipWorktreeGuard {
    path: PathBuf,
    active: bool,
}

impl SkipWorktreeGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let active = match update_skip_worktree(&path, true) {
            Ok(()) => true,
            Err(GitError::GitNotFound) => {
                debug!("Git not found, not hiding `{}` from Git", path.display());
                false
            }
            Err(err) => {
                debug!("{err}");
                false
            }
        };
        Self { path, active }
    }

    /// Returns `true` if the `skip-worktree` bit was set.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for SkipWorktreeGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = update_skip_worktree(&self.path, false) {
            warn!("Failed to restore the Git index for `{}`: {err}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use cargo_util::ProcessBuilder;

    use super::{GIT, SkipWorktreeGuard};

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = ProcessBuilder::new(GIT.as_ref().unwrap())
            .args(args)
            .cwd(dir)
            .exec_with_output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn guard_toggles_skip_worktree() {
        if GIT.is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "--quiet"]);
        let pyproject = dir.path().join("pyproject.toml");
        fs_err::write(&pyproject, "[project]\nname = \"project\"\n").unwrap();
        git(dir.path(), &["add", "pyproject.toml"]);

        {
            let guard = SkipWorktreeGuard::new(&pyproject);
            assert!(guard.is_active());
            assert_eq!(git(dir.path(), &["ls-files", "-v"]), "S pyproject.toml\n");
        }
        assert_eq!(git(dir.path(), &["ls-files", "-v"]), "H pyproject.toml\n");
    }

    #[test]
    fn outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let pyproject = dir.path().join("pyproject.toml");
        fs_err::write(&pyproject, "").unwrap();

        let guard = SkipWorktreeGuard::new(&pyproject);
        assert!(!guard.is_active());
    }
}
