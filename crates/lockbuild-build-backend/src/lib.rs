use std::path::{Path, PathBuf};

use thiserror::Error;

use lockbuild_lock::LockError;
use lockbuild_resolver::ResolveError;
use lockbuild_static::EnvVars;

pub use hooks::BuildBackend;
pub use metadata::{AppliedGroups, LockedMetadata, apply_locked_metadata, apply_with_lockfile};

mod hooks;
mod metadata;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read lockfile")]
    Lock(#[from] LockError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Expected `{0}` to be a {1} in the project metadata")]
    MalformedMetadata(&'static str, &'static str),
}

/// Returns the path of the lockfile for the project at `root`.
///
/// `PDM_LOCKFILE` overrides the default `pdm.lock`; a relative override is resolved against the
/// project root.
pub fn lockfile_path(root: &Path) -> PathBuf {
    match std::env::var_os(EnvVars::PDM_LOCKFILE) {
        Some(path) if !path.is_empty() => root.join(path),
        _ => root.join("pdm.lock"),
    }
}
