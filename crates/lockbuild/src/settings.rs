use std::path::PathBuf;

use lockbuild_cli::{BuildArgs, BuildFrontendChoice, flag};
use lockbuild_normalize::GroupName;
use lockbuild_static::{EnvVars, read_boolish};
use lockbuild_workspace::PyProjectToml;

/// The resolved settings to use for a `build` invocation.
#[derive(Debug, Clone)]
pub(crate) struct BuildSettings {
    /// Whether to add the locked groups to the distribution metadata.
    pub(crate) locked: bool,
    /// The groups to lock, if restricted by `tool.pdm.build.locked-groups`.
    pub(crate) locked_groups: Option<Vec<GroupName>>,
    /// Whether the version is derived from the SCM, so that the rewritten `pyproject.toml` has
    /// to be hidden from Git.
    pub(crate) scm_version: bool,
    /// Whether to update an outdated lockfile first.
    pub(crate) refresh: bool,
    pub(crate) frontend: BuildFrontendChoice,
    pub(crate) options: BuildOptions,
}

/// The options forwarded to the build frontend.
#[derive(Debug, Clone, Default)]
pub(crate) struct BuildOptions {
    pub(crate) dest: Option<PathBuf>,
    pub(crate) no_sdist: bool,
    pub(crate) no_wheel: bool,
}

impl BuildSettings {
    /// Resolve the [`BuildSettings`] from the CLI, the environment and `pyproject.toml`, in
    /// that order of precedence.
    pub(crate) fn resolve(args: BuildArgs, pyproject: &PyProjectToml) -> Self {
        let BuildArgs {
            locked,
            no_locked,
            dest,
            no_sdist,
            no_wheel,
            frontend,
            no_refresh,
        } = args;

        let locked = flag(locked, no_locked, "locked")
            .or_else(|| read_boolish(EnvVars::PDM_BUILD_LOCKED))
            .or_else(|| pyproject.build_locked())
            .unwrap_or(false);

        Self {
            locked,
            locked_groups: pyproject.locked_groups().map(<[GroupName]>::to_vec),
            scm_version: pyproject.uses_scm_version(),
            refresh: !no_refresh,
            frontend,
            options: BuildOptions {
                dest,
                no_sdist,
                no_wheel,
            },
        }
    }
}
