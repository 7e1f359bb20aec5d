use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use itertools::Itertools;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use lockbuild_build_backend::lockfile_path;
use lockbuild_git::SkipWorktreeGuard;
use lockbuild_lock::Lock;
use lockbuild_normalize::GroupName;
use lockbuild_pep508::Requirement;
use lockbuild_resolver::{LockMode, LockedGroup, OnUnsupported, resolver_for};
use lockbuild_warnings::warn_user;
use lockbuild_workspace::{PyProjectToml, PyProjectTomlMut};

use crate::commands::frontend::BuildFrontend;
use crate::commands::refresh::refresh_lockfile;
use crate::commands::ExitStatus;
use crate::printer::Printer;
use crate::settings::BuildSettings;

/// Build the project, with its locked dependency groups temporarily added to `pyproject.toml`.
#[instrument(skip_all, fields(project = %project_dir.display()))]
pub(crate) fn build(
    project_dir: &Path,
    pyproject: &PyProjectToml,
    settings: &BuildSettings,
    frontend: &dyn BuildFrontend,
    printer: Printer,
) -> Result<ExitStatus> {
    if !settings.locked {
        debug!("Locked dependencies were not requested");
        return frontend.build(project_dir, &settings.options);
    }

    let groups = groups_to_lock(pyproject, settings);
    check_collisions(&groups, &pyproject.all_groups())?;

    if settings.refresh {
        refresh_lockfile(project_dir, &pyproject.all_groups(), printer)?;
    }

    let Some(locked_groups) = resolve_locked_groups(project_dir, pyproject, &groups, printer)?
    else {
        return frontend.build(project_dir, &settings.options);
    };
    if locked_groups.is_empty() {
        debug!("No locked groups to add");
        return frontend.build(project_dir, &settings.options);
    }

    let mut document = PyProjectTomlMut::from_toml(pyproject)?;
    let created = !document.has_optional_dependencies();
    for (group, specifiers) in &locked_groups {
        if !document.add_optional_dependency_group(group, specifiers)? {
            bail!("Group `{group}` already exists in `project.optional-dependencies`");
        }
    }
    if created {
        document.remove_dynamic("optional-dependencies")?;
    }

    writeln!(
        printer.stderr(),
        "Adding locked groups: {}",
        locked_groups
            .iter()
            .map(|(group, _)| group.cyan().to_string())
            .join(", ")
    )?;

    let guard = PyProjectGuard::write(
        project_dir.join("pyproject.toml"),
        pyproject.raw.clone(),
        &document.to_string(),
        settings.scm_version,
    )?;
    let status = frontend.build(project_dir, &settings.options);
    drop(guard);
    status
}

/// The groups to lock: `tool.pdm.build.locked-groups` if set, otherwise every group that isn't
/// development-only.
fn groups_to_lock(pyproject: &PyProjectToml, settings: &BuildSettings) -> Vec<GroupName> {
    if let Some(groups) = &settings.locked_groups {
        return groups.iter().unique().cloned().collect();
    }
    let dev_groups = pyproject.dev_groups();
    pyproject
        .all_groups()
        .into_iter()
        .filter(|group| !dev_groups.contains(&group))
        .collect()
}

/// Reject locked groups that are already declared, whether or not they are selected for locking.
fn check_collisions(groups: &[GroupName], declared: &[GroupName]) -> Result<()> {
    let collisions: Vec<GroupName> = groups
        .iter()
        .map(GroupName::locked)
        .filter(|locked| declared.contains(locked) || groups.contains(locked))
        .unique()
        .collect();
    if !collisions.is_empty() {
        bail!(
            "You already have groups that would be overwritten by the locked groups: {}. Please remove them.",
            collisions
                .iter()
                .map(|group| format!("`{group}`"))
                .join(", ")
        );
    }
    Ok(())
}

/// Compute the locked requirements of every group.
///
/// Returns `None` if the project has no lockfile.
fn resolve_locked_groups(
    project_dir: &Path,
    pyproject: &PyProjectToml,
    groups: &[GroupName],
    printer: Printer,
) -> Result<Option<Vec<(GroupName, Vec<String>)>>> {
    let lockfile = lockfile_path(project_dir);
    let Some(lock) = Lock::read(&lockfile)
        .with_context(|| format!("Failed to read lockfile at: `{}`", lockfile.display()))?
    else {
        warn_user!("The lockfile doesn't exist, skip locking dependencies");
        return Ok(None);
    };

    writeln!(printer.stderr(), "Resolving locked packages from lockfile...")?;

    // The project's own requirements are only needed to walk a lockfile without group
    // membership.
    let mut roots = BTreeMap::new();
    if LockMode::of(&lock) == LockMode::GraphTraversal {
        debug!("The lockfile doesn't record group membership, walking the dependency graph");
        for group in groups {
            let requirements: Vec<Requirement> = pyproject.group_requirements(group)?;
            roots.insert(group.clone(), requirements);
        }
    }

    let resolver = resolver_for(&lock, &roots, OnUnsupported::Error);
    let mut locked_groups = Vec::new();
    for group in groups {
        match resolver.resolve(group)? {
            LockedGroup::NotLocked => {
                writeln!(
                    printer.stderr(),
                    "Group `{}` is not stored in the lockfile, skip locking dependencies for it",
                    group.cyan()
                )?;
            }
            LockedGroup::Resolved(resolved) => {
                if resolved.specifiers.is_empty() {
                    debug!("No locked requirements for group `{group}`");
                } else {
                    locked_groups.push((group.locked(), resolved.specifiers));
                }
            }
        }
    }
    Ok(Some(locked_groups))
}

/// Holds the original content of `pyproject.toml` while the patched file is on disk, and
/// restores it when dropped.
#[derive(Debug)]
struct PyProjectGuard {
    path: PathBuf,
    original: String,
    /// Released after the content is restored.
    skip_worktree: Option<SkipWorktreeGuard>,
}

impl PyProjectGuard {
    fn write(
        path: PathBuf,
        original: String,
        patched: &str,
        hide_from_git: bool,
    ) -> Result<Self> {
        let mut guard = Self {
            path,
            original,
            skip_worktree: None,
        };
        fs_err::write(&guard.path, patched)?;
        if hide_from_git {
            guard.skip_worktree = Some(SkipWorktreeGuard::new(&guard.path));
        }
        Ok(guard)
    }
}

impl Drop for PyProjectGuard {
    fn drop(&mut self) {
        match fs_err::write(&self.path, &self.original) {
            Ok(()) => debug!("Restored `{}`", self.path.display()),
            Err(err) => warn_user!("Failed to restore `{}`: {err}", self.path.display()),
        }
    }
}
