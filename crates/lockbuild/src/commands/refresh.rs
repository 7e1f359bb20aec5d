use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cargo_util::ProcessBuilder;
use tracing::{debug, instrument};

use lockbuild_normalize::GroupName;

use crate::printer::Printer;

/// Update the lockfile of the project at `project_dir` if `pdm` reports it as outdated.
///
/// Without `pdm` on the `PATH`, the lockfile is used as is.
#[instrument(skip_all)]
pub(super) fn refresh_lockfile(
    project_dir: &Path,
    groups: &[GroupName],
    printer: Printer,
) -> Result<()> {
    let Ok(pdm) = which::which("pdm") else {
        debug!("`pdm` not found, not checking whether the lockfile is up to date");
        return Ok(());
    };

    let mut check = ProcessBuilder::new(&pdm);
    check.arg("lock").arg("--check").arg("--project").arg(project_dir);
    debug!("Running {check}");
    let output = check
        .build_command()
        .output()
        .with_context(|| format!("Failed to run `{check}`"))?;
    if output.status.success() {
        debug!("The lockfile is up to date");
        return Ok(());
    }

    writeln!(printer.stderr(), "The lockfile is outdated, updating it")?;

    let mut lock = ProcessBuilder::new(&pdm);
    lock.arg("lock").arg("--project").arg(project_dir);
    // `default` is always locked.
    for group in groups.iter().filter(|group| !group.is_default()) {
        // The `dev` group is development-only and never part of the distribution.
        if group.as_str() == "dev" {
            continue;
        }
        lock.arg("--group").arg(group.as_str());
    }
    debug!("Running {lock}");
    let status = lock
        .build_command()
        .status()
        .with_context(|| format!("Failed to run `{lock}`"))?;
    if !status.success() {
        bail!("Failed to update the lockfile (`{lock}` exited with {status})");
    }
    Ok(())
}
