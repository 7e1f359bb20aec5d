use std::path::Path;

use anyhow::{Context, Result};
use cargo_util::ProcessBuilder;
use tracing::debug;

use crate::commands::ExitStatus;
use crate::settings::BuildOptions;

/// Builds the distributions of a project.
pub(crate) trait BuildFrontend {
    /// Build the project at `project_dir`, returning the exit status of the build.
    fn build(&self, project_dir: &Path, options: &BuildOptions) -> Result<ExitStatus>;
}

/// Runs `pdm build`.
#[derive(Debug, Default)]
pub(crate) struct PdmFrontend;

impl BuildFrontend for PdmFrontend {
    fn build(&self, project_dir: &Path, options: &BuildOptions) -> Result<ExitStatus> {
        let pdm = which::which("pdm").context("Failed to find `pdm`; is it installed?")?;

        let mut cmd = ProcessBuilder::new(pdm);
        cmd.arg("build").arg("--project").arg(project_dir);
        if let Some(dest) = &options.dest {
            cmd.arg("--dest").arg(dest);
        }
        if options.no_sdist {
            cmd.arg("--no-sdist");
        }
        if options.no_wheel {
            cmd.arg("--no-wheel");
        }
        run(&cmd)
    }
}

/// Runs `python -m build`.
#[derive(Debug, Default)]
pub(crate) struct PypaFrontend;

impl BuildFrontend for PypaFrontend {
    fn build(&self, project_dir: &Path, options: &BuildOptions) -> Result<ExitStatus> {
        let python = which::which("python3")
            .or_else(|_| which::which("python"))
            .context("Failed to find a Python interpreter")?;

        let mut cmd = ProcessBuilder::new(python);
        cmd.arg("-m").arg("build");
        if let Some(dest) = &options.dest {
            cmd.arg("--outdir").arg(dest);
        }
        // `build` builds both distributions unless one of them is requested.
        match (options.no_sdist, options.no_wheel) {
            (true, false) => {
                cmd.arg("--wheel");
            }
            (false, true) => {
                cmd.arg("--sdist");
            }
            _ => {}
        }
        cmd.arg(project_dir);
        run(&cmd)
    }
}

fn run(cmd: &ProcessBuilder) -> Result<ExitStatus> {
    debug!("Running {cmd}");
    let status = cmd
        .build_command()
        .status()
        .with_context(|| format!("Failed to run `{cmd}`"))?;

    if status.success() {
        return Ok(ExitStatus::Success);
    }
    match status.code() {
        Some(code) => {
            debug!("Build exited with code {code}");
            Ok(ExitStatus::External(u8::try_from(code).unwrap_or(1)))
        }
        // Terminated by a signal.
        None => Ok(ExitStatus::Failure),
    }
}
