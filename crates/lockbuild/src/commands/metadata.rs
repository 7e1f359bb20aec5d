use std::fmt::Write;
use std::path::Path;

use anyhow::{Result, bail};
use tracing::debug;

use lockbuild_build_backend::BuildBackend;
use lockbuild_cli::MetadataFormat;
use lockbuild_workspace::PyProjectToml;

use crate::commands::{ExitStatus, report_locked_metadata};
use crate::printer::Printer;

/// Print the `[project]` table as the metadata hook of `backend` would leave it.
pub(crate) fn metadata(
    project_dir: &Path,
    pyproject: &PyProjectToml,
    backend: BuildBackend,
    format: MetadataFormat,
    printer: Printer,
) -> Result<ExitStatus> {
    let mut document: toml::Table = toml::from_str(&pyproject.raw)?;
    let Some(toml::Value::Table(mut project)) = document.remove("project") else {
        bail!("No `[project]` table found in `pyproject.toml`");
    };

    if backend.is_enabled(pyproject.build_locked().unwrap_or(false)) {
        let outcome = backend.update_metadata(&mut project, project_dir)?;
        report_locked_metadata(&outcome, printer)?;
    } else {
        debug!("Locked dependencies are not enabled for {backend}");
    }

    match format {
        MetadataFormat::Toml => {
            write!(printer.stdout_important(), "{}", toml::to_string(&project)?)?;
        }
        MetadataFormat::Json => {
            writeln!(
                printer.stdout_important(),
                "{}",
                serde_json::to_string_pretty(&project)?
            )?;
        }
    }

    Ok(ExitStatus::Success)
}
