use std::fmt::Write;
use std::process::ExitCode;

use owo_colors::OwoColorize;

use lockbuild_build_backend::{AppliedGroups, LockedMetadata};
use lockbuild_warnings::warn_user_once;

pub(crate) use build::build;
pub(crate) use frontend::{BuildFrontend, PdmFrontend, PypaFrontend};
pub(crate) use metadata::metadata;

use crate::printer::Printer;

mod build;
mod frontend;
mod metadata;
mod refresh;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ExitStatus {
    /// The command succeeded.
    Success,

    /// The command failed due to an error in the user input.
    Failure,

    /// The command failed with an unexpected error.
    Error,

    /// The command's exit status is propagated from an external command.
    External(u8),
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Failure => Self::from(1),
            ExitStatus::Error => Self::from(2),
            ExitStatus::External(code) => Self::from(code),
        }
    }
}

/// Report the groups that were left out of the metadata.
pub(super) fn report_locked_metadata(
    outcome: &LockedMetadata,
    printer: Printer,
) -> std::fmt::Result {
    if let LockedMetadata::Applied(applied) = outcome {
        report_applied_groups(applied, printer)?;
    }
    Ok(())
}

fn report_applied_groups(applied: &AppliedGroups, printer: Printer) -> std::fmt::Result {
    for group in &applied.not_locked {
        writeln!(
            printer.stderr(),
            "Group `{}` is not stored in the lockfile, skip locking dependencies for it",
            group.cyan()
        )?;
    }
    // The same record is reported once, even if it belongs to several groups.
    for err in &applied.skipped {
        warn_user_once!("Skipping unsupported requirement: {err}");
    }
    Ok(())
}
