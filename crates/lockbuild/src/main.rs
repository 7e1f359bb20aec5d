use std::path::PathBuf;
use std::process::ExitCode;

use anstream::eprint;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use lockbuild_build_backend::BuildBackend;
use lockbuild_cli::{BackendChoice, BuildFrontendChoice, Cli, Commands};
use lockbuild_warnings::write_error_chain;
use lockbuild_workspace::PyProjectToml;

use crate::commands::{BuildFrontend, ExitStatus, PdmFrontend, PypaFrontend};
use crate::printer::Printer;
use crate::settings::BuildSettings;

mod commands;
mod logging;
mod printer;
mod settings;

fn run(cli: Cli) -> Result<ExitStatus> {
    let Cli {
        command,
        global_args,
    } = cli;

    // Configure the `warn_user!` macros, which control user-facing warnings in the CLI.
    if global_args.quiet {
        lockbuild_warnings::disable();
    } else {
        lockbuild_warnings::enable();
    }

    anstream::ColorChoice::write_global(global_args.color.into());

    logging::setup_logging(logging::Level::from(global_args.verbose))?;

    let printer = Printer::new(global_args.quiet, global_args.verbose);

    let project_dir = match global_args.project {
        Some(project_dir) => project_dir,
        None => std::env::current_dir()?,
    };
    let pyproject = read_pyproject(project_dir.join("pyproject.toml"))?;
    debug!("Using project at: `{}`", project_dir.display());

    match command {
        Commands::Build(args) => {
            let settings = BuildSettings::resolve(args, &pyproject);
            let frontend: Box<dyn BuildFrontend> = match settings.frontend {
                BuildFrontendChoice::Pdm => Box::new(PdmFrontend),
                BuildFrontendChoice::Pypa => Box::new(PypaFrontend),
            };
            commands::build(
                &project_dir,
                &pyproject,
                &settings,
                frontend.as_ref(),
                printer,
            )
        }
        Commands::Metadata(args) => {
            let backend = match args.backend {
                BackendChoice::Pdm => BuildBackend::Pdm,
                BackendChoice::Hatchling => BuildBackend::Hatchling,
            };
            commands::metadata(
                &project_dir,
                &pyproject,
                backend,
                args.output_format,
                printer,
            )
        }
    }
}

fn read_pyproject(path: PathBuf) -> Result<PyProjectToml> {
    PyProjectToml::read(&path).with_context(|| format!("Failed to read `{}`", path.display()))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    match run(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let mut message = String::new();
            if write_error_chain(&*err, &mut message).is_ok() {
                eprint!("{message}");
            }
            ExitStatus::Error.into()
        }
    }
}
