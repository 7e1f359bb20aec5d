use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand};

pub use options::flag;

mod options;

// Configures Clap v3-style help menu colors
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser)]
#[command(name = "lockbuild", author, version)]
#[command(about = "Build Python distributions that carry their locked dependencies.")]
#[command(propagate_version = true)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(next_help_heading = "Global options", next_display_order = 1000)]
pub struct GlobalArgs {
    /// Do not print any output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use verbose output.
    ///
    /// You can configure fine-grained logging using the `RUST_LOG` environment variable.
    /// (<https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives>)
    #[arg(global = true, action = clap::ArgAction::Count, long, short, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Control colors in output.
    #[arg(
        global = true,
        long,
        value_enum,
        default_value = "auto",
        value_name = "COLOR_CHOICE"
    )]
    pub color: ColorChoice,

    /// Run the command within the given project directory.
    ///
    /// Defaults to the current working directory.
    #[arg(global = true, long, short = 'p')]
    pub project: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, clap::ValueEnum)]
pub enum ColorChoice {
    /// Enables colored output only when the output is going to a terminal or TTY with support.
    Auto,

    /// Enables colored output regardless of the detected environment.
    Always,

    /// Disables colored output.
    Never,
}

impl From<ColorChoice> for anstream::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => Self::Auto,
            ColorChoice::Always => Self::Always,
            ColorChoice::Never => Self::Never,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project, adding its locked dependency groups to the distribution metadata.
    ///
    /// The locked groups are written to `project.optional-dependencies` in `pyproject.toml` for
    /// the duration of the build; the file is restored afterwards, even if the build fails.
    Build(BuildArgs),

    /// Print the project metadata with the locked dependency groups added, as a build backend
    /// hook would see it.
    ///
    /// Nothing is written to disk.
    Metadata(MetadataArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Add the locked dependency groups to the distribution metadata.
    ///
    /// Can also be enabled with `tool.pdm.build.locked = true` or `PDM_BUILD_LOCKED=1`.
    #[arg(long, short, overrides_with("no_locked"))]
    pub locked: bool,

    #[arg(long, overrides_with("locked"), hide = true)]
    pub no_locked: bool,

    /// The output directory to which distributions should be written.
    #[arg(long, short)]
    pub dest: Option<PathBuf>,

    /// Don't build a source distribution.
    #[arg(long)]
    pub no_sdist: bool,

    /// Don't build a wheel.
    #[arg(long)]
    pub no_wheel: bool,

    /// The tool used to build the distributions.
    #[arg(long, value_enum, default_value_t = BuildFrontendChoice::default())]
    pub frontend: BuildFrontendChoice,

    /// Don't update an outdated lockfile before reading it.
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum BuildFrontendChoice {
    /// Run `pdm build`.
    #[default]
    Pdm,
    /// Run `python -m build`.
    Pypa,
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    /// The build backend whose metadata hook to run.
    #[arg(long, value_enum, default_value_t = BackendChoice::default())]
    pub backend: BackendChoice,

    /// The format in which to print the metadata.
    #[arg(long, value_enum, default_value_t = MetadataFormat::default())]
    pub output_format: MetadataFormat,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendChoice {
    /// `pdm-backend`, which only adds locked groups when locking is enabled.
    #[default]
    Pdm,
    /// `hatchling`, which always adds locked groups.
    Hatchling,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum MetadataFormat {
    /// Display the `[project]` table as TOML.
    #[default]
    Toml,
    /// Display the `[project]` table as JSON.
    Json,
}
