use std::ffi::OsStr;

/// Declares all environment variable used throughout `lockbuild` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// Equivalent to the `--locked` command-line argument. If set to a truthy value, `lockbuild`
    /// adds locked dependency groups to the built distribution; if set to a falsy value, it
    /// overrides `tool.pdm.build.locked` in `pyproject.toml`.
    ///
    /// The name is shared with the PDM plugin so that existing CI configuration keeps working.
    pub const PDM_BUILD_LOCKED: &'static str = "PDM_BUILD_LOCKED";

    /// The path to the lockfile to read instead of `pdm.lock` in the project root.
    ///
    /// Relative paths are resolved against the project root.
    pub const PDM_LOCKFILE: &'static str = "PDM_LOCKFILE";

    /// Avoid line wrapping for diagnostics.
    pub const LOCKBUILD_NO_WRAP: &'static str = "LOCKBUILD_NO_WRAP";

    /// Used to override the terminal width when wrapping diagnostics.
    pub const COLUMNS: &'static str = "COLUMNS";

    /// Standard `RUST_LOG` environment variable, used to set the log level of `lockbuild`.
    pub const RUST_LOG: &'static str = "RUST_LOG";
}

/// Parse a boolean environment variable value.
///
/// Accepts the same spellings as clap's `BoolishValueParser`. Returns `None` for values that are
/// neither truthy nor falsy.
pub fn parse_boolish(value: impl AsRef<OsStr>) -> Option<bool> {
    let value = value.as_ref().to_str()?.trim().to_ascii_lowercase();
    match value.as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Read a boolean environment variable, returning `None` if it is unset.
///
/// Values that are not recognizably false are treated as true, matching the PDM plugin, which
/// only ever compared against `"false"`.
pub fn read_boolish(name: &str) -> Option<bool> {
    let value = std::env::var_os(name)?;
    Some(parse_boolish(&value).unwrap_or(true))
}
