// The `unreachable_pub` is to silence false positives in RustRover.
#![allow(dead_code, unreachable_pub)]

use std::borrow::BorrowMut;
use std::path::PathBuf;
use std::process::{Command, Output};

use assert_fs::fixture::{ChildPath, FileWriteStr, PathChild};
use regex::Regex;

use lockbuild_static::EnvVars;

/// Filters that apply to every snapshot.
pub const INSTA_FILTERS: &[(&str, &str)] = &[
    // Rewrite Windows output to Unix output
    (r"\\([\w\d])", "/$1"),
    (r"lockbuild.exe", "lockbuild"),
];

pub struct TestContext {
    pub temp_dir: ChildPath,
    /// Directory for executables that stand in for external tools.
    pub bin_dir: ChildPath,

    /// Standard filters for this test context.
    filters: Vec<(String, String)>,

    #[allow(dead_code)]
    _root: assert_fs::TempDir,
}

impl TestContext {
    /// Create a new test context with an empty project directory.
    pub fn new() -> Self {
        let root = assert_fs::TempDir::new().expect("Failed to create test root directory");
        let temp_dir = ChildPath::new(root.path()).child("project");
        fs_err::create_dir_all(&temp_dir).expect("Failed to create project directory");
        let bin_dir = ChildPath::new(root.path()).child("bin");
        fs_err::create_dir_all(&bin_dir).expect("Failed to create bin directory");

        let mut filters = Vec::new();
        for path in [temp_dir.path(), root.path()] {
            let path = fs_err::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            filters.push((
                regex::escape(&path.display().to_string()),
                "[TEMP_DIR]".to_string(),
            ));
        }
        filters.push((
            regex::escape(&temp_dir.path().display().to_string()),
            "[TEMP_DIR]".to_string(),
        ));

        Self {
            temp_dir,
            bin_dir,
            filters,
            _root: root,
        }
    }

    /// Write the project's `pyproject.toml`.
    pub fn pyproject(&self, content: &str) {
        self.temp_dir
            .child("pyproject.toml")
            .write_str(content)
            .expect("Failed to write `pyproject.toml`");
    }

    /// Write the project's `pdm.lock`.
    pub fn lockfile(&self, content: &str) {
        self.temp_dir
            .child("pdm.lock")
            .write_str(content)
            .expect("Failed to write `pdm.lock`");
    }

    /// Install a fake `pdm` that reports the lockfile as up to date, and whose `build` copies
    /// `pyproject.toml` to `pyproject.seen.toml` and exits with `exit_code`.
    #[cfg(unix)]
    pub fn fake_pdm(&self, exit_code: u8) {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            indoc::indoc! {r#"
                #!/bin/sh
                if [ "$1" = "build" ]; then
                    cp "$3/pyproject.toml" "$3/pyproject.seen.toml"
                    exit {}
                fi
                exit 0
            "#},
            exit_code
        );
        let pdm = self.bin_dir.child("pdm");
        pdm.write_str(&script).expect("Failed to write fake `pdm`");
        fs_err::set_permissions(&pdm, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake `pdm` executable");
    }

    /// The content of `pyproject.toml` as seen by the fake `pdm build`.
    pub fn seen_pyproject(&self) -> String {
        fs_err::read_to_string(self.temp_dir.child("pyproject.seen.toml"))
            .expect("`pdm build` was not run")
    }

    /// The standard filters for this test context.
    pub fn filters(&self) -> Vec<(&str, &str)> {
        self.filters
            .iter()
            .map(|(p, r)| (p.as_str(), r.as_str()))
            .chain(INSTA_FILTERS.iter().copied())
            .collect()
    }

    /// Create a `lockbuild` command for testing, running in the project directory.
    pub fn command(&self) -> Command {
        let mut command = Command::new(get_bin());
        command
            .current_dir(self.temp_dir.path())
            .env_remove(EnvVars::PDM_BUILD_LOCKED)
            .env_remove(EnvVars::PDM_LOCKFILE)
            .env_remove(EnvVars::RUST_LOG)
            .env(EnvVars::LOCKBUILD_NO_WRAP, "1")
            .env("PATH", self.path());
        command
    }

    /// Create a `lockbuild build` command.
    pub fn build(&self) -> Command {
        let mut command = self.command();
        command.arg("build");
        command
    }

    /// Create a `lockbuild metadata` command.
    pub fn metadata(&self) -> Command {
        let mut command = self.command();
        command.arg("metadata");
        command
    }

    /// The `PATH` with the fake tools first.
    fn path(&self) -> std::ffi::OsString {
        let path = std::env::var_os("PATH").unwrap_or_default();
        std::env::join_paths(
            std::iter::once(self.bin_dir.to_path_buf()).chain(std::env::split_paths(&path)),
        )
        .expect("Failed to build `PATH`")
    }

    /// Read a file from the project directory.
    pub fn read(&self, name: &str) -> String {
        fs_err::read_to_string(self.temp_dir.child(name)).expect("Failed to read project file")
    }
}

pub fn get_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lockbuild"))
}

pub fn apply_filters<T: AsRef<str>>(mut snapshot: String, filters: impl AsRef<[(T, T)]>) -> String {
    for (matcher, replacement) in filters.as_ref() {
        let re = Regex::new(matcher.as_ref()).expect("Do you need to regex::escape your filter?");
        if re.is_match(&snapshot) {
            snapshot = re.replace_all(&snapshot, replacement.as_ref()).to_string();
        }
    }
    snapshot
}

/// Execute the command and format its output status, stdout and stderr into a snapshot string.
///
/// This function is derived from `insta_cmd`s `spawn_with_info`.
pub fn run_and_format<T: AsRef<str>>(
    mut command: impl BorrowMut<Command>,
    filters: impl AsRef<[(T, T)]>,
) -> (String, Output) {
    let program = command
        .borrow_mut()
        .get_program()
        .to_string_lossy()
        .to_string();

    let output = command
        .borrow_mut()
        .output()
        .unwrap_or_else(|err| panic!("Failed to spawn {program}: {err}"));

    let snapshot = apply_filters(
        format!(
            "success: {:?}\nexit_code: {}\n----- stdout -----\n{}\n----- stderr -----\n{}",
            output.status.success(),
            output.status.code().unwrap_or(!0),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ),
        filters,
    );

    (snapshot, output)
}

/// Run a command and snapshot its exit status and output, with default filters or with custom
/// filters.
#[allow(unused_macros)]
macro_rules! lockbuild_snapshot {
    ($spawnable:expr, @$snapshot:literal) => {{
        lockbuild_snapshot!($crate::common::INSTA_FILTERS.to_vec(), $spawnable, @$snapshot)
    }};
    ($filters:expr, $spawnable:expr, @$snapshot:literal) => {{
        let (snapshot, output) = $crate::common::run_and_format($spawnable, &$filters);
        ::insta::assert_snapshot!(snapshot, @$snapshot);
        output
    }};
}

/// <https://stackoverflow.com/a/31749071/3549270>
#[allow(unused_imports)]
pub(crate) use lockbuild_snapshot;
