use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use indoc::indoc;
use predicates::prelude::*;
use serde_json::json;

use lockbuild_static::EnvVars;

use crate::common::{TestContext, lockbuild_snapshot};

const LOCK: &str = indoc! {r#"
    [metadata]
    groups = ["default", "socks"]
    strategy = ["inherit_metadata"]

    [[package]]
    name = "certifi"
    version = "2024.2.2"
    groups = ["default", "socks"]

    [[package]]
    name = "pysocks"
    version = "1.7.1"
    groups = ["socks"]

    [[package]]
    name = "requests"
    version = "2.31.0"
    groups = ["default", "socks"]
"#};

const PYPROJECT: &str = indoc! {r#"
    [project]
    name = "project"
    version = "0.1.0"
    dependencies = ["requests"]

    [project.optional-dependencies]
    socks = ["requests[socks]"]
"#};

#[test]
fn missing_lockfile() {
    let context = TestContext::new();
    context.pyproject(indoc! {r#"
        [project]
        name = "project"
    "#});

    lockbuild_snapshot!(context.filters(), context.metadata().arg("--backend").arg("hatchling"), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    name = "project"

    ----- stderr -----
    warning: The lockfile doesn't exist, skip locking dependencies
    "#);
}

#[test]
fn quiet_still_prints_metadata() {
    let context = TestContext::new();
    context.pyproject(indoc! {r#"
        [project]
        name = "project"
    "#});

    lockbuild_snapshot!(context.filters(), context.metadata().arg("--quiet").arg("--backend").arg("hatchling"), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    name = "project"

    ----- stderr -----
    "#);
}

#[test]
fn pdm_backend_disabled() {
    let context = TestContext::new();
    context.pyproject(indoc! {r#"
        [project]
        name = "project"
    "#});

    lockbuild_snapshot!(context.filters(), context.metadata(), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    name = "project"

    ----- stderr -----
    "#);
}

#[test]
fn pdm_backend_environment() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);

    context
        .metadata()
        .env(EnvVars::PDM_BUILD_LOCKED, "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("socks-locked = ["))
        .stdout(predicate::str::contains(r#""pysocks==1.7.1""#));
}

#[test]
fn pdm_backend_configuration() {
    let context = TestContext::new();
    context.pyproject(&format!(
        "{PYPROJECT}{}",
        indoc! {r"

            [tool.pdm.build]
            locked = true
        "}
    ));
    context.lockfile(LOCK);

    context
        .metadata()
        .assert()
        .success()
        .stdout(predicate::str::contains("socks-locked = ["));
}

#[test]
fn hatchling_json() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);

    let output = context
        .metadata()
        .arg("--backend")
        .arg("hatchling")
        .arg("--output-format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        metadata,
        json!({
            "name": "project",
            "version": "0.1.0",
            "dependencies": ["requests"],
            "optional-dependencies": {
                "socks": ["requests[socks]"],
                "locked": ["certifi==2024.2.2", "requests==2.31.0"],
                "socks-locked": ["certifi==2024.2.2", "pysocks==1.7.1", "requests==2.31.0"],
            },
        })
    );
}

#[test]
fn lockfile_override() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    let locks = context.temp_dir.child("locks");
    fs_err::create_dir_all(&locks).unwrap();
    fs_err::write(locks.child("prod.lock"), LOCK).unwrap();

    context
        .metadata()
        .arg("--backend")
        .arg("hatchling")
        .env(EnvVars::PDM_LOCKFILE, "locks/prod.lock")
        .assert()
        .success()
        .stdout(predicate::str::contains("socks-locked = ["))
        .stderr(predicate::str::is_empty());
}

#[test]
fn legacy_lockfile() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(indoc! {r#"
        [metadata]
        groups = ["default"]

        [[package]]
        name = "requests"
        version = "2.31.0"
    "#});

    let output = context
        .metadata()
        .arg("--backend")
        .arg("hatchling")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: The lockfile doesn't support 'inherit_metadata' strategy, skip locking dependencies",
        ))
        .get_output()
        .clone();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("locked"));
}

#[test]
fn group_not_locked() {
    let context = TestContext::new();
    context.pyproject(&format!(
        "{PYPROJECT}{}",
        indoc! {r#"
            docs = ["mkdocs"]
        "#}
    ));
    context.lockfile(LOCK);

    context
        .metadata()
        .arg("--backend")
        .arg("hatchling")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs-locked").not())
        .stderr(predicate::str::contains(
            "Group `docs` is not stored in the lockfile, skip locking dependencies for it",
        ));
}

#[test]
fn missing_project_table() {
    let context = TestContext::new();
    context.pyproject(indoc! {r#"
        [tool.pdm.build]
        locked = true
    "#});

    lockbuild_snapshot!(context.filters(), context.metadata(), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: No `[project]` table found in `pyproject.toml`
    ");
}

#[test]
fn missing_pyproject() {
    let context = TestContext::new();

    context
        .metadata()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error: Failed to read `"));
}

#[test]
fn unsupported_requirement_warns_once() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(indoc! {r#"
        [metadata]
        groups = ["default", "socks"]
        strategy = ["inherit_metadata"]

        [[package]]
        name = "requests"
        version = "2.31.0"
        groups = ["default", "socks"]

        [[package]]
        name = "vendored"
        path = "./vendored"
        groups = ["default", "socks"]
    "#});

    context
        .metadata()
        .arg("--backend")
        .arg("hatchling")
        .assert()
        .success()
        .stdout(predicate::str::contains("vendored").not())
        .stderr(
            predicate::str::contains(
                "warning: Skipping unsupported requirement: Local path requirement is not allowed: `vendored` at `./vendored`",
            )
            .count(1),
        );
}
