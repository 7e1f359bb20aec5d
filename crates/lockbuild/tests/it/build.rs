//! These tests stand in a fake `pdm` executable for the build frontend.
#![cfg(unix)]

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use indoc::indoc;
use predicates::prelude::*;

use lockbuild_static::EnvVars;

use crate::common::{TestContext, lockbuild_snapshot};

const LOCK: &str = indoc! {r#"
    [metadata]
    groups = ["default", "socks", "test"]
    strategy = ["inherit_metadata"]

    [[package]]
    name = "pysocks"
    version = "1.7.1"
    groups = ["socks"]

    [[package]]
    name = "pytest"
    version = "8.0.0"
    groups = ["test"]

    [[package]]
    name = "requests"
    version = "2.31.0"
    groups = ["default", "socks"]
"#};

const PYPROJECT: &str = indoc! {r#"
    [project]
    name = "project"
    version = "0.1.0"
    # Unpinned.
    dependencies = ["requests>=2"]

    [project.optional-dependencies]
    socks = ["requests[socks]"]

    [tool.pdm.dev-dependencies]
    test = ["pytest"]
"#};

#[test]
fn build_locked() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    lockbuild_snapshot!(context.filters(), context.build().arg("--locked"), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    Resolving locked packages from lockfile...
    Adding locked groups: locked, socks-locked
    ");

    let seen = context.seen_pyproject();
    assert!(seen.contains("# Unpinned."));
    assert!(seen.contains("\nlocked = [\n"));
    assert!(seen.contains("socks-locked = [\n"));
    assert!(seen.contains(r#""pysocks==1.7.1","#));
    assert!(seen.contains(r#""requests==2.31.0","#));
    assert!(!seen.contains("test-locked"));

    // The original `pyproject.toml` is restored.
    assert_eq!(context.read("pyproject.toml"), PYPROJECT);
}

#[test]
fn build_locked_configuration() {
    let context = TestContext::new();
    context.pyproject(&format!(
        "{PYPROJECT}{}",
        indoc! {r#"

            [tool.pdm.build]
            locked = true
            locked-groups = ["socks"]
        "#}
    ));
    context.lockfile(LOCK);
    context.fake_pdm(0);

    context
        .build()
        .assert()
        .success()
        .stderr(predicate::str::contains("Adding locked groups: socks-locked"));

    let seen = context.seen_pyproject();
    assert!(seen.contains("socks-locked = ["));
    assert!(!seen.contains("\nlocked = ["));
}

#[test]
fn build_locked_environment() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    context
        .build()
        .env(EnvVars::PDM_BUILD_LOCKED, "true")
        .assert()
        .success();

    assert!(context.seen_pyproject().contains("socks-locked = ["));
}

#[test]
fn no_locked_overrides_configuration() {
    let context = TestContext::new();
    let pyproject = format!(
        "{PYPROJECT}{}",
        indoc! {r"

            [tool.pdm.build]
            locked = true
        "}
    );
    context.pyproject(&pyproject);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    context
        .build()
        .arg("--no-locked")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    assert_eq!(context.seen_pyproject(), pyproject);
}

#[test]
fn not_requested() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    context.build().assert().success();

    assert_eq!(context.seen_pyproject(), PYPROJECT);
}

#[test]
fn build_failure_restores_pyproject() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(LOCK);
    context.fake_pdm(3);

    context.build().arg("--locked").assert().code(3);

    assert!(context.seen_pyproject().contains("socks-locked = ["));
    assert_eq!(context.read("pyproject.toml"), PYPROJECT);
}

#[test]
fn collision() {
    let context = TestContext::new();
    let pyproject = indoc! {r#"
        [project]
        name = "project"
        version = "0.1.0"
        dependencies = []

        [project.optional-dependencies]
        extras = ["rich"]
        extras-locked = ["rich==13.7.0"]
    "#};
    context.pyproject(pyproject);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    lockbuild_snapshot!(context.filters(), context.build().arg("--locked"), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: You already have groups that would be overwritten by the locked groups: `extras-locked`. Please remove them.
    ");

    // Nothing was built and nothing was written.
    context
        .temp_dir
        .child("pyproject.seen.toml")
        .assert(predicate::path::missing());
    assert_eq!(context.read("pyproject.toml"), pyproject);
}

#[test]
fn missing_lockfile() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.fake_pdm(0);

    lockbuild_snapshot!(context.filters(), context.build().arg("--locked"), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    warning: The lockfile doesn't exist, skip locking dependencies
    ");

    assert_eq!(context.seen_pyproject(), PYPROJECT);
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
    context.fake_pdm(0);

    context
        .build()
        .arg("--locked")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "Group `docs` is not stored in the lockfile, skip locking dependencies for it",
        ));

    assert!(!context.seen_pyproject().contains("docs-locked"));
}

#[test]
fn unsupported_requirement() {
    let context = TestContext::new();
    context.pyproject(PYPROJECT);
    context.lockfile(indoc! {r#"
        [metadata]
        groups = ["default"]
        strategy = ["inherit_metadata"]

        [[package]]
        name = "requests"
        version = "2.31.0"
        path = "../requests"
        groups = ["default"]
    "#});
    context.fake_pdm(0);

    context
        .build()
        .arg("--locked")
        .assert()
        .code(2)
        .stderr(predicate::str::starts_with("error: "));

    context
        .temp_dir
        .child("pyproject.seen.toml")
        .assert(predicate::path::missing());
    assert_eq!(context.read("pyproject.toml"), PYPROJECT);
}

#[test]
fn collision_with_declared_group() {
    let context = TestContext::new();
    let pyproject = indoc! {r#"
        [project]
        name = "project"
        version = "0.1.0"
        dependencies = []

        [project.optional-dependencies]
        extras = ["rich"]
        extras-locked = ["rich==13.7.0"]

        [tool.pdm.build]
        locked = true
        locked-groups = ["extras"]
    "#};
    context.pyproject(pyproject);
    context.lockfile(LOCK);
    context.fake_pdm(0);

    lockbuild_snapshot!(context.filters(), context.build(), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: You already have groups that would be overwritten by the locked groups: `extras-locked`. Please remove them.
    ");

    context
        .temp_dir
        .child("pyproject.seen.toml")
        .assert(predicate::path::missing());
    assert_eq!(context.read("pyproject.toml"), pyproject);
}
