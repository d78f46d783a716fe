//! Black-box tests of the `caisson` binary.
//!
//! Everything here runs with `--dry-run`: the docker command line is printed
//! and nothing is executed, so no docker daemon is needed. A dummy
//! caisson-init file stands in for the real helper via
//! `CAISSON_INIT_BINARY`.

use assert_cmd::Command;
use caisson_test_utils::TestProject;
use predicates::prelude::*;

fn caisson(project: &TestProject) -> Command {
    project.write_file("fake-init", "#!/bin/sh\n");
    let mut cmd = Command::cargo_bin("caisson").expect("caisson binary built");
    cmd.current_dir(project.root());
    cmd.env("CAISSON_INIT_BINARY", project.root().join("fake-init"));
    cmd.env_remove("CAISSON_DISCOVERY_ACROSS_FILESYSTEM");
    cmd
}

#[test]
fn dry_run_prints_the_docker_command_line() {
    let project = TestProject::new();
    project.write_anchor("image: busybox\nentrypoint:\n");

    caisson(&project)
        .args(["--dry-run", "echo", "hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docker run -i --rm"))
        .stdout(predicate::str::contains("busybox"))
        .stdout(predicate::str::contains("/.caisson/command.sh"));
}

#[test]
fn aliases_resolve_before_rendering() {
    let project = TestProject::new();
    project.write_anchor(
        "image: busybox\nentrypoint:\naliases:\n  shout:\n    image: alpine:3\n    script: echo LOUD\n",
    );

    caisson(&project)
        .args(["--dry-run", "shout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpine:3"));
}

#[test]
fn config_errors_exit_with_the_config_status() {
    let project = TestProject::new();
    project.write_anchor("image: busybox\ninvalid_key: is no good\n");

    caisson(&project)
        .args(["--dry-run", "true"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("unrecognized node"))
        .stderr(predicate::str::contains("invalid_key"));
}

#[test]
fn missing_anchor_exits_with_the_config_status() {
    let project = TestProject::new();

    caisson(&project)
        .args(["--dry-run", "true"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains(".caisson.yml"));
}

#[test]
fn image_override_forgives_a_missing_anchor() {
    let project = TestProject::new();

    caisson(&project)
        .args(["--dry-run", "--image", "standin", "--entrypoint", "", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("standin"));
}

#[test]
fn multi_line_alias_with_arguments_is_a_config_error() {
    let project = TestProject::new();
    project.write_anchor(
        "image: busybox\nentrypoint:\naliases:\n  deploy:\n    script:\n      - make\n      - make install\n",
    );

    caisson(&project)
        .args(["--dry-run", "deploy", "surprise"])
        .assert()
        .code(128)
        .stderr(predicate::str::contains("multi-line aliases"));
}

#[test]
fn cli_env_reaches_the_command_line() {
    let project = TestProject::new();
    project.write_anchor("image: busybox\nentrypoint:\n");

    caisson(&project)
        .args(["--dry-run", "-e", "PIPELINE=ci", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--env=PIPELINE=ci"));
}
