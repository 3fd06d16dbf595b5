//! End-to-end tests of the `mesonfmt` binary against a fake meson.
#![cfg(unix)]

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

use common::{FORMATTED, STDERR_FAILURE, STDOUT_FAILURE, UNFORMATTED, fake_meson, recorded_args, write_config};

fn mesonfmt() -> Command {
    Command::cargo_bin("mesonfmt").unwrap()
}

#[test]
fn test_version_command() {
    mesonfmt()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mesonfmt"))
        .stdout(predicate::str::contains("1.5.0"));
}

#[test]
fn test_check_reports_tool_and_marker() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.7.0"))
        .stdout(predicate::str::contains("stdin marker '-'"));
}

#[test]
fn test_check_rejects_old_meson() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.4.9");
    let config = write_config(dir.path(), &meson, "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("1.5.0"))
        .stderr(predicate::str::contains("1.4.9"));
}

#[test]
fn test_check_with_missing_meson() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), &dir.path().join("no-such-meson"), "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_check_with_unparsable_version() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.6.0rc1");
    let config = write_config(dir.path(), &meson, "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("1.6.0rc1"));
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    mesonfmt()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_format_rewrites_file() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");
    let build = dir.path().join("meson.build");
    fs::write(&build, UNFORMATTED).unwrap();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg(&build)
        .assert()
        .success()
        .stdout(predicate::str::contains("Formatted"));

    assert_eq!(fs::read_to_string(&build).unwrap(), FORMATTED);
    assert_eq!(recorded_args(dir.path()), "format -");
}

#[test]
fn test_format_passes_formatter_config() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "meson-config = \"meson.format\"\n");
    let build = dir.path().join("meson.build");
    fs::write(&build, UNFORMATTED).unwrap();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg(&build)
        .assert()
        .success();

    let expected = format!("format -c {} -", dir.path().join("meson.format").display());
    assert_eq!(recorded_args(dir.path()), expected);
}

#[test]
#[cfg(target_os = "linux")]
fn test_format_with_older_meson_uses_proc_stdin() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.6.0");
    let config = write_config(dir.path(), &meson, "");
    let build = dir.path().join("meson.build");
    fs::write(&build, UNFORMATTED).unwrap();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg(&build)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&build).unwrap(), FORMATTED);
    assert_eq!(recorded_args(dir.path()), "format /proc/self/fd/0");
}

#[test]
fn test_format_check_mode() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");
    let messy = dir.path().join("meson.build");
    let clean = dir.path().join("clean.build");
    fs::write(&messy, UNFORMATTED).unwrap();
    fs::write(&clean, FORMATTED).unwrap();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg("--check")
        .arg(&clean)
        .assert()
        .success();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg("--check")
        .arg(&messy)
        .arg(&clean)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Would reformat"))
        .stdout(predicate::str::contains("clean.build").not());

    assert_eq!(fs::read_to_string(&messy).unwrap(), UNFORMATTED);
}

#[test]
fn test_format_stdin_to_stdout() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .write_stdin(UNFORMATTED)
        .assert()
        .success()
        .stdout(FORMATTED);
}

#[test]
fn test_format_failure_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");
    let build = dir.path().join("meson.build");
    let broken = format!("project( 'demo'\n{STDERR_FAILURE}\n");
    fs::write(&build, &broken).unwrap();

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .arg(&build)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("syntax error at line 3"));

    assert_eq!(fs::read_to_string(&build).unwrap(), broken);
}

#[test]
fn test_format_failure_reported_on_stdout() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .write_stdin(format!("{STDOUT_FAILURE}\n"))
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("ERROR: unexpected token"));
}

#[test]
fn test_format_when_disabled() {
    let dir = tempdir().unwrap();
    let meson = fake_meson(dir.path(), "1.7.0");
    let config = write_config(dir.path(), &meson, "enabled = false\n");

    mesonfmt()
        .arg("--config")
        .arg(&config)
        .arg("format")
        .write_stdin(UNFORMATTED)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("disabled"));
}
