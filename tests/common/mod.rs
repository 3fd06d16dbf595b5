//! Shared fixtures: a fake `meson` executable that behaves like the real
//! `format` subcommand closely enough for end-to-end tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Marker making the fake formatter fail with a message on stderr.
pub const STDERR_FAILURE: &str = "SYNTAX_ERROR";

/// Marker making the fake formatter fail with a message on stdout only.
pub const STDOUT_FAILURE: &str = "STDOUT_ERROR";

const FAKE_MESON: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "@VERSION@"
  exit 0
fi
if [ "$1" != "format" ]; then
  echo "unexpected command: $*" >&2
  exit 2
fi
echo "$@" > "$(dirname "$0")/args.txt"
for last; do :; done
input=$(cat "$last"; echo x)
input=${input%x}
case "$input" in
  *SYNTAX_ERROR*) echo "syntax error at line 3" >&2; exit 1 ;;
  *STDOUT_ERROR*) echo "meson.build:1:0: ERROR: unexpected token"; exit 1 ;;
esac
printf '%s' "$input" | sed -e 's/( */(/g' -e 's/ *)/)/g'
"#;

/// Write an executable fake `meson` reporting `version` into `dir`.
///
/// `format` strips spaces inside parentheses and records its arguments in
/// `args.txt` next to the script.
#[cfg(unix)]
pub fn fake_meson(dir: &Path, version: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("meson");
    fs::write(&path, FAKE_MESON.replace("@VERSION@", version)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Arguments of the last `format` call of the fake tool in `dir`.
pub fn recorded_args(dir: &Path) -> String {
    fs::read_to_string(dir.join("args.txt")).unwrap_or_default().trim().to_string()
}

/// Write a config file pointing at `meson` and return its path.
pub fn write_config(dir: &Path, meson: &Path, extra: &str) -> PathBuf {
    let path = dir.join("mesonfmt.toml");
    let content = format!(
        "[formatting]\nmeson-path = \"{}\"\n{extra}",
        meson.display()
    );
    fs::write(&path, content).unwrap();
    path
}

pub const UNFORMATTED: &str = "project( 'demo', 'c' )\nexecutable( 'demo', 'main.c' )\n";
pub const FORMATTED: &str = "project('demo', 'c')\nexecutable('demo', 'main.c')\n";
