//! Asking the tool about itself: where it lives, which version it is, and
//! how a configured build directory is laid out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::FormattingConfig;
use crate::exec::{CommandSpec, ExecError, ExecResult, ProcessRunner};
use crate::version::{Version, VersionError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    #[error("'{0}' not found in PATH")]
    NotFound(String),

    #[error("failed to run '{program}': {error}{}", stderr_suffix(.stderr))]
    Exec {
        program: String,
        error: ExecError,
        stderr: String,
    },

    #[error("invalid version reported by '{program}': '{output}': {source}")]
    InvalidVersion {
        program: String,
        output: String,
        #[source]
        source: VersionError,
    },

    #[error("invalid introspection output from '{program}': {message}")]
    InvalidOutput { program: String, message: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Resolve `name` to an executable file.
///
/// Names containing a path separator are taken as paths; bare names are
/// searched in `PATH`.
pub fn locate_program(name: &str) -> Result<PathBuf, IntrospectionError> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return if candidate.is_file() {
            Ok(candidate.to_path_buf())
        } else {
            Err(IntrospectionError::NotFound(name.to_string()))
        };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path_var)
        .flat_map(|dir| executable_names(name).into_iter().map(move |n| dir.join(n)))
        .find(|p| is_executable(p))
        .ok_or_else(|| IntrospectionError::NotFound(name.to_string()))
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if Path::new(name).extension().is_none() {
        names.extend(["exe", "bat", "cmd"].iter().map(|ext| format!("{name}.{ext}")));
    }
    names
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Finds the tool and asks it for its version.
///
/// Nothing is memoized; every call queries the tool again.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    async fn locate(&self, config: &FormattingConfig) -> Result<PathBuf, IntrospectionError>;

    async fn version(&self, program: &Path) -> Result<Version, IntrospectionError>;
}

/// Resolver for the real `meson` executable.
#[derive(Clone)]
pub struct MesonResolver {
    runner: Arc<dyn ProcessRunner>,
}

impl MesonResolver {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolResolver for MesonResolver {
    async fn locate(&self, config: &FormattingConfig) -> Result<PathBuf, IntrospectionError> {
        locate_program(&config.meson_path)
    }

    async fn version(&self, program: &Path) -> Result<Version, IntrospectionError> {
        let output = run_checked(self.runner.as_ref(), &CommandSpec::new(program).arg("--version")).await?;
        output
            .stdout
            .parse()
            .map_err(|source| IntrospectionError::InvalidVersion {
                program: program.display().to_string(),
                output: output.stdout.trim().to_string(),
                source,
            })
    }
}

async fn run_checked(runner: &dyn ProcessRunner, command: &CommandSpec) -> Result<ExecResult, IntrospectionError> {
    let result = runner.run(command, "").await;
    match result.error {
        None => Ok(result),
        Some(error) => Err(IntrospectionError::Exec {
            program: command.program.display().to_string(),
            error,
            stderr: result.stderr,
        }),
    }
}

/// A build target as reported by `meson introspect --targets`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub defined_in: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BuildOption {
    name: String,
    value: serde_json::Value,
}

/// Lazily filled cache of the build directory's `layout` option.
///
/// Filled on first use, dropped by [`clear`](Self::clear) when the build
/// directory is reconfigured.
pub struct BuildLayoutCache {
    runner: Arc<dyn ProcessRunner>,
    program: PathBuf,
    build_dir: PathBuf,
    layout: Mutex<Option<String>>,
}

impl BuildLayoutCache {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            build_dir: build_dir.into(),
            layout: Mutex::new(None),
        }
    }

    pub async fn clear(&self) {
        *self.layout.lock().await = None;
    }

    pub async fn layout(&self) -> Result<String, IntrospectionError> {
        let mut guard = self.layout.lock().await;
        if let Some(layout) = guard.as_ref() {
            return Ok(layout.clone());
        }

        let layout = self.query_layout().await?;
        log::debug!("Build layout of {}: {layout}", self.build_dir.display());
        *guard = Some(layout.clone());
        Ok(layout)
    }

    async fn query_layout(&self) -> Result<String, IntrospectionError> {
        let command = CommandSpec::new(&self.program)
            .args(["introspect", "--buildoptions"])
            .arg(self.build_dir.display().to_string());
        let output = run_checked(self.runner.as_ref(), &command).await?;

        let invalid = |message: String| IntrospectionError::InvalidOutput {
            program: self.program.display().to_string(),
            message,
        };
        let options: Vec<BuildOption> = serde_json::from_str(&output.stdout).map_err(|e| invalid(e.to_string()))?;
        options
            .into_iter()
            .find(|o| o.name == "layout")
            .and_then(|o| o.value.as_str().map(str::to_string))
            .ok_or_else(|| invalid("no 'layout' build option".to_string()))
    }

    /// The name meson's backend expects for `target`.
    pub async fn target_name(&self, target: &Target, source_dir: &Path) -> Result<String, IntrospectionError> {
        let layout = self.layout().await?;
        Ok(target_name_for_layout(&layout, target, source_dir))
    }
}

/// `<dir>/<name>:<type>` for the `mirror` layout, `meson-out/<name>` for
/// any other.
pub fn target_name_for_layout(layout: &str, target: &Target, source_dir: &Path) -> String {
    if layout != "mirror" {
        return format!("meson-out/{}", target.name);
    }

    let defined_dir = target.defined_in.parent().unwrap_or(Path::new(""));
    let relative = defined_dir.strip_prefix(source_dir).unwrap_or(defined_dir);

    // meson wants '/' between path and target name on every platform
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.push(target.name.clone());

    format!("{}:{}", parts.join("/"), target.target_type.replace(' ', "_"))
}
