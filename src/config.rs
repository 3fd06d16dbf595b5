//! Configuration for the formatting integration.
//!
//! Read from a TOML file (`.mesonfmt.toml` or `--config`) by the CLI, and
//! from `initializationOptions` / `workspace/didChangeConfiguration` by the
//! language server.
//!
//! ```toml
//! [formatting]
//! enabled = true
//! provider = "meson"
//! meson-path = "meson"
//! meson-config = "meson.format"
//! timeout = 30000
//! stdin-marker-since = "1.7.0"
//!
//! [formatting.stdin-paths]
//! linux = "/proc/self/fd/0"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::Version;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".mesonfmt.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid formatting settings: {0}")]
    Settings(String),
}

/// Which external tool performs the formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormattingProvider {
    #[default]
    Meson,
}

impl FormattingProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Meson => "meson",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FormattingConfig {
    /// Master switch (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: FormattingProvider,

    /// Executable name or path of the tool
    #[serde(default = "default_meson_path", alias = "mesonPath")]
    pub meson_path: String,

    /// Formatter configuration file, passed as `-c <path>`
    #[serde(default, alias = "mesonConfig")]
    pub meson_config: Option<PathBuf>,

    /// Timeout per tool execution in milliseconds, 0 disables it (default: 30000)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// First tool version accepting `-` as the stdin marker
    #[serde(default = "default_stdin_marker_since", alias = "stdinMarkerSince")]
    pub stdin_marker_since: Version,

    /// Special files standing in for stdin on older tools, keyed by OS name
    #[serde(default = "default_stdin_paths", alias = "stdinPaths")]
    pub stdin_paths: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_meson_path() -> String {
    "meson".to_string()
}

fn default_timeout() -> u64 {
    30_000
}

fn default_stdin_marker_since() -> Version {
    Version::new(1, 7, 0)
}

fn default_stdin_paths() -> BTreeMap<String, String> {
    BTreeMap::from([("linux".to_string(), "/proc/self/fd/0".to_string())])
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: FormattingProvider::default(),
            meson_path: default_meson_path(),
            meson_config: None,
            timeout: default_timeout(),
            stdin_marker_since: default_stdin_marker_since(),
            stdin_paths: default_stdin_paths(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    formatting: FormattingConfig,
}

impl FormattingConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] in `dir` if present.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (dir.join(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.is_file() {
            log::debug!("No {DEFAULT_CONFIG_FILE} in {}, using defaults", dir.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|message| ConfigError::Parse {
            path: path.clone(),
            message,
        })?;

        // A relative formatter config is relative to the file naming it
        if let Some(cfg) = &config.meson_config
            && cfg.is_relative()
            && let Some(parent) = path.parent()
        {
            config.meson_config = Some(parent.join(cfg));
        }

        log::debug!("Loaded formatting config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str::<ConfigFile>(content)
            .map(|file| file.formatting)
            .map_err(|e| e.to_string())
    }

    /// Parse editor settings.
    ///
    /// Accepts `{"mesonbuild": {"mesonPath": .., "formatting": {..}}}`,
    /// `{"formatting": {..}}`, or the formatting object itself. A
    /// `mesonPath` next to `formatting` applies when the formatting object
    /// does not name one.
    pub fn from_lsp_settings(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let root = value.get("mesonbuild").unwrap_or(value);

        let mut formatting = match root.get("formatting") {
            Some(f) => f.clone(),
            None => root.clone(),
        };
        if formatting.is_null() {
            return Ok(Self::default());
        }

        if let (Some(path), Some(obj)) = (root.get("mesonPath"), formatting.as_object_mut())
            && !obj.contains_key("mesonPath")
            && !obj.contains_key("meson-path")
        {
            obj.insert("mesonPath".to_string(), path.clone());
        }

        serde_json::from_value(formatting).map_err(|e| ConfigError::Settings(e.to_string()))
    }
}
