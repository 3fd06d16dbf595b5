//! Deciding whether the installed tool can format, and how to feed it.
//!
//! `meson format` exists since 1.5.0. Reading the document from `-` only
//! works from a later release; before that the tool has to be pointed at a
//! special file aliasing stdin, which only exists on some platforms.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::FormattingConfig;
use crate::introspection::ToolResolver;
use crate::version::Version;

/// First release with the `format` subcommand.
pub const FORMAT_SUPPORTED_SINCE: Version = Version::new(1, 5, 0);

/// The portable stdin marker.
pub const STDIN_MARKER: &str = "-";

/// How the document reaches the tool's stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum StdinConvention {
    /// The tool understands `-`.
    Marker,
    /// A platform file aliasing the process's stdin.
    SpecialPath(String),
}

impl StdinConvention {
    /// The argument naming the input file.
    pub fn as_arg(&self) -> &str {
        match self {
            Self::Marker => STDIN_MARKER,
            Self::SpecialPath(path) => path,
        }
    }
}

impl fmt::Display for StdinConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker => write!(f, "stdin marker '{STDIN_MARKER}'"),
            Self::SpecialPath(path) => write!(f, "special file '{path}'"),
        }
    }
}

/// A validated, invocable formatter. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub path: PathBuf,
    pub version: Version,
    pub stdin: StdinConvention,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Resolution(String),

    #[error("Meson supports formatting only since version {required}, but you have version {actual}")]
    TooOld { required: Version, actual: Version },

    #[error(
        "Meson {version} doesn't support the cross-platform stdin option for the format subcommand \
         and no stdin file is known for the platform: {platform}"
    )]
    UnsupportedPlatform { platform: String, version: Version },
}

pub type ToolCheckResult = Result<Tool, CapabilityError>;

/// Which stdin convention a given version can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdinPolicy {
    pub portable_marker_since: Version,
    /// OS name (as in `std::env::consts::OS`) to special file.
    pub platform_paths: BTreeMap<String, String>,
}

impl StdinPolicy {
    pub fn from_config(config: &FormattingConfig) -> Self {
        Self {
            portable_marker_since: config.stdin_marker_since,
            platform_paths: config.stdin_paths.clone(),
        }
    }

    /// Pick the convention for `version` on `platform`.
    ///
    /// Platforms without a configured special file fail closed.
    pub fn select(&self, version: Version, platform: &str) -> Result<StdinConvention, CapabilityError> {
        if version >= self.portable_marker_since {
            return Ok(StdinConvention::Marker);
        }

        self.platform_paths
            .get(platform)
            .map(|path| StdinConvention::SpecialPath(path.clone()))
            .ok_or_else(|| CapabilityError::UnsupportedPlatform {
                platform: platform.to_string(),
                version,
            })
    }
}

impl Default for StdinPolicy {
    fn default() -> Self {
        Self::from_config(&FormattingConfig::default())
    }
}

/// Validate `version` against the format threshold and pick its stdin
/// convention.
pub fn evaluate(path: PathBuf, version: Version, policy: &StdinPolicy, platform: &str) -> ToolCheckResult {
    if version < FORMAT_SUPPORTED_SINCE {
        return Err(CapabilityError::TooOld {
            required: FORMAT_SUPPORTED_SINCE,
            actual: version,
        });
    }

    let stdin = policy.select(version, platform)?;
    Ok(Tool { path, version, stdin })
}

/// Resolve the tool and check it for the current platform.
///
/// Resolution failures are returned as [`CapabilityError::Resolution`].
pub async fn check_tool(resolver: &dyn ToolResolver, config: &FormattingConfig) -> ToolCheckResult {
    check_tool_on(resolver, config, std::env::consts::OS).await
}

pub async fn check_tool_on(resolver: &dyn ToolResolver, config: &FormattingConfig, platform: &str) -> ToolCheckResult {
    let path = resolver
        .locate(config)
        .await
        .map_err(|e| CapabilityError::Resolution(e.to_string()))?;
    let version = resolver
        .version(&path)
        .await
        .map_err(|e| CapabilityError::Resolution(e.to_string()))?;

    log::debug!("Resolved {} version {version}", path.display());
    evaluate(path, version, &StdinPolicy::from_config(config), platform)
}
