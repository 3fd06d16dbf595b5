//! Three-component tool versions.
//!
//! Versions reported by `meson --version` are plain `major.minor.patch`
//! triples. Pre-release and build metadata are not modeled: anything that is
//! not exactly three non-negative integers is rejected.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const COMPONENT_NAMES: [&str; 3] = ["major", "minor", "patch"];

/// Reasons a version cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version has {0} components, but expected 3")]
    Arity(usize),

    #[error("{component} version component is not a number: '{value}'")]
    NotANumber { component: &'static str, value: String },
}

/// An immutable `major.minor.patch` triple, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Lexicographic comparison on (major, minor, patch).
    pub fn compare(&self, other: &Version) -> Ordering {
        self.cmp(other)
    }

    pub fn raw(&self) -> [u64; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<[u64; 3]> for Version {
    fn from([major, minor, patch]: [u64; 3]) -> Self {
        Self::new(major, minor, patch)
    }
}

impl TryFrom<&[u64]> for Version {
    type Error = VersionError;

    fn try_from(parts: &[u64]) -> Result<Self, Self::Error> {
        match parts {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(VersionError::Arity(parts.len())),
        }
    }
}

impl TryFrom<&[i64]> for Version {
    type Error = VersionError;

    fn try_from(parts: &[i64]) -> Result<Self, Self::Error> {
        if parts.len() != 3 {
            return Err(VersionError::Arity(parts.len()));
        }

        let mut out = [0u64; 3];
        for (index, value) in parts.iter().enumerate() {
            out[index] = u64::try_from(*value).map_err(|_| VersionError::NotANumber {
                component: COMPONENT_NAMES[index],
                value: value.to_string(),
            })?;
        }

        Ok(Self::from(out))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::Arity(parts.len()));
        }

        let mut out = [0u64; 3];
        for (index, part) in parts.iter().enumerate() {
            // `u64::from_str` accepts a leading '+', which is not a version
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::NotANumber {
                    component: COMPONENT_NAMES[index],
                    value: (*part).to_string(),
                });
            }
            out[index] = part.parse().map_err(|_| VersionError::NotANumber {
                component: COMPONENT_NAMES[index],
                value: (*part).to_string(),
            })?;
        }

        Ok(Self::from(out))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
