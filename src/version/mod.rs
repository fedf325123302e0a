//! # Version
//!
//! Parsing of vendor version strings and the version ranges patch lists are gated by

pub mod range;

pub use range::{VersionBound, VersionRange};

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Version of the running image, parsed from its vendor version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Revision, 0 if the string carries none
    pub revision: u32,
    /// Set for modified builds (trailing `M`)
    pub dirty: bool,
}

impl Version {
    /// Creates a clean version
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            dirty: false,
        }
    }

    /// Parses `<major>.<minor>[-<revision>][M]`.
    ///
    /// An empty string is [`Error::VersionUnavailable`], anything else that does not follow the grammar exactly is
    /// [`Error::VersionParse`].
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::VersionUnavailable);
        }
        let fail = |reason| Error::VersionParse {
            input: input.to_string(),
            reason,
        };

        let (rest, dirty) = match input.strip_suffix('M') {
            Some(rest) => (rest, true),
            None => (input, false),
        };
        let (major, rest) = rest
            .split_once('.')
            .ok_or_else(|| fail("missing minor version"))?;
        let (minor, revision) = match rest.split_once('-') {
            Some((minor, revision)) => (minor, Some(revision)),
            None => (rest, None),
        };

        Ok(Self {
            major: decimal(major).ok_or_else(|| fail("invalid major version"))?,
            minor: decimal(minor).ok_or_else(|| fail("invalid minor version"))?,
            revision: match revision {
                Some(revision) => decimal(revision).ok_or_else(|| fail("invalid revision"))?,
                None => 0,
            },
            dirty,
        })
    }
}

/// Parses a field made of ASCII digits only
fn decimal(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)?;
        if self.revision != 0 {
            write!(f, "-{}", self.revision)?;
        }
        if self.dirty {
            write!(f, "M")?;
        }
        Ok(())
    }
}

/// Provides the identification string of the running image
pub trait VersionSource {
    /// Returns the raw version string, or `None` if it is unavailable
    fn version_string(&self) -> Option<String>;

    /// Reads and parses the version string
    fn version(&self) -> Result<Version> {
        self.version_string()
            .ok_or(Error::VersionUnavailable)
            .and_then(|s| Version::parse(&s))
    }
}

/// Version source with a fixed answer
#[derive(Debug, Clone, Default)]
pub struct StaticVersion(pub Option<String>);

impl StaticVersion {
    /// Source that always answers `version`
    pub fn new(version: impl Into<String>) -> Self {
        Self(Some(version.into()))
    }

    /// Source that never has a version
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl VersionSource for StaticVersion {
    fn version_string(&self) -> Option<String> {
        self.0.clone()
    }
}

impl VersionSource for str {
    fn version_string(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<F> VersionSource for F
where
    F: Fn() -> Option<String>,
{
    fn version_string(&self) -> Option<String> {
        self()
    }
}
