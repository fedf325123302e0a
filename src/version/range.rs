//! This module contains the version gate deciding which patch lists apply to a version.
//!
//! Bounds may be partially specified: a bound with only a major version constrains only the major version, a bound
//! without a revision leaves the revision unconstrained. An all-zero bound is no bound at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Version;

/// One end of a [`VersionRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VersionBound {
    /// Major version
    #[serde(default)]
    pub major: u32,
    /// Minor version, 0 leaves it unconstrained
    #[serde(default)]
    pub minor: u32,
    /// Revision, 0 leaves it unconstrained
    #[serde(default)]
    pub revision: u32,
}

impl VersionBound {
    /// The all-zero bound, meaning "unbounded"
    pub const UNBOUNDED: Self = Self::new(0, 0, 0);

    /// Creates a bound
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }

    /// Whether this bound leaves its side of the range open
    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }

    /// Whether `version` is at or above this bound, treating it as a lower bound
    pub fn admits_from(&self, version: &Version) -> bool {
        if self.is_unbounded() {
            return true;
        }
        version.major > self.major
            || (version.major == self.major
                && (self.minor == 0
                    || version.minor > self.minor
                    || (version.minor == self.minor
                        && (self.revision == 0 || version.revision >= self.revision))))
    }

    /// Whether `version` is below this bound, treating it as the first version no longer admitted
    pub fn admits_below(&self, version: &Version) -> bool {
        if self.is_unbounded() {
            return true;
        }
        version.major < self.major
            || (version.major == self.major
                && self.minor != 0
                && (version.minor < self.minor
                    || (version.minor == self.minor
                        && self.revision != 0
                        && version.revision < self.revision)))
    }
}

impl From<(u32, u32, u32)> for VersionBound {
    fn from((major, minor, revision): (u32, u32, u32)) -> Self {
        Self::new(major, minor, revision)
    }
}

impl fmt::Display for VersionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            return write!(f, "*");
        }
        write!(f, "{}.{:02}", self.major, self.minor)?;
        if self.revision != 0 {
            write!(f, "-{}", self.revision)?;
        }
        Ok(())
    }
}

/// Versions a patch list may be applied to: from `min` (inclusive) up to `max` (exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VersionRange {
    /// First version the list applies to
    #[serde(default)]
    pub min: VersionBound,
    /// First version the list applies to no more
    #[serde(default)]
    pub max: VersionBound,
}

impl VersionRange {
    /// Range covering every version
    pub const ANY: Self = Self::new(VersionBound::UNBOUNDED, VersionBound::UNBOUNDED);

    /// Creates a range
    pub const fn new(min: VersionBound, max: VersionBound) -> Self {
        Self { min, max }
    }

    /// Range starting at `min` without upper bound
    pub const fn starting_at(min: VersionBound) -> Self {
        Self::new(min, VersionBound::UNBOUNDED)
    }

    /// Whether `version` lies within the range. The dirty flag is ignored.
    pub fn contains(&self, version: &Version) -> bool {
        self.min.admits_from(version) && self.max.admits_below(version)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}
