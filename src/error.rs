//! # Error
//!
//! Errors reported by the patch engine and its collaborators

use thiserror::Error;

use crate::memory::{Address, MemoryError};

/// Errors that can occur while patching, restoring, or controlling patches
#[derive(Debug, Error)]
pub enum Error {
    /// The version source had nothing to offer, or offered an empty string
    #[error("Version string is unavailable")]
    VersionUnavailable,
    /// The version string does not follow `<major>.<minor>[-<revision>][M]`
    #[error("Unable to parse version string {input:?}: {reason}")]
    VersionParse {
        /// Offending input
        input: String,
        /// What was wrong with it
        reason: &'static str,
    },
    /// A descriptor names a symbol the resolver does not know
    #[error("Unable to locate symbol '{0}'")]
    SymbolNotFound(String),
    /// No word in the search window satisfied a descriptor
    #[error("No instruction to patch found in function '{0}'")]
    NoMatchFound(String),
    /// Writing a patched or original word failed
    #[error("Unable to write word at address {address:#010x}: {source}")]
    WriteFailure {
        /// Target of the write
        address: Address,
        /// Underlying store error
        #[source]
        source: MemoryError,
    },
    /// Control input other than `0` or `1`
    #[error("Invalid control value {0:?}, expected 0 or 1")]
    InvalidControl(String),
    /// Flat patch index past the last descriptor
    #[error("No patch with index {0}")]
    UnknownPatch(usize),
    /// IO error while reading or writing a patch table
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed patch table
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error means the running version could not be determined.
    ///
    /// These errors abort an apply pass before any patch list is considered.
    pub fn is_version_error(&self) -> bool {
        matches!(self, Error::VersionUnavailable | Error::VersionParse { .. })
    }
}
