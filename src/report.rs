//! # Report
//!
//! Read-only snapshots of the engine state, for status displays and for serializing to JSON

use std::fmt;

use serde::Serialize;

use crate::engine::Engine;
use crate::memory::{Address, Word, WordStore};
use crate::patch::PatchDescriptor;
use crate::symbol::SymbolResolver;
use crate::version::VersionBound;

/// State of the whole engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Global switch
    pub enabled: bool,
    /// Version of the last apply pass
    pub version: Option<String>,
    /// Total number of descriptors
    pub patch_count: usize,
    /// Number of descriptors currently applied
    pub applied_count: usize,
    /// Per list state
    pub lists: Vec<ListReport>,
}

/// State of a single patch list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListReport {
    /// Name of the list
    pub name: String,
    /// Lower bound of the list's range
    pub min: VersionBound,
    /// Upper bound of the list's range
    pub max: VersionBound,
    /// Descriptors of the list
    pub patches: Vec<PatchReport>,
}

/// State of a single descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Flat index, usable with the control surface
    pub index: usize,
    /// Symbol the patch is searched in
    pub function: String,
    /// Whether apply passes consider the descriptor
    pub enabled: bool,
    /// Whether the patch is in place
    pub applied: bool,
    /// Address the symbol resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<Address>,
    /// Patched address, while applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Overwritten word, while applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Word>,
    /// Word written by the patch
    pub replacement: Word,
}

impl PatchReport {
    /// Snapshot of `patch` at the flat `index`
    fn new(index: usize, patch: &PatchDescriptor) -> Self {
        let applied = patch.applied();
        Self {
            index,
            function: patch.symbol.clone(),
            enabled: patch.is_enabled(),
            applied: applied.is_some(),
            resolved: patch.resolved(),
            address: applied.map(|applied| applied.address),
            original: applied.map(|applied| applied.original),
            replacement: patch.replacement,
        }
    }
}

impl<S, R> Engine<S, R>
where
    S: WordStore,
    R: SymbolResolver,
{
    /// Takes a snapshot of the current state
    pub fn status(&self) -> StatusReport {
        let mut index = 0;
        let lists = self
            .lists()
            .iter()
            .map(|list| ListReport {
                name: list.name.clone(),
                min: list.range.min,
                max: list.range.max,
                patches: list
                    .patches
                    .iter()
                    .map(|patch| {
                        let report = PatchReport::new(index, patch);
                        index += 1;
                        report
                    })
                    .collect(),
            })
            .collect();

        StatusReport {
            enabled: self.is_enabled(),
            version: self.version().map(|version| version.to_string()),
            patch_count: self.patch_count(),
            applied_count: self.applied_count(),
            lists,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "patching {}, {} of {} patches applied",
            if self.enabled { "enabled" } else { "disabled" },
            self.applied_count,
            self.patch_count
        )?;
        for list in &self.lists {
            writeln!(f, "{} [{}, {})", list.name, list.min, list.max)?;
            for patch in &list.patches {
                writeln!(f, "  {}", patch)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {:<24} {}",
            self.index,
            self.function,
            if self.enabled { 1 } else { 0 }
        )?;
        match (self.address, self.original) {
            (Some(address), Some(original)) => write!(
                f,
                " {:#010x} {:#010x} -> {:#010x}",
                address, original, self.replacement
            ),
            _ => write!(f, " not applied"),
        }
    }
}
