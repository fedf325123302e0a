//! # Patch
//!
//! This module covers patch descriptors and patch lists, which describe where to look for an instruction word, how to
//! recognize it, and what to overwrite it with. Descriptors remember what they overwrote so they can be restored.

pub mod matcher;
pub mod scan;
pub(crate) mod word;

pub use matcher::WordMatcher;
pub use scan::Scan;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::memory::{Address, Word, WordStore};
use crate::symbol::SymbolResolver;
use crate::version::{Version, VersionRange};

/// Secondary check at a fixed distance from a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verify {
    /// Distance in words from the matched word. 0 disables the check.
    pub offset: usize,
    /// Comparison for the word at `offset`
    #[serde(flatten)]
    pub matcher: WordMatcher,
}

/// Record of an applied patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppliedPatch {
    /// Address of the overwritten word
    pub address: Address,
    /// Word found at `address` before it was overwritten
    pub original: Word,
}

/// State the engine keeps for a descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PatchState {
    /// Address the symbol resolved to during the last apply
    resolved: Option<Address>,
    /// Present while the patch is applied
    applied: Option<AppliedPatch>,
    /// Set through the control surface, disabled patches are skipped by apply passes
    disabled: bool,
}

/// Result of trying to apply a single descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The replacement was written
    Applied {
        /// Address of the overwritten word
        address: Address,
        /// Word found there before
        original: Word,
    },
    /// The replacement was found in place already
    AlreadyApplied {
        /// Address holding the replacement
        address: Address,
    },
    /// The symbol could not be resolved
    NotFound,
    /// No word in the search window qualified, or the write was refused
    NoMatch,
}

impl PatchOutcome {
    /// Whether the outcome wrote to memory
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

/// A single searchable-and-patchable instruction site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchDescriptor {
    /// Symbol the search starts from
    pub symbol: String,
    /// Words to skip past the symbol before the search starts
    #[serde(default)]
    pub search_start: usize,
    /// Maximum number of words to examine
    pub search_limit: usize,
    /// Comparison a word has to pass to be considered a match
    #[serde(rename = "match")]
    pub matcher: WordMatcher,
    /// Optional secondary check confirming a match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Verify>,
    /// Distance in words from the matched word to the word that is overwritten
    #[serde(default)]
    pub patch_offset: usize,
    /// Word written to the patch site
    #[serde(with = "crate::patch::word")]
    pub replacement: Word,
    /// Engine state, never part of a patch table
    #[serde(skip)]
    state: PatchState,
}

impl PatchDescriptor {
    /// Creates a descriptor searching the first `search_limit` words of `symbol` for `matcher`, replacing the matched
    /// word with `replacement`
    pub fn new(
        symbol: impl Into<String>,
        search_limit: usize,
        matcher: WordMatcher,
        replacement: Word,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            search_start: 0,
            search_limit,
            matcher,
            verify: None,
            patch_offset: 0,
            replacement,
            state: PatchState::default(),
        }
    }

    /// Skips `search_start` words past the symbol before searching
    pub fn with_search_start(mut self, search_start: usize) -> Self {
        self.search_start = search_start;
        self
    }

    /// Requires the word `offset` words past a match to pass `matcher` as well. An offset of 0 disables the check.
    pub fn with_verify(mut self, offset: usize, matcher: WordMatcher) -> Self {
        self.verify = (offset != 0).then_some(Verify { offset, matcher });
        self
    }

    /// Overwrites the word `patch_offset` words past the match instead of the match itself
    pub fn with_patch_offset(mut self, patch_offset: usize) -> Self {
        self.patch_offset = patch_offset;
        self
    }

    /// Whether the patch is currently applied
    pub fn is_applied(&self) -> bool {
        self.state.applied.is_some()
    }

    /// Record of the applied patch, if any
    pub fn applied(&self) -> Option<AppliedPatch> {
        self.state.applied
    }

    /// Address the symbol resolved to during the last apply
    pub fn resolved(&self) -> Option<Address> {
        self.state.resolved
    }

    /// Whether apply passes consider this descriptor
    pub fn is_enabled(&self) -> bool {
        !self.state.disabled
    }

    /// Includes or excludes the descriptor from apply passes. This does not touch memory.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.state.disabled = !enabled;
    }

    /// Resolves the symbol, searches for the patch site and overwrites it.
    ///
    /// Applying a descriptor whose replacement is already in place reports [`PatchOutcome::AlreadyApplied`] without
    /// writing anything, so repeated apply passes are harmless.
    pub fn apply<S, R>(&mut self, store: &mut S, resolver: &R) -> PatchOutcome
    where
        S: WordStore + ?Sized,
        R: SymbolResolver + ?Sized,
    {
        let Some(base) = resolver.resolve(&self.symbol) else {
            info!("Unable to locate symbol '{}', patch skipped", self.symbol);
            return PatchOutcome::NotFound;
        };
        self.state.resolved = Some(base);
        info!("Patching function '{}' at address {:#010x}", self.symbol, base);

        match self.scan(&*store, base) {
            Scan::Patched { address, word } => {
                info!(
                    "Found patched instruction ({:#010x}) at address {:#010x}, looks like this patch was applied already or is not necessary",
                    word, address
                );
                PatchOutcome::AlreadyApplied { address }
            }
            Scan::Exhausted => {
                info!(
                    "No instruction to patch found in function '{}', patch skipped",
                    self.symbol
                );
                PatchOutcome::NoMatch
            }
            Scan::Site { address, original } => {
                if let Err(e) = store.write_word(address, self.replacement) {
                    warn!(
                        "Unable to patch function '{}': {}",
                        self.symbol,
                        Error::WriteFailure { address, source: e }
                    );
                    return PatchOutcome::NoMatch;
                }
                self.state.applied = Some(AppliedPatch { address, original });
                info!(
                    "Found instruction to patch ({:#010x}) at address {:#010x}, replaced it with {:#010x}",
                    original, address, self.replacement
                );
                PatchOutcome::Applied { address, original }
            }
        }
    }

    /// Writes the original word back if the patch is applied.
    ///
    /// Returns `Ok(false)` if there was nothing to restore. If the write fails, the patch stays applied.
    pub fn restore<S>(&mut self, store: &mut S) -> Result<bool>
    where
        S: WordStore + ?Sized,
    {
        let Some(applied) = self.state.applied else {
            return Ok(false);
        };
        store
            .write_word(applied.address, applied.original)
            .map_err(|source| Error::WriteFailure {
                address: applied.address,
                source,
            })?;
        self.state.applied = None;
        info!(
            "Reversed patch in '{}' at address {:#010x} to original value {:#010x}",
            self.symbol, applied.address, applied.original
        );
        Ok(true)
    }
}

/// Named, version-gated group of descriptors, applied in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchList {
    /// Name used in messages
    pub name: String,
    /// Versions the list applies to
    #[serde(flatten)]
    pub range: VersionRange,
    /// Descriptors of the list
    pub patches: Vec<PatchDescriptor>,
}

impl PatchList {
    /// Creates a list
    pub fn new(name: impl Into<String>, range: VersionRange, patches: Vec<PatchDescriptor>) -> Self {
        Self {
            name: name.into(),
            range,
            patches,
        }
    }

    /// Whether the list applies to `version`
    pub fn admits(&self, version: &Version) -> bool {
        self.range.contains(version)
    }

    /// Applies every enabled descriptor, returning how many were written
    pub fn apply<S, R>(&mut self, store: &mut S, resolver: &R) -> usize
    where
        S: WordStore + ?Sized,
        R: SymbolResolver + ?Sized,
    {
        self.patches
            .iter_mut()
            .filter(|patch| patch.is_enabled())
            .map(|patch| patch.apply(store, resolver))
            .filter(PatchOutcome::is_applied)
            .count()
    }

    /// Number of descriptors currently applied
    pub fn applied_count(&self) -> usize {
        self.patches.iter().filter(|patch| patch.is_applied()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryError, MemoryImage};
    use crate::symbol::SymbolTable;

    /// Base address of the fake function
    const BASE: Address = 0x8020_0000;

    /// Function body: the load at index 3 is the one to patch, followed by a trap
    fn image() -> MemoryImage {
        MemoryImage::new(
            BASE,
            vec![
                0x27bd_ffe0,
                0xafbf_001c,
                0x0080_8021,
                0x8c82_001c,
                0x0002_0336,
                0x03e0_0008,
                0x0000_0000,
            ],
        )
    }

    fn symbols() -> SymbolTable {
        [("ip_forward", BASE)].into_iter().collect()
    }

    fn descriptor() -> PatchDescriptor {
        PatchDescriptor::new(
            "ip_forward",
            6,
            WordMatcher::new(0xffff_0000, 0x8c82_0000),
            0x2402_0000,
        )
    }

    #[test]
    /// Test patch and revert functionality
    fn test_apply_restore() {
        let mut image = image();
        let mut patch = descriptor();

        let outcome = patch.apply(&mut image, &symbols());
        assert_eq!(
            outcome,
            PatchOutcome::Applied {
                address: BASE + 12,
                original: 0x8c82_001c
            }
        );
        assert!(patch.is_applied());
        assert_eq!(patch.resolved(), Some(BASE));
        assert_eq!(image.words()[3], 0x2402_0000);

        assert!(patch.restore(&mut image).unwrap());
        assert!(!patch.is_applied());
        assert_eq!(image, self::image());

        // nothing left to restore
        assert!(!patch.restore(&mut image).unwrap());
        assert_eq!(image, self::image());
    }

    #[test]
    /// Applying twice leaves the image as applying once
    fn test_apply_twice() {
        let mut image = image();
        let mut patch = descriptor();
        let symbols = symbols();

        assert!(patch.apply(&mut image, &symbols).is_applied());
        let once = image.clone();

        assert_eq!(
            patch.apply(&mut image, &symbols),
            PatchOutcome::AlreadyApplied { address: BASE + 12 }
        );
        assert_eq!(image, once);
        assert_eq!(
            patch.applied(),
            Some(AppliedPatch {
                address: BASE + 12,
                original: 0x8c82_001c
            })
        );
    }

    #[test]
    fn test_symbol_not_found() {
        let mut image = image();
        let mut patch = descriptor();
        assert_eq!(
            patch.apply(&mut image, &SymbolTable::new()),
            PatchOutcome::NotFound
        );
        assert_eq!(patch.resolved(), None);
        assert_eq!(image, self::image());
    }

    #[test]
    fn test_no_match() {
        let mut image = image();
        let mut patch = PatchDescriptor::new(
            "ip_forward",
            6,
            WordMatcher::new(0xffff_0000, 0x8c84_0000),
            0x2402_0000,
        );
        assert_eq!(patch.apply(&mut image, &symbols()), PatchOutcome::NoMatch);
        assert!(!patch.is_applied());
        assert_eq!(image, self::image());
    }

    #[test]
    /// A refused write leaves the descriptor unapplied
    fn test_write_failure() {
        let mut image = image();
        image.set_writable(false);
        let mut patch = descriptor();
        assert_eq!(patch.apply(&mut image, &symbols()), PatchOutcome::NoMatch);
        assert!(!patch.is_applied());
        assert_eq!(image.words(), self::image().words());
    }

    #[test]
    /// A refused restore keeps the record so it can be retried
    fn test_restore_failure() {
        let mut image = image();
        let mut patch = descriptor();
        assert!(patch.apply(&mut image, &symbols()).is_applied());

        image.set_writable(false);
        assert!(matches!(
            patch.restore(&mut image),
            Err(Error::WriteFailure {
                address,
                source: MemoryError::ReadOnly(_)
            }) if address == BASE + 12
        ));
        assert!(patch.is_applied());

        image.set_writable(true);
        assert!(patch.restore(&mut image).unwrap());
        assert_eq!(image, self::image());
    }

    #[test]
    fn test_zero_verify_offset_is_no_verify() {
        let patch = descriptor().with_verify(0, WordMatcher::exact(0x36));
        assert_eq!(patch.verify, None);
    }

    #[test]
    /// Disabled descriptors are skipped by lists
    fn test_list_skips_disabled() {
        let mut image = image();
        let mut list = PatchList::new("test", VersionRange::ANY, vec![descriptor()]);
        list.patches[0].set_enabled(false);
        assert_eq!(list.apply(&mut image, &symbols()), 0);
        assert_eq!(image, self::image());

        list.patches[0].set_enabled(true);
        assert_eq!(list.apply(&mut image, &symbols()), 1);
        assert_eq!(list.applied_count(), 1);
    }
}
