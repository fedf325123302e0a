//! # Engine
//!
//! The engine owns the patch lists together with the word store they are written to and the resolver their symbols
//! are looked up with. An apply pass reads the running version, picks every list whose range contains it, and applies
//! the enabled descriptors of those lists in declaration order. A restore pass writes back every recorded original
//! word, regardless of versions.

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::memory::WordStore;
use crate::patch::{PatchDescriptor, PatchList, PatchOutcome};
use crate::symbol::SymbolResolver;
use crate::version::{Version, VersionSource};

/// Result of a restore pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Descriptors whose original word was written back
    pub restored: usize,
    /// Descriptors that stayed applied because the write failed
    pub failed: usize,
}

impl RestoreSummary {
    /// Whether every applied descriptor was restored
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Applies and restores patch lists
#[derive(Debug)]
pub struct Engine<S, R> {
    /// Memory the patches are written to
    store: S,
    /// Resolves the symbols named by descriptors
    resolver: R,
    /// Patch lists, in declaration order
    lists: Vec<PatchList>,
    /// Global switch, apply passes do nothing while it is off
    enabled: bool,
    /// Version of the last successful apply pass
    version: Option<Version>,
}

impl<S, R> Engine<S, R>
where
    S: WordStore,
    R: SymbolResolver,
{
    /// Creates an enabled engine. Nothing is applied until [`Engine::apply_all`] is called.
    pub fn new(store: S, resolver: R, lists: Vec<PatchList>) -> Self {
        Self {
            store,
            resolver,
            lists,
            enabled: true,
            version: None,
        }
    }

    /// The word store patches are written to
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the word store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The symbol resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The patch lists
    pub fn lists(&self) -> &[PatchList] {
        &self.lists
    }

    /// Whether apply passes are currently allowed
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Version seen by the last apply pass
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Total number of descriptors across all lists
    pub fn patch_count(&self) -> usize {
        self.lists.iter().map(|list| list.patches.len()).sum()
    }

    /// Number of descriptors currently applied
    pub fn applied_count(&self) -> usize {
        self.lists.iter().map(PatchList::applied_count).sum()
    }

    /// Descriptor at the flat `index`, counting across lists in declaration order
    pub fn patch(&self, index: usize) -> Option<&PatchDescriptor> {
        self.lists
            .iter()
            .flat_map(|list| list.patches.iter())
            .nth(index)
    }

    /// List and position within that list of the flat `index`
    pub(crate) fn locate(&self, index: usize) -> Result<(usize, usize)> {
        let mut remaining = index;
        for (list, patches) in self.lists.iter().map(|list| list.patches.len()).enumerate() {
            if remaining < patches {
                return Ok((list, remaining));
            }
            remaining -= patches;
        }
        Err(Error::UnknownPatch(index))
    }

    /// Reads the running version from `source` and applies every list whose range contains it.
    ///
    /// Returns the number of descriptors written by this pass. If the version can't be determined, nothing is applied
    /// and the error is returned.
    pub fn apply_all<V>(&mut self, source: &V) -> Result<usize>
    where
        V: VersionSource + ?Sized,
    {
        let version = source.version().map_err(|e| {
            error!("Unable to determine the running version, no patches applied: {}", e);
            e
        })?;
        Ok(self.apply_version(&version))
    }

    /// Applies every list whose range contains `version`, returning the number of descriptors written.
    ///
    /// The version is remembered for later passes started from the control surface.
    pub fn apply_version(&mut self, version: &Version) -> usize {
        self.version = Some(*version);
        if !self.enabled {
            debug!("Patching is disabled, nothing applied for version {}", version);
            return 0;
        }

        let mut applied = 0;
        for list in self.lists.iter_mut() {
            if !list.admits(version) {
                debug!(
                    "Skipping '{}', version {} is outside {}",
                    list.name, version, list.range
                );
                continue;
            }
            info!("Applying '{}' for version {}", list.name, version);
            applied += list.apply(&mut self.store, &self.resolver);
        }
        info!("Number of applied patches: {}", applied);
        applied
    }

    /// Applies the descriptor at the flat `index`, ignoring version ranges and switches.
    ///
    /// Unlike list passes, a descriptor that can't be applied is reported as an error.
    pub fn apply_patch(&mut self, index: usize) -> Result<PatchOutcome> {
        let (list, position) = self.locate(index)?;
        let patch = &mut self.lists[list].patches[position];
        match patch.apply(&mut self.store, &self.resolver) {
            PatchOutcome::NotFound => Err(Error::SymbolNotFound(patch.symbol.clone())),
            PatchOutcome::NoMatch => Err(Error::NoMatchFound(patch.symbol.clone())),
            outcome => Ok(outcome),
        }
    }

    /// Restores the descriptor at the flat `index`. Returns `Ok(false)` if it was not applied.
    pub fn restore_patch(&mut self, index: usize) -> Result<bool> {
        let (list, position) = self.locate(index)?;
        self.lists[list].patches[position].restore(&mut self.store)
    }

    /// Writes back the original word of every applied descriptor in every list.
    ///
    /// Failed writes are logged and leave their descriptor applied; the pass continues with the next one.
    pub fn restore_all(&mut self) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        for list in self.lists.iter_mut() {
            for patch in list.patches.iter_mut() {
                match patch.restore(&mut self.store) {
                    Ok(true) => summary.restored += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Unable to reverse patch in '{}': {}", patch.symbol, e);
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }

    /// Turns the global switch on or off without touching memory
    pub(crate) fn set_switch(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Mutable access to the list holding the flat `index` and the position within it
    pub(crate) fn list_of(&mut self, index: usize) -> Result<(&mut PatchList, usize)> {
        let (list, position) = self.locate(index)?;
        Ok((&mut self.lists[list], position))
    }
}
