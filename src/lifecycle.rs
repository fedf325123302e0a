//! # Lifecycle
//!
//! Ties an engine to the load and unload events of whatever hosts it: loading applies every matching patch list once,
//! unloading restores everything that was applied.

use tracing::info;

use crate::control::PatchControl;
use crate::engine::{Engine, RestoreSummary};
use crate::memory::WordStore;
use crate::symbol::SymbolResolver;
use crate::version::VersionSource;

/// An engine together with the source of the running version.
///
/// Dropping a loaded module restores its patches, same as [`PatchModule::on_unload`].
pub struct PatchModule<S, R, V>
where
    S: WordStore,
    R: SymbolResolver,
    V: VersionSource,
{
    /// Engine, shared with control handles
    control: PatchControl<S, R>,
    /// Where the running version is read from
    version_source: V,
    /// Set by `on_load`, cleared once an unload restored everything
    loaded: bool,
}

impl<S, R, V> PatchModule<S, R, V>
where
    S: WordStore,
    R: SymbolResolver,
    V: VersionSource,
{
    /// Creates a module. Nothing is applied until [`PatchModule::on_load`] is called.
    pub fn new(engine: Engine<S, R>, version_source: V) -> Self {
        Self {
            control: PatchControl::new(engine),
            version_source,
            loaded: false,
        }
    }

    /// Handle for controlling the engine while the module is loaded
    pub fn control(&self) -> PatchControl<S, R> {
        self.control.clone()
    }

    /// Whether the module is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Applies every patch list matching the running version, returning the number of patches applied.
    ///
    /// If the version can't be determined, nothing is applied and 0 is returned; the failure is logged.
    pub fn on_load(&mut self) -> usize {
        info!("initialization started");
        self.loaded = true;
        let source = &self.version_source;
        let applied = self
            .control
            .with_engine(|engine| engine.apply_all(source))
            .unwrap_or(0);
        info!("initialization completed, {} patches applied", applied);
        applied
    }

    /// Restores every applied patch, regardless of version or switches.
    ///
    /// The module stays loaded while any restore fails, so a later unload or the drop retries them.
    pub fn on_unload(&mut self) -> RestoreSummary {
        let summary = self.control.with_engine(Engine::restore_all);
        self.loaded = !summary.is_complete();
        info!(
            "unloaded, {} patches reversed, {} failed",
            summary.restored, summary.failed
        );
        summary
    }
}

impl<S, R, V> Drop for PatchModule<S, R, V>
where
    S: WordStore,
    R: SymbolResolver,
    V: VersionSource,
{
    fn drop(&mut self) {
        if self.loaded {
            self.on_unload();
        }
    }
}
