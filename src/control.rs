//! # Control
//!
//! Switches for the whole engine and for single patches. Writing `0` restores, writing `1` applies again.
//!
//! [`PatchControl`] shares an engine between the context that loaded it and any number of controlling contexts.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::engine::{Engine, RestoreSummary};
use crate::error::{Error, Result};
use crate::memory::WordStore;
use crate::report::StatusReport;
use crate::symbol::SymbolResolver;

/// Value written to a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlValue {
    /// `0`: disable and restore
    Off,
    /// `1`: enable and apply
    On,
}

impl ControlValue {
    /// Whether this value switches something on
    pub fn is_on(self) -> bool {
        self == ControlValue::On
    }
}

impl FromStr for ControlValue {
    type Err = Error;

    /// Accepts `0` and `1`, ignoring surrounding whitespace such as a trailing newline
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(ControlValue::Off),
            "1" => Ok(ControlValue::On),
            _ => Err(Error::InvalidControl(s.to_string())),
        }
    }
}

impl From<bool> for ControlValue {
    fn from(on: bool) -> Self {
        if on {
            ControlValue::On
        } else {
            ControlValue::Off
        }
    }
}

/// What a control value is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTarget {
    /// The global switch
    Global,
    /// The descriptor at a flat index
    Patch(usize),
}

impl<S, R> Engine<S, R>
where
    S: WordStore,
    R: SymbolResolver,
{
    /// Parses `input` and applies it to `target`
    pub fn write_control(&mut self, target: ControlTarget, input: &str) -> Result<()> {
        let value: ControlValue = input.parse()?;
        match target {
            ControlTarget::Global => {
                self.set_enabled(value.is_on());
                Ok(())
            }
            ControlTarget::Patch(index) => self.set_patch_enabled(index, value.is_on()),
        }
    }

    /// Turns the global switch on or off.
    ///
    /// Turning it off restores every applied patch. Turning it on runs an apply pass with the last known version, if
    /// there is one. Returns the summary of the restore pass, or an empty summary when switching on.
    pub fn set_enabled(&mut self, enabled: bool) -> RestoreSummary {
        if !enabled {
            let summary = self.restore_all();
            self.set_switch(false);
            info!(
                "Patching disabled, {} patches reversed, {} failed",
                summary.restored, summary.failed
            );
            return summary;
        }

        self.set_switch(true);
        info!("Patching enabled");
        if let Some(version) = self.version() {
            self.apply_version(&version);
        }
        RestoreSummary::default()
    }

    /// Enables or disables the descriptor at the flat `index`.
    ///
    /// Disabling restores the patch. Enabling applies it right away if the global switch is on and its list admits the
    /// last known version; a patch that can't be applied then is reported as an error, but stays enabled.
    pub fn set_patch_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        let switched_on = self.is_enabled();
        let version = self.version();
        let (list, position) = self.list_of(index)?;
        list.patches[position].set_enabled(enabled);

        if !enabled {
            self.restore_patch(index)?;
            info!("Patch {} disabled", index);
            return Ok(());
        }

        info!("Patch {} enabled", index);
        let admitted = version.is_some_and(|version| list.admits(&version));
        if switched_on && admitted {
            self.apply_patch(index)?;
        }
        Ok(())
    }
}

/// Shared handle to an engine.
///
/// Every operation locks the engine for its whole duration, so apply and restore passes never interleave.
#[derive(Debug)]
pub struct PatchControl<S, R> {
    /// The shared engine
    engine: Arc<Mutex<Engine<S, R>>>,
}

impl<S, R> Clone for PatchControl<S, R> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S, R> PatchControl<S, R>
where
    S: WordStore,
    R: SymbolResolver,
{
    /// Takes ownership of `engine`
    pub fn new(engine: Engine<S, R>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Writes `input` to `target`
    pub fn write(&self, target: ControlTarget, input: &str) -> Result<()> {
        self.engine.lock().write_control(target, input)
    }

    /// Snapshot of the engine state
    pub fn status(&self) -> StatusReport {
        self.engine.lock().status()
    }

    /// Runs `f` with exclusive access to the engine
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut Engine<S, R>) -> T) -> T {
        f(&mut self.engine.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::memory::{Address, MemoryImage, Word};
    use crate::patch::{PatchDescriptor, PatchList, WordMatcher};
    use crate::symbol::SymbolTable;
    use crate::version::{Version, VersionBound, VersionRange};

    /// Base address of the fake image
    const BASE: Address = 0x8030_0000;

    fn words() -> Vec<Word> {
        vec![0x8c82_001c, 0x03e0_0008, 0x8c84_001c, 0x03e0_0008]
    }

    fn engine() -> Engine<MemoryImage, SymbolTable> {
        let patch = |symbol: &str| {
            PatchDescriptor::new(symbol, 2, WordMatcher::new(0xffe0_ffff, 0x8c80_001c), 0x2402_0000)
        };
        Engine::new(
            MemoryImage::new(BASE, words()),
            [("ip_forward", BASE), ("ip6_forward", BASE + 8)]
                .into_iter()
                .collect(),
            vec![
                PatchList::new(
                    "current",
                    VersionRange::starting_at(VersionBound::new(7, 8, 0)),
                    vec![patch("ip_forward")],
                ),
                PatchList::new(
                    "legacy",
                    VersionRange::new(VersionBound::new(6, 98, 0), VersionBound::new(7, 8, 0)),
                    vec![patch("ip6_forward")],
                ),
            ],
        )
    }

    #[test]
    fn test_parse_value() {
        assert_eq!("0".parse::<ControlValue>().unwrap(), ControlValue::Off);
        assert_eq!("1\n".parse::<ControlValue>().unwrap(), ControlValue::On);
        assert_eq!(" 1 ".parse::<ControlValue>().unwrap(), ControlValue::On);
        assert_eq!(ControlValue::from(false), ControlValue::Off);
        for input in ["", "2", "on", "01", "-1", "1 1"] {
            assert!(
                matches!(input.parse::<ControlValue>(), Err(Error::InvalidControl(s)) if s == input),
                "{:?} accepted",
                input
            );
        }
    }

    #[test]
    /// Disabling a patch restores it, enabling it applies it again
    fn test_patch_toggle() {
        let mut engine = engine();
        assert_eq!(engine.apply_all("7.10").unwrap(), 1);
        assert_eq!(engine.store().words()[0], 0x2402_0000);

        engine.write_control(ControlTarget::Patch(0), "0\n").unwrap();
        assert!(!engine.patch(0).unwrap().is_enabled());
        assert_eq!(engine.store().words(), words());

        // disabled patches are skipped by apply passes
        assert_eq!(engine.apply_all("7.10").unwrap(), 0);
        assert_eq!(engine.store().words(), words());

        engine.write_control(ControlTarget::Patch(0), "1").unwrap();
        assert!(engine.patch(0).unwrap().is_applied());
        assert_eq!(engine.store().words()[0], 0x2402_0000);
    }

    #[test]
    /// Enabling a patch whose list does not admit the running version leaves memory alone
    fn test_enable_outside_range() {
        let mut engine = engine();
        engine.apply_version(&Version::new(7, 10, 0));
        engine.write_control(ControlTarget::Patch(1), "0").unwrap();
        engine.write_control(ControlTarget::Patch(1), "1").unwrap();
        assert!(engine.patch(1).unwrap().is_enabled());
        assert!(!engine.patch(1).unwrap().is_applied());
        assert_eq!(engine.store().words()[2], 0x8c84_001c);
    }

    #[test]
    fn test_global_toggle() {
        let mut engine = engine();
        engine.apply_all("7.8").unwrap();
        assert_eq!(engine.applied_count(), 1);

        engine.write_control(ControlTarget::Global, "0").unwrap();
        assert!(!engine.is_enabled());
        assert_eq!(engine.applied_count(), 0);
        assert_eq!(engine.store().words(), words());

        // enabling a single patch does not bypass the global switch
        engine.write_control(ControlTarget::Patch(0), "1").unwrap();
        assert_eq!(engine.applied_count(), 0);

        engine.write_control(ControlTarget::Global, "1").unwrap();
        assert!(engine.is_enabled());
        assert_eq!(engine.applied_count(), 1);
        assert_eq!(engine.store().words()[0], 0x2402_0000);
    }

    #[test]
    fn test_invalid_writes() {
        let mut engine = engine();
        assert!(matches!(
            engine.write_control(ControlTarget::Global, "yes"),
            Err(Error::InvalidControl(_))
        ));
        assert!(engine.is_enabled());
        assert!(matches!(
            engine.write_control(ControlTarget::Patch(2), "1"),
            Err(Error::UnknownPatch(2))
        ));
    }

    #[test]
    /// A control handle used from another thread sees and changes the same engine
    fn test_shared_control() {
        let control = PatchControl::new(engine());
        assert_eq!(control.with_engine(|engine| engine.apply_all("7.8")).unwrap(), 1);

        let remote = control.clone();
        thread::spawn(move || remote.write(ControlTarget::Global, "0\n"))
            .join()
            .unwrap()
            .unwrap();

        let status = control.status();
        assert!(!status.enabled);
        assert_eq!(status.applied_count, 0);
        control.with_engine(|engine| assert_eq!(engine.store().words(), words()));
    }
}
