#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod builtin;
pub mod code;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod patch;
pub mod report;
pub mod symbol;
pub mod version;

pub use control::{ControlTarget, ControlValue, PatchControl};
pub use engine::{Engine, RestoreSummary};
pub use error::{Error, Result};
pub use lifecycle::PatchModule;
pub use memory::{Address, MemoryImage, RawMemory, Word, WordStore};
pub use patch::{PatchDescriptor, PatchList, PatchOutcome, WordMatcher};
pub use symbol::{SymbolResolver, SymbolTable};
pub use version::{StaticVersion, Version, VersionBound, VersionRange, VersionSource};
