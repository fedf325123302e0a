//! # Memory
//!
//! This module covers word stores, which are the only way the patch engine reads and writes memory

pub mod image;
pub mod raw;

pub use image::MemoryImage;
pub use raw::RawMemory;

use thiserror::Error;

/// A single instruction word. Patterns assume a fixed 32-bit width in native endianness.
pub type Word = u32;

/// Byte address of a word
pub type Address = usize;

/// Size of a [`Word`] in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Errors when accessing a word store
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Error when querying or setting memory protections
    #[error("Error setting memory protections: {0}")]
    ProtectionError(#[from] region::Error),
    /// Address is not aligned to the word size
    #[error("Address {0:#010x} is not word aligned")]
    Misaligned(Address),
    /// Address lies outside of the store
    #[error("Address {0:#010x} is not mapped")]
    Unmapped(Address),
    /// Store refuses writes
    #[error("Address {0:#010x} is read-only")]
    ReadOnly(Address),
}

/// Word-addressable memory that patches are searched in and written to
pub trait WordStore {
    /// Reads the word at `address`
    fn read_word(&self, address: Address) -> Result<Word, MemoryError>;
    /// Overwrites the word at `address` with `word`
    fn write_word(&mut self, address: Address, word: Word) -> Result<(), MemoryError>;
}

impl<S: WordStore + ?Sized> WordStore for &mut S {
    fn read_word(&self, address: Address) -> Result<Word, MemoryError> {
        (**self).read_word(address)
    }

    fn write_word(&mut self, address: Address, word: Word) -> Result<(), MemoryError> {
        (**self).write_word(address, word)
    }
}

/// Returns the address of the word `index` words past `base`, or `None` on overflow
pub fn word_address(base: Address, index: usize) -> Option<Address> {
    index
        .checked_mul(WORD_SIZE)
        .and_then(|offset| base.checked_add(offset))
}

/// Checks that `address` is word aligned
pub(crate) fn check_alignment(address: Address) -> Result<(), MemoryError> {
    if address % WORD_SIZE == 0 {
        Ok(())
    } else {
        Err(MemoryError::Misaligned(address))
    }
}
