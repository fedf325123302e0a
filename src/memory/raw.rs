//! This module contains the word store for the memory of the running process.
//!
//! It is the only place in the crate which dereferences raw addresses.

use std::ptr;

use region::Protection;

use super::{check_alignment, Address, MemoryError, Word, WordStore, WORD_SIZE};

/// Word store that reads and writes the memory of the current process directly.
///
/// Writes temporarily add write permission to the page containing the target word and revert the permissions afterwards,
/// so read-only code can be patched.
///
/// # Safety
///
/// `RawMemory` cannot tell whether an address is backed by memory. Every address handed to it (directly, or through a
/// [`SymbolResolver`](crate::symbol::SymbolResolver) and the scan windows of the patch descriptors) must be
/// [https://doc.rust-lang.org/stable/std/ptr/index.html#safety](valid) for a word read.
///
/// As always, writing to memory tracked by Rust (`&T` / `&mut T`) through a `RawMemory` can result in undefined behavior.
/// Targets **MUST** be memory not tracked by Rust, or ensured that reading from and writing to them will not trigger undefined behavior.
#[derive(Debug)]
pub struct RawMemory {
    /// Prevents construction outside of [`RawMemory::new`]
    _private: (),
}

impl RawMemory {
    /// Creates a word store for the memory of the current process
    ///
    /// # Safety
    ///
    /// The caller must uphold the contract described on [`RawMemory`] for every address the store is used with
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl WordStore for RawMemory {
    fn read_word(&self, address: Address) -> Result<Word, MemoryError> {
        check_alignment(address)?;
        // Safety: the creator of the store vouches for every address being valid for reads
        Ok(unsafe { ptr::read_volatile(address as *const Word) })
    }

    fn write_word(&mut self, address: Address, word: Word) -> Result<(), MemoryError> {
        check_alignment(address)?;
        let target = address as *mut Word;
        let current = region::query(target as *const Word)?.protection();
        // Safety: the guard reverts the page to `current` once the word has been written
        let _guard = unsafe {
            region::protect_with_handle(target as *const Word, WORD_SIZE, current | Protection::WRITE)
        }?;
        // Safety: the page is writable now, and the creator of the store vouches for the address
        unsafe { ptr::write_volatile(target, word) };
        Ok(())
    }
}
