//! This module contains an owned, bounds-checked word store

use super::{check_alignment, Address, MemoryError, Word, WordStore, WORD_SIZE};

/// A copy of a memory region held in a buffer, placed at a fixed base address.
///
/// Used to run the patch engine against fake images in tests and to dry-run patch tables against dumped code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    /// Address of the first word
    base: Address,
    /// Contents of the region
    words: Vec<Word>,
    /// Whether writes are accepted
    writable: bool,
}

impl MemoryImage {
    /// Creates a writable image of `words` starting at `base`.
    ///
    /// `base` has to be word aligned, otherwise every access is refused as misaligned.
    pub fn new(base: Address, words: Vec<Word>) -> Self {
        Self {
            base,
            words,
            writable: true,
        }
    }

    /// Marks the image as read-only or writable
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Address of the first word
    pub fn base(&self) -> Address {
        self.base
    }

    /// Contents of the image
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Mutable contents of the image, bypassing the read-only flag
    pub fn words_mut(&mut self) -> &mut [Word] {
        &mut self.words
    }

    /// Converts an address into an index into `words`
    fn index(&self, address: Address) -> Result<usize, MemoryError> {
        check_alignment(address)?;
        let offset = address
            .checked_sub(self.base)
            .ok_or(MemoryError::Unmapped(address))?;
        // a misaligned base puts every word off the grid
        if offset % WORD_SIZE != 0 {
            return Err(MemoryError::Misaligned(address));
        }
        let index = offset / WORD_SIZE;
        if index < self.words.len() {
            Ok(index)
        } else {
            Err(MemoryError::Unmapped(address))
        }
    }
}

impl WordStore for MemoryImage {
    fn read_word(&self, address: Address) -> Result<Word, MemoryError> {
        self.index(address).map(|index| self.words[index])
    }

    fn write_word(&mut self, address: Address, word: Word) -> Result<(), MemoryError> {
        let index = self.index(address)?;
        if !self.writable {
            return Err(MemoryError::ReadOnly(address));
        }
        self.words[index] = word;
        Ok(())
    }
}
