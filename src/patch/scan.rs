//! This module contains the search for a patch site.
//!
//! The search walks the window of `search_limit` words starting `search_start` words past the symbol. At every
//! position it first checks whether the replacement is already in place, then matches the word against the
//! descriptor's matcher, and finally confirms the match with the optional verify check. Nothing is written here.

use tracing::debug;

use super::PatchDescriptor;
use crate::memory::{word_address, Address, Word, WordStore};

/// Result of searching a descriptor's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A word to overwrite was found
    Site {
        /// Address of the word to overwrite
        address: Address,
        /// Its current value
        original: Word,
    },
    /// The replacement is in place already
    Patched {
        /// Address holding the replacement
        address: Address,
        /// The replacement found there
        word: Word,
    },
    /// No position in the window qualified
    Exhausted,
}

impl PatchDescriptor {
    /// Searches the window of this descriptor starting from the symbol address `base`.
    ///
    /// Positions whose words cannot be read count as non-matching, as do verify checks reaching past the end of the
    /// window.
    pub fn scan<S>(&self, store: &S, base: Address) -> Scan
    where
        S: WordStore + ?Sized,
    {
        let Some(cursor) = word_address(base, self.search_start) else {
            return Scan::Exhausted;
        };
        let read = |address: Address| match store.read_word(address) {
            Ok(word) => Some(word),
            Err(e) => {
                debug!("Skipping word at {:#010x} in '{}': {}", address, self.symbol, e);
                None
            }
        };

        // any address overflowing here overflows for every later offset as well
        for offset in 0..self.search_limit {
            let Some(address) = offset
                .checked_add(self.patch_offset)
                .and_then(|index| word_address(cursor, index))
            else {
                break;
            };
            let Some(current) = read(address) else {
                continue;
            };
            if current == self.replacement {
                return Scan::Patched {
                    address,
                    word: current,
                };
            }

            let Some(matched) = word_address(cursor, offset) else {
                break;
            };
            if !read(matched).is_some_and(|word| self.matcher.matches(word)) {
                continue;
            }

            if let Some(verify) = self.verify.filter(|verify| verify.offset != 0) {
                let Some(index) = offset
                    .checked_add(verify.offset)
                    .filter(|&index| index < self.search_limit)
                else {
                    continue;
                };
                let Some(verified) = word_address(cursor, index) else {
                    break;
                };
                if !read(verified).is_some_and(|word| verify.matcher.matches(word)) {
                    continue;
                }
            }

            return Scan::Site {
                address,
                original: current,
            };
        }

        Scan::Exhausted
    }
}
