//! This module contains the masked comparison used to recognize instruction words

use serde::{Deserialize, Serialize};

use crate::memory::Word;

/// Mask/bits pair a word is compared against.
///
/// A word matches if `((word & mask) | set_bits) == bits`. Bits outside of `mask` never influence the result unless
/// they are forced by `set_bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordMatcher {
    /// Bits of the word that take part in the comparison
    #[serde(with = "crate::patch::word")]
    pub mask: Word,
    /// Expected value after masking
    #[serde(with = "crate::patch::word")]
    pub bits: Word,
    /// Bits forced on after masking, normally 0
    #[serde(with = "crate::patch::word", default, skip_serializing_if = "is_zero")]
    pub set_bits: Word,
}

/// Used to keep `set_bits` out of tables that do not use it
fn is_zero(word: &Word) -> bool {
    *word == 0
}

impl WordMatcher {
    /// Matcher comparing the bits selected by `mask` against `bits`
    pub const fn new(mask: Word, bits: Word) -> Self {
        Self {
            mask,
            bits,
            set_bits: 0,
        }
    }

    /// Matcher accepting only `word` itself
    pub const fn exact(word: Word) -> Self {
        Self::new(Word::MAX, word)
    }

    /// Forces `set_bits` on after masking
    pub const fn with_set_bits(mut self, set_bits: Word) -> Self {
        self.set_bits = set_bits;
        self
    }

    /// Whether `word` matches
    pub fn matches(&self, word: Word) -> bool {
        ((word & self.mask) | self.set_bits) == self.bits
    }
}
