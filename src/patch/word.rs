//! Serde helpers for words in patch tables.
//!
//! Words are written as `"0x8c82001c"` strings, and read from either such a string or a plain JSON number.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

use crate::memory::Word;

/// Accepted representations of a word
#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    /// Plain number
    Number(Word),
    /// Hex string with `0x` prefix
    Hex(String),
}

/// Serializes a word as a hex string
pub fn serialize<S: Serializer>(word: &Word, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{word:#010x}"))
}

/// Deserializes a word from a number or hex string
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Word, D::Error> {
    match Repr::deserialize(deserializer)? {
        Repr::Number(word) => Ok(word),
        Repr::Hex(text) => parse_hex(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid hex word {text:?}"))),
    }
}

/// Parses `0x`-prefixed hex text
fn parse_hex(text: &str) -> Option<Word> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Word::from_str_radix(digits, 16).ok()
}
