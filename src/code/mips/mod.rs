//! MIPS32 instruction encodings
//!
//! Only the handful of instructions needed by the built-in patch tables are covered.

use crate::memory::Word;
use crate::patch::WordMatcher;

/// `sll zero, zero, 0`, which does nothing
pub const NOP: Word = 0x0000_0000;
/// Add an immediate value to RS and store the result in RT
pub const ADDIU: Word = 0x2400_0000;
/// Load a word from BASE + offset into RT
pub const LW: Word = 0x8c00_0000;
/// Trap if RS is not equal to RT
pub const TNE: Word = 0x0000_0036;

/// Base register bits (21 to 25)
pub const BASE_MASK: Word = 0x03e0_0000;
/// RS register bits, same position as BASE
pub const RS_MASK: Word = BASE_MASK;
/// RT register bits (16 to 20)
pub const RT_MASK: Word = 0x001f_0000;
/// 16-bit immediate or offset
pub const IMMEDIATE_MASK: Word = 0x0000_ffff;
/// Trap code bits (6 to 15)
pub const CODE_MASK: Word = 0x0000_ffc0;

/// Shift of the BASE / RS register field
pub const RS_SHIFT: u32 = 21;
/// Shift of the RT register field
pub const RT_SHIFT: u32 = 16;
/// Shift of the trap code field
pub const CODE_SHIFT: u32 = 6;

/// General purpose registers
#[allow(clippy::missing_docs_in_private_items, missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    Zero = 0,
    At = 1,
    V0 = 2,
    V1 = 3,
    A0 = 4,
    A1 = 5,
    A2 = 6,
    A3 = 7,
    Sp = 29,
    Ra = 31,
}

impl Register {
    /// Register number
    pub const fn number(self) -> Word {
        self as Word
    }
}

/// Places `register` in the RT field
const fn rt_field(register: Register) -> Word {
    (register.number() << RT_SHIFT) & RT_MASK
}

/// `lw rt, offset(base)`
pub const fn lw(rt: Register, offset: u16, base: Register) -> Word {
    LW | ((base.number() << RS_SHIFT) & BASE_MASK) | rt_field(rt) | (offset as Word & IMMEDIATE_MASK)
}

/// `addiu rt, rs, immediate`
pub const fn addiu(rt: Register, rs: Register, immediate: u16) -> Word {
    ADDIU | ((rs.number() << RS_SHIFT) & RS_MASK) | rt_field(rt) | (immediate as Word & IMMEDIATE_MASK)
}

/// `tne rs, rt, code`. Only the low 10 bits of `code` are encoded.
pub const fn tne(rs: Register, rt: Register, code: u16) -> Word {
    TNE | ((rs.number() << RS_SHIFT) & RS_MASK)
        | rt_field(rt)
        | (((code as Word) << CODE_SHIFT) & CODE_MASK)
}

/// Matcher for `word` that accepts any RT register
pub const fn any_rt(word: Word) -> WordMatcher {
    WordMatcher::new(!RT_MASK, word & !RT_MASK)
}
