//! # Code
//!
//! Instruction encodings used to describe patch sites

pub mod mips;
