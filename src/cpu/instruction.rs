//! Instruction - Opcode cell and per-position provenance flags
//!
//! An instruction is only an index into the instruction set that produced
//! it. Its meaning (handler, NOP modifier, costs) lives in [`InstSet`].
//!
//! ## Flag Layout
//!
//! ```text
//! bit 0  EXECUTED     line ran (or was consumed as an operand/label)
//! bit 1  COPIED       line was written by a copy instruction
//! bit 2  MUTATED      line carries a mutation of any kind
//! bit 3  COPY_MUT     line was mutated during copying
//! bit 4  INJECTED     line arrived through a parasite injection
//! bit 5  BREAKPOINT   host requested a stop at this line
//! ```
//!
//! [`InstSet`]: super::InstSet

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcode stored in genome memory (index into the instruction set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instruction(pub u8);

impl Instruction {
    /// First opcode of every set; also the fill value for resized memory
    pub const DEFAULT: Self = Self(0);

    pub const fn new(op: u8) -> Self {
        Self(op)
    }

    pub const fn op(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Provenance flags attached to each memory position (8 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InstFlags(pub u8);

impl InstFlags {
    pub const EXECUTED: u8 = 0b0000_0001;
    pub const COPIED: u8 = 0b0000_0010;
    pub const MUTATED: u8 = 0b0000_0100;
    pub const COPY_MUT: u8 = 0b0000_1000;
    pub const INJECTED: u8 = 0b0001_0000;
    pub const BREAKPOINT: u8 = 0b0010_0000;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn executed(self) -> bool {
        (self.0 & Self::EXECUTED) != 0
    }

    pub fn copied(self) -> bool {
        (self.0 & Self::COPIED) != 0
    }

    pub fn mutated(self) -> bool {
        (self.0 & Self::MUTATED) != 0
    }

    pub fn copy_mutated(self) -> bool {
        (self.0 & Self::COPY_MUT) != 0
    }

    pub fn injected(self) -> bool {
        (self.0 & Self::INJECTED) != 0
    }

    pub fn breakpoint(self) -> bool {
        (self.0 & Self::BREAKPOINT) != 0
    }

    pub fn set(&mut self, bits: u8) {
        self.0 |= bits;
    }

    pub fn clear(&mut self, bits: u8) {
        self.0 &= !bits;
    }

    pub fn with_executed(mut self) -> Self {
        self.0 |= Self::EXECUTED;
        self
    }

    pub fn with_copied(mut self) -> Self {
        self.0 |= Self::COPIED;
        self
    }

    pub fn with_mutated(mut self) -> Self {
        self.0 |= Self::MUTATED;
        self
    }

    pub fn with_copy_mut(mut self) -> Self {
        self.0 |= Self::COPY_MUT;
        self
    }

    pub fn with_injected(mut self) -> Self {
        self.0 |= Self::INJECTED;
        self
    }
}
