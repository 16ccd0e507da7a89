//! Genome Memory - Resizable instruction sequence with provenance flags
//!
//! `Genome` is the plain inheritable sequence handed between parent and
//! child. `GenomeMemory` is the working copy a hardware executes: it pairs
//! every line with [`InstFlags`] and keeps lines cut off by a divide so a
//! necrotic allocation can reuse them.

use super::instruction::{InstFlags, Instruction};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, Range};

/// Inheritable instruction sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Genome(Vec<Instruction>);

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_vec_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.0
    }

    pub fn into_vec(self) -> Vec<Instruction> {
        self.0
    }
}

impl Deref for Genome {
    type Target = [Instruction];

    fn deref(&self) -> &[Instruction] {
        &self.0
    }
}

impl From<Vec<Instruction>> for Genome {
    fn from(insts: Vec<Instruction>) -> Self {
        Self(insts)
    }
}

impl From<&[Instruction]> for Genome {
    fn from(insts: &[Instruction]) -> Self {
        Self(insts.to_vec())
    }
}

impl FromIterator<Instruction> for Genome {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Executable memory owned by one hardware
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeMemory {
    insts: Vec<Instruction>,
    flags: Vec<InstFlags>,
    /// Lines removed from the tail, oldest first.
    freed: Vec<Instruction>,
}

impl GenomeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_genome(genome: &Genome) -> Self {
        Self {
            insts: genome.to_vec(),
            flags: vec![InstFlags::empty(); genome.len()],
            freed: Vec::new(),
        }
    }

    /// Rebuild from raw parts (checkpoint restore)
    pub fn from_parts(insts: Vec<Instruction>, flags: Vec<InstFlags>) -> Option<Self> {
        if insts.len() != flags.len() {
            return None;
        }
        Some(Self {
            insts,
            flags,
            freed: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn insts(&self) -> &[Instruction] {
        &self.insts
    }

    pub fn all_flags(&self) -> &[InstFlags] {
        &self.flags
    }

    pub fn to_genome(&self) -> Genome {
        Genome(self.insts.clone())
    }

    /// Instruction at `pos`; out-of-range reads yield the default opcode.
    pub fn get(&self, pos: usize) -> Instruction {
        self.insts.get(pos).copied().unwrap_or_default()
    }

    pub fn set(&mut self, pos: usize, inst: Instruction) {
        if let Some(slot) = self.insts.get_mut(pos) {
            *slot = inst;
        }
    }

    pub fn flags(&self, pos: usize) -> InstFlags {
        self.flags.get(pos).copied().unwrap_or_default()
    }

    pub fn set_flags(&mut self, pos: usize, bits: u8) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.set(bits);
        }
    }

    pub fn clear_flags_at(&mut self, pos: usize, bits: u8) {
        if let Some(f) = self.flags.get_mut(pos) {
            f.clear(bits);
        }
    }

    /// Clear `bits` on every line
    pub fn clear_flags(&mut self, bits: u8) {
        for f in &mut self.flags {
            f.clear(bits);
        }
    }

    /// Lines in `range` carrying every bit of `bits`
    pub fn count_flag(&self, range: Range<usize>, bits: u8) -> usize {
        let end = range.end.min(self.flags.len());
        let start = range.start.min(end);
        self.flags[start..end]
            .iter()
            .filter(|f| f.0 & bits == bits)
            .count()
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Grow or shrink, filling new lines with the default opcode.
    pub fn resize(&mut self, new_len: usize) {
        self.resize_with(new_len, |_| Instruction::DEFAULT);
    }

    /// Grow or shrink, filling new lines from `fill(index)`.
    pub fn resize_with<F: FnMut(usize) -> Instruction>(&mut self, new_len: usize, mut fill: F) {
        if new_len < self.insts.len() {
            self.truncate(new_len);
            return;
        }
        for i in self.insts.len()..new_len {
            self.insts.push(fill(i));
            self.flags.push(InstFlags::empty());
        }
    }

    /// Grow by first reusing freed lines, then `fill(index)` once they run out.
    pub fn resize_old<F: FnMut(usize) -> Instruction>(&mut self, new_len: usize, mut fill: F) {
        if new_len < self.insts.len() {
            self.truncate(new_len);
            return;
        }
        let reuse = (new_len - self.insts.len()).min(self.freed.len());
        let reclaimed: Vec<Instruction> = self.freed.drain(..reuse).collect();
        for inst in reclaimed {
            self.insts.push(inst);
            self.flags.push(InstFlags::empty());
        }
        self.resize_with(new_len, &mut fill);
    }

    /// Drop the tail past `new_len`, keeping it for necrotic reuse.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.insts.len() {
            return;
        }
        let cut: Vec<Instruction> = self.insts.drain(new_len..).collect();
        self.flags.truncate(new_len);
        self.freed.splice(0..0, cut);
    }

    pub fn insert(&mut self, pos: usize, inst: Instruction, flags: InstFlags) {
        let pos = pos.min(self.insts.len());
        self.insts.insert(pos, inst);
        self.flags.insert(pos, flags);
    }

    pub fn insert_slice(&mut self, pos: usize, insts: &[Instruction], flags: InstFlags) {
        let pos = pos.min(self.insts.len());
        self.insts.splice(pos..pos, insts.iter().copied());
        self.flags
            .splice(pos..pos, std::iter::repeat(flags).take(insts.len()));
    }

    pub fn remove(&mut self, pos: usize) -> Option<Instruction> {
        if pos >= self.insts.len() {
            return None;
        }
        self.flags.remove(pos);
        Some(self.insts.remove(pos))
    }

    /// Remove `range` and return it as a genome
    pub fn remove_range(&mut self, range: Range<usize>) -> Genome {
        let end = range.end.min(self.insts.len());
        let start = range.start.min(end);
        self.flags.drain(start..end);
        Genome(self.insts.drain(start..end).collect())
    }

    /// Copy of `range` (memory unchanged)
    pub fn crop(&self, range: Range<usize>) -> Genome {
        let end = range.end.min(self.insts.len());
        let start = range.start.min(end);
        Genome(self.insts[start..end].to_vec())
    }

    /// Replace the whole content, resetting flags
    pub fn replace(&mut self, genome: &Genome) {
        self.insts = genome.to_vec();
        self.flags = vec![InstFlags::empty(); genome.len()];
    }

    pub fn freed_len(&self) -> usize {
        self.freed.len()
    }

    /// Lines awaiting necrotic reuse, next to be reclaimed first
    pub fn freed(&self) -> &[Instruction] {
        &self.freed
    }

    pub fn with_freed(mut self, freed: Vec<Instruction>) -> Self {
        self.freed = freed;
        self
    }
}
