//! Promoters - Regulated execution restart points
//!
//! Every `promoter` line in memory is a place execution may restart from
//! after `terminate`. Each one carries a bit code read from the lines that
//! follow it (bit i is the low opcode bit of line `pos + 1 + i`) and a
//! regulation mask the organism writes with `regulate`. A promoter is
//! active when enough bits of `code ^ mask`, inside the current window,
//! are set.
//!
//! The window slides by `exe_length` bits on every terminate, so a
//! promoter that failed one round may fire the next.

use super::{Hardware, StepResult};
use crate::config::{NoActivePromoterEffect, PromoterConfig};
use crate::cpu::head::HeadKind;
use crate::cpu::library::InstFunction;
use crate::cpu::thread::{next_register, REG_BX};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promoter {
    /// Line of the `promoter` instruction
    pub pos: usize,
    pub bit_code: u32,
    pub regulation: u32,
}

impl Promoter {
    pub fn regulated_code(&self) -> u32 {
        self.bit_code ^ self.regulation
    }

    /// Set bits of the regulated code in the window starting at `offset`
    pub fn window_bits(&self, offset: usize, config: &PromoterConfig) -> usize {
        let code = self.regulated_code();
        (0..config.exe_length)
            .filter(|i| (code >> ((offset + i) % config.code_size)) & 1 == 1)
            .count()
    }

    pub fn is_active(&self, offset: usize, config: &PromoterConfig) -> bool {
        self.window_bits(offset, config) >= config.exe_threshold
    }
}

/// Bits of a promoter code
fn code_mask(code_size: usize) -> u32 {
    if code_size >= 32 {
        u32::MAX
    } else {
        (1u32 << code_size) - 1
    }
}

impl Hardware {
    /// Promoters found at the last recompute
    pub fn promoters(&self) -> &[Promoter] {
        &self.promoters
    }

    /// Position in the promoter list (-1 before the first terminate) and
    /// the current window offset
    pub fn promoter_cursor(&self) -> (i32, usize) {
        (self.promoter_index, self.promoter_offset)
    }

    fn promoter_code(&self, pos: usize) -> u32 {
        let len = self.memory.len();
        (0..self.config.promoters.code_size).fold(0u32, |code, i| {
            let bit = (self.memory.get((pos + 1 + i) % len).op() & 1) as u32;
            code | (bit << i)
        })
    }

    /// Rebuild the promoter list after memory changed. Regulation masks
    /// survive on promoters that kept their line.
    pub(super) fn refresh_promoters(&mut self) {
        if !self.promoters_dirty {
            return;
        }
        self.promoters_dirty = false;

        let Some(marker) = self.inst_set.find(InstFunction::Promoter) else {
            self.promoters.clear();
            return;
        };
        let fresh: Vec<Promoter> = self
            .memory
            .insts()
            .iter()
            .enumerate()
            .filter(|(_, inst)| **inst == marker)
            .map(|(pos, _)| Promoter {
                pos,
                bit_code: self.promoter_code(pos),
                regulation: self
                    .promoters
                    .iter()
                    .find(|p| p.pos == pos)
                    .map_or(0, |p| p.regulation),
            })
            .collect();
        self.promoters = fresh;
        if self.promoter_index >= self.promoters.len() as i32 {
            self.promoter_index = -1;
        }
    }

    /// Move the current thread to the next active promoter.
    ///
    /// Each promoter after the current one is tried once, wrapping round
    /// to the current one last. With none active the configured
    /// `no_active_effect` applies: restart at line 0, mark the organism to
    /// die, or leave the IP where it is.
    pub(super) fn terminate(&mut self) {
        self.refresh_promoters();
        let config = Arc::clone(&self.config);
        let p = &config.promoters;

        if p.terminate_resets_thread {
            let read = *self.thread().head(HeadKind::Read);
            let write = *self.thread().head(HeadKind::Write);
            let thread = self.thread_mut();
            thread.reset();
            *thread.head_mut(HeadKind::Read) = read;
            *thread.head_mut(HeadKind::Write) = write;
        }

        let n = self.promoters.len();
        let offset = self.promoter_offset;
        let found = (1..=n)
            .map(|step| (self.promoter_index + step as i32).rem_euclid(n as i32) as usize)
            .find(|&i| self.promoters[i].is_active(offset, p));
        self.promoter_offset = (offset + p.exe_length) % p.code_size;

        match found {
            Some(i) => {
                self.promoter_index = i as i32;
                let pos = self.promoters[i].pos;
                self.set_head(HeadKind::Ip, pos as i64);
                log::trace!("terminate: thread {} restarts at promoter line {}", self.thread().id, pos);
            }
            None => {
                log::debug!("terminate: no active promoter ({:?})", p.no_active_effect);
                match p.no_active_effect {
                    NoActivePromoterEffect::RestartAtZero => {
                        self.promoter_index = -1;
                        self.set_head(HeadKind::Ip, 0);
                    }
                    NoActivePromoterEffect::Kill => self.to_die = true,
                    NoActivePromoterEffect::Stop => {}
                }
            }
        }
        self.thread_mut().promoter_inst_executed = 0;
    }

    /// `regulate`: every promoter takes `?BX?` as its mask.
    pub(super) fn inst_regulate(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let mask = self.register(reg) as u32 & code_mask(self.config.promoters.code_size);
        self.refresh_promoters();
        for promoter in &mut self.promoters {
            promoter.regulation = mask;
        }
        StepResult::Continue
    }

    /// `regulate-sp`: promoters whose code agrees with the next register on
    /// at least half of its bits take `?BX?` as their mask.
    pub(super) fn inst_regulate_specific(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let code_size = self.config.promoters.code_size;
        let bits = code_mask(code_size);
        let mask = self.register(reg) as u32 & bits;
        let target = self.register(next_register(reg)) as u32 & bits;

        self.refresh_promoters();
        for promoter in &mut self.promoters {
            let agree = (!(promoter.bit_code ^ target) & bits).count_ones() as usize;
            if agree * 2 >= code_size {
                promoter.regulation = mask;
            }
        }
        StepResult::Continue
    }
}
