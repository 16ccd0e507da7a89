//! Head-addressed instructions
//!
//! The heads family drives replication through four cursors: the IP, a
//! read head, a write head and a flow head used as a jump target. `h-copy`
//! is the point where copy-time mutations enter the offspring.

use super::replication::UniformDraw;
use super::{ExecutionContext, Hardware, StepResult};
use crate::cpu::head::HeadKind;
use crate::cpu::instruction::{InstFlags, Instruction};
use crate::cpu::thread::{REG_BX, REG_CX};
use crate::organism::{FaultLocation, FaultSeverity};
use std::sync::Arc;

impl Hardware {
    fn advance_head(&mut self, kind: HeadKind) {
        let len = self.memory.len();
        self.thread_mut().head_mut(kind).advance(len);
    }

    fn adjust_head(&mut self, kind: HeadKind) {
        let len = self.memory.len();
        self.thread_mut().head_mut(kind).adjust(len);
    }

    // =========================================================================
    // Reading and writing through heads
    // =========================================================================

    pub(super) fn inst_head_read(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let head = self.find_modified_head(HeadKind::Read);
        self.adjust_head(head);
        let inst = if self.copy_mutates(ctx) {
            self.inst_set.random_inst(ctx.rng)
        } else {
            self.memory.get(self.head_position(head))
        };
        self.set_register(REG_BX, inst.op() as i32);
        self.read_inst(inst);
        self.advance_head(head);
        StepResult::Continue
    }

    pub(super) fn inst_head_write(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Write);
        self.adjust_head(head);
        let value = self.register(REG_BX);
        let op = if value < 0 || value as usize >= self.inst_set.len() {
            0
        } else {
            value as u8
        };
        let pos = self.head_position(head);
        self.write_line(pos, Instruction(op));
        self.memory.set_flags(pos, InstFlags::COPIED);
        self.advance_head(head);
        StepResult::Continue
    }

    /// Copy the line under the read head to the write head, applying
    /// copy-time mutations in the order deletion, insertion, point,
    /// uniform, then slip of the read head after the write.
    pub(super) fn inst_head_copy(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        self.adjust_head(HeadKind::Read);
        self.adjust_head(HeadKind::Write);
        let config = Arc::clone(&self.config);
        let rates = &config.mutations;

        let mut inst = self.memory.get(self.head_position(HeadKind::Read));
        self.read_inst(inst);

        if ctx.rng.p(rates.copy_del) {
            self.advance_head(HeadKind::Read);
            return StepResult::Continue;
        }
        if ctx.rng.p(rates.copy_ins) {
            let extra = self.inst_set.random_inst(ctx.rng);
            self.insert_at_write_head(extra);
        }

        let mut mutated = false;
        if self.copy_mutates(ctx) {
            inst = self.inst_set.random_inst(ctx.rng);
            mutated = true;
        }
        if ctx.rng.p(rates.copy_uniform) {
            match self.uniform_draw(ctx) {
                UniformDraw::Point(drawn) => {
                    inst = drawn;
                    mutated = true;
                }
                UniformDraw::Delete => {
                    self.advance_head(HeadKind::Read);
                    return StepResult::Continue;
                }
                UniformDraw::Insert(drawn) => self.insert_at_write_head(drawn),
            }
        }

        let write_pos = self.head_position(HeadKind::Write);
        self.write_copied(write_pos, inst, mutated);
        self.advance_head(HeadKind::Read);
        self.advance_head(HeadKind::Write);

        if ctx.rng.p(rates.copy_slip) {
            let pos = ctx.rng.uniform_int(self.memory.len());
            self.set_head(HeadKind::Read, pos as i64);
        }
        StepResult::Continue
    }

    /// Copy-time insertion: a mutated line goes in ahead of the copy.
    fn insert_at_write_head(&mut self, inst: Instruction) {
        if self.memory.len() >= self.config.max_genome_size {
            return;
        }
        let pos = self.head_position(HeadKind::Write);
        let flags = InstFlags::empty().with_copied().with_mutated().with_copy_mut();
        self.memory.insert(pos, inst, flags);
        self.promoters_dirty = true;
        self.advance_head(HeadKind::Write);
    }

    // =========================================================================
    // Search and labels
    // =========================================================================

    /// Complement search from line 0; flow head lands just past the match.
    pub(super) fn inst_head_search(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        self.read_label();
        self.complement_label();
        let Some(found) = self.find_label(0) else {
            return self.fault(
                ctx,
                FaultLocation::Jump,
                FaultSeverity::Error,
                "h-search: No complement label",
            );
        };

        let distance = found as i32 - self.ip_position() as i32;
        let label_len = self.thread().next_label.len() as i32;
        self.set_register(REG_BX, distance);
        self.set_register(REG_CX, label_len);
        self.set_head(HeadKind::Flow, found as i64);
        self.advance_head(HeadKind::Flow);
        StepResult::Continue
    }

    /// Run the next line only if the complement of the following label was
    /// the last label copied.
    pub(super) fn inst_if_label(&mut self, skip_trailing_nop: bool) -> StepResult {
        self.read_label();
        self.complement_label();
        let thread = self.thread();
        if thread.next_label != thread.read_label {
            self.advance_head(HeadKind::Ip);
            if skip_trailing_nop && self.peek_next_nop().is_some() {
                self.advance_head(HeadKind::Ip);
            }
        }
        StepResult::Continue
    }

    // =========================================================================
    // Head bookkeeping
    // =========================================================================

    pub(super) fn inst_head_push(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        let pos = self.head_position(head) as i32;
        self.stack_push(pos);
        StepResult::Continue
    }

    pub(super) fn inst_head_pop(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        let pos = self.stack_pop();
        self.set_head(head, pos as i64);
        StepResult::Continue
    }

    pub(super) fn inst_set_head(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        self.thread_mut().cur_head = head;
        StepResult::Continue
    }

    pub(super) fn inst_advance_head(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Write);
        self.advance_head(head);
        StepResult::Continue
    }

    /// Moving the IP itself suppresses the usual advance.
    pub(super) fn inst_move_head(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        let flow = self.head_position(HeadKind::Flow);
        self.set_head(head, flow as i64);
        if head == HeadKind::Ip {
            StepResult::Suppressed
        } else {
            StepResult::Continue
        }
    }

    pub(super) fn inst_jump_head(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        let offset = self.register(REG_CX) as i64;
        let len = self.memory.len();
        self.thread_mut().head_mut(head).jump(offset, len);
        StepResult::Continue
    }

    pub(super) fn inst_get_head(&mut self) -> StepResult {
        let head = self.find_modified_head(HeadKind::Ip);
        let pos = self.head_position(head) as i32;
        self.set_register(REG_CX, pos);
        StepResult::Continue
    }

    pub(super) fn inst_set_flow(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_CX);
        let target = self.register(reg) as i64;
        self.set_head(HeadKind::Flow, target);
        StepResult::Continue
    }
}
