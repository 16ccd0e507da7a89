//! Interrupts - Preemptive handlers for message arrival and movement
//!
//! Entering a handler parks the thread's full context in its save slot,
//! moves every head to the line after the handler marker and hands the
//! handler clean registers and an empty local stack. `end-handler` either
//! takes the next queued message or puts the parked context back.
//!
//! A thread holds one save slot. A second interrupt raised inside a
//! handler overwrites it.

use super::{ExecutionContext, Hardware, StepResult};
use crate::cpu::head::HeadKind;
use crate::cpu::library::InstFunction;
use crate::cpu::thread::{NUM_REGISTERS, REG_BX, REG_CX};
use crate::organism::{FaultLocation, FaultSeverity};
use serde::{Deserialize, Serialize};

/// Event that preempts a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterruptKind {
    /// A message is waiting in the organism's inbox
    Message,
    /// The organism moved to a new cell
    Moved,
}

impl InterruptKind {
    /// Marker instruction the handler starts after
    pub fn handler(self) -> InstFunction {
        match self {
            Self::Message => InstFunction::MsgHandler,
            Self::Moved => InstFunction::MovedHandler,
        }
    }
}

impl Hardware {
    /// Polled before each instruction while interrupts are enabled.
    pub(super) fn check_interrupts(&mut self, ctx: &mut ExecutionContext<'_>) {
        if self.thread().is_in_handler() {
            return;
        }
        if ctx.organism.has_pending_message() {
            self.raise_interrupt(ctx, InterruptKind::Message);
        }
    }

    /// Switch the current thread into the handler for `kind`. Returns false
    /// (and changes nothing) when memory holds no handler marker.
    pub fn raise_interrupt(&mut self, ctx: &mut ExecutionContext<'_>, kind: InterruptKind) -> bool {
        let Some(marker) = self.inst_set.find(kind.handler()) else {
            return false;
        };
        let Some(pos) = self.memory.insts().iter().position(|&inst| inst == marker) else {
            return false;
        };

        let len = self.memory.len();
        let saved = self.thread().save_context();
        let thread = self.thread_mut();
        thread.interrupted = Some(saved);
        thread.registers = [0; NUM_REGISTERS];
        thread.local_stack.clear();
        thread.use_global_stack = false;
        thread.cur_head = HeadKind::Ip;
        thread.reading_label = false;
        thread.read_label.clear();
        thread.next_label.clear();
        for head in &mut thread.heads {
            head.set(pos as i64 + 1, len);
        }

        if kind == InterruptKind::Message {
            if let Some(message) = ctx.organism.retrieve_message() {
                self.set_register(REG_BX, message.label);
                self.set_register(REG_CX, message.data);
            }
        }
        log::debug!("thread {} entered {:?} handler at line {}", self.thread().id, kind, pos + 1);
        true
    }

    pub(super) fn inst_end_handler(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let Some(saved) = self.thread_mut().interrupted.take() else {
            return self.fault(
                ctx,
                FaultLocation::Instruction,
                FaultSeverity::Warning,
                "end-handler: no interrupt active",
            );
        };

        self.thread_mut().restore_context(saved);
        self.adjust_heads();
        if ctx.organism.has_pending_message() {
            self.raise_interrupt(ctx, InterruptKind::Message);
        } else {
            log::debug!("thread {} left handler", self.thread().id);
        }
        StepResult::Suppressed
    }
}
