//! Execution Thread - One flow of control through shared memory
//!
//! A thread owns its registers, its local stack, four heads and the
//! label-reading state. Memory, the global stack and cost counters belong
//! to the hardware.

use super::head::{Head, HeadKind};
use super::label::CodeLabel;
use super::stack::CpuStack;
use serde::{Deserialize, Serialize};

pub const NUM_REGISTERS: usize = 3;
pub const REG_AX: usize = 0;
pub const REG_BX: usize = 1;
pub const REG_CX: usize = 2;

/// Register following `reg`, wrapping CX → AX
pub const fn next_register(reg: usize) -> usize {
    (reg + 1) % NUM_REGISTERS
}

/// Register preceding `reg`, wrapping AX → CX
pub const fn prev_register(reg: usize) -> usize {
    (reg + NUM_REGISTERS - 1) % NUM_REGISTERS
}

/// Thread state parked while an interrupt handler runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedContext {
    pub registers: [i32; NUM_REGISTERS],
    pub heads: [Head; HeadKind::COUNT],
    pub local_stack: CpuStack,
    pub use_global_stack: bool,
    pub cur_head: HeadKind,
    pub reading_label: bool,
    pub read_label: CodeLabel,
    pub next_label: CodeLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecThread {
    pub id: u32,
    pub registers: [i32; NUM_REGISTERS],
    pub heads: [Head; HeadKind::COUNT],
    pub local_stack: CpuStack,
    /// Push/pop target the hardware-wide stack instead of `local_stack`
    pub use_global_stack: bool,
    /// Head moved by the head-agnostic jump instructions
    pub cur_head: HeadKind,
    pub reading_label: bool,
    /// Trailing NOPs seen by the copy loop
    pub read_label: CodeLabel,
    /// Label most recently read after an instruction
    pub next_label: CodeLabel,
    pub promoter_inst_executed: u32,
    /// Saved state of an interrupted thread; `Some` while a handler runs.
    pub interrupted: Option<SavedContext>,
}

impl Default for ExecThread {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ExecThread {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            registers: [0; NUM_REGISTERS],
            heads: [Head::new(); HeadKind::COUNT],
            local_stack: CpuStack::new(),
            use_global_stack: false,
            cur_head: HeadKind::Ip,
            reading_label: false,
            read_label: CodeLabel::new(),
            next_label: CodeLabel::new(),
            promoter_inst_executed: 0,
            interrupted: None,
        }
    }

    /// Zero registers and stack, park every head at 0, clear labels.
    pub fn reset(&mut self) {
        let id = self.id;
        *self = Self::new(id);
    }

    pub fn head(&self, kind: HeadKind) -> &Head {
        &self.heads[kind.index()]
    }

    pub fn head_mut(&mut self, kind: HeadKind) -> &mut Head {
        &mut self.heads[kind.index()]
    }

    pub fn ip(&self) -> &Head {
        self.head(HeadKind::Ip)
    }

    pub fn ip_mut(&mut self) -> &mut Head {
        self.head_mut(HeadKind::Ip)
    }

    pub fn is_in_handler(&self) -> bool {
        self.interrupted.is_some()
    }

    pub fn save_context(&self) -> SavedContext {
        SavedContext {
            registers: self.registers,
            heads: self.heads,
            local_stack: self.local_stack.clone(),
            use_global_stack: self.use_global_stack,
            cur_head: self.cur_head,
            reading_label: self.reading_label,
            read_label: self.read_label.clone(),
            next_label: self.next_label.clone(),
        }
    }

    pub fn restore_context(&mut self, saved: SavedContext) {
        self.registers = saved.registers;
        self.heads = saved.heads;
        self.local_stack = saved.local_stack;
        self.use_global_stack = saved.use_global_stack;
        self.cur_head = saved.cur_head;
        self.reading_label = saved.reading_label;
        self.read_label = saved.read_label;
        self.next_label = saved.next_label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_wrap() {
        assert_eq!(next_register(REG_CX), REG_AX);
        assert_eq!(prev_register(REG_AX), REG_CX);
        assert_eq!(next_register(REG_AX), REG_BX);
    }

    #[test]
    fn test_reset_keeps_id() {
        let mut t = ExecThread::new(3);
        t.registers = [1, 2, 3];
        t.head_mut(HeadKind::Write).set(5, 10);
        t.local_stack.push(9);
        t.use_global_stack = true;
        t.reset();
        assert_eq!(t, ExecThread::new(3));
    }

    #[test]
    fn test_save_restore_context() {
        let mut t = ExecThread::new(0);
        t.registers = [4, 5, 6];
        t.head_mut(HeadKind::Flow).set(7, 10);
        let saved = t.save_context();
        t.registers = [0; NUM_REGISTERS];
        t.head_mut(HeadKind::Flow).set(0, 10);
        t.restore_context(saved);
        assert_eq!(t.registers, [4, 5, 6]);
        assert_eq!(t.head(HeadKind::Flow).position(), 7);
    }
}
