//! Register, stack and arithmetic instructions

use super::{ExecutionContext, Hardware, StepResult};
use crate::cpu::label::CodeLabel;
use crate::cpu::thread::{next_register, NUM_REGISTERS, REG_BX, REG_CX};
use crate::organism::{FaultLocation, FaultSeverity};

impl Hardware {
    fn math_fault(&self, ctx: &mut ExecutionContext<'_>, message: &str) -> StepResult {
        self.fault(ctx, FaultLocation::Math, FaultSeverity::Error, message)
    }

    // =========================================================================
    // Stacks
    // =========================================================================

    pub(super) fn inst_pop(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let value = self.stack_pop();
        self.set_register(reg, value);
        StepResult::Continue
    }

    pub(super) fn inst_push(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let value = self.register(reg);
        self.stack_push(value);
        StepResult::Continue
    }

    pub(super) fn inst_switch_stack(&mut self) -> StepResult {
        let thread = self.thread_mut();
        thread.use_global_stack = !thread.use_global_stack;
        StepResult::Continue
    }

    pub(super) fn inst_flip_stack(&mut self) -> StepResult {
        self.active_stack_mut().flip();
        StepResult::Continue
    }

    // =========================================================================
    // Register moves
    // =========================================================================

    pub(super) fn inst_swap(&mut self) -> StepResult {
        let op1 = self.find_modified_register(REG_BX);
        let op2 = next_register(op1);
        self.thread_mut().registers.swap(op1, op2);
        StepResult::Continue
    }

    pub(super) fn swap_fixed(&mut self, a: usize, b: usize) -> StepResult {
        self.thread_mut().registers.swap(a, b);
        StepResult::Continue
    }

    pub(super) fn inst_copy_reg(&mut self) -> StepResult {
        let src = self.find_modified_register(REG_BX);
        let dst = next_register(src);
        let value = self.register(src);
        self.set_register(dst, value);
        StepResult::Continue
    }

    /// Zero every register and clear the active stack.
    pub(super) fn inst_reset(&mut self) -> StepResult {
        self.thread_mut().registers = [0; NUM_REGISTERS];
        self.active_stack_mut().clear();
        StepResult::Continue
    }

    pub(super) fn inst_order(&mut self) -> StepResult {
        let op1 = self.find_modified_register(REG_BX);
        let op2 = next_register(op1);
        if self.register(op1) > self.register(op2) {
            self.thread_mut().registers.swap(op1, op2);
        }
        StepResult::Continue
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    /// `?BX? = f(?BX?)`
    pub(super) fn unary_op(&mut self, f: fn(i32) -> i32) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let value = f(self.register(reg));
        self.set_register(reg, value);
        StepResult::Continue
    }

    /// `?BX? = f(BX, CX)`
    pub(super) fn binary_op(&mut self, f: fn(i32, i32) -> i32) -> StepResult {
        let dst = self.find_modified_register(REG_BX);
        let value = f(self.register(REG_BX), self.register(REG_CX));
        self.set_register(dst, value);
        StepResult::Continue
    }

    pub(super) fn inst_div(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let dst = self.find_modified_register(REG_BX);
        let (op1, op2) = (self.register(REG_BX), self.register(REG_CX));
        if op2 == 0 {
            return self.math_fault(ctx, "div: dividing by 0");
        }
        match op1.checked_div(op2) {
            Some(value) => {
                self.set_register(dst, value);
                StepResult::Continue
            }
            None => self.math_fault(ctx, "div: Float exception"),
        }
    }

    pub(super) fn inst_mod(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let dst = self.find_modified_register(REG_BX);
        let (op1, op2) = (self.register(REG_BX), self.register(REG_CX));
        if op2 == 0 {
            return self.math_fault(ctx, "mod: modding by 0");
        }
        self.set_register(dst, op1.wrapping_rem(op2));
        StepResult::Continue
    }

    /// Values 0 and 1 are left alone.
    pub(super) fn inst_sqrt(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let value = self.register(reg);
        if value > 1 {
            self.set_register(reg, (value as f64).sqrt() as i32);
        } else if value < 0 {
            return self.math_fault(ctx, "sqrt: value is negative");
        }
        StepResult::Continue
    }

    /// Zero is left alone.
    pub(super) fn inst_log(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        name: &str,
        f: fn(f64) -> f64,
    ) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let value = self.register(reg);
        if value >= 1 {
            self.set_register(reg, f(value as f64) as i32);
        } else if value < 0 {
            return self.math_fault(ctx, &format!("{}: value is negative", name));
        }
        StepResult::Continue
    }

    // =========================================================================
    // Label literals
    // =========================================================================

    /// Read the following label and store its decoding in BX.
    pub(super) fn read_label_value(&mut self, decode: fn(&CodeLabel) -> i32) -> StepResult {
        self.read_label();
        let value = decode(&self.thread().next_label);
        self.set_register(REG_BX, value);
        StepResult::Continue
    }
}
