//! Flow control: conditionals, jumps, marked-label transfers, threads

use super::{ExecutionContext, Hardware, StepResult};
use crate::cpu::library::InstFunction;
use crate::cpu::thread::{next_register, REG_BX};
use crate::organism::{FaultLocation, FaultSeverity};

impl Hardware {
    /// Step the IP over the following instruction.
    fn skip_next(&mut self) {
        let len = self.memory.len();
        self.thread_mut().ip_mut().advance(len);
    }

    // =========================================================================
    // Conditionals
    // =========================================================================

    /// `?BX?` tested against zero-style predicates
    pub(super) fn if_unary(&mut self, pred: fn(i32) -> bool) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        if !pred(self.register(reg)) {
            self.skip_next();
        }
        StepResult::Continue
    }

    /// `?BX?` compared with the register after it
    pub(super) fn if_binary(&mut self, pred: fn(i32, i32) -> bool) -> StepResult {
        let op1 = self.find_modified_register(REG_BX);
        let op2 = next_register(op1);
        if !pred(self.register(op1), self.register(op2)) {
            self.skip_next();
        }
        StepResult::Continue
    }

    /// Fixed-register inequality test
    pub(super) fn if_fixed(&mut self, a: usize, b: usize) -> StepResult {
        if self.register(a) == self.register(b) {
            self.skip_next();
        }
        StepResult::Continue
    }

    pub(super) fn inst_skip(&mut self) -> StepResult {
        self.skip_next();
        StepResult::Continue
    }

    // =========================================================================
    // Complement-label jumps
    // =========================================================================

    /// Move the active head to the complement of the following label, or by
    /// BX lines when no label follows.
    fn jump_to_complement(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        direction: i32,
        name: &str,
    ) -> StepResult {
        self.read_label();
        self.complement_label();

        let len = self.memory.len();
        let active = self.thread().cur_head;
        if self.thread().next_label.is_empty() {
            let offset = self.register(REG_BX) as i64 * if direction < 0 { -1 } else { 1 };
            self.thread_mut().head_mut(active).jump(offset, len);
            return StepResult::Continue;
        }

        match self.find_label(direction) {
            Some(pos) => {
                self.thread_mut().head_mut(active).set(pos as i64, len);
                StepResult::Continue
            }
            None => self.fault(
                ctx,
                FaultLocation::Jump,
                FaultSeverity::Error,
                format!("{}: No complement label", name),
            ),
        }
    }

    pub(super) fn inst_jump(&mut self, ctx: &mut ExecutionContext<'_>, direction: i32) -> StepResult {
        let name = if direction < 0 { "jump-b" } else { "jump-f" };
        self.jump_to_complement(ctx, direction, name)
    }

    pub(super) fn inst_call(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let location = self.ip_position() as i32;
        self.stack_push(location);
        self.jump_to_complement(ctx, 1, "call")
    }

    pub(super) fn inst_return(&mut self) -> StepResult {
        let target = self.stack_pop();
        self.set_head(crate::cpu::HeadKind::Ip, target as i64);
        StepResult::Continue
    }

    // =========================================================================
    // Marked-label transfers
    // =========================================================================

    fn jump_to_marker(&mut self, marker: InstFunction) -> StepResult {
        self.read_label();
        let label = self.thread().next_label.clone();
        if label.is_empty() {
            return StepResult::Continue;
        }
        let Some(marker) = self.inst_set.find(marker) else {
            return StepResult::Continue;
        };

        match self.find_marked_label(marker, &label) {
            Some(pos) => {
                self.set_head(crate::cpu::HeadKind::Ip, pos as i64);
                StepResult::Suppressed
            }
            None => StepResult::Continue,
        }
    }

    pub(super) fn inst_throw(&mut self) -> StepResult {
        self.jump_to_marker(InstFunction::Catch)
    }

    pub(super) fn inst_throw_if(&mut self, pred: fn(i32) -> bool) -> StepResult {
        if !pred(self.register(REG_BX)) {
            return StepResult::Continue;
        }
        self.inst_throw()
    }

    pub(super) fn inst_goto(&mut self) -> StepResult {
        self.jump_to_marker(InstFunction::Label)
    }

    pub(super) fn inst_goto_if(&mut self, pred: fn(i32) -> bool) -> StepResult {
        if !pred(self.register(REG_BX)) {
            return StepResult::Continue;
        }
        self.inst_goto()
    }

    // =========================================================================
    // Threads
    // =========================================================================

    pub(super) fn inst_fork_thread(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        // The clone resumes after the fork; the parent advances past it as usual.
        self.skip_next();
        if !self.fork_thread() {
            return self.fault(
                ctx,
                FaultLocation::ThreadFork,
                FaultSeverity::Error,
                "fork-th: too many threads",
            );
        }
        StepResult::Continue
    }

    pub(super) fn inst_kill_thread(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        if !self.kill_thread() {
            return self.fault(
                ctx,
                FaultLocation::ThreadKill,
                FaultSeverity::Error,
                "kill-th: only one thread",
            );
        }
        StepResult::Suppressed
    }

    pub(super) fn inst_thread_id(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let id = self.thread().id as i32;
        self.set_register(reg, id);
        StepResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{build, quiet_config, tick};
    use crate::cpu::thread::{REG_BX, REG_CX};
    use crate::organism::{FaultLocation, RecordingOrganism};
    use crate::random::seeded;

    #[test]
    fn test_if_n_equ_skips_when_equal() {
        let mut hw = build(&["if-n-equ", "inc", "nop-X", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 2);

        hw.set_head(crate::cpu::HeadKind::Ip, 0);
        hw.set_register(REG_CX, 4);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_if_bit_1_with_modifier() {
        let mut hw = build(&["if-bit-1", "nop-C", "inc", "nop-X"], quiet_config());
        hw.set_register(REG_CX, 3);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 2);
    }

    #[test]
    fn test_jump_f_to_complement() {
        let mut hw = build(&["jump-f", "nop-A", "inc", "inc", "nop-B", "inc", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 5);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_BX), 1);
        assert!(org.faults.is_empty());
    }

    #[test]
    fn test_jump_without_label_uses_bx() {
        let mut hw = build(&["jump-f", "inc", "inc", "inc", "inc", "nop-X"], quiet_config());
        hw.set_register(REG_BX, 3);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 4);
    }

    #[test]
    fn test_jump_missing_label_faults() {
        let mut hw = build(&["jump-f", "nop-A", "inc", "inc"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.faults.len(), 1);
        assert_eq!(org.faults[0].location, FaultLocation::Jump);
        assert!(org.has_fault("jump-f: No complement label"));
        assert_eq!(hw.ip_position(), 2);
    }

    #[test]
    fn test_call_and_return() {
        let mut hw = build(&["call", "nop-A", "nop-X", "nop-B", "inc", "return"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 4);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_BX), 1);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 1);
        assert_eq!(hw.thread().local_stack.peek(), 0);
    }

    #[test]
    fn test_goto_needs_exact_label() {
        let genome = [
            "goto", "nop-A", "nop-B", "inc", "label", "nop-A", "nop-X", "label", "nop-A", "nop-B",
            "nop-X",
        ];
        let mut hw = build(&genome, quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 7);
        assert_eq!(hw.register(REG_BX), 0);
    }

    #[test]
    fn test_goto_if_zero_condition() {
        let mut hw = build(&["goto-if=0", "nop-A", "label", "nop-A", "nop-X"], quiet_config());
        hw.set_register(REG_BX, 1);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 1);

        hw.set_head(crate::cpu::HeadKind::Ip, 0);
        hw.set_register(REG_BX, 0);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 2);
    }

    #[test]
    fn test_throw_to_catch() {
        let mut hw = build(&["throw", "nop-C", "inc", "catch", "nop-C", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 3);
    }

    #[test]
    fn test_throw_without_catch_falls_through() {
        let mut hw = build(&["throw", "nop-C", "inc", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 2);
        assert!(org.faults.is_empty());
    }

    #[test]
    fn test_kill_second_thread() {
        let mut config = quiet_config();
        config.max_cpu_threads = 2;
        let mut hw = build(&["kill-th", "nop-X"], config);
        assert!(hw.fork_thread());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.num_threads(), 1);
        assert_eq!(hw.cur_thread(), 0);
        assert_eq!(hw.thread_id_chart(), 1);
    }

    #[test]
    fn test_fork_at_cap_faults() {
        let mut hw = build(&["fork-th", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.num_threads(), 1);
        assert_eq!(org.faults[0].location, FaultLocation::ThreadFork);
    }
}
