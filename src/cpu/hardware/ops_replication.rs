//! Register-addressed replication instructions
//!
//! The older copy family addresses memory through AX and BX instead of
//! heads. Allocation and divide go through the engine in `replication.rs`.

use super::{ExecutionContext, Hardware, StepResult};
use crate::cpu::head::HeadKind;
use crate::cpu::instruction::{InstFlags, Instruction};
use crate::cpu::thread::{REG_AX, REG_BX, REG_CX};
use crate::organism::{FaultLocation, FaultSeverity};

impl Hardware {
    /// Copy-time point mutation test
    pub(super) fn copy_mutates(&self, ctx: &mut ExecutionContext<'_>) -> bool {
        ctx.rng.p(self.config.mutations.copy_mut)
    }

    /// Store a copied line and update its provenance flags.
    pub(super) fn write_copied(&mut self, pos: usize, inst: Instruction, mutated: bool) {
        self.write_line(pos, inst);
        if mutated {
            self.memory
                .set_flags(pos, InstFlags::MUTATED | InstFlags::COPY_MUT);
        } else {
            self.memory
                .clear_flags_at(pos, InstFlags::MUTATED | InstFlags::COPY_MUT);
        }
        self.memory.set_flags(pos, InstFlags::COPIED);
    }

    /// Opcode encoded by a register value
    fn inst_from_value(&self, value: i32) -> Instruction {
        let n = self.inst_set.len().max(1) as i64;
        Instruction((value as i64).rem_euclid(n) as u8)
    }

    /// Source line BX and destination line AX+BX
    fn copy_operands(&self) -> (usize, usize) {
        let ax = self.register(REG_AX) as i64;
        let bx = self.register(REG_BX) as i64;
        (self.line_at(bx), self.line_at(ax + bx))
    }

    // =========================================================================
    // Copy family
    // =========================================================================

    pub(super) fn inst_copy(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let (from, to) = self.copy_operands();
        if self.copy_mutates(ctx) {
            let inst = self.inst_set.random_inst(ctx.rng);
            self.write_copied(to, inst, true);
        } else {
            let inst = self.memory.get(from);
            self.write_copied(to, inst, false);
        }
        StepResult::Continue
    }

    pub(super) fn inst_read(&mut self) -> StepResult {
        let dst = self.find_modified_register(REG_CX);
        let from = self.line_at(self.register(REG_BX) as i64);
        let value = self.memory.get(from).op() as i32;
        self.set_register(dst, value);
        StepResult::Continue
    }

    pub(super) fn inst_write(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let src = self.find_modified_register(REG_CX);
        let (_, to) = self.copy_operands();
        if self.copy_mutates(ctx) {
            let inst = self.inst_set.random_inst(ctx.rng);
            self.write_copied(to, inst, true);
        } else {
            let inst = self.inst_from_value(self.register(src));
            self.write_copied(to, inst, false);
        }
        StepResult::Continue
    }

    pub(super) fn inst_stack_read(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_CX);
        let from = self.line_at(self.register(reg) as i64);
        let value = self.memory.get(from).op() as i32;
        self.stack_push(value);
        StepResult::Continue
    }

    pub(super) fn inst_stack_write(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let dst = self.find_modified_register(REG_BX);
        let to = self.line_at(self.register(REG_AX) as i64 + self.register(dst) as i64);
        let value = self.stack_pop();
        if self.copy_mutates(ctx) {
            let inst = self.inst_set.random_inst(ctx.rng);
            self.write_copied(to, inst, true);
        } else {
            let inst = self.inst_from_value(value);
            self.write_copied(to, inst, false);
        }
        StepResult::Continue
    }

    pub(super) fn inst_compare(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let dst = self.find_modified_register(REG_CX);
        let (from, to) = self.copy_operands();
        if self.copy_mutates(ctx) {
            let inst = self.inst_set.random_inst(ctx.rng);
            self.write_copied(to, inst, true);
        }
        let diff = self.memory.get(from).op() as i32 - self.memory.get(to).op() as i32;
        self.set_register(dst, diff);
        StepResult::Continue
    }

    /// Runs the next line only if the copy would change something. A copy
    /// mutation inverts the test.
    pub(super) fn inst_if_n_cpy(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let (from, to) = self.copy_operands();
        let same = self.memory.get(from) == self.memory.get(to);
        let skip = if self.copy_mutates(ctx) { !same } else { same };
        if skip {
            let len = self.memory.len();
            self.thread_mut().ip_mut().advance(len);
        }
        StepResult::Continue
    }

    // =========================================================================
    // Allocate and divide
    // =========================================================================

    pub(super) fn inst_allocate(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let old_size = self.memory.len() as i32;
        let size = self.register(REG_BX) as i64;
        let result = self.allocate_main(ctx, size);
        if result.is_success() {
            self.set_register(REG_AX, old_size);
        }
        result
    }

    pub(super) fn inst_divide(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let div_point = self.register(REG_AX) as i64;
        self.divide_main(ctx, div_point, 0, 1.0)
    }

    pub(super) fn inst_c_alloc(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let size = self.memory.len() as i64;
        self.allocate_main(ctx, size)
    }

    pub(super) fn inst_c_divide(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let half = (self.memory.len() / 2) as i64;
        self.divide_main(ctx, half, 0, 1.0)
    }

    pub(super) fn inst_repro(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        self.repro_main(ctx)
    }

    /// Allocate as much as the size bounds allow; old size into AX.
    pub(super) fn inst_max_alloc(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let cur_size = self.memory.len() as i64;
        let by_range = (self.config.child_size_range * cur_size as f64) as i64;
        let alloc_size = by_range.min(self.config.max_genome_size as i64 - cur_size);
        let result = self.allocate_main(ctx, alloc_size);
        if result.is_success() {
            self.set_register(REG_AX, cur_size as i32);
        }
        result
    }

    /// Divide at the read head; the child ends at the write head.
    pub(super) fn inst_head_divide(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        self.adjust_heads();
        let len = self.memory.len() as i64;
        let div_point = self.head_position(HeadKind::Read) as i64;
        let child_end = match self.head_position(HeadKind::Write) as i64 {
            0 => len,
            end => end,
        };
        let extra_lines = len - child_end;

        let result = self.divide_main(ctx, div_point, extra_lines, 1.0);
        self.adjust_heads();
        result
    }

    pub(super) fn inst_die(&mut self) -> StepResult {
        self.to_die = true;
        StepResult::Continue
    }

    // =========================================================================
    // Parasites and search
    // =========================================================================

    /// Cut `[READ, WRITE)` out and send it to the faced neighbour at the
    /// complement of the following label.
    pub(super) fn inst_inject(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let inject_fault = |hw: &Self, ctx: &mut ExecutionContext<'_>, message: &str| {
            hw.fault(ctx, FaultLocation::Inject, FaultSeverity::Error, message)
        };

        self.adjust_heads();
        let start = self.head_position(HeadKind::Read);
        let end = self.head_position(HeadKind::Write);
        if end <= start {
            return inject_fault(self, ctx, "inject: no code to inject");
        }
        if start < self.config.min_genome_size {
            return inject_fault(self, ctx, "inject: new size too small");
        }

        self.read_label();
        if self.thread().next_label.is_empty() {
            return inject_fault(self, ctx, "inject: label required");
        }
        self.complement_label();

        let code = self.memory.remove_range(start..end);
        self.adjust_heads();
        self.mal_active = false;
        self.promoters_dirty = true;

        let label = self.thread().next_label.clone();
        if ctx.organism.inject_into_neighbor(&label, &code) {
            log::debug!("injected {} lines into neighbour at {}", code.len(), label);
            StepResult::Continue
        } else {
            StepResult::Failed("inject: no host accepted the code".to_string())
        }
    }

    /// Distance to the complement label into BX, label size into CX.
    pub(super) fn inst_search(&mut self, ctx: &mut ExecutionContext<'_>, direction: i32) -> StepResult {
        self.read_label();
        self.complement_label();
        let Some(found) = self.find_label(direction) else {
            let name = if direction < 0 { "search-b" } else { "search-f" };
            return self.fault(
                ctx,
                FaultLocation::Jump,
                FaultSeverity::Error,
                format!("{}: No complement label", name),
            );
        };

        let ip = self.ip_position() as i32;
        let distance = if direction < 0 {
            ip - found as i32
        } else {
            found as i32 - ip
        };
        let label_len = self.thread().next_label.len() as i32;
        self.set_register(REG_BX, distance);
        self.set_register(REG_CX, label_len);
        StepResult::Continue
    }

    pub(super) fn inst_mem_size(&mut self) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        let len = self.memory.len() as i32;
        self.set_register(reg, len);
        StepResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{build, op, quiet_config, tick};
    use crate::config::MutationRates;
    use crate::cpu::instruction::InstFlags;
    use crate::cpu::thread::{REG_AX, REG_BX, REG_CX};
    use crate::cpu::HeadKind;
    use crate::organism::RecordingOrganism;
    use crate::random::seeded;

    #[test]
    fn test_copy_sets_copied() {
        let mut hw = build(&["copy", "inc", "nop-X", "nop-X"], quiet_config());
        hw.set_register(REG_AX, 2);
        hw.set_register(REG_BX, 1);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().get(3), op(&hw, "inc"));
        assert!(hw.memory().flags(3).copied());
        assert!(!hw.memory().flags(3).mutated());
    }

    #[test]
    fn test_copy_mutation_flags() {
        let mut config = quiet_config();
        config.mutations = MutationRates {
            copy_mut: 1.0,
            ..MutationRates::none()
        };
        let mut hw = build(&["copy", "inc", "nop-X", "nop-X"], config);
        hw.set_register(REG_AX, 2);
        hw.set_register(REG_BX, 1);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        let flags = hw.memory().flags(3);
        assert!(flags.copied() && flags.mutated() && flags.copy_mutated());
    }

    #[test]
    fn test_read_write_roundtrip_through_register() {
        let mut hw = build(&["read", "write", "inc", "nop-X", "nop-X"], quiet_config());
        hw.set_register(REG_AX, 2);
        hw.set_register(REG_BX, 2);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_CX), op(&hw, "inc").op() as i32);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().get(4), op(&hw, "inc"));
    }

    #[test]
    fn test_write_wraps_value_into_set() {
        let mut hw = build(&["write", "nop-X", "nop-X"], quiet_config());
        let n = hw.inst_set().len() as i32;
        hw.set_register(REG_AX, 1);
        hw.set_register(REG_BX, 1);
        hw.set_register(REG_CX, -1);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().get(2).op() as i32, n - 1);
    }

    #[test]
    fn test_compare_and_if_n_cpy() {
        let mut hw = build(&["compare", "inc", "nop-X", "nop-X"], quiet_config());
        hw.set_register(REG_AX, 1);
        hw.set_register(REG_BX, 1);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        let expected = op(&hw, "inc").op() as i32 - op(&hw, "nop-X").op() as i32;
        assert_eq!(hw.register(REG_CX), expected);

        let mut hw = build(&["if-n-cpy", "inc", "inc", "nop-X"], quiet_config());
        hw.set_register(REG_AX, 1);
        hw.set_register(REG_BX, 1);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 2);
    }

    #[test]
    fn test_allocate_instruction_sets_ax() {
        let mut genome = vec!["nop-X"; 8];
        genome[0] = "allocate";
        let mut hw = build(&genome, quiet_config());
        hw.set_register(REG_BX, 8);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().len(), 16);
        assert_eq!(hw.register(REG_AX), 8);
        assert!(hw.is_allocated());
    }

    #[test]
    fn test_max_alloc_doubles() {
        let mut hw = build(&["h-alloc"; 10], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().len(), 30);
        assert_eq!(hw.register(REG_AX), 10);
    }

    #[test]
    fn test_c_divide_halves_memory() {
        let mut hw = build(&vec!["nop-X"; 20], quiet_config());
        let c_divide = op(&hw, "c-divide");
        hw.memory.set(0, c_divide);
        for pos in 0..20 {
            hw.memory.set_flags(pos, InstFlags::EXECUTED | InstFlags::COPIED);
        }
        hw.mal_active = true;
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        let outcome = tick(&mut hw, &mut rng, &mut org);
        assert!(outcome.divided);
        assert_eq!(org.children[0].len(), 10);
        assert_eq!(hw.memory().len(), 10);
        assert_eq!(hw.ip_position(), 0);
    }

    #[test]
    fn test_repro_copies_whole_memory() {
        let mut config = quiet_config();
        config.divide_method = crate::config::DivideMethod::Leave;
        let mut hw = build(&["repro", "inc", "dec", "nop-A"], config);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        let outcome = tick(&mut hw, &mut rng, &mut org);
        assert!(outcome.divided);
        assert_eq!(&org.children[0][..], hw.memory().insts());
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_search_forward_distance() {
        let mut hw = build(&["search-f", "nop-A", "inc", "inc", "nop-B", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_BX), 3);
        assert_eq!(hw.register(REG_CX), 1);

        let mut hw = build(&["search-f", "nop-A", "inc"], quiet_config());
        tick(&mut hw, &mut rng, &mut org);
        assert!(org.has_fault("search-f: No complement label"));
        assert_eq!(hw.register(REG_BX), 0);
    }

    #[test]
    fn test_mem_size() {
        let mut hw = build(&["mem-size", "nop-C", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_CX), 3);
    }

    #[test]
    fn test_inject_removes_code_and_needs_label() {
        let mut genome = vec!["nop-X"; 10];
        genome[0] = "inject";
        genome[1] = "nop-A";
        let mut hw = build(&genome, quiet_config());
        hw.set_head(HeadKind::Read, 8);
        hw.set_head(HeadKind::Write, 9);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        org.accept_injection = true;
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.memory().len(), 9);
        assert_eq!(org.injections.len(), 1);
        assert_eq!(org.injections[0].0.nops(), &[1]);
        assert_eq!(org.injections[0].1.len(), 1);

        genome[1] = "nop-X";
        let mut hw = build(&genome, quiet_config());
        hw.set_head(HeadKind::Read, 8);
        hw.set_head(HeadKind::Write, 9);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert!(org.has_fault("inject: label required"));
        assert_eq!(hw.memory().len(), 10);

        let mut hw = build(&["inject", "nop-A", "nop-X", "nop-X"], quiet_config());
        hw.set_head(HeadKind::Read, 2);
        hw.set_head(HeadKind::Write, 3);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert!(org.has_fault("inject: new size too small"));
    }

    #[test]
    fn test_die_marks() {
        let mut hw = build(&["die", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert!(hw.marked_to_die());
        assert_eq!(hw.register(REG_BX), 0);
    }
}
