//! Replication engine
//!
//! Allocation grows memory for the offspring, the copy loop (see
//! `ops_heads.rs`) fills it, and divide splits the child off. Divide is
//! atomic: every check and every mutation draw happens on scratch copies
//! and memory only changes once the child is accepted.

use super::{ExecutionContext, Hardware, StepResult};
use crate::config::{AllocMethod, DivideMethod, SlipFillMode};
use crate::cpu::instruction::{InstFlags, Instruction};
use crate::cpu::label::CodeLabel;
use crate::cpu::memory::Genome;
use crate::organism::{FaultLocation, FaultSeverity, ViabilityVerdict};
use std::sync::Arc;

/// One draw from the uniform-mutation table: `2N + 1` outcomes for an
/// instruction set of size N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum UniformDraw {
    Point(Instruction),
    Delete,
    Insert(Instruction),
}

/// Parent line rewritten by a divide-time parent mutation
type ParentEdit = (usize, Instruction);

impl Hardware {
    pub(super) fn uniform_draw(&self, ctx: &mut ExecutionContext<'_>) -> UniformDraw {
        let n = self.inst_set.len();
        let u = ctx.rng.uniform_int(2 * n + 1);
        if u < n {
            UniformDraw::Point(Instruction(u as u8))
        } else if u == n {
            UniformDraw::Delete
        } else {
            UniformDraw::Insert(Instruction((u - n - 1) as u8))
        }
    }

    // =========================================================================
    // Allocate
    // =========================================================================

    /// Grow memory by `allocated_size` lines for an offspring.
    pub(super) fn allocate_main(&mut self, ctx: &mut ExecutionContext<'_>, allocated_size: i64) -> StepResult {
        let config = Arc::clone(&self.config);
        let alloc_fault = |hw: &Self, ctx: &mut ExecutionContext<'_>, message: String| {
            hw.fault(ctx, FaultLocation::Alloc, FaultSeverity::Error, message)
        };

        if config.require_allocate && self.mal_active {
            return alloc_fault(self, ctx, "Allocate already active".to_string());
        }
        if allocated_size < 1 {
            return alloc_fault(self, ctx, format!("Allocate of {} too small", allocated_size));
        }

        let old_size = self.memory.len() as i64;
        let new_size = old_size + allocated_size;
        if new_size > config.max_genome_size as i64 || new_size < config.min_genome_size as i64 {
            return alloc_fault(self, ctx, format!("Invalid post-allocate size ({})", new_size));
        }

        let max_alloc_size = (old_size as f64 * config.child_size_range) as i64;
        if allocated_size > max_alloc_size {
            return alloc_fault(
                self,
                ctx,
                format!("Allocate too large ({} > {})", allocated_size, max_alloc_size),
            );
        }
        let max_old_size = (allocated_size as f64 * config.child_size_range) as i64;
        if old_size > max_old_size {
            return alloc_fault(
                self,
                ctx,
                format!("Allocate too small ({} > {})", old_size, max_old_size),
            );
        }

        let new_size = new_size as usize;
        let inst_set = Arc::clone(&self.inst_set);
        let rng = &mut *ctx.rng;
        match config.alloc_method {
            AllocMethod::Necrotic => self.memory.resize_old(new_size, |_| inst_set.random_inst(rng)),
            AllocMethod::Random => self.memory.resize_with(new_size, |_| inst_set.random_inst(rng)),
            AllocMethod::Default => self.memory.resize(new_size),
        }

        self.mal_active = true;
        self.promoters_dirty = true;
        log::debug!("allocated {} lines ({} -> {})", allocated_size, old_size, new_size);
        StepResult::Continue
    }

    // =========================================================================
    // Divide
    // =========================================================================

    /// Size and provenance checks a divide must pass before anything moves.
    fn check_viable(
        &self,
        ctx: &mut ExecutionContext<'_>,
        parent_size: i64,
        child_size: i64,
    ) -> Result<(), StepResult> {
        if !ctx.organism.divide_check_viable() {
            return Err(StepResult::Failed("divide refused by organism".to_string()));
        }

        let divide_fault = |hw: &Self, ctx: &mut ExecutionContext<'_>, message: String| {
            hw.fault(ctx, FaultLocation::Divide, FaultSeverity::Error, message)
        };

        let config = &self.config;
        let genome_size = self.genome.len() as f64;
        let min_size = (config.min_genome_size as i64).max((genome_size / config.child_size_range) as i64);
        let max_size = (config.max_genome_size as i64).min((genome_size * config.child_size_range) as i64);

        if child_size < min_size || child_size > max_size {
            return Err(divide_fault(self, ctx, format!("Invalid offspring length ({})", child_size)));
        }
        if parent_size < min_size || parent_size > max_size {
            return Err(divide_fault(self, ctx, format!("Invalid post-divide length ({})", parent_size)));
        }

        let (parent_size, child_size) = (parent_size as usize, child_size as usize);
        let executed = self.memory.count_flag(0..parent_size, InstFlags::EXECUTED);
        let min_exe_lines = (parent_size as f64 * config.min_exe_lines) as usize;
        if executed < min_exe_lines {
            return Err(divide_fault(
                self,
                ctx,
                format!("Too few executed lines ({} < {})", executed, min_exe_lines),
            ));
        }

        let copied = self
            .memory
            .count_flag(parent_size..parent_size + child_size, InstFlags::COPIED);
        let min_copied = (child_size as f64 * config.min_copied_lines) as usize;
        if copied < min_copied {
            return Err(divide_fault(
                self,
                ctx,
                format!("Too few copied commands ({} < {})", copied, min_copied),
            ));
        }
        Ok(())
    }

    /// Split `[div_point, len - extra_lines)` off as the offspring.
    pub(super) fn divide_main(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        div_point: i64,
        extra_lines: i64,
        mut_multiplier: f64,
    ) -> StepResult {
        if self.config.require_allocate && !self.mal_active {
            return self.fault(
                ctx,
                FaultLocation::Divide,
                FaultSeverity::Error,
                "Divide without allocate",
            );
        }

        let child_size = self.memory.len() as i64 - div_point - extra_lines;
        if let Err(failed) = self.check_viable(ctx, div_point, child_size) {
            return failed;
        }

        let div_point = div_point as usize;
        let base_child = self.memory.crop(div_point..div_point + child_size as usize);
        let (child, parent_edits) = match self.resolve_child(ctx, base_child, div_point, mut_multiplier) {
            Ok(resolved) => resolved,
            Err(failed) => return failed,
        };

        self.memory.truncate(div_point);
        for (pos, inst) in parent_edits {
            self.memory.set(pos, inst);
            self.memory.set_flags(pos, InstFlags::MUTATED);
        }
        self.adjust_heads();
        self.genome = self.memory.to_genome();
        self.mal_active = false;
        log::debug!("divide: parent keeps {} lines, child has {}", div_point, child.len());

        self.birth(ctx, child)
    }

    /// Apply divide mutations and consult the organism's viability verdict.
    ///
    /// Works on scratch copies only.
    fn resolve_child(
        &self,
        ctx: &mut ExecutionContext<'_>,
        base_child: Genome,
        parent_len: usize,
        mut_multiplier: f64,
    ) -> Result<(Genome, Vec<ParentEdit>), StepResult> {
        let mut rounds = 0u32;
        loop {
            let mut child = base_child.clone();
            self.divide_mutations(ctx, &mut child, mut_multiplier);
            let parent_edits = self.parent_mutations(ctx, parent_len, mut_multiplier);

            match ctx.organism.test_viability(&child) {
                ViabilityVerdict::Viable => return Ok((child, parent_edits)),
                ViabilityVerdict::Revert => return Ok((base_child, Vec::new())),
                ViabilityVerdict::Resample => {
                    rounds += 1;
                    if rounds >= self.config.resample_limit {
                        log::debug!("resample limit {} reached; keeping last draw", rounds);
                        return Ok((child, parent_edits));
                    }
                }
                ViabilityVerdict::Sterilize => {
                    return Err(self.fault(
                        ctx,
                        FaultLocation::Divide,
                        FaultSeverity::Error,
                        "Offspring sterilized",
                    ))
                }
            }
        }
    }

    /// Hand the child over and settle the parent's state.
    fn birth(&mut self, ctx: &mut ExecutionContext<'_>, child: Genome) -> StepResult {
        self.inst_ft_cost = self.inst_set.ft_cost_table();
        self.promoters_dirty = true;
        self.divided = true;

        let parent_alive = ctx.organism.activate_divide(child);
        match self.config.divide_method {
            DivideMethod::Split => {
                if parent_alive {
                    self.reset();
                }
                StepResult::Suppressed
            }
            DivideMethod::Leave => StepResult::Continue,
        }
    }

    /// Offspring is a copy of the whole memory, copy-mutated line by line.
    pub(super) fn repro_main(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let mut child = self.memory.to_genome();
        let copy_mut = self.config.mutations.copy_mut;
        if copy_mut > 0.0 {
            let inst_set = Arc::clone(&self.inst_set);
            for inst in child.as_vec_mut() {
                if ctx.rng.p(copy_mut) {
                    *inst = inst_set.random_inst(ctx.rng);
                }
            }
        }

        let len = self.memory.len();
        let (child, parent_edits) = match self.resolve_child(ctx, child, len, 1.0) {
            Ok(resolved) => resolved,
            Err(failed) => return failed,
        };
        for (pos, inst) in parent_edits {
            self.write_line(pos, inst);
            self.memory.set_flags(pos, InstFlags::MUTATED);
        }
        log::debug!("repro: child has {} lines", child.len());

        self.birth(ctx, child)
    }

    // =========================================================================
    // Divide-time mutations
    // =========================================================================

    /// Mutate a candidate child in place. Every rate is scaled by
    /// `mult`.
    pub(super) fn divide_mutations(&self, ctx: &mut ExecutionContext<'_>, child: &mut Genome, mult: f64) {
        let config = &self.config;
        let rates = &config.mutations;
        let (min, max) = (config.min_genome_size, config.max_genome_size);
        let inst_set = &self.inst_set;
        let v = child.as_vec_mut();

        // At most one of each per divide
        if !v.is_empty() && ctx.rng.p(rates.divide_mut * mult) {
            let pos = ctx.rng.uniform_int(v.len());
            v[pos] = inst_set.random_inst(ctx.rng);
        }
        if v.len() < max && ctx.rng.p(rates.divide_ins * mult) {
            let pos = ctx.rng.uniform_int(v.len() + 1);
            let inst = inst_set.random_inst(ctx.rng);
            v.insert(pos, inst);
        }
        if v.len() > min && ctx.rng.p(rates.divide_del * mult) {
            let pos = ctx.rng.uniform_int(v.len());
            v.remove(pos);
        }
        if ctx.rng.p(rates.divide_slip * mult) {
            self.slip_mutation(ctx, v);
        }
        if !v.is_empty() && ctx.rng.p(rates.divide_uniform * mult) {
            let pos = ctx.rng.uniform_int(v.len());
            match self.uniform_draw(ctx) {
                UniformDraw::Point(inst) => v[pos] = inst,
                UniformDraw::Delete if v.len() > min => {
                    v.remove(pos);
                }
                UniformDraw::Insert(inst) if v.len() < max => v.insert(pos, inst),
                _ => {}
            }
        }

        // Per site
        if rates.div_mut > 0.0 {
            for i in 0..v.len() {
                if ctx.rng.p(rates.div_mut * mult) {
                    v[i] = inst_set.random_inst(ctx.rng);
                }
            }
        }
        if rates.div_ins > 0.0 {
            for i in (0..v.len()).rev() {
                if v.len() < max && ctx.rng.p(rates.div_ins * mult) {
                    let inst = inst_set.random_inst(ctx.rng);
                    v.insert(i, inst);
                }
            }
        }
        if rates.div_del > 0.0 {
            let mut i = 0;
            while i < v.len() {
                if v.len() > min && ctx.rng.p(rates.div_del * mult) {
                    v.remove(i);
                } else {
                    i += 1;
                }
            }
        }
    }

    fn parent_mutations(&self, ctx: &mut ExecutionContext<'_>, parent_len: usize, mult: f64) -> Vec<ParentEdit> {
        let rate = self.config.mutations.parent_mut * mult;
        if rate <= 0.0 {
            return Vec::new();
        }
        let mut edits = Vec::new();
        for pos in 0..parent_len {
            if ctx.rng.p(rate) {
                edits.push((pos, self.inst_set.random_inst(ctx.rng)));
            }
        }
        edits
    }

    /// Duplicate or delete the span between two random cut points.
    fn slip_mutation(&self, ctx: &mut ExecutionContext<'_>, v: &mut Vec<Instruction>) {
        let len = v.len();
        if len == 0 {
            return;
        }
        let from = ctx.rng.uniform_int(len + 1);
        let to = ctx.rng.uniform_int(len + 1);

        if to > from {
            let insert_len = to - from;
            if len + insert_len > self.config.max_genome_size {
                return;
            }
            let segment: Vec<Instruction> = match self.config.slip_fill_mode {
                SlipFillMode::Duplication => v[from..to].to_vec(),
                SlipFillMode::Random => (0..insert_len)
                    .map(|_| self.inst_set.random_inst(ctx.rng))
                    .collect(),
            };
            v.splice(to..to, segment);
        } else if to < from {
            if len - (from - to) < self.config.min_genome_size {
                return;
            }
            v.drain(to..from);
        }
    }

    // =========================================================================
    // Parasites
    // =========================================================================

    /// Receive parasite code right after the first exact occurrence of
    /// `label`. Returns false when it does not fit or the label is absent.
    pub fn inject_host(&mut self, label: &CodeLabel, code: &Genome) -> bool {
        if code.len() + self.memory.len() > self.config.max_genome_size {
            return false;
        }
        let Some(line) = self.find_label_full(label) else {
            return false;
        };

        let at = line + 1;
        self.memory
            .insert_slice(at, code, InstFlags::empty().with_injected());
        let len = self.memory.len();
        for thread in &mut self.threads {
            for head in &mut thread.heads {
                if head.position() > line {
                    head.jump(code.len() as i64, len);
                }
            }
        }
        self.promoters_dirty = true;
        log::debug!("injected {} lines after line {}", code.len(), line);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{build, op, quiet_config};
    use super::*;
    use crate::config::MutationRates;
    use crate::organism::RecordingOrganism;
    use crate::random::seeded;

    fn ctx_parts() -> (rand_chacha::ChaCha20Rng, RecordingOrganism) {
        (seeded(5), RecordingOrganism::new())
    }

    #[test]
    fn test_allocate_zero_faults_without_resize() {
        for len in [1usize, 8, 20, 100] {
            let genome = vec!["nop-X"; len];
            let mut hw = build(&genome, quiet_config());
            let (mut rng, mut org) = ctx_parts();
            let mut ctx = ExecutionContext::new(&mut rng, &mut org);
            let result = hw.allocate_main(&mut ctx, 0);
            assert!(!result.is_success());
            assert_eq!(hw.memory().len(), len);
            assert!(!hw.is_allocated());
            assert!(org.has_fault("Allocate of 0 too small"));
        }
    }

    #[test]
    fn test_allocate_bounds() {
        let mut hw = build(&["nop-X"; 10], quiet_config());
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);

        assert!(!hw.allocate_main(&mut ctx, 25).is_success());
        assert!(!hw.allocate_main(&mut ctx, 4).is_success());
        assert_eq!(hw.memory().len(), 10);

        assert!(hw.allocate_main(&mut ctx, 10).is_success());
        assert_eq!(hw.memory().len(), 20);
        assert!(hw.is_allocated());
        assert!(!hw.allocate_main(&mut ctx, 10).is_success());
        drop(ctx);

        assert!(org.has_fault("Allocate too large (25 > 20)"));
        assert!(org.has_fault("Allocate too small (10 > 8)"));
        assert!(org.has_fault("Allocate already active"));
    }

    #[test]
    fn test_allocate_post_size_bounds() {
        let mut hw = build(&["nop-X"; 3], quiet_config());
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(!hw.allocate_main(&mut ctx, 3).is_success());
        drop(ctx);
        assert!(org.has_fault("Invalid post-allocate size (6)"));
    }

    #[test]
    fn test_allocate_default_fill() {
        let mut hw = build(&["inc"; 10], quiet_config());
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(hw.allocate_main(&mut ctx, 10).is_success());
        assert!(hw.memory().insts()[10..].iter().all(|&i| i == Instruction::DEFAULT));
    }

    /// Parent with an executed first half and a copied second half
    fn ready_to_divide(len: usize) -> Hardware {
        let mut hw = build(&vec!["nop-X"; len], quiet_config());
        for pos in 0..len / 2 {
            hw.memory.set_flags(pos, InstFlags::EXECUTED);
        }
        for pos in len / 2..len {
            hw.memory.set_flags(pos, InstFlags::COPIED);
        }
        hw.mal_active = true;
        hw
    }

    #[test]
    fn test_divide_failure_is_atomic() {
        let mut hw = ready_to_divide(20);
        for pos in 10..20 {
            hw.memory.clear_flags_at(pos, InstFlags::COPIED);
        }
        let before = hw.memory().clone();
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        let result = hw.divide_main(&mut ctx, 10, 0, 1.0);
        drop(ctx);
        assert!(!result.is_success());
        assert_eq!(hw.memory(), &before);
        assert!(org.children.is_empty());
        assert!(org.has_fault("Too few copied commands (0 < 5)"));
    }

    #[test]
    fn test_divide_bad_lengths() {
        let mut hw = ready_to_divide(20);
        let before = hw.memory().clone();
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(!hw.divide_main(&mut ctx, 18, 0, 1.0).is_success());
        assert!(!hw.divide_main(&mut ctx, 3, 0, 1.0).is_success());
        drop(ctx);
        assert_eq!(hw.memory(), &before);
        assert!(org.has_fault("Invalid offspring length (2)"));
        assert!(org.has_fault("Invalid post-divide length (3)"));
    }

    #[test]
    fn test_divide_requires_allocate() {
        let mut hw = ready_to_divide(20);
        hw.mal_active = false;
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(!hw.divide_main(&mut ctx, 10, 0, 1.0).is_success());
        assert_eq!(org.faults[0].location, FaultLocation::Divide);
    }

    #[test]
    fn test_sterilize_keeps_parent() {
        let mut hw = ready_to_divide(20);
        let before = hw.memory().clone();
        let (mut rng, mut org) = ctx_parts();
        org.verdicts.push_back(ViabilityVerdict::Sterilize);
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(!hw.divide_main(&mut ctx, 10, 0, 1.0).is_success());
        drop(ctx);
        assert_eq!(hw.memory(), &before);
        assert!(org.children.is_empty());
    }

    #[test]
    fn test_split_divide_resets_parent() {
        let mut hw = ready_to_divide(20);
        hw.set_register(crate::cpu::REG_BX, 7);
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert_eq!(hw.divide_main(&mut ctx, 10, 0, 1.0), StepResult::Suppressed);
        drop(ctx);
        assert_eq!(org.children.len(), 1);
        assert_eq!(org.children[0].len(), 10);
        assert_eq!(hw.memory().len(), 10);
        assert_eq!(hw.register(crate::cpu::REG_BX), 0);
        assert!(!hw.is_allocated());
        assert!(hw.memory().all_flags().iter().all(|f| !f.executed()));
    }

    #[test]
    fn test_revert_discards_divide_mutations() {
        let mut config = quiet_config();
        config.mutations = MutationRates {
            div_mut: 1.0,
            ..MutationRates::none()
        };
        let mut hw = build(&vec!["nop-X"; 20], config);
        for pos in 0..10 {
            hw.memory.set_flags(pos, InstFlags::EXECUTED);
            hw.memory.set_flags(pos + 10, InstFlags::COPIED);
        }
        hw.mal_active = true;
        let (mut rng, mut org) = ctx_parts();
        org.verdicts.push_back(ViabilityVerdict::Revert);
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        hw.divide_main(&mut ctx, 10, 0, 1.0);
        drop(ctx);
        let nop_x = op(&hw, "nop-X");
        assert!(org.children[0].iter().all(|&i| i == nop_x));
    }

    #[test]
    fn test_resample_limit_accepts_last_draw() {
        let mut config = quiet_config();
        config.resample_limit = 3;
        let mut hw = build(&vec!["nop-X"; 20], config);
        for pos in 0..10 {
            hw.memory.set_flags(pos, InstFlags::EXECUTED);
            hw.memory.set_flags(pos + 10, InstFlags::COPIED);
        }
        hw.mal_active = true;
        let (mut rng, mut org) = ctx_parts();
        org.verdicts.extend([ViabilityVerdict::Resample; 5]);
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        assert!(hw.divide_main(&mut ctx, 10, 0, 1.0).is_success());
        drop(ctx);
        assert_eq!(org.children.len(), 1);
        assert_eq!(org.verdicts.len(), 2);
    }

    #[test]
    fn test_divide_insert_and_delete_bounds() {
        let mut config = quiet_config();
        config.min_genome_size = 4;
        config.max_genome_size = 6;
        config.mutations = MutationRates {
            div_ins: 1.0,
            ..MutationRates::none()
        };
        let hw = build(&["nop-X"; 5], config);
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        let mut child = Genome::from(vec![Instruction(3); 5]);
        hw.divide_mutations(&mut ctx, &mut child, 1.0);
        assert_eq!(child.len(), 6);

        let mut config = quiet_config();
        config.min_genome_size = 4;
        config.mutations = MutationRates {
            div_del: 1.0,
            ..MutationRates::none()
        };
        let hw = build(&["nop-X"; 5], config);
        let mut child = Genome::from(vec![Instruction(3); 9]);
        hw.divide_mutations(&mut ctx, &mut child, 1.0);
        assert_eq!(child.len(), 4);
    }

    #[test]
    fn test_slip_stays_in_bounds() {
        let mut config = quiet_config();
        config.min_genome_size = 5;
        config.max_genome_size = 15;
        config.mutations = MutationRates {
            divide_slip: 1.0,
            ..MutationRates::none()
        };
        let hw = build(&["nop-X"; 10], config);
        let (mut rng, mut org) = ctx_parts();
        let mut ctx = ExecutionContext::new(&mut rng, &mut org);
        for _ in 0..200 {
            let mut child: Genome = (0..10).map(|i| Instruction(i as u8)).collect();
            hw.divide_mutations(&mut ctx, &mut child, 1.0);
            assert!((5..=15).contains(&child.len()), "len {}", child.len());
        }
    }

    #[test]
    fn test_inject_host_shifts_heads() {
        let mut hw = build(&["nop-X", "nop-A", "nop-B", "inc", "dec", "nop-X"], quiet_config());
        hw.set_head(crate::cpu::HeadKind::Read, 4);
        hw.set_head(crate::cpu::HeadKind::Write, 1);
        let code = Genome::from(vec![op(&hw, "inc"), op(&hw, "inc")]);

        assert!(hw.inject_host(&CodeLabel::from_nops(&[0, 1]), &code));
        assert_eq!(hw.memory().len(), 8);
        assert!(hw.memory().flags(3).injected());
        assert!(hw.memory().flags(4).injected());
        assert!(!hw.memory().flags(5).injected());
        assert_eq!(hw.head_position(crate::cpu::HeadKind::Read), 6);
        assert_eq!(hw.head_position(crate::cpu::HeadKind::Write), 1);

        assert!(!hw.inject_host(&CodeLabel::from_nops(&[2, 2]), &code));
        let huge = Genome::from(vec![Instruction(0); 2048]);
        assert!(!hw.inject_host(&CodeLabel::from_nops(&[0, 1]), &huge));
    }
}
