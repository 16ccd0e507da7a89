//! Hardware - The virtual CPU an organism's genome runs on
//!
//! One `Hardware` owns the executable memory, one or more execution
//! threads, the global stack and the remaining per-opcode cost counters.
//! The outer scheduler drives it one tick at a time through
//! [`Hardware::single_process`], lending it a random stream and the
//! organism it belongs to.
//!
//! Instruction handlers live in the `ops_*` files as `impl Hardware`
//! blocks. Label search, replication and the two optional extensions
//! (promoters, interrupts) each have their own module.

mod interrupt;
mod ops_flow;
mod ops_heads;
mod ops_math;
mod ops_replication;
mod ops_world;
mod promoter;
mod replication;
mod search;
mod snapshot;

pub use interrupt::InterruptKind;
pub use promoter::Promoter;
pub use snapshot::HardwareSnapshot;

use super::head::{Head, HeadKind};
use super::inst_set::InstSet;
use super::instruction::{InstFlags, Instruction};
use super::library::InstFunction;
use super::memory::{Genome, GenomeMemory};
use super::stack::CpuStack;
use super::thread::{next_register, prev_register, ExecThread, NUM_REGISTERS, REG_AX, REG_BX, REG_CX};
use super::label::MAX_LABEL_SIZE;
use super::NUM_NOPS;
use crate::config::HardwareConfig;
use crate::error::{CpuError, Result};
use crate::organism::{FaultLocation, FaultSeverity, Organism};
use crate::random::Randomness;
use std::sync::Arc;

/// Result of executing a single instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Done; the IP advances past the instruction
    Continue,
    /// Done; the handler already placed the IP
    Suppressed,
    /// Instruction failed and acted as a no-op; the IP still advances
    Failed(String),
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    fn advances_ip(&self) -> bool {
        !matches!(self, Self::Suppressed)
    }
}

/// Ambient collaborators lent to the hardware for one tick
pub struct ExecutionContext<'a> {
    pub rng: &'a mut dyn Randomness,
    pub organism: &'a mut dyn Organism,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(rng: &'a mut dyn Randomness, organism: &'a mut dyn Organism) -> Self {
        Self { rng, organism }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Instructions whose handler ran
    pub executed: u32,
    /// A divide committed during the tick
    pub divided: bool,
    /// The organism was told to die at the end of the tick
    pub died: bool,
}

/// The virtual CPU
#[derive(Debug, Clone)]
pub struct Hardware {
    inst_set: Arc<InstSet>,
    config: Arc<HardwareConfig>,
    /// Genome the current life started from
    genome: Genome,
    memory: GenomeMemory,
    threads: Vec<ExecThread>,
    cur_thread: usize,
    /// Bit i set while a live thread has id i
    thread_id_chart: u32,
    global_stack: CpuStack,
    inst_cost: Vec<u32>,
    inst_ft_cost: Vec<u32>,
    mal_active: bool,
    to_die: bool,
    running: bool,
    time_used: u64,
    cpu_cycles: u64,
    max_executed: u64,
    divided: bool,
    promoters: Vec<Promoter>,
    promoter_index: i32,
    promoter_offset: usize,
    promoters_dirty: bool,
}

impl Hardware {
    /// Build a hardware for a newborn organism.
    ///
    /// # Errors
    /// Rejects an invalid configuration, empty or oversized genomes and
    /// opcodes outside `inst_set`.
    pub fn new(inst_set: Arc<InstSet>, config: Arc<HardwareConfig>, genome: &Genome) -> Result<Self> {
        config.validate()?;
        if genome.is_empty() || genome.len() > config.max_genome_size {
            return Err(CpuError::GenomeLength {
                len: genome.len(),
                min: 1,
                max: config.max_genome_size,
            });
        }
        if let Some((pos, inst)) = genome.iter().enumerate().find(|(_, i)| !inst_set.contains(**i)) {
            return Err(CpuError::InvalidOpcode { op: inst.op(), pos });
        }

        let mut hw = Self {
            inst_set,
            config,
            genome: genome.clone(),
            memory: GenomeMemory::from_genome(genome),
            threads: Vec::new(),
            cur_thread: 0,
            thread_id_chart: 0,
            global_stack: CpuStack::new(),
            inst_cost: Vec::new(),
            inst_ft_cost: Vec::new(),
            mal_active: false,
            to_die: false,
            running: false,
            time_used: 0,
            cpu_cycles: 0,
            max_executed: 0,
            divided: false,
            promoters: Vec::new(),
            promoter_index: -1,
            promoter_offset: 0,
            promoters_dirty: true,
        };
        hw.reset();
        Ok(hw)
    }

    /// Return to a fresh single-thread state over the current memory.
    pub fn reset(&mut self) {
        self.global_stack.clear();
        self.threads.clear();
        self.threads.push(ExecThread::new(0));
        self.thread_id_chart = 1;
        self.cur_thread = 0;
        self.mal_active = false;
        self.to_die = false;
        self.time_used = 0;
        self.cpu_cycles = 0;
        self.memory.clear_flags(
            InstFlags::EXECUTED | InstFlags::COPIED | InstFlags::MUTATED | InstFlags::COPY_MUT,
        );
        self.genome = self.memory.to_genome();
        self.max_executed = self.config.max_executed(self.genome.len());
        self.inst_cost = self.inst_set.cost_table();
        self.inst_ft_cost = self.inst_set.ft_cost_table();

        self.promoters.clear();
        self.promoter_index = -1;
        self.promoter_offset = 0;
        self.promoters_dirty = true;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn inst_set(&self) -> &Arc<InstSet> {
        &self.inst_set
    }

    pub fn config(&self) -> &Arc<HardwareConfig> {
        &self.config
    }

    pub fn memory(&self) -> &GenomeMemory {
        &self.memory
    }

    /// Genome this life started from
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn threads(&self) -> &[ExecThread] {
        &self.threads
    }

    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn cur_thread(&self) -> usize {
        self.cur_thread
    }

    pub fn thread_id_chart(&self) -> u32 {
        self.thread_id_chart
    }

    /// Currently selected thread
    pub fn thread(&self) -> &ExecThread {
        &self.threads[self.cur_thread]
    }

    pub fn thread_mut(&mut self) -> &mut ExecThread {
        &mut self.threads[self.cur_thread]
    }

    pub fn register(&self, reg: usize) -> i32 {
        self.thread().registers[reg % NUM_REGISTERS]
    }

    pub fn set_register(&mut self, reg: usize, value: i32) {
        self.thread_mut().registers[reg % NUM_REGISTERS] = value;
    }

    pub fn head_position(&self, kind: HeadKind) -> usize {
        self.thread().head(kind).position()
    }

    pub fn ip_position(&self) -> usize {
        self.head_position(HeadKind::Ip)
    }

    /// Move a head of the current thread (normalized into memory)
    pub fn set_head(&mut self, kind: HeadKind, pos: i64) {
        let len = self.memory.len();
        self.thread_mut().head_mut(kind).set(pos, len);
    }

    pub fn global_stack(&self) -> &CpuStack {
        &self.global_stack
    }

    pub fn is_allocated(&self) -> bool {
        self.mal_active
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_used(&self) -> u64 {
        self.time_used
    }

    pub fn cpu_cycles(&self) -> u64 {
        self.cpu_cycles
    }

    pub fn max_executed(&self) -> u64 {
        self.max_executed
    }

    pub fn marked_to_die(&self) -> bool {
        self.to_die
    }

    /// Remaining per-use and first-time cost counters, indexed by opcode
    pub fn cost_counters(&self) -> (&[u32], &[u32]) {
        (&self.inst_cost, &self.inst_ft_cost)
    }

    /// Flag a line as a breakpoint (logged whenever the IP reaches it)
    pub fn set_breakpoint(&mut self, pos: usize) {
        self.memory.set_flags(pos, InstFlags::BREAKPOINT);
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Run one scheduling tick.
    pub fn single_process(&mut self, ctx: &mut ExecutionContext<'_>) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.running = true;
        self.divided = false;
        ctx.organism.set_running(true);

        let promoters = self.config.promoters_enabled();
        if promoters && self.time_used == 0 {
            self.terminate();
        }

        self.time_used += 1;
        self.cpu_cycles += 1;

        if promoters && ctx.rng.p(1.0 - self.config.promoters.processivity) {
            self.terminate();
        }

        let num_inst =
            (self.threads.len() - 1) * self.config.thread_slicing_method as usize + 1;

        for _ in 0..num_inst {
            self.thread_next();
            if self.config.interrupts_enabled() {
                self.check_interrupts(ctx);
            }

            let len = self.memory.len();
            self.thread_mut().ip_mut().adjust(len);
            let ip = self.ip_position();
            if self.memory.flags(ip).breakpoint() {
                log::debug!("breakpoint at line {} (thread {})", ip, self.thread().id);
            }

            let inst = self.memory.get(ip);
            if !self.pay_costs(inst) {
                continue;
            }
            if promoters {
                self.thread_mut().promoter_inst_executed += 1;
            }

            let prob_fail = self.inst_set.prob_fail(inst);
            let exec = !(prob_fail > 0.0 && ctx.rng.p(prob_fail));
            let result = if exec {
                outcome.executed += 1;
                self.execute_inst(ctx, inst)
            } else {
                StepResult::Continue
            };

            if result.advances_ip() {
                let len = self.memory.len();
                self.thread_mut().ip_mut().advance(len);
            }
            self.time_used += self.inst_set.addl_time_cost(inst) as u64;

            if promoters {
                let p = &self.config.promoters;
                let inst_max = p.inst_max;
                if ctx.rng.p(1.0 - p.inst_processivity) {
                    self.terminate();
                }
                if inst_max > 0 && self.thread().promoter_inst_executed >= inst_max {
                    self.terminate();
                }
            }
        }

        let out_of_time = self.max_executed > 0 && self.time_used >= self.max_executed;
        if out_of_time || self.to_die || ctx.organism.should_die() {
            log::debug!("organism dies after {} time units", self.time_used);
            ctx.organism.die();
            outcome.died = true;
        }

        outcome.divided = self.divided;
        self.running = false;
        ctx.organism.set_running(false);
        outcome
    }

    /// Charge the opcode's costs; true when it may execute now.
    fn pay_costs(&mut self, inst: Instruction) -> bool {
        if !self.config.pay_costs {
            return true;
        }
        let op = inst.index();
        if let Some(ft) = self.inst_ft_cost.get_mut(op) {
            if *ft > 0 {
                *ft -= 1;
                return false;
            }
        }
        let base = self.inst_set.cost(inst);
        if base > 0 {
            if let Some(remaining) = self.inst_cost.get_mut(op) {
                if *remaining > 1 {
                    *remaining -= 1;
                    return false;
                }
                *remaining = base;
            }
        }
        true
    }

    fn execute_inst(&mut self, ctx: &mut ExecutionContext<'_>, inst: Instruction) -> StepResult {
        let ip = self.ip_position();
        self.memory.set_flags(ip, InstFlags::EXECUTED);

        let function = match self.inst_set.function(inst) {
            Some(f) => f,
            None => {
                return self.fault(
                    ctx,
                    FaultLocation::Instruction,
                    FaultSeverity::Error,
                    format!("invalid opcode {} at line {}", inst, ip),
                )
            }
        };
        log::trace!("thread {} line {}: {}", self.thread().id, ip, function.mnemonic());

        self.dispatch(ctx, function)
    }

    fn dispatch(&mut self, ctx: &mut ExecutionContext<'_>, function: InstFunction) -> StepResult {
        use InstFunction as F;
        match function {
            F::NopA | F::NopB | F::NopC | F::NopX => StepResult::Continue,
            F::Catch | F::Label | F::Promoter | F::MsgHandler | F::MovedHandler => {
                StepResult::Continue
            }

            // Conditionals (ops_flow.rs)
            F::IfEqu0 => self.if_unary(|a| a == 0),
            F::IfNot0 => self.if_unary(|a| a != 0),
            F::IfGr0 => self.if_unary(|a| a > 0),
            F::IfGrEqu0 => self.if_unary(|a| a >= 0),
            F::IfLess0 => self.if_unary(|a| a < 0),
            F::IfLsEqu0 => self.if_unary(|a| a <= 0),
            F::IfBit1 => self.if_unary(|a| a & 1 == 1),
            F::IfNEqu => self.if_binary(|a, b| a != b),
            F::IfEqu => self.if_binary(|a, b| a == b),
            F::IfGr => self.if_binary(|a, b| a > b),
            F::IfGrEqu => self.if_binary(|a, b| a >= b),
            F::IfLess => self.if_binary(|a, b| a < b),
            F::IfLsEqu => self.if_binary(|a, b| a <= b),
            F::IfANotEqB => self.if_fixed(REG_AX, REG_BX),
            F::IfBNotEqC => self.if_fixed(REG_BX, REG_CX),
            F::IfANotEqC => self.if_fixed(REG_AX, REG_CX),

            // Flow (ops_flow.rs)
            F::JumpF => self.inst_jump(ctx, 1),
            F::JumpB => self.inst_jump(ctx, -1),
            F::Call => self.inst_call(ctx),
            F::Return => self.inst_return(),
            F::Throw => self.inst_throw(),
            F::ThrowIf0 => self.inst_throw_if(|bx| bx == 0),
            F::ThrowIfNot0 => self.inst_throw_if(|bx| bx != 0),
            F::Goto => self.inst_goto(),
            F::GotoIf0 => self.inst_goto_if(|bx| bx == 0),
            F::GotoIfNot0 => self.inst_goto_if(|bx| bx != 0),
            F::Skip => self.inst_skip(),
            F::ForkThread => self.inst_fork_thread(ctx),
            F::KillThread => self.inst_kill_thread(ctx),
            F::ThreadId => self.inst_thread_id(),

            // Stacks, registers, arithmetic (ops_math.rs)
            F::Pop => self.inst_pop(),
            F::Push => self.inst_push(),
            F::SwitchStack => self.inst_switch_stack(),
            F::FlipStack => self.inst_flip_stack(),
            F::Swap => self.inst_swap(),
            F::SwapAB => self.swap_fixed(REG_AX, REG_BX),
            F::SwapBC => self.swap_fixed(REG_BX, REG_CX),
            F::SwapAC => self.swap_fixed(REG_AX, REG_CX),
            F::CopyReg => self.inst_copy_reg(),
            F::Reset => self.inst_reset(),
            F::ShiftR => self.unary_op(|a| a >> 1),
            F::ShiftL => self.unary_op(|a| a.wrapping_shl(1)),
            F::Bit1 => self.unary_op(|a| a | 1),
            F::Inc => self.unary_op(|a| a.wrapping_add(1)),
            F::Dec => self.unary_op(|a| a.wrapping_sub(1)),
            F::Zero => self.unary_op(|_| 0),
            F::Neg => self.unary_op(|a| a.wrapping_neg()),
            F::Square => self.unary_op(|a| a.wrapping_mul(a)),
            F::Not => self.unary_op(|a| !a),
            F::Sqrt => self.inst_sqrt(ctx),
            F::Log => self.inst_log(ctx, "log", f64::ln),
            F::Log10 => self.inst_log(ctx, "log10", f64::log10),
            F::Add => self.binary_op(|a, b| a.wrapping_add(b)),
            F::Sub => self.binary_op(|a, b| a.wrapping_sub(b)),
            F::Mult => self.binary_op(|a, b| a.wrapping_mul(b)),
            F::Nand => self.binary_op(|a, b| !(a & b)),
            F::Nor => self.binary_op(|a, b| !(a | b)),
            F::And => self.binary_op(|a, b| a & b),
            F::Xor => self.binary_op(|a, b| a ^ b),
            F::Div => self.inst_div(ctx),
            F::Mod => self.inst_mod(ctx),
            F::Order => self.inst_order(),
            F::SetNum => self.read_label_value(|l| l.as_int(NUM_NOPS)),
            F::ValGrey => self.read_label_value(|l| l.as_int_grey(NUM_NOPS)),
            F::ValDir => self.read_label_value(|l| l.as_int_direct(NUM_NOPS)),
            F::ValAddP => self.read_label_value(|l| l.as_int_additive_polynomial()),
            F::ValFib => self.read_label_value(|l| l.as_int_fib()),
            F::ValPolyC => self.read_label_value(|l| l.as_int_polynomial_coefficient()),

            // Register-addressed replication (ops_replication.rs)
            F::Copy => self.inst_copy(ctx),
            F::Read => self.inst_read(),
            F::Write => self.inst_write(ctx),
            F::StackRead => self.inst_stack_read(),
            F::StackWrite => self.inst_stack_write(ctx),
            F::Compare => self.inst_compare(ctx),
            F::IfNCpy => self.inst_if_n_cpy(ctx),
            F::Allocate => self.inst_allocate(ctx),
            F::Divide => self.inst_divide(ctx),
            F::CAlloc => self.inst_c_alloc(ctx),
            F::CDivide => self.inst_c_divide(ctx),
            F::Repro => self.inst_repro(ctx),
            F::Die => self.inst_die(),
            F::Inject => self.inst_inject(ctx),
            F::SearchF => self.inst_search(ctx, 1),
            F::SearchB => self.inst_search(ctx, -1),
            F::MemSize => self.inst_mem_size(),
            F::MaxAlloc => self.inst_max_alloc(ctx),
            F::HeadDivide => self.inst_head_divide(ctx),

            // World (ops_world.rs)
            F::TaskGet => self.inst_task_get(ctx),
            F::TaskPut => self.inst_task_put(ctx),
            F::TaskIO => self.inst_task_io(ctx),
            F::Send => self.inst_send(ctx),
            F::Receive => self.inst_receive(ctx),
            F::RotateL => self.inst_rotate(ctx, -1),
            F::RotateR => self.inst_rotate(ctx, 1),
            F::RotateLabel => self.inst_rotate_label(ctx),
            F::Tumble => self.inst_tumble(ctx),
            F::Move => self.inst_move(ctx),

            // Heads (ops_heads.rs)
            F::HeadRead => self.inst_head_read(ctx),
            F::HeadWrite => self.inst_head_write(),
            F::HeadCopy => self.inst_head_copy(ctx),
            F::HeadSearch => self.inst_head_search(ctx),
            F::HeadPush => self.inst_head_push(),
            F::HeadPop => self.inst_head_pop(),
            F::SetHead => self.inst_set_head(),
            F::AdvanceHead => self.inst_advance_head(),
            F::MoveHead => self.inst_move_head(),
            F::JumpHead => self.inst_jump_head(),
            F::GetHead => self.inst_get_head(),
            F::IfLabel => self.inst_if_label(false),
            F::IfLabel2 => self.inst_if_label(true),
            F::SetFlow => self.inst_set_flow(),

            // Regulation (promoter.rs)
            F::Terminate => {
                self.terminate();
                StepResult::Suppressed
            }
            F::Regulate => self.inst_regulate(),
            F::RegulateSpecific => self.inst_regulate_specific(),

            // Interrupts (interrupt.rs)
            F::EndHandler => self.inst_end_handler(ctx),
        }
    }

    /// Report a fault to the organism and fail the instruction.
    pub(crate) fn fault(
        &self,
        ctx: &mut ExecutionContext<'_>,
        location: FaultLocation,
        severity: FaultSeverity,
        message: impl Into<String>,
    ) -> StepResult {
        let message = message.into();
        log::debug!(
            "fault at line {} ({:?} {}): {}",
            self.ip_position(),
            location,
            severity,
            message
        );
        ctx.organism.fault(location, severity, &message);
        StepResult::Failed(message)
    }

    // =========================================================================
    // Operand resolution
    // =========================================================================

    /// Modifier of the NOP right after the IP (no wrap at the last line)
    fn peek_next_nop(&self) -> Option<(usize, u8)> {
        let pos = self.thread().ip().next_position(self.memory.len())?;
        self.inst_set.nop_mod(self.memory.get(pos)).map(|m| (pos, m))
    }

    /// Step the IP onto a following NOP, mark it executed and return its modifier.
    fn consume_next_nop(&mut self) -> Option<u8> {
        let (pos, modifier) = self.peek_next_nop()?;
        let len = self.memory.len();
        self.thread_mut().ip_mut().advance(len);
        self.memory.set_flags(pos, InstFlags::EXECUTED);
        Some(modifier)
    }

    pub fn find_modified_register(&mut self, default: usize) -> usize {
        self.consume_next_nop()
            .map(|m| m as usize % NUM_REGISTERS)
            .unwrap_or(default)
    }

    pub fn find_modified_next_register(&mut self, default: usize) -> usize {
        self.consume_next_nop()
            .map(|m| m as usize % NUM_REGISTERS)
            .unwrap_or_else(|| next_register(default))
    }

    pub fn find_modified_previous_register(&mut self, default: usize) -> usize {
        self.consume_next_nop()
            .map(|m| m as usize % NUM_REGISTERS)
            .unwrap_or_else(|| prev_register(default))
    }

    pub fn find_modified_head(&mut self, default: HeadKind) -> HeadKind {
        self.consume_next_nop()
            .and_then(|m| HeadKind::from_index(m as usize))
            .unwrap_or(default)
    }

    /// Collect the NOPs following the IP into the thread's `next_label`.
    pub fn read_label(&mut self) {
        let max_exe = self.config.max_label_exe_size;
        self.thread_mut().next_label.clear();
        while self.thread().next_label.len() < MAX_LABEL_SIZE {
            let (pos, modifier) = match self.peek_next_nop() {
                Some(found) => found,
                None => break,
            };
            let len = self.memory.len();
            let thread = self.thread_mut();
            thread.ip_mut().advance(len);
            thread.next_label.add_nop(modifier);
            if thread.next_label.len() <= max_exe {
                self.memory.set_flags(pos, InstFlags::EXECUTED);
            }
        }
    }

    /// Turn the label just read into its complement.
    fn complement_label(&mut self) {
        self.thread_mut().next_label.rotate(1, NUM_NOPS);
    }

    /// Track trailing NOPs passing through the copy loop.
    fn read_inst(&mut self, inst: Instruction) {
        match self.inst_set.nop_mod(inst) {
            Some(m) => self.thread_mut().read_label.add_nop(m),
            None => self.thread_mut().read_label.clear(),
        }
    }

    // =========================================================================
    // Stacks
    // =========================================================================

    fn active_stack_mut(&mut self) -> &mut CpuStack {
        if self.threads[self.cur_thread].use_global_stack {
            &mut self.global_stack
        } else {
            &mut self.threads[self.cur_thread].local_stack
        }
    }

    fn stack_push(&mut self, value: i32) {
        self.active_stack_mut().push(value);
    }

    fn stack_pop(&mut self) -> i32 {
        self.active_stack_mut().pop()
    }

    // =========================================================================
    // Heads and memory
    // =========================================================================

    /// Normalize every head of every thread after a resize.
    pub fn adjust_heads(&mut self) {
        let len = self.memory.len();
        for thread in &mut self.threads {
            for head in &mut thread.heads {
                head.adjust(len);
            }
        }
    }

    /// Line addressed by an arbitrary register value
    fn line_at(&self, raw: i64) -> usize {
        let mut head = Head::new();
        head.set(raw, self.memory.len());
        head.position()
    }

    fn write_line(&mut self, pos: usize, inst: Instruction) {
        self.memory.set(pos, inst);
        self.promoters_dirty = true;
    }

    // =========================================================================
    // Threads
    // =========================================================================

    fn thread_next(&mut self) {
        self.cur_thread = (self.cur_thread + 1) % self.threads.len();
    }

    fn thread_prev(&mut self) {
        let n = self.threads.len();
        self.cur_thread = (self.cur_thread + n - 1) % n;
    }

    /// Clone the current thread under the lowest free id.
    pub fn fork_thread(&mut self) -> bool {
        let cap = self.config.max_cpu_threads.min(32);
        if self.threads.len() >= cap {
            return false;
        }
        let new_id = (!self.thread_id_chart).trailing_zeros();
        if new_id >= 32 {
            return false;
        }
        let mut clone = self.thread().clone();
        clone.id = new_id;
        self.thread_id_chart |= 1 << new_id;
        self.threads.push(clone);
        log::debug!("forked thread {} ({} live)", new_id, self.threads.len());
        true
    }

    /// Remove the current thread; refuses to remove the last one. The last
    /// thread moves into the freed slot.
    pub fn kill_thread(&mut self) -> bool {
        if self.threads.len() == 1 {
            return false;
        }
        let kill = self.cur_thread;
        self.thread_prev();
        let killed_id = self.threads[kill].id;
        self.thread_id_chart ^= 1 << killed_id;
        self.threads.swap_remove(kill);
        if self.cur_thread > kill {
            self.cur_thread -= 1;
        }
        log::debug!("killed thread {} ({} live)", killed_id, self.threads.len());
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::organism::RecordingOrganism;
    use crate::random::seeded;
    use rand_chacha::ChaCha20Rng;

    /// Hardware over `mnemonics` with the full library and no mutations.
    pub(crate) fn build(mnemonics: &[&str], config: HardwareConfig) -> Hardware {
        let set = Arc::new(InstSet::full());
        let genome: Genome = mnemonics
            .iter()
            .map(|m| set.by_mnemonic(m).unwrap())
            .collect();
        Hardware::new(set, Arc::new(config), &genome).unwrap()
    }

    pub(crate) fn quiet_config() -> HardwareConfig {
        let mut config = HardwareConfig::default().with_mutations(crate::config::MutationRates::none());
        config.death_method = crate::config::DeathMethod::Never;
        config
    }

    pub(crate) fn op(hw: &Hardware, mnemonic: &str) -> Instruction {
        hw.inst_set().by_mnemonic(mnemonic).unwrap()
    }

    pub(crate) fn tick(hw: &mut Hardware, rng: &mut ChaCha20Rng, org: &mut RecordingOrganism) -> TickOutcome {
        let mut ctx = ExecutionContext::new(rng, org);
        hw.single_process(&mut ctx)
    }

    #[test]
    fn test_inc_defaults_to_bx() {
        let mut hw = build(&["inc", "nop-X", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_AX), 0);
        assert_eq!(hw.register(REG_BX), 1);
        assert_eq!(hw.register(REG_CX), 0);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_nop_modifier_consumed() {
        let mut hw = build(&["inc", "nop-C", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_CX), 1);
        assert_eq!(hw.register(REG_BX), 0);
        assert_eq!(hw.ip_position(), 2);
        assert!(hw.memory().flags(1).executed());
    }

    #[test]
    fn test_nop_at_end_not_wrapped() {
        let mut hw = build(&["nop-A", "inc"], quiet_config());
        hw.set_head(HeadKind::Ip, 1);
        assert_eq!(hw.find_modified_register(REG_BX), REG_BX);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_modified_next_and_previous_register() {
        let mut hw = build(&["inc", "nop-X", "inc", "nop-A"], quiet_config());
        assert_eq!(hw.find_modified_next_register(REG_BX), REG_CX);
        assert_eq!(hw.find_modified_previous_register(REG_AX), REG_CX);
        hw.set_head(HeadKind::Ip, 2);
        assert_eq!(hw.find_modified_next_register(REG_BX), REG_AX);
        assert_eq!(hw.ip_position(), 3);
    }

    #[test]
    fn test_read_label_marks_first_nop_only() {
        let mut hw = build(&["jump-f", "nop-A", "nop-B", "nop-C", "inc"], quiet_config());
        hw.read_label();
        assert_eq!(hw.thread().next_label.nops(), &[0, 1, 2]);
        assert_eq!(hw.ip_position(), 3);
        assert!(hw.memory().flags(1).executed());
        assert!(!hw.memory().flags(2).executed());
    }

    #[test]
    fn test_first_time_cost_stalls() {
        let mut set = InstSet::new();
        set.register("nop-X", Default::default()).unwrap();
        set.register("inc", crate::cpu::InstSpec::default().with_ft_cost(2)).unwrap();
        let set = Arc::new(set);
        let genome = Genome::from(vec![Instruction(1), Instruction(0)]);
        let mut hw = Hardware::new(set, Arc::new(quiet_config()), &genome).unwrap();
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();

        assert_eq!(tick(&mut hw, &mut rng, &mut org).executed, 0);
        assert_eq!(tick(&mut hw, &mut rng, &mut org).executed, 0);
        assert_eq!(hw.ip_position(), 0);
        assert_eq!(tick(&mut hw, &mut rng, &mut org).executed, 1);
        assert_eq!(hw.register(REG_BX), 1);
    }

    #[test]
    fn test_per_use_cost_cycles() {
        let mut set = InstSet::new();
        set.register("inc", crate::cpu::InstSpec::default().with_cost(3)).unwrap();
        let set = Arc::new(set);
        let genome = Genome::from(vec![Instruction(0)]);
        let mut hw = Hardware::new(set, Arc::new(quiet_config()), &genome).unwrap();
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        let executed: Vec<u32> = (0..6).map(|_| tick(&mut hw, &mut rng, &mut org).executed).collect();
        assert_eq!(executed, vec![0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_failure_probability_still_advances() {
        let mut set = InstSet::new();
        set.register("inc", crate::cpu::InstSpec::default().with_prob_fail(1.0)).unwrap();
        set.register("nop-X", Default::default()).unwrap();
        let set = Arc::new(set);
        let genome = Genome::from(vec![Instruction(0), Instruction(1)]);
        let mut hw = Hardware::new(set, Arc::new(quiet_config()), &genome).unwrap();
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        let outcome = tick(&mut hw, &mut rng, &mut org);
        assert_eq!(outcome.executed, 0);
        assert_eq!(hw.register(REG_BX), 0);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_age_limit_kills() {
        let mut config = quiet_config();
        config.death_method = crate::config::DeathMethod::Fixed;
        config.age_limit = 3;
        let mut hw = build(&["nop-X"; 4], config);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        assert!(!tick(&mut hw, &mut rng, &mut org).died);
        assert!(!tick(&mut hw, &mut rng, &mut org).died);
        assert!(tick(&mut hw, &mut rng, &mut org).died);
        assert!(org.died);
    }

    #[test]
    fn test_die_instruction() {
        let mut hw = build(&["die", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        assert!(tick(&mut hw, &mut rng, &mut org).died);
        assert!(!org.running);
    }

    #[test]
    fn test_thread_invariant() {
        let mut config = quiet_config();
        config.max_cpu_threads = 5;
        let mut hw = build(&["nop-X"; 8], config);
        let mut rng = seeded(99);
        for _ in 0..500 {
            if rng.p(0.5) {
                hw.fork_thread();
            } else {
                hw.kill_thread();
            }
            hw.thread_next();
            assert!(hw.num_threads() >= 1 && hw.num_threads() <= 5);
            assert!(hw.cur_thread() < hw.num_threads());
            let mut ids: Vec<u32> = hw.threads().iter().map(|t| t.id).collect();
            let chart = ids.iter().fold(0u32, |acc, id| acc | (1 << id));
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), hw.num_threads());
            assert_eq!(chart, hw.thread_id_chart());
        }
    }

    #[test]
    fn test_kill_last_thread_refused() {
        let mut hw = build(&["kill-th", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.num_threads(), 1);
        assert_eq!(org.faults[0].location, FaultLocation::ThreadKill);
    }

    #[test]
    fn test_kill_moves_last_thread_into_slot() {
        let mut config = quiet_config();
        config.max_cpu_threads = 4;
        let mut hw = build(&["nop-X"; 4], config);
        assert!(hw.fork_thread());
        assert!(hw.fork_thread());
        // Kill thread 0 while it is current
        assert!(hw.kill_thread());
        let ids: Vec<u32> = hw.threads().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(hw.thread_id_chart(), 0b110);
        assert_eq!(hw.cur_thread(), 1);

        // The lowest free id is reused
        assert!(hw.fork_thread());
        assert_eq!(hw.threads()[2].id, 0);
    }

    #[test]
    fn test_fork_then_slice() {
        let mut config = quiet_config();
        config.max_cpu_threads = 2;
        config.thread_slicing_method = 1;
        let mut hw = build(&["fork-th", "inc", "nop-X", "nop-X"], config);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.num_threads(), 2);
        // Next tick runs both threads: the clone executes `inc`, the parent skipped it.
        let outcome = tick(&mut hw, &mut rng, &mut org);
        assert_eq!(outcome.executed, 2);
        let bx: Vec<i32> = hw.threads().iter().map(|t| t.registers[REG_BX]).collect();
        assert_eq!(bx, vec![0, 1]);
    }

    #[test]
    fn test_new_rejects_bad_genomes() {
        let set = Arc::new(InstSet::heads_default());
        let config = Arc::new(HardwareConfig::default());
        assert!(Hardware::new(set.clone(), config.clone(), &Genome::new()).is_err());
        let bad = Genome::from(vec![Instruction(200)]);
        assert!(matches!(
            Hardware::new(set, config, &bad),
            Err(CpuError::InvalidOpcode { op: 200, pos: 0 })
        ));
    }
}
