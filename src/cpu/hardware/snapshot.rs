//! Checkpoints
//!
//! A [`HardwareSnapshot`] holds everything a hardware needs to resume
//! bit-identically. The instruction set and configuration are not part of
//! it: restore takes them from the caller and checks the snapshot fits.

use super::{Hardware, Promoter};
use crate::config::HardwareConfig;
use crate::cpu::inst_set::InstSet;
use crate::cpu::instruction::{InstFlags, Instruction};
use crate::cpu::label::MAX_LABEL_SIZE;
use crate::cpu::library::InstFunction;
use crate::cpu::memory::{Genome, GenomeMemory};
use crate::cpu::stack::CpuStack;
use crate::cpu::thread::ExecThread;
use crate::error::{CpuError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub memory: Vec<Instruction>,
    pub flags: Vec<InstFlags>,
    /// Tail lines kept for necrotic allocation
    pub freed: Vec<Instruction>,
    /// Genome the current life started from
    pub genome: Genome,
    pub threads: Vec<ExecThread>,
    pub cur_thread: usize,
    pub thread_id_chart: u32,
    pub global_stack: CpuStack,
    pub inst_cost: Vec<u32>,
    pub inst_ft_cost: Vec<u32>,
    pub mal_active: bool,
    pub to_die: bool,
    pub time_used: u64,
    pub cpu_cycles: u64,
    pub max_executed: u64,
    pub promoters: Vec<Promoter>,
    pub promoter_index: i32,
    pub promoter_offset: usize,
}

impl HardwareSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn checkpoint_error(message: impl Into<String>) -> CpuError {
    CpuError::Checkpoint(message.into())
}

impl Hardware {
    pub fn snapshot(&self) -> HardwareSnapshot {
        HardwareSnapshot {
            memory: self.memory.insts().to_vec(),
            flags: self.memory.all_flags().to_vec(),
            freed: self.memory.freed().to_vec(),
            genome: self.genome.clone(),
            threads: self.threads.clone(),
            cur_thread: self.cur_thread,
            thread_id_chart: self.thread_id_chart,
            global_stack: self.global_stack.clone(),
            inst_cost: self.inst_cost.clone(),
            inst_ft_cost: self.inst_ft_cost.clone(),
            mal_active: self.mal_active,
            to_die: self.to_die,
            time_used: self.time_used,
            cpu_cycles: self.cpu_cycles,
            max_executed: self.max_executed,
            promoters: self.promoters.clone(),
            promoter_index: self.promoter_index,
            promoter_offset: self.promoter_offset,
        }
    }

    /// Rebuild a hardware from a checkpoint.
    ///
    /// # Errors
    /// `CpuError::InvalidOpcode` for opcodes outside `inst_set`, and
    /// `CpuError::Checkpoint` when the thread list, cost tables, heads or
    /// promoter cursor do not fit the memory and configuration.
    pub fn restore(
        inst_set: Arc<InstSet>,
        config: Arc<HardwareConfig>,
        snapshot: HardwareSnapshot,
    ) -> Result<Self> {
        let HardwareSnapshot {
            memory,
            flags,
            freed,
            genome,
            mut threads,
            cur_thread,
            thread_id_chart,
            global_stack,
            inst_cost,
            inst_ft_cost,
            mal_active,
            to_die,
            time_used,
            cpu_cycles,
            max_executed,
            promoters,
            promoter_index,
            promoter_offset,
        } = snapshot;

        if memory.is_empty() {
            return Err(checkpoint_error("memory is empty"));
        }
        if let Some((pos, inst)) = memory.iter().enumerate().find(|(_, i)| !inst_set.contains(**i)) {
            return Err(CpuError::InvalidOpcode { op: inst.op(), pos });
        }
        let memory = GenomeMemory::from_parts(memory, flags)
            .ok_or_else(|| checkpoint_error("flag count does not match memory length"))?
            .with_freed(freed);
        let len = memory.len();

        let cap = config.max_cpu_threads.min(32);
        if threads.is_empty() || threads.len() > cap {
            return Err(checkpoint_error(format!(
                "{} threads (allowed 1..={})",
                threads.len(),
                cap
            )));
        }
        if cur_thread >= threads.len() {
            return Err(checkpoint_error(format!(
                "current thread {} of {}",
                cur_thread,
                threads.len()
            )));
        }
        let chart = threads.iter().try_fold(0u32, |chart, t| {
            let bit = 1u32.checked_shl(t.id).filter(|b| chart & b == 0)?;
            Some(chart | bit)
        });
        if chart != Some(thread_id_chart) {
            return Err(checkpoint_error("thread ids do not match the id bitmap"));
        }

        for thread in &mut threads {
            if let Some(head) = thread.heads.iter().find(|h| !h.is_valid(len)) {
                return Err(checkpoint_error(format!(
                    "thread {} has a head at {} outside {} lines",
                    thread.id,
                    head.raw_position(),
                    len
                )));
            }
            if thread.next_label.len() > MAX_LABEL_SIZE || thread.read_label.len() > MAX_LABEL_SIZE {
                return Err(checkpoint_error(format!("thread {} holds an oversized label", thread.id)));
            }
            thread.local_stack = normalized(&thread.local_stack);
        }

        if inst_cost.len() != inst_set.len() || inst_ft_cost.len() != inst_set.len() {
            return Err(checkpoint_error(format!(
                "cost tables have {}/{} entries for {} instructions",
                inst_cost.len(),
                inst_ft_cost.len(),
                inst_set.len()
            )));
        }
        if promoter_index < -1 || promoter_index >= promoters.len() as i32 {
            return Err(checkpoint_error(format!(
                "promoter index {} of {}",
                promoter_index,
                promoters.len()
            )));
        }

        let marker = inst_set.find(InstFunction::Promoter);
        let promoters_dirty = promoters.iter().any(|p| Some(memory.get(p.pos)) != marker || p.pos >= len);
        if promoters_dirty {
            log::warn!("checkpoint promoter list does not match memory; recomputing");
        }

        Ok(Self {
            inst_set,
            config: config.clone(),
            genome,
            memory,
            threads,
            cur_thread,
            thread_id_chart,
            global_stack: normalized(&global_stack),
            inst_cost,
            inst_ft_cost,
            mal_active,
            to_die,
            running: false,
            time_used,
            cpu_cycles,
            max_executed,
            divided: false,
            promoters,
            promoter_index,
            promoter_offset: promoter_offset % config.promoters.code_size.max(1),
            promoters_dirty,
        })
    }
}

/// Stack pointer folded back into range
fn normalized(stack: &CpuStack) -> CpuStack {
    CpuStack::from_raw(stack.raw_values(), stack.pointer())
}
