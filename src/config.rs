//! Hardware Configuration - Replication bounds, mutation rates, extensions
//!
//! Every field has a default, so a JSON document only needs the values it
//! changes:
//!
//! ```json
//! { "max_cpu_threads": 2, "mutations": { "copy_mut": 0.0 } }
//! ```

use crate::error::{CpuError, Result};
use serde::{Deserialize, Serialize};

/// Which optional extensions are layered on the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArchitectureMode {
    #[default]
    Classic,
    /// Classic plus message/movement interrupts
    ClassicInterrupts,
    /// Classic plus promoter regulation
    Promoters,
}

/// How newly allocated lines are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AllocMethod {
    /// Default opcode
    #[default]
    Default,
    /// Lines freed by earlier divides, then random
    Necrotic,
    /// Independent random draws
    Random,
}

/// What happens to the parent's hardware after a successful divide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DivideMethod {
    /// Parent keeps running where it was
    Leave,
    /// Parent restarts from a fresh state
    #[default]
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeathMethod {
    Never,
    /// Die after `age_limit` executed instructions
    Fixed,
    /// Die after `age_limit * genome length` executed instructions
    #[default]
    LengthScaled,
}

/// Behaviour of `terminate` when no promoter is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoActivePromoterEffect {
    #[default]
    RestartAtZero,
    Kill,
    Stop,
}

/// Content of lines duplicated by a slip mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlipFillMode {
    #[default]
    Duplication,
    Random,
}

/// Mutation probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationRates {
    // Copy-time, per copied instruction
    pub copy_mut: f64,
    pub copy_ins: f64,
    pub copy_del: f64,
    pub copy_slip: f64,
    pub copy_uniform: f64,
    // Divide-time, at most one per divide
    pub divide_mut: f64,
    pub divide_ins: f64,
    pub divide_del: f64,
    pub divide_slip: f64,
    pub divide_uniform: f64,
    // Divide-time, per site of the child
    pub div_mut: f64,
    pub div_ins: f64,
    pub div_del: f64,
    /// Per site of the parent after divide
    pub parent_mut: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            copy_mut: 0.0075,
            copy_ins: 0.0,
            copy_del: 0.0,
            copy_slip: 0.0,
            copy_uniform: 0.0,
            divide_mut: 0.0,
            divide_ins: 0.05,
            divide_del: 0.05,
            divide_slip: 0.0,
            divide_uniform: 0.0,
            div_mut: 0.0,
            div_ins: 0.0,
            div_del: 0.0,
            parent_mut: 0.0,
        }
    }
}

impl MutationRates {
    /// Every rate zero
    pub fn none() -> Self {
        Self {
            copy_mut: 0.0,
            divide_ins: 0.0,
            divide_del: 0.0,
            ..Self::default()
        }
    }

    fn all(&self) -> [(&'static str, f64); 14] {
        [
            ("copy_mut", self.copy_mut),
            ("copy_ins", self.copy_ins),
            ("copy_del", self.copy_del),
            ("copy_slip", self.copy_slip),
            ("copy_uniform", self.copy_uniform),
            ("divide_mut", self.divide_mut),
            ("divide_ins", self.divide_ins),
            ("divide_del", self.divide_del),
            ("divide_slip", self.divide_slip),
            ("divide_uniform", self.divide_uniform),
            ("div_mut", self.div_mut),
            ("div_ins", self.div_ins),
            ("div_del", self.div_del),
            ("parent_mut", self.parent_mut),
        ]
    }
}

/// Promoter regulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoterConfig {
    /// Instructions folded into one promoter bit code
    pub code_size: usize,
    /// Bits of the code consulted per activation test
    pub exe_length: usize,
    /// Set bits within the window needed for activity
    pub exe_threshold: usize,
    /// Per-cycle probability of continuing past the current instruction
    pub processivity: f64,
    /// Per-instruction probability of continuing, counted against `inst_max`
    pub inst_processivity: f64,
    /// Terminate after this many instructions since the last promoter (0 = never)
    pub inst_max: u32,
    pub no_active_effect: NoActivePromoterEffect,
    /// Reset the thread (keeping read and write heads) on terminate
    pub terminate_resets_thread: bool,
}

impl Default for PromoterConfig {
    fn default() -> Self {
        Self {
            code_size: 24,
            exe_length: 3,
            exe_threshold: 2,
            processivity: 1.0,
            inst_processivity: 1.0,
            inst_max: 0,
            no_active_effect: NoActivePromoterEffect::RestartAtZero,
            terminate_resets_thread: false,
        }
    }
}

/// Everything a hardware reads from its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub architecture: ArchitectureMode,
    pub min_genome_size: usize,
    pub max_genome_size: usize,
    /// Allowed ratio between parent and child lengths
    pub child_size_range: f64,
    /// Fraction of the child that must have been copied
    pub min_copied_lines: f64,
    /// Fraction of the parent that must have executed
    pub min_exe_lines: f64,
    /// Divide requires a preceding allocate; allocate refuses when one is pending
    pub require_allocate: bool,
    pub alloc_method: AllocMethod,
    pub divide_method: DivideMethod,
    pub death_method: DeathMethod,
    pub age_limit: u64,
    pub max_cpu_threads: usize,
    /// 0 runs one instruction per tick, 1 runs one per live thread
    pub thread_slicing_method: u32,
    /// Longest label whose NOPs are marked executed when read
    pub max_label_exe_size: usize,
    /// Charge per-opcode costs
    pub pay_costs: bool,
    pub mutations: MutationRates,
    pub slip_fill_mode: SlipFillMode,
    /// Upper bound on viability resample rounds per divide
    pub resample_limit: u32,
    pub promoters: PromoterConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            architecture: ArchitectureMode::Classic,
            min_genome_size: 8,
            max_genome_size: 2048,
            child_size_range: 2.0,
            min_copied_lines: 0.5,
            min_exe_lines: 0.5,
            require_allocate: true,
            alloc_method: AllocMethod::Default,
            divide_method: DivideMethod::Split,
            death_method: DeathMethod::LengthScaled,
            age_limit: 20,
            max_cpu_threads: 1,
            thread_slicing_method: 0,
            max_label_exe_size: 1,
            pay_costs: true,
            mutations: MutationRates::default(),
            slip_fill_mode: SlipFillMode::Duplication,
            resample_limit: 100,
            promoters: PromoterConfig::default(),
        }
    }
}

impl HardwareConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_mutations(mut self, mutations: MutationRates) -> Self {
        self.mutations = mutations;
        self
    }

    pub fn with_architecture(mut self, architecture: ArchitectureMode) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn promoters_enabled(&self) -> bool {
        self.architecture == ArchitectureMode::Promoters
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.architecture == ArchitectureMode::ClassicInterrupts
    }

    /// Instruction budget for an organism born with `genome_len` lines (0 = unlimited)
    pub fn max_executed(&self, genome_len: usize) -> u64 {
        match self.death_method {
            DeathMethod::Never => 0,
            DeathMethod::Fixed => self.age_limit,
            DeathMethod::LengthScaled => self.age_limit.saturating_mul(genome_len as u64),
        }
    }

    /// Reject internally inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.min_genome_size == 0 {
            return Err(CpuError::Config("min_genome_size must be at least 1".into()));
        }
        if self.min_genome_size > self.max_genome_size {
            return Err(CpuError::Config(format!(
                "min_genome_size {} exceeds max_genome_size {}",
                self.min_genome_size, self.max_genome_size
            )));
        }
        if self.child_size_range.is_nan() || self.child_size_range < 1.0 {
            return Err(CpuError::Config(format!(
                "child_size_range {} must be at least 1.0",
                self.child_size_range
            )));
        }
        for (name, value) in [
            ("min_copied_lines", self.min_copied_lines),
            ("min_exe_lines", self.min_exe_lines),
            ("promoters.processivity", self.promoters.processivity),
            ("promoters.inst_processivity", self.promoters.inst_processivity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CpuError::Config(format!("{} = {} is outside [0, 1]", name, value)));
            }
        }
        for (name, value) in self.mutations.all() {
            if !(0.0..=1.0).contains(&value) {
                return Err(CpuError::Config(format!(
                    "mutations.{} = {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        if self.max_cpu_threads == 0 || self.max_cpu_threads > 32 {
            return Err(CpuError::Config(format!(
                "max_cpu_threads {} must be in 1..=32",
                self.max_cpu_threads
            )));
        }
        let p = &self.promoters;
        if p.code_size == 0 || p.code_size > 32 {
            return Err(CpuError::Config(format!(
                "promoters.code_size {} must be in 1..=32",
                p.code_size
            )));
        }
        if p.exe_length == 0 || p.exe_length > p.code_size {
            return Err(CpuError::Config(format!(
                "promoters.exe_length {} must be in 1..={}",
                p.exe_length, p.code_size
            )));
        }
        if p.exe_threshold > p.exe_length {
            return Err(CpuError::Config(format!(
                "promoters.exe_threshold {} exceeds exe_length {}",
                p.exe_threshold, p.exe_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = HardwareConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_executed(100), 2000);
        assert_eq!(config.mutations.copy_mut, 0.0075);
    }

    #[test]
    fn test_partial_json() {
        let config = HardwareConfig::from_json_str(
            r#"{ "max_cpu_threads": 4, "mutations": { "copy_mut": 0.0 }, "architecture": "Promoters" }"#,
        )
        .unwrap();
        assert_eq!(config.max_cpu_threads, 4);
        assert_eq!(config.mutations.copy_mut, 0.0);
        assert_eq!(config.mutations.divide_ins, 0.05);
        assert!(config.promoters_enabled());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = HardwareConfig::default();
        config.min_genome_size = 100;
        config.max_genome_size = 10;
        assert!(config.validate().is_err());

        let mut config = HardwareConfig::default();
        config.mutations.copy_mut = 1.5;
        assert!(config.validate().is_err());

        let mut config = HardwareConfig::default();
        config.promoters.code_size = 40;
        assert!(config.validate().is_err());

        let mut config = HardwareConfig::default();
        config.max_cpu_threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = HardwareConfig::default().with_mutations(MutationRates::none());
        let text = config.to_json_string().unwrap();
        assert_eq!(HardwareConfig::from_json_str(&text).unwrap(), config);
    }
}
