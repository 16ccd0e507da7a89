//! File Loader - Instruction sets, configurations and genomes from disk
//!
//! # Usage
//!
//! ```ignore
//! use avida_cpu::loader::{load_config, load_genome, load_inst_set};
//!
//! let inst_set = load_inst_set("instset-heads.cfg")?;
//! let config = load_config("hardware.json")?;
//! let genome = load_genome("default-heads.org", &inst_set)?;
//! ```
//!
//! # File Formats
//!
//! - Instruction set: one `mnemonic [redundancy [cost [ft_cost [prob_fail [addl_time]]]]]`
//!   per line, `#` comments
//! - Configuration: JSON `HardwareConfig`, every field optional
//! - Genome: one mnemonic per line, `#` comments
//!
//! A missing instruction-set path falls back to the 26-instruction heads set.

use crate::config::HardwareConfig;
use crate::cpu::{Genome, InstSet};
use anyhow::{Context, Result};
use std::path::Path;

/// Read and validate a JSON configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HardwareConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    HardwareConfig::from_json_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))
}

/// Read an instruction set file. Non-fatal issues are logged by the parser.
pub fn load_inst_set<P: AsRef<Path>>(path: P) -> Result<InstSet> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read instruction set {}", path.display()))?;
    let (inst_set, _warnings) = InstSet::parse(&text)
        .with_context(|| format!("Invalid instruction set {}", path.display()))?;
    Ok(inst_set)
}

/// Instruction set at `path`, or the heads set when none is given.
pub fn load_inst_set_or_default(path: Option<&Path>) -> Result<InstSet> {
    match path {
        Some(path) => load_inst_set(path),
        None => Ok(InstSet::heads_default()),
    }
}

/// Read a genome listing against `inst_set`.
pub fn load_genome<P: AsRef<Path>>(path: P, inst_set: &InstSet) -> Result<Genome> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read genome {}", path.display()))?;
    let genome = inst_set
        .parse_genome(&text)
        .with_context(|| format!("Invalid genome {}", path.display()))?;
    if genome.is_empty() {
        anyhow::bail!("Genome {} has no instructions", path.display());
    }
    Ok(genome)
}

/// Write a genome listing, one mnemonic per line.
pub fn save_genome<P: AsRef<Path>>(path: P, genome: &Genome, inst_set: &InstSet) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, inst_set.genome_to_string(genome))
        .with_context(|| format!("Failed to write genome {}", path.display()))
}
