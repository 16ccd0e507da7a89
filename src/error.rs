//! Error types for avida-cpu

use thiserror::Error;

/// Library-level error type.
///
/// Instruction-level failures never produce one of these: they are faults
/// reported to the organism while the tick carries on.
#[derive(Debug, Error)]
pub enum CpuError {
    /// Instruction set could not be built
    #[error("Instruction set error: {0}")]
    InstSet(#[from] crate::cpu::InstSetError),

    /// Unknown mnemonic in a genome listing
    #[error("Unknown instruction '{mnemonic}' on line {line}")]
    UnknownInstruction { mnemonic: String, line: usize },

    /// Genome is empty or outside the configured bounds
    #[error("Invalid genome length {len} (allowed {min}..={max})")]
    GenomeLength { len: usize, min: usize, max: usize },

    /// Genome holds an opcode the instruction set does not define
    #[error("Opcode {op} at line {pos} is outside the instruction set")]
    InvalidOpcode { op: u8, pos: usize },

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkpoint does not fit the instruction set or is internally inconsistent
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CpuError>;
