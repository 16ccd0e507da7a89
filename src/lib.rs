//! # Avida CPU - Virtual hardware for digital organisms
//!
//! A self-replicating program runs on a small virtual CPU: three registers,
//! four wrap-around heads, two circular stacks and a genome held in mutable
//! memory. The program allocates space for a child, copies itself line by
//! line (with copy-time mutations) and divides. Instruction semantics are
//! fixed by a built-in library; an instruction set picks which of them a
//! population uses and what each one costs.
//!
//! ## Core Components
//!
//! - **InstSet**: Opcode registry parsed from an instruction-set file
//! - **Hardware**: The CPU. `single_process` runs one scheduling tick
//! - **Organism**: Host callbacks for faults, I/O, messages, movement and divide
//! - **Randomness**: Deterministic source behind every mutation and random op
//! - **HardwareSnapshot**: Bit-exact checkpoint of a running hardware
//!
//! ## Architectures
//!
//! 1. **Classic**: Heads-based copy loop, up to `max_cpu_threads` threads
//! 2. **Classic with interrupts**: Message and movement handlers
//! 3. **Promoters**: Execution restarts at promoter sites chosen by regulation
//!
//! ## Example
//!
//! ```ignore
//! use avida_cpu::{seeded, ExecutionContext, Hardware, HardwareConfig, InstSet, RecordingOrganism};
//! use std::sync::Arc;
//!
//! let inst_set = Arc::new(InstSet::heads_default());
//! let genome = inst_set.parse_genome(include_str!("default-heads.org"))?;
//! let mut hw = Hardware::new(inst_set, Arc::new(HardwareConfig::default()), &genome)?;
//!
//! let mut rng = seeded(42);
//! let mut organism = RecordingOrganism::new();
//! while organism.children.is_empty() {
//!     hw.single_process(&mut ExecutionContext::new(&mut rng, &mut organism));
//! }
//! ```

// Configuration - architecture, mutation rates, allocation and divide rules
pub mod config;
pub use config::{
    AllocMethod, ArchitectureMode, DeathMethod, DivideMethod, HardwareConfig, MutationRates,
    NoActivePromoterEffect, PromoterConfig, SlipFillMode,
};

// Virtual CPU
pub mod cpu;
pub use cpu::{
    ExecutionContext, Genome, Hardware, HardwareSnapshot, InstFunction, InstSet, Instruction,
    InterruptKind, Promoter, StepResult, TickOutcome,
};

// Host callbacks
pub mod organism;
pub use organism::{
    FaultLocation, FaultRecord, FaultSeverity, Message, Organism, RecordingOrganism,
    ViabilityVerdict,
};

// Random source
pub mod random;
pub use random::{seeded, Randomness};

// Error types
mod error;
pub use error::{CpuError, Result};

// File loader - instruction sets, configs and genomes from disk
pub mod loader;
