//! Virtual CPU
//!
//! - `instruction` - Opcode cell and per-line flags
//! - `library` - Built-in handlers and their mnemonics
//! - `inst_set` - Opcode registry with cost tables
//! - `memory` - Genome and executable memory
//! - `label` - NOP label encoding
//! - `head` - Wrap-around memory cursors
//! - `stack` - Circular integer stack
//! - `thread` - Execution thread state
//! - `hardware` - The CPU itself: dispatch, search, replication, extensions

pub mod instruction;
pub mod library;
pub mod inst_set;
pub mod memory;
pub mod label;
pub mod head;
pub mod stack;
pub mod thread;
pub mod hardware;

pub use instruction::{InstFlags, Instruction};
pub use library::{InstClass, InstEntry, InstFunction, LIBRARY};
pub use inst_set::{InstSet, InstSetEntry, InstSetError, InstSetWarning, InstSpec, MAX_INST_SET_SIZE};
pub use memory::{Genome, GenomeMemory};
pub use label::{CodeLabel, MAX_LABEL_SIZE};
pub use head::{Head, HeadKind};
pub use stack::{CpuStack, STACK_SIZE};
pub use thread::{ExecThread, SavedContext, NUM_REGISTERS, REG_AX, REG_BX, REG_CX};
pub use hardware::{
    ExecutionContext, Hardware, HardwareSnapshot, InterruptKind, Promoter, StepResult, TickOutcome,
};

/// Distinct NOP modifiers (and the base of every label decoding)
pub const NUM_NOPS: u8 = 3;
