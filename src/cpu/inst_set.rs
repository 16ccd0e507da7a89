//! Instruction Set Registry — Opcode assignment, cost tables, random draws
//!
//! An `InstSet` maps each opcode (its position in the set) to a library
//! handler plus the per-opcode tables the hardware consults every tick:
//! base cost, first-time cost, failure probability, additional time cost and
//! mutation redundancy. It is built once and shared by reference
//! (`Arc<InstSet>`) across every hardware instance using it.
//!
//! ## Text Format
//!
//! ```text
//! # mnemonic   redundancy cost ft_cost prob_fail addl_time
//! nop-A        1
//! h-copy       1          0    0       0.0       0
//! h-divide     1          0    50
//! ```

use super::instruction::Instruction;
use super::library::{InstClass, InstFunction, LIBRARY};
use super::memory::Genome;
use crate::error::{CpuError, Result};
use crate::random::Randomness;
use std::collections::HashMap;
use std::fmt;

/// Largest number of opcodes a set may hold (instructions are one byte)
pub const MAX_INST_SET_SIZE: usize = 256;

/// Per-opcode tunables supplied at registration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstSpec {
    /// Relative weight in random-instruction draws
    pub redundancy: u32,
    /// Cycles paid before every execution
    pub cost: u32,
    /// Cycles paid once, before the first execution
    pub ft_cost: u32,
    /// Probability the instruction silently fails
    pub prob_fail: f64,
    /// Extra time charged after execution
    pub addl_time_cost: u32,
}

impl Default for InstSpec {
    fn default() -> Self {
        Self {
            redundancy: 1,
            cost: 0,
            ft_cost: 0,
            prob_fail: 0.0,
            addl_time_cost: 0,
        }
    }
}

impl InstSpec {
    pub fn with_redundancy(mut self, redundancy: u32) -> Self {
        self.redundancy = redundancy;
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_ft_cost(mut self, ft_cost: u32) -> Self {
        self.ft_cost = ft_cost;
        self
    }

    pub fn with_prob_fail(mut self, prob_fail: f64) -> Self {
        self.prob_fail = prob_fail;
        self
    }

    pub fn with_addl_time_cost(mut self, addl_time_cost: u32) -> Self {
        self.addl_time_cost = addl_time_cost;
        self
    }
}

/// One registered opcode
#[derive(Debug, Clone)]
pub struct InstSetEntry {
    pub function: InstFunction,
    pub mnemonic: &'static str,
    pub class: InstClass,
    pub spec: InstSpec,
}

/// Warning produced during registration.
#[derive(Debug, Clone, PartialEq)]
pub enum InstSetWarning {
    /// The mnemonic is already present; mnemonic lookups resolve to the first
    DuplicateMnemonic { mnemonic: String, existing_op: u8 },
}

impl fmt::Display for InstSetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMnemonic { mnemonic, existing_op } => {
                write!(
                    f,
                    "WARN: mnemonic '{}' already registered as opcode {}",
                    mnemonic, existing_op,
                )
            }
        }
    }
}

/// Error produced during registration or parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum InstSetError {
    /// No library handler has this mnemonic
    UnknownMnemonic(String),
    /// Redundancy of zero would make the opcode unreachable by mutation
    ZeroRedundancy(String),
    /// Failure probability outside [0, 1]
    InvalidProbability { mnemonic: String, value: f64 },
    /// Set already holds `MAX_INST_SET_SIZE` opcodes
    TooManyInstructions,
    /// Malformed line in the text format
    Parse { line: usize, message: String },
    /// Set has no instructions
    Empty,
}

impl fmt::Display for InstSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic(m) => write!(f, "Unknown instruction '{}'", m),
            Self::ZeroRedundancy(m) => write!(f, "Instruction '{}' has zero redundancy", m),
            Self::InvalidProbability { mnemonic, value } => {
                write!(f, "Instruction '{}' has invalid failure probability {}", mnemonic, value)
            }
            Self::TooManyInstructions => {
                write!(f, "Instruction set is limited to {} opcodes", MAX_INST_SET_SIZE)
            }
            Self::Parse { line, message } => write!(f, "Line {}: {}", line, message),
            Self::Empty => write!(f, "Instruction set is empty"),
        }
    }
}

impl std::error::Error for InstSetError {}

/// The instruction set.
#[derive(Debug, Clone, Default)]
pub struct InstSet {
    entries: Vec<InstSetEntry>,
    /// Mnemonic → first opcode carrying it.
    by_mnemonic: HashMap<&'static str, u8>,
    /// Redundancy-weighted opcode list for random draws.
    mutation_chart: Vec<Instruction>,
}

impl InstSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library instruction under the next free opcode.
    ///
    /// # Errors
    /// Returns `InstSetError` for unknown mnemonics, zero redundancy,
    /// probabilities outside [0, 1] or a full set.
    pub fn register(
        &mut self,
        mnemonic: &str,
        spec: InstSpec,
    ) -> std::result::Result<Vec<InstSetWarning>, InstSetError> {
        let function = InstFunction::from_mnemonic(mnemonic)
            .ok_or_else(|| InstSetError::UnknownMnemonic(mnemonic.to_string()))?;
        if spec.redundancy == 0 {
            return Err(InstSetError::ZeroRedundancy(mnemonic.to_string()));
        }
        if !(0.0..=1.0).contains(&spec.prob_fail) {
            return Err(InstSetError::InvalidProbability {
                mnemonic: mnemonic.to_string(),
                value: spec.prob_fail,
            });
        }

        let mut warnings = Vec::new();
        if let Some(&existing_op) = self.by_mnemonic.get(function.mnemonic()) {
            warnings.push(InstSetWarning::DuplicateMnemonic {
                mnemonic: mnemonic.to_string(),
                existing_op,
            });
        }
        self.push_function(function, spec)?;
        Ok(warnings)
    }

    fn push_function(
        &mut self,
        function: InstFunction,
        spec: InstSpec,
    ) -> std::result::Result<Instruction, InstSetError> {
        if self.entries.len() >= MAX_INST_SET_SIZE {
            return Err(InstSetError::TooManyInstructions);
        }
        let op = self.entries.len() as u8;
        let lib = function.entry();
        self.by_mnemonic.entry(lib.mnemonic).or_insert(op);
        self.entries.push(InstSetEntry {
            function,
            mnemonic: lib.mnemonic,
            class: lib.class,
            spec,
        });
        let inst = Instruction(op);
        self.mutation_chart
            .extend(std::iter::repeat(inst).take(spec.redundancy as usize));
        Ok(inst)
    }

    fn from_functions(functions: &[InstFunction]) -> Self {
        let mut set = Self::new();
        for &function in functions.iter().take(MAX_INST_SET_SIZE) {
            // Bounded by `take`, so the capacity check cannot trip.
            let _ = set.push_function(function, InstSpec::default());
        }
        set
    }

    /// The classic 26-instruction heads set.
    pub fn heads_default() -> Self {
        use InstFunction::*;
        Self::from_functions(&[
            NopA, NopB, NopC, IfNEqu, IfLess, Pop, Push, SwitchStack, Swap, ShiftR,
            ShiftL, Inc, Dec, Add, Sub, Nand, TaskIO, MaxAlloc, HeadDivide, HeadCopy,
            HeadSearch, MoveHead, JumpHead, GetHead, IfLabel, SetFlow,
        ])
    }

    /// Every library instruction once, in library order.
    pub fn full() -> Self {
        let functions: Vec<InstFunction> = LIBRARY.iter().map(|e| e.function).collect();
        Self::from_functions(&functions)
    }

    /// Parse the line format described in the module docs.
    pub fn parse(text: &str) -> std::result::Result<(Self, Vec<InstSetWarning>), InstSetError> {
        let mut set = Self::new();
        let mut warnings = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let mnemonic = match fields.next() {
                Some(m) => m,
                None => continue,
            };
            let mut spec = InstSpec::default();
            let values: Vec<&str> = fields.collect();
            let parse_u32 = |i: usize, name: &str| -> std::result::Result<Option<u32>, InstSetError> {
                match values.get(i) {
                    Some(v) => v.parse::<u32>().map(Some).map_err(|_| InstSetError::Parse {
                        line: line_no,
                        message: format!("invalid {} '{}'", name, v),
                    }),
                    None => Ok(None),
                }
            };
            if let Some(v) = parse_u32(0, "redundancy")? {
                spec.redundancy = v;
            }
            if let Some(v) = parse_u32(1, "cost")? {
                spec.cost = v;
            }
            if let Some(v) = parse_u32(2, "first-time cost")? {
                spec.ft_cost = v;
            }
            if let Some(v) = values.get(3) {
                spec.prob_fail = v.parse::<f64>().map_err(|_| InstSetError::Parse {
                    line: line_no,
                    message: format!("invalid failure probability '{}'", v),
                })?;
            }
            if let Some(v) = parse_u32(4, "additional time cost")? {
                spec.addl_time_cost = v;
            }
            if values.len() > 5 {
                return Err(InstSetError::Parse {
                    line: line_no,
                    message: format!("too many fields for '{}'", mnemonic),
                });
            }

            warnings.extend(set.register(mnemonic, spec)?);
        }

        if set.is_empty() {
            return Err(InstSetError::Empty);
        }
        for w in &warnings {
            log::warn!("{}", w);
        }
        Ok((set, warnings))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InstSetEntry] {
        &self.entries
    }

    pub fn entry(&self, inst: Instruction) -> Option<&InstSetEntry> {
        self.entries.get(inst.index())
    }

    pub fn contains(&self, inst: Instruction) -> bool {
        inst.index() < self.entries.len()
    }

    pub fn function(&self, inst: Instruction) -> Option<InstFunction> {
        self.entry(inst).map(|e| e.function)
    }

    pub fn mnemonic(&self, inst: Instruction) -> &'static str {
        self.entry(inst).map(|e| e.mnemonic).unwrap_or("(invalid)")
    }

    pub fn is_nop(&self, inst: Instruction) -> bool {
        matches!(self.entry(inst).map(|e| e.class), Some(InstClass::Nop(_)))
    }

    /// Modifier carried by a NOP (`None` for anything else)
    pub fn nop_mod(&self, inst: Instruction) -> Option<u8> {
        match self.entry(inst).map(|e| e.class) {
            Some(InstClass::Nop(m)) => Some(m),
            _ => None,
        }
    }

    pub fn is_label_marker(&self, inst: Instruction) -> bool {
        matches!(self.entry(inst).map(|e| e.class), Some(InstClass::LabelMarker))
    }

    /// First opcode bound to `function`
    pub fn find(&self, function: InstFunction) -> Option<Instruction> {
        self.by_mnemonic.get(function.mnemonic()).map(|&op| Instruction(op))
    }

    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<Instruction> {
        self.by_mnemonic.get(mnemonic).map(|&op| Instruction(op))
    }

    pub fn cost(&self, inst: Instruction) -> u32 {
        self.entry(inst).map(|e| e.spec.cost).unwrap_or(0)
    }

    pub fn ft_cost(&self, inst: Instruction) -> u32 {
        self.entry(inst).map(|e| e.spec.ft_cost).unwrap_or(0)
    }

    pub fn prob_fail(&self, inst: Instruction) -> f64 {
        self.entry(inst).map(|e| e.spec.prob_fail).unwrap_or(0.0)
    }

    pub fn addl_time_cost(&self, inst: Instruction) -> u32 {
        self.entry(inst).map(|e| e.spec.addl_time_cost).unwrap_or(0)
    }

    /// Per-opcode base costs, indexed by opcode
    pub fn cost_table(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.spec.cost).collect()
    }

    /// Per-opcode first-time costs, indexed by opcode
    pub fn ft_cost_table(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.spec.ft_cost).collect()
    }

    /// Draw an instruction, weighted by redundancy.
    pub fn random_inst(&self, rng: &mut dyn Randomness) -> Instruction {
        if self.mutation_chart.is_empty() {
            return Instruction::DEFAULT;
        }
        self.mutation_chart[rng.uniform_int(self.mutation_chart.len())]
    }

    // =========================================================================
    // Genome text
    // =========================================================================

    /// Parse one mnemonic per line; `#` starts a comment.
    pub fn parse_genome(&self, text: &str) -> Result<Genome> {
        let mut insts = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let inst = self.by_mnemonic(line).ok_or_else(|| CpuError::UnknownInstruction {
                mnemonic: line.to_string(),
                line: idx + 1,
            })?;
            insts.push(inst);
        }
        Ok(Genome::from(insts))
    }

    pub fn genome_to_string(&self, genome: &Genome) -> String {
        let mut out = String::new();
        for &inst in genome.iter() {
            out.push_str(self.mnemonic(inst));
            out.push('\n');
        }
        out
    }
}
