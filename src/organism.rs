//! Organism - The outer world as seen from inside the hardware
//!
//! Instruction handlers reach everything outside their own memory through
//! this trait: task input/output, messaging, neighbours, reproduction and
//! fault reporting. [`RecordingOrganism`] is a self-contained implementation
//! that records every call, used by tests and the runner binary.

use crate::cpu::{CodeLabel, Genome};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Subsystem that raised a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultLocation {
    Default,
    Instruction,
    Jump,
    Math,
    Inject,
    ThreadFork,
    ThreadKill,
    Alloc,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultSeverity {
    Warning,
    Error,
}

impl fmt::Display for FaultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Outcome of the external viability evaluation of a candidate child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViabilityVerdict {
    /// Child is born as mutated
    Viable,
    /// Discard the divide mutations and keep the unmutated child
    Revert,
    /// Draw the divide mutations again
    Resample,
    /// Divide fails; nothing is born
    Sterilize,
}

/// Labelled value exchanged between organisms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub label: i32,
    pub data: i32,
}

/// Capabilities a hardware consumes from its organism.
///
/// Only `fault`, `die` and `activate_divide` are mandatory; everything else
/// defaults to an isolated organism with no neighbours.
pub trait Organism {
    fn fault(&mut self, location: FaultLocation, severity: FaultSeverity, message: &str);

    fn die(&mut self);

    /// Hand the finished child over for birth. Returns whether the parent
    /// survives the event.
    fn activate_divide(&mut self, child: Genome) -> bool;

    fn set_running(&mut self, _running: bool) {}

    /// External request to die at the end of the tick
    fn should_die(&self) -> bool {
        false
    }

    /// Organism-level veto checked before any divide arithmetic
    fn divide_check_viable(&mut self) -> bool {
        true
    }

    fn test_viability(&mut self, _child: &Genome) -> ViabilityVerdict {
        ViabilityVerdict::Viable
    }

    fn do_input(&mut self) -> i32 {
        0
    }

    fn do_output(&mut self, _value: i32) {}

    fn send_message(&mut self, _message: Message) -> bool {
        false
    }

    fn retrieve_message(&mut self) -> Option<Message> {
        None
    }

    fn has_pending_message(&self) -> bool {
        false
    }

    /// Turn by `direction` steps (negative is counter-clockwise)
    fn rotate(&mut self, _direction: i32) {}

    fn neighborhood_size(&self) -> usize {
        1
    }

    fn facing(&self) -> usize {
        0
    }

    fn move_forward(&mut self) -> bool {
        false
    }

    /// Whether the faced neighbour carries `label` anywhere in its memory
    fn neighbor_has_label(&self, _label: &CodeLabel) -> bool {
        false
    }

    /// Deliver parasite code to the faced neighbour
    fn inject_into_neighbor(&mut self, _label: &CodeLabel, _code: &Genome) -> bool {
        false
    }
}

/// One recorded fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultRecord {
    pub location: FaultLocation,
    pub severity: FaultSeverity,
    pub message: String,
}

/// Organism that records every interaction and answers from queues.
#[derive(Debug, Clone)]
pub struct RecordingOrganism {
    pub faults: Vec<FaultRecord>,
    pub children: Vec<Genome>,
    pub died: bool,
    pub running: bool,
    pub kill_requested: bool,
    pub parent_survives: bool,
    pub viable: bool,
    /// Verdicts handed out in order; `Viable` once exhausted.
    pub verdicts: VecDeque<ViabilityVerdict>,
    /// Input values, cycled
    pub inputs: Vec<i32>,
    input_pointer: usize,
    pub outputs: Vec<i32>,
    pub inbox: VecDeque<Message>,
    pub sent: Vec<Message>,
    pub neighborhood: usize,
    pub facing: usize,
    pub moves: usize,
    /// Facings whose neighbour answers `neighbor_has_label` with true
    pub labelled_facings: Vec<usize>,
    pub accept_injection: bool,
    pub injections: Vec<(CodeLabel, Genome)>,
}

impl Default for RecordingOrganism {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingOrganism {
    pub fn new() -> Self {
        Self {
            faults: Vec::new(),
            children: Vec::new(),
            died: false,
            running: false,
            kill_requested: false,
            parent_survives: true,
            viable: true,
            verdicts: VecDeque::new(),
            inputs: vec![0x0f13_149f, 0x3308_e53e, 0x556_241eb],
            input_pointer: 0,
            outputs: Vec::new(),
            inbox: VecDeque::new(),
            sent: Vec::new(),
            neighborhood: 8,
            facing: 0,
            moves: 0,
            labelled_facings: Vec::new(),
            accept_injection: false,
            injections: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<i32>) -> Self {
        self.inputs = inputs;
        self.input_pointer = 0;
        self
    }

    /// True if any recorded fault message contains `needle`
    pub fn has_fault(&self, needle: &str) -> bool {
        self.faults.iter().any(|f| f.message.contains(needle))
    }
}

impl Organism for RecordingOrganism {
    fn fault(&mut self, location: FaultLocation, severity: FaultSeverity, message: &str) {
        self.faults.push(FaultRecord {
            location,
            severity,
            message: message.to_string(),
        });
    }

    fn die(&mut self) {
        self.died = true;
    }

    fn activate_divide(&mut self, child: Genome) -> bool {
        self.children.push(child);
        self.parent_survives
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn should_die(&self) -> bool {
        self.kill_requested
    }

    fn divide_check_viable(&mut self) -> bool {
        self.viable
    }

    fn test_viability(&mut self, _child: &Genome) -> ViabilityVerdict {
        self.verdicts.pop_front().unwrap_or(ViabilityVerdict::Viable)
    }

    fn do_input(&mut self) -> i32 {
        if self.inputs.is_empty() {
            return 0;
        }
        let value = self.inputs[self.input_pointer % self.inputs.len()];
        self.input_pointer = (self.input_pointer + 1) % self.inputs.len();
        value
    }

    fn do_output(&mut self, value: i32) {
        self.outputs.push(value);
    }

    fn send_message(&mut self, message: Message) -> bool {
        self.sent.push(message);
        true
    }

    fn retrieve_message(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    fn has_pending_message(&self) -> bool {
        !self.inbox.is_empty()
    }

    fn rotate(&mut self, direction: i32) {
        if self.neighborhood == 0 {
            return;
        }
        let n = self.neighborhood as i64;
        self.facing = (self.facing as i64 + direction as i64).rem_euclid(n) as usize;
    }

    fn neighborhood_size(&self) -> usize {
        self.neighborhood
    }

    fn facing(&self) -> usize {
        self.facing
    }

    fn move_forward(&mut self) -> bool {
        self.moves += 1;
        true
    }

    fn neighbor_has_label(&self, _label: &CodeLabel) -> bool {
        self.labelled_facings.contains(&self.facing)
    }

    fn inject_into_neighbor(&mut self, label: &CodeLabel, code: &Genome) -> bool {
        if self.accept_injection {
            self.injections.push((label.clone(), code.clone()));
        }
        self.accept_injection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_cycle() {
        let mut org = RecordingOrganism::new().with_inputs(vec![1, 2]);
        assert_eq!(org.do_input(), 1);
        assert_eq!(org.do_input(), 2);
        assert_eq!(org.do_input(), 1);
    }

    #[test]
    fn test_rotate_wraps() {
        let mut org = RecordingOrganism::new();
        org.rotate(-1);
        assert_eq!(org.facing(), 7);
        org.rotate(3);
        assert_eq!(org.facing(), 2);
    }

    #[test]
    fn test_verdict_queue() {
        let mut org = RecordingOrganism::new();
        org.verdicts.push_back(ViabilityVerdict::Revert);
        let g = Genome::new();
        assert_eq!(org.test_viability(&g), ViabilityVerdict::Revert);
        assert_eq!(org.test_viability(&g), ViabilityVerdict::Viable);
    }
}
