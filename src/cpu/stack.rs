//! CPU Stack - Fixed-depth circular stack of integers
//!
//! Pushing past the depth overwrites the oldest value; popping an empty
//! slot yields 0.

use serde::{Deserialize, Serialize};

/// Slots per stack
pub const STACK_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStack {
    values: [i32; STACK_SIZE],
    pointer: usize,
}

impl Default for CpuStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStack {
    pub fn new() -> Self {
        Self {
            values: [0; STACK_SIZE],
            pointer: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        self.pointer = (self.pointer + STACK_SIZE - 1) % STACK_SIZE;
        self.values[self.pointer] = value;
    }

    pub fn pop(&mut self) -> i32 {
        let value = self.values[self.pointer];
        self.values[self.pointer] = 0;
        self.pointer = (self.pointer + 1) % STACK_SIZE;
        value
    }

    pub fn peek(&self) -> i32 {
        self.values[self.pointer]
    }

    /// Value `depth` slots below the top
    pub fn get(&self, depth: usize) -> i32 {
        self.values[(self.pointer + depth) % STACK_SIZE]
    }

    pub fn clear(&mut self) {
        self.values = [0; STACK_SIZE];
        self.pointer = 0;
    }

    /// Reverse the order of all slots, top becoming bottom
    pub fn flip(&mut self) {
        let ordered: Vec<i32> = (0..STACK_SIZE).map(|d| self.get(d)).collect();
        for (d, value) in ordered.into_iter().rev().enumerate() {
            self.values[(self.pointer + d) % STACK_SIZE] = value;
        }
    }

    /// Slots from top to bottom
    pub fn to_vec(&self) -> Vec<i32> {
        (0..STACK_SIZE).map(|d| self.get(d)).collect()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Rebuild from raw slot values and pointer (checkpoint restore)
    pub fn from_raw(values: [i32; STACK_SIZE], pointer: usize) -> Self {
        Self {
            values,
            pointer: pointer % STACK_SIZE,
        }
    }

    pub fn raw_values(&self) -> [i32; STACK_SIZE] {
        self.values
    }
}
