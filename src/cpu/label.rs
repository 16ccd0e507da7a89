//! Code Label - NOP-derived address and numeric literal encoding
//!
//! A label is the run of NOP modifiers that follows an instruction. Search
//! instructions look for its complement (every modifier rotated by one) and
//! the `val-*` family decode it into a number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest label a single read may collect
pub const MAX_LABEL_SIZE: usize = 10;

/// Bounded sequence of NOP modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CodeLabel {
    nops: Vec<u8>,
}

impl CodeLabel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from modifiers, keeping at most `MAX_LABEL_SIZE`.
    pub fn from_nops(nops: &[u8]) -> Self {
        Self {
            nops: nops.iter().copied().take(MAX_LABEL_SIZE).collect(),
        }
    }

    /// Append a modifier; silently ignored once the label is full.
    pub fn add_nop(&mut self, nop: u8) {
        if self.nops.len() < MAX_LABEL_SIZE {
            self.nops.push(nop);
        }
    }

    pub fn clear(&mut self) {
        self.nops.clear();
    }

    pub fn len(&self) -> usize {
        self.nops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nops.is_empty()
    }

    pub fn nops(&self) -> &[u8] {
        &self.nops
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.nops.get(index).copied()
    }

    /// Rotate every modifier by `rot` positions modulo `base`.
    ///
    /// `rotate(1, 3)` maps A→B, B→C, C→A and yields the complement label.
    pub fn rotate(&mut self, rot: i32, base: u8) {
        if base == 0 {
            return;
        }
        let base = base as i32;
        for nop in &mut self.nops {
            *nop = (*nop as i32 + rot).rem_euclid(base) as u8;
        }
    }

    /// Rotated copy (see [`CodeLabel::rotate`])
    pub fn rotated(&self, rot: i32, base: u8) -> Self {
        let mut out = self.clone();
        out.rotate(rot, base);
        out
    }

    // =========================================================================
    // Numeric decodings
    // =========================================================================

    /// Base-N reading, first modifier most significant.
    pub fn as_int(&self, base: u8) -> i32 {
        self.nops
            .iter()
            .fold(0i32, |acc, &n| acc.wrapping_mul(base as i32).wrapping_add(n as i32))
    }

    /// Base-N reading, first modifier least significant.
    pub fn as_int_direct(&self, base: u8) -> i32 {
        self.nops
            .iter()
            .rev()
            .fold(0i32, |acc, &n| acc.wrapping_mul(base as i32).wrapping_add(n as i32))
    }

    /// Reflected grey-code reading: each digit is mirrored when an odd
    /// number of odd digits precede it.
    pub fn as_int_grey(&self, base: u8) -> i32 {
        let base_i = base as i32;
        let mut value = 0i32;
        let mut odd_count = 0u32;
        for &n in &self.nops {
            let digit = if odd_count % 2 == 1 {
                base_i - 1 - n as i32
            } else {
                n as i32
            };
            value = value.wrapping_mul(base_i).wrapping_add(digit);
            if n % 2 == 1 {
                odd_count += 1;
            }
        }
        value
    }

    /// Additive polynomial: sum over digits of
    /// `(n+1)^(0.4(len-1)) + 0.3·i·(len-1) + 0.45·i`, rounded.
    pub fn as_int_additive_polynomial(&self) -> i32 {
        let size = self.nops.len() as f64;
        let value: f64 = self
            .nops
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let i = i as f64;
                (n as f64 + 1.0).powf(0.4 * (size - 1.0)) + 0.3 * i * (size - 1.0) + 0.45 * i
            })
            .sum();
        (value + 0.5) as i32
    }

    /// Fibonacci-weighted sum: weights 1, 2, 3, 5, 8, ...
    pub fn as_int_fib(&self) -> i32 {
        let (mut w0, mut w1) = (1i32, 2i32);
        let mut value = 0i32;
        for &n in &self.nops {
            value = value.wrapping_add(w0.wrapping_mul(n as i32));
            let next = w0.wrapping_add(w1);
            w0 = w1;
            w1 = next;
        }
        value
    }

    /// Polynomial coefficients with alternating sign:
    /// `Σ (-1)^i · (i+1) · (n_i+1)`.
    pub fn as_int_polynomial_coefficient(&self) -> i32 {
        self.nops.iter().enumerate().fold(0i32, |acc, (i, &n)| {
            let term = (i as i32 + 1) * (n as i32 + 1);
            if i % 2 == 0 {
                acc.wrapping_add(term)
            } else {
                acc.wrapping_sub(term)
            }
        })
    }
}

impl fmt::Display for CodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &n in &self.nops {
            write!(f, "{}", (b'A' + n) as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_nop_bounded() {
        let mut label = CodeLabel::new();
        for _ in 0..15 {
            label.add_nop(1);
        }
        assert_eq!(label.len(), MAX_LABEL_SIZE);
    }

    #[test]
    fn test_rotate_is_complement() {
        let mut label = CodeLabel::from_nops(&[0, 1, 2]);
        label.rotate(1, 3);
        assert_eq!(label.nops(), &[1, 2, 0]);
        label.rotate(-1, 3);
        assert_eq!(label.nops(), &[0, 1, 2]);
        assert_eq!(label.to_string(), "ABC");
    }

    #[test]
    fn test_as_int() {
        let label = CodeLabel::from_nops(&[1, 2]);
        assert_eq!(label.as_int(3), 5);
        assert_eq!(label.as_int_direct(3), 7);
        assert_eq!(CodeLabel::new().as_int(3), 0);
    }

    #[test]
    fn test_grey_code() {
        // Reflected ternary grey code: 00 01 02 12 11 10 20 21 22
        let expect = [(vec![0, 0], 0), (vec![0, 2], 2), (vec![1, 2], 3), (vec![1, 0], 5), (vec![2, 0], 6)];
        for (nops, value) in expect {
            assert_eq!(CodeLabel::from_nops(&nops).as_int_grey(3), value, "{:?}", nops);
        }
    }

    #[test]
    fn test_fib_and_polynomial() {
        let label = CodeLabel::from_nops(&[1, 1, 1, 1]);
        assert_eq!(label.as_int_fib(), 1 + 2 + 3 + 5);
        assert_eq!(label.as_int_polynomial_coefficient(), 2 - 4 + 6 - 8);
        assert_eq!(CodeLabel::from_nops(&[0]).as_int_additive_polynomial(), 1);
    }
}
