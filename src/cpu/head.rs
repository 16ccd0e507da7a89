//! Head - Wrap-around cursor into genome memory
//!
//! Heads hold a position only; the memory length is supplied on every
//! movement so a head never borrows the memory it points into. After any
//! resize the owner calls [`Head::adjust`] before the head is used again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Head role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeadKind {
    Ip = 0,
    Read = 1,
    Write = 2,
    Flow = 3,
}

impl HeadKind {
    pub const COUNT: usize = 4;
    pub const ALL: [HeadKind; 4] = [Self::Ip, Self::Read, Self::Write, Self::Flow];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Head selected by a NOP modifier or register value
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ip => "IP",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Flow => "FLOW",
        }
    }
}

impl fmt::Display for HeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cursor position (may be transiently out of range until adjusted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Head {
    pos: i64,
}

impl Head {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(pos: usize) -> Self {
        Self { pos: pos as i64 }
    }

    /// Current position. Only meaningful after `adjust`.
    pub fn position(&self) -> usize {
        self.pos.max(0) as usize
    }

    pub fn raw_position(&self) -> i64 {
        self.pos
    }

    /// Normalize into `[0, len)`: negatives clamp to 0, overflow wraps.
    pub fn adjust(&mut self, len: usize) {
        if len == 0 || self.pos < 0 {
            self.pos = 0;
        } else if self.pos >= len as i64 {
            self.pos %= len as i64;
        }
    }

    pub fn set(&mut self, pos: i64, len: usize) {
        self.pos = pos;
        self.adjust(len);
    }

    pub fn jump(&mut self, offset: i64, len: usize) {
        self.pos = self.pos.saturating_add(offset);
        self.adjust(len);
    }

    pub fn advance(&mut self, len: usize) {
        self.pos += 1;
        self.adjust(len);
    }

    /// Step back one position, wrapping from 0 to the last line.
    pub fn retreat(&mut self, len: usize) {
        if len == 0 {
            self.pos = 0;
        } else if self.pos <= 0 {
            self.pos = len as i64 - 1;
        } else {
            self.pos -= 1;
            self.adjust(len);
        }
    }

    /// Position of the following line, or `None` at the last line.
    pub fn next_position(&self, len: usize) -> Option<usize> {
        let next = self.position() + 1;
        (next < len).then_some(next)
    }

    /// True when the head is inside `[0, len)` without adjustment
    pub fn is_valid(&self, len: usize) -> bool {
        self.pos >= 0 && (self.pos as u64) < len as u64
    }
}
