//! Label search
//!
//! Two families. Complement search (`find_label`) backs the jump, call and
//! search instructions and matches a label anywhere inside a NOP run.
//! Marked-label search (`find_marked_label`) backs `goto` and `throw` and
//! only matches the literal label right after a marker instruction.

use super::Hardware;
use crate::cpu::instruction::{InstFlags, Instruction};
use crate::cpu::label::CodeLabel;
use std::cmp::Ordering;

impl Hardware {
    fn nop_mod_at(&self, pos: usize) -> Option<u8> {
        self.inst_set.nop_mod(self.memory.get(pos))
    }

    fn is_nop_at(&self, pos: i64) -> bool {
        pos >= 0 && self.nop_mod_at(pos as usize).is_some()
    }

    /// Search memory for the current thread's `next_label`.
    ///
    /// The caller complements the label first. Returns the last line of the
    /// matching NOP run, the IP itself for an empty label, and `None` when
    /// nothing matches. `direction` < 0 searches backward from the IP, > 0
    /// forward from the IP, 0 forward from line 0.
    pub(super) fn find_label(&self, direction: i32) -> Option<usize> {
        let label = &self.thread().next_label;
        let ip = self.ip_position() as i64;
        if label.is_empty() {
            return Some(ip as usize);
        }

        let found = match direction.cmp(&0) {
            Ordering::Less => self.find_label_backward(label, ip - label.len() as i64),
            Ordering::Greater => self.find_label_forward(label, ip),
            Ordering::Equal => self.find_label_forward(label, 0),
        }?;
        Some(self.line_at(found - 1))
    }

    /// First offset in `[run_start, run_end)` where `label` fits.
    fn match_in_run(&self, label: &CodeLabel, run_start: i64, run_end: i64) -> Option<i64> {
        let k = label.len() as i64;
        (run_start..=run_end - k).find(|&offset| {
            label
                .nops()
                .iter()
                .enumerate()
                .all(|(i, &m)| self.nop_mod_at((offset + i as i64) as usize) == Some(m))
        })
    }

    /// Returns the line just past the match.
    fn find_label_forward(&self, label: &CodeLabel, start: i64) -> Option<i64> {
        let len = self.memory.len() as i64;
        let k = label.len() as i64;
        let mut pos = start + k;

        while pos < len {
            if self.is_nop_at(pos) {
                let mut run_start = pos;
                let mut run_end = pos + 1;
                while run_start > start && self.is_nop_at(run_start - 1) {
                    run_start -= 1;
                }
                while run_end < len && self.is_nop_at(run_end) {
                    run_end += 1;
                }
                if let Some(offset) = self.match_in_run(label, run_start, run_end) {
                    return Some(offset + k);
                }
                pos = run_end;
            }
            pos += k;
        }
        None
    }

    /// Returns the line just past the NOP run holding the match. Runs are
    /// cut at `start`.
    fn find_label_backward(&self, label: &CodeLabel, start: i64) -> Option<i64> {
        let k = label.len() as i64;
        let mut pos = start - k;

        while pos >= 0 {
            if self.is_nop_at(pos) {
                let mut run_start = pos;
                let mut run_end = pos + 1;
                while run_start > 0 && self.is_nop_at(run_start - 1) {
                    run_start -= 1;
                }
                while run_end < start && self.is_nop_at(run_end) {
                    run_end += 1;
                }
                if self.match_in_run(label, run_start, run_end).is_some() {
                    return Some(run_end);
                }
                pos = run_start - 1;
            }
            pos -= k;
        }
        None
    }

    /// First exact occurrence of `label` scanning from line 0; returns its
    /// last line.
    pub(super) fn find_label_full(&self, label: &CodeLabel) -> Option<usize> {
        let k = label.len();
        let len = self.memory.len();
        if k == 0 {
            return None;
        }

        let mut pos = 0;
        while pos + k <= len {
            match (0..k).find(|&i| self.nop_mod_at(pos + i) != label.get(i)) {
                None => return Some(pos + k - 1),
                Some(miss) => pos += miss + 1,
            }
        }
        None
    }

    /// Find a `marker` line followed by exactly `label`, scanning once around
    /// memory from the line after the IP.
    ///
    /// Extra NOPs after the label are ignored; a shorter run never matches.
    /// The marker and the matched NOPs are marked executed, up to
    /// `max_label_exe_size` lines.
    pub(super) fn find_marked_label(&mut self, marker: Instruction, label: &CodeLabel) -> Option<usize> {
        let len = self.memory.len();
        let ip = self.ip_position();
        let k = label.len();

        let found = (1..len).map(|step| (ip + step) % len).find(|&pos| {
            self.memory.get(pos) == marker
                && (0..k).all(|i| self.nop_mod_at((pos + 1 + i) % len) == label.get(i))
        })?;

        let marked = (k + 1).min(self.config.max_label_exe_size);
        for i in 0..marked {
            self.memory.set_flags((found + i) % len, InstFlags::EXECUTED);
        }
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{build, op, quiet_config};
    use super::*;

    fn letters(nops: &[u8]) -> Vec<&'static str> {
        nops.iter().map(|&n| ["nop-A", "nop-B", "nop-C"][n as usize]).collect()
    }

    #[test]
    fn test_complement_found_for_every_label() {
        for k in 1..=3usize {
            for code in 0..3u32.pow(k as u32) {
                let nops: Vec<u8> = (0..k).map(|i| ((code / 3u32.pow(i as u32)) % 3) as u8).collect();
                let label = CodeLabel::from_nops(&nops);
                let complement = label.rotated(1, 3);

                let mut genome = vec!["nop-X", "nop-X", "nop-X"];
                genome.extend(letters(complement.nops()));
                genome.push("nop-X");
                let mut hw = build(&genome, quiet_config());

                hw.thread_mut().next_label = complement.clone();
                assert_eq!(hw.find_label(1), Some(3 + k - 1), "label {}", label);
                assert_eq!(hw.ip_position(), 0);
            }
        }
    }

    #[test]
    fn test_missing_label() {
        let mut hw = build(&["nop-X", "inc", "dec", "nop-A", "inc"], quiet_config());
        hw.thread_mut().next_label = CodeLabel::from_nops(&[1]);
        assert_eq!(hw.find_label(1), None);
        assert_eq!(hw.find_label(0), None);
        hw.thread_mut().next_label = CodeLabel::new();
        assert_eq!(hw.find_label(1), Some(0));
    }

    #[test]
    fn test_match_inside_longer_run() {
        let mut hw = build(&["nop-X", "nop-X", "nop-C", "nop-A", "nop-B", "nop-X"], quiet_config());
        hw.thread_mut().next_label = CodeLabel::from_nops(&[0, 1]);
        assert_eq!(hw.find_label(1), Some(4));
    }

    #[test]
    fn test_backward_search() {
        let mut hw = build(&["nop-A", "nop-B", "nop-X", "nop-X", "jump-b", "nop-X"], quiet_config());
        hw.set_head(crate::cpu::HeadKind::Ip, 4);
        hw.thread_mut().next_label = CodeLabel::from_nops(&[0, 1]);
        assert_eq!(hw.find_label(-1), Some(1));
        hw.thread_mut().next_label = CodeLabel::from_nops(&[2]);
        assert_eq!(hw.find_label(-1), None);
    }

    #[test]
    fn test_search_from_start() {
        let mut hw = build(&["nop-B", "nop-X", "nop-X", "nop-X"], quiet_config());
        hw.set_head(crate::cpu::HeadKind::Ip, 2);
        hw.thread_mut().next_label = CodeLabel::from_nops(&[1]);
        assert_eq!(hw.find_label(1), None);
        assert_eq!(hw.find_label(0), None);
        let mut hw = build(&["nop-X", "nop-X", "nop-B", "nop-X"], quiet_config());
        hw.set_head(crate::cpu::HeadKind::Ip, 3);
        hw.thread_mut().next_label = CodeLabel::from_nops(&[1]);
        assert_eq!(hw.find_label(0), Some(2));
    }

    #[test]
    fn test_find_label_full() {
        let hw = build(&["nop-A", "nop-A", "nop-B", "inc", "nop-A", "nop-B"], quiet_config());
        assert_eq!(hw.find_label_full(&CodeLabel::from_nops(&[0, 1])), Some(2));
        assert_eq!(hw.find_label_full(&CodeLabel::from_nops(&[1, 0])), None);
        assert_eq!(hw.find_label_full(&CodeLabel::new()), None);
    }

    #[test]
    fn test_marked_label_exact_match() {
        let genome = [
            "goto", "nop-A", "nop-X", "label", "nop-A", "nop-B", "nop-X", "label", "nop-A", "nop-X",
        ];
        let mut hw = build(&genome, quiet_config());
        let marker = op(&hw, "label");

        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0])), Some(3));
        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0, 1])), Some(3));
        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0, 2])), None);
        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0, 1, 2])), None);
        assert!(hw.memory().flags(3).executed());

        hw.set_head(crate::cpu::HeadKind::Ip, 5);
        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0])), Some(7));
        hw.set_head(crate::cpu::HeadKind::Ip, 8);
        assert_eq!(hw.find_marked_label(marker, &CodeLabel::from_nops(&[0, 1])), Some(3));
    }
}
