//! Instructions that reach outside the organism: task IO, messages,
//! orientation and movement

use super::{ExecutionContext, Hardware, InterruptKind, StepResult};
use crate::cpu::thread::{next_register, REG_BX, REG_CX};
use crate::cpu::NUM_NOPS;
use crate::organism::Message;

/// Facings addressable by `rotate-label`
const MAX_FACINGS: i32 = 8;

impl Hardware {
    // =========================================================================
    // Task IO
    // =========================================================================

    pub(super) fn inst_task_get(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let reg = self.find_modified_register(REG_CX);
        let value = ctx.organism.do_input();
        self.set_register(reg, value);
        StepResult::Continue
    }

    pub(super) fn inst_task_put(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        ctx.organism.do_output(self.register(reg));
        self.set_register(reg, 0);
        StepResult::Continue
    }

    /// Output, then input into the same register.
    pub(super) fn inst_task_io(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let reg = self.find_modified_register(REG_BX);
        ctx.organism.do_output(self.register(reg));
        let value = ctx.organism.do_input();
        self.set_register(reg, value);
        StepResult::Continue
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub(super) fn inst_send(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let label_reg = self.find_modified_register(REG_BX);
        let message = Message {
            label: self.register(label_reg),
            data: self.register(next_register(label_reg)),
        };
        if ctx.organism.send_message(message) {
            StepResult::Continue
        } else {
            StepResult::Failed("send: message not delivered".to_string())
        }
    }

    /// An empty inbox leaves the modifier in place.
    pub(super) fn inst_receive(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let Some(message) = ctx.organism.retrieve_message() else {
            return StepResult::Failed("receive: no message".to_string());
        };
        let label_reg = self.find_modified_register(REG_BX);
        self.set_register(label_reg, message.label);
        self.set_register(next_register(label_reg), message.data);
        StepResult::Continue
    }

    // =========================================================================
    // Orientation and movement
    // =========================================================================

    /// Turn one step, then keep turning until the faced neighbour carries
    /// the complement of the following label (at most one full circle).
    pub(super) fn inst_rotate(&mut self, ctx: &mut ExecutionContext<'_>, direction: i32) -> StepResult {
        let neighbors = ctx.organism.neighborhood_size();
        if neighbors == 0 {
            return StepResult::Failed("rotate: no neighbours".to_string());
        }

        self.read_label();
        ctx.organism.rotate(direction);
        if self.thread().next_label.is_empty() {
            return StepResult::Continue;
        }

        self.complement_label();
        let label = self.thread().next_label.clone();
        for _ in 1..neighbors {
            if ctx.organism.neighbor_has_label(&label) {
                break;
            }
            ctx.organism.rotate(direction);
        }
        StepResult::Continue
    }

    /// Face the direction the following label decodes to (grey code).
    pub(super) fn inst_rotate_label(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let neighbors = ctx.organism.neighborhood_size();
        if neighbors == 0 {
            return StepResult::Failed("rotate-label: no neighbours".to_string());
        }

        self.read_label();
        let target = self.thread().next_label.as_int_grey(NUM_NOPS).rem_euclid(MAX_FACINGS) as usize;
        for _ in 0..neighbors {
            if ctx.organism.facing() == target {
                break;
            }
            ctx.organism.rotate(1);
        }
        StepResult::Continue
    }

    pub(super) fn inst_tumble(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        let neighbors = ctx.organism.neighborhood_size();
        if neighbors == 0 {
            return StepResult::Failed("tumble: no neighbours".to_string());
        }
        let turns = ctx.rng.uniform_int(neighbors) as i32;
        ctx.organism.rotate(turns);
        StepResult::Continue
    }

    /// A successful move raises the movement interrupt when interrupts are
    /// on; the handler returns to the line after `move`.
    pub(super) fn inst_move(&mut self, ctx: &mut ExecutionContext<'_>) -> StepResult {
        if !ctx.organism.move_forward() {
            return StepResult::Failed("move: blocked".to_string());
        }
        if !self.config.interrupts_enabled() {
            return StepResult::Continue;
        }

        let len = self.memory.len();
        self.thread_mut().ip_mut().advance(len);
        self.raise_interrupt(ctx, InterruptKind::Moved);
        StepResult::Suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{build, quiet_config, tick};
    use crate::config::ArchitectureMode;
    use crate::cpu::thread::{REG_AX, REG_BX, REG_CX};
    use crate::organism::{Message, RecordingOrganism};
    use crate::random::seeded;

    #[test]
    fn test_get_put_io() {
        let mut hw = build(&["get", "put", "nop-C", "IO", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new().with_inputs(vec![11, 22]);

        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_CX), 11);

        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.outputs, vec![11]);
        assert_eq!(hw.register(REG_CX), 0);
        assert_eq!(hw.ip_position(), 3);

        hw.set_register(REG_BX, 5);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.outputs, vec![11, 5]);
        assert_eq!(hw.register(REG_BX), 22);
    }

    #[test]
    fn test_send_label_and_data() {
        let mut hw = build(&["send", "nop-C", "nop-X"], quiet_config());
        hw.set_register(REG_CX, 4);
        hw.set_register(REG_AX, 9);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.sent, vec![Message { label: 4, data: 9 }]);
    }

    #[test]
    fn test_receive() {
        let mut hw = build(&["receive", "nop-A", "receive", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        org.inbox.push_back(Message { label: 3, data: 8 });

        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_AX), 3);
        assert_eq!(hw.register(REG_BX), 8);
        assert_eq!(hw.ip_position(), 2);

        // Nothing queued: the modifier is not consumed
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.ip_position(), 3);
        assert!(org.faults.is_empty());
    }

    #[test]
    fn test_rotate_without_label_turns_once() {
        let mut hw = build(&["rotate-l", "inc", "rotate-r", "inc"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 7);
        hw.set_head(crate::cpu::HeadKind::Ip, 2);
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 0);
    }

    #[test]
    fn test_rotate_until_labelled_neighbour() {
        let mut hw = build(&["rotate-r", "nop-A", "inc"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        org.labelled_facings = vec![5];
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 5);
        assert_eq!(hw.ip_position(), 2);

        // No labelled neighbour: one full circle minus the first step
        let mut hw = build(&["rotate-r", "nop-A", "inc"], quiet_config());
        let mut org = RecordingOrganism::new();
        org.facing = 2;
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 2);
    }

    #[test]
    fn test_rotate_isolated_fails() {
        let mut hw = build(&["rotate-r", "inc"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        org.neighborhood = 0;
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 0);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_rotate_label_faces_decoded_direction() {
        // grey(B, A) = 5
        let mut hw = build(&["rotate-label", "nop-B", "nop-A", "inc"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        org.facing = 6;
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.facing, 5);
        assert_eq!(hw.ip_position(), 3);
    }

    #[test]
    fn test_tumble_stays_in_neighbourhood() {
        let mut hw = build(&["tumble"], quiet_config());
        let mut rng = seeded(5);
        let mut org = RecordingOrganism::new();
        for _ in 0..20 {
            tick(&mut hw, &mut rng, &mut org);
            assert!(org.facing < 8);
        }
    }

    #[test]
    fn test_move_classic() {
        let mut hw = build(&["move", "inc", "nop-X"], quiet_config());
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();
        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.moves, 1);
        assert_eq!(hw.ip_position(), 1);
    }

    #[test]
    fn test_move_raises_interrupt() {
        let config = quiet_config().with_architecture(ArchitectureMode::ClassicInterrupts);
        let mut hw = build(&["move", "inc", "nop-X", "moved-handler", "inc", "end-handler"], config);
        hw.set_register(REG_BX, 7);
        let mut rng = seeded(1);
        let mut org = RecordingOrganism::new();

        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(org.moves, 1);
        assert!(hw.thread().is_in_handler());
        assert_eq!(hw.ip_position(), 4);
        assert_eq!(hw.register(REG_BX), 0);

        tick(&mut hw, &mut rng, &mut org);
        assert_eq!(hw.register(REG_BX), 1);
        tick(&mut hw, &mut rng, &mut org);
        assert!(!hw.thread().is_in_handler());
        assert_eq!(hw.ip_position(), 1);
        assert_eq!(hw.register(REG_BX), 7);
    }
}
