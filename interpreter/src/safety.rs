//! Transition safety policy.
//!
//! Reversing the drive direction, flipping the turn direction, or switching
//! the base between linear and angular mode without a pause stresses the
//! drivetrain. The executor inserts an interlock delay before such a step.

use botblocks::{Block, WheelMotion};

/// Whether running `curr` straight after `prev` needs an interlock delay.
///
/// Only wheel blocks take part; an absent side (first block of a run) is
/// never risky.
pub fn is_risky_transition(prev: Option<&Block>, curr: Option<&Block>) -> bool {
    let (Some(prev), Some(curr)) = (
        prev.and_then(|b| b.kind().wheel_motion()),
        curr.and_then(|b| b.kind().wheel_motion()),
    ) else {
        return false;
    };

    use WheelMotion::*;
    match (prev, curr) {
        (Forward, Backward) | (Backward, Forward) => true,
        (TurnLeft, TurnRight) | (TurnRight, TurnLeft) => true,
        (prev, curr) => prev.is_linear() != curr.is_linear(),
    }
}
