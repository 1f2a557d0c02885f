//! Per-tick contact scan that decides whether the player stands on
//! something, hugs a wall, or is airborne, plus the win/out-of-bounds check
//! that runs in the same phase.

use glam::Vec2;

use crate::animation::AnimationKind;
use crate::controller::PlayerKinematicState;
use crate::physics::Contact;

pub const DEFAULT_WIN_ALTITUDE: f32 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroundingReport {
    /// At least one touching feet contact exists.
    pub touching_surface: bool,
    /// Some feet contact lies entirely under the foot line.
    pub grounded: bool,
    /// Some feet contact lies entirely beside the body box.
    pub can_kick_off: bool,
}

/// Classify the player's touching feet contacts.
///
/// `half_extents` is the torso box: the foot line is `pos.y - half_extents.y`
/// and the side lines are `pos.x ± half_extents.x`.
pub fn resolve(contacts: &[Contact], pos: Vec2, half_extents: Vec2) -> GroundingReport {
    let mut report = GroundingReport::default();
    let foot_line = pos.y - half_extents.y;
    let left = pos.x - half_extents.x;
    let right = pos.x + half_extents.x;

    for contact in contacts.iter().filter(|c| c.touching) {
        if !contact.pair().involves_feet() {
            continue;
        }
        report.touching_surface = true;

        let below = contact.points.iter().all(|p| p.position.y < foot_line);
        let side = contact
            .points
            .iter()
            .all(|p| p.position.x < left || p.position.x > right);

        if below {
            report.grounded = true;
        } else if side {
            report.can_kick_off = true;
        }
    }

    report
}

/// Fold a grounding report into the controller state.
pub fn apply(report: GroundingReport, state: &mut PlayerKinematicState) {
    state.is_grounded = report.grounded;
    state.can_kick_off = report.can_kick_off;
    state.touching_surface = report.touching_surface;

    if report.grounded {
        if state.current_animation == AnimationKind::Jump && !state.just_jumped {
            state.current_animation = AnimationKind::Idle;
        }
    } else if report.can_kick_off {
        state.just_jumped = false;
    }

    if !report.touching_surface {
        state.just_kicked_off = false;
        state.just_jumped = false;
    }
    if !report.grounded && !report.can_kick_off {
        state.current_animation = AnimationKind::Jump;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsCheck {
    InBounds,
    Won,
    FellOut,
}

/// Win beats everything; leaving `[0, viewport_max_x] x [0, inf)` is fatal
/// regardless of invincibility.
pub fn check_bounds(pos: Vec2, viewport_max_x: f32, win_altitude: f32) -> BoundsCheck {
    if pos.y > win_altitude {
        BoundsCheck::Won
    } else if pos.x < 0.0 || pos.y < 0.0 || pos.x > viewport_max_x {
        BoundsCheck::FellOut
    } else {
        BoundsCheck::InBounds
    }
}
