use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationKind;
use crate::physics::PhysicsWorld;
use crate::player::PlayerRig;

/// Held-key intent for one tick. Level-triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionIntent {
    pub move_left: bool,
    pub move_right: bool,
    pub jump_held: bool,
}

impl MotionIntent {
    /// -1, 0 or 1. Left and right cancel out.
    pub fn direction(self) -> i8 {
        i8::from(self.move_right) - i8::from(self.move_left)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub jump_impulse: f32,
    pub kick_off_impulse: f32,
    pub jump_grace_seconds: f32,
    pub grace_impulse: f32,
    pub run_force: f32,
    pub max_run_speed: f32,
    pub idle_feet_friction: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            jump_impulse: 15.0,
            kick_off_impulse: 20.0,
            jump_grace_seconds: 0.3,
            grace_impulse: 2.2,
            run_force: 200.0,
            max_run_speed: 8.0,
            idle_feet_friction: 5.0,
        }
    }
}

/// Everything the controller remembers between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerKinematicState {
    pub is_grounded: bool,
    pub can_kick_off: bool,
    /// Feet touched any boundary or debris this tick, from any side.
    pub touching_surface: bool,
    pub just_jumped: bool,
    pub just_kicked_off: bool,
    pub was_moving: bool,
    pub facing_right: bool,
    pub jump_grace_timer: f32,
    pub current_animation: AnimationKind,
}

impl Default for PlayerKinematicState {
    fn default() -> Self {
        Self {
            is_grounded: false,
            can_kick_off: false,
            touching_surface: false,
            just_jumped: false,
            just_kicked_off: false,
            was_moving: false,
            facing_right: true,
            jump_grace_timer: 0.0,
            current_animation: AnimationKind::Idle,
        }
    }
}

/// What the controller did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionReport {
    pub jumped: bool,
    pub kicked_off: bool,
    pub grace_boost: bool,
    pub pushing: bool,
}

/// Apply one tick of player input to the world.
///
/// Must run after grounding has refreshed `state` for this tick. Forces
/// applied here act during the next physics step.
pub fn drive<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    rig: &PlayerRig,
    state: &mut PlayerKinematicState,
    intent: MotionIntent,
    dt: f32,
    config: &ControllerConfig,
) -> MotionReport {
    let mut report = MotionReport::default();
    let (Some(center), Some(velocity)) = (world.position(rig.body), world.linear_velocity(rig.body))
    else {
        log::warn!("Player body missing from world; skipping input");
        return report;
    };

    if state.jump_grace_timer >= 0.0 {
        state.jump_grace_timer -= dt;
    }

    if intent.jump_held {
        if state.is_grounded && !state.just_jumped {
            world.apply_linear_impulse(rig.body, Vec2::new(0.0, config.jump_impulse), center);
            state.jump_grace_timer = config.jump_grace_seconds;
            state.just_jumped = true;
            state.current_animation = AnimationKind::Jump;
            report.jumped = true;
            log::trace!("Jump from {center}");
        } else if state.can_kick_off && !state.just_kicked_off {
            world.apply_linear_impulse(rig.body, Vec2::new(0.0, config.kick_off_impulse), center);
            state.just_kicked_off = true;
            report.kicked_off = true;
            log::trace!("Kick-off from {center}");
        } else if state.jump_grace_timer > 0.0 {
            world.apply_linear_impulse(rig.body, Vec2::new(0.0, config.grace_impulse), center);
            report.grace_boost = true;
        }
    }

    let direction = intent.direction();
    let moving = direction != 0;
    if direction > 0 && velocity.x < config.max_run_speed {
        world.apply_force(rig.body, Vec2::new(config.run_force, 0.0), center);
        state.facing_right = true;
        report.pushing = true;
    } else if direction < 0 && velocity.x > -config.max_run_speed {
        world.apply_force(rig.body, Vec2::new(-config.run_force, 0.0), center);
        state.facing_right = false;
        report.pushing = true;
    }

    // Grippy feet while standing, slippery while running.
    let friction = if moving { 0.0 } else { config.idle_feet_friction };
    world.set_friction(rig.feet, friction);
    if moving != state.was_moving {
        world.reset_contact_friction(rig.body);
        state.was_moving = moving;
    }

    if state.is_grounded && state.current_animation != AnimationKind::Jump && !state.just_jumped {
        state.current_animation = if moving {
            AnimationKind::Run
        } else {
            AnimationKind::Idle
        };
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::mock::MockWorld;
    use crate::player::PlayerConfig;

    fn setup() -> (MockWorld, PlayerRig) {
        let mut world = MockWorld::new(Vec2::ZERO);
        let rig = PlayerRig::spawn(&mut world, &PlayerConfig::default()).expect("spawn");
        (world, rig)
    }

    fn grounded() -> PlayerKinematicState {
        PlayerKinematicState {
            is_grounded: true,
            touching_surface: true,
            ..Default::default()
        }
    }

    const JUMP: MotionIntent = MotionIntent {
        move_left: false,
        move_right: false,
        jump_held: true,
    };

    #[test]
    fn direction_cancels() {
        let both = MotionIntent {
            move_left: true,
            move_right: true,
            jump_held: false,
        };
        assert_eq!(both.direction(), 0);
        assert_eq!(
            MotionIntent {
                move_left: true,
                ..Default::default()
            }
            .direction(),
            -1
        );
    }

    #[test]
    fn grounded_jump_fires_once() {
        let (mut world, rig) = setup();
        let mut state = grounded();
        let config = ControllerConfig::default();

        let report = drive(&mut world, &rig, &mut state, JUMP, 1.0 / 60.0, &config);
        assert!(report.jumped);
        assert!(state.just_jumped);
        assert_eq!(state.current_animation, AnimationKind::Jump);
        assert!((state.jump_grace_timer - 0.3).abs() < 1e-6);
        let vy = world.linear_velocity(rig.body).expect("body").y;
        assert!(vy > 0.0);

        // Still grounded next tick, but the jump was already spent.
        let report = drive(&mut world, &rig, &mut state, JUMP, 1.0 / 60.0, &config);
        assert!(!report.jumped);
        assert!(report.grace_boost);
    }

    #[test]
    fn kick_off_does_not_touch_animation() {
        let (mut world, rig) = setup();
        let mut state = PlayerKinematicState {
            can_kick_off: true,
            touching_surface: true,
            current_animation: AnimationKind::Jump,
            ..Default::default()
        };
        let report = drive(
            &mut world,
            &rig,
            &mut state,
            JUMP,
            1.0 / 60.0,
            &ControllerConfig::default(),
        );
        assert!(report.kicked_off);
        assert!(state.just_kicked_off);
        assert_eq!(state.current_animation, AnimationKind::Jump);
    }

    #[test]
    fn kick_off_impulse_is_larger_than_jump() {
        let config = ControllerConfig::default();

        let (mut jump_world, rig) = setup();
        drive(&mut jump_world, &rig, &mut grounded(), JUMP, 1.0 / 60.0, &config);

        let (mut kick_world, rig2) = setup();
        let mut kicking = PlayerKinematicState {
            can_kick_off: true,
            ..Default::default()
        };
        drive(&mut kick_world, &rig2, &mut kicking, JUMP, 1.0 / 60.0, &config);

        let jump_vy = jump_world.linear_velocity(rig.body).expect("body").y;
        let kick_vy = kick_world.linear_velocity(rig2.body).expect("body").y;
        assert!(kick_vy > jump_vy);
    }

    #[test]
    fn grace_expires() {
        let (mut world, rig) = setup();
        let mut state = PlayerKinematicState {
            jump_grace_timer: 0.02,
            ..Default::default()
        };
        let config = ControllerConfig::default();
        assert!(drive(&mut world, &rig, &mut state, JUMP, 0.015, &config).grace_boost);
        assert!(!drive(&mut world, &rig, &mut state, JUMP, 0.015, &config).grace_boost);
    }

    #[test]
    fn run_force_respects_speed_cap() {
        let (mut world, rig) = setup();
        let mut state = grounded();
        let config = ControllerConfig::default();
        let right = MotionIntent {
            move_right: true,
            ..Default::default()
        };

        world.set_linear_velocity(rig.body, Vec2::new(8.0, 0.0));
        let report = drive(&mut world, &rig, &mut state, right, 1.0 / 60.0, &config);
        assert!(!report.pushing);
        assert_eq!(state.current_animation, AnimationKind::Run);

        world.set_linear_velocity(rig.body, Vec2::new(7.9, 0.0));
        let report = drive(&mut world, &rig, &mut state, right, 1.0 / 60.0, &config);
        assert!(report.pushing);
        assert!(state.facing_right);
    }

    #[test]
    fn friction_resets_only_on_change() {
        let (mut world, rig) = setup();
        let mut state = grounded();
        let config = ControllerConfig::default();
        let left = MotionIntent {
            move_left: true,
            ..Default::default()
        };

        drive(&mut world, &rig, &mut state, left, 1.0 / 60.0, &config);
        drive(&mut world, &rig, &mut state, left, 1.0 / 60.0, &config);
        assert_eq!(world.friction_resets, 1);
        assert_eq!(world.fixture(rig.feet).expect("feet").friction, 0.0);
        assert!(!state.facing_right);

        drive(&mut world, &rig, &mut state, MotionIntent::default(), 1.0 / 60.0, &config);
        drive(&mut world, &rig, &mut state, MotionIntent::default(), 1.0 / 60.0, &config);
        assert_eq!(world.friction_resets, 2);
        assert_eq!(world.fixture(rig.feet).expect("feet").friction, 5.0);
        assert_eq!(state.current_animation, AnimationKind::Idle);
    }

    #[test]
    fn airborne_player_keeps_jump_animation() {
        let (mut world, rig) = setup();
        let mut state = PlayerKinematicState {
            current_animation: AnimationKind::Jump,
            ..Default::default()
        };
        let right = MotionIntent {
            move_right: true,
            ..Default::default()
        };
        drive(&mut world, &rig, &mut state, right, 1.0 / 60.0, &ControllerConfig::default());
        assert_eq!(state.current_animation, AnimationKind::Jump);
    }
}
