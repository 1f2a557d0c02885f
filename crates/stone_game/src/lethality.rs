//! Impulse lethality and the cheat flags that gate it.
//!
//! A kill is returned as a value from [`LethalityState::evaluate_step`] and
//! consumed by the session within the same tick. Nothing is stored on the
//! player between ticks, so a kill that is not acted on is simply gone.

use glam::Vec2;

use crate::physics::Contact;

pub const DEFAULT_LETHAL_IMPULSE: f32 = 40.0;

/// Raised when debris lands on the player hard enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillSignal;

#[derive(Debug, Clone, PartialEq)]
pub struct LethalityState {
    /// Seconds-like countdown; `f32::INFINITY` never expires.
    pub invincibility_timer: f32,
    /// Player fixtures collide with nothing. Kinematic checks still run.
    pub uncollidable: bool,
    visible: bool,
    blink_ticks: u32,
}

impl Default for LethalityState {
    fn default() -> Self {
        Self {
            invincibility_timer: 0.0,
            uncollidable: false,
            visible: true,
            blink_ticks: 0,
        }
    }
}

impl LethalityState {
    pub fn is_invincible(&self) -> bool {
        self.invincibility_timer > 0.0
    }

    /// Decide whether one solved contact kills the player.
    pub fn evaluate(&self, contact: &Contact, player_pos: Vec2, threshold: f32) -> Option<KillSignal> {
        if self.is_invincible() || !contact.pair().involves_debris() {
            return None;
        }
        // Every point must be strictly above the centre of mass: something
        // landed on the player rather than brushing past.
        if !contact.points.iter().all(|p| p.position.y > player_pos.y) {
            return None;
        }
        let impulse = contact.max_normal_impulse();
        if impulse > threshold {
            log::debug!("Lethal impulse {impulse:.2} (threshold {threshold})");
            Some(KillSignal)
        } else {
            None
        }
    }

    /// Fold [`Self::evaluate`] over every contact solved in one step.
    pub fn evaluate_step(
        &self,
        contacts: &[Contact],
        player_pos: Vec2,
        threshold: f32,
    ) -> Option<KillSignal> {
        contacts
            .iter()
            .find_map(|c| self.evaluate(c, player_pos, threshold))
    }

    /// Flip between mortal and never-expiring invincibility.
    pub fn toggle_invincibility(&mut self) {
        self.invincibility_timer = if self.is_invincible() {
            0.0
        } else {
            f32::INFINITY
        };
        log::info!("Invincibility {}", if self.is_invincible() { "on" } else { "off" });
    }

    pub fn toggle_uncollidable(&mut self) -> bool {
        self.uncollidable = !self.uncollidable;
        log::info!("Uncollidable {}", if self.uncollidable { "on" } else { "off" });
        self.uncollidable
    }

    /// Per-tick bookkeeping: count invincibility down and drive the blink.
    pub fn end_tick(&mut self, decay: f32, blink_interval_ticks: u32) {
        if !self.is_invincible() {
            self.visible = true;
            self.blink_ticks = 0;
            return;
        }

        self.blink_ticks += 1;
        if self.blink_ticks >= blink_interval_ticks.max(1) {
            self.blink_ticks = 0;
            self.visible = !self.visible;
        }
        self.invincibility_timer = (self.invincibility_timer - decay).max(0.0);
    }

    /// Whether the player sprite should be drawn this tick.
    pub fn visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CategoryBits;
    use crate::physics::ContactPoint;
    use proptest::prelude::*;

    fn debris_hit(points: &[(f32, f32, f32)]) -> Contact {
        Contact {
            categories: (CategoryBits::DEBRIS, CategoryBits::PLAYER_BODY),
            touching: true,
            points: points
                .iter()
                .map(|&(x, y, impulse)| ContactPoint {
                    position: Vec2::new(x, y),
                    normal_impulse: impulse,
                })
                .collect(),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let state = LethalityState::default();
        let player = Vec2::new(5.0, 5.0);

        let exactly = debris_hit(&[(5.0, 6.0, 40.0)]);
        assert_eq!(state.evaluate(&exactly, player, DEFAULT_LETHAL_IMPULSE), None);

        let over = debris_hit(&[(5.0, 6.0, 40.01)]);
        assert_eq!(
            state.evaluate(&over, player, DEFAULT_LETHAL_IMPULSE),
            Some(KillSignal)
        );
    }

    #[test]
    fn every_point_must_be_above() {
        let state = LethalityState::default();
        let player = Vec2::new(0.0, 5.0);
        let brushing = debris_hit(&[(0.5, 6.0, 100.0), (0.9, 4.0, 100.0)]);
        assert_eq!(state.evaluate(&brushing, player, 40.0), None);

        let level = debris_hit(&[(0.5, 5.0, 100.0)]);
        assert_eq!(state.evaluate(&level, player, 40.0), None);
    }

    #[test]
    fn boundary_contacts_are_never_lethal() {
        let state = LethalityState::default();
        let contact = Contact {
            categories: (CategoryBits::PLAYER_FEET, CategoryBits::BOUNDARY),
            ..debris_hit(&[(0.0, 10.0, 500.0)])
        };
        assert_eq!(state.evaluate(&contact, Vec2::ZERO, 40.0), None);
    }

    #[test]
    fn feet_debris_can_kill() {
        let state = LethalityState::default();
        let contact = Contact {
            categories: (CategoryBits::PLAYER_FEET, CategoryBits::DEBRIS),
            ..debris_hit(&[(0.0, 1.0, 80.0)])
        };
        assert!(state.evaluate(&contact, Vec2::ZERO, 40.0).is_some());
    }

    #[test]
    fn evaluate_step_finds_any_lethal_contact() {
        let state = LethalityState::default();
        let harmless = debris_hit(&[(0.0, 1.0, 1.0)]);
        let lethal = debris_hit(&[(0.0, 1.0, 41.0)]);
        assert_eq!(
            state.evaluate_step(&[harmless.clone()], Vec2::ZERO, 40.0),
            None
        );
        assert_eq!(
            state.evaluate_step(&[harmless, lethal], Vec2::ZERO, 40.0),
            Some(KillSignal)
        );
    }

    #[test]
    fn toggled_invincibility_never_expires() {
        let mut state = LethalityState::default();
        state.toggle_invincibility();
        assert!(state.invincibility_timer.is_infinite());
        for _ in 0..1000 {
            state.end_tick(0.2, 10);
        }
        assert!(state.is_invincible());

        state.toggle_invincibility();
        assert_eq!(state.invincibility_timer, 0.0);
    }

    #[test]
    fn finite_invincibility_decays_and_blinks() {
        let mut state = LethalityState {
            invincibility_timer: 3.0,
            ..Default::default()
        };
        let mut toggles = 0;
        let mut last = state.visible();
        for _ in 0..30 {
            state.end_tick(0.2, 10);
            if state.visible() != last {
                toggles += 1;
                last = state.visible();
            }
        }
        assert!(!state.is_invincible());
        // Hidden after ten ticks, shown again once invincibility runs out.
        assert_eq!(toggles, 2);
        assert!(state.visible());
    }

    #[test]
    fn uncollidable_toggles() {
        let mut state = LethalityState::default();
        assert!(state.toggle_uncollidable());
        assert!(!state.toggle_uncollidable());
    }

    fn category() -> impl Strategy<Value = CategoryBits> {
        prop_oneof![
            Just(CategoryBits::DEBRIS),
            Just(CategoryBits::BOUNDARY),
            Just(CategoryBits::PLAYER_FEET),
            Just(CategoryBits::PLAYER_BODY),
        ]
    }

    fn contact_strategy() -> impl Strategy<Value = Contact> {
        (
            category(),
            category(),
            prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0, 0.0f32..100.0), 0..4),
        )
            .prop_map(|(a, b, points)| Contact {
                categories: (a, b),
                touching: true,
                points: points
                    .into_iter()
                    .map(|(x, y, impulse)| ContactPoint {
                        position: Vec2::new(x, y),
                        normal_impulse: impulse,
                    })
                    .collect(),
            })
    }

    proptest! {
        #[test]
        fn never_kills_while_invincible(
            contact in contact_strategy(),
            timer in 0.001f32..1000.0,
            py in -10.0f32..10.0,
        ) {
            let state = LethalityState {
                invincibility_timer: timer,
                ..Default::default()
            };
            prop_assert_eq!(state.evaluate(&contact, Vec2::new(0.0, py), 40.0), None);
        }

        #[test]
        fn kills_iff_debris_above_and_hard(contact in contact_strategy(), py in -10.0f32..10.0) {
            let state = LethalityState::default();
            let player = Vec2::new(0.0, py);
            let expected = contact.pair().involves_debris()
                && contact.points.iter().all(|p| p.position.y > py)
                && contact.max_normal_impulse() > 40.0;
            prop_assert_eq!(state.evaluate(&contact, player, 40.0).is_some(), expected);
        }
    }
}
