//! The player's rigid body: a frictionless torso box with a thin feet
//! box under it. Feet contacts drive grounding; torso contacts with
//! debris can be lethal.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision::CategoryBits;
use crate::physics::{BodyDef, BodyId, FixtureDef, FixtureId, PhysicsWorld, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub spawn: Vec2,
    /// Half width and half height of the torso box.
    pub half_extents: Vec2,
    pub feet_half_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: Vec2::new(2.0, 2.0),
            half_extents: Vec2::new(0.76, 1.28),
            feet_half_height: 0.2,
        }
    }
}

/// Handles to the player's body and its two fixtures in one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRig {
    pub body: BodyId,
    pub torso: FixtureId,
    pub feet: FixtureId,
}

impl PlayerRig {
    pub fn spawn<W: PhysicsWorld + ?Sized>(world: &mut W, config: &PlayerConfig) -> Option<Self> {
        let body = world.create_body(BodyDef {
            fixed_rotation: true,
            ..BodyDef::dynamic(config.spawn)
        });

        let torso = world.create_fixture(
            body,
            FixtureDef::new(
                Shape::Box {
                    half_extents: config.half_extents,
                    center: Vec2::ZERO,
                },
                CategoryBits::PLAYER_BODY,
            )
            .with_density(1.0)
            .with_friction(0.0),
        )?;

        // Feet are centred on the torso's bottom edge and carry no mass.
        let feet = world.create_fixture(
            body,
            FixtureDef::new(
                Shape::Box {
                    half_extents: Vec2::new(config.half_extents.x, config.feet_half_height),
                    center: Vec2::new(0.0, -config.half_extents.y),
                },
                CategoryBits::PLAYER_FEET,
            ),
        )?;

        log::debug!("Spawned player at {}", config.spawn);
        Some(Self { body, torso, feet })
    }

    /// Clear or restore the collision masks of both player fixtures.
    pub fn set_uncollidable<W: PhysicsWorld + ?Sized>(&self, world: &mut W, uncollidable: bool) {
        let mask = if uncollidable {
            CategoryBits::empty()
        } else {
            CategoryBits::all()
        };
        world.set_collision_mask(self.torso, mask);
        world.set_collision_mask(self.feet, mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::mock::MockWorld;

    #[test]
    fn spawn_builds_torso_and_feet() {
        let mut world = MockWorld::new(Vec2::ZERO);
        let rig = PlayerRig::spawn(&mut world, &PlayerConfig::default()).expect("spawn");

        assert_eq!(world.position(rig.body), Some(Vec2::new(2.0, 2.0)));
        assert!(world.body(rig.body).expect("body").def.fixed_rotation);

        let torso = world.fixture(rig.torso).expect("torso");
        assert_eq!(torso.category, CategoryBits::PLAYER_BODY);
        assert_eq!(torso.friction, 0.0);
        assert_eq!(torso.density, 1.0);

        let feet = world.fixture(rig.feet).expect("feet");
        assert_eq!(feet.category, CategoryBits::PLAYER_FEET);
        assert_eq!(feet.density, 0.0);
        assert_eq!(
            feet.shape,
            Shape::Box {
                half_extents: Vec2::new(0.76, 0.2),
                center: Vec2::new(0.0, -1.28),
            }
        );
    }

    #[test]
    fn uncollidable_clears_and_restores_masks() {
        let mut world = MockWorld::new(Vec2::ZERO);
        let rig = PlayerRig::spawn(&mut world, &PlayerConfig::default()).expect("spawn");

        rig.set_uncollidable(&mut world, true);
        assert!(world.fixture(rig.torso).expect("torso").mask.is_empty());
        assert!(world.fixture(rig.feet).expect("feet").mask.is_empty());

        rig.set_uncollidable(&mut world, false);
        assert_eq!(world.fixture(rig.feet).expect("feet").mask, CategoryBits::all());
    }
}
