//! Boundary to the rigid-body simulation.
//!
//! Gameplay never talks to a physics engine directly. Everything it needs
//! (bodies, fixtures, stepping, contact reports, impulses) goes through
//! [`PhysicsWorld`], so the session can be driven by the rapier backend in
//! the binary and by a scripted world in tests.

use glam::Vec2;

use crate::collision::{CategoryBits, CollisionPair};

#[cfg(test)]
pub mod mock;
pub mod rapier_world;

pub use rapier_world::RapierWorld;

/// Opaque handle to a body inside one world. Never valid across worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// Opaque handle to a fixture attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixtureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    /// Radians.
    pub angle: f32,
    pub fixed_rotation: bool,
}

impl BodyDef {
    pub fn fixed(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            angle: 0.0,
            fixed_rotation: false,
        }
    }

    pub fn dynamic(position: Vec2) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            angle: 0.0,
            fixed_rotation: false,
        }
    }
}

/// Collider geometry, in the owning body's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Edge { a: Vec2, b: Vec2 },
    Box { half_extents: Vec2, center: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureDef {
    pub shape: Shape,
    pub category: CategoryBits,
    /// Categories this fixture collides with.
    pub mask: CategoryBits,
    pub density: f32,
    pub friction: f32,
}

impl FixtureDef {
    pub const DEFAULT_FRICTION: f32 = 0.2;

    pub fn new(shape: Shape, category: CategoryBits) -> Self {
        Self {
            shape,
            category,
            mask: CategoryBits::all(),
            density: 0.0,
            friction: Self::DEFAULT_FRICTION,
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// One solved point of a contact manifold, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position: Vec2,
    pub normal_impulse: f32,
}

/// A contact between two fixtures as reported by the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub categories: (CategoryBits, CategoryBits),
    /// False for pairs whose bounding volumes overlap but whose shapes do not.
    pub touching: bool,
    pub points: Vec<ContactPoint>,
}

impl Contact {
    pub fn pair(&self) -> CollisionPair {
        CollisionPair::classify(self.categories.0, self.categories.1)
    }

    pub fn max_normal_impulse(&self) -> f32 {
        self.points
            .iter()
            .fold(0.0_f32, |acc, p| acc.max(p.normal_impulse))
    }
}

/// World-wide simulation settings, fixed for the lifetime of one world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsSettings {
    pub gravity: Vec2,
}

pub trait PhysicsWorld {
    fn create_body(&mut self, def: BodyDef) -> BodyId;

    /// Returns `None` if `body` does not exist in this world.
    fn create_fixture(&mut self, body: BodyId, def: FixtureDef) -> Option<FixtureId>;

    /// Removes the body and every fixture attached to it.
    fn destroy_body(&mut self, body: BodyId);

    fn body_count(&self) -> usize;

    /// Advance the simulation. Returns the contacts the solver resolved this
    /// step with their per-point normal impulses.
    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32)
        -> Vec<Contact>;

    /// Every contact currently attached to one of `body`'s fixtures,
    /// including pairs that are not touching.
    fn contacts(&self, body: BodyId) -> Vec<Contact>;

    fn position(&self, body: BodyId) -> Option<Vec2>;
    fn linear_velocity(&self, body: BodyId) -> Option<Vec2>;
    fn set_position(&mut self, body: BodyId, position: Vec2);
    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec2);

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2);

    /// Force applied until the end of the next step.
    fn apply_force(&mut self, body: BodyId, force: Vec2, point: Vec2);

    fn set_friction(&mut self, fixture: FixtureId, friction: f32);
    fn set_collision_mask(&mut self, fixture: FixtureId, mask: CategoryBits);

    /// Recompute the mixed friction of every contact touching `body` from the
    /// current fixture values.
    fn reset_contact_friction(&mut self, body: BodyId);
}

/// Builds a fresh world. Called once per `Intro -> Playing` transition.
pub type WorldFactory<W> = Box<dyn FnMut(&PhysicsSettings) -> W>;
