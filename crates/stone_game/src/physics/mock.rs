//! Scripted in-memory world for deterministic tests.
//!
//! Bodies integrate gravity, forces and impulses with explicit Euler but never
//! collide. Contacts are whatever the test scripts: per-body contact lists
//! returned by `contacts()`, and a queue of solved contacts handed out by the
//! next `step()`.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use glam::Vec2;

use super::{
    BodyDef, BodyId, BodyKind, Contact, ContactPoint, FixtureDef, FixtureId, PhysicsWorld, Shape,
};
use crate::collision::CategoryBits;

#[derive(Debug, Clone)]
pub struct MockBody {
    pub def: BodyDef,
    pub position: Vec2,
    pub velocity: Vec2,
    force: Vec2,
    mass: f32,
}

pub struct MockWorld {
    gravity: Vec2,
    bodies: BTreeMap<BodyId, MockBody>,
    fixtures: HashMap<FixtureId, (BodyId, FixtureDef)>,
    scripted: HashMap<BodyId, Vec<Contact>>,
    solved: Vec<Contact>,
    pub friction_resets: usize,
    pub steps: usize,
    pub last_dt: f32,
    live: Option<Rc<Cell<usize>>>,
    next_body: u32,
    next_fixture: u32,
}

impl MockWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            fixtures: HashMap::new(),
            scripted: HashMap::new(),
            solved: Vec::new(),
            friction_resets: 0,
            steps: 0,
            last_dt: 0.0,
            live: None,
            next_body: 0,
            next_fixture: 0,
        }
    }

    /// A world that counts itself in `live` until dropped.
    pub fn tracked(gravity: Vec2, live: Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        let mut world = Self::new(gravity);
        world.live = Some(live);
        world
    }

    pub fn body(&self, id: BodyId) -> Option<&MockBody> {
        self.bodies.get(&id)
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&FixtureDef> {
        self.fixtures.get(&id).map(|(_, def)| def)
    }

    pub fn fixtures_of(&self, body: BodyId) -> Vec<(FixtureId, FixtureDef)> {
        let mut out: Vec<_> = self
            .fixtures
            .iter()
            .filter(|(_, (owner, _))| *owner == body)
            .map(|(id, (_, def))| (*id, *def))
            .collect();
        out.sort_by_key(|(id, _)| id.0);
        out
    }

    pub fn bodies_with_category(&self, category: CategoryBits) -> Vec<BodyId> {
        let mut out: Vec<_> = self
            .fixtures
            .values()
            .filter(|(_, def)| def.category == category)
            .map(|(body, _)| *body)
            .collect();
        out.sort_by_key(|b| b.0);
        out.dedup();
        out
    }

    /// Replace what `contacts(body)` reports.
    pub fn script_contacts(&mut self, body: BodyId, contacts: Vec<Contact>) {
        self.scripted.insert(body, contacts);
    }

    /// Hand `contact` out from the next `step()` as a solved contact.
    pub fn queue_solved(&mut self, contact: Contact) {
        self.solved.push(contact);
    }

    /// A touching contact with the given points and zero impulse.
    pub fn contact(a: CategoryBits, b: CategoryBits, points: &[Vec2]) -> Contact {
        Contact {
            categories: (a, b),
            touching: true,
            points: points
                .iter()
                .map(|p| ContactPoint {
                    position: *p,
                    normal_impulse: 0.0,
                })
                .collect(),
        }
    }
}

fn fixture_mass(def: &FixtureDef) -> f32 {
    match def.shape {
        Shape::Box { half_extents, .. } => def.density * 4.0 * half_extents.x * half_extents.y,
        Shape::Edge { .. } => 0.0,
    }
}

impl PhysicsWorld for MockWorld {
    fn create_body(&mut self, def: BodyDef) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            id,
            MockBody {
                def,
                position: def.position,
                velocity: Vec2::ZERO,
                force: Vec2::ZERO,
                mass: 0.0,
            },
        );
        id
    }

    fn create_fixture(&mut self, body: BodyId, def: FixtureDef) -> Option<FixtureId> {
        let owner = self.bodies.get_mut(&body)?;
        owner.mass += fixture_mass(&def);
        let id = FixtureId(self.next_fixture);
        self.next_fixture += 1;
        self.fixtures.insert(id, (body, def));
        Some(id)
    }

    fn destroy_body(&mut self, body: BodyId) {
        self.bodies.remove(&body);
        self.scripted.remove(&body);
        self.fixtures.retain(|_, (owner, _)| *owner != body);
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn step(&mut self, dt: f32, _velocity_iterations: u32, _position_iterations: u32) -> Vec<Contact> {
        self.steps += 1;
        self.last_dt = dt;
        for body in self.bodies.values_mut() {
            if body.def.kind == BodyKind::Static {
                continue;
            }
            let mass = if body.mass > 0.0 { body.mass } else { 1.0 };
            body.velocity += (self.gravity + body.force / mass) * dt;
            body.position += body.velocity * dt;
            body.force = Vec2::ZERO;
        }
        std::mem::take(&mut self.solved)
    }

    fn contacts(&self, body: BodyId) -> Vec<Contact> {
        self.scripted.get(&body).cloned().unwrap_or_default()
    }

    fn position(&self, body: BodyId) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.position)
    }

    fn linear_velocity(&self, body: BodyId) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.velocity)
    }

    fn set_position(&mut self, body: BodyId, position: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.position = position;
        }
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.velocity = velocity;
        }
    }

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, _point: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.def.kind == BodyKind::Dynamic {
                let mass = if b.mass > 0.0 { b.mass } else { 1.0 };
                b.velocity += impulse / mass;
            }
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec2, _point: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.force += force;
        }
    }

    fn set_friction(&mut self, fixture: FixtureId, friction: f32) {
        if let Some((_, def)) = self.fixtures.get_mut(&fixture) {
            def.friction = friction;
        }
    }

    fn set_collision_mask(&mut self, fixture: FixtureId, mask: CategoryBits) {
        if let Some((_, def)) = self.fixtures.get_mut(&fixture) {
            def.mask = mask;
        }
    }

    fn reset_contact_friction(&mut self, _body: BodyId) {
        self.friction_resets += 1;
    }
}

impl Drop for MockWorld {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.set(live.get().saturating_sub(1));
        }
    }
}
