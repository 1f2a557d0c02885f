//! rapier2d backend for [`PhysicsWorld`].
//!
//! Bodies and fixtures are addressed by small integer ids that map onto
//! rapier handles. Fixture category and mask bits are stored in the
//! collider's interaction groups, so contact classification reads them
//! straight back from rapier.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

use super::{
    BodyDef, BodyId, BodyKind, Contact, ContactPoint, FixtureDef, FixtureId, PhysicsSettings,
    PhysicsWorld, Shape,
};
use crate::collision::CategoryBits;

/// Gap kept between touching shapes. Without it a box pressed into a wall
/// sinks slightly and its contact points land inside the box.
const CONTACT_SKIN: Real = 0.01;

pub struct RapierWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    bodies: HashMap<BodyId, RigidBodyHandle>,
    fixtures: HashMap<FixtureId, ColliderHandle>,
    next_body: u32,
    next_fixture: u32,
}

impl RapierWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![settings.gravity.x, settings.gravity.y],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: HashMap::new(),
            fixtures: HashMap::new(),
            next_body: 0,
            next_fixture: 0,
        }
    }

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies
            .get(&id)
            .and_then(|handle| self.rigid_body_set.get(*handle))
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let handle = *self.bodies.get(&id)?;
        self.rigid_body_set.get_mut(handle)
    }

    fn categories_of(&self, handle: ColliderHandle) -> CategoryBits {
        self.collider_set
            .get(handle)
            .map(|c| group_to_category(c.collision_groups().memberships))
            .unwrap_or_else(CategoryBits::empty)
    }

    fn convert_pair(&self, pair: &ContactPair) -> Option<Contact> {
        let c1 = self.collider_set.get(pair.collider1)?;
        let c2 = self.collider_set.get(pair.collider2)?;

        let mut points = Vec::new();
        for manifold in &pair.manifolds {
            for tracked in &manifold.points {
                let p1 = c1.position() * tracked.local_p1;
                let p2 = c2.position() * tracked.local_p2;
                points.push(ContactPoint {
                    position: Vec2::new((p1.x + p2.x) * 0.5, (p1.y + p2.y) * 0.5),
                    normal_impulse: tracked.data.impulse,
                });
            }
        }

        Some(Contact {
            categories: (
                self.categories_of(pair.collider1),
                self.categories_of(pair.collider2),
            ),
            touching: pair.has_any_active_contact,
            points,
        })
    }
}

fn category_to_group(bits: CategoryBits) -> Group {
    Group::from_bits_truncate(u32::from(bits.bits()))
}

fn group_to_category(group: Group) -> CategoryBits {
    // Category bits live in the low 16 bits of the group.
    CategoryBits::from_bits_truncate((group.bits() & 0xFFFF) as u16)
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, def: BodyDef) -> BodyId {
        let builder = match def.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let mut builder = builder
            .translation(vector![def.position.x, def.position.y])
            .rotation(def.angle);
        if def.fixed_rotation {
            builder = builder.lock_rotations();
        }

        let handle = self.rigid_body_set.insert(builder.build());
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(id, handle);
        id
    }

    fn create_fixture(&mut self, body: BodyId, def: FixtureDef) -> Option<FixtureId> {
        let parent = *self.bodies.get(&body)?;

        let builder = match def.shape {
            Shape::Edge { a, b } => ColliderBuilder::segment(point![a.x, a.y], point![b.x, b.y]),
            Shape::Box {
                half_extents,
                center,
            } => ColliderBuilder::cuboid(half_extents.x, half_extents.y)
                .translation(vector![center.x, center.y]),
        };
        let collider = builder
            .density(def.density)
            .friction(def.friction)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .restitution(0.0)
            .contact_skin(CONTACT_SKIN)
            .collision_groups(InteractionGroups::new(
                category_to_group(def.category),
                category_to_group(def.mask),
            ))
            .build();

        let handle =
            self.collider_set
                .insert_with_parent(collider, parent, &mut self.rigid_body_set);
        let id = FixtureId(self.next_fixture);
        self.next_fixture += 1;
        self.fixtures.insert(id, handle);
        Some(id)
    }

    fn destroy_body(&mut self, body: BodyId) {
        let Some(handle) = self.bodies.remove(&body) else {
            return;
        };
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        let colliders = &self.collider_set;
        self.fixtures.retain(|_, c| colliders.contains(*c));
    }

    fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    fn step(
        &mut self,
        dt: f32,
        velocity_iterations: u32,
        _position_iterations: u32,
    ) -> Vec<Contact> {
        self.integration_params.dt = dt;
        self.integration_params.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations as usize).unwrap_or(NonZeroUsize::MIN);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        // Forces only last for the step they were applied before.
        for (_, rb) in self.rigid_body_set.iter_mut() {
            rb.reset_forces(false);
        }

        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter_map(|pair| self.convert_pair(pair))
            .collect()
    }

    fn contacts(&self, body: BodyId) -> Vec<Contact> {
        let Some(rb) = self.body(body) else {
            return Vec::new();
        };
        rb.colliders()
            .iter()
            .flat_map(|collider| self.narrow_phase.contact_pairs_with(*collider))
            .filter_map(|pair| self.convert_pair(pair))
            .collect()
    }

    fn position(&self, body: BodyId) -> Option<Vec2> {
        self.body(body).map(|rb| {
            let t = rb.translation();
            Vec2::new(t.x, t.y)
        })
    }

    fn linear_velocity(&self, body: BodyId) -> Option<Vec2> {
        self.body(body).map(|rb| {
            let v = rb.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    fn set_position(&mut self, body: BodyId, position: Vec2) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_translation(vector![position.x, position.y], true);
        }
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec2) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2) {
        if let Some(rb) = self.body_mut(body) {
            rb.apply_impulse_at_point(vector![impulse.x, impulse.y], point![point.x, point.y], true);
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec2, point: Vec2) {
        if let Some(rb) = self.body_mut(body) {
            rb.add_force_at_point(vector![force.x, force.y], point![point.x, point.y], true);
        }
    }

    fn set_friction(&mut self, fixture: FixtureId, friction: f32) {
        if let Some(collider) = self
            .fixtures
            .get(&fixture)
            .and_then(|h| self.collider_set.get_mut(*h))
        {
            collider.set_friction(friction);
        }
    }

    fn set_collision_mask(&mut self, fixture: FixtureId, mask: CategoryBits) {
        if let Some(collider) = self
            .fixtures
            .get(&fixture)
            .and_then(|h| self.collider_set.get_mut(*h))
        {
            let memberships = collider.collision_groups().memberships;
            collider.set_collision_groups(InteractionGroups::new(
                memberships,
                category_to_group(mask),
            ));
        }
    }

    fn reset_contact_friction(&mut self, body: BodyId) {
        // rapier mixes friction from the colliders on every step, so waking
        // the body is enough for new coefficients to reach its contacts.
        if let Some(rb) = self.body_mut(body) {
            rb.wake_up(true);
        }
    }
}

impl Drop for RapierWorld {
    fn drop(&mut self) {
        log::debug!(
            "Releasing physics world ({} bodies)",
            self.rigid_body_set.len()
        );
    }
}
