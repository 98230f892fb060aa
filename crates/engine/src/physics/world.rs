use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rapier2d::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::app::{DebugShape, Vec2};

use super::{BodyDef, BodyKind, CollisionFilter, Contact, ContactPhase, FixtureDef, FixtureTag, Shape};

static EVENT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_event_lock_poison_once() {
    if EVENT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!("physics event lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("rigid body {0:?} does not exist")]
    UnknownBody(BodyHandle),
    #[error("invalid shape dimensions")]
    InvalidShape,
}

#[derive(Default)]
struct CollisionCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionCollector {
    fn take(&self) -> Vec<CollisionEvent> {
        match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => {
                warn_event_lock_poison_once();
                std::mem::take(&mut *poisoned.into_inner())
            }
        }
    }
}

impl EventHandler for CollisionCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => {
                warn_event_lock_poison_once();
                poisoned.into_inner().push(event);
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Rigid-body world over rapier2d with Box2D-style fixture tags and
/// begin/end contact reporting.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collector: CollisionCollector,
    tags: HashMap<ColliderHandle, FixtureTag>,
    // Colliders of destroyed bodies stay resolvable until the next step has
    // reported their final contact ends.
    retired: Vec<ColliderHandle>,
    contacts: Vec<Contact>,
    step_count: u64,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, time_step: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: time_step,
            ..IntegrationParameters::default()
        };
        Self {
            gravity: vector![gravity.x, gravity.y],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collector: CollisionCollector::default(),
            tags: HashMap::new(),
            retired: Vec::new(),
            contacts: Vec::new(),
            step_count: 0,
        }
    }

    pub fn time_step(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let builder = match def.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
        };
        let mut builder = builder
            .translation(vector![def.position.x, def.position.y])
            .gravity_scale(def.gravity_scale)
            .linear_damping(def.linear_damping)
            .ccd_enabled(def.bullet)
            .enabled(def.enabled);
        if def.fixed_rotation {
            builder = builder.lock_rotations();
        }
        BodyHandle(self.bodies.insert(builder.build()))
    }

    pub fn attach_fixture(
        &mut self,
        body: BodyHandle,
        def: &FixtureDef,
    ) -> Result<(), PhysicsError> {
        if !self.bodies.contains(body.0) {
            return Err(PhysicsError::UnknownBody(body));
        }
        let builder = match def.shape {
            Shape::Box {
                half_width,
                half_height,
                offset,
            } => {
                if !(half_width > 0.0 && half_height > 0.0) {
                    return Err(PhysicsError::InvalidShape);
                }
                ColliderBuilder::cuboid(half_width, half_height)
                    .translation(vector![offset.x, offset.y])
            }
            Shape::Segment { a, b } => {
                ColliderBuilder::segment(point![a.x, a.y], point![b.x, b.y])
            }
            Shape::Circle { radius, offset } => {
                if !(radius > 0.0) {
                    return Err(PhysicsError::InvalidShape);
                }
                ColliderBuilder::ball(radius).translation(vector![offset.x, offset.y])
            }
        };
        let collider = builder
            .sensor(def.sensor)
            .density(def.density)
            .friction(def.friction)
            .restitution(def.restitution)
            .collision_groups(interaction_groups(def.filter))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(def.tag.to_user_data())
            .build();
        let handle = self
            .colliders
            .insert_with_parent(collider, body.0, &mut self.bodies);
        self.tags.insert(handle, def.tag);
        Ok(())
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains(body.0)
    }

    pub fn destroy_body(&mut self, body: BodyHandle) -> bool {
        let Some(rigid_body) = self.bodies.get(body.0) else {
            return false;
        };
        self.retired.extend(rigid_body.colliders().iter().copied());
        self.bodies.remove(
            body.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    pub fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.0).map(|rb| {
            let translation = rb.translation();
            Vec2 {
                x: translation.x,
                y: translation.y,
            }
        })
    }

    pub fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.0) {
            rb.set_translation(vector![position.x, position.y], true);
        }
    }

    pub fn linear_velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.0).map(|rb| {
            let linvel = rb.linvel();
            Vec2 {
                x: linvel.x,
                y: linvel.y,
            }
        })
    }

    pub fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.0) {
            rb.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    pub fn apply_linear_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.0) {
            rb.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    pub fn mass(&self, body: BodyHandle) -> f32 {
        self.bodies.get(body.0).map(|rb| rb.mass()).unwrap_or(0.0)
    }

    pub fn set_gravity_scale(&mut self, body: BodyHandle, scale: f32) {
        if let Some(rb) = self.bodies.get_mut(body.0) {
            rb.set_gravity_scale(scale, true);
        }
    }

    pub fn is_enabled(&self, body: BodyHandle) -> bool {
        self.bodies.get(body.0).is_some_and(|rb| rb.is_enabled())
    }

    pub fn set_enabled(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(rb) = self.bodies.get_mut(body.0) {
            if rb.is_enabled() != enabled {
                rb.set_enabled(enabled);
            }
        }
    }

    /// Replaces the filter on every fixture of `body`.
    pub fn set_body_filter(&mut self, body: BodyHandle, filter: CollisionFilter) {
        let Some(rb) = self.bodies.get_mut(body.0) else {
            return;
        };
        rb.wake_up(true);
        for handle in rb.colliders() {
            if let Some(collider) = self.colliders.get_mut(*handle) {
                collider.set_collision_groups(interaction_groups(filter));
            }
        }
    }

    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.collector,
        );
        self.step_count = self.step_count.saturating_add(1);

        for event in self.collector.take() {
            let (first, second, phase) = match event {
                CollisionEvent::Started(a, b, _) => (a, b, ContactPhase::Begin),
                CollisionEvent::Stopped(a, b, _) => (a, b, ContactPhase::End),
            };
            match (self.resolve_tag(first), self.resolve_tag(second)) {
                (Some(a), Some(b)) => self.contacts.push(Contact { phase, a, b }),
                _ => debug!(?phase, "physics_contact_unresolved"),
            }
        }

        for handle in self.retired.drain(..) {
            self.tags.remove(&handle);
        }
    }

    pub fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    pub fn debug_shapes(&self) -> Vec<DebugShape> {
        self.colliders
            .iter()
            .filter(|(_, collider)| collider.is_enabled())
            .filter(|(_, collider)| {
                collider
                    .parent()
                    .and_then(|parent| self.bodies.get(parent))
                    .map_or(true, |rb| rb.is_enabled())
            })
            .map(|(_, collider)| {
                let aabb = collider.compute_aabb();
                DebugShape {
                    min: Vec2 {
                        x: aabb.mins.x,
                        y: aabb.mins.y,
                    },
                    max: Vec2 {
                        x: aabb.maxs.x,
                        y: aabb.maxs.y,
                    },
                    sensor: collider.is_sensor(),
                }
            })
            .collect()
    }

    fn resolve_tag(&self, handle: ColliderHandle) -> Option<FixtureTag> {
        self.tags.get(&handle).copied().or_else(|| {
            self.colliders
                .get(handle)
                .map(|collider| FixtureTag::from_user_data(collider.user_data))
        })
    }
}

fn interaction_groups(filter: CollisionFilter) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(filter.category),
        Group::from_bits_truncate(filter.mask),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUND: u32 = 0b0001;
    const BOX: u32 = 0b0010;
    const PICKUP: u32 = 0b0100;

    const ROLE_GROUND: u32 = 1;
    const ROLE_BOX: u32 = 2;
    const ROLE_PICKUP: u32 = 3;

    fn world_with_ground() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(Vec2 { x: 0.0, y: -10.0 }, 1.0 / 60.0);
        let ground = world.create_body(&BodyDef::default());
        world
            .attach_fixture(
                ground,
                &FixtureDef::solid(
                    Shape::centered_box(10.0, 0.5),
                    CollisionFilter::new(GROUND, BOX),
                    FixtureTag::new(0, ROLE_GROUND),
                ),
            )
            .expect("ground fixture");
        world
    }

    fn drop_box(world: &mut PhysicsWorld, owner: u64, y: f32) -> BodyHandle {
        let body = world.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position: Vec2 { x: 0.0, y },
            ..BodyDef::default()
        });
        world
            .attach_fixture(
                body,
                &FixtureDef::solid(
                    Shape::centered_box(0.25, 0.25),
                    CollisionFilter::new(BOX, GROUND | PICKUP),
                    FixtureTag::new(owner, ROLE_BOX),
                ),
            )
            .expect("box fixture");
        body
    }

    fn step_n(world: &mut PhysicsWorld, steps: usize) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for _ in 0..steps {
            world.step();
            contacts.extend(world.drain_contacts());
        }
        contacts
    }

    #[test]
    fn dynamic_body_falls_under_gravity() {
        let mut world = world_with_ground();
        let body = drop_box(&mut world, 7, 5.0);
        step_n(&mut world, 30);
        let position = world.position(body).expect("position");
        assert!(position.y < 5.0);
        assert!(world.linear_velocity(body).expect("velocity").y < 0.0);
    }

    #[test]
    fn landing_reports_begin_contact_with_tags() {
        let mut world = world_with_ground();
        drop_box(&mut world, 7, 1.5);
        let contacts = step_n(&mut world, 120);
        let landed = contacts
            .iter()
            .find_map(|contact| {
                contact
                    .match_roles(ROLE_BOX, ROLE_GROUND)
                    .filter(|_| contact.is_begin())
            })
            .expect("box lands on ground");
        assert_eq!(landed.0.owner, 7);
    }

    #[test]
    fn destroyed_body_reports_end_contact_with_resolved_tags() {
        let mut world = world_with_ground();
        let body = drop_box(&mut world, 11, 1.0);
        step_n(&mut world, 120);

        assert!(world.destroy_body(body));
        assert!(!world.destroy_body(body));
        let contacts = step_n(&mut world, 2);
        assert!(contacts.iter().any(|contact| {
            contact.phase == ContactPhase::End
                && contact
                    .match_roles(ROLE_BOX, ROLE_GROUND)
                    .is_some_and(|(owner, _)| owner.owner == 11)
        }));
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn disabled_body_does_not_move_until_enabled() {
        let mut world = world_with_ground();
        let body = world.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position: Vec2 { x: 2.0, y: 4.0 },
            enabled: false,
            ..BodyDef::default()
        });
        world
            .attach_fixture(
                body,
                &FixtureDef::solid(
                    Shape::centered_box(0.2, 0.2),
                    CollisionFilter::new(BOX, GROUND),
                    FixtureTag::new(2, ROLE_BOX),
                ),
            )
            .expect("fixture");

        step_n(&mut world, 20);
        assert!(!world.is_enabled(body));
        assert_eq!(world.position(body).expect("position").y, 4.0);

        world.set_enabled(body, true);
        step_n(&mut world, 20);
        assert!(world.position(body).expect("position").y < 4.0);
    }

    #[test]
    fn sensor_overlap_reports_begin_without_blocking() {
        let mut world = world_with_ground();
        let pickup = world.create_body(&BodyDef {
            position: Vec2 { x: 0.0, y: 1.0 },
            ..BodyDef::default()
        });
        world
            .attach_fixture(
                pickup,
                &FixtureDef::sensor(
                    Shape::centered_box(0.3, 0.3),
                    CollisionFilter::new(PICKUP, BOX),
                    FixtureTag::new(5, ROLE_PICKUP),
                ),
            )
            .expect("sensor");
        let body = drop_box(&mut world, 8, 2.5);

        let contacts = step_n(&mut world, 120);
        assert!(contacts
            .iter()
            .any(|contact| contact.is_begin()
                && contact.match_roles(ROLE_PICKUP, ROLE_BOX).is_some()));
        assert!(world.position(body).expect("position").y < 1.0);
    }

    #[test]
    fn filter_change_lets_body_fall_through_ground() {
        let mut world = world_with_ground();
        let body = drop_box(&mut world, 3, 1.0);
        step_n(&mut world, 90);
        let resting = world.position(body).expect("position").y;
        assert!(resting > 0.0);

        world.set_body_filter(body, CollisionFilter::NONE);
        step_n(&mut world, 90);
        assert!(world.position(body).expect("position").y < 0.0);
    }

    #[test]
    fn impulse_and_velocity_are_applied() {
        let mut world = PhysicsWorld::new(Vec2::default(), 1.0 / 60.0);
        let body = drop_box(&mut world, 1, 0.0);
        world.set_linear_velocity(body, Vec2 { x: 2.0, y: 0.0 });
        world.step();
        assert!((world.linear_velocity(body).expect("velocity").x - 2.0).abs() < 1.0e-4);

        let mass = world.mass(body);
        assert!(mass > 0.0);
        world.apply_linear_impulse(body, Vec2 { x: mass, y: 0.0 });
        let velocity = world.linear_velocity(body).expect("velocity");
        assert!((velocity.x - 3.0).abs() < 1.0e-3);
    }

    #[test]
    fn attach_to_missing_body_errors() {
        let mut world = world_with_ground();
        let body = drop_box(&mut world, 1, 3.0);
        world.destroy_body(body);
        let result = world.attach_fixture(
            body,
            &FixtureDef::solid(
                Shape::centered_box(0.1, 0.1),
                CollisionFilter::new(BOX, GROUND),
                FixtureTag::new(1, ROLE_BOX),
            ),
        );
        assert_eq!(result, Err(PhysicsError::UnknownBody(body)));
    }

    #[test]
    fn debug_shapes_cover_enabled_colliders() {
        let mut world = world_with_ground();
        drop_box(&mut world, 1, 3.0);
        let shapes = world.debug_shapes();
        assert_eq!(shapes.len(), 2);
        assert!(shapes
            .iter()
            .any(|shape| (shape.max.x - shape.min.x - 20.0).abs() < 1.0e-3));
    }
}
