mod stepper;
mod world;

use crate::app::Vec2;

pub use stepper::{FixedStepper, MAX_FRAME_DELTA_SECONDS};
pub use world::{BodyHandle, PhysicsError, PhysicsWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    Static,
    Dynamic,
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub fixed_rotation: bool,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    /// Continuous collision detection for fast movers.
    pub bullet: bool,
    pub enabled: bool,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            kind: BodyKind::Static,
            position: Vec2::default(),
            fixed_rotation: true,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            bullet: false,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box {
        half_width: f32,
        half_height: f32,
        offset: Vec2,
    },
    Segment {
        a: Vec2,
        b: Vec2,
    },
    Circle {
        radius: f32,
        offset: Vec2,
    },
}

impl Shape {
    pub fn centered_box(half_width: f32, half_height: f32) -> Self {
        Self::Box {
            half_width,
            half_height,
            offset: Vec2::default(),
        }
    }
}

/// Category/mask bit pair. Two fixtures interact when each one's category
/// is present in the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl CollisionFilter {
    pub const NONE: Self = Self {
        category: 0,
        mask: 0,
    };

    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    pub fn accepts(self, other: Self) -> bool {
        self.mask & other.category != 0 && other.mask & self.category != 0
    }
}

/// Game-defined identity of a fixture, echoed back in contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixtureTag {
    pub owner: u64,
    pub role: u32,
}

impl FixtureTag {
    pub const fn new(owner: u64, role: u32) -> Self {
        Self { owner, role }
    }

    pub(crate) fn to_user_data(self) -> u128 {
        (u128::from(self.role) << 64) | u128::from(self.owner)
    }

    pub(crate) fn from_user_data(raw: u128) -> Self {
        Self {
            owner: raw as u64,
            role: (raw >> 64) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureDef {
    pub shape: Shape,
    pub sensor: bool,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub filter: CollisionFilter,
    pub tag: FixtureTag,
}

impl FixtureDef {
    pub fn solid(shape: Shape, filter: CollisionFilter, tag: FixtureTag) -> Self {
        Self {
            shape,
            sensor: false,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
            filter,
            tag,
        }
    }

    pub fn sensor(shape: Shape, filter: CollisionFilter, tag: FixtureTag) -> Self {
        Self {
            sensor: true,
            density: 0.0,
            ..Self::solid(shape, filter, tag)
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

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub phase: ContactPhase,
    pub a: FixtureTag,
    pub b: FixtureTag,
}

impl Contact {
    /// Returns `(first, second)` ordered to match the requested roles,
    /// regardless of which fixture the engine reported first.
    pub fn match_roles(&self, first: u32, second: u32) -> Option<(FixtureTag, FixtureTag)> {
        if self.a.role == first && self.b.role == second {
            Some((self.a, self.b))
        } else if self.b.role == first && self.a.role == second {
            Some((self.b, self.a))
        } else {
            None
        }
    }

    pub fn is_begin(&self) -> bool {
        self.phase == ContactPhase::Begin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_tag_survives_user_data_packing() {
        let tag = FixtureTag::new(u64::MAX - 3, 0x8000_0001);
        assert_eq!(FixtureTag::from_user_data(tag.to_user_data()), tag);
    }

    #[test]
    fn filter_requires_mutual_acceptance() {
        let player = CollisionFilter::new(0b0010, 0b0001);
        let ground = CollisionFilter::new(0b0001, 0b1111);
        let coin = CollisionFilter::new(0b0100, 0b1000);
        assert!(player.accepts(ground));
        assert!(ground.accepts(player));
        assert!(!player.accepts(coin));
        assert!(!CollisionFilter::NONE.accepts(ground));
    }

    #[test]
    fn match_roles_is_order_insensitive() {
        let contact = Contact {
            phase: ContactPhase::Begin,
            a: FixtureTag::new(9, 2),
            b: FixtureTag::new(4, 7),
        };
        let (first, second) = contact.match_roles(7, 2).expect("pair");
        assert_eq!(first.owner, 4);
        assert_eq!(second.owner, 9);
        assert!(contact.match_roles(7, 7).is_none());
    }
}
