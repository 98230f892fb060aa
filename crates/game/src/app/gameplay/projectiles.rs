const KUNAI_SPEED: f32 = 8.0;
const BULLET_SPEED: f32 = 5.0;
const PROJECTILE_LIFETIME_SECONDS: f32 = 2.0;
const PROJECTILE_HALF_WIDTH: f32 = 0.16;
const PROJECTILE_HALF_HEIGHT: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProjectileKind {
    Kunai,
    Bullet,
}

impl ProjectileKind {
    fn speed(self) -> f32 {
        match self {
            Self::Kunai => KUNAI_SPEED,
            Self::Bullet => BULLET_SPEED,
        }
    }

    fn role(self) -> FixtureRole {
        match self {
            Self::Kunai => FixtureRole::Kunai,
            Self::Bullet => FixtureRole::Bullet,
        }
    }

    fn filter(self) -> CollisionFilter {
        match self {
            Self::Kunai => CollisionFilter::new(
                category::KUNAI,
                category::ENEMY | category::CRATE | category::GROUND,
            ),
            Self::Bullet => CollisionFilter::new(
                category::BULLET,
                category::PLAYER | category::CRATE | category::GROUND,
            ),
        }
    }

    fn region(self, assets: &GameAssets, atlas: &str) -> Option<String> {
        match self {
            Self::Kunai => assets.region(atlas, "kunai"),
            Self::Bullet => assets.region(ROBOT_ATLAS, "bullet"),
        }
    }
}

/// Requested by an actor during its update, created by the scene afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProjectileSpawn {
    kind: ProjectileKind,
    origin: Vec2,
    right: bool,
}

#[derive(Debug)]
struct Projectile {
    core: ActorCore,
    kind: ProjectileKind,
    velocity: Vec2,
    life_left: f32,
}

impl Projectile {
    fn spawn(
        id: u64,
        request: ProjectileSpawn,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        player_atlas: &str,
    ) -> Result<Self, PhysicsError> {
        let direction = if request.right { 1.0 } else { -1.0 };
        let velocity = Vec2::new(direction * request.kind.speed(), 0.0);
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position: request.origin,
            gravity_scale: 0.0,
            bullet: true,
            ..BodyDef::default()
        });
        physics.attach_fixture(
            body,
            &FixtureDef::sensor(
                Shape::centered_box(PROJECTILE_HALF_WIDTH, PROJECTILE_HALF_HEIGHT),
                request.kind.filter(),
                request.kind.role().tag(id),
            )
            .with_density(1.0),
        )?;
        physics.set_linear_velocity(body, velocity);

        let sprite = spawn_actor_sprite(
            world,
            request.kind.region(assets, player_atlas),
            [220, 220, 230, 255],
        );
        let mut core = ActorCore::new(
            id,
            body,
            sprite,
            PROJECTILE_HALF_WIDTH * 2.0,
            PROJECTILE_HALF_HEIGHT * 2.0,
        );
        core.running_right = request.right;
        core.place_at_body(physics);
        core.publish(world, None);
        Ok(Self {
            core,
            kind: request.kind,
            velocity,
            life_left: PROJECTILE_LIFETIME_SECONDS,
        })
    }

    fn is_finished(&self) -> bool {
        self.core.is_destroyed()
    }

    /// Any solid hit or the end of its lifetime removes the projectile.
    fn expire(&mut self) {
        if self.core.is_alive() {
            debug!(projectile = self.core.id, kind = ?self.kind, "projectile_expired");
        }
        self.core.queue_destroy();
    }

    fn is_live(&self) -> bool {
        self.core.is_alive()
    }

    fn update(&mut self, dt: f32, physics: &mut PhysicsWorld, world: &mut SceneWorld) {
        if self.core.is_alive() {
            self.life_left -= dt;
            if self.life_left <= 0.0 {
                self.core.queue_destroy();
            }
        }
        if self.core.settle_lifecycle(physics, world) {
            return;
        }
        physics.set_linear_velocity(self.core.body, self.velocity);
        self.core.place_at_body(physics);
        self.core.publish(world, None);
    }
}
