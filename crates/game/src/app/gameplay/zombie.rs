const ZOMBIE_SPEED: f32 = 1.0;
/// Detection sensor reach beyond the body on each side.
const ZOMBIE_SENSOR_EXTRA_WIDTH: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZombieVariant {
    Male,
    Female,
}

impl ZombieVariant {
    /// Map object `type`; anything but "female" is a male zombie.
    fn from_kind(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("female") {
            Self::Female
        } else {
            Self::Male
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    fn half_extents(self) -> (f32, f32) {
        match self {
            Self::Male => (0.39, 0.53),
            Self::Female => (0.48, 0.56),
        }
    }

    fn size(self, dead: bool) -> (f32, f32) {
        match (self, dead) {
            (Self::Male, false) => (1.38, 1.66),
            (Self::Male, true) => (2.02, 1.68),
            (Self::Female, false) => (1.56, 1.72),
            (Self::Female, true) => (2.06, 1.88),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZombieState {
    Idle,
    Walk,
    Dead,
    Attack,
}

impl ZombieState {
    fn animation(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Dead => "dead",
            Self::Attack => "attack",
        }
    }

    fn looping(self) -> bool {
        self != Self::Dead
    }
}

#[derive(Debug)]
struct Zombie {
    core: ActorCore,
    variant: ZombieVariant,
    state: ZombieState,
    walk: bool,
    attacking: bool,
    dead: bool,
    reverse_pending: bool,
    time_left_to_destroy: f32,
    animations: [String; 4],
}

impl Zombie {
    fn spawn(
        id: u64,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        variant: ZombieVariant,
        position: Vec2,
    ) -> Result<Self, PhysicsError> {
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position,
            enabled: false,
            ..BodyDef::default()
        });
        let (half_width, half_height) = variant.half_extents();
        physics.attach_fixture(
            body,
            &FixtureDef::solid(
                Shape::centered_box(half_width, half_height),
                CollisionFilter::new(
                    category::ENEMY,
                    category::GROUND
                        | category::CRATE
                        | category::BOUNDARY
                        | category::PLAYER_ATTACK
                        | category::KUNAI,
                ),
                FixtureRole::ZombieBody.tag(id),
            )
            .with_friction(0.0),
        )?;
        physics.attach_fixture(
            body,
            &FixtureDef::sensor(
                Shape::centered_box(half_width + ZOMBIE_SENSOR_EXTRA_WIDTH, half_height),
                CollisionFilter::new(category::ENEMY_SENSOR, category::PLAYER),
                FixtureRole::ZombieSensor.tag(id),
            ),
        )?;

        let animations = [
            ZombieState::Idle,
            ZombieState::Walk,
            ZombieState::Dead,
            ZombieState::Attack,
        ]
        .map(|state| format!("{}_{}", variant.prefix(), state.animation()));
        let state = ZombieState::Walk;
        let sprite = spawn_actor_sprite(
            world,
            assets.frame(ZOMBIE_ATLAS, &animations[1], 0.0, true),
            [90, 160, 80, 255],
        );
        let (width, height) = variant.size(false);
        let mut core = ActorCore::new(id, body, sprite, width, height);
        core.running_right = false;
        core.place_at_body(physics);
        core.publish(world, None);

        Ok(Self {
            core,
            variant,
            state,
            walk: true,
            attacking: false,
            dead: false,
            reverse_pending: false,
            time_left_to_destroy: ENEMY_DEATH_DELAY_SECONDS,
            animations,
        })
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn killed(&mut self, physics: &mut PhysicsWorld) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.walk = false;
        self.attacking = false;
        physics.set_body_filter(
            self.core.body,
            CollisionFilter::new(category::ENEMY, category::GROUND),
        );
        let velocity = self.core.velocity(physics);
        physics.set_linear_velocity(self.core.body, Vec2::new(0.0, velocity.y));
        debug!(zombie = self.core.id, "zombie_killed");
    }

    /// Player entered the detection sensor: stop and strike.
    fn attack(
        &mut self,
        player: &mut Player,
        physics: &mut PhysicsWorld,
        values: &mut ValueManager,
    ) {
        if self.dead || player.is_dead() {
            return;
        }
        self.attacking = true;
        self.walk = false;
        let velocity = self.core.velocity(physics);
        physics.set_linear_velocity(self.core.body, Vec2::new(0.0, velocity.y));
        player.die(physics, values);
    }

    fn stop_attack(&mut self) {
        if self.dead {
            return;
        }
        self.attacking = false;
        self.walk = true;
    }

    fn reverse(&mut self) {
        self.reverse_pending = true;
    }

    fn update(&mut self, dt: f32, frame: &mut Frame<'_>) {
        if self.core.is_destroyed() {
            return;
        }
        if self.dead && self.core.is_alive() {
            self.time_left_to_destroy -= dt;
            if self.time_left_to_destroy < 0.0 {
                self.core.queue_destroy();
                frame.values.add_score(SCORE_ZOMBIE);
                let center = self.core.position(frame.physics);
                frame.indicators.add(center, SCORE_ZOMBIE);
            }
        }
        if self.core.settle_lifecycle(frame.physics, frame.world) {
            return;
        }
        if !self.core.is_active(frame.physics) {
            return;
        }

        let velocity = self.core.velocity(frame.physics);
        let state = self.derive_state(velocity);
        let changed = state != self.state;
        self.state = state;
        let (width, height) = self.variant.size(self.dead);
        self.core.set_size(width, height);
        self.core.place_at_body(frame.physics);

        let key_time = if changed { 0.0 } else { self.core.state_timer };
        let region = frame.assets.frame(
            ZOMBIE_ATLAS,
            &self.animations[state as usize],
            key_time,
            state.looping(),
        );
        self.core.face_by_velocity(velocity.x);
        if self.walk && !self.attacking {
            self.walking(frame.physics, velocity);
        }
        self.core.advance_state_timer(changed, dt);
        self.core.publish(frame.world, region);
    }

    fn walking(&mut self, physics: &mut PhysicsWorld, velocity: Vec2) {
        if std::mem::take(&mut self.reverse_pending) {
            self.core.running_right = !self.core.running_right;
        }
        let vx = if self.core.running_right {
            ZOMBIE_SPEED
        } else {
            -ZOMBIE_SPEED
        };
        physics.set_linear_velocity(self.core.body, Vec2::new(vx, velocity.y));
    }

    fn derive_state(&self, velocity: Vec2) -> ZombieState {
        if self.dead {
            ZombieState::Dead
        } else if velocity.x != 0.0 {
            ZombieState::Walk
        } else if self.attacking {
            ZombieState::Attack
        } else {
            ZombieState::Idle
        }
    }
}
