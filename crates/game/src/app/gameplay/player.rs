const PLAYER_HALF_WIDTH: f32 = 0.28;
const PLAYER_HALF_HEIGHT: f32 = 0.5;
const PLAYER_MAX_RUN_SPEED: f32 = 3.0;
/// Velocity gained per tick of held run input.
const PLAYER_RUN_ACCELERATION: f32 = 0.25;
const PLAYER_JUMP_SPEED: f32 = 6.0;
const PLAYER_GLIDE_FALL_SPEED: f32 = -1.0;
const PLAYER_CLIMB_SPEED: f32 = 2.0;
const PLAYER_DEATH_BOUNCE: f32 = 4.0;
const PLAYER_SLIDE_MIN_SPEED: f32 = 1.0;
const PLAYER_ATTACK_REACH: f32 = 0.6;
const PLAYER_ATTACK_HALF_WIDTH: f32 = 0.32;
const KUNAI_COOLDOWN_SECONDS: f32 = 0.5;
const MOVING_EPSILON: f32 = 0.1;
const AIRBORNE_SPEED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerState {
    Idle,
    Running,
    Jumping,
    Falling,
    Gliding,
    Attacking,
    Throwing,
    JumpAttack,
    JumpThrow,
    Sliding,
    Climbing,
    Dead,
}

impl PlayerState {
    fn animation(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "run",
            Self::Jumping | Self::Falling => "jump",
            Self::Gliding => "glide",
            Self::Attacking => "attack",
            Self::Throwing => "throw",
            Self::JumpAttack => "jump_attack",
            Self::JumpThrow => "jump_throw",
            Self::Sliding => "slide",
            Self::Climbing => "climb",
            Self::Dead => "dead",
        }
    }

    fn looping(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Running | Self::Gliding | Self::Climbing
        )
    }

    fn size(self) -> (f32, f32) {
        match self {
            Self::Idle => (0.58, 1.1),
            Self::Running | Self::Jumping | Self::Falling => (0.72, 1.1),
            Self::Gliding => (0.9, 1.1),
            Self::Attacking | Self::JumpAttack => (1.0, 1.1),
            Self::Throwing | Self::JumpThrow => (0.74, 1.1),
            Self::Sliding => (0.76, 0.9),
            Self::Climbing => (0.6, 1.1),
            Self::Dead => (1.1, 1.1),
        }
    }
}

/// One-shot moves that run for their animation's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerAction {
    Attack,
    Throw,
    JumpAttack,
    JumpThrow,
    Slide,
}

impl PlayerAction {
    fn state(self) -> PlayerState {
        match self {
            Self::Attack => PlayerState::Attacking,
            Self::Throw => PlayerState::Throwing,
            Self::JumpAttack => PlayerState::JumpAttack,
            Self::JumpThrow => PlayerState::JumpThrow,
            Self::Slide => PlayerState::Sliding,
        }
    }

    fn is_melee(self) -> bool {
        matches!(self, Self::Attack | Self::JumpAttack)
    }
}

/// A fixture touching one of the player's attack sensors.
type AttackTarget = (FixtureRole, u64);

#[derive(Debug)]
struct Player {
    core: ActorCore,
    atlas: &'static str,
    state: PlayerState,
    foot_contacts: u32,
    ladder_contacts: u32,
    attack_left: Vec<AttackTarget>,
    attack_right: Vec<AttackTarget>,
    struck: Vec<AttackTarget>,
    action: Option<PlayerAction>,
    action_time_left: f32,
    dead: bool,
    gliding: bool,
    climb_requested: bool,
    gravity_suspended: bool,
    feather_time_left: f32,
    kunai_cooldown: f32,
}

impl Player {
    fn spawn(
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        character: Character,
        position: Vec2,
    ) -> Result<Self, PhysicsError> {
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position,
            ..BodyDef::default()
        });
        let body_filter = CollisionFilter::new(
            category::PLAYER,
            category::GROUND
                | category::CRATE
                | category::COIN
                | category::FEATHER
                | category::ENEMY
                | category::ENEMY_SENSOR
                | category::BULLET
                | category::LADDER,
        );
        physics.attach_fixture(
            body,
            &FixtureDef::solid(
                Shape::centered_box(PLAYER_HALF_WIDTH, PLAYER_HALF_HEIGHT),
                body_filter,
                FixtureRole::PlayerBody.tag(PLAYER_ID),
            )
            .with_friction(0.2),
        )?;
        physics.attach_fixture(
            body,
            &FixtureDef::sensor(
                Shape::Box {
                    half_width: PLAYER_HALF_WIDTH * 0.8,
                    half_height: 0.05,
                    offset: Vec2::new(0.0, -PLAYER_HALF_HEIGHT),
                },
                CollisionFilter::new(category::PLAYER_FOOT, category::GROUND | category::CRATE),
                FixtureRole::PlayerFoot.tag(PLAYER_ID),
            ),
        )?;
        let attack_filter =
            CollisionFilter::new(category::PLAYER_ATTACK, category::ENEMY | category::CRATE);
        for (role, side) in [
            (FixtureRole::PlayerAttackLeft, -1.0),
            (FixtureRole::PlayerAttackRight, 1.0),
        ] {
            physics.attach_fixture(
                body,
                &FixtureDef::sensor(
                    Shape::Box {
                        half_width: PLAYER_ATTACK_HALF_WIDTH,
                        half_height: PLAYER_HALF_HEIGHT * 0.8,
                        offset: Vec2::new(side * PLAYER_ATTACK_REACH, 0.0),
                    },
                    attack_filter,
                    role.tag(PLAYER_ID),
                ),
            )?;
        }

        let atlas = character.atlas();
        let state = PlayerState::Idle;
        let sprite = spawn_actor_sprite(
            world,
            assets.frame(atlas, state.animation(), 0.0, true),
            [230, 120, 40, 255],
        );
        let (width, height) = state.size();
        let mut core = ActorCore::new(PLAYER_ID, body, sprite, width, height);
        core.place_at_body(physics);
        core.publish(world, None);
        info!(?character, x = position.x, y = position.y, "player_spawned");

        Ok(Self {
            core,
            atlas,
            state,
            foot_contacts: 0,
            ladder_contacts: 0,
            attack_left: Vec::new(),
            attack_right: Vec::new(),
            struck: Vec::new(),
            action: None,
            action_time_left: 0.0,
            dead: false,
            gliding: false,
            climb_requested: false,
            gravity_suspended: false,
            feather_time_left: 0.0,
            kunai_cooldown: 0.0,
        })
    }

    /// Drops the body and sprite ahead of a respawn.
    fn remove(&mut self, physics: &mut PhysicsWorld, world: &mut SceneWorld) {
        self.core.queue_destroy();
        self.core.settle_lifecycle(physics, world);
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn is_grounded(&self) -> bool {
        self.foot_contacts > 0
    }

    fn position(&self, physics: &PhysicsWorld) -> Vec2 {
        self.core.position(physics)
    }

    fn is_falling(&self, physics: &PhysicsWorld) -> bool {
        self.position(physics).y < FALL_DEATH_Y
    }

    fn has_feather(&self) -> bool {
        self.feather_time_left > 0.0
    }

    fn grant_feather(&mut self) {
        self.feather_time_left = FEATHER_POWERUP_SECONDS;
    }

    fn left(&mut self, physics: &mut PhysicsWorld) {
        self.run(physics, -1.0);
    }

    fn right(&mut self, physics: &mut PhysicsWorld) {
        self.run(physics, 1.0);
    }

    fn run(&mut self, physics: &mut PhysicsWorld, direction: f32) {
        if self.dead {
            return;
        }
        let velocity = self.core.velocity(physics);
        if velocity.x * direction < PLAYER_MAX_RUN_SPEED {
            let mass = physics.mass(self.core.body);
            physics.apply_linear_impulse(
                self.core.body,
                Vec2::new(direction * PLAYER_RUN_ACCELERATION * mass, 0.0),
            );
        }
    }

    /// Called every tick jump is held: jumps while grounded, glides while
    /// falling with the feather.
    fn jump(&mut self, physics: &mut PhysicsWorld) {
        if self.dead {
            return;
        }
        let velocity = self.core.velocity(physics);
        if self.is_grounded() {
            if self.action != Some(PlayerAction::Slide) {
                physics.set_linear_velocity(
                    self.core.body,
                    Vec2::new(velocity.x, PLAYER_JUMP_SPEED),
                );
            }
        } else if self.has_feather() && velocity.y < 0.0 {
            self.gliding = true;
            physics.set_linear_velocity(
                self.core.body,
                Vec2::new(velocity.x, velocity.y.max(PLAYER_GLIDE_FALL_SPEED)),
            );
        }
    }

    fn down(&mut self, physics: &PhysicsWorld, assets: &GameAssets) {
        if self.dead || self.action.is_some() || !self.is_grounded() {
            return;
        }
        if self.core.velocity(physics).x.abs() > PLAYER_SLIDE_MIN_SPEED {
            self.start_action(PlayerAction::Slide, assets);
        }
    }

    fn attack(&mut self, assets: &GameAssets) {
        if self.dead || self.action.is_some() {
            return;
        }
        let action = if self.is_grounded() {
            PlayerAction::Attack
        } else {
            PlayerAction::JumpAttack
        };
        self.struck.clear();
        self.start_action(action, assets);
    }

    fn attack_throw(
        &mut self,
        physics: &PhysicsWorld,
        assets: &GameAssets,
        spawns: &mut Vec<ProjectileSpawn>,
    ) {
        if self.is_grounded() {
            self.throw(PlayerAction::Throw, physics, assets, spawns);
        }
    }

    fn jump_throw(
        &mut self,
        physics: &PhysicsWorld,
        assets: &GameAssets,
        spawns: &mut Vec<ProjectileSpawn>,
    ) {
        if !self.is_grounded() {
            self.throw(PlayerAction::JumpThrow, physics, assets, spawns);
        }
    }

    fn throw(
        &mut self,
        action: PlayerAction,
        physics: &PhysicsWorld,
        assets: &GameAssets,
        spawns: &mut Vec<ProjectileSpawn>,
    ) {
        if self.dead || self.action.is_some() || self.kunai_cooldown > 0.0 {
            return;
        }
        self.start_action(action, assets);
        self.kunai_cooldown = KUNAI_COOLDOWN_SECONDS;
        let center = self.position(physics);
        let direction = if self.core.running_right { 1.0 } else { -1.0 };
        spawns.push(ProjectileSpawn {
            kind: ProjectileKind::Kunai,
            origin: Vec2::new(center.x + direction * 0.5, center.y + 0.1),
            right: self.core.running_right,
        });
    }

    fn climb(&mut self, physics: &mut PhysicsWorld) {
        if self.dead || self.ladder_contacts == 0 {
            return;
        }
        self.climb_requested = true;
        if !self.gravity_suspended {
            physics.set_gravity_scale(self.core.body, 0.0);
            self.gravity_suspended = true;
        }
        let velocity = self.core.velocity(physics);
        physics.set_linear_velocity(self.core.body, Vec2::new(velocity.x, PLAYER_CLIMB_SPEED));
    }

    fn start_action(&mut self, action: PlayerAction, assets: &GameAssets) {
        self.action = Some(action);
        self.action_time_left = assets.animation_duration(self.atlas, action.state().animation());
    }

    /// Dies once: loses a life, bounces up and stops colliding with anything.
    fn die(&mut self, physics: &mut PhysicsWorld, values: &mut ValueManager) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.action = None;
        self.gliding = false;
        values.lose_life();
        physics.set_body_filter(self.core.body, CollisionFilter::NONE);
        physics.set_gravity_scale(self.core.body, 1.0);
        self.gravity_suspended = false;
        physics.set_linear_velocity(self.core.body, Vec2::new(0.0, PLAYER_DEATH_BOUNCE));
        info!(lives = values.lives, "player_died");
    }

    fn track_attack_target(&mut self, right_side: bool, target: AttackTarget, begin: bool) {
        let side = if right_side {
            &mut self.attack_right
        } else {
            &mut self.attack_left
        };
        if begin {
            if !side.contains(&target) {
                side.push(target);
            }
        } else {
            side.retain(|existing| *existing != target);
        }
    }

    /// Facing-side targets not yet hit by the current melee swing.
    fn take_melee_targets(&mut self) -> Vec<AttackTarget> {
        if self.dead || !self.action.is_some_and(PlayerAction::is_melee) {
            return Vec::new();
        }
        let side = if self.core.running_right {
            &self.attack_right
        } else {
            &self.attack_left
        };
        let fresh: Vec<AttackTarget> = side
            .iter()
            .copied()
            .filter(|target| !self.struck.contains(target))
            .collect();
        self.struck.extend(fresh.iter().copied());
        fresh
    }

    fn update(
        &mut self,
        dt: f32,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
    ) {
        if self.core.settle_lifecycle(physics, world) {
            return;
        }
        self.feather_time_left = (self.feather_time_left - dt).max(0.0);
        self.kunai_cooldown = (self.kunai_cooldown - dt).max(0.0);
        if self.action.is_some() {
            self.action_time_left -= dt;
            if self.action_time_left <= 0.0 {
                self.action = None;
            }
        }
        if !self.climb_requested && self.gravity_suspended {
            physics.set_gravity_scale(self.core.body, 1.0);
            self.gravity_suspended = false;
        }

        let velocity = self.core.velocity(physics);
        let state = self.derive_state(velocity);
        let changed = state != self.state;
        self.state = state;

        let (width, height) = state.size();
        self.core.set_size(width, height);
        self.core.place_at_body(physics);
        let key_time = if state == PlayerState::Falling {
            assets.animation_duration(self.atlas, state.animation())
        } else if changed {
            0.0
        } else {
            self.core.state_timer
        };
        let region = assets.frame(self.atlas, state.animation(), key_time, state.looping());
        if !self.dead {
            self.core.face_by_velocity(velocity.x);
        }
        self.core.advance_state_timer(changed, dt);
        self.core.publish(world, region);

        self.gliding = false;
        self.climb_requested = false;
    }

    fn derive_state(&self, velocity: Vec2) -> PlayerState {
        if self.dead {
            return PlayerState::Dead;
        }
        if self.climb_requested && self.ladder_contacts > 0 {
            return PlayerState::Climbing;
        }
        if let Some(action) = self.action {
            return action.state();
        }
        if self.gliding {
            PlayerState::Gliding
        } else if velocity.y > AIRBORNE_SPEED {
            PlayerState::Jumping
        } else if velocity.y < -AIRBORNE_SPEED && !self.is_grounded() {
            PlayerState::Falling
        } else if velocity.x.abs() > MOVING_EPSILON {
            PlayerState::Running
        } else {
            PlayerState::Idle
        }
    }
}
