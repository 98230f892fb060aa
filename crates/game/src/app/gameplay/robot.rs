const ROBOT_HALF_WIDTH: f32 = 0.3;
const ROBOT_HALF_HEIGHT: f32 = 0.45;
const ROBOT_PATROL_SPEED: f32 = 1.5;
const ROBOT_DETECT_X: f32 = 5.0;
const ROBOT_DETECT_Y: f32 = 1.5;
const ROBOT_STAND_TO_SHOOT_RANGE: f32 = 3.0;
const ROBOT_MELEE_RANGE: f32 = 1.0;
const ROBOT_FIRE_INTERVAL_SECONDS: f32 = 1.5;
const ROBOT_SHOT_POSE_SECONDS: f32 = 0.3;
const ROBOT_MELEE_SECONDS: f32 = 0.6;
const ROBOT_MELEE_JUMP_SPEED: f32 = 3.5;
const ROBOT_CRATE_JUMP_SPEED: f32 = 4.5;
const ROBOT_SLIDE_SECONDS: f32 = 0.5;
const ROBOT_KNOCKBACK_SPEED: f32 = 3.0;
const ROBOT_HIT_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RobotState {
    Idle,
    Run,
    Shoot,
    RunShoot,
    Jump,
    JumpShoot,
    JumpMelee,
    Slide,
    Dead,
}

impl RobotState {
    fn animation(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Shoot => "shoot",
            Self::RunShoot => "run_shoot",
            Self::Jump => "jump",
            Self::JumpShoot => "jump_shoot",
            Self::JumpMelee => "jump_melee",
            Self::Slide => "slide",
            Self::Dead => "dead",
        }
    }

    fn looping(self) -> bool {
        matches!(self, Self::Idle | Self::Run | Self::RunShoot)
    }

    fn size(self) -> (f32, f32) {
        match self {
            Self::Dead => (1.4, 1.2),
            Self::Slide => (1.2, 1.0),
            _ => (1.1, 1.1),
        }
    }
}

#[derive(Debug)]
struct Robot {
    core: ActorCore,
    state: RobotState,
    hit_points: u32,
    dead: bool,
    foot_contacts: u32,
    touching_player: bool,
    reverse_pending: bool,
    jump_requested: bool,
    fire_cooldown: f32,
    shot_pose_left: f32,
    melee_left: f32,
    slide_left: f32,
    time_left_to_destroy: f32,
}

impl Robot {
    fn spawn(
        id: u64,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        position: Vec2,
    ) -> Result<Self, PhysicsError> {
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position,
            enabled: false,
            ..BodyDef::default()
        });
        physics.attach_fixture(
            body,
            &FixtureDef::solid(
                Shape::centered_box(ROBOT_HALF_WIDTH, ROBOT_HALF_HEIGHT),
                CollisionFilter::new(
                    category::ENEMY,
                    category::GROUND
                        | category::CRATE
                        | category::BOUNDARY
                        | category::PLAYER
                        | category::PLAYER_ATTACK
                        | category::KUNAI,
                ),
                FixtureRole::RobotBody.tag(id),
            )
            .with_friction(0.0),
        )?;
        physics.attach_fixture(
            body,
            &FixtureDef::sensor(
                Shape::Box {
                    half_width: ROBOT_HALF_WIDTH * 0.8,
                    half_height: 0.05,
                    offset: Vec2::new(0.0, -ROBOT_HALF_HEIGHT),
                },
                CollisionFilter::new(category::ENEMY_FOOT, category::GROUND | category::CRATE),
                FixtureRole::RobotFoot.tag(id),
            ),
        )?;

        let state = RobotState::Run;
        let sprite = spawn_actor_sprite(
            world,
            assets.frame(ROBOT_ATLAS, state.animation(), 0.0, true),
            [120, 140, 200, 255],
        );
        let (width, height) = state.size();
        let mut core = ActorCore::new(id, body, sprite, width, height);
        core.running_right = false;
        core.place_at_body(physics);
        core.publish(world, None);

        Ok(Self {
            core,
            state,
            hit_points: ROBOT_HIT_POINTS,
            dead: false,
            foot_contacts: 0,
            touching_player: false,
            reverse_pending: false,
            jump_requested: false,
            fire_cooldown: 0.0,
            shot_pose_left: 0.0,
            melee_left: 0.0,
            slide_left: 0.0,
            time_left_to_destroy: ENEMY_DEATH_DELAY_SECONDS,
        })
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn is_grounded(&self) -> bool {
        self.foot_contacts > 0
    }

    fn track_ground(&mut self, begin: bool) {
        if begin {
            self.foot_contacts += 1;
        } else {
            self.foot_contacts = self.foot_contacts.saturating_sub(1);
        }
    }

    /// First hit knocks the robot back into a slide, the last one kills it.
    fn hit(&mut self, physics: &mut PhysicsWorld) {
        if self.dead {
            return;
        }
        self.hit_points = self.hit_points.saturating_sub(1);
        let velocity = self.core.velocity(physics);
        if self.hit_points == 0 {
            self.dead = true;
            self.melee_left = 0.0;
            self.shot_pose_left = 0.0;
            physics.set_body_filter(
                self.core.body,
                CollisionFilter::new(category::ENEMY, category::GROUND),
            );
            physics.set_linear_velocity(self.core.body, Vec2::new(0.0, velocity.y));
            debug!(robot = self.core.id, "robot_killed");
        } else {
            self.slide_left = ROBOT_SLIDE_SECONDS;
            self.melee_left = 0.0;
            let away = if self.core.running_right { -1.0 } else { 1.0 };
            physics.set_linear_velocity(
                self.core.body,
                Vec2::new(away * ROBOT_KNOCKBACK_SPEED, velocity.y),
            );
            debug!(robot = self.core.id, hit_points = self.hit_points, "robot_hit");
        }
    }

    fn reverse(&mut self) {
        self.reverse_pending = true;
    }

    fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    fn set_touching_player(&mut self, touching: bool) {
        self.touching_player = touching;
    }

    /// Returns true when the jump-melee connects with the player this tick.
    fn update(&mut self, dt: f32, frame: &mut Frame<'_>, player_target: Option<Vec2>) -> bool {
        if self.core.is_destroyed() {
            return false;
        }
        if self.dead && self.core.is_alive() {
            self.time_left_to_destroy -= dt;
            if self.time_left_to_destroy < 0.0 {
                self.core.queue_destroy();
                frame.values.add_score(SCORE_ROBOT);
                let center = self.core.position(frame.physics);
                frame.indicators.add(center, SCORE_ROBOT);
            }
        }
        if self.core.settle_lifecycle(frame.physics, frame.world) {
            return false;
        }
        if !self.core.is_active(frame.physics) {
            return false;
        }

        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.shot_pose_left = (self.shot_pose_left - dt).max(0.0);
        self.melee_left = (self.melee_left - dt).max(0.0);
        self.slide_left = (self.slide_left - dt).max(0.0);

        let center = self.core.position(frame.physics);
        let mut velocity = self.core.velocity(frame.physics);
        let grounded = self.is_grounded();
        if !self.dead && self.slide_left <= 0.0 {
            velocity = self.drive(center, velocity, grounded, player_target, frame.spawns);
            frame.physics.set_linear_velocity(self.core.body, velocity);
        }
        let struck = !self.dead
            && self.melee_left > 0.0
            && self.touching_player
            && player_target.is_some();

        let state = self.derive_state(velocity, grounded);
        let changed = state != self.state;
        self.state = state;
        let (width, height) = state.size();
        self.core.set_size(width, height);
        self.core.place_at_body(frame.physics);
        let key_time = if changed { 0.0 } else { self.core.state_timer };
        let region = frame
            .assets
            .frame(ROBOT_ATLAS, state.animation(), key_time, state.looping());
        if state != RobotState::Slide {
            self.core.face_by_velocity(velocity.x);
        }
        self.core.advance_state_timer(changed, dt);
        self.core.publish(frame.world, region);
        struck
    }

    /// Patrol or engage; returns the velocity to apply.
    fn drive(
        &mut self,
        center: Vec2,
        velocity: Vec2,
        grounded: bool,
        player_target: Option<Vec2>,
        spawns: &mut Vec<ProjectileSpawn>,
    ) -> Vec2 {
        let mut vy = velocity.y;
        let engaged = player_target.filter(|target| {
            (target.x - center.x).abs() < ROBOT_DETECT_X
                && (target.y - center.y).abs() < ROBOT_DETECT_Y
        });

        let vx = match engaged {
            Some(target) => {
                let dx = target.x - center.x;
                self.core.running_right = dx > 0.0;
                let direction = if self.core.running_right { 1.0 } else { -1.0 };
                if dx.abs() < ROBOT_MELEE_RANGE && self.melee_left <= 0.0 && grounded {
                    self.melee_left = ROBOT_MELEE_SECONDS;
                    vy = ROBOT_MELEE_JUMP_SPEED;
                }
                if self.fire_cooldown <= 0.0 && self.melee_left <= 0.0 {
                    self.fire_cooldown = ROBOT_FIRE_INTERVAL_SECONDS;
                    self.shot_pose_left = ROBOT_SHOT_POSE_SECONDS;
                    spawns.push(ProjectileSpawn {
                        kind: ProjectileKind::Bullet,
                        origin: Vec2::new(center.x + direction * 0.5, center.y + 0.1),
                        right: self.core.running_right,
                    });
                }
                if self.melee_left > 0.0 {
                    direction * ROBOT_PATROL_SPEED
                } else if dx.abs() < ROBOT_STAND_TO_SHOOT_RANGE {
                    0.0
                } else {
                    direction * ROBOT_PATROL_SPEED
                }
            }
            None => {
                if std::mem::take(&mut self.reverse_pending) {
                    self.core.running_right = !self.core.running_right;
                }
                if self.core.running_right {
                    ROBOT_PATROL_SPEED
                } else {
                    -ROBOT_PATROL_SPEED
                }
            }
        };

        if std::mem::take(&mut self.jump_requested) && grounded {
            vy = ROBOT_CRATE_JUMP_SPEED;
        }
        Vec2::new(vx, vy)
    }

    fn derive_state(&self, velocity: Vec2, grounded: bool) -> RobotState {
        let moving = velocity.x.abs() > MOVING_EPSILON;
        let shooting = self.shot_pose_left > 0.0;
        if self.dead {
            RobotState::Dead
        } else if self.slide_left > 0.0 {
            RobotState::Slide
        } else if self.melee_left > 0.0 {
            RobotState::JumpMelee
        } else if !grounded {
            if shooting {
                RobotState::JumpShoot
            } else {
                RobotState::Jump
            }
        } else if moving && shooting {
            RobotState::RunShoot
        } else if moving {
            RobotState::Run
        } else if shooting {
            RobotState::Shoot
        } else {
            RobotState::Idle
        }
    }
}
