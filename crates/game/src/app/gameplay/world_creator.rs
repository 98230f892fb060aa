const DEFAULT_SPAWN: Vec2 = Vec2 { x: 1.5, y: 3.0 };

#[derive(Debug, Error)]
enum LevelBuildError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Tilemap(#[from] TilemapError),
}

/// Everything living in one physics world: the player, map actors and
/// projectiles in flight.
struct Level {
    physics: PhysicsWorld,
    stepper: FixedStepper,
    ids: ActorIds,
    character: Character,
    spawn_point: Vec2,
    map_width: f32,
    player: Player,
    zombies: Vec<Zombie>,
    robots: Vec<Robot>,
    pickups: Vec<Pickup>,
    crates: Vec<Crate>,
    projectiles: Vec<Projectile>,
}

impl Level {
    fn zombie_mut(&mut self, id: u64) -> Option<&mut Zombie> {
        self.zombies.iter_mut().find(|zombie| zombie.core.id == id)
    }

    fn robot_mut(&mut self, id: u64) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|robot| robot.core.id == id)
    }

    fn pickup_mut(&mut self, id: u64) -> Option<&mut Pickup> {
        self.pickups.iter_mut().find(|pickup| pickup.core.id == id)
    }

    fn crate_mut(&mut self, id: u64) -> Option<&mut Crate> {
        self.crates.iter_mut().find(|item| item.core.id == id)
    }

    fn projectile_mut(&mut self, id: u64) -> Option<&mut Projectile> {
        self.projectiles
            .iter_mut()
            .find(|projectile| projectile.core.id == id)
    }

    fn spawn_projectiles(
        &mut self,
        requests: &[ProjectileSpawn],
        world: &mut SceneWorld,
        assets: &GameAssets,
    ) -> Result<(), PhysicsError> {
        for request in requests {
            let id = self.ids.allocate();
            let projectile = Projectile::spawn(
                id,
                *request,
                &mut self.physics,
                world,
                assets,
                self.character.atlas(),
            )?;
            self.projectiles.push(projectile);
        }
        Ok(())
    }

    fn respawn_player(
        &mut self,
        world: &mut SceneWorld,
        assets: &GameAssets,
    ) -> Result<(), PhysicsError> {
        self.player.remove(&mut self.physics, world);
        self.player = Player::spawn(
            &mut self.physics,
            world,
            assets,
            self.character,
            self.spawn_point,
        )?;
        for zombie in &mut self.zombies {
            zombie.stop_attack();
        }
        for robot in &mut self.robots {
            robot.set_touching_player(false);
        }
        Ok(())
    }

    fn live_actor_count(&self) -> usize {
        let alive = |core: &ActorCore| !core.is_destroyed();
        self.zombies.iter().filter(|z| alive(&z.core)).count()
            + self.robots.iter().filter(|r| alive(&r.core)).count()
            + self.pickups.iter().filter(|p| alive(&p.core)).count()
            + self.crates.iter().filter(|c| alive(&c.core)).count()
            + self.projectiles.len()
    }
}

/// Builds the physics world, actors and tile layers from the level map.
fn build_level(
    assets: &GameAssets,
    character: Character,
    world: &mut SceneWorld,
) -> Result<Level, LevelBuildError> {
    let map = assets.map();
    let mut physics = PhysicsWorld::new(GRAVITY, TIME_STEP);
    let mut ids = ActorIds::new();

    for object in map.objects("ground") {
        add_static_box(
            &mut physics,
            map.world_rect(object, PPM),
            false,
            CollisionFilter::new(category::GROUND, category::ALL),
            FixtureRole::Ground,
        )?;
    }
    for object in map.objects("boundaries") {
        add_static_box(
            &mut physics,
            map.world_rect(object, PPM),
            true,
            CollisionFilter::new(category::BOUNDARY, category::ENEMY),
            FixtureRole::Boundary,
        )?;
    }
    for object in map.objects("ladders") {
        add_static_box(
            &mut physics,
            map.world_rect(object, PPM),
            true,
            CollisionFilter::new(category::LADDER, category::PLAYER),
            FixtureRole::Ladder,
        )?;
    }

    let mut crates = Vec::new();
    for object in map.objects("crates") {
        let rect = map.world_rect(object, PPM);
        crates.push(Crate::spawn(ids.allocate(), &mut physics, world, assets, rect)?);
    }
    let mut pickups = Vec::new();
    for (group, kind) in [("coins", PickupKind::Coin), ("feathers", PickupKind::Feather)] {
        for object in map.objects(group) {
            let rect = map.world_rect(object, PPM);
            pickups.push(Pickup::spawn(
                ids.allocate(),
                kind,
                &mut physics,
                world,
                assets,
                rect,
            )?);
        }
    }
    let mut zombies = Vec::new();
    for object in map.objects("zombies") {
        let variant = ZombieVariant::from_kind(&object.kind);
        let mut zombie = Zombie::spawn(
            ids.allocate(),
            &mut physics,
            world,
            assets,
            variant,
            map.world_center(object, PPM),
        )?;
        zombie.core.running_right = faces_right(object);
        zombies.push(zombie);
    }
    let mut robots = Vec::new();
    for object in map.objects("robots") {
        let mut robot = Robot::spawn(
            ids.allocate(),
            &mut physics,
            world,
            assets,
            map.world_center(object, PPM),
        )?;
        robot.core.running_right = faces_right(object);
        robots.push(robot);
    }

    let spawn_point = map
        .objects("spawn")
        .iter()
        .find(|object| object.name == "player")
        .map(|object| map.world_center(object, PPM))
        .unwrap_or(DEFAULT_SPAWN);
    let player = Player::spawn(&mut physics, world, assets, character, spawn_point)?;

    world.set_tile_layers(assets.tile_layers()?);

    let level = Level {
        physics,
        stepper: FixedStepper::new(TIME_STEP),
        ids,
        character,
        spawn_point,
        map_width: assets.map_width_metres(),
        player,
        zombies,
        robots,
        pickups,
        crates,
        projectiles: Vec::new(),
    };
    info!(
        zombies = level.zombies.len(),
        robots = level.robots.len(),
        pickups = level.pickups.len(),
        crates = level.crates.len(),
        bodies = level.physics.body_count(),
        "level_built"
    );
    Ok(level)
}

fn add_static_box(
    physics: &mut PhysicsWorld,
    rect: Rect,
    sensor: bool,
    filter: CollisionFilter,
    role: FixtureRole,
) -> Result<BodyHandle, PhysicsError> {
    let body = physics.create_body(&BodyDef {
        kind: BodyKind::Static,
        position: rect.center(),
        ..BodyDef::default()
    });
    let shape = Shape::centered_box(rect.width / 2.0, rect.height / 2.0);
    let tag = role.tag(STATIC_OWNER);
    let fixture = if sensor {
        FixtureDef::sensor(shape, filter, tag)
    } else {
        FixtureDef::solid(shape, filter, tag)
    };
    physics.attach_fixture(body, &fixture)?;
    Ok(body)
}

/// Enemies face left unless the map object sets `facing` to `right`.
fn faces_right(object: &MapObject) -> bool {
    object
        .property("facing")
        .is_some_and(|facing| facing.eq_ignore_ascii_case("right"))
}
