#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickupKind {
    Coin,
    Feather,
}

impl PickupKind {
    fn role(self) -> FixtureRole {
        match self {
            Self::Coin => FixtureRole::Coin,
            Self::Feather => FixtureRole::Feather,
        }
    }

    fn category(self) -> u32 {
        match self {
            Self::Coin => category::COIN,
            Self::Feather => category::FEATHER,
        }
    }

    fn score(self) -> u32 {
        match self {
            Self::Coin => SCORE_COIN,
            Self::Feather => SCORE_FEATHER,
        }
    }
}

/// Coin or feather: a static sensor collected once.
#[derive(Debug)]
struct Pickup {
    core: ActorCore,
    kind: PickupKind,
    collected: bool,
}

impl Pickup {
    fn spawn(
        id: u64,
        kind: PickupKind,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        rect: Rect,
    ) -> Result<Self, PhysicsError> {
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Static,
            position: rect.center(),
            enabled: false,
            ..BodyDef::default()
        });
        physics.attach_fixture(
            body,
            &FixtureDef::sensor(
                Shape::centered_box(rect.width / 2.0, rect.height / 2.0),
                CollisionFilter::new(kind.category(), category::PLAYER),
                kind.role().tag(id),
            ),
        )?;
        let (region, fallback) = match kind {
            PickupKind::Coin => (
                assets.frame(ITEM_ATLAS, "coin", 0.0, true),
                [240, 200, 40, 255],
            ),
            PickupKind::Feather => (
                assets.region(ITEM_ATLAS, "feather"),
                [240, 240, 240, 255],
            ),
        };
        let sprite = spawn_actor_sprite(world, region, fallback);
        let mut core = ActorCore::new(id, body, sprite, rect.width, rect.height);
        core.place_at_body(physics);
        core.publish(world, None);
        Ok(Self {
            core,
            kind,
            collected: false,
        })
    }

    /// True the first time only.
    fn collect(&mut self, values: &mut ValueManager, indicators: &mut ScoreIndicators) -> bool {
        if self.collected || !self.core.is_alive() {
            return false;
        }
        self.collected = true;
        self.core.queue_destroy();
        values.add_score(self.kind.score());
        let top = Vec2::new(self.core.bounds.center().x, self.core.bounds.max().y);
        indicators.add(top, self.kind.score());
        true
    }

    fn update(
        &mut self,
        dt: f32,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
    ) {
        if self.core.settle_lifecycle(physics, world) || !self.core.is_active(physics) {
            return;
        }
        if self.kind == PickupKind::Coin {
            let region = assets.frame(ITEM_ATLAS, "coin", self.core.state_timer, true);
            self.core.publish(world, region);
        }
        self.core.advance_state_timer(false, dt);
    }
}

/// Breakable dynamic box.
#[derive(Debug)]
struct Crate {
    core: ActorCore,
    broken: bool,
}

impl Crate {
    fn spawn(
        id: u64,
        physics: &mut PhysicsWorld,
        world: &mut SceneWorld,
        assets: &GameAssets,
        rect: Rect,
    ) -> Result<Self, PhysicsError> {
        let body = physics.create_body(&BodyDef {
            kind: BodyKind::Dynamic,
            position: rect.center(),
            enabled: false,
            ..BodyDef::default()
        });
        physics.attach_fixture(
            body,
            &FixtureDef::solid(
                Shape::centered_box(rect.width / 2.0, rect.height / 2.0),
                CollisionFilter::new(
                    category::CRATE,
                    category::GROUND
                        | category::CRATE
                        | category::PLAYER
                        | category::PLAYER_FOOT
                        | category::PLAYER_ATTACK
                        | category::ENEMY
                        | category::ENEMY_FOOT
                        | category::KUNAI
                        | category::BULLET,
                ),
                FixtureRole::Crate.tag(id),
            )
            .with_density(4.0)
            .with_friction(0.8),
        )?;
        let sprite = spawn_actor_sprite(
            world,
            assets.region(ITEM_ATLAS, "crate"),
            [150, 100, 50, 255],
        );
        let mut core = ActorCore::new(id, body, sprite, rect.width, rect.height);
        core.place_at_body(physics);
        core.publish(world, None);
        Ok(Self { core, broken: false })
    }

    fn smash(&mut self, values: &mut ValueManager, indicators: &mut ScoreIndicators) {
        if self.broken || !self.core.is_alive() {
            return;
        }
        self.broken = true;
        self.core.queue_destroy();
        values.add_score(SCORE_CRATE);
        indicators.add(self.core.bounds.center(), SCORE_CRATE);
    }

    fn update(&mut self, physics: &mut PhysicsWorld, world: &mut SceneWorld) {
        if self.core.settle_lifecycle(physics, world) || !self.core.is_active(physics) {
            return;
        }
        self.core.place_at_body(physics);
        self.core.publish(world, None);
    }
}
