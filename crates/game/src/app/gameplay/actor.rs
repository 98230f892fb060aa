#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Alive,
    QueuedDestroy,
    Destroyed,
}

/// Body, sprite and bookkeeping shared by every dynamic actor.
#[derive(Debug)]
struct ActorCore {
    id: u64,
    body: BodyHandle,
    sprite: SpriteId,
    bounds: Rect,
    running_right: bool,
    state_timer: f32,
    lifecycle: Lifecycle,
}

impl ActorCore {
    fn new(id: u64, body: BodyHandle, sprite: SpriteId, width: f32, height: f32) -> Self {
        Self {
            id,
            body,
            sprite,
            bounds: Rect::new(0.0, 0.0, width, height),
            running_right: true,
            state_timer: 0.0,
            lifecycle: Lifecycle::Alive,
        }
    }

    fn is_alive(&self) -> bool {
        self.lifecycle == Lifecycle::Alive
    }

    fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    /// Marks only; the body goes away on the next `settle_lifecycle`.
    fn queue_destroy(&mut self) {
        if self.lifecycle == Lifecycle::Alive {
            self.lifecycle = Lifecycle::QueuedDestroy;
        }
    }

    /// Finishes a queued destroy. True when the actor no longer exists and
    /// must not touch physics this tick.
    fn settle_lifecycle(&mut self, physics: &mut PhysicsWorld, world: &mut SceneWorld) -> bool {
        match self.lifecycle {
            Lifecycle::Alive => false,
            Lifecycle::Destroyed => true,
            Lifecycle::QueuedDestroy => {
                physics.destroy_body(self.body);
                world.despawn(self.sprite);
                self.bounds = Rect::new(0.0, 0.0, 0.0, 0.0);
                self.lifecycle = Lifecycle::Destroyed;
                debug!(actor = self.id, "actor_destroyed");
                true
            }
        }
    }

    fn is_active(&self, physics: &PhysicsWorld) -> bool {
        physics.is_enabled(self.body)
    }

    fn position(&self, physics: &PhysicsWorld) -> Vec2 {
        physics.position(self.body).unwrap_or(Vec2::ZERO)
    }

    fn velocity(&self, physics: &PhysicsWorld) -> Vec2 {
        physics.linear_velocity(self.body).unwrap_or(Vec2::ZERO)
    }

    /// Wakes a map-spawned body once the player is close enough.
    fn activate_near(&self, physics: &mut PhysicsWorld, player_x: f32) {
        if self.is_alive() && !physics.is_enabled(self.body) {
            let x = self.position(physics).x;
            if player_x + V_WIDTH / 2.0 + ACTIVATION_LEAD_METRES > x {
                physics.set_enabled(self.body, true);
            }
        }
    }

    fn set_size(&mut self, width: f32, height: f32) {
        self.bounds.width = width;
        self.bounds.height = height;
    }

    fn place_at_body(&mut self, physics: &PhysicsWorld) {
        let center = self.position(physics);
        self.bounds.x = center.x - self.bounds.width / 2.0;
        self.bounds.y = center.y - self.bounds.height / 2.0;
    }

    fn face_by_velocity(&mut self, vx: f32) {
        if vx < 0.0 {
            self.running_right = false;
        } else if vx > 0.0 {
            self.running_right = true;
        }
    }

    fn advance_state_timer(&mut self, state_changed: bool, dt: f32) {
        if state_changed {
            self.state_timer = 0.0;
        } else {
            self.state_timer += dt;
        }
    }

    fn publish(&self, world: &mut SceneWorld, region: Option<String>) {
        if let Some(sprite) = world.sprite_mut(self.sprite) {
            sprite.bounds = self.bounds;
            sprite.flip_x = !self.running_right;
            if region.is_some() {
                sprite.region = region;
            }
        }
    }
}

fn spawn_actor_sprite(world: &mut SceneWorld, region: Option<String>, fallback: [u8; 4]) -> SpriteId {
    world.spawn_sprite(SpriteDesc {
        region,
        layer: SpriteLayer::Actors,
        fallback_color: fallback,
        ..SpriteDesc::default()
    })
}

/// Hands out actor ids; 0 stays reserved for the player and map geometry.
#[derive(Debug)]
struct ActorIds {
    next: u64,
}

impl ActorIds {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Per-tick mutable surroundings handed to actor updates.
struct Frame<'a> {
    physics: &'a mut PhysicsWorld,
    world: &'a mut SceneWorld,
    assets: &'a GameAssets,
    values: &'a mut ValueManager,
    indicators: &'a mut ScoreIndicators,
    spawns: &'a mut Vec<ProjectileSpawn>,
}
