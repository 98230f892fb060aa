const GAME_CLEAR_COLOR: [u8; 4] = [96, 160, 220, 255];

/// One play through the level, from a fresh score to game over.
struct GameSession {
    level: Level,
    values: ValueManager,
    indicators: ScoreIndicators,
    clouds: Clouds,
    camera: CameraRig,
    background: usize,
    hud_clock: f32,
    coin_icon: Option<String>,
    head_icon: Option<String>,
    feather_icon: Option<String>,
}

impl GameSession {
    fn start(
        assets: &GameAssets,
        character: Character,
        world: &mut SceneWorld,
    ) -> Result<Self, LevelBuildError> {
        let level = build_level(assets, character, world)?;
        let clouds = Clouds::spawn(world, assets, level.map_width);
        let camera = CameraRig::new(level.player.position(&level.physics).x, level.map_width);
        camera.apply(world);
        world.set_background(assets.background(0));
        world.set_clear_color(GAME_CLEAR_COLOR);
        Ok(Self {
            level,
            values: ValueManager::new(),
            indicators: ScoreIndicators::default(),
            clouds,
            camera,
            background: 0,
            hud_clock: 0.0,
            coin_icon: assets.region(ITEM_ATLAS, "coin_icon"),
            head_icon: assets.region(character.atlas(), "head"),
            feather_icon: assets.region(ITEM_ATLAS, "feather"),
        })
    }

    fn tick(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
        assets: &GameAssets,
        preferences: &GamePreferences,
    ) -> Result<SceneCommand, PhysicsError> {
        self.hud_clock += dt;

        let steps = self.level.stepper.advance(dt);
        for _ in 0..steps {
            self.level.physics.step();
        }
        let contacts = self.level.physics.drain_contacts();
        dispatch_contacts(
            &mut self.level,
            &contacts,
            &mut self.values,
            &mut self.indicators,
        );

        self.apply_cheats(input, world, assets);

        let mut command = SceneCommand::None;
        let mut spawns = Vec::new();
        if self.values.is_game_over() {
            if self.values.tick_game_over(dt) {
                info!(score = self.values.score, "game_over");
                command = SceneCommand::SwitchTo(SceneKey::Menu);
            }
        } else if !self.level.player.is_dead() {
            self.handle_input(input, assets, &mut spawns);
            resolve_player_melee(&mut self.level, &mut self.values, &mut self.indicators);
        } else if self.values.tick_live_lost(dt) {
            self.level.respawn_player(world, assets)?;
        }

        self.update_actors(dt, world, assets, &mut spawns);
        self.level.spawn_projectiles(&spawns, world, assets)?;
        self.indicators.update(dt);
        self.values.ease(dt);

        if !self.level.player.is_dead() && self.level.player.is_falling(&self.level.physics) {
            self.level
                .player
                .die(&mut self.level.physics, &mut self.values);
        }

        let player_x = (!self.level.player.is_dead())
            .then(|| self.level.player.position(&self.level.physics).x);
        self.camera.follow(player_x, self.level.map_width);
        self.camera.apply(world);
        self.publish_overlays(world, preferences);
        Ok(command)
    }

    fn handle_input(
        &mut self,
        input: &InputSnapshot,
        assets: &GameAssets,
        spawns: &mut Vec<ProjectileSpawn>,
    ) {
        let Level {
            physics, player, ..
        } = &mut self.level;
        if input.is_down(InputAction::Up) {
            player.jump(physics);
        }
        if input.is_down(InputAction::Climb) {
            player.climb(physics);
        }
        if input.is_down(InputAction::Right) {
            player.right(physics);
        } else if input.is_down(InputAction::Left) {
            player.left(physics);
        }
        if input.is_down(InputAction::Down) {
            player.down(physics, assets);
        }
        if input.was_pressed(InputAction::Attack) {
            player.attack(assets);
        }
        if input.was_pressed(InputAction::Throw) {
            player.attack_throw(physics, assets, spawns);
        }
        if input.was_pressed(InputAction::JumpThrow) {
            player.jump_throw(physics, assets, spawns);
        }
    }

    fn apply_cheats(
        &mut self,
        input: &InputSnapshot,
        world: &mut SceneWorld,
        assets: &GameAssets,
    ) {
        let backgrounds = [
            InputAction::Background0,
            InputAction::Background1,
            InputAction::Background2,
            InputAction::Background3,
        ];
        for (index, action) in backgrounds.into_iter().enumerate() {
            if input.was_pressed(action) {
                self.background = index;
                world.set_background(assets.background(index));
            }
        }
        if input.was_pressed(InputAction::ExtraLife) && !self.values.is_game_over() {
            self.values.add_life();
            info!(lives = self.values.lives, "cheat_extra_life");
        }
        if input.was_pressed(InputAction::FeatherCheat) && !self.level.player.is_dead() {
            self.level.player.grant_feather();
            info!("cheat_feather");
        }
    }

    fn update_actors(
        &mut self,
        dt: f32,
        world: &mut SceneWorld,
        assets: &GameAssets,
        spawns: &mut Vec<ProjectileSpawn>,
    ) {
        let Level {
            physics,
            player,
            zombies,
            robots,
            pickups,
            crates,
            projectiles,
            ..
        } = &mut self.level;

        player.update(dt, physics, world, assets);
        self.clouds.update(dt, world);

        let player_position = player.position(physics);
        let player_x = player_position.x;
        for pickup in pickups.iter_mut() {
            pickup.core.activate_near(physics, player_x);
            pickup.update(dt, physics, world, assets);
        }
        for item in crates.iter_mut() {
            item.core.activate_near(physics, player_x);
            item.update(physics, world);
        }

        let player_target = (!player.is_dead()).then_some(player_position);
        let mut frame = Frame {
            physics,
            world,
            assets,
            values: &mut self.values,
            indicators: &mut self.indicators,
            spawns,
        };
        for zombie in zombies.iter_mut() {
            zombie.core.activate_near(frame.physics, player_x);
            zombie.update(dt, &mut frame);
        }
        let mut melee_hit = false;
        for robot in robots.iter_mut() {
            robot.core.activate_near(frame.physics, player_x);
            melee_hit |= robot.update(dt, &mut frame, player_target);
        }
        if melee_hit {
            player.die(frame.physics, frame.values);
        }

        for projectile in projectiles.iter_mut() {
            projectile.update(dt, frame.physics, frame.world);
        }
        projectiles.retain(|projectile| !projectile.is_finished());
    }

    fn publish_overlays(&self, world: &mut SceneWorld, preferences: &GamePreferences) {
        let fps = preferences
            .show_fps_counter
            .then(|| world.loop_metrics().fps);
        let view = HudView {
            values: &self.values,
            feather_left: self.level.player.feather_time_left,
            fps,
            clock: self.hud_clock,
            coin_icon: self.coin_icon.as_deref(),
            head_icon: self.head_icon.as_deref(),
            feather_icon: self.feather_icon.as_deref(),
        };
        let mut hud = build_game_hud(&view);
        hud.extend(self.indicators.hud_items());
        world.set_hud(hud);

        if preferences.debug_draw {
            world.set_debug_shapes(self.level.physics.debug_shapes());
        } else if !world.debug_shapes().is_empty() {
            world.set_debug_shapes(Vec::new());
        }
        world.set_post_effect(if preferences.use_monochrome_shader {
            PostEffect::Monochrome
        } else {
            PostEffect::None
        });
    }
}

pub(crate) struct GameScene {
    assets: Rc<GameAssets>,
    preferences: Rc<RefCell<PreferencesStore>>,
    session: Option<GameSession>,
}

impl GameScene {
    pub(crate) fn new(
        assets: Rc<GameAssets>,
        preferences: Rc<RefCell<PreferencesStore>>,
    ) -> Self {
        Self {
            assets,
            preferences,
            session: None,
        }
    }

    fn start_session(&mut self, world: &mut SceneWorld) {
        let character = self.preferences.borrow().current().character;
        self.session = match GameSession::start(&self.assets, character, world) {
            Ok(session) => {
                info!(?character, sprites = world.sprite_count(), "game_session_started");
                Some(session)
            }
            Err(error) => {
                error!(error = %error, "game_session_start_failed");
                None
            }
        };
    }
}

impl Scene for GameScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.start_session(world);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.was_pressed(InputAction::Back) {
            return SceneCommand::SwitchTo(SceneKey::Menu);
        }
        if input.was_pressed(InputAction::Reset) {
            info!("game_reset");
            self.session = None;
            world.clear();
            self.start_session(world);
        }
        let preferences = self.preferences.borrow().current().clone();
        let Some(session) = self.session.as_mut() else {
            warn!("game_session_missing_returning_to_menu");
            return SceneCommand::SwitchTo(SceneKey::Menu);
        };
        match session.tick(fixed_dt_seconds, input, world, &self.assets, &preferences) {
            Ok(command) => command,
            Err(error) => {
                error!(error = %error, "game_tick_failed");
                SceneCommand::SwitchTo(SceneKey::Menu)
            }
        }
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        self.session = None;
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let session = self.session.as_ref()?;
        Some(format!(
            "Shinobi Run | score {} | lives {}",
            session.values.score,
            session.values.lives.max(0)
        ))
    }

    fn debug_lines(&self, _world: &SceneWorld) -> Vec<String> {
        let Some(session) = self.session.as_ref() else {
            return vec!["no session".to_string()];
        };
        let player = &session.level.player;
        let position = player.position(&session.level.physics);
        vec![
            format!("player {:?} at {:.2},{:.2}", player.state, position.x, position.y),
            format!(
                "ground {} ladder {} feather {:.1}",
                player.foot_contacts, player.ladder_contacts, player.feather_time_left
            ),
            format!(
                "bodies {} actors {} popups {}",
                session.level.physics.body_count(),
                session.level.live_actor_count(),
                session.indicators.len()
            ),
            format!("background bg{}", session.background),
        ]
    }
}
