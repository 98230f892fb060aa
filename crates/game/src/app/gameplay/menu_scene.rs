const MENU_CLEAR_COLOR: [u8; 4] = [24, 28, 44, 255];
const MENU_TITLE_SCALE: u32 = 10;
const MENU_LINE_SCALE: u32 = 4;
const MENU_ACCENT: [u8; 4] = [250, 200, 70, 255];

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

fn menu_lines(preferences: &GamePreferences) -> Vec<String> {
    vec![
        "ENTER  START".to_string(),
        format!("G  CHARACTER: {}", preferences.character.label()),
        format!("M  MONOCHROME: {}", on_off(preferences.use_monochrome_shader)),
        format!("F  FPS COUNTER: {}", on_off(preferences.show_fps_counter)),
        format!("B  DEBUG DRAW: {}", on_off(preferences.debug_draw)),
        "ESC  QUIT".to_string(),
    ]
}

pub(crate) struct MenuScene {
    assets: Rc<GameAssets>,
    preferences: Rc<RefCell<PreferencesStore>>,
}

impl MenuScene {
    pub(crate) fn new(
        assets: Rc<GameAssets>,
        preferences: Rc<RefCell<PreferencesStore>>,
    ) -> Self {
        Self {
            assets,
            preferences,
        }
    }

    fn apply_toggles(&self, input: &InputSnapshot) {
        let toggled = [
            InputAction::ToggleCharacter,
            InputAction::ToggleMonochrome,
            InputAction::ToggleFps,
            InputAction::ToggleDebug,
        ]
        .into_iter()
        .filter(|action| input.was_pressed(*action))
        .collect::<Vec<_>>();
        if toggled.is_empty() {
            return;
        }
        self.preferences.borrow_mut().update(|preferences| {
            for action in toggled {
                match action {
                    InputAction::ToggleCharacter => {
                        preferences.character = preferences.character.toggled();
                    }
                    InputAction::ToggleMonochrome => {
                        preferences.use_monochrome_shader = !preferences.use_monochrome_shader;
                    }
                    InputAction::ToggleFps => {
                        preferences.show_fps_counter = !preferences.show_fps_counter;
                    }
                    InputAction::ToggleDebug => preferences.debug_draw = !preferences.debug_draw,
                    _ => {}
                }
            }
        });
    }

    fn publish(&self, world: &mut SceneWorld) {
        let preferences = self.preferences.borrow().current().clone();
        let mut hud = vec![
            HudItem::Rect {
                x: 0.0,
                y: 0.0,
                width: GUI_WIDTH_PX,
                height: GUI_HEIGHT_PX,
                color: [0, 0, 0, 110],
            },
            centered_text("SHINOBI RUN", 120.0, MENU_TITLE_SCALE, MENU_ACCENT),
        ];
        let mut y = 300.0;
        for line in menu_lines(&preferences) {
            hud.push(centered_text(&line, y, MENU_LINE_SCALE, HUD_WHITE));
            y += 50.0;
        }
        let head = self.assets.region(preferences.character.atlas(), "head");
        hud.push(icon(
            head.as_deref(),
            GUI_WIDTH_PX / 2.0 - 260.0,
            340.0,
            HUD_ICON_SIZE,
            HUD_WHITE,
            [230, 120, 40, 255],
        ));
        world.set_hud(hud);
        world.set_post_effect(if preferences.use_monochrome_shader {
            PostEffect::Monochrome
        } else {
            PostEffect::None
        });
    }
}

impl Scene for MenuScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.set_background(self.assets.background(0));
        world.set_clear_color(MENU_CLEAR_COLOR);
        self.publish(world);
        info!("menu_loaded");
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.was_pressed(InputAction::Back) {
            return SceneCommand::Quit;
        }
        if input.was_pressed(InputAction::Confirm) {
            return SceneCommand::HardResetTo(SceneKey::Game);
        }
        self.apply_toggles(input);
        self.publish(world);
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {}

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some("Shinobi Run | menu".to_string())
    }
}
