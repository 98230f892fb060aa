const INDICATOR_LIFETIME_SECONDS: f32 = 1.0;
const INDICATOR_RISE_METRES: f32 = 1.0;
const INDICATOR_TEXT_SCALE: u32 = 4;

const CLOUD_COUNT: usize = 6;
const CLOUD_WIDTH: f32 = 2.4;
const CLOUD_HEIGHT: f32 = 1.2;
const CLOUD_MIN_SPEED: f32 = 0.2;
const CLOUD_SPEED_STEP: f32 = 0.08;

#[derive(Debug, Clone, PartialEq)]
struct ScoreIndicator {
    origin: Vec2,
    amount: u32,
    age: f32,
}

/// "+N" popups that rise and fade over their lifetime.
#[derive(Debug, Default)]
struct ScoreIndicators {
    active: Vec<ScoreIndicator>,
}

impl ScoreIndicators {
    fn add(&mut self, origin: Vec2, amount: u32) {
        self.active.push(ScoreIndicator {
            origin,
            amount,
            age: 0.0,
        });
    }

    fn update(&mut self, dt: f32) {
        for indicator in &mut self.active {
            indicator.age += dt;
        }
        self.active
            .retain(|indicator| indicator.age < INDICATOR_LIFETIME_SECONDS);
    }

    fn len(&self) -> usize {
        self.active.len()
    }

    fn hud_items(&self) -> impl Iterator<Item = HudItem> + '_ {
        self.active.iter().map(|indicator| {
            let progress = (indicator.age / INDICATOR_LIFETIME_SECONDS).clamp(0.0, 1.0);
            let alpha = ((1.0 - progress) * 255.0).round() as u8;
            HudItem::WorldText {
                position: Vec2::new(
                    indicator.origin.x,
                    indicator.origin.y + progress * INDICATOR_RISE_METRES,
                ),
                text: format!("+{}", indicator.amount),
                color: [255, 255, 255, alpha],
                scale: INDICATOR_TEXT_SCALE,
            }
        })
    }
}

#[derive(Debug)]
struct Cloud {
    sprite: SpriteId,
    x: f32,
    y: f32,
    speed: f32,
}

/// Decorative clouds spread across the map, drifting left and wrapping
/// around at the map edges.
#[derive(Debug)]
struct Clouds {
    clouds: Vec<Cloud>,
    map_width: f32,
}

impl Clouds {
    fn spawn(world: &mut SceneWorld, assets: &GameAssets, map_width: f32) -> Self {
        let spacing = map_width.max(V_WIDTH) / CLOUD_COUNT as f32;
        let clouds = (0..CLOUD_COUNT)
            .map(|index| {
                let name = format!("cloud{}", index % 3 + 1);
                let x = spacing * index as f32 + spacing * 0.25;
                let y = V_HEIGHT - 1.6 - (index % 2) as f32 * 0.8;
                let sprite = world.spawn_sprite(SpriteDesc {
                    region: assets.region(ITEM_ATLAS, &name),
                    bounds: Rect::new(x, y, CLOUD_WIDTH, CLOUD_HEIGHT),
                    layer: SpriteLayer::Backdrop,
                    fallback_color: [235, 240, 250, 160],
                    ..SpriteDesc::default()
                });
                Cloud {
                    sprite,
                    x,
                    y,
                    speed: CLOUD_MIN_SPEED + CLOUD_SPEED_STEP * (index % 4) as f32,
                }
            })
            .collect();
        Self {
            clouds,
            map_width: map_width.max(V_WIDTH),
        }
    }

    fn update(&mut self, dt: f32, world: &mut SceneWorld) {
        for cloud in &mut self.clouds {
            cloud.x -= cloud.speed * dt;
            if cloud.x + CLOUD_WIDTH < 0.0 {
                cloud.x += self.map_width + CLOUD_WIDTH;
            }
            if let Some(sprite) = world.sprite_mut(cloud.sprite) {
                sprite.bounds = Rect::new(cloud.x, cloud.y, CLOUD_WIDTH, CLOUD_HEIGHT);
            }
        }
    }
}
