use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use shinobi_engine::{
    load_animation_library, load_tiled_map, AnimationLibrary, BodyDef, BodyHandle, BodyKind,
    CollisionFilter, Contact, ContentLoadError, FixedStepper, FixtureDef, FixtureTag, HudItem,
    InputAction, InputSnapshot, MapObject, PhysicsError, PhysicsWorld, PostEffect, Rect, Scene,
    SceneCommand, SceneKey, SceneWorld, Shape, SpriteDesc, SpriteId, SpriteLayer, TileLayer,
    TileSource, TiledMap, Tilemap, TilemapError, Vec2, GUI_HEIGHT_PX, GUI_WIDTH_PX,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::preferences::{Character, GamePreferences, PreferencesStore};

/// Map pixels per world metre.
const PPM: f32 = 100.0;
const V_WIDTH: f32 = 12.8;
const V_HEIGHT: f32 = 7.2;
const TIME_STEP: f32 = 1.0 / 60.0;
const GRAVITY: Vec2 = Vec2 { x: 0.0, y: -10.0 };

const ANIMATION_DEFS_PATH: &str = "defs/animations.xml";
const LEVEL_MAP_PATH: &str = "maps/level01.tmx";

const LIVES_START: i32 = 3;
const GAME_OVER_DELAY_SECONDS: f32 = 3.0;
const LIVE_LOST_DELAY_SECONDS: f32 = 2.0;
const LIVES_EASE_PER_SECOND: f32 = 1.0;
const SCORE_EASE_PER_SECOND: f32 = 250.0;

const SCORE_COIN: u32 = 100;
const SCORE_FEATHER: u32 = 250;
const SCORE_CRATE: u32 = 50;
const SCORE_ZOMBIE: u32 = 200;
const SCORE_ROBOT: u32 = 300;

/// Map bodies wake once they are this far past the right edge of the view.
const ACTIVATION_LEAD_METRES: f32 = 4.0;
const ENEMY_DEATH_DELAY_SECONDS: f32 = 3.0;
const FALL_DEATH_Y: f32 = -1.0;

const FEATHER_POWERUP_SECONDS: f32 = 9.0;
const FEATHER_BLINK_BELOW_SECONDS: f32 = 4.0;

const CAMERA_LERP: f32 = 0.1;
const CAMERA_SNAP_DISTANCE: f32 = 0.1;

/// Collision categories. Every fixture's mask must name the categories it
/// reacts to; pairs only collide when both sides accept each other.
mod category {
    pub(super) const GROUND: u32 = 1 << 0;
    pub(super) const PLAYER: u32 = 1 << 1;
    pub(super) const PLAYER_FOOT: u32 = 1 << 2;
    pub(super) const PLAYER_ATTACK: u32 = 1 << 3;
    pub(super) const ENEMY: u32 = 1 << 4;
    pub(super) const ENEMY_SENSOR: u32 = 1 << 5;
    pub(super) const ENEMY_FOOT: u32 = 1 << 6;
    pub(super) const COIN: u32 = 1 << 7;
    pub(super) const FEATHER: u32 = 1 << 8;
    pub(super) const CRATE: u32 = 1 << 9;
    pub(super) const KUNAI: u32 = 1 << 10;
    pub(super) const BULLET: u32 = 1 << 11;
    pub(super) const BOUNDARY: u32 = 1 << 12;
    pub(super) const LADDER: u32 = 1 << 13;
    pub(super) const ALL: u32 = u32::MAX;
}

/// What a fixture is, packed into `FixtureTag::role`. The tag owner is the
/// actor id, 0 for static map geometry and the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
enum FixtureRole {
    Ground = 1,
    Boundary,
    Ladder,
    PlayerBody,
    PlayerFoot,
    PlayerAttackLeft,
    PlayerAttackRight,
    ZombieBody,
    ZombieSensor,
    RobotBody,
    Coin,
    Feather,
    Crate,
    Kunai,
    Bullet,
    RobotFoot,
}

impl FixtureRole {
    const fn id(self) -> u32 {
        self as u32
    }

    const fn tag(self, owner: u64) -> FixtureTag {
        FixtureTag::new(owner, self as u32)
    }
}

const PLAYER_ID: u64 = 0;
const STATIC_OWNER: u64 = 0;

include!("values.rs");
include!("assets.rs");
include!("actor.rs");
include!("player.rs");
include!("zombie.rs");
include!("robot.rs");
include!("tiles.rs");
include!("projectiles.rs");
include!("effects.rs");
include!("world_creator.rs");
include!("contact.rs");
include!("camera.rs");
include!("hud.rs");
include!("game_scene.rs");
include!("menu_scene.rs");

/// Menu first, game second, sharing the loaded assets and preferences.
pub(crate) fn build_scene_pair(
    assets: Rc<GameAssets>,
    preferences: Rc<RefCell<PreferencesStore>>,
) -> (Box<dyn Scene>, Box<dyn Scene>) {
    let menu = MenuScene::new(Rc::clone(&assets), Rc::clone(&preferences));
    let game = GameScene::new(assets, preferences);
    (Box::new(menu), Box::new(game))
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
