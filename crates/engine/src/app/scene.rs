use thiserror::Error;

use super::input::{ActionStates, InputAction};
use super::metrics::LoopMetricsSnapshot;

/// HUD coordinates are authored against this reference resolution and
/// scaled with the fit viewport.
pub const GUI_WIDTH_PX: f32 = 1280.0;
pub const GUI_HEIGHT_PX: f32 = 720.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Menu,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
    HardResetTo(SceneKey),
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(actions: ActionStates, window_width: u32, window_height: u32) -> Self {
        Self {
            actions,
            window_width,
            window_height,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the tick that follows the physical press.
    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        if !is_down {
            self.actions.set_pressed(action, false);
        }
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction, pressed: bool) -> Self {
        self.actions.set_pressed(action, pressed);
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its bottom-left corner, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width * 0.5,
            y: center.y - height * 0.5,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }

    pub fn max(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width,
            y: self.y + self.height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        let a = self.max();
        let b = other.max();
        self.x < b.x && other.x < a.x && self.y < b.y && other.y < a.y
    }
}

/// `position` is the world point at the centre of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2 { x: 6.4, y: 3.6 },
            viewport_width: 12.8,
            viewport_height: 7.2,
        }
    }
}

impl Camera2D {
    pub fn view_rect(&self) -> Rect {
        Rect::centered(self.position, self.viewport_width, self.viewport_height)
    }
}

/// Row 0 is the bottom row. Tile (x, y) covers
/// `origin + (x, y) * tile_size` to `origin + (x + 1, y + 1) * tile_size`.
/// A tile id of 0 is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    origin: Vec2,
    tile_size: f32,
    tiles: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        origin: Vec2,
        tile_size: f32,
        tiles: Vec<u32>,
    ) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tile_size,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tile_rect(&self, x: u32, y: u32) -> Option<Rect> {
        self.index_of(x, y)?;
        Some(Rect {
            x: self.origin.x + x as f32 * self.tile_size,
            y: self.origin.y + y as f32 * self.tile_size,
            width: self.tile_size,
            height: self.tile_size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    pub first_gid: u32,
    pub key_prefix: String,
}

/// A tilemap plus the sprite keys its tile ids resolve to.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub name: String,
    pub tilemap: Tilemap,
    /// Sorted by `first_gid`.
    pub sources: Vec<TileSource>,
}

impl TileLayer {
    /// `gid` maps to `<prefix>_<n>` where `n` counts from 1 inside its source.
    pub fn region_key(&self, gid: u32) -> Option<String> {
        if gid == 0 {
            return None;
        }
        let source = self
            .sources
            .iter()
            .rev()
            .find(|source| source.first_gid <= gid)?;
        Some(format!(
            "{}_{}",
            source.key_prefix,
            gid - source.first_gid + 1
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SpriteLayer {
    Backdrop,
    Tiles,
    #[default]
    Actors,
    Effects,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDesc {
    /// Image key under `assets/sprites`; `None` draws the fallback colour.
    pub region: Option<String>,
    pub bounds: Rect,
    pub flip_x: bool,
    pub tint: [u8; 4],
    pub layer: SpriteLayer,
    pub fallback_color: [u8; 4],
    pub visible: bool,
}

impl Default for SpriteDesc {
    fn default() -> Self {
        Self {
            region: None,
            bounds: Rect::default(),
            flip_x: false,
            tint: [255, 255, 255, 255],
            layer: SpriteLayer::Actors,
            fallback_color: [200, 60, 200, 255],
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub id: SpriteId,
    pub desc: SpriteDesc,
    applied_spawn_order: u64,
}

impl Sprite {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Default)]
pub struct SpriteIdAllocator {
    next: u64,
}

impl SpriteIdAllocator {
    pub fn allocate(&mut self) -> SpriteId {
        let id = SpriteId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Screen-space overlay primitives in GUI pixels (top-left origin).
#[derive(Debug, Clone, PartialEq)]
pub enum HudItem {
    Text {
        x: f32,
        y: f32,
        text: String,
        color: [u8; 4],
        scale: u32,
    },
    Icon {
        key: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        tint: [u8; 4],
        fallback_color: [u8; 4],
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [u8; 4],
    },
    /// Text anchored at a world position, centred horizontally.
    WorldText {
        position: Vec2,
        text: String,
        color: [u8; 4],
        scale: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugShape {
    pub min: Vec2,
    pub max: Vec2,
    pub sensor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostEffect {
    #[default]
    None,
    Monochrome,
}

#[derive(Debug)]
pub struct SceneWorld {
    allocator: SpriteIdAllocator,
    sprites: Vec<Sprite>,
    pending_spawns: Vec<Sprite>,
    pending_despawns: Vec<SpriteId>,
    next_applied_spawn_order: u64,
    tile_layers: Vec<TileLayer>,
    camera: Camera2D,
    background: Option<String>,
    clear_color: [u8; 4],
    hud: Vec<HudItem>,
    debug_shapes: Vec<DebugShape>,
    post_effect: PostEffect,
    loop_metrics: LoopMetricsSnapshot,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self {
            allocator: SpriteIdAllocator::default(),
            sprites: Vec::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
            next_applied_spawn_order: 0,
            tile_layers: Vec::new(),
            camera: Camera2D::default(),
            background: None,
            clear_color: [16, 16, 24, 255],
            hud: Vec::new(),
            debug_shapes: Vec::new(),
            post_effect: PostEffect::None,
            loop_metrics: LoopMetricsSnapshot::default(),
        }
    }
}

impl SceneWorld {
    pub fn spawn_sprite(&mut self, desc: SpriteDesc) -> SpriteId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Sprite {
            id,
            desc,
            applied_spawn_order: 0,
        });
        id
    }

    pub fn despawn(&mut self, id: SpriteId) -> bool {
        let exists_now = self.sprites.iter().any(|sprite| sprite.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|sprite| sprite.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            for mut sprite in self.pending_spawns.drain(..) {
                sprite.applied_spawn_order = self.next_applied_spawn_order;
                self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
                self.sprites.push(sprite);
            }
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.sprites
                .retain(|sprite| pending.binary_search(&sprite.id).is_err());
            self.pending_despawns.clear();
        }
    }

    /// Drops every sprite, tile layer and HUD item and resets the camera.
    pub fn clear(&mut self) {
        self.sprites.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.next_applied_spawn_order = 0;
        self.tile_layers.clear();
        self.camera = Camera2D::default();
        self.background = None;
        self.hud.clear();
        self.debug_shapes.clear();
        self.post_effect = PostEffect::None;
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        find_sorted(&self.sprites, id)
            .map(|index| &self.sprites[index])
            .or_else(|| find_sorted(&self.pending_spawns, id).map(|index| &self.pending_spawns[index]))
    }

    /// Also reaches sprites spawned this tick that are not applied yet.
    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut SpriteDesc> {
        if let Some(index) = find_sorted(&self.sprites, id) {
            return Some(&mut self.sprites[index].desc);
        }
        find_sorted(&self.pending_spawns, id).map(|index| &mut self.pending_spawns[index].desc)
    }

    pub fn set_tile_layers(&mut self, layers: Vec<TileLayer>) {
        self.tile_layers = layers;
    }

    pub fn tile_layers(&self) -> &[TileLayer] {
        &self.tile_layers
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn set_background(&mut self, key: Option<String>) {
        self.background = key;
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn set_clear_color(&mut self, color: [u8; 4]) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> [u8; 4] {
        self.clear_color
    }

    /// Replaces the HUD drawn on the next frame.
    pub fn set_hud(&mut self, items: Vec<HudItem>) {
        self.hud = items;
    }

    pub fn hud(&self) -> &[HudItem] {
        &self.hud
    }

    pub fn set_debug_shapes(&mut self, shapes: Vec<DebugShape>) {
        self.debug_shapes = shapes;
    }

    pub fn debug_shapes(&self) -> &[DebugShape] {
        &self.debug_shapes
    }

    pub fn set_post_effect(&mut self, effect: PostEffect) {
        self.post_effect = effect;
    }

    pub fn post_effect(&self) -> PostEffect {
        self.post_effect
    }

    /// Latest loop metrics, refreshed by the runner before each tick.
    pub fn loop_metrics(&self) -> LoopMetricsSnapshot {
        self.loop_metrics
    }

    pub(crate) fn set_loop_metrics(&mut self, metrics: LoopMetricsSnapshot) {
        self.loop_metrics = metrics;
    }
}

// Ids are allocated in increasing order and both lists keep insertion order.
fn find_sorted(sprites: &[Sprite], id: SpriteId) -> Option<usize> {
    sprites.binary_search_by_key(&id, |sprite| sprite.id).ok()
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    /// Extra lines for the perf overlay.
    fn debug_lines(&self, _world: &SceneWorld) -> Vec<String> {
        Vec::new()
    }
}

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    fn ensure_loaded(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    fn unload(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}

pub(crate) struct SceneMachine {
    menu: SceneRuntime,
    game: SceneRuntime,
    active_scene: SceneKey,
}

impl SceneMachine {
    pub(crate) fn new(menu: Box<dyn Scene>, game: Box<dyn Scene>, active_scene: SceneKey) -> Self {
        Self {
            menu: SceneRuntime::new(menu),
            game: SceneRuntime::new(game),
            active_scene,
        }
    }

    pub(crate) fn active_scene(&self) -> SceneKey {
        self.active_scene
    }

    pub(crate) fn load_active(&mut self) {
        self.active_runtime_mut().ensure_loaded();
    }

    pub(crate) fn update_active(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        metrics: LoopMetricsSnapshot,
    ) -> SceneCommand {
        let runtime = self.active_runtime_mut();
        runtime.world.set_loop_metrics(metrics);
        runtime
            .scene
            .update(fixed_dt_seconds, input, &mut runtime.world)
    }

    pub(crate) fn apply_pending_active(&mut self) {
        self.active_runtime_mut().world.apply_pending();
    }

    pub(crate) fn active_world(&self) -> &SceneWorld {
        &self.active_runtime_ref().world
    }

    #[cfg(test)]
    pub(crate) fn active_world_mut(&mut self) -> &mut SceneWorld {
        &mut self.active_runtime_mut().world
    }

    pub(crate) fn debug_title_active(&self) -> Option<String> {
        let runtime = self.active_runtime_ref();
        runtime.scene.debug_title(&runtime.world)
    }

    pub(crate) fn debug_lines_active(&self) -> Vec<String> {
        let runtime = self.active_runtime_ref();
        runtime.scene.debug_lines(&runtime.world)
    }

    /// Activates `next_scene`, loading it on first use. The scene being left
    /// keeps its world untouched.
    pub(crate) fn switch_to(&mut self, next_scene: SceneKey) -> bool {
        if self.active_scene == next_scene {
            return false;
        }
        self.runtime_mut(next_scene).ensure_loaded();
        self.active_scene = next_scene;
        true
    }

    pub(crate) fn hard_reset_to(&mut self, next_scene: SceneKey) -> bool {
        let runtime = self.runtime_mut(next_scene);
        runtime.unload();
        runtime.world.clear();
        runtime.ensure_loaded();
        let changed = self.active_scene != next_scene;
        self.active_scene = next_scene;
        changed
    }

    pub(crate) fn shutdown_all(&mut self) {
        self.menu.unload();
        self.game.unload();
    }

    fn active_runtime_mut(&mut self) -> &mut SceneRuntime {
        self.runtime_mut(self.active_scene)
    }

    fn active_runtime_ref(&self) -> &SceneRuntime {
        self.runtime_ref(self.active_scene)
    }

    fn runtime_mut(&mut self, key: SceneKey) -> &mut SceneRuntime {
        match key {
            SceneKey::Menu => &mut self.menu,
            SceneKey::Game => &mut self.game,
        }
    }

    fn runtime_ref(&self, key: SceneKey) -> &SceneRuntime {
        match key {
            SceneKey::Menu => &self.menu,
            SceneKey::Game => &self.game,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn boxed(x: f32) -> SpriteDesc {
        SpriteDesc {
            bounds: Rect::new(x, 0.0, 1.0, 1.0),
            ..SpriteDesc::default()
        }
    }

    struct SpawningScene {
        spawn_count: usize,
        step_x: f32,
        unloads: Rc<Cell<u32>>,
    }

    impl SpawningScene {
        fn new(spawn_count: usize, step_x: f32) -> Self {
            Self {
                spawn_count,
                step_x,
                unloads: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Scene for SpawningScene {
        fn load(&mut self, world: &mut SceneWorld) {
            for _ in 0..self.spawn_count {
                world.spawn_sprite(boxed(0.0));
            }
            world.apply_pending();
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            world: &mut SceneWorld,
        ) -> SceneCommand {
            if let Some(first) = world.sprites().first().map(|sprite| sprite.id) {
                if let Some(desc) = world.sprite_mut(first) {
                    desc.bounds.x += self.step_x;
                }
            }
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.unloads.set(self.unloads.get() + 1);
        }
    }

    fn positions(machine: &SceneMachine) -> Vec<(u64, f32)> {
        machine
            .active_world()
            .sprites()
            .iter()
            .map(|sprite| (sprite.id.0, sprite.desc.bounds.x))
            .collect()
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = SpriteIdAllocator::default();
        let ids: Vec<u64> = (0..3).map(|_| allocator.allocate().0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn_sprite(boxed(1.0));
        assert_eq!(world.sprite_count(), 0);
        assert!(world.sprite(id).is_some());

        world.sprite_mut(id).expect("pending sprite").flip_x = true;
        world.apply_pending();
        assert_eq!(world.sprite_count(), 1);
        assert!(world.sprite(id).expect("sprite").desc.flip_x);
    }

    #[test]
    fn duplicate_pending_despawns_are_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.spawn_sprite(boxed(0.0));
        let survivor = world.spawn_sprite(boxed(3.0));
        world.apply_pending();

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        world.apply_pending();

        assert_eq!(world.sprite_count(), 1);
        assert!(world.sprite(doomed).is_none());
        assert!(world.sprite(survivor).is_some());
        assert!(!world.despawn(doomed));
    }

    #[test]
    fn despawn_of_same_tick_spawn_removes_it() {
        let mut world = SceneWorld::default();
        let id = world.spawn_sprite(boxed(0.0));
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.sprite_count(), 0);
    }

    #[test]
    fn switch_away_and_back_preserves_sprites() {
        let mut machine = SceneMachine::new(
            Box::new(SpawningScene::new(2, 0.0)),
            Box::new(SpawningScene::new(1, 0.0)),
            SceneKey::Menu,
        );
        machine.load_active();
        let first = machine.active_world().sprites()[0].id;
        machine
            .active_world_mut()
            .sprite_mut(first)
            .expect("sprite")
            .bounds
            .x = 2.5;
        let before = positions(&machine);

        assert!(machine.switch_to(SceneKey::Game));
        assert_eq!(machine.active_world().sprite_count(), 1);
        assert!(machine.switch_to(SceneKey::Menu));
        assert_eq!(positions(&machine), before);
        assert!(!machine.switch_to(SceneKey::Menu));
    }

    #[test]
    fn inactive_scene_does_not_advance() {
        let mut machine = SceneMachine::new(
            Box::new(SpawningScene::new(1, 1.0)),
            Box::new(SpawningScene::new(1, 3.0)),
            SceneKey::Menu,
        );
        machine.load_active();
        let metrics = LoopMetricsSnapshot::default();
        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty(), metrics);
        let before_switch = positions(&machine);

        assert!(machine.switch_to(SceneKey::Game));
        for _ in 0..10 {
            let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty(), metrics);
        }
        assert_eq!(machine.active_world().sprites()[0].desc.bounds.x, 30.0);

        assert!(machine.switch_to(SceneKey::Menu));
        assert_eq!(positions(&machine), before_switch);
    }

    #[test]
    fn hard_reset_recreates_scene_state() {
        let scene = SpawningScene::new(1, 0.0);
        let unloads = Rc::clone(&scene.unloads);
        let mut machine = SceneMachine::new(
            Box::new(scene),
            Box::new(SpawningScene::new(1, 0.0)),
            SceneKey::Menu,
        );
        machine.load_active();
        let id = machine.active_world().sprites()[0].id;
        machine.active_world_mut().sprite_mut(id).expect("sprite").bounds.x = 9.0;

        let changed = machine.hard_reset_to(SceneKey::Menu);
        assert!(!changed);
        assert_eq!(unloads.get(), 1);
        assert_eq!(machine.active_world().sprite_count(), 1);
        assert_eq!(machine.active_world().sprites()[0].desc.bounds.x, 0.0);
    }

    #[test]
    fn update_publishes_loop_metrics_into_world() {
        let mut machine = SceneMachine::new(
            Box::new(SpawningScene::new(0, 0.0)),
            Box::new(SpawningScene::new(0, 0.0)),
            SceneKey::Game,
        );
        machine.load_active();
        let metrics = LoopMetricsSnapshot {
            fps: 58.0,
            ..LoopMetricsSnapshot::default()
        };
        let _ = machine.update_active(1.0 / 60.0, &InputSnapshot::empty(), metrics);
        assert_eq!(machine.active_world().loop_metrics().fps, 58.0);
    }

    #[test]
    fn shutdown_unloads_only_loaded_scenes() {
        let menu = SpawningScene::new(1, 0.0);
        let game = SpawningScene::new(1, 0.0);
        let (menu_unloads, game_unloads) = (Rc::clone(&menu.unloads), Rc::clone(&game.unloads));
        let mut machine = SceneMachine::new(Box::new(menu), Box::new(game), SceneKey::Menu);
        machine.load_active();
        machine.shutdown_all();
        assert_eq!(menu_unloads.get(), 1);
        assert_eq!(game_unloads.get(), 0);
    }

    #[test]
    fn tilemap_new_rejects_invalid_tile_count() {
        let result = Tilemap::new(3, 2, Vec2::ZERO, 1.0, vec![0; 5]);
        assert_eq!(
            result,
            Err(TilemapError::TileCountMismatch {
                expected: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn tilemap_rects_follow_origin_and_tile_size() {
        let tilemap = Tilemap::new(2, 2, Vec2::new(-1.0, 0.5), 0.5, vec![1, 2, 3, 4])
            .expect("tilemap");
        assert_eq!(tilemap.tile_at(1, 1), Some(4));
        assert_eq!(tilemap.tile_at(2, 0), None);
        assert_eq!(tilemap.tile_rect(1, 0), Some(Rect::new(-0.5, 0.5, 0.5, 0.5)));
    }

    #[test]
    fn tile_layer_resolves_region_keys_per_source() {
        let layer = TileLayer {
            name: "graphics".to_string(),
            tilemap: Tilemap::new(1, 1, Vec2::ZERO, 1.0, vec![0]).expect("tilemap"),
            sources: vec![
                TileSource {
                    first_gid: 1,
                    key_prefix: "tiles/ground".to_string(),
                },
                TileSource {
                    first_gid: 17,
                    key_prefix: "tiles/decor".to_string(),
                },
            ],
        };
        assert_eq!(layer.region_key(0), None);
        assert_eq!(layer.region_key(3).as_deref(), Some("tiles/ground_3"));
        assert_eq!(layer.region_key(17).as_deref(), Some("tiles/decor_1"));
    }

    #[test]
    fn rect_overlap_and_center() {
        let a = Rect::centered(Vec2::new(1.0, 1.0), 2.0, 2.0);
        assert_eq!(a.center(), Vec2::new(1.0, 1.0));
        assert!(a.overlaps(&Rect::new(1.5, 1.5, 1.0, 1.0)));
        assert!(!a.overlaps(&Rect::new(2.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn input_snapshot_builders_set_down_and_edges() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::Left, true)
            .with_action_pressed(InputAction::Confirm, true);
        assert!(input.is_down(InputAction::Left));
        assert!(input.was_pressed(InputAction::Left));
        assert!(input.was_pressed(InputAction::Confirm));
        assert!(!input.is_down(InputAction::Confirm));

        let held = input.with_action_pressed(InputAction::Left, false);
        assert!(held.is_down(InputAction::Left));
        assert!(!held.was_pressed(InputAction::Left));
    }
}
