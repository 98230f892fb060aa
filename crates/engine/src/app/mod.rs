mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod tools;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{FitViewport, Renderer};
pub use scene::{
    Camera2D, DebugShape, HudItem, InputSnapshot, PostEffect, Rect, Scene, SceneCommand, SceneKey,
    SceneWorld, Sprite, SpriteDesc, SpriteId, SpriteLayer, TileLayer, TileSource, Tilemap,
    TilemapError, Vec2, GUI_HEIGHT_PX, GUI_WIDTH_PX,
};
