use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod animation;
pub mod app;
pub mod content;
pub mod physics;
mod sprite_keys;

pub use animation::{Animation, PlayMode};
pub use app::{
    run_app, run_app_with_metrics, AppError, Camera2D, DebugShape, FitViewport, HudItem,
    InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle, PostEffect, Rect,
    Scene, SceneCommand, SceneKey, SceneWorld, Sprite, SpriteDesc, SpriteId, SpriteLayer,
    TileLayer, TileSource, Tilemap, TilemapError, Vec2, GUI_HEIGHT_PX, GUI_WIDTH_PX,
    SLOW_FRAME_ENV_VAR,
};
pub use content::{
    load_animation_library, load_tiled_map, parse_animation_library, parse_tiled_map,
    write_text_atomic, AnimationLibrary, ContentErrorCode, ContentLoadError, MapObject,
    MapObjectGroup, MapTileLayer, MapTileset, SourceLocation, TiledMap,
};
pub use physics::{
    BodyDef, BodyHandle, BodyKind, CollisionFilter, Contact, ContactPhase, FixedStepper,
    FixtureDef, FixtureTag, PhysicsError, PhysicsWorld, Shape,
};
pub use sprite_keys::{validate_sprite_key, SpriteKeyError};

pub const ROOT_ENV_VAR: &str = "SHINOBI_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            assets_dir: root.join("assets"),
            config_dir: root.join("config"),
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create config directory at {path}: {source}")]
    CreateConfigDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "SHINOBI_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/shinobi\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::from_root(resolve_root()?);

    fs::create_dir_all(&paths.config_dir).map_err(|source| StartupError::CreateConfigDir {
        path: paths.config_dir.clone(),
        source,
    })?;

    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            find_root_upward(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("assets")).expect("assets dir");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_search_walks_up_from_nested_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        fs::create_dir_all(temp.path().join("crates")).expect("crates dir");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested dir");

        let found = find_root_upward(&nested).expect("root");
        assert_eq!(found, normalize_path(temp.path()));
    }

    #[test]
    fn app_paths_layout_is_relative_to_root() {
        let paths = AppPaths::from_root(PathBuf::from("/games/shinobi"));
        assert_eq!(paths.assets_dir, PathBuf::from("/games/shinobi/assets"));
        assert_eq!(paths.config_dir, PathBuf::from("/games/shinobi/config"));
    }
}
