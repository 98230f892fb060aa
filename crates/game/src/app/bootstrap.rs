use std::cell::RefCell;
use std::rc::Rc;

use shinobi_engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, AssetError, GameAssets};
use super::preferences::{PreferencesStore, PREFERENCES_FILE};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) menu: Box<dyn Scene>,
    pub(crate) game: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load game assets: {0}")]
    Assets(#[from] AssetError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Shinobi Run Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        assets = %paths.assets_dir.display(),
        config = %paths.config_dir.display(),
        "app_paths_resolved"
    );

    let assets = Rc::new(GameAssets::load(&paths.assets_dir)?);
    let preferences = Rc::new(RefCell::new(PreferencesStore::open(
        paths.config_dir.join(PREFERENCES_FILE),
    )));
    let (menu, game) = gameplay::build_scene_pair(assets, preferences);
    let config = LoopConfig {
        asset_root: paths.assets_dir,
        ..LoopConfig::default()
    };

    Ok(AppWiring { config, menu, game })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
