const PLAYER_ANIMATIONS: [&str; 11] = [
    "idle",
    "run",
    "jump",
    "glide",
    "climb",
    "dead",
    "attack",
    "throw",
    "jump_attack",
    "jump_throw",
    "slide",
];
const PLAYER_REGIONS: [&str; 2] = ["head", "kunai"];
const ZOMBIE_ANIMATIONS: [&str; 8] = [
    "male_idle",
    "male_walk",
    "male_dead",
    "male_attack",
    "female_idle",
    "female_walk",
    "female_dead",
    "female_attack",
];
const ROBOT_ANIMATIONS: [&str; 9] = [
    "idle",
    "run",
    "shoot",
    "run_shoot",
    "jump",
    "jump_shoot",
    "jump_melee",
    "slide",
    "dead",
];
const ROBOT_REGIONS: [&str; 1] = ["bullet"];
const ITEM_ANIMATIONS: [&str; 1] = ["coin"];
const ITEM_REGIONS: [&str; 6] = ["coin_icon", "feather", "crate", "cloud1", "cloud2", "cloud3"];
const BACKGROUND_REGIONS: [&str; 4] = ["bg0", "bg1", "bg2", "bg3"];

const ZOMBIE_ATLAS: &str = "zombie";
const ROBOT_ATLAS: &str = "robot";
const ITEM_ATLAS: &str = "item";
const BACKGROUND_ATLAS: &str = "bg";

/// Every animation and region the game looks up by name.
fn required_animations() -> Vec<(&'static str, &'static str)> {
    let mut required = Vec::new();
    for atlas in [Character::Boy.atlas(), Character::Girl.atlas()] {
        required.extend(PLAYER_ANIMATIONS.iter().map(|name| (atlas, *name)));
    }
    required.extend(ZOMBIE_ANIMATIONS.iter().map(|name| (ZOMBIE_ATLAS, *name)));
    required.extend(ROBOT_ANIMATIONS.iter().map(|name| (ROBOT_ATLAS, *name)));
    required.extend(ITEM_ANIMATIONS.iter().map(|name| (ITEM_ATLAS, *name)));
    required
}

fn required_regions() -> Vec<(&'static str, &'static str)> {
    let mut required = Vec::new();
    for atlas in [Character::Boy.atlas(), Character::Girl.atlas()] {
        required.extend(PLAYER_REGIONS.iter().map(|name| (atlas, *name)));
    }
    required.extend(ROBOT_REGIONS.iter().map(|name| (ROBOT_ATLAS, *name)));
    required.extend(ITEM_REGIONS.iter().map(|name| (ITEM_ATLAS, *name)));
    required.extend(BACKGROUND_REGIONS.iter().map(|name| (BACKGROUND_ATLAS, *name)));
    required
}

#[derive(Debug, Error)]
pub(crate) enum AssetError {
    #[error(transparent)]
    Content(#[from] ContentLoadError),
    #[error("animation '{atlas}/{name}' is not defined")]
    MissingAnimation { atlas: String, name: String },
    #[error("region '{atlas}/{name}' is not defined")]
    MissingRegion { atlas: String, name: String },
    #[error("map has no '{group}' object group")]
    MissingObjectGroup { group: &'static str },
}

/// Animation library and level map, loaded once at startup and shared by
/// both scenes.
#[derive(Debug)]
pub(crate) struct GameAssets {
    library: AnimationLibrary,
    map: TiledMap,
}

impl GameAssets {
    pub(crate) fn load(assets_dir: &Path) -> Result<Self, AssetError> {
        let library = load_animation_library(&assets_dir.join(ANIMATION_DEFS_PATH))?;
        let map = load_tiled_map(&assets_dir.join(LEVEL_MAP_PATH))?;
        let assets = Self::from_parts(library, map)?;
        info!(
            animations = assets.library.animation_count(),
            regions = assets.library.region_count(),
            map_width = assets.map.width,
            map_height = assets.map.height,
            "game_assets_loaded"
        );
        Ok(assets)
    }

    fn from_parts(library: AnimationLibrary, map: TiledMap) -> Result<Self, AssetError> {
        for (atlas, name) in required_animations() {
            if library.animation(atlas, name).is_none() {
                return Err(AssetError::MissingAnimation {
                    atlas: atlas.to_string(),
                    name: name.to_string(),
                });
            }
        }
        for (atlas, name) in required_regions() {
            if library.region(atlas, name).is_none() {
                return Err(AssetError::MissingRegion {
                    atlas: atlas.to_string(),
                    name: name.to_string(),
                });
            }
        }
        if map.object_group("ground").is_none() {
            return Err(AssetError::MissingObjectGroup { group: "ground" });
        }
        Ok(Self { library, map })
    }

    fn map(&self) -> &TiledMap {
        &self.map
    }

    fn map_width_metres(&self) -> f32 {
        self.map.pixel_width() / PPM
    }

    fn animation_duration(&self, atlas: &str, name: &str) -> f32 {
        self.library
            .animation(atlas, name)
            .map(|animation| animation.duration())
            .unwrap_or(0.0)
    }

    /// Frame key for `state_time`; `looping` overrides the defined play mode.
    fn frame(&self, atlas: &str, name: &str, state_time: f32, looping: bool) -> Option<String> {
        self.library
            .animation(atlas, name)
            .and_then(|animation| animation.key_frame_looping(state_time, looping))
            .cloned()
    }

    fn region(&self, atlas: &str, name: &str) -> Option<String> {
        self.library.region(atlas, name).map(str::to_string)
    }

    fn background(&self, index: usize) -> Option<String> {
        BACKGROUND_REGIONS
            .get(index)
            .and_then(|name| self.region(BACKGROUND_ATLAS, name))
    }

    /// Tile layers in world units: row 0 at the bottom, one metre grid per
    /// map tile.
    fn tile_layers(&self) -> Result<Vec<TileLayer>, TilemapError> {
        let map = &self.map;
        let mut sources: Vec<TileSource> = map
            .tilesets
            .iter()
            .map(|tileset| TileSource {
                first_gid: tileset.first_gid,
                key_prefix: format!("tiles/{}", tileset.name),
            })
            .collect();
        sources.sort_by_key(|source| source.first_gid);

        let tile_size = map.tile_width as f32 / PPM;
        map.tile_layers
            .iter()
            .map(|layer| {
                // TMX rows run top to bottom.
                let mut tiles = Vec::with_capacity(layer.gids.len());
                for row in (0..layer.height).rev() {
                    for column in 0..layer.width {
                        tiles.push(layer.gid_at(column, row).unwrap_or(0));
                    }
                }
                let tilemap =
                    Tilemap::new(layer.width, layer.height, Vec2::ZERO, tile_size, tiles)?;
                Ok(TileLayer {
                    name: layer.name.clone(),
                    tilemap,
                    sources: sources.clone(),
                })
            })
            .collect()
    }
}
