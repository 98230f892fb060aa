mod atomic_io;
mod defs;
mod error;
mod tmx;

pub use atomic_io::write_text_atomic;
pub use defs::{load_animation_library, parse_animation_library, AnimationLibrary};
pub use error::{ContentErrorCode, ContentLoadError, SourceLocation};
pub use tmx::{
    load_tiled_map, parse_tiled_map, MapObject, MapObjectGroup, MapTileLayer, MapTileset, TiledMap,
};
