use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::tools::{draw_overlay, draw_text, text_width, OverlayData};
use crate::app::{Camera2D, HudItem, PostEffect, Rect, SceneWorld, Sprite, Tilemap};
use crate::sprite_keys::sprite_image_path;

use super::raster::{Canvas, LoadedSprite};
use super::transform::FitViewport;

const LETTERBOX_COLOR: [u8; 4] = [0, 0, 0, 255];
const DEBUG_SOLID_COLOR: [u8; 4] = [90, 230, 110, 255];
const DEBUG_SENSOR_COLOR: [u8; 4] = [250, 200, 60, 255];
const TILE_FALLBACK_COLOR: [u8; 4] = [96, 84, 70, 255];

/// Inclusive column/row span of a tilemap that intersects a world rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileSpan {
    col_min: u32,
    col_max: u32,
    row_min: u32,
    row_max: u32,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_sprite_keys: HashSet<String>,
    draw_order: Vec<usize>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
            asset_root,
            sprite_cache: HashMap::new(),
            warned_sprite_keys: HashSet::new(),
            draw_order: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        overlay: Option<&OverlayData>,
    ) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        let camera = world.camera();
        let viewport = FitViewport::fit(self.width, self.height, camera);
        let content = viewport.content_rect();
        let mut sprites = SpriteStore {
            asset_root: self.asset_root.as_path(),
            cache: &mut self.sprite_cache,
            warned: &mut self.warned_sprite_keys,
        };
        collect_draw_order(world.sprites(), &mut self.draw_order);

        let (width, height) = (self.width, self.height);
        let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height);
        canvas.clear(LETTERBOX_COLOR);
        canvas.fill_rect(content, opaque(world.clear_color()));

        if let Some(key) = world.background() {
            if let Some(image) = sprites.resolve(key) {
                canvas.blit(image, content, false, [255; 4]);
            }
        }

        let view = camera.view_rect();
        for layer in world.tile_layers() {
            let Some(span) = visible_tile_span(&layer.tilemap, &view) else {
                continue;
            };
            for row in span.row_min..=span.row_max {
                for col in span.col_min..=span.col_max {
                    let Some(gid) = layer.tilemap.tile_at(col, row).filter(|gid| *gid != 0) else {
                        continue;
                    };
                    let Some(rect) = layer.tilemap.tile_rect(col, row) else {
                        continue;
                    };
                    let dest = viewport.world_rect_to_screen(camera, &rect);
                    let image = match layer.region_key(gid) {
                        Some(key) => sprites.resolve(&key),
                        None => None,
                    };
                    match image {
                        Some(image) => canvas.blit(image, dest, false, [255; 4]),
                        None => canvas.fill_rect(dest, TILE_FALLBACK_COLOR),
                    }
                }
            }
        }

        for &index in &self.draw_order {
            let Some(sprite) = world.sprites().get(index) else {
                continue;
            };
            let desc = &sprite.desc;
            if !desc.bounds.overlaps(&view) {
                continue;
            }
            let dest = viewport.world_rect_to_screen(camera, &desc.bounds);
            let image = match desc.region.as_deref() {
                Some(key) => sprites.resolve(key),
                None => None,
            };
            match image {
                Some(image) => canvas.blit(image, dest, desc.flip_x, desc.tint),
                None => canvas.fill_rect(dest, desc.fallback_color),
            }
        }

        for shape in world.debug_shapes() {
            let rect = Rect::new(
                shape.min.x,
                shape.min.y,
                shape.max.x - shape.min.x,
                shape.max.y - shape.min.y,
            );
            let color = if shape.sensor {
                DEBUG_SENSOR_COLOR
            } else {
                DEBUG_SOLID_COLOR
            };
            canvas.outline_rect(viewport.world_rect_to_screen(camera, &rect), color);
        }

        if world.post_effect() == PostEffect::Monochrome {
            canvas.monochrome(content);
        }

        for item in world.hud() {
            draw_hud_item(&mut canvas, &viewport, camera, &mut sprites, item);
        }

        if let Some(overlay) = overlay {
            draw_overlay(&mut canvas, overlay);
        }

        self.pixels.render()
    }
}

/// Lazily decoded sprite images keyed by region key. Failed loads are cached
/// as `None` so each key is read from disk once.
struct SpriteStore<'a> {
    asset_root: &'a Path,
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned: &'a mut HashSet<String>,
}

impl SpriteStore<'_> {
    fn resolve(&mut self, key: &str) -> Option<&LoadedSprite> {
        if !self.cache.contains_key(key) {
            let loaded = match sprite_image_path(self.asset_root, key) {
                Ok(path) => match load_sprite_rgba(&path) {
                    Ok(sprite) => Some(sprite),
                    Err(reason) => {
                        warn_sprite_load_once(self.warned, key, Some(&path), &reason);
                        None
                    }
                },
                Err(error) => {
                    let reason = format!("invalid_key:{error}");
                    warn_sprite_load_once(self.warned, key, None, &reason);
                    None
                }
            };
            self.cache.insert(key.to_string(), loaded);
        }
        self.cache.get(key).and_then(Option::as_ref)
    }
}

fn draw_hud_item(
    canvas: &mut Canvas<'_>,
    viewport: &FitViewport,
    camera: &Camera2D,
    sprites: &mut SpriteStore<'_>,
    item: &HudItem,
) {
    match item {
        HudItem::Text {
            x,
            y,
            text,
            color,
            scale,
        } => {
            let (sx, sy) = viewport.gui_to_screen(*x, *y);
            let scale = screen_text_scale(*scale, viewport.gui_scale());
            draw_text(canvas, sx.round() as i32, sy.round() as i32, text, *color, scale);
        }
        HudItem::Icon {
            key,
            x,
            y,
            width,
            height,
            tint,
            fallback_color,
        } => {
            let dest = viewport.gui_rect_to_screen(*x, *y, *width, *height);
            match sprites.resolve(key) {
                Some(image) => canvas.blit(image, dest, false, *tint),
                None => canvas.fill_rect(dest, *fallback_color),
            }
        }
        HudItem::Rect {
            x,
            y,
            width,
            height,
            color,
        } => canvas.fill_rect(viewport.gui_rect_to_screen(*x, *y, *width, *height), *color),
        HudItem::WorldText {
            position,
            text,
            color,
            scale,
        } => {
            let (sx, sy) = viewport.world_to_screen(camera, *position);
            let scale = screen_text_scale(*scale, viewport.gui_scale());
            let left = sx.round() as i32 - text_width(text, scale) / 2;
            draw_text(canvas, left, sy.round() as i32, text, *color, scale);
        }
    }
}

fn screen_text_scale(gui_scale_px: u32, gui_scale: f32) -> u32 {
    ((gui_scale_px.max(1) as f32 * gui_scale).round() as u32).max(1)
}

fn opaque(mut color: [u8; 4]) -> [u8; 4] {
    color[3] = 255;
    color
}

/// Visible sprite indices ordered by layer, then by the order they entered
/// the world.
fn collect_draw_order(sprites: &[Sprite], out: &mut Vec<usize>) {
    out.clear();
    out.extend(
        sprites
            .iter()
            .enumerate()
            .filter(|(_, sprite)| sprite.desc.visible)
            .map(|(index, _)| index),
    );
    out.sort_by_key(|&index| {
        let sprite = &sprites[index];
        (sprite.desc.layer, sprite.applied_spawn_order())
    });
}

fn visible_tile_span(tilemap: &Tilemap, view: &Rect) -> Option<TileSpan> {
    let size = tilemap.tile_size();
    if tilemap.width() == 0 || tilemap.height() == 0 || size <= 0.0 {
        return None;
    }
    let origin = tilemap.origin();
    let max = view.max();
    let col_lo = ((view.x - origin.x) / size).floor();
    let col_hi = ((max.x - origin.x) / size).floor();
    let row_lo = ((view.y - origin.y) / size).floor();
    let row_hi = ((max.y - origin.y) / size).floor();

    let last_col = (tilemap.width() - 1) as f32;
    let last_row = (tilemap.height() - 1) as f32;
    if col_hi < 0.0 || row_hi < 0.0 || col_lo > last_col || row_lo > last_row {
        return None;
    }
    Some(TileSpan {
        col_min: col_lo.max(0.0) as u32,
        col_max: col_hi.min(last_col) as u32,
        row_min: row_lo.max(0.0) as u32,
        row_max: row_hi.min(last_row) as u32,
    })
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{SpriteDesc, SpriteLayer, Vec2};

    fn tilemap(width: u32, height: u32) -> Tilemap {
        let tiles = vec![1; (width * height) as usize];
        Tilemap::new(width, height, Vec2::ZERO, 0.5, tiles).expect("tilemap")
    }

    #[test]
    fn tile_span_clamps_to_map_bounds() {
        let map = tilemap(100, 10);
        let span = visible_tile_span(&map, &Rect::new(-1.0, -1.0, 12.8, 7.2)).expect("span");
        assert_eq!(span.col_min, 0);
        assert_eq!(span.row_min, 0);
        assert_eq!(span.col_max, 23);
        assert_eq!(span.row_max, 9);
    }

    #[test]
    fn tile_span_follows_scrolled_view() {
        let map = tilemap(100, 10);
        let span = visible_tile_span(&map, &Rect::new(10.2, 0.0, 12.8, 7.2)).expect("span");
        assert_eq!(span.col_min, 20);
        assert_eq!(span.col_max, 46);
    }

    #[test]
    fn tile_span_is_none_when_view_misses_map() {
        let map = tilemap(4, 4);
        assert!(visible_tile_span(&map, &Rect::new(10.0, 0.0, 2.0, 2.0)).is_none());
        assert!(visible_tile_span(&map, &Rect::new(-5.0, 0.0, 2.0, 2.0)).is_none());
    }

    #[test]
    fn draw_order_sorts_by_layer_then_spawn_order() {
        let mut world = SceneWorld::default();
        let effect = world.spawn_sprite(SpriteDesc {
            layer: SpriteLayer::Effects,
            ..SpriteDesc::default()
        });
        let actor = world.spawn_sprite(SpriteDesc::default());
        let hidden = world.spawn_sprite(SpriteDesc {
            visible: false,
            ..SpriteDesc::default()
        });
        let backdrop = world.spawn_sprite(SpriteDesc {
            layer: SpriteLayer::Backdrop,
            ..SpriteDesc::default()
        });
        world.apply_pending();

        let mut order = Vec::new();
        collect_draw_order(world.sprites(), &mut order);
        let ids: Vec<_> = order.iter().map(|&i| world.sprites()[i].id).collect();
        assert_eq!(ids, vec![backdrop, actor, effect]);
        assert!(!ids.contains(&hidden));
    }

    #[test]
    fn text_scale_tracks_gui_scale_with_floor_of_one() {
        assert_eq!(screen_text_scale(2, 1.0), 2);
        assert_eq!(screen_text_scale(2, 1.5), 3);
        assert_eq!(screen_text_scale(1, 0.25), 1);
        assert_eq!(screen_text_scale(0, 1.0), 1);
    }

    #[test]
    fn sprite_store_caches_missing_images_and_warns_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let mut store = SpriteStore {
            asset_root: dir.path(),
            cache: &mut cache,
            warned: &mut warned,
        };
        assert!(store.resolve("item/coin_1").is_none());
        assert!(store.resolve("item/coin_1").is_none());
        assert!(store.resolve("Bad Key").is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(warned.len(), 2);
    }

    #[test]
    fn sprite_store_decodes_png_from_sprites_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sprite_dir = dir.path().join("sprites").join("item");
        std::fs::create_dir_all(&sprite_dir).expect("mkdir");
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        image.save(sprite_dir.join("crate.png")).expect("save");

        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let mut store = SpriteStore {
            asset_root: dir.path(),
            cache: &mut cache,
            warned: &mut warned,
        };
        let loaded = store.resolve("item/crate").expect("sprite");
        assert_eq!((loaded.width, loaded.height), (3, 2));
        assert_eq!(&loaded.rgba[0..4], &[10, 20, 30, 255]);
        assert!(warned.is_empty());
    }
}
