use crate::app::{Camera2D, Rect, Vec2, GUI_HEIGHT_PX, GUI_WIDTH_PX};

use super::raster::ScreenRect;

/// Largest camera-aspect area that fits the window, centred with letterbox
/// bars on the remaining sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitViewport {
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

impl FitViewport {
    pub fn fit(window_width: u32, window_height: u32, camera: &Camera2D) -> Self {
        let window_w = window_width as f32;
        let window_h = window_height as f32;
        let aspect = if camera.viewport_height > 0.0 {
            camera.viewport_width / camera.viewport_height
        } else {
            GUI_WIDTH_PX / GUI_HEIGHT_PX
        };

        let (width, height) = if window_w / window_h.max(1.0) > aspect {
            (window_h * aspect, window_h)
        } else {
            (window_w, window_w / aspect)
        };
        Self {
            offset_x: ((window_w - width) * 0.5).round(),
            offset_y: ((window_h - height) * 0.5).round(),
            width,
            height,
        }
    }

    pub fn pixels_per_world(&self, camera: &Camera2D) -> f32 {
        if camera.viewport_width > 0.0 {
            self.width / camera.viewport_width
        } else {
            1.0
        }
    }

    pub fn gui_scale(&self) -> f32 {
        self.width / GUI_WIDTH_PX
    }

    pub fn world_to_screen(&self, camera: &Camera2D, world: Vec2) -> (f32, f32) {
        let ppw = self.pixels_per_world(camera);
        let x = self.offset_x + self.width * 0.5 + (world.x - camera.position.x) * ppw;
        let y = self.offset_y + self.height * 0.5 - (world.y - camera.position.y) * ppw;
        (x, y)
    }

    pub(crate) fn world_rect_to_screen(&self, camera: &Camera2D, rect: &Rect) -> ScreenRect {
        let (left, bottom) = self.world_to_screen(camera, Vec2::new(rect.x, rect.y));
        let max = rect.max();
        let (right, top) = self.world_to_screen(camera, max);
        ScreenRect {
            left: left.round() as i32,
            top: top.round() as i32,
            right: right.round() as i32,
            bottom: bottom.round() as i32,
        }
    }

    pub fn gui_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        let scale = self.gui_scale();
        (self.offset_x + x * scale, self.offset_y + y * scale)
    }

    pub(crate) fn gui_rect_to_screen(&self, x: f32, y: f32, width: f32, height: f32) -> ScreenRect {
        let (left, top) = self.gui_to_screen(x, y);
        let (right, bottom) = self.gui_to_screen(x + width, y + height);
        ScreenRect {
            left: left.round() as i32,
            top: top.round() as i32,
            right: right.round() as i32,
            bottom: bottom.round() as i32,
        }
    }

    pub(crate) fn content_rect(&self) -> ScreenRect {
        ScreenRect::new(
            self.offset_x as i32,
            self.offset_y as i32,
            self.width.round() as i32,
            self.height.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-3
    }

    #[test]
    fn matching_aspect_fills_the_window() {
        let camera = Camera2D::default();
        let viewport = FitViewport::fit(1280, 720, &camera);
        assert_eq!(viewport.offset_x, 0.0);
        assert_eq!(viewport.offset_y, 0.0);
        assert!(approx(viewport.pixels_per_world(&camera), 100.0));
        assert!(approx(viewport.gui_scale(), 1.0));
    }

    #[test]
    fn wide_window_gets_pillarboxed() {
        let camera = Camera2D::default();
        let viewport = FitViewport::fit(1920, 720, &camera);
        assert!(approx(viewport.width, 1280.0));
        assert_eq!(viewport.offset_x, 320.0);
        assert_eq!(viewport.offset_y, 0.0);
    }

    #[test]
    fn tall_window_gets_letterboxed() {
        let camera = Camera2D::default();
        let viewport = FitViewport::fit(640, 720, &camera);
        assert!(approx(viewport.height, 360.0));
        assert_eq!(viewport.offset_y, 180.0);
        assert!(approx(viewport.gui_scale(), 0.5));
    }

    #[test]
    fn camera_centre_maps_to_content_centre_with_y_flipped() {
        let camera = Camera2D {
            position: Vec2::new(10.0, 3.6),
            ..Camera2D::default()
        };
        let viewport = FitViewport::fit(1280, 720, &camera);
        let (x, y) = viewport.world_to_screen(&camera, Vec2::new(10.0, 3.6));
        assert!(approx(x, 640.0) && approx(y, 360.0));

        let rect = viewport.world_rect_to_screen(&camera, &Rect::new(10.0, 3.6, 1.0, 1.0));
        assert_eq!(rect, ScreenRect { left: 640, top: 260, right: 740, bottom: 360 });
    }

    #[test]
    fn gui_rect_scales_with_viewport() {
        let camera = Camera2D::default();
        let viewport = FitViewport::fit(2560, 1440, &camera);
        let rect = viewport.gui_rect_to_screen(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect, ScreenRect::new(20, 40, 60, 80));
    }
}
