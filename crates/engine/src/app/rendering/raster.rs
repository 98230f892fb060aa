/// Screen rectangle in pixels, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    fn clipped(&self, width: u32, height: u32) -> Self {
        Self {
            left: self.left.max(0),
            top: self.top.max(0),
            right: self.right.min(width as i32),
            bottom: self.bottom.min(height as i32),
        }
    }
}

pub(crate) struct LoadedSprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// RGBA8 frame buffer view. Every write is clipped to the buffer.
pub(crate) struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(pixels: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        (offset + 4 <= self.pixels.len()).then_some(offset)
    }

    pub fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset..offset + 4].copy_from_slice(&color);
        }
    }

    pub fn blend(&mut self, x: i32, y: i32, color: [u8; 4]) {
        match color[3] {
            0 => {}
            255 => self.put(x, y, color),
            alpha => {
                if let Some(offset) = self.offset(x, y) {
                    let dst = &mut self.pixels[offset..offset + 4];
                    for channel in 0..3 {
                        dst[channel] = mix(color[channel], dst[channel], alpha);
                    }
                    dst[3] = 255;
                }
            }
        }
    }

    pub fn fill_rect(&mut self, rect: ScreenRect, color: [u8; 4]) {
        let clip = rect.clipped(self.width, self.height);
        for y in clip.top..clip.bottom {
            for x in clip.left..clip.right {
                self.blend(x, y, color);
            }
        }
    }

    pub fn outline_rect(&mut self, rect: ScreenRect, color: [u8; 4]) {
        if rect.width() <= 1 || rect.height() <= 1 {
            return;
        }
        let ScreenRect {
            left,
            top,
            right,
            bottom,
        } = rect;
        self.fill_rect(ScreenRect::new(left, top, rect.width(), 1), color);
        self.fill_rect(ScreenRect::new(left, bottom - 1, rect.width(), 1), color);
        self.fill_rect(ScreenRect::new(left, top, 1, rect.height()), color);
        self.fill_rect(ScreenRect::new(right - 1, top, 1, rect.height()), color);
    }

    /// Nearest-neighbour stretch of `sprite` into `dest` with a multiplicative
    /// tint and alpha blending.
    pub fn blit(&mut self, sprite: &LoadedSprite, dest: ScreenRect, flip_x: bool, tint: [u8; 4]) {
        if sprite.width == 0 || sprite.height == 0 || dest.is_empty() {
            return;
        }
        if sprite.rgba.len() < sprite.width as usize * sprite.height as usize * 4 {
            return;
        }

        let clip = dest.clipped(self.width, self.height);
        let scale_x = sprite.width as f32 / dest.width() as f32;
        let scale_y = sprite.height as f32 / dest.height() as f32;
        for y in clip.top..clip.bottom {
            let src_y = (((y - dest.top) as f32 + 0.5) * scale_y) as u32;
            let src_y = src_y.min(sprite.height - 1) as usize;
            for x in clip.left..clip.right {
                let mut src_x = (((x - dest.left) as f32 + 0.5) * scale_x) as u32;
                src_x = src_x.min(sprite.width - 1);
                if flip_x {
                    src_x = sprite.width - 1 - src_x;
                }
                let offset = (src_y * sprite.width as usize + src_x as usize) * 4;
                let texel = &sprite.rgba[offset..offset + 4];
                self.blend(
                    x,
                    y,
                    [
                        modulate(texel[0], tint[0]),
                        modulate(texel[1], tint[1]),
                        modulate(texel[2], tint[2]),
                        modulate(texel[3], tint[3]),
                    ],
                );
            }
        }
    }

    /// Replaces colour with luminance inside `region`.
    pub fn monochrome(&mut self, region: ScreenRect) {
        let clip = region.clipped(self.width, self.height);
        for y in clip.top..clip.bottom {
            for x in clip.left..clip.right {
                if let Some(offset) = self.offset(x, y) {
                    let px = &mut self.pixels[offset..offset + 4];
                    let luma = ((px[0] as u32 * 77 + px[1] as u32 * 150 + px[2] as u32 * 29) >> 8)
                        as u8;
                    px[0] = luma;
                    px[1] = luma;
                    px[2] = luma;
                }
            }
        }
    }
}

fn mix(src: u8, dst: u8, alpha: u8) -> u8 {
    let alpha = alpha as u32;
    ((src as u32 * alpha + dst as u32 * (255 - alpha) + 127) / 255) as u8
}

fn modulate(value: u8, factor: u8) -> u8 {
    ((value as u32 * factor as u32 + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]
    }

    #[test]
    fn writes_outside_the_buffer_are_ignored() {
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);
        canvas.put(-1, 0, [255; 4]);
        canvas.put(4, 4, [255; 4]);
        canvas.fill_rect(ScreenRect::new(-10, -1, 100, 2), [255, 0, 0, 255]);
        canvas.outline_rect(ScreenRect::new(2, 2, 10, 10), [0, 255, 0, 255]);
        assert_eq!(pixel(&buffer, 4, 3, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&buffer, 4, 2, 3), [0, 255, 0, 255]);
        assert_eq!(pixel(&buffer, 4, 3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn half_alpha_blends_halfway() {
        let mut buffer = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut buffer, 1, 1);
        canvas.clear([0, 0, 0, 255]);
        canvas.blend(0, 0, [255, 255, 255, 128]);
        assert_eq!(pixel(&buffer, 1, 0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn blit_flips_and_scales_nearest_neighbour() {
        let sprite = LoadedSprite {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let mut buffer = vec![0u8; 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 1);
        canvas.blit(&sprite, ScreenRect::new(0, 0, 4, 1), true, [255; 4]);
        assert_eq!(pixel(&buffer, 4, 0, 0), [0, 0, 255, 255]);
        assert_eq!(pixel(&buffer, 4, 1, 0), [0, 0, 255, 255]);
        assert_eq!(pixel(&buffer, 4, 3, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn transparent_texels_and_zero_tint_alpha_leave_background() {
        let sprite = LoadedSprite {
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        };
        let mut buffer = vec![9u8; 4];
        let mut canvas = Canvas::new(&mut buffer, 1, 1);
        canvas.blit(&sprite, ScreenRect::new(0, 0, 1, 1), false, [255, 255, 255, 0]);
        assert_eq!(pixel(&buffer, 1, 0, 0), [9, 9, 9, 9]);
    }

    #[test]
    fn monochrome_equalises_channels_inside_region_only() {
        let mut buffer = vec![0u8; 2 * 4];
        let mut canvas = Canvas::new(&mut buffer, 2, 1);
        canvas.clear([200, 40, 10, 255]);
        canvas.monochrome(ScreenRect::new(0, 0, 1, 1));
        let grey = pixel(&buffer, 2, 0, 0);
        assert_eq!(grey[0], grey[1]);
        assert_eq!(grey[1], grey[2]);
        assert_eq!(pixel(&buffer, 2, 1, 0), [200, 40, 10, 255]);
    }
}
