use crate::app::rendering::{Canvas, ScreenRect};
use crate::app::{LoopMetricsSnapshot, SceneKey};

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
const OVERLAY_TEXT_SCALE: u32 = 2;
const OVERLAY_MARGIN_PX: i32 = 12;
const OVERLAY_INSET_PX: i32 = 8;
const OVERLAY_TEXT_COLOR: [u8; 4] = [244, 248, 252, 255];
const OVERLAY_HEADER_COLOR: [u8; 4] = [176, 198, 220, 255];
const OVERLAY_PANEL_COLOR: [u8; 4] = [10, 12, 16, 210];
const OVERLAY_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];

// Printable ASCII from ' ' to '~'. Each entry packs five 3-bit rows, top row
// in the highest bits.
const FONT: [u16; 95] = [
    0x0000, 0x2482, 0x5a00, 0x5f7d, 0x7ddf, 0x52a5, 0x2aab, 0x2400,
    0x1491, 0x4494, 0x0aa8, 0x05d0, 0x0014, 0x01c0, 0x0002, 0x12a4,
    0x7b6f, 0x2c97, 0x73e7, 0x73cf, 0x5bc9, 0x79cf, 0x79ef, 0x7292,
    0x7bef, 0x7bcf, 0x0410, 0x0414, 0x1511, 0x0e38, 0x4454, 0x72c2,
    0x7be7, 0x2bed, 0x6bae, 0x7927, 0x6b6e, 0x79a7, 0x79a4, 0x796f,
    0x5bed, 0x7497, 0x726f, 0x5bad, 0x4927, 0x5fed, 0x5ffd, 0x7b6f,
    0x6ba4, 0x7b79, 0x6bad, 0x79cf, 0x7492, 0x5b6f, 0x5b6a, 0x5bfd,
    0x5aad, 0x5a92, 0x72a7, 0x6926, 0x4889, 0x324b, 0x2a00, 0x0007,
    0x4400, 0x0e7f, 0x49ae, 0x0f27, 0x13ef, 0x0fa7, 0x39a4, 0x0f79,
    0x49ad, 0x2092, 0x106a, 0x4bad, 0x4927, 0x0ded, 0x0d6d, 0x0f6f,
    0x0d74, 0x0f79, 0x0d64, 0x0f8f, 0x2e93, 0x0b6f, 0x0b6a, 0x0b7a,
    0x0a95, 0x0b79, 0x0e57, 0x3593, 0x2492, 0x64d6, 0x0780,
];

#[derive(Debug, Clone)]
pub(crate) struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub render_fps_cap: Option<u32>,
    pub slow_frame_delay_ms: u64,
    pub scene: SceneKey,
    pub sprite_count: usize,
    pub scene_lines: Vec<String>,
}

fn glyph_rows(ch: char) -> [u8; GLYPH_HEIGHT as usize] {
    let bits = match ch {
        ' '..='~' => FONT[ch as usize - ' ' as usize],
        _ => FONT['?' as usize - ' ' as usize],
    };
    let mut rows = [0u8; GLYPH_HEIGHT as usize];
    for (index, row) in rows.iter_mut().enumerate() {
        let shift = (GLYPH_HEIGHT as usize - 1 - index) * GLYPH_WIDTH as usize;
        *row = ((bits >> shift) & 0b111) as u8;
    }
    rows
}

pub(crate) fn glyph_advance(scale: u32) -> i32 {
    (GLYPH_WIDTH + 1) * scale.max(1) as i32
}

pub(crate) fn line_advance(scale: u32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale.max(1) as i32
}

/// Pixel width of `text` when drawn at `scale`, without trailing spacing.
pub(crate) fn text_width(text: &str, scale: u32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * glyph_advance(scale) - scale.max(1) as i32
}

/// Draws `text` with its top-left corner at `(x, y)`.
pub(crate) fn draw_text(
    canvas: &mut Canvas<'_>,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
    scale: u32,
) {
    let scale = scale.max(1) as i32;
    for ch in text.chars() {
        for (row_index, row) in glyph_rows(ch).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if row & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                canvas.fill_rect(
                    ScreenRect::new(x + col * scale, y + row_index as i32 * scale, scale, scale),
                    color,
                );
            }
        }
        x += (GLYPH_WIDTH + 1) * scale;
    }
}

pub(crate) fn draw_overlay(canvas: &mut Canvas<'_>, data: &OverlayData) {
    let lines = build_overlay_lines(data);
    let widest = lines
        .iter()
        .map(|line| text_width(line, OVERLAY_TEXT_SCALE))
        .max()
        .unwrap_or(0);
    let panel = ScreenRect::new(
        OVERLAY_MARGIN_PX,
        OVERLAY_MARGIN_PX,
        widest + OVERLAY_INSET_PX * 2,
        lines.len() as i32 * line_advance(OVERLAY_TEXT_SCALE) + OVERLAY_INSET_PX * 2,
    );
    canvas.fill_rect(panel, OVERLAY_PANEL_COLOR);
    canvas.outline_rect(panel, OVERLAY_BORDER_COLOR);

    let x = panel.left + OVERLAY_INSET_PX;
    let mut y = panel.top + OVERLAY_INSET_PX;
    for (index, line) in lines.iter().enumerate() {
        let color = if index == 0 {
            OVERLAY_HEADER_COLOR
        } else {
            OVERLAY_TEXT_COLOR
        };
        draw_text(canvas, x, y, line, color, OVERLAY_TEXT_SCALE);
        y += line_advance(OVERLAY_TEXT_SCALE);
    }
}

fn build_overlay_lines(data: &OverlayData) -> Vec<String> {
    let cap = match data.render_fps_cap {
        Some(cap) => cap.to_string(),
        None => "off".to_string(),
    };
    let mut lines = vec![
        format!("Scene {:?}", data.scene),
        format!("FPS {:.1} cap {cap}", data.metrics.fps),
        format!("TPS {:.1}", data.metrics.tps),
        format!(
            "Frame {:.2} ms max {:.2}",
            data.metrics.frame_time_ms, data.metrics.frame_time_max_ms
        ),
        format!("Sprites {}", data.sprite_count),
    ];
    if data.slow_frame_delay_ms > 0 {
        lines.push(format!("Slow frame {} ms", data.slow_frame_delay_ms));
    }
    lines.extend(data.scene_lines.iter().cloned());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> OverlayData {
        OverlayData {
            metrics: LoopMetricsSnapshot {
                fps: 59.94,
                tps: 60.0,
                frame_time_ms: 16.68,
                frame_time_max_ms: 21.0,
            },
            render_fps_cap: None,
            slow_frame_delay_ms: 0,
            scene: SceneKey::Game,
            sprite_count: 12,
            scene_lines: vec!["Player x 3.2".to_string()],
        }
    }

    #[test]
    fn glyphs_decode_from_packed_rows() {
        assert_eq!(glyph_rows(' '), [0, 0, 0, 0, 0]);
        assert_eq!(glyph_rows('0'), [0b111, 0b101, 0b101, 0b101, 0b111]);
        assert_eq!(glyph_rows('+'), [0b000, 0b010, 0b111, 0b010, 0b000]);
        assert_eq!(glyph_rows('\u{e9}'), glyph_rows('?'));
    }

    #[test]
    fn text_width_follows_scale() {
        assert_eq!(text_width("", 3), 0);
        assert_eq!(text_width("A", 1), 3);
        assert_eq!(text_width("AB", 2), 14);
    }

    #[test]
    fn overlay_lines_include_metrics_and_scene_lines() {
        let lines = build_overlay_lines(&data());
        assert_eq!(lines[0], "Scene Game");
        assert_eq!(lines[1], "FPS 59.9 cap off");
        assert!(lines.iter().any(|line| line == "Player x 3.2"));
        assert!(!lines.iter().any(|line| line.starts_with("Slow")));
    }

    #[test]
    fn overlay_draws_panel_and_survives_tiny_frames() {
        let mut buffer = vec![0u8; 400 * 200 * 4];
        let mut canvas = Canvas::new(&mut buffer, 400, 200);
        draw_overlay(&mut canvas, &data());
        let offset = (OVERLAY_MARGIN_PX as usize * 400 + OVERLAY_MARGIN_PX as usize) * 4;
        assert_eq!(&buffer[offset..offset + 4], &OVERLAY_BORDER_COLOR);

        let mut tiny = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut tiny, 1, 1);
        draw_overlay(&mut canvas, &data());
        draw_text(&mut canvas, -5, -5, "HELLO", [255; 4], 4);
    }
}
