const HUD_ICON_SIZE: f32 = 35.0;
const HUD_MARGIN: f32 = 18.0;
const HUD_HEAD_SPACING: f32 = 50.0;
const HUD_SCORE_SCALE: u32 = 5;
const HUD_FPS_SCALE: u32 = 3;
const HUD_GAME_OVER_SCALE: u32 = 8;
const HUD_WHITE: [u8; 4] = [255, 255, 255, 255];
const HUD_GREY: [u8; 4] = [110, 110, 110, 255];
const FPS_GOOD: f32 = 45.0;
const FPS_FAIR: f32 = 30.0;

/// Width of HUD text in GUI pixels for the overlay font (3 px glyphs plus
/// 1 px spacing per scale unit).
fn hud_text_width(text: &str, scale: u32) -> f32 {
    let count = text.chars().count() as f32;
    if count == 0.0 {
        return 0.0;
    }
    count * 4.0 * scale as f32 - scale as f32
}

fn fps_color(fps: f32) -> [u8; 4] {
    if fps >= FPS_GOOD {
        [80, 220, 90, 255]
    } else if fps >= FPS_FAIR {
        [235, 210, 60, 255]
    } else {
        [230, 70, 60, 255]
    }
}

/// What the in-game HUD reads each tick.
struct HudView<'a> {
    values: &'a ValueManager,
    feather_left: f32,
    fps: Option<f32>,
    clock: f32,
    coin_icon: Option<&'a str>,
    head_icon: Option<&'a str>,
    feather_icon: Option<&'a str>,
}

fn icon(
    key: Option<&str>,
    x: f32,
    y: f32,
    size: f32,
    tint: [u8; 4],
    fallback: [u8; 4],
) -> HudItem {
    HudItem::Icon {
        key: key.unwrap_or_default().to_string(),
        x,
        y,
        width: size,
        height: size,
        tint,
        fallback_color: fallback,
    }
}

fn build_game_hud(view: &HudView<'_>) -> Vec<HudItem> {
    let values = view.values;
    let mut items = Vec::new();

    // Score: the coin shakes while the counter catches up.
    let (shake_x, shake_y) = if values.is_score_easing() {
        ((view.clock * 40.0).sin() * 2.0, (view.clock * 50.0).cos() * 2.0)
    } else {
        (0.0, 0.0)
    };
    items.push(icon(
        view.coin_icon,
        HUD_MARGIN + shake_x,
        HUD_MARGIN + shake_y,
        HUD_ICON_SIZE,
        HUD_WHITE,
        [240, 200, 40, 255],
    ));
    items.push(HudItem::Text {
        x: 70.0,
        y: 25.0,
        text: (values.score_visual.floor() as u32).to_string(),
        color: HUD_WHITE,
        scale: HUD_SCORE_SCALE,
    });

    let lives = values.lives.max(0) as usize;
    let slots = lives.max(LIVES_START as usize);
    let fading = values.lives_visual - values.lives as f32;
    for slot in 0..slots {
        let x = GUI_WIDTH_PX - HUD_HEAD_SPACING - (slots - slot) as f32 * HUD_HEAD_SPACING;
        let y = HUD_MARGIN;
        if slot < lives {
            items.push(icon(
                view.head_icon,
                x,
                y,
                HUD_ICON_SIZE,
                HUD_WHITE,
                [230, 120, 40, 255],
            ));
            continue;
        }
        items.push(icon(
            view.head_icon,
            x,
            y,
            HUD_ICON_SIZE,
            HUD_GREY,
            [90, 90, 90, 255],
        ));
        if slot == lives && fading > 0.0 {
            let fraction = fading.min(1.0);
            let size = HUD_ICON_SIZE * fraction;
            let inset = (HUD_ICON_SIZE - size) / 2.0;
            let alpha = (fraction * 255.0).round() as u8;
            items.push(icon(
                view.head_icon,
                x + inset,
                y + inset,
                size,
                [255, 255, 255, alpha],
                [230, 120, 40, alpha],
            ));
        }
    }

    if view.feather_left > 0.0 {
        let dimmed = view.feather_left < FEATHER_BLINK_BELOW_SECONDS
            && (view.feather_left * 5.0) as u32 % 2 == 1;
        let alpha = if dimmed { 128 } else { 255 };
        items.push(icon(
            view.feather_icon,
            HUD_MARGIN,
            60.0,
            HUD_ICON_SIZE,
            [255, 255, 255, alpha],
            [240, 240, 240, alpha],
        ));
        items.push(HudItem::Text {
            x: 70.0,
            y: 67.0,
            text: (view.feather_left as u32).to_string(),
            color: HUD_WHITE,
            scale: HUD_FPS_SCALE,
        });
    }

    if let Some(fps) = view.fps {
        let text = format!("FPS {}", fps.round() as u32);
        items.push(HudItem::Text {
            x: GUI_WIDTH_PX - HUD_MARGIN - hud_text_width(&text, HUD_FPS_SCALE),
            y: GUI_HEIGHT_PX - HUD_MARGIN - 5.0 * HUD_FPS_SCALE as f32,
            text,
            color: fps_color(fps),
            scale: HUD_FPS_SCALE,
        });
    }

    if values.is_game_over() {
        items.push(centered_text(
            "GAME OVER",
            GUI_HEIGHT_PX / 2.0 - 20.0,
            HUD_GAME_OVER_SCALE,
            HUD_WHITE,
        ));
    }
    items
}

fn centered_text(text: &str, y: f32, scale: u32, color: [u8; 4]) -> HudItem {
    HudItem::Text {
        x: ((GUI_WIDTH_PX - hud_text_width(text, scale)) / 2.0).round(),
        y,
        text: text.to_string(),
        color,
        scale,
    }
}
