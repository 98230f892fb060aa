mod overlay;

pub(crate) use overlay::{draw_overlay, draw_text, text_width, OverlayData};
