mod raster;
mod renderer;
mod transform;

pub(crate) use raster::{Canvas, ScreenRect};
pub use renderer::Renderer;
pub use transform::FitViewport;
