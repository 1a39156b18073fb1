mod canvas;
mod renderer;

pub use canvas::{Canvas, CLEAR_COLOR};
pub use renderer::Renderer;
