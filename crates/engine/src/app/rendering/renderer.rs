use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::dpi::PhysicalPosition;
use winit::window::Window;

use super::canvas::Canvas;
use crate::app::entity::Vec2;

/// Window-backed framebuffer presenter.
///
/// The pixel buffer stays at the logical surface size; `pixels` scales it to
/// whatever the window becomes, so entity coordinates never change when the
/// window is resized.
pub struct Renderer {
    pixels: Pixels<'static>,
    surface_width: u32,
    surface_height: u32,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Self, Error> {
        let window_size = window.inner_size();
        let surface = SurfaceTexture::new(window_size.width, window_size.height, window);
        let pixels = Pixels::new(surface_width, surface_height, surface)?;
        Ok(Self {
            pixels,
            surface_width,
            surface_height,
        })
    }

    pub fn surface_width(&self) -> u32 {
        self.surface_width
    }

    pub fn surface_height(&self) -> u32 {
        self.surface_height
    }

    pub fn resize_window(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Borrow the frame as a drawing surface for this frame's entity pass.
    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas::new(
            self.pixels.frame_mut(),
            self.surface_width,
            self.surface_height,
        )
    }

    pub fn present(&mut self) -> Result<(), Error> {
        self.pixels.render()
    }

    /// Map a window-space cursor position to surface coordinates. Returns
    /// `None` for positions outside the scaled surface area.
    pub fn window_to_surface(&self, position: PhysicalPosition<f64>) -> Option<Vec2> {
        self.pixels
            .window_pos_to_pixel((position.x as f32, position.y as f32))
            .ok()
            .map(|(x, y)| Vec2 {
                x: x as f32,
                y: y as f32,
            })
    }
}
