use crate::app::animation::SheetRect;
use crate::assets::SpriteImage;

pub const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

/// Software drawing surface over a borrowed RGBA frame.
///
/// Destination coordinates are surface pixels with the origin at the top
/// left. Every draw clips to the surface, so callers never need to bound
/// their own rectangles.
pub struct Canvas<'frame> {
    frame: &'frame mut [u8],
    width: u32,
    height: u32,
}

impl<'frame> Canvas<'frame> {
    pub fn new(frame: &'frame mut [u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(frame.len(), width as usize * height as usize * 4);
        Self {
            frame,
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

    /// Fill the whole surface with the clear color.
    pub fn clear(&mut self) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }
    }

    /// Blit the `src` sub-rectangle of `image` to the destination rectangle
    /// at `(dst_x, dst_y)` sized `dst_w` by `dst_h`, sampling with
    /// nearest-neighbour scaling. Fully transparent source pixels are
    /// skipped; source samples outside the image draw nothing.
    pub fn draw_image(
        &mut self,
        image: &SpriteImage,
        src: SheetRect,
        dst_x: f32,
        dst_y: f32,
        dst_w: f32,
        dst_h: f32,
    ) {
        if src.width == 0 || src.height == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        if !(dst_w >= 1.0) || !(dst_h >= 1.0) {
            return;
        }

        let left = dst_x.round() as i32;
        let top = dst_y.round() as i32;
        let out_w = dst_w.round() as i32;
        let out_h = dst_h.round() as i32;

        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = (left + out_w).min(self.width as i32);
        let draw_bottom = (top + out_h).min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let x_ratio = src.width as f32 / out_w as f32;
        let y_ratio = src.height as f32 / out_h as f32;
        let surface_width = self.width as usize;
        let image_width = image.width() as usize;
        let image_height = image.height() as usize;
        let rgba = image.rgba();

        for out_y in draw_top..draw_bottom {
            let sample_y = ((out_y - top) as f32 * y_ratio).floor() as u32;
            let src_y = (src.y + sample_y.min(src.height - 1)) as usize;
            if src_y >= image_height {
                continue;
            }
            let src_row = src_y * image_width * 4;
            let dst_row = out_y as usize * surface_width * 4;

            for out_x in draw_left..draw_right {
                let sample_x = ((out_x - left) as f32 * x_ratio).floor() as u32;
                let src_x = (src.x + sample_x.min(src.width - 1)) as usize;
                if src_x >= image_width {
                    continue;
                }
                let src_offset = src_row + src_x * 4;
                if rgba[src_offset + 3] == 0 {
                    continue;
                }
                let dst_offset = dst_row + out_x as usize * 4;
                self.frame[dst_offset..dst_offset + 4]
                    .copy_from_slice(&rgba[src_offset..src_offset + 4]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> SpriteImage {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        SpriteImage::from_rgba(width, height, rgba).expect("image")
    }

    fn pixel_at(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * width as usize + x as usize) * 4;
        [
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ]
    }

    #[test]
    fn clear_fills_the_clear_color() {
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);
        canvas.clear();
        assert_eq!(pixel_at(&buffer, 4, 0, 0), CLEAR_COLOR);
        assert_eq!(pixel_at(&buffer, 4, 3, 3), CLEAR_COLOR);
    }

    #[test]
    fn unit_scale_blit_copies_the_source_rectangle() {
        let image = gradient_image(4, 4);
        let mut buffer = vec![0u8; 8 * 8 * 4];
        let mut canvas = Canvas::new(&mut buffer, 8, 8);

        let src = SheetRect {
            x: 2,
            y: 2,
            width: 2,
            height: 2,
        };
        canvas.draw_image(&image, src, 1.0, 1.0, 2.0, 2.0);

        assert_eq!(pixel_at(&buffer, 8, 1, 1), [2, 2, 0, 255]);
        assert_eq!(pixel_at(&buffer, 8, 2, 2), [3, 3, 0, 255]);
        // Pixels outside the destination rectangle stay untouched.
        assert_eq!(pixel_at(&buffer, 8, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel_at(&buffer, 8, 3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn double_scale_repeats_source_pixels() {
        let image = gradient_image(2, 2);
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);

        let src = SheetRect {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        canvas.draw_image(&image, src, 0.0, 0.0, 4.0, 4.0);

        assert_eq!(pixel_at(&buffer, 4, 0, 0), [0, 0, 0, 255]);
        assert_eq!(pixel_at(&buffer, 4, 1, 1), [0, 0, 0, 255]);
        assert_eq!(pixel_at(&buffer, 4, 2, 2), [1, 1, 0, 255]);
        assert_eq!(pixel_at(&buffer, 4, 3, 3), [1, 1, 0, 255]);
    }

    #[test]
    fn fully_transparent_pixels_are_skipped() {
        let rgba = vec![
            10, 10, 10, 255, //
            20, 20, 20, 0,
        ];
        let image = SpriteImage::from_rgba(2, 1, rgba).expect("image");
        let mut buffer = vec![0u8; 2 * 1 * 4];
        let mut canvas = Canvas::new(&mut buffer, 2, 1);

        let src = SheetRect {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
        };
        canvas.draw_image(&image, src, 0.0, 0.0, 2.0, 1.0);

        assert_eq!(pixel_at(&buffer, 2, 0, 0), [10, 10, 10, 255]);
        assert_eq!(pixel_at(&buffer, 2, 1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn blits_clip_at_every_surface_edge() {
        let image = gradient_image(4, 4);
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);

        let src = SheetRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        canvas.draw_image(&image, src, -2.0, -2.0, 4.0, 4.0);
        canvas.draw_image(&image, src, 2.0, 2.0, 4.0, 4.0);
        canvas.draw_image(&image, src, 100.0, 100.0, 4.0, 4.0);

        // Top-left blit contributes its bottom-right quadrant.
        assert_eq!(pixel_at(&buffer, 4, 0, 0), [2, 2, 0, 255]);
        // Bottom-right blit contributes its top-left quadrant.
        assert_eq!(pixel_at(&buffer, 4, 3, 3), [1, 1, 0, 255]);
    }

    #[test]
    fn degenerate_destination_draws_nothing() {
        let image = gradient_image(4, 4);
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);

        let src = SheetRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        canvas.draw_image(&image, src, 0.0, 0.0, 0.0, 4.0);
        canvas.draw_image(&image, src, 0.0, 0.0, 4.0, -3.0);

        assert!(buffer.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn source_samples_past_the_image_draw_nothing() {
        let image = gradient_image(4, 2);
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buffer, 4, 4);

        // Rectangle hangs one row past the image's bottom edge.
        let src = SheetRect {
            x: 0,
            y: 1,
            width: 4,
            height: 2,
        };
        canvas.draw_image(&image, src, 0.0, 0.0, 4.0, 2.0);

        assert_eq!(pixel_at(&buffer, 4, 0, 0), [0, 1, 0, 255]);
        assert_eq!(pixel_at(&buffer, 4, 0, 1), [0, 0, 0, 0]);
    }
}
