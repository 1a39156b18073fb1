//! Sprite-sheet animation playback and frame indexing.
//!
//! A sheet packs frames left to right across one or more rows; the first row
//! may start at a horizontal offset, which reduces its capacity relative to
//! the rows below it. All geometry is validated at construction so the blit
//! path never samples outside the backing image.

use std::sync::Arc;

use thiserror::Error;

use crate::app::rendering::Canvas;
use crate::assets::SpriteImage;

/// Pixel layout of the packed frames inside a sheet image.
///
/// `sheet_width` is the usable packed width, which may be narrower than the
/// backing image. Row capacities follow from it: the first row holds
/// `(sheet_width - start_x) / frame_width` frames, every later row holds
/// `sheet_width / frame_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetGeometry {
    pub start_x: u32,
    pub start_y: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub sheet_width: u32,
}

/// One frame's source rectangle inside a sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationConfigError {
    #[error("frame dimensions must be positive, got {width}x{height}")]
    ZeroFrameSize { width: u32, height: u32 },
    #[error("declared sheet width {sheet_width} exceeds backing image width {image_width}")]
    SheetWiderThanImage { sheet_width: u32, image_width: u32 },
    #[error(
        "frame width {frame_width} does not fit the first row \
         (start_x {start_x}, sheet width {sheet_width})"
    )]
    FrameWiderThanRow {
        frame_width: u32,
        start_x: u32,
        sheet_width: u32,
    },
    #[error("frame duration must be positive, got {0}")]
    NonPositiveFrameDuration(f64),
    #[error("animation must have at least one frame")]
    ZeroFrameCount,
    #[error("frame {frame} lands at row y {row_y} outside the backing image height {image_height}")]
    RowOutsideImage {
        frame: u32,
        row_y: u64,
        image_height: u32,
    },
}

/// A loaded sheet image paired with its frame geometry. Immutable after
/// construction; cloning shares the image.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    image: Arc<SpriteImage>,
    geometry: SheetGeometry,
}

impl SpriteSheet {
    pub fn new(
        image: Arc<SpriteImage>,
        geometry: SheetGeometry,
    ) -> Result<Self, AnimationConfigError> {
        if geometry.frame_width == 0 || geometry.frame_height == 0 {
            return Err(AnimationConfigError::ZeroFrameSize {
                width: geometry.frame_width,
                height: geometry.frame_height,
            });
        }
        if geometry.sheet_width > image.width() {
            return Err(AnimationConfigError::SheetWiderThanImage {
                sheet_width: geometry.sheet_width,
                image_width: image.width(),
            });
        }
        if geometry.start_x + geometry.frame_width > geometry.sheet_width {
            return Err(AnimationConfigError::FrameWiderThanRow {
                frame_width: geometry.frame_width,
                start_x: geometry.start_x,
                sheet_width: geometry.sheet_width,
            });
        }
        Ok(Self { image, geometry })
    }

    pub fn geometry(&self) -> SheetGeometry {
        self.geometry
    }

    pub fn image(&self) -> &SpriteImage {
        &self.image
    }
}

/// Walk row boundaries until `index` fits, returning the frame origin in
/// sheet pixels. The first row's capacity is reduced by `start_x`; later rows
/// span the full sheet width.
fn frame_origin(geometry: SheetGeometry, index: u32) -> (u64, u64) {
    let frame_width = u64::from(geometry.frame_width);
    let sheet_width = u64::from(geometry.sheet_width);
    let start_x = u64::from(geometry.start_x);

    let mut index = u64::from(index);
    let mut vindex = 0u64;
    if (index + 1) * frame_width + start_x > sheet_width {
        index -= (sheet_width - start_x) / frame_width;
        vindex += 1;
    }
    while (index + 1) * frame_width > sheet_width {
        index -= sheet_width / frame_width;
        vindex += 1;
    }

    let offset_x = if vindex == 0 { start_x } else { 0 };
    (
        index * frame_width + offset_x,
        vindex * u64::from(geometry.frame_height) + u64::from(geometry.start_y),
    )
}

/// Fixed-rate playback over a sprite sheet.
///
/// Elapsed time only ever grows between wraparounds; a looping animation that
/// reaches its total duration is pulled back by exactly one period per
/// `advance`, a non-looping one freezes on its final frame.
#[derive(Debug, Clone)]
pub struct Animation {
    sheet: SpriteSheet,
    frame_duration: f64,
    frame_count: u32,
    total_duration: f64,
    elapsed: f64,
    looping: bool,
    reverse: bool,
}

impl Animation {
    pub fn new(
        sheet: SpriteSheet,
        frame_duration: f64,
        frame_count: u32,
        looping: bool,
    ) -> Result<Self, AnimationConfigError> {
        if !(frame_duration > 0.0) {
            return Err(AnimationConfigError::NonPositiveFrameDuration(
                frame_duration,
            ));
        }
        if frame_count == 0 {
            return Err(AnimationConfigError::ZeroFrameCount);
        }

        let geometry = sheet.geometry();
        let (_, last_row_y) = frame_origin(geometry, frame_count - 1);
        if last_row_y + u64::from(geometry.frame_height) > u64::from(sheet.image().height()) {
            return Err(AnimationConfigError::RowOutsideImage {
                frame: frame_count - 1,
                row_y: last_row_y,
                image_height: sheet.image().height(),
            });
        }

        Ok(Self {
            sheet,
            frame_duration,
            frame_count,
            total_duration: frame_duration * f64::from(frame_count),
            elapsed: 0.0,
            looping,
            reverse: false,
        })
    }

    /// Play the frames last to first instead.
    pub fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Accumulate `tick` seconds of playback. A looping animation that has
    /// reached its total duration wraps by exactly one period per call.
    pub fn advance(&mut self, tick: f64) {
        self.elapsed += tick;
        if self.looping && self.elapsed >= self.total_duration {
            self.elapsed -= self.total_duration;
        }
    }

    /// Index of the frame the current elapsed time falls in. Non-looping
    /// playback clamps to the final frame once the animation completes.
    pub fn current_frame(&self) -> u32 {
        let index = (self.elapsed / self.frame_duration).floor() as u32;
        if self.looping {
            index
        } else {
            index.min(self.frame_count - 1)
        }
    }

    /// Source rectangle for `frame`, honoring the reverse flag and the
    /// multi-row sheet layout.
    pub fn frame_rect(&self, frame: u32) -> SheetRect {
        let frame = frame.min(self.frame_count - 1);
        let index = if self.reverse {
            self.frame_count - frame - 1
        } else {
            frame
        };
        let geometry = self.sheet.geometry();
        let (x, y) = frame_origin(geometry, index);
        SheetRect {
            x: x as u32,
            y: y as u32,
            width: geometry.frame_width,
            height: geometry.frame_height,
        }
    }

    /// True once elapsed time has reached the total duration. Stays true for
    /// a non-looping animation no matter how far playback advances.
    pub fn is_done(&self) -> bool {
        self.elapsed >= self.total_duration
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Advance by `tick`, then blit the current frame at `(x, y)` with the
    /// destination scaled by `scale`.
    pub fn draw_frame(&mut self, tick: f64, canvas: &mut Canvas, x: f32, y: f32, scale: f32) {
        self.advance(tick);
        let rect = self.frame_rect(self.current_frame());
        canvas.draw_image(
            self.sheet.image(),
            rect,
            x,
            y,
            rect.width as f32 * scale,
            rect.height as f32 * scale,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_image(width: u32, height: u32) -> Arc<SpriteImage> {
        let rgba = vec![255u8; width as usize * height as usize * 4];
        Arc::new(SpriteImage::from_rgba(width, height, rgba).expect("image"))
    }

    fn runner_geometry(start_x: u32) -> SheetGeometry {
        SheetGeometry {
            start_x,
            start_y: 0,
            frame_width: 21,
            frame_height: 33,
            sheet_width: 168,
        }
    }

    fn runner_sheet() -> SpriteSheet {
        SpriteSheet::new(blank_image(168, 66), runner_geometry(0)).expect("sheet")
    }

    fn looping_runner() -> Animation {
        Animation::new(runner_sheet(), 0.125, 8, true).expect("animation")
    }

    #[test]
    fn advancing_a_full_period_returns_elapsed_to_zero() {
        let mut animation = looping_runner();
        animation.advance(1.0);
        assert_eq!(animation.elapsed_seconds(), 0.0);
        assert!(!animation.is_done());
    }

    #[test]
    fn looping_wraps_by_exactly_one_period_per_advance() {
        let mut animation = looping_runner();
        animation.advance(1.25);
        assert!((animation.elapsed_seconds() - 0.25).abs() < 1e-9);

        let mut split = looping_runner();
        split.advance(0.5);
        split.advance(0.75);
        assert!((split.elapsed_seconds() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn current_frame_is_floor_of_elapsed_over_duration() {
        let mut animation = looping_runner();
        animation.advance(0.3);
        assert_eq!(animation.current_frame(), 2);
    }

    #[test]
    fn non_looping_is_done_is_idempotent() {
        let sheet = SpriteSheet::new(
            blank_image(360, 75),
            SheetGeometry {
                start_x: 0,
                start_y: 0,
                frame_width: 72,
                frame_height: 75,
                sheet_width: 360,
            },
        )
        .expect("sheet");
        let mut animation = Animation::new(sheet, 0.2, 5, false).expect("animation");

        animation.advance(0.9);
        assert!(!animation.is_done());

        animation.advance(0.1);
        assert!(animation.is_done());

        animation.advance(5.0);
        assert!(animation.is_done());
        assert_eq!(animation.current_frame(), 4);
    }

    #[test]
    fn frame_index_wraps_to_the_next_sheet_row() {
        let animation = Animation::new(runner_sheet(), 0.125, 9, true).expect("animation");
        // Row capacity is 168 / 21 = 8, so frame 8 is row 1, column 0.
        let rect = animation.frame_rect(8);
        assert_eq!(
            rect,
            SheetRect {
                x: 0,
                y: 33,
                width: 21,
                height: 33,
            }
        );
    }

    #[test]
    fn start_offset_reduces_first_row_capacity() {
        let sheet = SpriteSheet::new(blank_image(168, 66), runner_geometry(10)).expect("sheet");
        let animation = Animation::new(sheet, 0.125, 8, true).expect("animation");

        // First row holds (168 - 10) / 21 = 7 frames and keeps the offset.
        assert_eq!(
            animation.frame_rect(6),
            SheetRect {
                x: 6 * 21 + 10,
                y: 0,
                width: 21,
                height: 33,
            }
        );
        // Frame 7 spills into row 1, which starts back at x = 0.
        assert_eq!(
            animation.frame_rect(7),
            SheetRect {
                x: 0,
                y: 33,
                width: 21,
                height: 33,
            }
        );
    }

    #[test]
    fn reverse_flips_the_frame_order() {
        let animation = Animation::new(runner_sheet(), 0.125, 8, true)
            .expect("animation")
            .with_reverse();
        assert_eq!(
            animation.frame_rect(0),
            SheetRect {
                x: 7 * 21,
                y: 0,
                width: 21,
                height: 33,
            }
        );
        assert_eq!(animation.frame_rect(7).x, 0);
    }

    #[test]
    fn zero_frame_duration_is_rejected() {
        let err = Animation::new(runner_sheet(), 0.0, 8, true).expect_err("zero duration");
        assert_eq!(err, AnimationConfigError::NonPositiveFrameDuration(0.0));
    }

    #[test]
    fn zero_frame_count_is_rejected() {
        let err = Animation::new(runner_sheet(), 0.125, 0, true).expect_err("zero frames");
        assert_eq!(err, AnimationConfigError::ZeroFrameCount);
    }

    #[test]
    fn frame_wider_than_first_row_is_rejected() {
        let err =
            SpriteSheet::new(blank_image(168, 66), runner_geometry(160)).expect_err("bad offset");
        assert!(matches!(
            err,
            AnimationConfigError::FrameWiderThanRow { start_x: 160, .. }
        ));
    }

    #[test]
    fn sheet_wider_than_backing_image_is_rejected() {
        let geometry = SheetGeometry {
            sheet_width: 200,
            ..runner_geometry(0)
        };
        let err = SpriteSheet::new(blank_image(168, 66), geometry).expect_err("bad sheet width");
        assert!(matches!(
            err,
            AnimationConfigError::SheetWiderThanImage {
                sheet_width: 200,
                image_width: 168,
            }
        ));
    }

    #[test]
    fn frame_count_overflowing_the_image_rows_is_rejected() {
        let sheet = SpriteSheet::new(blank_image(168, 33), runner_geometry(0)).expect("sheet");
        let err = Animation::new(sheet, 0.125, 9, true).expect_err("row overflow");
        assert!(matches!(
            err,
            AnimationConfigError::RowOutsideImage { frame: 8, .. }
        ));
    }

    #[test]
    fn draw_frame_advances_playback() {
        let mut animation = looping_runner();
        let mut buffer = vec![0u8; 64 * 64 * 4];
        let mut canvas = Canvas::new(&mut buffer, 64, 64);

        animation.draw_frame(0.3, &mut canvas, 0.0, 0.0, 1.0);
        assert!((animation.elapsed_seconds() - 0.3).abs() < 1e-9);
        assert_eq!(animation.current_frame(), 2);
    }
}
