use std::time::Instant;

use tracing::{debug, warn};

use crate::app::entity::{Entity, FrameContext, Vec2};
use crate::app::rendering::Canvas;
use crate::app::timer::Timer;

/// Factory invoked for every surface click. Returning `None` declines the
/// spawn (the factory is expected to have logged why).
pub type ClickSpawner = Box<dyn FnMut(Vec2) -> Option<Box<dyn Entity>>>;

/// Owns the surface dimensions, the timer, and the flat entity list, and
/// runs the per-frame tick → update → draw cycle.
///
/// Insertion order is draw order, back to front. Entities are appended at
/// setup time and by the click spawner and are never removed; a misbehaving
/// entity is logged and skipped rather than despawned, so one failure cannot
/// halt the rest of the frame.
pub struct Stage {
    surface_width: u32,
    surface_height: u32,
    timer: Timer,
    entities: Vec<Box<dyn Entity>>,
    click_spawner: Option<ClickSpawner>,
}

impl Stage {
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self::with_timer(surface_width, surface_height, Timer::new())
    }

    pub fn with_timer(surface_width: u32, surface_height: u32, timer: Timer) -> Self {
        Self {
            surface_width,
            surface_height,
            timer,
            entities: Vec::new(),
            click_spawner: None,
        }
    }

    pub fn surface_width(&self) -> u32 {
        self.surface_width
    }

    pub fn surface_height(&self) -> u32 {
        self.surface_height
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn add_entity(&mut self, entity: Box<dyn Entity>) {
        self.entities.push(entity);
    }

    pub fn attach_click_spawner(&mut self, spawner: ClickSpawner) {
        self.click_spawner = Some(spawner);
    }

    /// Forward a surface-space click to the attached spawner, appending
    /// whatever entity it produces.
    pub fn handle_click(&mut self, position: Vec2) {
        let Some(spawner) = self.click_spawner.as_mut() else {
            debug!(x = position.x, y = position.y, "click_ignored_no_spawner");
            return;
        };
        if let Some(entity) = spawner(position) {
            self.entities.push(entity);
            debug!(
                x = position.x,
                y = position.y,
                entity_count = self.entities.len(),
                "click_spawned_entity"
            );
        }
    }

    pub fn frame_context(&self, clock_tick: f64) -> FrameContext {
        FrameContext {
            clock_tick,
            game_time: self.timer.game_time(),
            surface_width: self.surface_width,
            surface_height: self.surface_height,
        }
    }

    /// One full frame: advance the timer to `now`, update every entity, then
    /// draw every entity.
    pub fn run_frame_at(&mut self, now: Instant, canvas: &mut Canvas) {
        let tick = self.timer.tick_at(now);
        let ctx = self.frame_context(tick);
        self.update(&ctx);
        self.draw(&ctx, canvas);
    }

    /// Update every entity in insertion order. The count is captured before
    /// the loop starts; the whole pass completes before any drawing.
    pub fn update(&mut self, ctx: &FrameContext) {
        let entity_count = self.entities.len();
        for index in 0..entity_count {
            if let Err(error) = self.entities[index].update(ctx) {
                warn!(index, error = %error, "entity_update_failed");
            }
        }
    }

    /// Clear the surface, then draw every entity in insertion order. The
    /// length is re-read each iteration.
    pub fn draw(&mut self, ctx: &FrameContext, canvas: &mut Canvas) {
        canvas.clear();
        let mut index = 0;
        while index < self.entities.len() {
            if let Err(error) = self.entities[index].draw(ctx, canvas) {
                warn!(index, error = %error, "entity_draw_failed");
            }
            index += 1;
        }
    }
}
