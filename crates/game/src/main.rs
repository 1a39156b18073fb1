use std::fs;
use std::path::Path;
use std::sync::Arc;

use engine::{
    resolve_app_paths, run_app, Animation, AssetStore, Canvas, Entity, EntityError, FrameContext,
    LoopConfig, SetupError, SheetGeometry, SheetRect, SpriteImage, SpriteSheet, Stage,
    StateMachine, Vec2,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const WALK_SPEED_PX_PER_SECOND: f32 = 30.0;
const WALK_RIGHT: &str = "walk_right";
const WALK_LEFT: &str = "walk_left";

const RUNNER_FRAME_WIDTH: u32 = 21;
const RUNNER_FRAME_HEIGHT: u32 = 33;
const RUNNER_SHEET_WIDTH: u32 = 168;
const RUNNER_FRAME_DURATION: f64 = 0.125;
const RUNNER_FRAME_COUNT: u32 = 8;
const RUNNER_BOUNDS_WIDTH: f32 = 33.0;

const FIREWORK_FRAME_WIDTH: u32 = 72;
const FIREWORK_FRAME_HEIGHT: u32 = 75;
const FIREWORK_SHEET_WIDTH: u32 = 360;
const FIREWORK_FRAME_DURATION: f64 = 0.2;
const FIREWORK_FRAME_COUNT: u32 = 5;
// Centers the 72x75 firework sprite on the cursor.
const FIREWORK_CLICK_OFFSET_X: f32 = 36.0;
const FIREWORK_CLICK_OFFSET_Y: f32 = 37.0;

const RUNNER_ASSET_KEY: &str = "runner";
const FIREWORK_ASSET_KEY: &str = "firework";
const BACKGROUND_ASSET_KEY: &str = "background";
const ROSTER_FILE_NAME: &str = "roster.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

/// A runner that paces the surface, bouncing off both edges.
struct Person {
    x: f32,
    y: f32,
    scale: f32,
    bounds_width: f32,
    direction: Direction,
    states: StateMachine,
}

impl Person {
    fn new(assets: &AssetStore, x: f32, y: f32, scale: f32) -> Result<Self, SetupError> {
        let image = assets.image(RUNNER_ASSET_KEY)?;
        let mut states = StateMachine::new();
        states.add_state(WALK_RIGHT, walk_animation(Arc::clone(&image), 0)?);
        states.add_state(WALK_LEFT, walk_animation(image, RUNNER_FRAME_HEIGHT)?);
        states.set_state(WALK_RIGHT)?;
        Ok(Self {
            x,
            y,
            scale,
            bounds_width: RUNNER_BOUNDS_WIDTH * scale,
            direction: Direction::Right,
            states,
        })
    }
}

fn walk_animation(image: Arc<SpriteImage>, start_y: u32) -> Result<Animation, SetupError> {
    let sheet = SpriteSheet::new(
        image,
        SheetGeometry {
            start_x: 0,
            start_y,
            frame_width: RUNNER_FRAME_WIDTH,
            frame_height: RUNNER_FRAME_HEIGHT,
            sheet_width: RUNNER_SHEET_WIDTH,
        },
    )?;
    Ok(Animation::new(
        sheet,
        RUNNER_FRAME_DURATION,
        RUNNER_FRAME_COUNT,
        true,
    )?)
}

impl Entity for Person {
    fn update(&mut self, ctx: &FrameContext) -> Result<(), EntityError> {
        let dx = ctx.clock_tick as f32 * WALK_SPEED_PX_PER_SECOND;
        if self.x + self.bounds_width + dx > ctx.surface_width as f32 {
            self.states.set_state(WALK_LEFT)?;
            self.direction = Direction::Left;
        }
        if self.x - dx < 0.0 {
            self.states.set_state(WALK_RIGHT)?;
            self.direction = Direction::Right;
        }
        match self.direction {
            Direction::Left => self.x -= dx,
            Direction::Right => self.x += dx,
        }
        Ok(())
    }

    fn draw(&mut self, ctx: &FrameContext, canvas: &mut Canvas) -> Result<(), EntityError> {
        self.states
            .draw(ctx.clock_tick, canvas, self.x, self.y, self.scale)?;
        Ok(())
    }
}

/// One-shot burst spawned under the cursor. Plays through its five frames
/// once and then stays frozen on the last one; spent fireworks are never
/// removed from the stage.
struct Firework {
    x: f32,
    y: f32,
    scale: f32,
    animation: Animation,
}

impl Firework {
    fn new(image: Arc<SpriteImage>, x: f32, y: f32, scale: f32) -> Result<Self, SetupError> {
        let sheet = SpriteSheet::new(
            image,
            SheetGeometry {
                start_x: 0,
                start_y: 0,
                frame_width: FIREWORK_FRAME_WIDTH,
                frame_height: FIREWORK_FRAME_HEIGHT,
                sheet_width: FIREWORK_SHEET_WIDTH,
            },
        )?;
        let animation = Animation::new(
            sheet,
            FIREWORK_FRAME_DURATION,
            FIREWORK_FRAME_COUNT,
            false,
        )?;
        Ok(Self {
            x,
            y,
            scale,
            animation,
        })
    }
}

impl Entity for Firework {
    fn update(&mut self, _ctx: &FrameContext) -> Result<(), EntityError> {
        Ok(())
    }

    fn draw(&mut self, ctx: &FrameContext, canvas: &mut Canvas) -> Result<(), EntityError> {
        self.animation
            .draw_frame(ctx.clock_tick, canvas, self.x, self.y, self.scale);
        Ok(())
    }
}

/// Static backdrop stretched over the whole surface.
struct Background {
    image: Arc<SpriteImage>,
}

impl Entity for Background {
    fn update(&mut self, _ctx: &FrameContext) -> Result<(), EntityError> {
        Ok(())
    }

    fn draw(&mut self, ctx: &FrameContext, canvas: &mut Canvas) -> Result<(), EntityError> {
        let src = SheetRect {
            x: 0,
            y: 0,
            width: self.image.width(),
            height: self.image.height(),
        };
        canvas.draw_image(
            &self.image,
            src,
            0.0,
            0.0,
            ctx.surface_width as f32,
            ctx.surface_height as f32,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RosterEntry {
    x: f32,
    #[serde(default = "default_scale")]
    scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
struct Roster {
    persons: Vec<RosterEntry>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            persons: [0.0, 63.0, 126.0, 189.0]
                .into_iter()
                .map(|x| RosterEntry { x, scale: 1.0 })
                .collect(),
        }
    }
}

/// Read the optional roster override next to the assets. Any failure falls
/// back to the built-in roster; a parse failure logs the exact JSON path
/// that broke.
fn load_roster(assets_dir: &Path) -> Roster {
    let path = assets_dir.join(ROSTER_FILE_NAME);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return Roster::default(),
    };

    let deserializer = &mut serde_json::Deserializer::from_str(&raw);
    match serde_path_to_error::deserialize(deserializer) {
        Ok(roster) => {
            info!(path = %path.display(), "roster_loaded");
            roster
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                at = %error.path(),
                error = %error,
                "roster_parse_failed_using_default"
            );
            Roster::default()
        }
    }
}

fn build_stage(assets: &AssetStore, stage: &mut Stage, roster: &Roster) -> Result<(), SetupError> {
    let background = assets.image(BACKGROUND_ASSET_KEY)?;
    stage.add_entity(Box::new(Background { image: background }));

    let ground_y = stage.surface_height() as f32 - RUNNER_FRAME_HEIGHT as f32;
    for entry in &roster.persons {
        match Person::new(assets, entry.x, ground_y, entry.scale) {
            Ok(person) => stage.add_entity(Box::new(person)),
            Err(error) => warn!(x = entry.x, error = %error, "person_spawn_skipped"),
        }
    }

    let firework_image = assets.image(FIREWORK_ASSET_KEY)?;
    stage.attach_click_spawner(Box::new(move |click: Vec2| {
        match Firework::new(
            Arc::clone(&firework_image),
            click.x - FIREWORK_CLICK_OFFSET_X,
            click.y - FIREWORK_CLICK_OFFSET_Y,
            1.0,
        ) {
            Ok(firework) => Some(Box::new(firework) as Box<dyn Entity>),
            Err(error) => {
                warn!(error = %error, "firework_spawn_skipped");
                None
            }
        }
    }));

    info!(entity_count = stage.entity_count(), "stage_ready");
    Ok(())
}

fn main() {
    init_tracing();
    info!("=== Spark Run Startup ===");

    let roster = resolve_app_paths()
        .map(|paths| load_roster(&paths.assets_dir))
        .unwrap_or_default();

    let config = LoopConfig::default();
    if let Err(err) = run_app(config, |assets, stage| build_stage(assets, stage, &roster)) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
