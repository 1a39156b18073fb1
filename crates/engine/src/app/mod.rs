mod animation;
mod entity;
mod loop_runner;
mod metrics;
mod rendering;
mod stage;
mod state_machine;
mod timer;

pub use animation::{Animation, AnimationConfigError, SheetGeometry, SheetRect, SpriteSheet};
pub use entity::{Entity, EntityError, FrameContext, Vec2};
pub use loop_runner::{run_app, AppError, LoopConfig, SetupError, MANIFEST_FILE_NAME};
pub use rendering::{Canvas, Renderer, CLEAR_COLOR};
pub use stage::{ClickSpawner, Stage};
pub use state_machine::{StateMachine, StateMachineError};
pub use timer::{Timer, DEFAULT_MAX_STEP_SECONDS};
