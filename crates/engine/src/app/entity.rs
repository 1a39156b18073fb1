use thiserror::Error;

use crate::app::rendering::Canvas;
use crate::app::state_machine::StateMachineError;
use crate::assets::AssetError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Read-only per-frame data handed to every entity. Entities hold no
/// reference back to the stage; this value is their whole view of the world.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Clamped simulation delta for this frame, in seconds.
    pub clock_tick: f64,
    /// Accumulated simulation time, in seconds.
    pub game_time: f64,
    pub surface_width: u32,
    pub surface_height: u32,
}

#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    State(#[from] StateMachineError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// The capability set shared by everything the stage advances and renders.
///
/// `update` mutates simulation state only; `draw` renders it. The stage
/// guarantees that every entity's `update` has completed before the first
/// `draw` of the frame runs.
pub trait Entity {
    fn update(&mut self, ctx: &FrameContext) -> Result<(), EntityError>;
    fn draw(&mut self, ctx: &FrameContext, canvas: &mut Canvas) -> Result<(), EntityError>;
}
