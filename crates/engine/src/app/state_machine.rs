use std::collections::HashMap;

use thiserror::Error;

use crate::app::animation::Animation;
use crate::app::rendering::Canvas;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("unknown animation state '{name}'")]
    UnknownState { name: String },
    #[error("no animation state has been selected")]
    NoActiveState,
}

/// Named-animation selector: maps state names to animations and tracks which
/// one is active. Not a transition graph; any registered state can follow any
/// other.
///
/// Elapsed time lives in each animation and is never reset by a switch, so
/// returning to a previously active state resumes it mid-playback.
#[derive(Debug, Default)]
pub struct StateMachine {
    states: HashMap<String, Animation>,
    current: Option<String>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `animation` under `name`. Re-registering a name replaces the
    /// previous animation without complaint.
    pub fn add_state(&mut self, name: impl Into<String>, animation: Animation) {
        self.states.insert(name.into(), animation);
    }

    /// Switch the active state. An unknown name fails and leaves the active
    /// pointer untouched.
    pub fn set_state(&mut self, name: &str) -> Result<(), StateMachineError> {
        if !self.states.contains_key(name) {
            return Err(StateMachineError::UnknownState {
                name: name.to_string(),
            });
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.states.get(name)
    }

    /// Advance the active animation by `tick`, then blit its current frame.
    pub fn draw(
        &mut self,
        tick: f64,
        canvas: &mut Canvas,
        x: f32,
        y: f32,
        scale: f32,
    ) -> Result<(), StateMachineError> {
        let Some(name) = self.current.as_deref() else {
            return Err(StateMachineError::NoActiveState);
        };
        let Some(animation) = self.states.get_mut(name) else {
            return Err(StateMachineError::UnknownState {
                name: name.to_string(),
            });
        };
        animation.draw_frame(tick, canvas, x, y, scale);
        Ok(())
    }
}
