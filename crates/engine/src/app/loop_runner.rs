use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::app::animation::AnimationConfigError;
use crate::app::metrics::FrameStatsAccumulator;
use crate::app::rendering::Renderer;
use crate::app::stage::Stage;
use crate::app::state_machine::StateMachineError;
use crate::app::timer::{Timer, DEFAULT_MAX_STEP_SECONDS};
use crate::assets::{AssetError, AssetManifest, AssetStore};
use crate::{resolve_app_paths, StartupError};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub surface_width: u32,
    pub surface_height: u32,
    pub max_step_seconds: f64,
    pub max_render_fps: Option<u32>,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Spark Run".to_string(),
            surface_width: 1000,
            surface_height: 500,
            max_step_seconds: DEFAULT_MAX_STEP_SECONDS,
            max_render_fps: None,
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

/// Errors a setup callback can surface while building the entity roster.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Animation(#[from] AnimationConfigError),
    #[error(transparent)]
    State(#[from] StateMachineError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("stage setup failed: {0}")]
    Setup(#[from] SetupError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Load assets, build the stage through `setup`, and run the frame loop
/// until the window closes.
///
/// The asset batch finishes loading before `setup` runs, so entity
/// constructors can count on every queued image being resident. Each redraw
/// performs exactly one tick → update → draw → present cycle and a redraw is
/// requested every loop turn; there is no other stop condition than window
/// teardown.
pub fn run_app(
    config: LoopConfig,
    setup: impl FnOnce(&AssetStore, &mut Stage) -> Result<(), SetupError>,
) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );

    let manifest = AssetManifest::load(&app_paths.assets_dir.join(MANIFEST_FILE_NAME))?;
    let assets = AssetStore::load_all(&app_paths.assets_dir, &manifest)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.surface_width as f64,
                config.surface_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.surface_width,
        config.surface_height,
    )
    .map_err(AppError::CreateRenderer)?;

    let mut stage = Stage::with_timer(
        config.surface_width,
        config.surface_height,
        Timer::with_max_step(config.max_step_seconds),
    );
    setup(&assets, &mut stage)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let render_frame_target =
        target_frame_duration(normalize_render_fps_cap(config.max_render_fps));
    info!(
        surface_width = config.surface_width,
        surface_height = config.surface_height,
        max_step_seconds = config.max_step_seconds,
        render_fps_cap = %format_render_cap(config.max_render_fps),
        entity_count = stage.entity_count(),
        "loop_config"
    );

    let mut cursor_position: Option<PhysicalPosition<f64>> = None;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut frame_stats = FrameStatsAccumulator::new(config.metrics_log_interval);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize_window(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor_position = Some(position);
                }
                WindowEvent::CursorLeft { .. } => {
                    cursor_position = None;
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    match cursor_position.and_then(|position| renderer.window_to_surface(position))
                    {
                        Some(position) => stage.handle_click(position),
                        None => debug!("click_outside_surface"),
                    }
                }
                WindowEvent::RedrawRequested => {
                    // Single pacing sleep point; only active with an fps cap.
                    let cap_sleep = compute_cap_sleep(
                        Instant::now().saturating_duration_since(last_present_instant),
                        render_frame_target,
                    );
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let now = Instant::now();
                    let frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    {
                        let mut canvas = renderer.canvas();
                        stage.run_frame_at(now, &mut canvas);
                    }
                    if let Err(error) = renderer.present() {
                        warn!(error = %error, "renderer_present_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    frame_stats.record_frame(frame_dt);
                    if let Some(snapshot) = frame_stats.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = stage.entity_count(),
                            "loop_stats"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                // One redraw per loop turn; the host's redraw delivery is the
                // frame scheduler.
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_canvas_surface() {
        let config = LoopConfig::default();
        assert_eq!(config.surface_width, 1000);
        assert_eq!(config.surface_height, 500);
        assert_eq!(config.max_step_seconds, DEFAULT_MAX_STEP_SECONDS);
        assert_eq!(config.max_render_fps, None);
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn target_frame_duration_for_60hz_is_expected() {
        let duration = target_frame_duration(Some(60)).expect("duration");
        assert!((duration.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }
}
