use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::game::Game;

use super::input::ActionStates;
use super::{InputAction, InputSnapshot, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Tile RPG".to_string(),
            window_width: 800,
            window_height: 600,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `game` at a fixed tick rate until the window closes
/// or Escape is pressed.
pub fn run_app(config: LoopConfig, mut game: Game, asset_dir: PathBuf) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let screen = (game.config().screen_width, game.config().screen_height);
    let mut renderer = Renderer::new(Arc::clone(&window), asset_dir, screen)
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut clock = FixedStep::new(&config);
    let mut input_collector = InputCollector::default();
    info!(
        tick_ms = clock.tick.as_secs_f64() * 1000.0,
        max_frame_delta_ms = clock.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = clock.max_ticks_per_frame,
        screen_width = screen.0,
        screen_height = screen.1,
        "loop_config"
    );

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let plan = clock.advance(Instant::now());
                    for _ in 0..plan.ticks {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        if let Err(error) = game.update(&input_snapshot) {
                            error!(error = %error, state = ?game.state(), "game_update_failed");
                        }
                    }
                    if plan.dropped > Duration::ZERO {
                        warn!(
                            dropped_ms = plan.dropped.as_millis() as u64,
                            max_ticks_per_frame = clock.max_ticks_per_frame,
                            "tick_backlog_dropped"
                        );
                    }

                    renderer.begin_frame();
                    game.draw(&mut renderer);
                    if let Err(error) = renderer.present() {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(scene = %game.current_scene_name(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Keyboard state between ticks. A key tapped and released within one frame still
/// shows as held for the next tick.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    held: ActionStates,
    tapped: ActionStates,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let Some(action) = action_for_key(code) else {
            return;
        };
        self.held.set(action, is_pressed);
        if is_pressed {
            self.tapped.set(action, true);
            if action == InputAction::Quit {
                self.quit_requested = true;
            }
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let mut actions = self.held;
        for action in InputAction::ALL {
            if self.tapped.is_down(action) {
                actions.set(action, true);
            }
        }
        self.tapped = ActionStates::default();
        InputSnapshot::new(actions)
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::ArrowDown => Some(InputAction::MoveDown),
        KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::KeyZ | KeyCode::Enter => Some(InputAction::Confirm),
        KeyCode::KeyD => Some(InputAction::TriggerCutscene),
        KeyCode::KeyV => Some(InputAction::CycleAbility),
        KeyCode::Space => Some(InputAction::UseAbility),
        KeyCode::KeyP => Some(InputAction::ToggleMusic),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

/// Ticks owed for one rendered frame, plus backlog discarded by the per-frame cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks: u32,
    dropped: Duration,
}

/// Fixed-rate simulation clock. Frame time accumulates and is paid out in whole ticks.
#[derive(Debug)]
struct FixedStep {
    tick: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    owed: Duration,
    last_frame: Option<Instant>,
}

impl FixedStep {
    fn new(config: &LoopConfig) -> Self {
        let max_frame_delta = if config.max_frame_delta.is_zero() {
            LoopConfig::default().max_frame_delta
        } else {
            config.max_frame_delta
        };
        Self {
            tick: Duration::from_secs_f64(1.0 / f64::from(config.target_tps.max(1))),
            max_frame_delta,
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            owed: Duration::ZERO,
            last_frame: None,
        }
    }

    fn advance(&mut self, now: Instant) -> StepPlan {
        let elapsed = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        self.credit(elapsed)
    }

    fn credit(&mut self, elapsed: Duration) -> StepPlan {
        self.owed = self.owed.saturating_add(elapsed.min(self.max_frame_delta));

        let mut ticks = 0;
        while self.owed >= self.tick && ticks < self.max_ticks_per_frame {
            self.owed -= self.tick;
            ticks += 1;
        }
        let dropped = if self.owed >= self.tick {
            std::mem::take(&mut self.owed)
        } else {
            Duration::ZERO
        };
        StepPlan { ticks, dropped }
    }
}
