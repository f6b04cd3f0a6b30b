mod input;
mod loop_runner;
mod rendering;

pub use input::{InputAction, InputEdges, InputSnapshot, KeyEdges};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{camera_offset, world_to_screen, RenderTarget, Renderer, SpriteDraw, Viewport};
