mod renderer;
mod transform;

use crate::dialogue::DialogueView;
use crate::geometry::{Rect, Vec2};

pub use renderer::Renderer;
pub use transform::{camera_offset, world_to_screen, Viewport};

/// One image blit. `offset` is the screen position of the drawn region's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw<'a> {
    pub key: &'a str,
    /// Region of the image to draw; the whole image when `None`.
    pub source: Option<Rect>,
    pub offset: Vec2,
    pub mirrored: bool,
}

/// Draw surface the game renders into once per frame.
pub trait RenderTarget {
    fn screen_size(&self) -> Viewport;
    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>);
    /// Darkens the whole screen; `alpha` 1.0 is solid black.
    fn fill_overlay(&mut self, alpha: f32);
    fn draw_dialogue(&mut self, _view: &DialogueView<'_>) {}
}
