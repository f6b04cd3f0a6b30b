use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Screen-space shift of the world image that keeps `focus` centred, clamped so the
/// view never leaves the world. Worlds smaller than the viewport are pinned top-left.
pub fn camera_offset(focus: Vec2, viewport: Viewport, world: Vec2) -> Vec2 {
    let screen = viewport.size();
    Vec2::new(
        clamp_axis(screen.x / 2.0 - focus.x, screen.x - world.x),
        clamp_axis(screen.y / 2.0 - focus.y, screen.y - world.y),
    )
}

pub fn world_to_screen(world: Vec2, offset: Vec2) -> Vec2 {
    world.offset(offset.x, offset.y)
}

fn clamp_axis(value: f32, min: f32) -> f32 {
    value.max(min).min(0.0)
}
