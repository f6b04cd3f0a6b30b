use serde::{Deserialize, Serialize};

/// Pixel-space point. `y` grows downward, matching the scene images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Axis-aligned rectangle with exclusive max edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            min: Vec2 {
                x: x1.min(x2),
                y: y1.min(y2),
            },
            max: Vec2 {
                x: x1.max(x2),
                y: y1.max(y2),
            },
        }
    }

    pub fn from_origin_size(origin: Vec2, width: f32, height: f32) -> Self {
        Self::from_corners(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    /// Box of `width`×`height` centred on `center`.
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::from_origin_size(
            Vec2 {
                x: center.x - width / 2.0,
                y: center.y - height / 2.0,
            },
            width,
            height,
        )
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Shared edges do not count as an overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}
