use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

/// Walk animation advances one frame every this many moving ticks.
pub const WALK_FRAME_TICKS: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit step in screen space (`y` grows downward).
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Horizontal strip sprite sheet cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub width: u32,
    pub height: u32,
    pub count: u32,
    pub current: u32,
    pub tick_count: u32,
}

impl AnimationFrame {
    pub fn new(width: u32, height: u32, count: u32) -> Self {
        Self {
            width,
            height,
            count: count.max(1),
            current: 0,
            tick_count: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.saturating_add(1);
        if self.tick_count >= WALK_FRAME_TICKS {
            self.current = (self.current + 1) % self.count.max(1);
            self.tick_count = 0;
        }
    }

    /// Left edge of the current frame inside the sheet.
    pub fn source_x(&self) -> u32 {
        self.current * self.width
    }
}

/// Position, facing and animation state shared by the player and NPCs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec2,
    pub direction: Direction,
    pub frame: AnimationFrame,
}

impl Motion {
    pub fn new(position: Vec2, direction: Direction, frame: AnimationFrame) -> Self {
        Self {
            position,
            direction,
            frame,
        }
    }

    /// Moves at most `speed` along one axis toward `target`, X before Y.
    ///
    /// Returns `true` once the position equals the target. The step is clamped to
    /// the remaining distance so the target is always hit exactly.
    pub fn step_toward(&mut self, target: Vec2, speed: f32) -> bool {
        if speed <= 0.0 || !speed.is_finite() {
            return self.position == target;
        }

        if self.position.x != target.x {
            let dx = target.x - self.position.x;
            self.direction = if dx < 0.0 {
                Direction::Left
            } else {
                Direction::Right
            };
            self.position.x = approach(self.position.x, target.x, speed);
        } else if self.position.y != target.y {
            let dy = target.y - self.position.y;
            self.direction = if dy < 0.0 {
                Direction::Up
            } else {
                Direction::Down
            };
            self.position.y = approach(self.position.y, target.y, speed);
        }

        let arrived = self.position == target;
        if !arrived {
            self.frame.tick();
        }
        arrived
    }
}

fn approach(current: f32, target: f32, speed: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= speed {
        target
    } else {
        current + speed.copysign(delta)
    }
}
