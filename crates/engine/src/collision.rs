use crate::geometry::{Rect, Vec2};

/// Labeled zone that sends the player to another scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Door {
    pub id: String,
    pub rect: Rect,
    pub destination: String,
    pub target: Vec2,
}

/// A staircase of equally sized rectangles, each offset by its own size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagonalRun {
    pub start: Vec2,
    pub width: f32,
    pub height: f32,
    pub count: u32,
}

impl DiagonalRun {
    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        (0..self.count).map(move |step| {
            let origin = Vec2 {
                x: self.start.x + self.width * step as f32,
                y: self.start.y + self.height * step as f32,
            };
            Rect::from_origin_size(origin, self.width, self.height)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCheck<'a> {
    Free,
    Blocked,
    /// Blocked by an obstacle that is also covered by this door.
    Door(&'a Door),
}

impl MoveCheck<'_> {
    pub fn is_blocked(&self) -> bool {
        !matches!(self, MoveCheck::Free)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collisions {
    obstacles: Vec<Rect>,
    doors: Vec<Door>,
}

impl Collisions {
    pub fn new(obstacles: Vec<Rect>, doors: Vec<Door>) -> Self {
        Self { obstacles, doors }
    }

    pub fn with_diagonals(mut self, runs: &[DiagonalRun]) -> Self {
        for run in runs {
            self.obstacles.extend(run.rects());
        }
        self
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn is_blocked(&self, bbox: &Rect) -> bool {
        self.obstacles.iter().any(|obstacle| obstacle.intersects(bbox))
    }

    pub fn door_at(&self, bbox: &Rect) -> Option<&Door> {
        self.doors.iter().find(|door| door.rect.intersects(bbox))
    }

    /// A door is reported only when the box is both blocked and inside a door zone.
    pub fn check_move(&self, bbox: &Rect) -> MoveCheck<'_> {
        if !self.is_blocked(bbox) {
            return MoveCheck::Free;
        }
        match self.door_at(bbox) {
            Some(door) => MoveCheck::Door(door),
            None => MoveCheck::Blocked,
        }
    }
}
