use crate::ability::{Ability, AbilityKind};
use crate::actor::{AnimationFrame, Direction, Motion};
use crate::collision::{Collisions, Door, MoveCheck};
use crate::geometry::{Rect, Vec2};

/// The controllable character. `motion.position` is the centre of the sprite frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub motion: Motion,
    pub speed: f32,
    pub can_move: bool,
    pub ability: Ability,
    sprite_prefix: String,
    sprite_suffix: String,
}

impl Player {
    pub fn new(
        position: Vec2,
        frame: AnimationFrame,
        speed: f32,
        sprite_prefix: impl Into<String>,
        sprite_suffix: impl Into<String>,
    ) -> Self {
        Self {
            motion: Motion::new(position, Direction::Down, frame),
            speed,
            can_move: true,
            ability: Ability::default(),
            sprite_prefix: sprite_prefix.into(),
            sprite_suffix: sprite_suffix.into(),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.motion.position
    }

    /// Offset from the sprite's top-left corner to `position`.
    pub fn anchor_offset(&self) -> Vec2 {
        Vec2::new(
            self.motion.frame.width as f32 / 2.0,
            self.motion.frame.height as f32 / 2.0,
        )
    }

    pub fn top_left(&self) -> Vec2 {
        let anchor = self.anchor_offset();
        self.motion.position.offset(-anchor.x, -anchor.y)
    }

    pub fn bounding_box_at(&self, center: Vec2) -> Rect {
        Rect::centered(
            center,
            self.motion.frame.width as f32,
            self.motion.frame.height as f32,
        )
    }

    /// One tick of player-driven movement along a single axis.
    ///
    /// Returns the door entered, in which case the player does not move. GhostMode
    /// passes through plain obstacles but still enters doors.
    pub fn walk(
        &mut self,
        heading: Option<Direction>,
        collisions: &Collisions,
        world_size: Vec2,
    ) -> Option<Door> {
        if !self.can_move {
            return None;
        }
        let direction = heading?;
        self.motion.direction = direction;

        let step = direction.unit();
        let anchor = self.anchor_offset();
        let proposed = self
            .motion
            .position
            .offset(step.x * self.speed, step.y * self.speed);
        let current = self.motion.position;
        let next = Vec2::new(
            clamp_axis(
                proposed.x,
                anchor.x.min(current.x),
                (world_size.x - anchor.x).max(current.x),
            ),
            clamp_axis(
                proposed.y,
                anchor.y.min(current.y),
                (world_size.y - anchor.y).max(current.y),
            ),
        );
        if next == current {
            return None;
        }

        match collisions.check_move(&self.bounding_box_at(next)) {
            MoveCheck::Door(door) => return Some(door.clone()),
            MoveCheck::Blocked if !self.ability.is_active(AbilityKind::GhostMode) => return None,
            MoveCheck::Blocked | MoveCheck::Free => {}
        }

        self.motion.position = next;
        self.motion.frame.tick();
        None
    }

    /// Sprite key for the current facing; left reuses the right sheet mirrored.
    pub fn sprite(&self) -> (String, bool) {
        let (direction, mirrored) = match self.motion.direction {
            Direction::Left => (Direction::Right, true),
            other => (other, false),
        };
        (
            format!(
                "{}{}{}",
                self.sprite_prefix,
                capitalized(direction.as_token()),
                self.sprite_suffix
            ),
            mirrored,
        )
    }
}

fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    value.clamp(min, max.max(min))
}

fn capitalized(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Horizontal keys win over vertical ones; opposite keys cancel.
pub fn heading_from_keys(up: bool, down: bool, left: bool, right: bool) -> Option<Direction> {
    match (left, right) {
        (true, false) => return Some(Direction::Left),
        (false, true) => return Some(Direction::Right),
        _ => {}
    }
    match (up, down) {
        (true, false) => Some(Direction::Up),
        (false, true) => Some(Direction::Down),
        _ => None,
    }
}
