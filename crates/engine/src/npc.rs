use std::collections::HashMap;

use crate::actor::{Direction, Motion};
use crate::geometry::Vec2;

/// Move ticks granted to a walker after it turns around.
pub const WALKER_RESUME_TICKS: i32 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    None,
    PlayerInteracted,
    WaitingForPlayerToResume,
    CutScene,
}

/// Walk/stop cycle of a patrolling NPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatrolTimer {
    pub move_ticks: i32,
    pub stop_ticks: i32,
    pub is_stopped: bool,
    pub stop_duration: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Walker {
        direction: Direction,
        speed: f32,
        timer: PatrolTimer,
    },
    Talker {
        lines: Vec<String>,
        portrait: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub name: String,
    pub motion: Motion,
    pub sprite_sheets: HashMap<Direction, String>,
    pub behaviors: Vec<Behavior>,
    pub interaction: InteractionState,
}

impl Npc {
    pub fn new(
        name: String,
        motion: Motion,
        sprite_sheets: HashMap<Direction, String>,
        behaviors: Vec<Behavior>,
    ) -> Self {
        Self {
            name,
            motion,
            sprite_sheets,
            behaviors,
            interaction: InteractionState::None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.motion.position
    }

    /// One world tick. Walkers patrol only while nobody is talking to them.
    pub fn tick(&mut self, confirm_held: bool) {
        if confirm_held && self.interaction == InteractionState::PlayerInteracted {
            self.interaction = InteractionState::WaitingForPlayerToResume;
        }
        if self.interaction != InteractionState::None {
            return;
        }

        let motion = &mut self.motion;
        for behavior in &mut self.behaviors {
            if let Behavior::Walker {
                direction,
                speed,
                timer,
            } = behavior
            {
                patrol(motion, direction, *speed, timer);
            }
        }
    }

    /// Both axes within `radius` of `point` (NPC top-left).
    pub fn near(&self, point: Vec2, radius: f32) -> bool {
        (point.x - self.motion.position.x).abs() < radius
            && (point.y - self.motion.position.y).abs() < radius
    }

    pub fn talker(&self) -> Option<(&[String], Option<&str>)> {
        self.behaviors.iter().find_map(|behavior| match behavior {
            Behavior::Talker { lines, portrait } => Some((lines.as_slice(), portrait.as_deref())),
            Behavior::Walker { .. } => None,
        })
    }

    pub fn is_walker(&self) -> bool {
        self.behaviors
            .iter()
            .any(|behavior| matches!(behavior, Behavior::Walker { .. }))
    }

    /// Sheet to draw for the current facing and whether to mirror it.
    pub fn sprite(&self) -> Option<(&str, bool)> {
        let facing = self.motion.direction;
        if let Some(key) = self.sprite_sheets.get(&facing) {
            return Some((key, false));
        }
        if facing == Direction::Left {
            if let Some(key) = self.sprite_sheets.get(&Direction::Right) {
                return Some((key, true));
            }
        }
        Direction::ALL
            .iter()
            .find_map(|direction| self.sprite_sheets.get(direction))
            .map(|key| (key.as_str(), false))
    }
}

fn patrol(motion: &mut Motion, direction: &mut Direction, speed: f32, timer: &mut PatrolTimer) {
    if timer.is_stopped {
        timer.stop_ticks -= 1;
        if timer.stop_ticks <= 0 {
            timer.is_stopped = false;
            timer.move_ticks = WALKER_RESUME_TICKS;
            *direction = direction.opposite();
        }
        return;
    }

    timer.move_ticks -= 1;
    let step = direction.unit();
    motion.position = motion.position.offset(step.x * speed, step.y * speed);
    motion.direction = *direction;
    motion.frame.tick();
    if timer.move_ticks <= 0 {
        timer.is_stopped = true;
        timer.stop_ticks = timer.stop_duration;
    }
}
