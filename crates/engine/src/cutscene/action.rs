use std::fmt;

use crate::actor::Direction;
use crate::geometry::Vec2;

use super::resolve::ScriptDefect;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    MoveActor,
    Teleport,
    TurnActor,
    ShowDialogue,
    FadeIn,
    FadeOut,
    ChangeScene,
    StopMusic,
    ChangeMusic,
    Wait,
    /// Unrecognised script name, kept for reporting. Never completes.
    Invalid(String),
}

impl ActionKind {
    /// Accepts the generic names and the per-actor names older scripts use.
    pub fn parse(name: &str) -> Self {
        match name {
            "MoveActor" | "MovePlayer" | "MoveNPC" => Self::MoveActor,
            "Teleport" | "TeleportPlayer" | "TeleportNPC" => Self::Teleport,
            "TurnActor" | "TurnPlayer" | "TurnNPC" => Self::TurnActor,
            "ShowDialogue" => Self::ShowDialogue,
            "FadeIn" => Self::FadeIn,
            "FadeOut" => Self::FadeOut,
            "ChangeScene" => Self::ChangeScene,
            "StopMusic" => Self::StopMusic,
            "ChangeMusic" => Self::ChangeMusic,
            "Wait" => Self::Wait,
            other => Self::Invalid(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::MoveActor => "MoveActor",
            Self::Teleport => "Teleport",
            Self::TurnActor => "TurnActor",
            Self::ShowDialogue => "ShowDialogue",
            Self::FadeIn => "FadeIn",
            Self::FadeOut => "FadeOut",
            Self::ChangeScene => "ChangeScene",
            Self::StopMusic => "StopMusic",
            Self::ChangeMusic => "ChangeMusic",
            Self::Wait => "Wait",
            Self::Invalid(name) => name,
        }
    }

    /// Target and payload kinds this action needs. `None` for `Invalid`.
    pub fn requirements(&self) -> Option<(TargetKind, PayloadKind)> {
        let pair = match self {
            Self::MoveActor | Self::Teleport => (TargetKind::Actor, PayloadKind::Point),
            Self::TurnActor => (TargetKind::Actor, PayloadKind::Direction),
            Self::ShowDialogue => (TargetKind::Dialogue, PayloadKind::Lines),
            Self::FadeIn | Self::FadeOut => (TargetKind::None, PayloadKind::Step),
            Self::ChangeScene => (TargetKind::SceneName, PayloadKind::Text),
            Self::StopMusic => (TargetKind::Music, PayloadKind::None),
            Self::ChangeMusic => (TargetKind::Music, PayloadKind::Text),
            Self::Wait => (TargetKind::None, PayloadKind::Ticks),
            Self::Invalid(_) => return None,
        };
        Some(pair)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Actor,
    Dialogue,
    Music,
    SceneName,
    None,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Actor => "actor",
            Self::Dialogue => "dialogue",
            Self::Music => "music",
            Self::SceneName => "scene",
            Self::None => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Point,
    Direction,
    Text,
    Step,
    Lines,
    Ticks,
    None,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Point => "point",
            Self::Direction => "direction",
            Self::Text => "text",
            Self::Step => "step",
            Self::Lines => "lines",
            Self::Ticks => "ticks",
            Self::None => "none",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorRef {
    Player,
    Npc { scene: String, name: String },
}

/// Live handle an action operates on. Actors are addressed by key, not by pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Actor(ActorRef),
    Dialogue,
    Music,
    SceneName,
    None,
}

impl TargetRef {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Actor(_) => TargetKind::Actor,
            Self::Dialogue => TargetKind::Dialogue,
            Self::Music => TargetKind::Music,
            Self::SceneName => TargetKind::SceneName,
            Self::None => TargetKind::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Point(Vec2),
    Direction(Direction),
    Text(String),
    Step(f32),
    Lines(Vec<String>),
    Ticks(u32),
}

/// A resolved action. A defective action keeps its defect and is a permanent no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub target: TargetRef,
    pub payload: Payload,
    pub wait_previous: bool,
    pub defect: Option<ScriptDefect>,
}

impl Action {
    pub fn is_defective(&self) -> bool {
        self.defect.is_some()
    }
}
