use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actor::Direction;
use crate::cutscene::CutsceneData;

/// On-disk scene description (`<assets>/<name>.json`).
///
/// Image sizes are optional here; the JSON loader fills them in from the PNG headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneData {
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub music: String,
    pub obstacles: Vec<ObstacleData>,
    pub diagonals: Vec<DiagonalData>,
    pub doors: Vec<DoorData>,
    pub npcs: Vec<NpcData>,
    pub cutscenes: Vec<CutsceneData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleData {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagonalData {
    pub start_x: f32,
    pub start_y: f32,
    pub width: f32,
    pub height: f32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorData {
    #[serde(default)]
    pub id: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub new_x: f32,
    pub new_y: f32,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcData {
    pub name: String,
    /// Facing (`up`, `down`, `left`, `right`) to sheet key.
    pub sprite_sheets: BTreeMap<String, String>,
    pub frame_count: u32,
    #[serde(default)]
    pub frame_width: Option<u32>,
    #[serde(default)]
    pub frame_height: Option<u32>,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub behaviors: Vec<BehaviorData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum BehaviorData {
    Walker(WalkerData),
    Talker(TalkerData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerData {
    pub direction: Direction,
    pub speed: f32,
    #[serde(default)]
    pub timer: PatrolTimerData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolTimerData {
    pub move_timer: i32,
    pub stop_timer: i32,
    pub is_stopped: bool,
    pub stop_duration: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkerData {
    pub lines: Vec<String>,
    #[serde(default)]
    pub portrait: Option<String>,
}
