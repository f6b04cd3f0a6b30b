mod data;
mod loader;

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::actor::{AnimationFrame, Direction, Motion};
use crate::app::{InputAction, InputEdges};
use crate::asset_keys::validate_asset_key;
use crate::collision::{Collisions, DiagonalRun, Door};
use crate::cutscene::CutsceneScript;
use crate::dialogue::DialogueBox;
use crate::geometry::{Rect, Vec2};
use crate::npc::{Behavior, InteractionState, Npc, PatrolTimer};
use crate::player::Player;

pub use data::{
    BehaviorData, DiagonalData, DoorData, NpcData, ObstacleData, PatrolTimerData, SceneData,
    TalkerData, WalkerData,
};
pub use loader::{parse_scene_json, JsonSceneLoader, SceneLoadError, SceneLoader};

/// A loaded map: imagery keys, collision geometry, NPC roster and cutscene scripts.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub size: Vec2,
    pub background: String,
    pub foreground: Option<String>,
    pub collisions: Collisions,
    pub music: String,
    pub npcs: BTreeMap<String, Npc>,
    pub cutscenes: HashMap<String, CutsceneScript>,
}

impl Scene {
    pub fn from_data(name: &str, data: SceneData) -> Result<Self, SceneLoadError> {
        check_asset_keys(name, &data)?;
        let (Some(width), Some(height)) = (data.width, data.height) else {
            return Err(SceneLoadError::MissingSize {
                scene: name.to_string(),
            });
        };

        let obstacles = data
            .obstacles
            .iter()
            .map(|obstacle| Rect::from_corners(obstacle.x1, obstacle.y1, obstacle.x2, obstacle.y2))
            .collect();
        let runs: Vec<DiagonalRun> = data
            .diagonals
            .iter()
            .map(|run| DiagonalRun {
                start: Vec2::new(run.start_x, run.start_y),
                width: run.width,
                height: run.height,
                count: run.count,
            })
            .collect();
        let doors = data
            .doors
            .into_iter()
            .map(|door| Door {
                id: door.id,
                rect: Rect::from_corners(door.x1, door.y1, door.x2, door.y2),
                destination: door.destination,
                target: Vec2::new(door.new_x, door.new_y),
            })
            .collect();

        let mut npcs = BTreeMap::new();
        for npc_data in data.npcs {
            let npc = build_npc(name, npc_data)?;
            if npcs.contains_key(&npc.name) {
                return Err(SceneLoadError::InvalidNpc {
                    scene: name.to_string(),
                    npc: npc.name,
                    reason: "duplicate name".to_string(),
                });
            }
            npcs.insert(npc.name.clone(), npc);
        }

        let cutscenes = data
            .cutscenes
            .into_iter()
            .map(|cutscene| {
                let script = CutsceneScript::from_data(cutscene);
                (script.id.clone(), script)
            })
            .collect::<HashMap<_, _>>();

        let scene = Self {
            name: name.to_string(),
            size: Vec2::new(width as f32, height as f32),
            background: data.background.unwrap_or_else(|| format!("{name}.png")),
            foreground: data.foreground,
            collisions: Collisions::new(obstacles, doors).with_diagonals(&runs),
            music: data.music,
            npcs,
            cutscenes,
        };
        info!(
            scene = name,
            width,
            height,
            obstacle_count = scene.collisions.obstacles().len(),
            door_count = scene.collisions.doors().len(),
            npc_count = scene.npcs.len(),
            cutscene_count = scene.cutscenes.len(),
            "scene_loaded"
        );
        Ok(scene)
    }

    pub fn cutscene(&self, id: &str) -> Option<&CutsceneScript> {
        self.cutscenes.get(id)
    }

    pub fn tick_npcs(&mut self, confirm_held: bool) {
        for npc in self.npcs.values_mut() {
            npc.tick(confirm_held);
        }
    }

    /// Talks to the first talker near the player on a confirm press.
    ///
    /// The first press freezes the player and opens the NPC's lines; later presses
    /// reveal or advance them. The player is released on the press that closes the
    /// last line.
    pub fn handle_npc_interactions(
        &mut self,
        player: &mut Player,
        input: &InputEdges,
        dialogue: &mut DialogueBox,
        radius: f32,
    ) {
        if !input.pressed(InputAction::Confirm) {
            return;
        }
        let reach = player.top_left();
        for npc in self.npcs.values_mut() {
            if !npc.near(reach, radius) {
                continue;
            }
            let Some((lines, portrait)) = npc.talker() else {
                continue;
            };
            let lines = lines.to_vec();
            let portrait = portrait.map(str::to_string);

            match npc.interaction {
                InteractionState::None => {
                    npc.interaction = InteractionState::PlayerInteracted;
                    player.can_move = false;
                }
                InteractionState::WaitingForPlayerToResume
                    if dialogue.is_finished() && dialogue.is_last_line() =>
                {
                    npc.interaction = InteractionState::None;
                    player.can_move = true;
                }
                _ => {}
            }

            if !dialogue.is_open() {
                dialogue.open(lines, Some(npc.name.clone()), portrait);
            } else if dialogue.is_finished() {
                dialogue.advance_line();
            } else {
                dialogue.reveal_all();
            }
            break;
        }
    }
}

/// Rejects keys that would escape the asset directory.
pub(crate) fn check_asset_keys(scene: &str, data: &SceneData) -> Result<(), SceneLoadError> {
    let mut keys: Vec<&str> = Vec::new();
    keys.extend(data.background.as_deref());
    keys.extend(data.foreground.as_deref());
    if !data.music.is_empty() {
        keys.push(&data.music);
    }
    for npc in &data.npcs {
        keys.extend(npc.sprite_sheets.values().map(String::as_str));
        for behavior in &npc.behaviors {
            if let BehaviorData::Talker(talker) = behavior {
                keys.extend(talker.portrait.as_deref());
            }
        }
    }
    for key in keys {
        validate_asset_key(key).map_err(|source| SceneLoadError::InvalidAssetKey {
            scene: scene.to_string(),
            key: key.to_string(),
            source,
        })?;
    }
    Ok(())
}

fn build_npc(scene: &str, data: NpcData) -> Result<Npc, SceneLoadError> {
    let invalid = |reason: String| SceneLoadError::InvalidNpc {
        scene: scene.to_string(),
        npc: data.name.clone(),
        reason,
    };

    let mut sprite_sheets = HashMap::new();
    for (facing, key) in &data.sprite_sheets {
        let direction = Direction::parse(facing)
            .ok_or_else(|| invalid(format!("unknown sprite sheet facing '{facing}'")))?;
        sprite_sheets.insert(direction, key.clone());
    }
    let (Some(frame_width), Some(frame_height)) = (data.frame_width, data.frame_height) else {
        return Err(invalid("frame size unknown".to_string()));
    };

    let behaviors: Vec<Behavior> = data
        .behaviors
        .iter()
        .map(|behavior| match behavior {
            BehaviorData::Walker(walker) => Behavior::Walker {
                direction: walker.direction,
                speed: walker.speed,
                timer: PatrolTimer {
                    move_ticks: walker.timer.move_timer,
                    stop_ticks: walker.timer.stop_timer,
                    is_stopped: walker.timer.is_stopped,
                    stop_duration: walker.timer.stop_duration,
                },
            },
            BehaviorData::Talker(talker) => Behavior::Talker {
                lines: talker.lines.clone(),
                portrait: talker.portrait.clone(),
            },
        })
        .collect();

    let facing = behaviors
        .iter()
        .find_map(|behavior| match behavior {
            Behavior::Walker { direction, .. } => Some(*direction),
            Behavior::Talker { .. } => None,
        })
        .or_else(|| {
            Direction::ALL
                .into_iter()
                .find(|direction| sprite_sheets.contains_key(direction))
        })
        .unwrap_or_default();

    Ok(Npc::new(
        data.name.clone(),
        Motion::new(
            Vec2::new(data.x, data.y),
            facing,
            AnimationFrame::new(frame_width, frame_height, data.frame_count),
        ),
        sprite_sheets,
        behaviors,
    ))
}
