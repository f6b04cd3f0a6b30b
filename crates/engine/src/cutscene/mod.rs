mod action;
mod resolve;
mod script;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actor::Motion;
use crate::app::{InputAction, InputEdges};
use crate::audio::MusicPlayer;
use crate::dialogue::DialogueBox;
use crate::geometry::Vec2;
use crate::player::Player;
use crate::scene::Scene;
use crate::transition::TransitionState;

pub use action::{Action, ActionKind, ActorRef, Payload, PayloadKind, TargetKind, TargetRef};
pub use resolve::{coerce_payload, resolve_action, ScriptDefect, TargetResolver};
pub use script::{ActionData, CutsceneData, CutsceneScript, ScriptedAction};

/// Pixels per tick for scripted moves.
pub const CUTSCENE_MOVE_SPEED: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CutsceneError {
    #[error("cutscene '{id}' not found in scene '{scene}'")]
    UnknownCutscene { id: String, scene: String },
    #[error("cutscene '{id}' has {} script defect(s); first: {}", .defects.len(), first_defect(.defects))]
    Invalid {
        id: String,
        defects: Vec<ScriptDefect>,
    },
}

fn first_defect(defects: &[ScriptDefect]) -> String {
    defects
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Mutable world an action may touch during one tick.
pub struct Stage<'a> {
    pub player: &'a mut Player,
    pub scenes: &'a mut HashMap<String, Scene>,
    pub dialogue: &'a mut DialogueBox,
    pub music: &'a MusicPlayer,
    pub scene_name: &'a mut String,
}

/// A live cutscene: resolved actions plus sequencing state.
///
/// `cursor` is the oldest action not yet completed. Actions after the cursor run in
/// parallel with it unless they set `wait_previous`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cutscene {
    id: String,
    actions: Vec<Action>,
    cursor: usize,
    active: Vec<bool>,
    is_playing: bool,
}

impl Cutscene {
    /// Binds every symbolic target and payload once. Defects are logged and kept on
    /// the affected actions.
    pub fn resolve(script: &CutsceneScript, resolver: &dyn TargetResolver) -> Self {
        let actions: Vec<Action> = script
            .actions
            .iter()
            .enumerate()
            .map(|(index, scripted)| resolve_action(index, scripted, resolver))
            .collect();
        for defect in actions.iter().filter_map(|action| action.defect.as_ref()) {
            warn!(cutscene = %script.id, defect = %defect, "cutscene_script_defect");
        }
        Self::from_actions(script.id.clone(), actions)
    }

    pub fn from_actions(id: impl Into<String>, actions: Vec<Action>) -> Self {
        let active = vec![false; actions.len()];
        Self {
            id: id.into(),
            actions,
            cursor: 0,
            active,
            is_playing: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.get(index).copied().unwrap_or(false)
    }

    pub fn defects(&self) -> impl Iterator<Item = &ScriptDefect> {
        self.actions.iter().filter_map(|action| action.defect.as_ref())
    }

    pub fn validate(&self) -> Result<(), CutsceneError> {
        let defects: Vec<ScriptDefect> = self.defects().cloned().collect();
        if defects.is_empty() {
            Ok(())
        } else {
            Err(CutsceneError::Invalid {
                id: self.id.clone(),
                defects,
            })
        }
    }

    pub fn start(&mut self) {
        self.cursor = 0;
        self.active = vec![false; self.actions.len()];
        self.is_playing = true;
        info!(cutscene = %self.id, action_count = self.actions.len(), "cutscene_started");
    }

    /// One tick: sweeps every action in declaration order.
    pub fn update(
        &mut self,
        transition: &mut TransitionState,
        input: &InputEdges,
        stage: &mut Stage<'_>,
    ) {
        if !self.is_playing {
            return;
        }

        for index in 0..self.actions.len() {
            if index < self.cursor && !self.active[index] {
                continue;
            }
            if self.actions[index].wait_previous && index > self.cursor {
                continue;
            }

            let first_tick = !self.active[index];
            let completed =
                process_action(&self.actions[index], first_tick, transition, input, stage);
            if completed {
                self.active[index] = false;
                if index == self.cursor {
                    self.cursor += 1;
                }
            } else {
                self.active[index] = true;
            }
        }

        if self.cursor >= self.actions.len() {
            self.is_playing = false;
            info!(cutscene = %self.id, "cutscene_finished");
        }
    }
}

fn process_action(
    action: &Action,
    first_tick: bool,
    transition: &mut TransitionState,
    input: &InputEdges,
    stage: &mut Stage<'_>,
) -> bool {
    if action.is_defective() {
        return false;
    }

    match (&action.kind, &action.target, &action.payload) {
        (ActionKind::MoveActor, TargetRef::Actor(actor), Payload::Point(point)) => {
            match actor {
                ActorRef::Player => {
                    let target = player_anchor(stage.player, *point);
                    stage
                        .player
                        .motion
                        .step_toward(target, CUTSCENE_MOVE_SPEED)
                }
                ActorRef::Npc { scene, name } => match npc_motion(stage, scene, name) {
                    Some(motion) => motion.step_toward(*point, CUTSCENE_MOVE_SPEED),
                    None => false,
                },
            }
        }
        (ActionKind::Teleport, TargetRef::Actor(actor), Payload::Point(point)) => match actor {
            ActorRef::Player => {
                stage.player.motion.position = player_anchor(stage.player, *point);
                true
            }
            ActorRef::Npc { scene, name } => match npc_motion(stage, scene, name) {
                Some(motion) => {
                    motion.position = *point;
                    true
                }
                None => false,
            },
        },
        (ActionKind::TurnActor, TargetRef::Actor(actor), Payload::Direction(direction)) => {
            match actor {
                ActorRef::Player => {
                    stage.player.motion.direction = *direction;
                    true
                }
                ActorRef::Npc { scene, name } => match npc_motion(stage, scene, name) {
                    Some(motion) => {
                        motion.direction = *direction;
                        true
                    }
                    None => false,
                },
            }
        }
        (ActionKind::FadeOut, _, Payload::Step(step)) => transition.fade_out_step(*step),
        (ActionKind::FadeIn, _, Payload::Step(step)) => transition.fade_in_step(*step),
        (ActionKind::ChangeScene, TargetRef::SceneName, Payload::Text(name)) => {
            *stage.scene_name = name.clone();
            true
        }
        (ActionKind::StopMusic, TargetRef::Music, _) => {
            stage.music.stop();
            true
        }
        (ActionKind::ChangeMusic, TargetRef::Music, Payload::Text(track)) => {
            if stage.music.change_track(track).is_none() {
                debug!(track = %track, "cutscene_music_change_dropped");
            }
            true
        }
        (ActionKind::Wait, _, Payload::Ticks(ticks)) => transition.wait_step(*ticks),
        (ActionKind::ShowDialogue, TargetRef::Dialogue, Payload::Lines(lines)) => {
            show_dialogue(stage.dialogue, lines, first_tick, input)
        }
        _ => false,
    }
}

/// The action owns the box from its first tick on; whatever was showing is replaced.
fn show_dialogue(
    dialogue: &mut DialogueBox,
    lines: &[String],
    first_tick: bool,
    input: &InputEdges,
) -> bool {
    if first_tick || !dialogue.is_open() {
        dialogue.open(lines.to_vec(), None, None);
        return false;
    }
    if input.pressed(InputAction::Confirm) {
        if dialogue.is_finished() {
            dialogue.advance_line();
            if !dialogue.is_open() {
                return true;
            }
        } else {
            dialogue.reveal_all();
        }
    }
    dialogue.tick();
    false
}

/// Scripts address the player by sprite top-left; the player is centre-anchored.
fn player_anchor(player: &Player, point: Vec2) -> Vec2 {
    let anchor = player.anchor_offset();
    point.offset(anchor.x, anchor.y)
}

fn npc_motion<'s>(
    stage: &'s mut Stage<'_>,
    scene: &str,
    name: &str,
) -> Option<&'s mut Motion> {
    stage
        .scenes
        .get_mut(scene)
        .and_then(|scene| scene.npcs.get_mut(name))
        .map(|npc| &mut npc.motion)
}

#[cfg(test)]
mod tests;
