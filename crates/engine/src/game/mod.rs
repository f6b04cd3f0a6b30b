use std::collections::HashMap;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::ability::AbilityKind;
use crate::actor::AnimationFrame;
use crate::app::{
    camera_offset, world_to_screen, InputAction, InputEdges, InputSnapshot, KeyEdges,
    RenderTarget, SpriteDraw,
};
use crate::audio::MusicPlayer;
use crate::collision::Door;
use crate::config::GameConfig;
use crate::cutscene::{ActorRef, Cutscene, CutsceneError, Stage, TargetRef, TargetResolver};
use crate::dialogue::DialogueBox;
use crate::geometry::{Rect, Vec2};
use crate::npc::InteractionState;
use crate::player::{heading_from_keys, Player};
use crate::scene::{Scene, SceneLoadError, SceneLoader};
use crate::transition::TransitionState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GameState {
    #[default]
    Play,
    /// Fading out after a door hit.
    Transition,
    /// Fading back in on the destination scene.
    NewScene,
    CutScene,
    /// StopTime is active: the player moves, NPCs are frozen.
    TimeStopped,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    SceneLoad(#[from] SceneLoadError),
    #[error(transparent)]
    Cutscene(#[from] CutsceneError),
}

/// Top-level state machine. Owns the world and advances it one fixed tick at a time.
pub struct Game {
    config: GameConfig,
    loader: Box<dyn SceneLoader>,
    music: MusicPlayer,
    player: Player,
    scenes: HashMap<String, Scene>,
    current_scene: String,
    current_door: Option<Door>,
    cutscene: Option<Cutscene>,
    state: GameState,
    transition: TransitionState,
    dialogue: DialogueBox,
    edges: KeyEdges,
}

impl Game {
    pub fn new(
        config: GameConfig,
        loader: Box<dyn SceneLoader>,
        music: MusicPlayer,
    ) -> Result<Self, GameError> {
        let player = Player::new(
            config.player_spawn,
            config.player_frame.animation(),
            config.player_speed,
            config.player_sprite_prefix.clone(),
            config.player_sprite_suffix.clone(),
        );
        let transition = TransitionState::new(config.fade_speed, music.busy_flag());
        let mut game = Self {
            current_scene: config.start_scene.clone(),
            dialogue: DialogueBox::new(config.dialogue_frames_per_char),
            config,
            loader,
            music,
            player,
            scenes: HashMap::new(),
            current_door: None,
            cutscene: None,
            state: GameState::Play,
            transition,
            edges: KeyEdges::default(),
        };
        let start = game.current_scene.clone();
        game.ensure_scene_loaded(&start)?;
        info!(scene = %start, "game_started");
        Ok(game)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn current_scene_name(&self) -> &str {
        &self.current_scene
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.scenes.get(&self.current_scene)
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    pub fn dialogue(&self) -> &DialogueBox {
        &self.dialogue
    }

    pub fn cutscene(&self) -> Option<&Cutscene> {
        self.cutscene.as_ref()
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Advances the world by one tick.
    ///
    /// Errors are reported after the tick has completed; the game stays consistent
    /// and can keep being updated.
    pub fn update(&mut self, input: &InputSnapshot) -> Result<(), GameError> {
        let edges = self.edges.update(input);
        let scene_before = self.current_scene.clone();

        self.handle_music(&edges);

        if self.state == GameState::TimeStopped
            && !self.player.ability.is_active(AbilityKind::StopTime)
        {
            self.state = GameState::Play;
            info!("time_resumed");
        }

        let result = match self.state {
            GameState::Play => self.update_play(&edges),
            GameState::TimeStopped => {
                self.handle_ability_input(&edges);
                self.walk_player(&edges);
                Ok(())
            }
            GameState::Transition => {
                if self.transition.fade_out_step(self.transition.fade_speed) {
                    self.enter_door()
                } else {
                    Ok(())
                }
            }
            GameState::NewScene => {
                if self.transition.fade_in_step(self.transition.fade_speed) {
                    self.state = GameState::Play;
                }
                Ok(())
            }
            GameState::CutScene => {
                self.update_cutscene(&edges);
                Ok(())
            }
        };

        if self.state != GameState::CutScene {
            self.dialogue.tick();
        }

        let materialised = if self.scenes.contains_key(&self.current_scene) {
            Ok(())
        } else {
            let name = self.current_scene.clone();
            self.ensure_scene_loaded(&name).map_err(|error| {
                error!(scene = %name, fallback = %scene_before, error = %error, "scene_change_failed");
                self.current_scene = scene_before;
                error
            })
        };

        result.and(materialised)
    }

    /// Resolves the named cutscene of the current scene against the live world and
    /// starts it. Scripts with defects are rejected and nothing changes.
    pub fn play_cutscene(&mut self, id: &str) -> Result<(), CutsceneError> {
        let unknown = || CutsceneError::UnknownCutscene {
            id: id.to_string(),
            scene: self.current_scene.clone(),
        };
        let scene = self.scenes.get(&self.current_scene).ok_or_else(unknown)?;
        let script = scene.cutscene(id).ok_or_else(unknown)?;
        let resolver = WorldResolver {
            scene_name: &self.current_scene,
            scene,
        };
        let mut cutscene = Cutscene::resolve(script, &resolver);
        cutscene.validate()?;

        self.end_conversations();
        cutscene.start();
        self.mark_cutscene_actors(&cutscene, InteractionState::None, InteractionState::CutScene);
        self.cutscene = Some(cutscene);
        self.state = GameState::CutScene;
        Ok(())
    }

    /// Draws the current frame: world layers, dialogue and the fade overlay.
    pub fn draw(&self, target: &mut dyn RenderTarget) {
        let Some(scene) = self.scenes.get(&self.current_scene) else {
            return;
        };
        let offset = camera_offset(self.player.position(), target.screen_size(), scene.size);

        target.draw_sprite(&SpriteDraw {
            key: &scene.background,
            source: None,
            offset,
            mirrored: false,
        });

        for npc in scene.npcs.values() {
            let Some((key, mirrored)) = npc.sprite() else {
                continue;
            };
            target.draw_sprite(&SpriteDraw {
                key,
                source: Some(frame_source(&npc.motion.frame)),
                offset: world_to_screen(npc.position(), offset),
                mirrored,
            });
        }

        let (player_key, mirrored) = self.player.sprite();
        target.draw_sprite(&SpriteDraw {
            key: &player_key,
            source: Some(frame_source(&self.player.motion.frame)),
            offset: world_to_screen(self.player.top_left(), offset),
            mirrored,
        });

        if let Some(foreground) = &scene.foreground {
            target.draw_sprite(&SpriteDraw {
                key: foreground,
                source: None,
                offset,
                mirrored: false,
            });
        }

        match self.state {
            GameState::Play | GameState::TimeStopped => self.draw_dialogue(target),
            GameState::Transition | GameState::NewScene => {
                target.fill_overlay(self.transition.alpha());
            }
            GameState::CutScene => {
                self.draw_dialogue(target);
                target.fill_overlay(self.transition.alpha());
            }
        }
    }

    fn draw_dialogue(&self, target: &mut dyn RenderTarget) {
        if let Some(view) = self.dialogue.view() {
            target.draw_dialogue(&view);
        }
    }

    fn update_play(&mut self, edges: &InputEdges) -> Result<(), GameError> {
        self.handle_ability_input(edges);
        self.walk_player(edges);

        let confirm_held = edges.is_down(InputAction::Confirm);
        if let Some(scene) = self.scenes.get_mut(&self.current_scene) {
            scene.tick_npcs(confirm_held);
            scene.handle_npc_interactions(
                &mut self.player,
                edges,
                &mut self.dialogue,
                self.config.npc_interaction_radius,
            );
        }

        if self.state != GameState::Play {
            return Ok(());
        }
        if edges.pressed(InputAction::TriggerCutscene) {
            if let Some(id) = self.config.debug_cutscene.clone() {
                if let Err(error) = self.play_cutscene(&id) {
                    warn!(cutscene = %id, error = %error, "cutscene_rejected");
                    return Err(error.into());
                }
                return Ok(());
            }
        }
        if self.player.ability.is_active(AbilityKind::StopTime) {
            self.state = GameState::TimeStopped;
            info!("time_stopped");
        }
        Ok(())
    }

    fn handle_ability_input(&mut self, edges: &InputEdges) {
        if edges.pressed(InputAction::CycleAbility) {
            self.player.ability.cycle();
        }
        if edges.pressed(InputAction::UseAbility) {
            self.player.ability.toggle();
        }
    }

    fn walk_player(&mut self, edges: &InputEdges) {
        let Some(scene) = self.scenes.get(&self.current_scene) else {
            return;
        };
        let heading = heading_from_keys(
            edges.is_down(InputAction::MoveUp),
            edges.is_down(InputAction::MoveDown),
            edges.is_down(InputAction::MoveLeft),
            edges.is_down(InputAction::MoveRight),
        );
        if let Some(door) = self.player.walk(heading, &scene.collisions, scene.size) {
            info!(door = %door.id, destination = %door.destination, "door_entered");
            self.current_door = Some(door);
            self.state = GameState::Transition;
        }
    }

    /// Commits a door once the screen is black. On failure the player stays where
    /// they were and the screen fades back in on the old scene.
    fn enter_door(&mut self) -> Result<(), GameError> {
        self.state = GameState::NewScene;
        let Some(door) = self.current_door.take() else {
            return Ok(());
        };
        if let Err(error) = self.ensure_scene_loaded(&door.destination) {
            error!(
                door = %door.id,
                destination = %door.destination,
                error = %error,
                "door_destination_load_failed"
            );
            return Err(error);
        }
        info!(from = %self.current_scene, to = %door.destination, "scene_changed");
        self.current_scene = door.destination;
        self.player.motion.position = door.target;
        Ok(())
    }

    fn update_cutscene(&mut self, edges: &InputEdges) {
        let Some(cutscene) = self.cutscene.as_mut() else {
            self.state = GameState::Play;
            return;
        };
        let mut stage = Stage {
            player: &mut self.player,
            scenes: &mut self.scenes,
            dialogue: &mut self.dialogue,
            music: &self.music,
            scene_name: &mut self.current_scene,
        };
        cutscene.update(&mut self.transition, edges, &mut stage);

        if !cutscene.is_playing() {
            if let Some(finished) = self.cutscene.take() {
                self.mark_cutscene_actors(
                    &finished,
                    InteractionState::CutScene,
                    InteractionState::None,
                );
            }
            self.state = GameState::Play;
        }
    }

    fn handle_music(&mut self, edges: &InputEdges) {
        if edges.pressed(InputAction::ToggleMusic) {
            self.music.toggle_pause();
        }
        if let Some(scene) = self.scenes.get(&self.current_scene) {
            self.music
                .sync_scene_track(&scene.music, self.state != GameState::CutScene);
        }
    }

    /// Closes an NPC conversation in progress: the box is closed, the player may move
    /// again and talking NPCs go back to idle.
    fn end_conversations(&mut self) {
        if self.dialogue.is_open() {
            info!("conversation_interrupted");
        }
        self.dialogue.close();
        self.player.can_move = true;
        for scene in self.scenes.values_mut() {
            for npc in scene.npcs.values_mut() {
                if matches!(
                    npc.interaction,
                    InteractionState::PlayerInteracted
                        | InteractionState::WaitingForPlayerToResume
                ) {
                    npc.interaction = InteractionState::None;
                }
            }
        }
    }

    /// Moves every NPC a cutscene addresses from `from` to `to`.
    fn mark_cutscene_actors(
        &mut self,
        cutscene: &Cutscene,
        from: InteractionState,
        to: InteractionState,
    ) {
        for action in cutscene.actions() {
            let TargetRef::Actor(ActorRef::Npc { scene, name }) = &action.target else {
                continue;
            };
            let npc = self
                .scenes
                .get_mut(scene)
                .and_then(|scene| scene.npcs.get_mut(name));
            if let Some(npc) = npc {
                if npc.interaction == from {
                    npc.interaction = to;
                }
            }
        }
    }

    fn ensure_scene_loaded(&mut self, name: &str) -> Result<(), GameError> {
        if self.scenes.contains_key(name) {
            return Ok(());
        }
        let data = self.loader.load(name)?;
        let scene = Scene::from_data(name, data)?;
        self.scenes.insert(name.to_string(), scene);
        Ok(())
    }
}

fn frame_source(frame: &AnimationFrame) -> Rect {
    Rect::from_origin_size(
        Vec2::new(frame.source_x() as f32, 0.0),
        frame.width as f32,
        frame.height as f32,
    )
}

/// Binds script symbols to the live world: well-known names first, then NPCs of the
/// scene the cutscene belongs to.
struct WorldResolver<'a> {
    scene_name: &'a str,
    scene: &'a Scene,
}

impl TargetResolver for WorldResolver<'_> {
    fn resolve(&self, symbol: &str) -> Option<TargetRef> {
        match symbol {
            "player" => Some(TargetRef::Actor(ActorRef::Player)),
            "dialogue" => Some(TargetRef::Dialogue),
            "music" => Some(TargetRef::Music),
            "scene" => Some(TargetRef::SceneName),
            name => self.scene.npcs.contains_key(name).then(|| {
                TargetRef::Actor(ActorRef::Npc {
                    scene: self.scene_name.to_string(),
                    name: name.to_string(),
                })
            }),
        }
    }
}

#[cfg(test)]
mod tests;
