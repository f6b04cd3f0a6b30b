use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};

use super::*;
use crate::actor::Direction;
use crate::app::Viewport;
use crate::audio::test_backend::RecordingBackend;
use crate::audio::FadeTimings;
use crate::dialogue::DialogueView;
use crate::scene::SceneData;

const GUARD_START: Vec2 = Vec2::new(600.0, 100.0);

struct MemoryLoader {
    scenes: HashMap<String, Value>,
    loads: Rc<RefCell<Vec<String>>>,
}

impl SceneLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<SceneData, SceneLoadError> {
        self.loads.borrow_mut().push(name.to_string());
        let value = self
            .scenes
            .get(name)
            .cloned()
            .ok_or_else(|| SceneLoadError::Io {
                path: PathBuf::from(format!("{name}.json")),
                source: io::Error::new(io::ErrorKind::NotFound, "no such scene"),
            })?;
        Ok(serde_json::from_value(value).expect("scene json"))
    }
}

#[derive(Default)]
struct RecordingTarget {
    ops: Vec<String>,
    sprites: Vec<(String, Option<Rect>, Vec2, bool)>,
}

impl RenderTarget for RecordingTarget {
    fn screen_size(&self) -> Viewport {
        Viewport {
            width: 800,
            height: 600,
        }
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>) {
        self.ops.push(format!("sprite:{}", sprite.key));
        self.sprites.push((
            sprite.key.to_string(),
            sprite.source,
            sprite.offset,
            sprite.mirrored,
        ));
    }

    fn fill_overlay(&mut self, alpha: f32) {
        self.ops.push(format!("overlay:{alpha}"));
    }

    fn draw_dialogue(&mut self, view: &DialogueView<'_>) {
        self.ops.push(format!("dialogue:{}", view.text));
    }
}

fn main_map(cutscenes: Value) -> Value {
    json!({
        "width": 800,
        "height": 600,
        "obstacles": [{"x1": 200, "y1": 0, "x2": 240, "y2": 600}],
        "doors": [
            {
                "id": "cave_door",
                "x1": 200, "y1": 250, "x2": 240, "y2": 350,
                "new_x": 50, "new_y": 60,
                "destination": "cave"
            },
            {
                "id": "open_arch",
                "x1": 400, "y1": 0, "x2": 440, "y2": 100,
                "new_x": 0, "new_y": 0,
                "destination": "cave"
            }
        ],
        "npcs": [{
            "name": "guard",
            "sprite_sheets": {"right": "guardRight.png"},
            "frame_count": 2, "frame_width": 32, "frame_height": 48,
            "x": GUARD_START.x, "y": GUARD_START.y,
            "behaviors": [{
                "type": "walker",
                "details": {"direction": "right", "speed": 2, "timer": {"move_timer": 100, "stop_duration": 30}}
            }]
        }],
        "cutscenes": cutscenes
    })
}

fn cave() -> Value {
    json!({"width": 400, "height": 300, "foreground": "caveFore.png"})
}

struct Harness {
    game: Game,
    backend: RecordingBackend,
    loads: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new(main: Value) -> Self {
        Self::with_spawn(main, Vec2::new(170.0, 300.0))
    }

    fn with_spawn(main: Value, spawn: Vec2) -> Self {
        let loads = Rc::new(RefCell::new(Vec::new()));
        let loader = MemoryLoader {
            scenes: HashMap::from([
                ("mainMap".to_string(), main),
                ("cave".to_string(), cave()),
            ]),
            loads: Rc::clone(&loads),
        };
        let backend = RecordingBackend::default();
        let music = MusicPlayer::new(
            Box::new(backend.clone()),
            PathBuf::from("assets"),
            FadeTimings {
                stop: Duration::ZERO,
                swap: Duration::ZERO,
                toggle: Duration::ZERO,
            },
        );
        let config = GameConfig {
            fade_speed: 0.5,
            player_speed: 10.0,
            player_spawn: spawn,
            dialogue_frames_per_char: 1,
            ..GameConfig::default()
        };
        let game = Game::new(config, Box::new(loader), music).expect("game");
        Self {
            game,
            backend,
            loads,
        }
    }

    fn tick(&mut self) -> Result<(), GameError> {
        self.game.update(&InputSnapshot::empty())
    }

    fn press(&mut self, action: InputAction) -> Result<(), GameError> {
        self.game
            .update(&InputSnapshot::empty().with_action_down(action, true))
    }

    fn guard_position(&self) -> Vec2 {
        self.game.current_scene().expect("scene").npcs["guard"].position()
    }

    fn loads(&self) -> Vec<String> {
        self.loads.borrow().clone()
    }
}

#[test]
fn door_hit_fades_out_swaps_scene_and_fades_in() {
    let mut harness = Harness::new(main_map(json!([])));

    harness.press(InputAction::MoveRight).expect("tick");
    assert_eq!(harness.game.state(), GameState::Transition);
    assert_eq!(harness.game.player().position(), Vec2::new(170.0, 300.0));

    harness.tick().expect("tick");
    assert_eq!(harness.game.transition().alpha(), 0.5);
    assert_eq!(harness.game.current_scene_name(), "mainMap");

    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::NewScene);
    assert_eq!(harness.game.current_scene_name(), "cave");
    assert_eq!(harness.game.player().position(), Vec2::new(50.0, 60.0));

    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::NewScene);
    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert_eq!(harness.game.transition().alpha(), 0.0);
}

#[test]
fn plain_obstacle_blocks_without_transition() {
    let mut harness = Harness::with_spawn(main_map(json!([])), Vec2::new(170.0, 100.0));
    harness.press(InputAction::MoveRight).expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert_eq!(harness.game.player().position(), Vec2::new(170.0, 100.0));
    assert_eq!(harness.game.player().motion.direction, Direction::Right);
}

#[test]
fn door_without_obstacle_is_walked_through() {
    let mut harness = Harness::with_spawn(main_map(json!([])), Vec2::new(370.0, 50.0));
    harness.press(InputAction::MoveRight).expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert_eq!(harness.game.player().position(), Vec2::new(380.0, 50.0));
}

#[test]
fn failed_door_destination_keeps_prior_scene() {
    let mut main = main_map(json!([]));
    main["doors"][0]["destination"] = json!("nowhere");
    let mut harness = Harness::new(main);

    harness.press(InputAction::MoveRight).expect("tick");
    harness.tick().expect("tick");
    let error = harness.tick().expect_err("load fails");
    assert!(matches!(error, GameError::SceneLoad(SceneLoadError::Io { .. })));
    assert_eq!(harness.game.current_scene_name(), "mainMap");
    assert_eq!(harness.game.player().position(), Vec2::new(170.0, 300.0));
    assert_eq!(harness.game.state(), GameState::NewScene);

    harness.tick().expect("tick");
    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
}

#[test]
fn stop_time_freezes_npcs_until_released() {
    let mut harness = Harness::new(main_map(json!([])));

    harness.press(InputAction::CycleAbility).expect("tick");
    harness.tick().expect("tick");
    harness.press(InputAction::CycleAbility).expect("tick");
    assert_eq!(harness.game.player().ability.kind(), AbilityKind::StopTime);
    assert_eq!(harness.game.state(), GameState::Play);

    harness.press(InputAction::UseAbility).expect("tick");
    assert_eq!(harness.game.state(), GameState::TimeStopped);
    let frozen_at = harness.guard_position();
    assert_eq!(frozen_at, GUARD_START.offset(8.0, 0.0));

    for _ in 0..5 {
        harness.tick().expect("tick");
    }
    assert_eq!(harness.guard_position(), frozen_at);

    harness.press(InputAction::UseAbility).expect("tick");
    assert!(!harness.game.player().ability.is_activated());
    assert_eq!(harness.game.state(), GameState::TimeStopped);

    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert_eq!(harness.guard_position(), frozen_at.offset(2.0, 0.0));
}

#[test]
fn debug_trigger_plays_cutscene_then_returns_to_play() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "exampleCutscene", "actions": [{"type": "Wait", "data": 3}]}
    ])));

    harness.press(InputAction::TriggerCutscene).expect("tick");
    assert_eq!(harness.game.state(), GameState::CutScene);
    assert!(harness.game.cutscene().is_some_and(Cutscene::is_playing));

    harness.tick().expect("tick");
    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::CutScene);
    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert!(harness.game.cutscene().is_none());
}

#[test]
fn defective_cutscene_is_rejected() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "exampleCutscene", "actions": [
            {"type": "Moonwalk", "target": "player"},
            {"type": "TurnNPC", "target": "ghost", "data": "left"}
        ]}
    ])));

    let error = harness
        .press(InputAction::TriggerCutscene)
        .expect_err("rejected");
    match error {
        GameError::Cutscene(CutsceneError::Invalid { defects, .. }) => assert_eq!(defects.len(), 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(harness.game.state(), GameState::Play);
    assert!(harness.game.cutscene().is_none());

    assert!(matches!(
        harness.game.play_cutscene("missing"),
        Err(CutsceneError::UnknownCutscene { .. })
    ));
}

#[test]
fn cutscene_holds_its_npcs_and_releases_them() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "guardStep", "actions": [
            {"type": "MoveNPC", "target": "guard", "data": {"x": 600, "y": 100}},
            {"type": "Wait", "data": 2, "wait_previous": true}
        ]}
    ])));

    harness.game.play_cutscene("guardStep").expect("play");
    let guard = |harness: &Harness| {
        harness.game.current_scene().expect("scene").npcs["guard"].interaction
    };
    assert_eq!(guard(&harness), InteractionState::CutScene);

    harness.tick().expect("tick");
    assert_eq!(guard(&harness), InteractionState::CutScene);
    assert_eq!(harness.guard_position(), GUARD_START);

    harness.tick().expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert_eq!(guard(&harness), InteractionState::None);
}

#[test]
fn cutscene_interrupts_npc_conversation_and_frees_the_player() {
    let mut main = main_map(json!([
        {"id": "exampleCutscene", "actions": [
            {"type": "ShowDialogue", "target": "dialogue", "data": ["Cutscene line."]},
            {"type": "TeleportPlayer", "target": "player", "data": {"x": 600, "y": 400}, "wait_previous": true}
        ]}
    ]));
    main["npcs"]
        .as_array_mut()
        .expect("npc list")
        .push(json!({
            "name": "innkeeper",
            "sprite_sheets": {"down": "innkeeperDown.png"},
            "frame_count": 1, "frame_width": 32, "frame_height": 48,
            "x": 150, "y": 270,
            "behaviors": [{"type": "talker", "details": {"lines": ["Welcome.", "Rest well."]}}]
        }));
    let mut harness = Harness::new(main);
    let innkeeper = |harness: &Harness| {
        harness.game.current_scene().expect("scene").npcs["innkeeper"].interaction
    };

    harness.press(InputAction::Confirm).expect("tick");
    assert_eq!(harness.game.dialogue().lines(), ["Welcome.", "Rest well."]);
    assert!(!harness.game.player().can_move);
    assert_eq!(innkeeper(&harness), InteractionState::PlayerInteracted);

    harness.press(InputAction::TriggerCutscene).expect("tick");
    assert_eq!(harness.game.state(), GameState::CutScene);
    assert!(harness.game.player().can_move);
    assert_eq!(innkeeper(&harness), InteractionState::None);

    harness.tick().expect("tick");
    assert_eq!(harness.game.dialogue().lines(), ["Cutscene line."]);
    assert_eq!(harness.game.dialogue().current_line(), 0);

    harness.press(InputAction::Confirm).expect("tick");
    assert!(harness.game.dialogue().is_finished());
    harness.tick().expect("tick");
    harness.press(InputAction::Confirm).expect("tick");
    assert_eq!(harness.game.state(), GameState::Play);
    assert!(!harness.game.dialogue().is_open());
    assert_eq!(harness.game.player().position(), Vec2::new(624.0, 434.0));

    harness.press(InputAction::MoveLeft).expect("tick");
    assert_eq!(harness.game.player().position(), Vec2::new(614.0, 434.0));
}

#[test]
fn scenes_load_lazily_once() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "visit", "actions": [
            {"type": "ChangeScene", "target": "scene", "data": "cave"},
            {"type": "Wait", "data": 2},
            {"type": "ChangeScene", "target": "scene", "data": "mainMap", "wait_previous": true}
        ]}
    ])));
    assert_eq!(harness.loads(), vec!["mainMap"]);

    harness.game.play_cutscene("visit").expect("play");
    harness.tick().expect("tick");
    assert_eq!(harness.game.current_scene_name(), "cave");
    assert!(harness.game.scene("cave").is_some());
    harness.tick().expect("tick");
    assert_eq!(harness.game.current_scene_name(), "mainMap");
    assert_eq!(harness.game.state(), GameState::Play);

    harness.game.play_cutscene("visit").expect("play again");
    harness.tick().expect("tick");
    harness.tick().expect("tick");
    assert_eq!(harness.loads(), vec!["mainMap", "cave"]);
}

#[test]
fn failed_scene_change_reverts_to_previous_scene() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "lost", "actions": [{"type": "ChangeScene", "target": "scene", "data": "nowhere"}]}
    ])));

    harness.game.play_cutscene("lost").expect("play");
    let error = harness.tick().expect_err("load fails");
    assert!(matches!(error, GameError::SceneLoad(_)));
    assert_eq!(harness.game.current_scene_name(), "mainMap");
    assert_eq!(harness.game.state(), GameState::Play);

    harness.tick().expect("keeps running");
}

#[test]
fn scene_music_starts_and_toggles() {
    let mut main = main_map(json!([]));
    main["music"] = json!("town.mp3");
    let mut harness = Harness::new(main);

    harness.tick().expect("tick");
    assert_eq!(
        harness.backend.loads(),
        vec![PathBuf::from("assets/town.mp3")]
    );
    assert_eq!(
        harness.game.music().current_track().as_deref(),
        Some("town.mp3")
    );

    harness.press(InputAction::ToggleMusic).expect("tick");
    assert!(harness.game.music().is_paused());
}

#[test]
fn play_draw_order_is_world_then_dialogue() {
    let harness = Harness::new(main_map(json!([])));
    let mut target = RecordingTarget::default();
    harness.game.draw(&mut target);

    assert_eq!(
        target.ops,
        vec![
            "sprite:mainMap.png",
            "sprite:guardRight.png",
            "sprite:playerDownBlack.png",
        ]
    );
    let (_, source, offset, mirrored) = &target.sprites[2];
    assert_eq!(
        *source,
        Some(Rect::from_origin_size(Vec2::new(0.0, 0.0), 48.0, 68.0))
    );
    assert_eq!(*offset, Vec2::new(146.0, 266.0));
    assert!(!mirrored);
}

#[test]
fn cutscene_overlay_is_drawn_over_dialogue() {
    let mut harness = Harness::new(main_map(json!([
        {"id": "talk", "actions": [{"type": "ShowDialogue", "target": "dialogue", "data": ["Hi"]}]}
    ])));
    harness.game.play_cutscene("talk").expect("play");
    harness.tick().expect("tick");

    let mut target = RecordingTarget::default();
    harness.game.draw(&mut target);
    let tail = &target.ops[target.ops.len() - 2..];
    assert_eq!(tail, ["dialogue:", "overlay:0"]);
}

#[test]
fn transition_draws_overlay_and_foreground() {
    let mut harness = Harness::new(main_map(json!([])));
    harness.press(InputAction::MoveRight).expect("tick");
    harness.tick().expect("tick");
    harness.tick().expect("tick");

    let mut target = RecordingTarget::default();
    harness.game.draw(&mut target);
    assert_eq!(
        target.ops,
        vec![
            "sprite:cave.png",
            "sprite:playerRightBlack.png",
            "sprite:caveFore.png",
            "overlay:1",
        ]
    );
}
