use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use super::*;
use crate::actor::{AnimationFrame, Direction};
use crate::app::{InputSnapshot, KeyEdges};
use crate::audio::test_backend::RecordingBackend;
use crate::audio::{BusyFlag, FadeTimings};
use crate::scene::SceneData;

const SCENE: &str = "town";

struct World {
    player: Player,
    scenes: HashMap<String, Scene>,
    dialogue: DialogueBox,
    music: MusicPlayer,
    backend: RecordingBackend,
    scene_name: String,
    transition: TransitionState,
    edges: KeyEdges,
}

impl World {
    fn new() -> Self {
        let data: SceneData = serde_json::from_value(json!({
            "width": 800,
            "height": 600,
            "npcs": [{
                "name": "guard",
                "sprite_sheets": {"down": "guardDown.png"},
                "frame_count": 2, "frame_width": 32, "frame_height": 48,
                "x": 40, "y": 40
            }]
        }))
        .expect("scene json");
        let scene = Scene::from_data(SCENE, data).expect("scene");
        let backend = RecordingBackend::default();
        let music = MusicPlayer::new(
            Box::new(backend.clone()),
            PathBuf::from("assets"),
            FadeTimings {
                stop: Duration::ZERO,
                swap: Duration::from_millis(40),
                toggle: Duration::ZERO,
            },
        );
        let transition = TransitionState::new(0.05, music.busy_flag());
        Self {
            player: Player::new(
                Vec2::new(100.0, 100.0),
                AnimationFrame::new(48, 68, 4),
                5.0,
                "player",
                "Black.png",
            ),
            scenes: HashMap::from([(SCENE.to_string(), scene)]),
            dialogue: DialogueBox::new(1),
            music,
            backend,
            scene_name: SCENE.to_string(),
            transition,
            edges: KeyEdges::default(),
        }
    }

    fn cutscene(&self, actions: Value) -> Cutscene {
        let data: CutsceneData =
            serde_json::from_value(json!({"id": "test", "actions": actions})).expect("cutscene");
        let mut cutscene = Cutscene::resolve(&CutsceneScript::from_data(data), self);
        cutscene.start();
        cutscene
    }

    fn tick_with(&mut self, cutscene: &mut Cutscene, confirm: bool) {
        let input = self.edges.update(
            &InputSnapshot::empty().with_action_down(InputAction::Confirm, confirm),
        );
        let mut stage = Stage {
            player: &mut self.player,
            scenes: &mut self.scenes,
            dialogue: &mut self.dialogue,
            music: &self.music,
            scene_name: &mut self.scene_name,
        };
        cutscene.update(&mut self.transition, &input, &mut stage);
    }

    fn tick(&mut self, cutscene: &mut Cutscene) {
        self.tick_with(cutscene, false);
    }
}

impl TargetResolver for World {
    fn resolve(&self, symbol: &str) -> Option<TargetRef> {
        match symbol {
            "player" => Some(TargetRef::Actor(ActorRef::Player)),
            "dialogue" => Some(TargetRef::Dialogue),
            "music" => Some(TargetRef::Music),
            "scene" => Some(TargetRef::SceneName),
            name => self.scenes[SCENE].npcs.get(name).map(|_| {
                TargetRef::Actor(ActorRef::Npc {
                    scene: SCENE.to_string(),
                    name: name.to_string(),
                })
            }),
        }
    }
}

#[test]
fn fade_teleport_fade_sequence() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "FadeOut", "data": 0.5},
        {"type": "Teleport", "target": "player", "data": {"x": 10, "y": 10}, "wait_previous": true},
        {"type": "FadeIn", "data": 0.5, "wait_previous": true}
    ]));

    world.tick(&mut cutscene);
    assert_eq!(world.transition.alpha(), 0.5);
    assert_eq!(cutscene.cursor(), 0);
    assert!(cutscene.is_active(0));
    assert_eq!(world.player.position(), Vec2::new(100.0, 100.0));

    world.tick(&mut cutscene);
    assert_eq!(cutscene.cursor(), 2);
    assert_eq!(world.player.position(), Vec2::new(34.0, 44.0));
    assert_eq!(world.transition.alpha(), 0.5);
    assert!(cutscene.is_active(2));

    world.tick(&mut cutscene);
    assert_eq!(world.transition.alpha(), 0.0);
    assert_eq!(cutscene.cursor(), 3);
    assert!(!cutscene.is_playing());
}

#[test]
fn cursor_is_monotonic_and_waits_hold_back() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "Wait", "data": 3},
        {"type": "MoveNPC", "target": "guard", "data": {"x": 60, "y": 40}},
        {"type": "TurnPlayer", "target": "player", "data": "left", "wait_previous": true},
        {"type": "Wait", "data": 2, "wait_previous": true}
    ]));

    let mut previous_cursor = 0;
    let mut turned_at = None;
    for tick in 1..=20 {
        world.tick(&mut cutscene);
        assert!(cutscene.cursor() >= previous_cursor);
        if cutscene.cursor() < 2 {
            assert!(!cutscene.is_active(2), "index 2 ran early at tick {tick}");
            assert_eq!(world.player.motion.direction, Direction::Down);
        }
        if turned_at.is_none() && world.player.motion.direction == Direction::Left {
            turned_at = Some(tick);
        }
        previous_cursor = cutscene.cursor();
        if !cutscene.is_playing() {
            break;
        }
    }

    assert_eq!(turned_at, Some(4));
    assert_eq!(
        world.scenes[SCENE].npcs["guard"].position(),
        Vec2::new(60.0, 40.0)
    );
    assert!(!cutscene.is_playing());
}

#[test]
fn parallel_action_finishing_after_cursor_keeps_sequence_valid() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "Teleport", "target": "guard", "data": {"x": 0, "y": 0}},
        {"type": "MoveNPC", "target": "guard", "data": {"x": 20, "y": 0}},
        {"type": "Wait", "data": 1}
    ]));

    world.tick(&mut cutscene);
    assert_eq!(cutscene.cursor(), 1);
    assert!(cutscene.is_active(1));

    for _ in 0..4 {
        world.tick(&mut cutscene);
    }
    assert_eq!(cutscene.cursor(), 3);
    assert!(!cutscene.is_playing());
}

#[test]
fn change_scene_writes_scene_name() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "ChangeScene", "target": "scene", "data": "cave"}
    ]));
    world.tick(&mut cutscene);
    assert_eq!(world.scene_name, "cave");
    assert!(!cutscene.is_playing());
}

#[test]
fn show_dialogue_advances_on_confirm_edges_only() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "ShowDialogue", "target": "dialogue", "data": ["Hi", "Bye"]}
    ]));

    world.tick(&mut cutscene);
    assert!(world.dialogue.is_open());

    world.tick_with(&mut cutscene, true);
    assert!(world.dialogue.is_finished());
    world.tick_with(&mut cutscene, true);
    assert_eq!(world.dialogue.current_line(), 0, "held key is not an edge");

    world.tick_with(&mut cutscene, false);
    world.tick_with(&mut cutscene, true);
    assert_eq!(world.dialogue.current_line(), 1);

    for _ in 0..4 {
        world.tick(&mut cutscene);
    }
    assert!(world.dialogue.is_finished());
    assert!(cutscene.is_playing());

    world.tick_with(&mut cutscene, true);
    assert!(!world.dialogue.is_open());
    assert!(!cutscene.is_playing());
}

#[test]
fn show_dialogue_replaces_a_box_left_open() {
    let mut world = World::new();
    world.dialogue.open(
        vec!["Welcome.".to_string(), "Rest well.".to_string()],
        Some("innkeeper".to_string()),
        None,
    );
    let mut cutscene = world.cutscene(json!([
        {"type": "ShowDialogue", "target": "dialogue", "data": ["Cutscene line."]}
    ]));

    world.tick_with(&mut cutscene, true);
    assert_eq!(world.dialogue.lines(), ["Cutscene line."]);
    assert_eq!(world.dialogue.current_line(), 0);
    assert!(!world.dialogue.is_finished());
    assert!(cutscene.is_active(0));

    world.tick_with(&mut cutscene, false);
    world.tick_with(&mut cutscene, true);
    assert!(world.dialogue.is_finished());
    world.tick_with(&mut cutscene, false);
    world.tick_with(&mut cutscene, true);
    assert!(!world.dialogue.is_open());
    assert!(!cutscene.is_playing());
}

#[test]
fn change_music_is_dropped_while_busy() {
    let mut world = World::new();
    let busy: BusyFlag = world.music.busy_flag();
    assert!(busy.try_acquire());

    let mut cutscene = world.cutscene(json!([
        {"type": "ChangeMusic", "target": "music", "data": "boss.mp3"}
    ]));
    world.tick(&mut cutscene);
    assert!(!cutscene.is_playing());
    assert!(world.transition.music_busy());
    assert!(world.backend.loads().is_empty());

    busy.release();
    assert!(!world.transition.music_busy(), "no swap task took the flag");
    assert!(world.backend.calls().is_empty());
    assert!(world.music.current_track().is_none());
}

#[test]
fn change_music_swaps_track_in_background() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "ChangeMusic", "target": "music", "data": "boss.mp3"}
    ]));
    world.tick(&mut cutscene);
    assert!(world.transition.music_busy());

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while world.transition.music_busy() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!world.transition.music_busy());
    assert_eq!(world.music.current_track().as_deref(), Some("boss.mp3"));
    assert_eq!(world.backend.loads(), vec![PathBuf::from("assets/boss.mp3")]);
}

#[test]
fn defective_actions_stall_and_fail_validation() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([
        {"type": "Moonwalk", "target": "player"},
        {"type": "MoveActor", "target": "nobody", "data": {"x": 0, "y": 0}}
    ]));

    let error = cutscene.validate().expect_err("defective");
    match &error {
        CutsceneError::Invalid { defects, .. } => {
            assert_eq!(defects.len(), 2);
            assert!(matches!(defects[0], ScriptDefect::UnknownActionType { .. }));
            assert!(matches!(defects[1], ScriptDefect::UnresolvedTarget { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(error.to_string().contains("2 script defect(s)"));

    for _ in 0..10 {
        world.tick(&mut cutscene);
    }
    assert_eq!(cutscene.cursor(), 0);
    assert!(cutscene.is_playing());
    assert!(cutscene.is_active(0));
}

#[test]
fn update_is_noop_when_not_playing_and_start_restarts() {
    let mut world = World::new();
    let mut cutscene = world.cutscene(json!([{"type": "FadeOut", "data": 1.0}]));
    world.tick(&mut cutscene);
    assert!(!cutscene.is_playing());

    world.transition.set_alpha(0.0);
    world.tick(&mut cutscene);
    assert_eq!(world.transition.alpha(), 0.0);

    cutscene.start();
    assert!(cutscene.is_playing());
    assert_eq!(cutscene.cursor(), 0);
    world.tick(&mut cutscene);
    assert_eq!(world.transition.alpha(), 1.0);
}
