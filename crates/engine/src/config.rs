use std::time::Duration;

use serde::Deserialize;

use crate::actor::AnimationFrame;
use crate::audio::FadeTimings;
use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub count: u32,
}

impl FrameConfig {
    pub fn animation(self) -> AnimationFrame {
        AnimationFrame::new(self.width, self.height, self.count)
    }
}

/// Gameplay tuning read from `assets/game.json`. Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub start_scene: String,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Alpha change per tick during door transitions.
    pub fade_speed: f32,
    pub player_speed: f32,
    pub player_frame: FrameConfig,
    pub player_spawn: Vec2,
    pub player_sprite_prefix: String,
    pub player_sprite_suffix: String,
    /// Cutscene started by the debug trigger key, looked up in the current scene.
    pub debug_cutscene: Option<String>,
    pub dialogue_frames_per_char: u32,
    pub npc_interaction_radius: f32,
    pub music_stop_fade_ms: u64,
    pub music_swap_fade_ms: u64,
    pub music_toggle_fade_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_scene: "mainMap".to_string(),
            screen_width: 800,
            screen_height: 600,
            fade_speed: 0.05,
            player_speed: 5.0,
            player_frame: FrameConfig {
                width: 48,
                height: 68,
                count: 4,
            },
            player_spawn: Vec2::default(),
            player_sprite_prefix: "player".to_string(),
            player_sprite_suffix: "Black.png".to_string(),
            debug_cutscene: Some("exampleCutscene".to_string()),
            dialogue_frames_per_char: crate::dialogue::DEFAULT_FRAMES_PER_CHAR,
            npc_interaction_radius: 50.0,
            music_stop_fade_ms: 500,
            music_swap_fade_ms: 1000,
            music_toggle_fade_ms: 500,
        }
    }
}

impl GameConfig {
    pub fn fade_timings(&self) -> FadeTimings {
        FadeTimings {
            stop: Duration::from_millis(self.music_stop_fade_ms),
            swap: Duration::from_millis(self.music_swap_fade_ms),
            toggle: Duration::from_millis(self.music_toggle_fade_ms),
        }
    }

    pub fn screen_size(&self) -> Vec2 {
        Vec2::new(self.screen_width as f32, self.screen_height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"start_scene": "cave", "player_frame": {"width": 32, "height": 32, "count": 2}}"#)
                .expect("config");
        assert_eq!(config.start_scene, "cave");
        assert_eq!(config.player_frame.animation().width, 32);
        assert_eq!(config.fade_speed, 0.05);
        assert_eq!(config.debug_cutscene.as_deref(), Some("exampleCutscene"));
        assert_eq!(config.fade_timings().swap, Duration::from_secs(1));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<GameConfig>(r#"{"fade_sped": 0.1}"#).is_err());
    }

    #[test]
    fn debug_cutscene_can_be_disabled() {
        let config: GameConfig =
            serde_json::from_str(r#"{"debug_cutscene": null}"#).expect("config");
        assert!(config.debug_cutscene.is_none());
    }
}
