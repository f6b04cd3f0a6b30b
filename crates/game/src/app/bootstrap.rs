use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{
    resolve_app_paths, Game, GameConfig, GameError, JsonSceneLoader, LoopConfig, MusicPlayer,
    StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::audio;

const CONFIG_FILE_NAME: &str = "game.json";
const START_SCENE_ENV_VAR: &str = "RPG_START_SCENE";
const FADE_SPEED_ENV_VAR: &str = "RPG_FADE_SPEED";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game: Game,
    pub(crate) asset_dir: PathBuf,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse config {path} at {location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Game(#[from] GameError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Tile RPG Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        asset_dir = %paths.asset_dir.display(),
        "startup"
    );

    let mut game_config = load_game_config(&paths.asset_dir.join(CONFIG_FILE_NAME))?;
    apply_env_overrides(&mut game_config, |var| std::env::var(var).ok());
    info!(
        start_scene = %game_config.start_scene,
        fade_speed = game_config.fade_speed,
        debug_cutscene = ?game_config.debug_cutscene,
        "game_config"
    );

    let config = LoopConfig {
        window_width: game_config.screen_width,
        window_height: game_config.screen_height,
        ..LoopConfig::default()
    };
    let music = MusicPlayer::new(
        audio::default_backend(),
        paths.asset_dir.clone(),
        game_config.fade_timings(),
    );
    let loader = JsonSceneLoader::new(paths.asset_dir.clone());
    let game = Game::new(game_config, Box::new(loader), music)?;

    Ok(AppWiring {
        config,
        game,
        asset_dir: paths.asset_dir,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Reads the optional config file; a missing file means all defaults.
fn load_game_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "game_config_missing_using_defaults");
            return Ok(GameConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_game_config(path, &raw)
}

fn parse_game_config(path: &Path, raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}

fn apply_env_overrides(config: &mut GameConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(START_SCENE_ENV_VAR) {
        let scene = raw.trim();
        if scene.is_empty() {
            warn!(env_var = START_SCENE_ENV_VAR, "empty start scene override ignored");
        } else {
            config.start_scene = scene.to_string();
        }
    }

    if let Some(raw) = lookup(FADE_SPEED_ENV_VAR) {
        match raw.trim().parse::<f32>() {
            Ok(speed) if speed.is_finite() && speed > 0.0 => config.fade_speed = speed,
            _ => warn!(
                env_var = FADE_SPEED_ENV_VAR,
                value = raw.as_str(),
                "invalid fade speed override ignored"
            ),
        }
    }
}
