use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod ability;
pub mod actor;
pub mod app;
mod asset_keys;
pub mod audio;
pub mod collision;
pub mod config;
pub mod cutscene;
pub mod dialogue;
pub mod game;
pub mod geometry;
pub mod npc;
pub mod player;
pub mod scene;
pub mod transition;

pub use ability::{Ability, AbilityKind};
pub use actor::{AnimationFrame, Direction, Motion};
pub use app::{
    run_app, AppError, InputAction, InputEdges, InputSnapshot, KeyEdges, LoopConfig,
    RenderTarget, SpriteDraw, Viewport,
};
pub use asset_keys::{validate_asset_key, AssetKeyError};
pub use audio::{AudioBackend, AudioError, BusyFlag, FadeTimings, MusicPlayer, SilentBackend};
pub use config::GameConfig;
pub use cutscene::{Cutscene, CutsceneError, ScriptDefect};
pub use dialogue::{DialogueBox, DialogueView};
pub use game::{Game, GameError, GameState};
pub use geometry::{Rect, Vec2};
pub use scene::{JsonSceneLoader, Scene, SceneData, SceneLoadError, SceneLoader};
pub use transition::TransitionState;

pub const ROOT_ENV_VAR: &str = "RPG_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub asset_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} is not valid unicode: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("cannot locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("{var}={path} is not a game root (expected Cargo.toml and assets/ inside it)")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error(
        "no game root above {start_dir} (a directory with Cargo.toml and assets/); \
set {var} to the checkout, e.g. export {var}=/path/to/tile-rpg"
    )]
    RootNotFound {
        start_dir: PathBuf,
        var: &'static str,
    },
}

/// Finds the game root: `RPG_ROOT` when set, otherwise the nearest ancestor of the
/// executable that looks like a checkout.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(Path::new(&value))?,
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            discover_root(exe.parent().unwrap_or(Path::new(".")))?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    Ok(AppPaths {
        asset_dir: root.join("assets"),
        root,
    })
}

fn root_from_env(path: &Path) -> Result<PathBuf, StartupError> {
    let root = canonical_or_given(path);
    if looks_like_root(&root) {
        Ok(root)
    } else {
        Err(StartupError::InvalidEnvRoot {
            var: ROOT_ENV_VAR,
            path: root,
        })
    }
}

fn discover_root(start: &Path) -> Result<PathBuf, StartupError> {
    start
        .ancestors()
        .find(|candidate| looks_like_root(candidate))
        .map(canonical_or_given)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: canonical_or_given(start),
            var: ROOT_ENV_VAR,
        })
}

fn looks_like_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
