use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::asset_keys::{validate_asset_key, AssetKeyError};

use super::data::SceneData;
use super::check_asset_keys;

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scene {path} at {location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("scene '{scene}' references invalid asset key '{key}': {source}")]
    InvalidAssetKey {
        scene: String,
        key: String,
        #[source]
        source: AssetKeyError,
    },
    #[error("failed to read image size of {path}: {source}")]
    ImageDimensions {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("scene '{scene}' npc '{npc}': {reason}")]
    InvalidNpc {
        scene: String,
        npc: String,
        reason: String,
    },
    #[error("scene '{scene}' has no world size")]
    MissingSize { scene: String },
}

/// Source of scene descriptions, keyed by scene name.
pub trait SceneLoader {
    fn load(&self, name: &str) -> Result<SceneData, SceneLoadError>;
}

/// Reads `<asset_dir>/<name>.json` and measures referenced images that lack sizes.
#[derive(Debug, Clone)]
pub struct JsonSceneLoader {
    asset_dir: PathBuf,
}

impl JsonSceneLoader {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
        }
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    fn fill_image_sizes(&self, name: &str, data: &mut SceneData) -> Result<(), SceneLoadError> {
        let background = data
            .background
            .get_or_insert_with(|| format!("{name}.png"))
            .clone();
        if data.foreground.is_none() {
            let conventional = format!("{name}Fore.png");
            if self.asset_dir.join(&conventional).is_file() {
                data.foreground = Some(conventional);
            }
        }
        check_asset_keys(name, data)?;

        if data.width.is_none() || data.height.is_none() {
            let (width, height) = self.image_size(&background)?;
            data.width.get_or_insert(width);
            data.height.get_or_insert(height);
        }

        for npc in &mut data.npcs {
            if npc.frame_width.is_some() && npc.frame_height.is_some() {
                continue;
            }
            if npc.frame_count == 0 {
                return Err(SceneLoadError::InvalidNpc {
                    scene: name.to_string(),
                    npc: npc.name.clone(),
                    reason: "frame_count must be at least 1".to_string(),
                });
            }
            let Some(sheet) = npc.sprite_sheets.values().next() else {
                return Err(SceneLoadError::InvalidNpc {
                    scene: name.to_string(),
                    npc: npc.name.clone(),
                    reason: "no sprite sheets".to_string(),
                });
            };
            let (width, height) = self.image_size(sheet)?;
            npc.frame_width.get_or_insert(width / npc.frame_count);
            npc.frame_height.get_or_insert(height);
        }
        Ok(())
    }

    fn image_size(&self, key: &str) -> Result<(u32, u32), SceneLoadError> {
        let path = self.asset_dir.join(key);
        image::image_dimensions(&path)
            .map_err(|source| SceneLoadError::ImageDimensions { path, source })
    }
}

impl SceneLoader for JsonSceneLoader {
    fn load(&self, name: &str) -> Result<SceneData, SceneLoadError> {
        validate_asset_key(name).map_err(|source| SceneLoadError::InvalidAssetKey {
            scene: name.to_string(),
            key: name.to_string(),
            source,
        })?;
        let path = self.asset_dir.join(format!("{name}.json"));
        let raw = fs::read_to_string(&path).map_err(|source| SceneLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let mut data = parse_scene_json(&path, &raw)?;
        self.fill_image_sizes(name, &mut data)?;
        debug!(scene = name, path = %path.display(), "scene_file_read");
        Ok(data)
    }
}

pub fn parse_scene_json(path: &Path, raw: &str) -> Result<SceneData, SceneLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SceneData>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        SceneLoadError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}
