use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key is empty")]
    Empty,
    #[error("asset key must be relative to the asset directory")]
    Absolute,
    #[error("asset key has an empty path segment")]
    EmptySegment,
    #[error("asset key segment '{segment}' leaves the asset directory")]
    RelativeSegment { segment: String },
    #[error("asset key has invalid character '{character}' at byte {offset}")]
    InvalidCharacter { character: char, offset: usize },
}

/// Asset keys name files under the asset directory with `/` separators, e.g.
/// `npcs/elderRight.png` or a bare scene name such as `mainMap`.
pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(AssetKeyError::Absolute);
    }

    let mut offset = 0;
    for segment in key.split('/') {
        match segment {
            "" => return Err(AssetKeyError::EmptySegment),
            "." | ".." => {
                return Err(AssetKeyError::RelativeSegment {
                    segment: segment.to_string(),
                })
            }
            _ => {}
        }
        if let Some((index, character)) = segment.char_indices().find(|(_, ch)| !is_key_char(*ch))
        {
            return Err(AssetKeyError::InvalidCharacter {
                character,
                offset: offset + index,
            });
        }
        offset += segment.len() + 1;
    }
    Ok(())
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')
}
