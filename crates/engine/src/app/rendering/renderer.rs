use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::asset_keys::validate_asset_key;
use crate::dialogue::DialogueView;
use crate::geometry::Rect;

use super::{RenderTarget, SpriteDraw, Viewport};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const DIALOGUE_BOX_COLOR: [u8; 4] = [16, 16, 40, 230];
const DIALOGUE_BORDER_COLOR: [u8; 4] = [230, 230, 240, 255];
const GLYPH_COLOR: [u8; 4] = [240, 240, 240, 255];
const MORE_MARKER_COLOR: [u8; 4] = [250, 210, 80, 255];
const DIALOGUE_HEIGHT_PX: i32 = 150;
const DIALOGUE_MARGIN_PX: i32 = 16;
const DIALOGUE_PADDING_PX: i32 = 14;
const PORTRAIT_SIZE_PX: i32 = 96;
const GLYPH_WIDTH_PX: i32 = 7;
const GLYPH_HEIGHT_PX: i32 = 12;
const GLYPH_ADVANCE_PX: i32 = 9;
const LINE_ADVANCE_PX: i32 = 18;

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Software renderer over a fixed-size `pixels` frame buffer scaled to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_dir: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_dir: PathBuf, screen: (u32, u32)) -> Result<Self, Error> {
        let viewport = Viewport {
            width: screen.0.max(1),
            height: screen.1.max(1),
        };
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), viewport, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            asset_dir,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.viewport, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        viewport: Viewport,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(viewport.width, viewport.height, surface)
    }

    pub fn begin_frame(&mut self) {
        for pixel in self.pixels.frame_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }
    }

    pub fn present(&self) -> Result<(), Error> {
        self.pixels.render()
    }
}

impl RenderTarget for Renderer {
    fn screen_size(&self) -> Viewport {
        self.viewport
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>) {
        let Some(loaded) = resolve_cached_sprite(
            &mut self.sprite_cache,
            &mut self.warned_missing_sprite_keys,
            &self.asset_dir,
            sprite.key,
        ) else {
            return;
        };
        blit_sprite(
            self.pixels.frame_mut(),
            self.viewport,
            loaded,
            sprite.source,
            (sprite.offset.x.round() as i32, sprite.offset.y.round() as i32),
            sprite.mirrored,
        );
    }

    fn fill_overlay(&mut self, alpha: f32) {
        darken(self.pixels.frame_mut(), alpha);
    }

    fn draw_dialogue(&mut self, view: &DialogueView<'_>) {
        let viewport = self.viewport;
        let box_rect = ScreenRect {
            left: DIALOGUE_MARGIN_PX,
            top: viewport.height as i32 - DIALOGUE_HEIGHT_PX - DIALOGUE_MARGIN_PX,
            right: viewport.width as i32 - DIALOGUE_MARGIN_PX,
            bottom: viewport.height as i32 - DIALOGUE_MARGIN_PX,
        };
        {
            let frame = self.pixels.frame_mut();
            fill_rect(frame, viewport, box_rect, DIALOGUE_BOX_COLOR);
            outline_rect(frame, viewport, box_rect, DIALOGUE_BORDER_COLOR);
        }

        let mut text_left = box_rect.left + DIALOGUE_PADDING_PX;
        if let Some(portrait) = view.portrait {
            let origin = (text_left, box_rect.top + DIALOGUE_PADDING_PX);
            if let Some(loaded) = resolve_cached_sprite(
                &mut self.sprite_cache,
                &mut self.warned_missing_sprite_keys,
                &self.asset_dir,
                portrait,
            ) {
                blit_sprite(self.pixels.frame_mut(), viewport, loaded, None, origin, false);
            }
            text_left += PORTRAIT_SIZE_PX + DIALOGUE_PADDING_PX;
        }

        let text_area = ScreenRect {
            left: text_left,
            top: box_rect.top + DIALOGUE_PADDING_PX,
            right: box_rect.right - DIALOGUE_PADDING_PX,
            bottom: box_rect.bottom - DIALOGUE_PADDING_PX,
        };
        let frame = self.pixels.frame_mut();
        draw_glyph_blocks(frame, viewport, text_area, view.text);
        if view.finished {
            let marker = ScreenRect {
                left: box_rect.right - 20,
                top: box_rect.bottom - 18,
                right: box_rect.right - 10,
                bottom: box_rect.bottom - 8,
            };
            fill_rect(frame, viewport, marker, MORE_MARKER_COLOR);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_dir: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match resolve_sprite_image_path(asset_dir, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(warned_missing_sprite_keys, key, Some(&path), &reason);
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, &reason);
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn resolve_sprite_image_path(asset_dir: &Path, key: &str) -> Result<PathBuf, String> {
    validate_asset_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(asset_dir.join(key))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        sprite_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_skipping"
    );
}

/// Copies `source` (or the whole sprite) to `origin`, skipping transparent texels.
/// `mirrored` flips the region horizontally.
fn blit_sprite(
    frame: &mut [u8],
    viewport: Viewport,
    sprite: &LoadedSprite,
    source: Option<Rect>,
    origin: (i32, i32),
    mirrored: bool,
) {
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.width == 0 || sprite.height == 0 || sprite.rgba.len() < expected_rgba_len {
        return;
    }
    let (src_left, src_top, src_width, src_height) = match source {
        Some(rect) => {
            let left = (rect.min.x.max(0.0) as u32).min(sprite.width);
            let top = (rect.min.y.max(0.0) as u32).min(sprite.height);
            let right = (rect.max.x.max(0.0) as u32).min(sprite.width);
            let bottom = (rect.max.y.max(0.0) as u32).min(sprite.height);
            (left, top, right.saturating_sub(left), bottom.saturating_sub(top))
        }
        None => (0, 0, sprite.width, sprite.height),
    };
    if src_width == 0 || src_height == 0 {
        return;
    }

    let draw_left = origin.0.max(0);
    let draw_top = origin.1.max(0);
    let draw_right = (origin.0 + src_width as i32).min(viewport.width as i32);
    let draw_bottom = (origin.1 + src_height as i32).min(viewport.height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = viewport.width as usize;
    let sprite_width = sprite.width as usize;
    for out_y in draw_top..draw_bottom {
        let src_y = src_top as usize + (out_y - origin.1) as usize;
        let src_row_offset = src_y * sprite_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;
        for out_x in draw_left..draw_right {
            let dx = (out_x - origin.0) as u32;
            let column = if mirrored { src_width - 1 - dx } else { dx };
            let src_offset = src_row_offset + (src_left + column) as usize * 4;
            let alpha = sprite.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            let Some(dst) = frame.get_mut(dst_offset..dst_offset + 4) else {
                continue;
            };
            blend_pixel(dst, &sprite.rgba[src_offset..src_offset + 4]);
        }
    }
}

fn blend_pixel(dst: &mut [u8], src: &[u8]) {
    let alpha = src[3] as u32;
    for channel in 0..3 {
        let blended = (src[channel] as u32 * alpha + dst[channel] as u32 * (255 - alpha)) / 255;
        dst[channel] = blended as u8;
    }
    dst[3] = 255;
}

fn darken(frame: &mut [u8], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let keep = 1.0 - alpha;
    for pixel in frame.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            *channel = (*channel as f32 * keep).round() as u8;
        }
    }
}

fn fill_rect(frame: &mut [u8], viewport: Viewport, rect: ScreenRect, color: [u8; 4]) {
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right.min(viewport.width as i32);
    let bottom = rect.bottom.min(viewport.height as i32);
    for y in top..bottom {
        for x in left..right {
            let offset = (y as usize * viewport.width as usize + x as usize) * 4;
            if let Some(dst) = frame.get_mut(offset..offset + 4) {
                blend_pixel(dst, &color);
            }
        }
    }
}

fn outline_rect(frame: &mut [u8], viewport: Viewport, rect: ScreenRect, color: [u8; 4]) {
    let edges = [
        ScreenRect { bottom: rect.top + 2, ..rect },
        ScreenRect { top: rect.bottom - 2, ..rect },
        ScreenRect { right: rect.left + 2, ..rect },
        ScreenRect { left: rect.right - 2, ..rect },
    ];
    for edge in edges {
        fill_rect(frame, viewport, edge, color);
    }
}

/// Stand-in for font rendering: one block per visible character, wrapped to the
/// text area. Spaces advance without drawing.
fn draw_glyph_blocks(frame: &mut [u8], viewport: Viewport, area: ScreenRect, text: &str) {
    let mut x = area.left;
    let mut y = area.top;
    for character in text.chars() {
        if character == '\n' || x + GLYPH_WIDTH_PX > area.right {
            x = area.left;
            y += LINE_ADVANCE_PX;
            if character == '\n' {
                continue;
            }
        }
        if y + GLYPH_HEIGHT_PX > area.bottom {
            return;
        }
        if !character.is_whitespace() {
            let glyph = ScreenRect {
                left: x,
                top: y,
                right: x + GLYPH_WIDTH_PX,
                bottom: y + GLYPH_HEIGHT_PX,
            };
            fill_rect(frame, viewport, glyph, GLYPH_COLOR);
        }
        x += GLYPH_ADVANCE_PX;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use image::{Rgba, RgbaImage};

    const VIEWPORT: Viewport = Viewport {
        width: 4,
        height: 2,
    };

    fn frame() -> Vec<u8> {
        vec![0; (VIEWPORT.width * VIEWPORT.height * 4) as usize]
    }

    fn pixel(frame: &[u8], x: usize, y: usize) -> [u8; 4] {
        let offset = (y * VIEWPORT.width as usize + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    /// Two opaque columns, red then green, and a transparent third column.
    fn strip() -> LoadedSprite {
        let red = [255, 0, 0, 255];
        let green = [0, 255, 0, 255];
        let clear = [0, 0, 0, 0];
        LoadedSprite {
            width: 3,
            height: 1,
            rgba: [red, green, clear].concat(),
        }
    }

    #[test]
    fn blit_copies_source_region_at_origin() {
        let mut frame = frame();
        let source = Rect::from_origin_size(Vec2::new(1.0, 0.0), 1.0, 1.0);
        blit_sprite(&mut frame, VIEWPORT, &strip(), Some(source), (2, 1), false);
        assert_eq!(pixel(&frame, 2, 1), [0, 255, 0, 255]);
        assert_eq!(pixel(&frame, 1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn mirrored_blit_flips_columns_and_skips_transparency() {
        let mut frame = frame();
        blit_sprite(&mut frame, VIEWPORT, &strip(), None, (0, 0), true);
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 1, 0), [0, 255, 0, 255]);
        assert_eq!(pixel(&frame, 2, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn blit_clips_at_frame_edges() {
        let mut frame = frame();
        blit_sprite(&mut frame, VIEWPORT, &strip(), None, (-1, 0), false);
        assert_eq!(pixel(&frame, 0, 0), [0, 255, 0, 255]);
        blit_sprite(&mut frame, VIEWPORT, &strip(), None, (3, 1), false);
        assert_eq!(pixel(&frame, 3, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn overlay_darkens_proportionally() {
        let mut frame = vec![200, 100, 50, 255];
        darken(&mut frame, 0.5);
        assert_eq!(frame, vec![100, 50, 25, 255]);
        darken(&mut frame, 1.0);
        assert_eq!(frame, vec![0, 0, 0, 255]);
    }

    #[test]
    fn missing_sprite_warns_once_and_caches_the_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        assert!(resolve_cached_sprite(&mut cache, &mut warned, dir.path(), "ghost.png").is_none());
        assert!(resolve_cached_sprite(&mut cache, &mut warned, dir.path(), "ghost.png").is_none());
        assert_eq!(warned.len(), 1);
        assert!(cache.contains_key("ghost.png"));
    }

    #[test]
    fn sprites_load_from_asset_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(1, 0, Rgba([1, 2, 3, 255]));
        image.save(dir.path().join("tile.png")).expect("save");

        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let sprite = resolve_cached_sprite(&mut cache, &mut warned, dir.path(), "tile.png")
            .expect("sprite");
        assert_eq!((sprite.width, sprite.height), (2, 1));
        assert_eq!(&sprite.rgba[4..8], &[1, 2, 3, 255]);
    }

    #[test]
    fn traversal_keys_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        assert!(
            resolve_cached_sprite(&mut cache, &mut warned, dir.path(), "../secret.png").is_none()
        );
        assert!(warned.contains("../secret.png"));
    }
}
