//! Font and atlas ownership.
//!
//! The [`FontManager`] packs every loaded font into an [`Atlas`] of the
//! font's kind and keeps an [`AtlasSink`] informed so a backend can mirror
//! each atlas as a texture. Sink calls are synchronous and always ordered
//! `create_texture` → `update_texture`* → `destroy_texture` per atlas.

use std::path::Path;

use crate::atlas::Atlas;
use crate::errors::{Error, ErrorType, FontError, LogCallback, Logger};
use crate::font::{prepare_font, Font, FontKind, GlyphRasterizer, TrueTypeRasterizer};
use crate::id::{AtlasId, FontId};
use crate::math::Vector2;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ATLAS_WIDTH: u32 = 1024;
const DEFAULT_ATLAS_HEIGHT: u32 = 1024;

/// Backend side of the atlas lifecycle.
pub trait AtlasSink {
    /// A new atlas exists. Called before any `update_texture` for it.
    fn create_texture(&mut self, atlas: &Atlas);
    /// The atlas bitmap changed; `atlas.data()` holds the full contents.
    fn update_texture(&mut self, atlas: &Atlas);
    /// The atlas is gone. No further calls mention `atlas`.
    fn destroy_texture(&mut self, atlas: AtlasId);
}

/// Sink for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAtlasSink;

impl AtlasSink for NullAtlasSink {
    fn create_texture(&mut self, _atlas: &Atlas) {}
    fn update_texture(&mut self, _atlas: &Atlas) {}
    fn destroy_texture(&mut self, _atlas: AtlasId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontManagerConfig {
    pub atlas_width: u32,
    pub atlas_height: u32,
}

impl Default for FontManagerConfig {
    fn default() -> Self {
        Self {
            atlas_width: DEFAULT_ATLAS_WIDTH,
            atlas_height: DEFAULT_ATLAS_HEIGHT,
        }
    }
}

struct FontSlot {
    generation: u32,
    font: Option<Font>,
}

pub struct FontManager {
    config: FontManagerConfig,
    sink: Box<dyn AtlasSink>,
    logger: Logger,
    fonts: Vec<FontSlot>,
    free_fonts: Vec<u32>,
    atlases: Vec<Atlas>,
    next_atlas_id: u32,
}

impl FontManager {
    pub fn init(config: FontManagerConfig, sink: Box<dyn AtlasSink>) -> Self {
        Self {
            config,
            sink,
            logger: Logger::default(),
            fonts: Vec::new(),
            free_fonts: Vec::new(),
            atlases: Vec::new(),
            next_atlas_id: 0,
        }
    }

    /// Destroys every atlas through the sink and forgets all fonts.
    pub fn uninit(&mut self) {
        for atlas in self.atlases.drain(..) {
            self.sink.destroy_texture(atlas.id);
        }
        for slot in &mut self.fonts {
            if slot.font.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free_fonts = (0..self.fonts.len() as u32).rev().collect();
    }

    pub fn set_log_callback(&mut self, callback: Option<LogCallback>) {
        self.logger.set_callback(callback);
    }

    pub fn config(&self) -> &FontManagerConfig {
        &self.config
    }

    pub fn atlases(&self) -> &[Atlas] {
        &self.atlases
    }

    pub fn atlas(&self, id: AtlasId) -> Option<&Atlas> {
        self.atlases.iter().find(|atlas| atlas.id == id)
    }

    /// Live font behind `id`, or `None` once it was unloaded.
    pub fn font(&self, id: FontId) -> Option<&Font> {
        self.fonts
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.font.as_ref())
    }

    pub fn font_count(&self) -> usize {
        self.fonts.iter().filter(|slot| slot.font.is_some()).count()
    }

    /// Loads glyphs `range` of a TrueType/OpenType font file at `size` pixels.
    pub fn load_font_file(
        &mut self,
        path: impl AsRef<Path>,
        size: f32,
        range: std::ops::Range<u32>,
        kind: FontKind,
    ) -> Result<FontId, FontError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|err| {
            self.logger.error(Error {
                type_: ErrorType::FontLoadFailed,
                text: &format!("cannot read {}: {err}", path.as_ref().display()),
            });
            err
        })?;
        self.load_font(&bytes, size, range, kind)
    }

    /// Loads glyphs `range` of an in-memory TrueType/OpenType font at `size` pixels.
    pub fn load_font(
        &mut self,
        bytes: &[u8],
        size: f32,
        range: std::ops::Range<u32>,
        kind: FontKind,
    ) -> Result<FontId, FontError> {
        let rasterizer = TrueTypeRasterizer::from_bytes(bytes, size).map_err(|err| {
            self.report(&err);
            err
        })?;
        self.load_font_with(&rasterizer, range, kind)
    }

    /// Loads glyphs from any rasterizer, e.g. a procedural or pre-baked one.
    pub fn load_font_with(
        &mut self,
        rasterizer: &dyn GlyphRasterizer,
        range: std::ops::Range<u32>,
        kind: FontKind,
    ) -> Result<FontId, FontError> {
        let prepared = prepare_font(rasterizer, range, kind, self.config.atlas_width)
            .map_err(|err| {
                self.report(&err);
                err
            })?;
        let mut font = prepared.font;

        if font.required_height == 0 {
            let id = self.insert_font(font);
            self.logger
                .info(format_args!("loaded font {:?} without glyph bitmaps", id));
            return Ok(id);
        }

        let atlas_index = match self.find_atlas(&font) {
            Ok(index) => index,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };
        let Some(atlas_y) = self.atlases[atlas_index].allocate(font.required_height) else {
            let err = FontError::AtlasFull {
                required: font.required_height,
                available: self.config.atlas_height,
            };
            self.report(&err);
            return Err(err);
        };
        let atlas = &mut self.atlases[atlas_index];
        font.atlas = Some(atlas.id);
        font.atlas_y = atlas_y;

        let atlas_size = Vector2::new(atlas.width() as f32, atlas.height() as f32);
        for (code, bitmap, row) in &prepared.bitmaps {
            let glyph = &mut font.glyphs[*code];
            glyph.atlas_y = font.atlas_y + row * font.max_glyph_height;
            atlas.blit(
                glyph.atlas_x,
                glyph.atlas_y,
                glyph.width,
                glyph.height,
                &bitmap.data,
            );
            glyph.uv_min = Vector2::new(
                glyph.atlas_x as f32 / atlas_size.x,
                glyph.atlas_y as f32 / atlas_size.y,
            );
            glyph.uv_max = Vector2::new(
                (glyph.atlas_x + glyph.width) as f32 / atlas_size.x,
                (glyph.atlas_y + glyph.height) as f32 / atlas_size.y,
            );
        }
        self.sink.update_texture(atlas);

        let id = self.insert_font(font);
        self.logger.info(format_args!(
            "loaded font {:?} ({} glyph bitmaps) into atlas {:?}",
            id,
            prepared.bitmaps.len(),
            self.atlases[atlas_index].id
        ));
        Ok(id)
    }

    /// Frees the font's atlas rows. An atlas left without fonts is destroyed.
    pub fn unload_font(&mut self, id: FontId) -> Result<(), FontError> {
        let live = self
            .fonts
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.font.is_some());
        if !live {
            let err = FontError::NotLoaded(id);
            self.report(&err);
            return Err(err);
        }
        let slot = &mut self.fonts[id.index as usize];
        let Some(font) = slot.font.take() else {
            return Err(FontError::NotLoaded(id));
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_fonts.push(id.index);

        let Some(atlas_index) = font
            .atlas
            .and_then(|atlas_id| self.atlases.iter().position(|a| a.id == atlas_id))
        else {
            return Ok(());
        };

        let atlas = &mut self.atlases[atlas_index];
        atlas.release(font.atlas_y, font.required_height);
        if atlas.is_empty() {
            let atlas = self.atlases.remove(atlas_index);
            self.sink.destroy_texture(atlas.id);
            self.logger
                .info(format_args!("destroyed empty atlas {:?}", atlas.id));
        } else {
            self.sink.update_texture(atlas);
        }
        Ok(())
    }

    /// Index of an atlas of the font's kind with room for it, creating one if needed.
    fn find_atlas(&mut self, font: &Font) -> Result<usize, FontError> {
        let kind = font.kind.atlas_kind();
        let required = font.required_height;
        if required > self.config.atlas_height {
            return Err(FontError::AtlasFull {
                required,
                available: self.config.atlas_height,
            });
        }

        let fits = |atlas: &Atlas| {
            atlas.kind() == kind && atlas.free_slices().iter().any(|s| s.height >= required)
        };
        if let Some(index) = self.atlases.iter().position(fits) {
            return Ok(index);
        }

        let id = AtlasId(self.next_atlas_id);
        self.next_atlas_id += 1;
        let atlas = Atlas::new(id, self.config.atlas_width, self.config.atlas_height, kind);
        self.sink.create_texture(&atlas);
        self.atlases.push(atlas);
        Ok(self.atlases.len() - 1)
    }

    fn insert_font(&mut self, font: Font) -> FontId {
        if let Some(index) = self.free_fonts.pop() {
            let slot = &mut self.fonts[index as usize];
            slot.font = Some(font);
            FontId::new(index, slot.generation)
        } else {
            self.fonts.push(FontSlot {
                generation: 0,
                font: Some(font),
            });
            FontId::new(self.fonts.len() as u32 - 1, 0)
        }
    }

    fn report(&self, err: &FontError) {
        self.logger.error(Error {
            type_: err.error_type(),
            text: &err.to_string(),
        });
    }
}

impl Drop for FontManager {
    fn drop(&mut self) {
        if !self.atlases.is_empty() {
            self.uninit();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::font::testing::{BoxRasterizer, BOX_HEIGHT};

    fn manager(height: u32) -> (FontManager, RecordingSink) {
        let sink = RecordingSink::default();
        let config = FontManagerConfig {
            atlas_width: 128,
            atlas_height: height,
        };
        (FontManager::init(config, Box::new(sink.clone())), sink)
    }

    #[test]
    fn first_font_creates_then_updates() {
        let (mut fonts, sink) = manager(256);
        let id = fonts.load_font_with(&BoxRasterizer, 0..128, FontKind::Normal).unwrap();

        let atlas = fonts.font(id).unwrap().atlas().unwrap();
        assert_eq!(
            *sink.events.borrow(),
            vec![AtlasEvent::Created(atlas), AtlasEvent::Updated(atlas)]
        );
    }

    #[test]
    fn glyphs_are_written_with_uvs() {
        let (mut fonts, _sink) = manager(256);
        let id = fonts.load_font_with(&BoxRasterizer, 65..67, FontKind::Normal).unwrap();
        let font = fonts.font(id).unwrap();
        let a = *font.glyph(b'A').unwrap();
        let b = *font.glyph(b'B').unwrap();
        assert_eq!((a.atlas_x, a.atlas_y), (0, 0));
        assert_eq!((b.atlas_x, b.atlas_y), (10, 0));
        assert_eq!(a.uv_max, Vector2::new(8.0 / 128.0, BOX_HEIGHT as f32 / 256.0));

        let atlas = fonts.atlas(font.atlas().unwrap()).unwrap();
        assert_eq!(atlas.data()[0], 255);
        assert_eq!(atlas.data()[8], 0);
        assert_eq!(atlas.data()[10], 255);
    }

    #[test]
    fn fonts_share_atlas_until_full() {
        // Each full font needs 8 rows of 10px at 128px wide.
        let (mut fonts, _sink) = manager(160);
        let a = fonts.load_font_with(&BoxRasterizer, 0..128, FontKind::Normal).unwrap();
        let b = fonts.load_font_with(&BoxRasterizer, 0..128, FontKind::Normal).unwrap();
        let c = fonts.load_font_with(&BoxRasterizer, 0..128, FontKind::Normal).unwrap();
        let atlas_of = |id| fonts.font(id).unwrap().atlas().unwrap();
        assert_eq!(atlas_of(a), atlas_of(b));
        assert_ne!(atlas_of(a), atlas_of(c));
        assert_eq!(fonts.atlases().len(), 2);
    }

    #[test]
    fn kinds_never_share_an_atlas() {
        let (mut fonts, _sink) = manager(512);
        let normal = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        let lcd = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Lcd).unwrap();
        let sdf = fonts
            .load_font_with(&BoxRasterizer, 65..70, FontKind::Sdf(Default::default()))
            .unwrap();
        let atlas_of = |id| fonts.font(id).unwrap().atlas().unwrap();
        assert_ne!(atlas_of(normal), atlas_of(lcd));
        assert_ne!(atlas_of(normal), atlas_of(sdf));
        assert_ne!(atlas_of(lcd), atlas_of(sdf));
        assert_eq!(fonts.atlas(atlas_of(lcd)).unwrap().bytes_per_pixel(), 3);
    }

    #[test]
    fn oversized_font_is_refused() {
        let (mut fonts, sink) = manager(32);
        let result = fonts.load_font_with(&BoxRasterizer, 0..128, FontKind::Normal);
        assert!(matches!(result, Err(FontError::AtlasFull { .. })));
        assert!(sink.events.borrow().is_empty());
        assert_eq!(fonts.font_count(), 0);
    }

    #[test]
    fn blank_font_takes_no_atlas_space() {
        let (mut fonts, sink) = manager(BOX_HEIGHT);
        let full = fonts.load_font_with(&BoxRasterizer, 65..66, FontKind::Normal).unwrap();
        let atlas = fonts.font(full).unwrap().atlas().unwrap();
        assert!(fonts.atlas(atlas).unwrap().free_slices().is_empty());

        let blank = fonts.load_font_with(&BoxRasterizer, 32..33, FontKind::Normal).unwrap();
        assert_eq!(fonts.font(blank).unwrap().atlas(), None);
        assert_eq!(fonts.atlases().len(), 1);
        assert_eq!(
            *sink.events.borrow(),
            vec![AtlasEvent::Created(atlas), AtlasEvent::Updated(atlas)]
        );

        fonts.unload_font(blank).unwrap();
        assert_eq!(fonts.atlases().len(), 1);
    }

    #[test]
    fn removing_last_font_destroys_atlas_once() {
        let (mut fonts, sink) = manager(256);
        let a = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        let b = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        let atlas = fonts.font(a).unwrap().atlas().unwrap();

        fonts.unload_font(a).unwrap();
        fonts.unload_font(b).unwrap();
        assert!(fonts.font(a).is_none());
        assert!(fonts.atlases().is_empty());

        let events = sink.events.borrow();
        let destroyed = events
            .iter()
            .filter(|e| **e == AtlasEvent::Destroyed(atlas))
            .count();
        assert_eq!(destroyed, 1);
        assert_eq!(events.last(), Some(&AtlasEvent::Destroyed(atlas)));
    }

    #[test]
    fn unloading_twice_is_an_error() {
        let (mut fonts, _sink) = manager(256);
        let a = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        fonts.unload_font(a).unwrap();
        assert!(matches!(fonts.unload_font(a), Err(FontError::NotLoaded(_))));
    }

    #[test]
    fn reused_font_slot_gets_new_generation() {
        let (mut fonts, _sink) = manager(256);
        let a = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        fonts.unload_font(a).unwrap();
        let b = fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        assert_eq!(a.index, b.index);
        assert!(fonts.font(a).is_none());
        assert!(fonts.font(b).is_some());
    }

    #[test]
    fn uninit_destroys_remaining_atlases() {
        let (mut fonts, sink) = manager(256);
        fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Normal).unwrap();
        fonts.load_font_with(&BoxRasterizer, 65..70, FontKind::Lcd).unwrap();
        fonts.uninit();
        let destroyed = sink
            .events
            .borrow()
            .iter()
            .filter(|e| matches!(e, AtlasEvent::Destroyed(_)))
            .count();
        assert_eq!(destroyed, 2);
        assert_eq!(fonts.font_count(), 0);
    }
}
