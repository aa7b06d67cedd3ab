//! Glyph rasterization and per-font glyph tables.
//!
//! A [`Font`] covers the 128 ASCII codepoints. Rasterization goes through the
//! [`GlyphRasterizer`] trait so the packer does not care where glyph
//! coverage comes from; [`TrueTypeRasterizer`] is the `fontdue` backed one.

use crate::errors::FontError;
use crate::id::AtlasId;
use crate::math::Vector2;

// ============================================================================
// Constants
// ============================================================================

pub const GLYPH_COUNT: usize = 128;
/// Horizontal gap between glyphs packed on the same atlas row.
pub(crate) const GLYPH_X_PADDING: u32 = 2;

const DEFAULT_SDF_PADDING: u32 = 3;
const DEFAULT_SDF_ON_EDGE: u8 = 128;
const DEFAULT_SDF_DISTANCE_SCALE: f32 = 32.0;

// ============================================================================
// Kinds
// ============================================================================

/// Distance-field settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SdfParams {
    /// Extra pixels around each glyph so the field can fade out.
    pub padding: u32,
    /// Value written exactly on the glyph outline.
    pub on_edge: u8,
    /// Value change per pixel of distance.
    pub distance_scale: f32,
}

impl Default for SdfParams {
    fn default() -> Self {
        Self {
            padding: DEFAULT_SDF_PADDING,
            on_edge: DEFAULT_SDF_ON_EDGE,
            distance_scale: DEFAULT_SDF_DISTANCE_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontKind {
    /// 8-bit coverage.
    #[default]
    Normal,
    /// Signed distance field.
    Sdf(SdfParams),
    /// Per-channel RGB coverage for LCD subpixel rendering.
    Lcd,
}

impl FontKind {
    pub fn atlas_kind(&self) -> AtlasKind {
        match self {
            FontKind::Normal => AtlasKind::Normal,
            FontKind::Sdf(_) => AtlasKind::Sdf,
            FontKind::Lcd => AtlasKind::Lcd,
        }
    }
}

/// Fonts only share an atlas with fonts of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AtlasKind {
    Normal,
    Sdf,
    Lcd,
}

impl AtlasKind {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            AtlasKind::Lcd => 3,
            _ => 1,
        }
    }
}

// ============================================================================
// Rasterizer seam
// ============================================================================

/// Vertical metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

/// Bitmap box of one glyph in pixels, relative to the pen on the baseline (y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Pen advance in font units.
    pub advance: f32,
}

/// A rasterized glyph. `data` holds `width * height * bytes_per_pixel` bytes, rows top to bottom.
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    pub metrics: GlyphMetrics,
    pub data: Vec<u8>,
}

/// Source of glyph outlines at one pixel size.
pub trait GlyphRasterizer {
    /// Pixels per font unit.
    fn pixel_scale(&self) -> f32;

    fn line_metrics(&self) -> LineMetrics;

    /// 8-bit coverage bitmap.
    fn rasterize(&self, codepoint: char) -> GlyphBitmap;

    /// RGB coverage bitmap. The default widens plain coverage to three channels.
    fn rasterize_subpixel(&self, codepoint: char) -> GlyphBitmap {
        let glyph = self.rasterize(codepoint);
        let data = glyph.data.iter().flat_map(|&c| [c, c, c]).collect();
        GlyphBitmap {
            metrics: glyph.metrics,
            data,
        }
    }

    /// Extra advance between `left` and `right`, in font units.
    fn kerning(&self, left: char, right: char) -> f32;
}

/// [`GlyphRasterizer`] over a TrueType/OpenType font parsed by `fontdue`.
pub struct TrueTypeRasterizer {
    font: fontdue::Font,
    px: f32,
}

impl TrueTypeRasterizer {
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, FontError> {
        let settings = fontdue::FontSettings {
            scale: px,
            ..fontdue::FontSettings::default()
        };
        let font = fontdue::Font::from_bytes(bytes, settings).map_err(FontError::Parse)?;
        Ok(Self { font, px })
    }

    fn convert(&self, metrics: fontdue::Metrics) -> GlyphMetrics {
        GlyphMetrics {
            width: metrics.width as u32,
            height: metrics.height as u32,
            x_offset: metrics.xmin,
            y_offset: -(metrics.ymin + metrics.height as i32),
            advance: metrics.advance_width / self.pixel_scale(),
        }
    }
}

impl GlyphRasterizer for TrueTypeRasterizer {
    fn pixel_scale(&self) -> f32 {
        self.font.scale_factor(self.px)
    }

    fn line_metrics(&self) -> LineMetrics {
        let scale = self.pixel_scale();
        match self.font.horizontal_line_metrics(self.px) {
            Some(m) => LineMetrics {
                ascent: m.ascent / scale,
                descent: m.descent / scale,
                line_gap: m.line_gap / scale,
            },
            None => LineMetrics::default(),
        }
    }

    fn rasterize(&self, codepoint: char) -> GlyphBitmap {
        let (metrics, data) = self.font.rasterize(codepoint, self.px);
        GlyphBitmap {
            metrics: self.convert(metrics),
            data,
        }
    }

    fn rasterize_subpixel(&self, codepoint: char) -> GlyphBitmap {
        let (metrics, data) = self.font.rasterize_subpixel(codepoint, self.px);
        GlyphBitmap {
            metrics: self.convert(metrics),
            data,
        }
    }

    fn kerning(&self, left: char, right: char) -> f32 {
        self.font
            .horizontal_kern(left, right, self.px)
            .map_or(0.0, |k| k / self.pixel_scale())
    }
}

// ============================================================================
// Font
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Pen advance in font units.
    pub advance: f32,
    /// Top-left of the bitmap inside the atlas.
    pub atlas_x: u32,
    pub atlas_y: u32,
    pub uv_min: Vector2,
    pub uv_max: Vector2,
}

/// 128 ASCII glyphs rasterized at one pixel size and placed in one atlas.
#[derive(Debug, Clone)]
pub struct Font {
    pub(crate) kind: FontKind,
    pub(crate) pixel_scale: f32,
    pub(crate) line_metrics: LineMetrics,
    pub(crate) glyphs: Vec<Glyph>,
    /// `kerning[left * GLYPH_COUNT + right]` in font units.
    pub(crate) kerning: Vec<f32>,
    pub(crate) max_glyph_height: u32,
    pub(crate) required_height: u32,
    pub(crate) atlas: Option<AtlasId>,
    /// Top of this font's slice inside its atlas.
    pub(crate) atlas_y: u32,
}

impl Font {
    pub fn kind(&self) -> FontKind {
        self.kind
    }

    pub fn pixel_scale(&self) -> f32 {
        self.pixel_scale
    }

    pub fn line_metrics(&self) -> LineMetrics {
        self.line_metrics
    }

    pub fn atlas(&self) -> Option<AtlasId> {
        self.atlas
    }

    /// Atlas rows this font occupies.
    pub fn required_height(&self) -> u32 {
        self.required_height
    }

    pub fn max_glyph_height(&self) -> u32 {
        self.max_glyph_height
    }

    /// Glyph for an ASCII byte. Other bytes have no glyph.
    #[inline]
    pub fn glyph(&self, code: u8) -> Option<&Glyph> {
        self.glyphs.get(code as usize)
    }

    #[inline]
    pub fn kerning(&self, left: u8, right: u8) -> f32 {
        if (left as usize) < GLYPH_COUNT && (right as usize) < GLYPH_COUNT {
            self.kerning[left as usize * GLYPH_COUNT + right as usize]
        } else {
            0.0
        }
    }
}

/// A font whose glyphs are rasterized and laid out in rows but not yet placed in an atlas.
pub(crate) struct PreparedFont {
    pub font: Font,
    /// Per glyph: bitmap and its row index. Empty glyphs have no entry.
    pub bitmaps: Vec<(usize, GlyphBitmap, u32)>,
}

/// Rasterizes `range` of the ASCII table and packs the bitmaps into rows of `atlas_width`.
pub(crate) fn prepare_font(
    rasterizer: &dyn GlyphRasterizer,
    range: std::ops::Range<u32>,
    kind: FontKind,
    atlas_width: u32,
) -> Result<PreparedFont, FontError> {
    if range.start >= range.end || range.end as usize > GLYPH_COUNT {
        return Err(FontError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }

    let mut glyphs = vec![Glyph::default(); GLYPH_COUNT];
    let mut kerning = vec![0.0; GLYPH_COUNT * GLYPH_COUNT];
    let mut bitmaps = Vec::new();
    let mut max_glyph_height = 0;

    for code in range.clone() {
        let ch = code as u8 as char;
        let mut bitmap = match kind {
            FontKind::Lcd => rasterizer.rasterize_subpixel(ch),
            _ => rasterizer.rasterize(ch),
        };
        if let FontKind::Sdf(params) = kind {
            bitmap = distance_field(&bitmap, params);
        }

        let m = bitmap.metrics;
        glyphs[code as usize] = Glyph {
            width: m.width,
            height: m.height,
            x_offset: m.x_offset,
            y_offset: m.y_offset,
            advance: m.advance,
            ..Default::default()
        };
        for right in range.clone() {
            kerning[code as usize * GLYPH_COUNT + right as usize] =
                rasterizer.kerning(ch, right as u8 as char);
        }
        if m.width > 0 && m.height > 0 {
            max_glyph_height = max_glyph_height.max(m.height);
            bitmaps.push((code as usize, bitmap, 0));
        }
    }

    // Rows at the atlas width; the row y is known once the font has a slice.
    let mut pen_x = 0;
    let mut row = 0;
    for (code, bitmap, glyph_row) in bitmaps.iter_mut() {
        let width = bitmap.metrics.width;
        if width > atlas_width {
            return Err(FontError::AtlasFull {
                required: width,
                available: atlas_width,
            });
        }
        if pen_x + width > atlas_width {
            row += 1;
            pen_x = 0;
        }
        glyphs[*code].atlas_x = pen_x;
        *glyph_row = row;
        pen_x += width + GLYPH_X_PADDING;
    }
    let rows = if bitmaps.is_empty() { 0 } else { row + 1 };

    let font = Font {
        kind,
        pixel_scale: rasterizer.pixel_scale(),
        line_metrics: rasterizer.line_metrics(),
        glyphs,
        kerning,
        max_glyph_height,
        required_height: rows * max_glyph_height,
        atlas: None,
        atlas_y: 0,
    };
    Ok(PreparedFont { font, bitmaps })
}

/// Converts plain coverage into a padded signed distance field.
///
/// Inside pixels are brighter than `on_edge`, outside pixels darker, changing by
/// `distance_scale` per pixel and clamped to `0..=255`.
pub(crate) fn distance_field(coverage: &GlyphBitmap, params: SdfParams) -> GlyphBitmap {
    let m = coverage.metrics;
    if m.width == 0 || m.height == 0 {
        return coverage.clone();
    }

    let pad = params.padding as i32;
    let (src_w, src_h) = (m.width as i32, m.height as i32);
    let (dst_w, dst_h) = (src_w + 2 * pad, src_h + 2 * pad);
    let inside = |x: i32, y: i32| -> bool {
        x >= 0
            && y >= 0
            && x < src_w
            && y < src_h
            && coverage.data[(y * src_w + x) as usize] >= 128
    };

    let radius = pad + 1;
    let mut data = vec![0u8; (dst_w * dst_h) as usize];
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let (sx, sy) = (dx - pad, dy - pad);
            let here = inside(sx, sy);
            let mut nearest_sq = (radius * radius) as f32;
            for oy in -radius..=radius {
                for ox in -radius..=radius {
                    if inside(sx + ox, sy + oy) != here {
                        nearest_sq = nearest_sq.min((ox * ox + oy * oy) as f32);
                    }
                }
            }
            let distance = nearest_sq.sqrt() - 0.5;
            let signed = if here { distance } else { -distance };
            let value = params.on_edge as f32 + signed * params.distance_scale;
            data[(dy * dst_w + dx) as usize] = value.clamp(0.0, 255.0) as u8;
        }
    }

    GlyphBitmap {
        metrics: GlyphMetrics {
            width: dst_w as u32,
            height: dst_h as u32,
            x_offset: m.x_offset - pad,
            y_offset: m.y_offset - pad,
            advance: m.advance,
        },
        data,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Every printable glyph is a solid 8x10 box sitting on the baseline, one
    /// font unit per pixel, advance 10. `A` followed by `V` kerns by -2.
    pub(crate) struct BoxRasterizer;

    pub(crate) const BOX_WIDTH: u32 = 8;
    pub(crate) const BOX_HEIGHT: u32 = 10;
    pub(crate) const BOX_ADVANCE: f32 = 10.0;

    impl GlyphRasterizer for BoxRasterizer {
        fn pixel_scale(&self) -> f32 {
            1.0
        }

        fn line_metrics(&self) -> LineMetrics {
            LineMetrics {
                ascent: 10.0,
                descent: -2.0,
                line_gap: 0.0,
            }
        }

        fn rasterize(&self, codepoint: char) -> GlyphBitmap {
            if !codepoint.is_ascii_graphic() {
                return GlyphBitmap {
                    metrics: GlyphMetrics {
                        advance: BOX_ADVANCE,
                        ..Default::default()
                    },
                    data: Vec::new(),
                };
            }
            GlyphBitmap {
                metrics: GlyphMetrics {
                    width: BOX_WIDTH,
                    height: BOX_HEIGHT,
                    x_offset: 1,
                    y_offset: -(BOX_HEIGHT as i32),
                    advance: BOX_ADVANCE,
                },
                data: vec![255; (BOX_WIDTH * BOX_HEIGHT) as usize],
            }
        }

        fn kerning(&self, left: char, right: char) -> f32 {
            if left == 'A' && right == 'V' {
                -2.0
            } else {
                0.0
            }
        }
    }
}
