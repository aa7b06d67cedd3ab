//! Draw compiler.
//!
//! Walks the laid-out tree in depth-first order and appends each visible
//! widget's geometry to the draw buffer matching its clip, draw order,
//! user data and font. Subtrees outside the current clip are skipped in
//! one step using the cached descendant counts.

use crate::builder::Builder;
use crate::color::Color;
use crate::errors::{Error, ErrorType, Logger};
use crate::font::Font;
use crate::font_manager::FontManager;
use crate::geometry::{
    emit_center, emit_fringe, emit_ring, fan, offset_path, quad, rounded_rect, sharp_rect, strip,
    Fill,
};
use crate::id::{FontId, WidgetId};
use crate::math::{BoundingBox, Dimensions, Vector2};
use crate::paint::{Paint, Rounding, Shape, Stroke};
use crate::render_commands::{BufferKey, DrawBuffer, Vertex};
use crate::text::TextPayload;
use crate::text_cache::text_hash;

/// Clip rect pushed by a widget that clips its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClipInfo {
    pub rect: BoundingBox,
    pub depth: u32,
}

/// Shaped text at the origin, indices starting at 0.
#[derive(Debug, Default)]
pub(crate) struct GlyphRun {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

/// Per-frame working memory reused across widgets.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    path: Vec<Vector2>,
    offset: Vec<Vector2>,
    fringe: Vec<Vector2>,
    run: GlyphRun,
}

struct RectStyle {
    min: Vector2,
    max: Vector2,
    fill: Fill,
    rounding: Option<Rounding>,
    outline: Option<Stroke>,
    aa: Option<f32>,
}

impl Builder {
    pub(crate) fn calculate_draw(&mut self, fonts: &FontManager) {
        let screen = self.screen();
        self.clip_stack.clear();
        self.clip_stack.push(ClipInfo {
            rect: BoundingBox::new(0.0, 0.0, screen.width, screen.height),
            depth: 0,
        });

        let order = self.widgets.depth_first.clone();
        let mut i = 1;
        while i < order.len() {
            let entry = order[i];
            let subtree = entry.owned_children as usize + 1;
            while self.clip_stack.len() > 1
                && self.clip_stack.last().is_some_and(|clip| clip.depth >= entry.depth)
            {
                self.clip_stack.pop();
            }

            let id = entry.widget;
            if !self.widgets.is_valid(id) {
                i += subtree;
                continue;
            }
            let index = id.index();
            let paint = self.widgets.paints[index];
            let bounds =
                BoundingBox::from_pos_size(self.widgets.positions[index], self.widgets.sizes[index]);
            let visible = bounds.intersection(&self.current_clip());
            if paint.invisible || !visible.has_area() {
                i += subtree;
                continue;
            }

            match self.widgets.passes[index].draw.clone() {
                Some(pass) => pass(self, id),
                None => self.draw_widget(id, paint, fonts),
            }

            if paint.clip_children {
                self.clip_stack.push(ClipInfo {
                    rect: visible,
                    depth: entry.depth,
                });
            }
            i += 1;
        }
    }

    pub(crate) fn current_clip(&self) -> BoundingBox {
        self.clip_stack.last().map_or_else(
            || BoundingBox::new(0.0, 0.0, self.screen().width, self.screen().height),
            |clip| clip.rect,
        )
    }

    fn buffer_key(&self, paint: &Paint, font: Option<&Font>, font_id: Option<FontId>) -> BufferKey {
        BufferKey {
            clip: self.current_clip(),
            draw_order: paint.draw_order,
            user_data: paint.user_data,
            font: font_id,
            atlas: font.and_then(Font::atlas),
        }
    }

    fn draw_widget(&mut self, id: WidgetId, paint: Paint, fonts: &FontManager) {
        match paint.shape {
            Shape::None => {}
            Shape::Rect => self.draw_rect(id, paint),
            Shape::Stroke => self.draw_stroke(id, paint),
            Shape::Text => self.draw_text(id, paint, fonts, false),
            Shape::CachedText => self.draw_text(id, paint, fonts, true),
        }
    }

    fn fill_of(&self, index: usize, color: Color) -> Fill {
        Fill {
            color,
            gradient: self.widgets.second_colors[index].map(|second| (second.color, second.direction)),
        }
    }

    fn draw_rect(&mut self, id: WidgetId, paint: Paint) {
        let index = id.index();
        let bounds =
            BoundingBox::from_pos_size(self.widgets.positions[index], self.widgets.sizes[index]);
        let style = RectStyle {
            min: bounds.min(),
            max: bounds.max(),
            fill: self.fill_of(index, paint.color),
            rounding: self.widgets.roundings[index],
            outline: self.widgets.strokes[index],
            aa: self.widgets.anti_aliasing[index].map(|aa| aa.thickness),
        };
        let key = self.buffer_key(&paint, None, None);
        let Builder { buffers, scratch, .. } = self;
        emit_rect(buffers.select(key), scratch, &style);
    }

    fn draw_stroke(&mut self, id: WidgetId, paint: Paint) {
        let index = id.index();
        let bounds =
            BoundingBox::from_pos_size(self.widgets.positions[index], self.widgets.sizes[index]);
        let stroke = self.widgets.strokes[index].unwrap_or(Stroke::new(paint.color, 1.0));
        let style = RectStyle {
            min: bounds.min(),
            max: bounds.max(),
            fill: self.fill_of(index, stroke.color),
            rounding: self.widgets.roundings[index],
            outline: Some(stroke),
            aa: self.widgets.anti_aliasing[index].map(|aa| aa.thickness),
        };
        let key = self.buffer_key(&paint, None, None);
        let Builder { buffers, scratch, .. } = self;
        emit_stroke(buffers.select(key), scratch, &style);
    }

    fn draw_text(&mut self, id: WidgetId, paint: Paint, fonts: &FontManager, cached: bool) {
        let index = id.index();
        let Some(text) = self.widgets.texts[index].as_ref() else {
            self.logger.error(Error {
                type_: ErrorType::MissingFont,
                text: "text widget has no text payload",
            });
            return;
        };
        let Some((font_id, font)) = resolve_font(&self.logger, text, fonts) else {
            return;
        };
        let key = self.buffer_key(&paint, Some(font), Some(font_id));
        let origin = self.widgets.positions[index];

        let Builder {
            widgets,
            buffers,
            text_cache,
            scratch,
            logger,
            ..
        } = self;
        let Some(text) = widgets.texts[index].as_ref() else {
            return;
        };
        let buffer = buffers.select(key);

        if !cached {
            shape_text(font, text, paint.color, &mut scratch.run);
            buffer.append_translated(&scratch.run.vertices, &scratch.run.indices, origin);
            return;
        }

        let hash = text_hash(text, paint.color);
        if let Some((vertices, indices)) = text_cache.get(hash) {
            buffer.append_translated(vertices, indices, origin);
            return;
        }
        shape_text(font, text, paint.color, &mut scratch.run);
        if !text_cache.insert(hash, &scratch.run.vertices, &scratch.run.indices) {
            logger.warn(format_args!(
                "{:?}: run of {} vertices for {:?} drawn uncached",
                ErrorType::TextCacheFull,
                scratch.run.vertices.len(),
                text.text
            ));
        }
        buffer.append_translated(&scratch.run.vertices, &scratch.run.indices, origin);
    }

    /// Appends triangles under the current clip with `id`'s draw order and user data.
    ///
    /// Meant for custom draw passes. Indices are relative to the first vertex.
    pub fn draw_geometry(&mut self, id: WidgetId, vertices: &[Vertex], indices: &[u16]) {
        let paint = self.widgets.paints[self.widgets.slot(id)];
        let key = self.buffer_key(&paint, None, None);
        self.buffers
            .select(key)
            .append_translated(vertices, indices, Vector2::ZERO);
    }

    /// Extent of `text` once shaped. A missing font measures as zero.
    pub fn text_size(&self, text: &TextPayload, fonts: &FontManager) -> Dimensions {
        match resolve_font(&self.logger, text, fonts) {
            Some((_, font)) => measure_text(font, text),
            None => Dimensions::default(),
        }
    }
}

fn resolve_font<'f>(
    logger: &Logger,
    text: &TextPayload,
    fonts: &'f FontManager,
) -> Option<(FontId, &'f Font)> {
    let Some(id) = text.font else {
        logger.error(Error {
            type_: ErrorType::MissingFont,
            text: "text has no font",
        });
        return None;
    };
    match fonts.font(id) {
        Some(font) => Some((id, font)),
        None => {
            logger.error(Error {
                type_: ErrorType::MissingFont,
                text: &format!("font {id:?} is not loaded"),
            });
            None
        }
    }
}

// ============================================================================
// Rectangles
// ============================================================================

/// Writes the outline of `style` to `out`. Returns `true` for a rounded path.
fn base_path(style: &RectStyle, out: &mut Vec<Vector2>) -> bool {
    match style.rounding {
        Some(rounding) if rounding.radius > 0.0 => {
            rounded_rect(style.min, style.max, rounding.radius, rounding.segments, out);
            true
        }
        _ => {
            sharp_rect(style.min, style.max, out);
            false
        }
    }
}

fn emit_rect(buffer: &mut DrawBuffer, scratch: &mut Scratch, style: &RectStyle) {
    let (min, max) = (style.min, style.max);
    let rounded = base_path(style, &mut scratch.path);
    let count = scratch.path.len() as u16;

    let ring = emit_ring(buffer, &scratch.path, &style.fill, min, max);
    if rounded {
        let center = emit_center(buffer, &style.fill, min, max);
        fan(buffer, center, ring, count);
    } else {
        quad(buffer, ring);
    }

    let mut edge = ring;
    let mut edge_path = &scratch.path;
    if let Some(outline) = style.outline.filter(|outline| outline.thickness > 0.0) {
        offset_path(&scratch.path, -outline.thickness, &mut scratch.offset);
        let outline_fill = Fill::solid(outline.color);
        let inner = emit_ring(buffer, &scratch.path, &outline_fill, min, max);
        let outer = emit_ring(buffer, &scratch.offset, &outline_fill, min, max);
        strip(buffer, outer, inner, count);
        edge = outer;
        edge_path = &scratch.offset;
    }

    if let Some(aa) = style.aa.filter(|aa| *aa > 0.0) {
        offset_path(edge_path, -aa, &mut scratch.fringe);
        let fringe = emit_fringe(buffer, &scratch.fringe, edge, min, max);
        strip(buffer, fringe, edge, count);
    }
}

/// A border of `style.outline` thickness inside the rect bounds.
fn emit_stroke(buffer: &mut DrawBuffer, scratch: &mut Scratch, style: &RectStyle) {
    let Some(stroke) = style.outline else {
        return;
    };
    let (min, max) = (style.min, style.max);
    let half_side = ((max.x - min.x).min(max.y - min.y) * 0.5).max(0.0);
    let thickness = stroke.thickness.clamp(0.0, half_side);
    if thickness <= 0.0 {
        return;
    }

    base_path(style, &mut scratch.path);
    let count = scratch.path.len() as u16;
    offset_path(&scratch.path, thickness, &mut scratch.offset);
    let outer = emit_ring(buffer, &scratch.path, &style.fill, min, max);
    let inner = emit_ring(buffer, &scratch.offset, &style.fill, min, max);
    strip(buffer, outer, inner, count);

    if let Some(aa) = style.aa.filter(|aa| *aa > 0.0) {
        offset_path(&scratch.path, -aa, &mut scratch.fringe);
        let fringe = emit_fringe(buffer, &scratch.fringe, outer, min, max);
        strip(buffer, fringe, outer, count);

        offset_path(&scratch.offset, aa, &mut scratch.fringe);
        let fringe = emit_fringe(buffer, &scratch.fringe, inner, min, max);
        strip(buffer, inner, fringe, count);
    }
}

// ============================================================================
// Text
// ============================================================================

const MAX_RUN_VERTICES: usize = u16::MAX as usize + 1;

/// Shapes `text` with its top-left at the origin.
pub(crate) fn shape_text(font: &Font, text: &TextPayload, color: Color, run: &mut GlyphRun) {
    run.vertices.clear();
    run.indices.clear();

    let scale = text.scale * font.pixel_scale();
    let spacing = text.spacing as f32 * scale;
    let bytes = text.text.as_bytes();

    let baseline = bytes
        .iter()
        .filter_map(|code| font.glyph(*code))
        .map(|glyph| -glyph.y_offset as f32)
        .fold(0.0, f32::max)
        * text.scale;
    let mut pen = Vector2::new(0.0, baseline);
    let mut previous: Option<u8> = None;

    for &code in bytes {
        let Some(glyph) = font.glyph(code) else {
            continue;
        };
        if let Some(previous) = previous {
            pen.x += font.kerning(previous, code) * scale;
        }
        if glyph.width > 0 && glyph.height > 0 {
            let min = Vector2::new(
                pen.x + glyph.x_offset as f32 * text.scale,
                pen.y + glyph.y_offset as f32 * text.scale,
            );
            let max = min
                + Vector2::new(
                    glyph.width as f32 * text.scale,
                    glyph.height as f32 * text.scale,
                );
            assert!(
                run.vertices.len() + 4 <= MAX_RUN_VERTICES,
                "text run of {} bytes exceeds the {} vertices addressable by u16 indices",
                bytes.len(),
                MAX_RUN_VERTICES
            );
            let base = run.vertices.len() as u16;
            run.vertices.extend_from_slice(&[
                Vertex::new(min, glyph.uv_min, color),
                Vertex::new(
                    Vector2::new(max.x, min.y),
                    Vector2::new(glyph.uv_max.x, glyph.uv_min.y),
                    color,
                ),
                Vertex::new(max, glyph.uv_max, color),
                Vertex::new(
                    Vector2::new(min.x, max.y),
                    Vector2::new(glyph.uv_min.x, glyph.uv_max.y),
                    color,
                ),
            ]);
            run.indices
                .extend_from_slice(&[base, base + 1, base + 3, base + 1, base + 2, base + 3]);
        }
        pen.x += glyph.advance * scale + spacing;
        previous = Some(code);
    }
}

pub(crate) fn measure_text(font: &Font, text: &TextPayload) -> Dimensions {
    let scale = text.scale * font.pixel_scale();
    let spacing = text.spacing as f32 * scale;

    let mut codes = text
        .text
        .bytes()
        .filter(|code| font.glyph(*code).is_some())
        .peekable();
    let mut width = 0.0;
    let mut glyphs = 0;
    while let Some(code) = codes.next() {
        let Some(glyph) = font.glyph(code) else {
            continue;
        };
        width += glyph.advance * scale + spacing;
        if let Some(&next) = codes.peek() {
            width += font.kerning(code, next) * scale;
        }
        glyphs += 1;
    }
    if glyphs > 0 {
        width -= spacing;
    }
    Dimensions::new(
        f32::max(width, 0.0),
        font.max_glyph_height() as f32 * text.scale,
    )
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::align::GradientDirection;
    use crate::builder::BuilderConfig;
    use crate::fixed;
    use crate::font::testing::{BoxRasterizer, BOX_ADVANCE, BOX_HEIGHT};
    use crate::font::FontKind;
    use crate::font_manager::{FontManagerConfig, NullAtlasSink};
    use crate::layout::{PositionAxis, PositionSpec, SizeSpec};
    use crate::paint::{AntiAliasing, SecondColor};
    use crate::widget::CustomPasses;

    fn fonts() -> (FontManager, FontId) {
        let mut fonts = FontManager::init(FontManagerConfig::default(), Box::new(NullAtlasSink));
        let id = fonts
            .load_font_with(&BoxRasterizer, 32..127, FontKind::Normal)
            .unwrap();
        (fonts, id)
    }

    fn widget(builder: &mut Builder, parent: WidgetId, x: f32, y: f32, w: f32, h: f32) -> WidgetId {
        let id = builder.allocate();
        builder.widget_set_size(id, SizeSpec::new(fixed!(w), fixed!(h)));
        builder.widget_set_position(
            id,
            PositionSpec::new(PositionAxis::Absolute(x), PositionAxis::Absolute(y)),
        );
        builder.widget_add_child(parent, id).unwrap();
        id
    }

    fn frame(builder: &mut Builder, fonts: &FontManager) {
        builder.build_begin(Dimensions::new(400.0, 300.0), fonts);
        builder.build_end();
    }

    fn totals(builder: &Builder) -> (usize, usize) {
        builder.draw_commands().iter().fold((0, 0), |(v, i), command| {
            (v + command.vertices.len(), i + command.indices.len())
        })
    }

    #[test]
    fn sharp_rect_is_one_quad() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let rect = widget(&mut builder, WidgetId::ROOT, 10.0, 20.0, 30.0, 40.0);
        builder.widget_set_paint(rect, Paint::new(Shape::Rect).color(Color::RED));

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].indices, &[0, 1, 3, 1, 2, 3]);
        assert_eq!(commands[0].vertices[2].position(), Vector2::new(40.0, 60.0));
        assert_eq!(commands[0].vertices[0].color, Color::RED.to_array());
        assert_eq!(commands[0].vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn outline_and_aa_rings() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let rect = widget(&mut builder, WidgetId::ROOT, 10.0, 10.0, 30.0, 30.0);
        builder.widget_set_paint(rect, Paint::new(Shape::Rect));
        builder.widget_set_stroke(rect, Some(Stroke::new(Color::BLACK, 2.0)));
        builder.widget_set_anti_aliasing(rect, Some(AntiAliasing { thickness: 1.0 }));

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        let vertices = commands[0].vertices;
        // fill, outline inner, outline outer, fringe
        assert_eq!(vertices.len(), 16);
        assert_eq!(commands[0].indices.len(), 6 + 24 + 24);
        let outer = vertices[8].position();
        assert!((outer.x - (10.0 - 2.0 * std::f32::consts::FRAC_1_SQRT_2)).abs() < 1e-4);
        assert_eq!(vertices[12].color[3], 0.0);
        assert_eq!(vertices[12].color[0], Color::BLACK.r);
        assert!(vertices[12].position().x < outer.x);
    }

    #[test]
    fn rounded_rect_uses_a_fan() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let rect = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 40.0, 20.0);
        builder.widget_set_paint(rect, Paint::new(Shape::Rect));
        builder.widget_set_rounding(rect, Some(Rounding::new(5.0, 2)));

        frame(&mut builder, &fonts);
        let (vertices, indices) = totals(&builder);
        assert_eq!(vertices, 12 + 1);
        assert_eq!(indices, 12 * 3);
    }

    #[test]
    fn stroke_with_aa_has_two_fringes() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let border = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 20.0, 20.0);
        builder.widget_set_paint(border, Paint::new(Shape::Stroke));
        builder.widget_set_stroke(border, Some(Stroke::new(Color::WHITE, 3.0)));
        builder.widget_set_anti_aliasing(border, Some(AntiAliasing { thickness: 1.0 }));

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        let vertices = commands[0].vertices;
        assert_eq!(vertices.len(), 16);
        assert_eq!(commands[0].indices.len(), 3 * 24);
        assert!((vertices[4].position().x - 3.0 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        // inner fringe sits inside the inner edge
        assert!(vertices[12].position().x > vertices[4].position().x);
    }

    #[test]
    fn horizontal_gradient() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let rect = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 10.0, 10.0);
        builder.widget_set_paint(rect, Paint::new(Shape::Rect).color(Color::BLACK));
        builder.widget_set_second_color(
            rect,
            Some(SecondColor {
                color: Color::WHITE,
                direction: GradientDirection::Horizontal,
            }),
        );

        frame(&mut builder, &fonts);
        let vertices = builder.draw_commands()[0].vertices;
        assert_eq!(vertices[0].color, Color::BLACK.to_array());
        assert_eq!(vertices[1].color, Color::WHITE.to_array());
        assert_eq!(vertices[3].color, Color::BLACK.to_array());
    }

    #[test]
    fn widgets_outside_the_clip_are_culled_with_their_subtree() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let clip = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 100.0, 100.0);
        builder.widget_set_paint(clip, Paint::default().clip_children(true));

        let inside = widget(&mut builder, clip, 10.0, 10.0, 10.0, 10.0);
        builder.widget_set_paint(inside, Paint::new(Shape::Rect));
        let outside = widget(&mut builder, clip, 150.0, 150.0, 50.0, 50.0);
        builder.widget_set_paint(outside, Paint::new(Shape::Rect));

        let visited: Rc<RefCell<Vec<WidgetId>>> = Rc::default();
        let probe = widget(&mut builder, outside, 0.0, 0.0, 10.0, 10.0);
        let seen = visited.clone();
        builder.widget_set_passes(
            probe,
            CustomPasses {
                draw: Some(Rc::new(move |_: &mut Builder, id: WidgetId| {
                    seen.borrow_mut().push(id)
                })),
                ..Default::default()
            },
        );

        // Sibling after the clipping subtree is clipped by the screen only.
        let after = widget(&mut builder, WidgetId::ROOT, 150.0, 150.0, 10.0, 10.0);
        builder.widget_set_paint(after, Paint::new(Shape::Rect));

        frame(&mut builder, &fonts);
        assert!(visited.borrow().is_empty());
        let commands = builder.draw_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].clip, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(commands[0].vertices.len(), 4);
        assert_eq!(commands[1].clip, BoundingBox::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(commands[1].vertices.len(), 4);
    }

    #[test]
    fn invisible_widgets_skip_their_subtree() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let hidden = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 50.0, 50.0);
        builder.widget_set_paint(hidden, Paint::new(Shape::Rect).invisible(true));
        let child = widget(&mut builder, hidden, 0.0, 0.0, 10.0, 10.0);
        builder.widget_set_paint(child, Paint::new(Shape::Rect));

        frame(&mut builder, &fonts);
        assert!(builder.draw_commands().is_empty());
    }

    #[test]
    fn flush_sorts_by_draw_order() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        for order in [3, 1, 2] {
            let id = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 10.0, 10.0);
            builder.widget_set_paint(id, Paint::new(Shape::Rect).draw_order(order));
        }
        let orders: Rc<RefCell<Vec<u32>>> = Rc::default();
        let sink = orders.clone();
        builder.set_on_draw(Some(Box::new(move |command: &crate::render_commands::DrawCommand<'_>| {
            sink.borrow_mut().push(command.draw_order)
        })));

        frame(&mut builder, &fonts);
        builder.flush();
        assert_eq!(*orders.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn same_key_widgets_share_a_buffer() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        for x in [0.0, 20.0, 40.0] {
            let id = widget(&mut builder, WidgetId::ROOT, x, 0.0, 10.0, 10.0);
            builder.widget_set_paint(id, Paint::new(Shape::Rect));
        }
        let tagged = widget(&mut builder, WidgetId::ROOT, 60.0, 0.0, 10.0, 10.0);
        builder.widget_set_paint(tagged, Paint::new(Shape::Rect).user_data(7));

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].indices.len(), 18);
        assert_eq!(commands[0].indices[6], 4);
        assert_eq!(commands[1].user_data, 7);
    }

    #[test]
    fn live_text_places_glyphs_on_the_baseline() {
        let (fonts, font) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let label = widget(&mut builder, WidgetId::ROOT, 5.0, 5.0, 100.0, 20.0);
        builder.widget_set_paint(label, Paint::new(Shape::Text));
        builder.widget_set_text(label, Some(TextPayload::new("AV", font)));

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        assert_eq!(commands[0].font, Some(font));
        assert_eq!(commands[0].atlas, fonts.font(font).unwrap().atlas());
        let vertices = commands[0].vertices;
        assert_eq!(vertices.len(), 8);
        assert_eq!(vertices[0].position(), Vector2::new(5.0 + 1.0, 5.0));
        // kerning pulls V two pixels towards A
        assert_eq!(vertices[4].position(), Vector2::new(5.0 + BOX_ADVANCE - 2.0 + 1.0, 5.0));
        assert_eq!(vertices[6].position().y, 5.0 + BOX_HEIGHT as f32);
        assert_eq!(&commands[0].indices[6..], &[4, 5, 7, 5, 6, 7]);
    }

    #[test]
    fn non_ascii_bytes_are_skipped() {
        let (fonts, font) = fonts();
        let builder = Builder::new(BuilderConfig::default());
        let plain = builder.text_size(&TextPayload::new("ab", font), &fonts);
        let accented = builder.text_size(&TextPayload::new("aéb", font), &fonts);
        assert_eq!(plain, accented);
        assert_eq!(plain, Dimensions::new(2.0 * BOX_ADVANCE, BOX_HEIGHT as f32));
    }

    #[test]
    fn longest_addressable_run_uses_every_index() {
        let (fonts, font) = fonts();
        let text = TextPayload::new("A".repeat(MAX_RUN_VERTICES / 4), font);
        let mut run = GlyphRun::default();
        shape_text(fonts.font(font).unwrap(), &text, Color::WHITE, &mut run);
        assert_eq!(run.vertices.len(), MAX_RUN_VERTICES);
        assert_eq!(run.indices.iter().max(), Some(&u16::MAX));
    }

    #[test]
    #[should_panic(expected = "addressable by u16 indices")]
    fn overlong_run_panics_while_shaping() {
        let (fonts, font) = fonts();
        let text = TextPayload::new("A".repeat(MAX_RUN_VERTICES / 4 + 1), font);
        shape_text(fonts.font(font).unwrap(), &text, Color::WHITE, &mut GlyphRun::default());
    }

    #[test]
    fn text_size_applies_scale_spacing_and_kerning() {
        let (fonts, font) = fonts();
        let builder = Builder::new(BuilderConfig::default());
        let size = builder.text_size(&TextPayload::new("AVA", font).spacing(1).scale(2.0), &fonts);
        // 3 advances, 2 gaps of spacing, one kerning pair, all doubled
        assert_eq!(size.width, 2.0 * (3.0 * BOX_ADVANCE + 2.0 - 2.0));
        assert_eq!(size.height, 2.0 * BOX_HEIGHT as f32);
        assert_eq!(
            builder.text_size(&TextPayload::default(), &fonts),
            Dimensions::default()
        );
    }

    #[test]
    fn update_text_sizes_the_widget() {
        let (fonts, font) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let label = builder.allocate();
        builder.widget_set_paint(label, Paint::new(Shape::CachedText));
        builder.widget_set_text(label, Some(TextPayload::new("hello", font)));
        builder.widget_update_text(label, &fonts);
        assert_eq!(
            builder.widget_size(label),
            SizeSpec::new(fixed!(5.0 * BOX_ADVANCE), fixed!(BOX_HEIGHT as f32))
        );
        assert_eq!(builder.widget_paint(label).shape, Shape::CachedText);
    }

    #[test]
    fn cached_text_replays_translated() {
        let (fonts, font) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let a = widget(&mut builder, WidgetId::ROOT, 10.0, 10.0, 100.0, 20.0);
        let b = widget(&mut builder, WidgetId::ROOT, 70.0, 130.0, 100.0, 20.0);
        for id in [a, b] {
            builder.widget_set_paint(id, Paint::new(Shape::CachedText).color(Color::RED));
            builder.widget_set_text(id, Some(TextPayload::new("cache me", font).spacing(2)));
        }

        frame(&mut builder, &fonts);
        assert_eq!(builder.text_cache().len(), 1);
        let vertices = builder.draw_commands()[0].vertices.to_vec();
        let indices = builder.draw_commands()[0].indices.to_vec();
        let half = vertices.len() / 2;
        let delta = Vector2::new(60.0, 120.0);
        for (first, second) in vertices[..half].iter().zip(&vertices[half..]) {
            assert_eq!(first.position() + delta, second.position());
            assert_eq!(first.uv, second.uv);
            assert_eq!(first.color, second.color);
        }
        let half_indices = indices.len() / 2;
        for (first, second) in indices[..half_indices].iter().zip(&indices[half_indices..]) {
            assert_eq!(first + half as u16, *second);
        }

        // Second frame replays both from the cache.
        frame(&mut builder, &fonts);
        assert_eq!(builder.draw_commands()[0].vertices, &vertices[..]);
    }

    #[test]
    fn full_text_cache_still_draws() {
        let (fonts, font) = fonts();
        let config = BuilderConfig::default().text_cache(std::mem::size_of::<Vertex>() * 4, 64);
        let mut builder = Builder::new(config);
        let label = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 100.0, 20.0);
        builder.widget_set_paint(label, Paint::new(Shape::CachedText));
        builder.widget_set_text(label, Some(TextPayload::new("too long", font)));

        frame(&mut builder, &fonts);
        assert!(builder.text_cache().is_empty());
        assert_eq!(totals(&builder).0, 7 * 4);
    }

    #[test]
    fn missing_font_draws_nothing() {
        let (mut fonts, font) = fonts();
        fonts.unload_font(font).unwrap();
        let mut builder = Builder::new(BuilderConfig::default());
        let label = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 100.0, 20.0);
        builder.widget_set_paint(label, Paint::new(Shape::Text));
        builder.widget_set_text(label, Some(TextPayload::new("gone", font)));

        frame(&mut builder, &fonts);
        assert!(builder.draw_commands().is_empty());
    }

    #[test]
    fn custom_draw_pass_emits_geometry() {
        let (fonts, _) = fonts();
        let mut builder = Builder::new(BuilderConfig::default());
        let custom = widget(&mut builder, WidgetId::ROOT, 0.0, 0.0, 10.0, 10.0);
        builder.widget_set_paint(custom, Paint::new(Shape::Rect).draw_order(4));
        builder.widget_set_passes(
            custom,
            CustomPasses {
                draw: Some(Rc::new(|b: &mut Builder, id: WidgetId| {
                    let triangle = [Vertex::default(); 3];
                    b.draw_geometry(id, &triangle, &[0, 1, 2]);
                })),
                ..Default::default()
            },
        );

        frame(&mut builder, &fonts);
        let commands = builder.draw_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].indices, &[0, 1, 2]);
        assert_eq!(commands[0].draw_order, 4);
    }
}
