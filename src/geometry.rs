//! Procedural rectangle geometry.
//!
//! Shapes are closed clockwise paths in screen space (y down). Rings of
//! equal length are stitched into triangle strips; solid rounded fills use a
//! central fan.

use crate::align::GradientDirection;
use crate::color::Color;
use crate::math::Vector2;
use crate::render_commands::{DrawBuffer, Vertex};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ROUNDING_SEGMENTS: u32 = 10;
const MAX_ROUNDING_SEGMENTS: u32 = 90;

/// Solid or two-color paint applied to emitted vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fill {
    pub color: Color,
    pub gradient: Option<(Color, GradientDirection)>,
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            gradient: None,
        }
    }

    fn at(&self, point: Vector2, min: Vector2, max: Vector2) -> Color {
        let Some((end, direction)) = self.gradient else {
            return self.color;
        };
        let ratio = match direction {
            GradientDirection::Horizontal => ratio(point.x, min.x, max.x),
            GradientDirection::Vertical => ratio(point.y, min.y, max.y),
        };
        self.color.lerp(end, ratio)
    }

    fn average(&self) -> Color {
        match self.gradient {
            Some((end, _)) => self.color.lerp(end, 0.5),
            None => self.color,
        }
    }
}

#[inline]
fn ratio(value: f32, min: f32, max: f32) -> f32 {
    if max - min <= f32::EPSILON {
        0.0
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

#[inline]
fn uv(point: Vector2, min: Vector2, max: Vector2) -> Vector2 {
    Vector2::new(ratio(point.x, min.x, max.x), ratio(point.y, min.y, max.y))
}

// ============================================================================
// Paths
// ============================================================================

/// Top-left, top-right, bottom-right, bottom-left.
pub(crate) fn sharp_rect(min: Vector2, max: Vector2, out: &mut Vec<Vector2>) {
    out.clear();
    out.extend_from_slice(&[
        min,
        Vector2::new(max.x, min.y),
        max,
        Vector2::new(min.x, max.y),
    ]);
}

/// Clamped segment count for a quarter circle.
pub(crate) fn rounding_segments(segments: u32) -> u32 {
    if segments == 0 {
        DEFAULT_ROUNDING_SEGMENTS
    } else {
        segments.clamp(1, MAX_ROUNDING_SEGMENTS)
    }
}

/// Four quarter circles of `segments + 1` points each, starting at the top-left corner.
pub(crate) fn rounded_rect(
    min: Vector2,
    max: Vector2,
    radius: f32,
    segments: u32,
    out: &mut Vec<Vector2>,
) {
    out.clear();
    let radius = radius.min((max.x - min.x) * 0.5).min((max.y - min.y) * 0.5).max(0.0);
    let segments = rounding_segments(segments);
    let step = std::f32::consts::FRAC_PI_2 / segments as f32;

    let corners = [
        (Vector2::new(min.x + radius, min.y + radius), 270.0_f32),
        (Vector2::new(max.x - radius, min.y + radius), 0.0),
        (Vector2::new(max.x - radius, max.y - radius), 90.0),
        (Vector2::new(min.x + radius, max.y - radius), 180.0),
    ];
    for (center, start_deg) in corners {
        let start = start_deg.to_radians();
        for i in 0..=segments {
            let angle = start + step * i as f32;
            out.push(Vector2::new(
                center.x + angle.sin() * radius,
                center.y - angle.cos() * radius,
            ));
        }
    }
}

/// Moves every point of a closed path along its miter vector.
///
/// The miter is the normalized sum of the normals of the two edges meeting
/// at the point. Positive `distance` moves inward on a clockwise path.
pub(crate) fn offset_path(path: &[Vector2], distance: f32, out: &mut Vec<Vector2>) {
    out.clear();
    let n = path.len();
    for i in 0..n {
        let prev = path[(i + n - 1) % n];
        let curr = path[i];
        let next = path[(i + 1) % n];

        let mut incoming = (curr - prev).normalized();
        let mut outgoing = (next - curr).normalized();
        if incoming == Vector2::ZERO {
            incoming = outgoing;
        }
        if outgoing == Vector2::ZERO {
            outgoing = incoming;
        }
        let miter = (incoming.perpendicular() + outgoing.perpendicular()).normalized();
        out.push(curr + miter * distance);
    }
}

// ============================================================================
// Vertex and index emission
// ============================================================================

/// Emits one vertex per path point, colored and uv-mapped against the `min..max` box.
pub(crate) fn emit_ring(
    buffer: &mut DrawBuffer,
    path: &[Vector2],
    fill: &Fill,
    min: Vector2,
    max: Vector2,
) -> u16 {
    let start = buffer.vertex_count();
    for &point in path {
        buffer.push_vertex(Vertex::new(point, uv(point, min, max), fill.at(point, min, max)));
    }
    start
}

/// Emits a fully transparent ring whose colors follow the ring at `source`.
pub(crate) fn emit_fringe(
    buffer: &mut DrawBuffer,
    path: &[Vector2],
    source: u16,
    min: Vector2,
    max: Vector2,
) -> u16 {
    let start = buffer.vertex_count();
    for (i, &point) in path.iter().enumerate() {
        let mut color = buffer.vertices()[source as usize + i].color;
        color[3] = 0.0;
        let tex = uv(point, min, max);
        buffer.push_vertex(Vertex {
            position: [point.x, point.y],
            uv: [tex.x, tex.y],
            color,
        });
    }
    start
}

/// Emits the hub vertex of a central fan.
pub(crate) fn emit_center(buffer: &mut DrawBuffer, fill: &Fill, min: Vector2, max: Vector2) -> u16 {
    let center = (min + max) * 0.5;
    buffer.push_vertex(Vertex::new(center, Vector2::new(0.5, 0.5), fill.average()))
}

/// Two triangles over a four-vertex ring.
pub(crate) fn quad(buffer: &mut DrawBuffer, start: u16) {
    buffer.push_triangle(start, start + 1, start + 3);
    buffer.push_triangle(start + 1, start + 2, start + 3);
}

/// One triangle per ring edge, all sharing `center`.
pub(crate) fn fan(buffer: &mut DrawBuffer, center: u16, start: u16, count: u16) {
    for i in 0..count {
        buffer.push_triangle(center, start + i, start + (i + 1) % count);
    }
}

/// Stitches two rings of `count` vertices into a closed band.
pub(crate) fn strip(buffer: &mut DrawBuffer, outer: u16, inner: u16, count: u16) {
    for i in 0..count {
        let next = (i + 1) % count;
        buffer.push_triangle(outer + i, outer + next, inner + i);
        buffer.push_triangle(outer + next, inner + next, inner + i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_commands::DrawBufferPool;

    fn close(a: Vector2, b: Vector2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn sharp_rect_is_clockwise() {
        let mut path = Vec::new();
        sharp_rect(Vector2::new(1.0, 2.0), Vector2::new(11.0, 22.0), &mut path);
        assert_eq!(
            path,
            vec![
                Vector2::new(1.0, 2.0),
                Vector2::new(11.0, 2.0),
                Vector2::new(11.0, 22.0),
                Vector2::new(1.0, 22.0),
            ]
        );
    }

    #[test]
    fn miter_offset_of_square() {
        let mut path = Vec::new();
        let mut out = Vec::new();
        sharp_rect(Vector2::ZERO, Vector2::new(10.0, 10.0), &mut path);

        offset_path(&path, -1.0, &mut out);
        let d = std::f32::consts::FRAC_1_SQRT_2;
        assert!(close(out[0], Vector2::new(-d, -d)));
        assert!(close(out[2], Vector2::new(10.0 + d, 10.0 + d)));

        offset_path(&path, 1.0, &mut out);
        assert!(close(out[1], Vector2::new(10.0 - d, d)));
    }

    #[test]
    fn rounded_rect_point_count_and_extent() {
        let mut path = Vec::new();
        rounded_rect(Vector2::ZERO, Vector2::new(100.0, 50.0), 10.0, 4, &mut path);
        assert_eq!(path.len(), 4 * (4 + 1));
        // First corner starts on the left edge and ends on the top edge.
        assert!(close(path[0], Vector2::new(0.0, 10.0)));
        assert!(close(path[4], Vector2::new(10.0, 0.0)));
        assert!(close(path[5], Vector2::new(90.0, 0.0)));
        assert!(path
            .iter()
            .all(|p| p.x >= -1e-4 && p.x <= 100.0001 && p.y >= -1e-4 && p.y <= 50.0001));
    }

    #[test]
    fn rounding_radius_is_clamped_to_half_side() {
        let mut path = Vec::new();
        rounded_rect(Vector2::ZERO, Vector2::new(20.0, 10.0), 50.0, 2, &mut path);
        assert!(close(path[0], Vector2::new(0.0, 5.0)));
        assert_eq!(rounding_segments(0), 10);
        assert_eq!(rounding_segments(500), 90);
    }

    #[test]
    fn fan_and_strip_index_counts() {
        let mut pool = DrawBufferPool::new(1, 1 << 16, 1 << 16);
        let buffer = pool.select(crate::render_commands::BufferKey {
            clip: crate::math::BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            draw_order: 0,
            user_data: 0,
            font: None,
            atlas: None,
        });
        let mut path = Vec::new();
        sharp_rect(Vector2::ZERO, Vector2::new(4.0, 4.0), &mut path);
        let fill = Fill::solid(Color::WHITE);
        let outer = emit_ring(buffer, &path, &fill, Vector2::ZERO, Vector2::new(4.0, 4.0));
        let inner = emit_fringe(buffer, &path, outer, Vector2::ZERO, Vector2::new(4.0, 4.0));
        strip(buffer, outer, inner, 4);
        assert_eq!(buffer.indices().len(), 4 * 6);
        assert_eq!(buffer.vertices()[inner as usize].color[3], 0.0);

        let center = emit_center(buffer, &fill, Vector2::ZERO, Vector2::new(4.0, 4.0));
        fan(buffer, center, outer, 4);
        assert_eq!(buffer.indices().len(), 4 * 6 + 4 * 3);
    }

    #[test]
    fn gradient_interpolates_along_direction() {
        let fill = Fill {
            color: Color::BLACK,
            gradient: Some((Color::WHITE, GradientDirection::Vertical)),
        };
        let min = Vector2::ZERO;
        let max = Vector2::new(10.0, 10.0);
        assert_eq!(fill.at(Vector2::new(10.0, 0.0), min, max), Color::BLACK);
        assert_eq!(fill.at(Vector2::new(0.0, 10.0), min, max), Color::WHITE);
        assert_eq!(fill.at(Vector2::new(0.0, -3.0), min, max), Color::BLACK);
    }
}
