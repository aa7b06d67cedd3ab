use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::id::{AtlasId, FontId};
use crate::math::{BoundingBox, Vector2};

/// Buffers whose clip rects differ by less than this are merged.
pub(crate) const CLIP_TOLERANCE: f32 = 0.9;

/// One vertex of a draw buffer. `#[repr(C)]` and [`Pod`] so backends can upload the
/// slice as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(position: Vector2, uv: Vector2, color: Color) -> Self {
        Self {
            position: [position.x, position.y],
            uv: [uv.x, uv.y],
            color: color.to_array(),
        }
    }

    #[inline]
    pub fn position(&self) -> Vector2 {
        Vector2::new(self.position[0], self.position[1])
    }

    #[inline]
    pub(crate) fn translated(mut self, offset: Vector2) -> Self {
        self.position[0] += offset.x;
        self.position[1] += offset.y;
        self
    }
}

/// What a buffer batches on. Geometry only merges into a buffer with an equal key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BufferKey {
    pub clip: BoundingBox,
    pub draw_order: u32,
    pub user_data: usize,
    pub font: Option<FontId>,
    pub atlas: Option<AtlasId>,
}

impl BufferKey {
    fn matches(&self, other: &BufferKey) -> bool {
        self.clip.approx_eq(&other.clip, CLIP_TOLERANCE)
            && self.draw_order == other.draw_order
            && self.user_data == other.user_data
            && self.font == other.font
    }
}

/// A fixed-capacity batch of triangles sharing clip, draw order, user data and font.
#[derive(Debug, Clone)]
pub struct DrawBuffer {
    key: BufferKey,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl DrawBuffer {
    fn new(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            key: BufferKey {
                clip: BoundingBox::default(),
                draw_order: 0,
                user_data: 0,
                font: None,
                atlas: None,
            },
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            vertex_capacity,
            index_capacity,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn clip(&self) -> BoundingBox {
        self.key.clip
    }

    pub fn draw_order(&self) -> u32 {
        self.key.draw_order
    }

    #[inline]
    pub(crate) fn vertex_count(&self) -> u16 {
        self.vertices.len() as u16
    }

    /// Appends a vertex and returns its index.
    #[inline]
    pub(crate) fn push_vertex(&mut self, vertex: Vertex) -> u16 {
        assert!(
            self.vertices.len() < self.vertex_capacity,
            "draw buffer vertex capacity ({}) exceeded",
            self.vertex_capacity
        );
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u16
    }

    #[inline]
    pub(crate) fn push_triangle(&mut self, a: u16, b: u16, c: u16) {
        assert!(
            self.indices.len() + 3 <= self.index_capacity,
            "draw buffer index capacity ({}) exceeded",
            self.index_capacity
        );
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Copies a run whose indices start at 0, moving it by `offset`.
    pub(crate) fn append_translated(&mut self, vertices: &[Vertex], indices: &[u16], offset: Vector2) {
        assert!(
            self.vertices.len() + vertices.len() <= self.vertex_capacity,
            "draw buffer vertex capacity ({}) exceeded",
            self.vertex_capacity
        );
        assert!(
            self.indices.len() + indices.len() <= self.index_capacity,
            "draw buffer index capacity ({}) exceeded",
            self.index_capacity
        );
        let base = self.vertex_count();
        self.vertices
            .extend(vertices.iter().map(|v| v.translated(offset)));
        self.indices.extend(indices.iter().map(|i| i + base));
    }

    fn reset(&mut self, key: BufferKey) {
        self.key = key;
        self.vertices.clear();
        self.indices.clear();
    }
}

/// A batch handed to the render backend.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u16],
    pub clip: BoundingBox,
    pub draw_order: u32,
    pub user_data: usize,
    pub font: Option<FontId>,
    /// Atlas texture to bind for text batches.
    pub atlas: Option<AtlasId>,
}

impl<'a> From<&'a DrawBuffer> for DrawCommand<'a> {
    fn from(buffer: &'a DrawBuffer) -> Self {
        Self {
            vertices: &buffer.vertices,
            indices: &buffer.indices,
            clip: buffer.key.clip,
            draw_order: buffer.key.draw_order,
            user_data: buffer.key.user_data,
            font: buffer.key.font,
            atlas: buffer.key.atlas,
        }
    }
}

/// Bounded set of draw buffers reused every frame.
#[derive(Debug)]
pub(crate) struct DrawBufferPool {
    buffers: Vec<DrawBuffer>,
    active: usize,
}

impl DrawBufferPool {
    /// Splits the total vertex and index budgets evenly over `count` buffers.
    pub fn new(count: usize, vertex_bytes: usize, index_bytes: usize) -> Self {
        assert!(count > 0, "draw buffer count must be at least 1");
        let vertex_capacity = (vertex_bytes / count / std::mem::size_of::<Vertex>())
            .min(u16::MAX as usize + 1);
        let index_capacity = index_bytes / count / std::mem::size_of::<u16>();
        let buffers = (0..count)
            .map(|_| DrawBuffer::new(vertex_capacity, index_capacity))
            .collect();
        Self { buffers, active: 0 }
    }

    pub fn reset(&mut self) {
        self.active = 0;
    }

    pub fn active(&self) -> &[DrawBuffer] {
        &self.buffers[..self.active]
    }

    /// Buffer for `key`, opening a new one when no active buffer matches.
    pub fn select(&mut self, key: BufferKey) -> &mut DrawBuffer {
        let found = self.buffers[..self.active]
            .iter()
            .position(|buffer| buffer.key.matches(&key));
        let index = match found {
            Some(index) => index,
            None => {
                assert!(
                    self.active < self.buffers.len(),
                    "draw buffer count ({}) exceeded",
                    self.buffers.len()
                );
                self.buffers[self.active].reset(key);
                self.active += 1;
                self.active - 1
            }
        };
        &mut self.buffers[index]
    }

    /// Active, non-empty buffers in ascending draw order. Equal orders keep creation order.
    pub fn sorted(&self) -> Vec<&DrawBuffer> {
        let mut sorted: Vec<&DrawBuffer> = self
            .active()
            .iter()
            .filter(|buffer| !buffer.indices.is_empty())
            .collect();
        sorted.sort_by_key(|buffer| buffer.key.draw_order);
        sorted
    }
}
