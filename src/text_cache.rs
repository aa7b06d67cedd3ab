//! Content-addressed cache of shaped text runs.
//!
//! A run is stored at the origin with indices starting at 0, and replayed
//! by translating it to wherever the text is drawn next.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::color::Color;
use crate::render_commands::Vertex;
use crate::text::TextPayload;

/// When cached runs are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextCachePolicy {
    /// Entries live until [`TextCache::clear`].
    #[default]
    Manual,
    /// Entries not drawn during the last `max_age` frames are evicted when a frame begins.
    Generational { max_age: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    vertex_start: usize,
    vertex_count: usize,
    index_start: usize,
    index_count: usize,
    last_used: u64,
}

#[derive(Debug)]
pub struct TextCache {
    policy: TextCachePolicy,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    vertex_capacity: usize,
    index_capacity: usize,
    entries: FxHashMap<u64, CacheEntry>,
    generation: u64,
}

impl TextCache {
    pub fn new(vertex_capacity: usize, index_capacity: usize, policy: TextCachePolicy) -> Self {
        Self {
            policy,
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_capacity,
            index_capacity,
            entries: FxHashMap::default(),
            generation: 0,
        }
    }

    pub fn policy(&self) -> TextCachePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: TextCachePolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.entries.contains_key(&hash)
    }

    /// Vertices currently held by cached runs.
    pub fn vertex_usage(&self) -> usize {
        self.vertices.len()
    }

    /// The cached run for `hash`, marking it used this frame.
    pub fn get(&mut self, hash: u64) -> Option<(&[Vertex], &[u16])> {
        let entry = self.entries.get_mut(&hash)?;
        entry.last_used = self.generation;
        let entry = *entry;
        Some((
            &self.vertices[entry.vertex_start..entry.vertex_start + entry.vertex_count],
            &self.indices[entry.index_start..entry.index_start + entry.index_count],
        ))
    }

    /// Stores a run. Returns `false`, storing nothing, when it does not fit.
    pub fn insert(&mut self, hash: u64, vertices: &[Vertex], indices: &[u16]) -> bool {
        if self.vertices.len() + vertices.len() > self.vertex_capacity
            || self.indices.len() + indices.len() > self.index_capacity
        {
            return false;
        }
        let entry = CacheEntry {
            vertex_start: self.vertices.len(),
            vertex_count: vertices.len(),
            index_start: self.indices.len(),
            index_count: indices.len(),
            last_used: self.generation,
        };
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.entries.insert(hash, entry);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.vertices.clear();
        self.indices.clear();
    }

    /// Advances the frame counter and applies the eviction policy. Returns how many runs were evicted.
    pub fn begin_frame(&mut self) -> usize {
        self.generation += 1;
        let TextCachePolicy::Generational { max_age } = self.policy else {
            return 0;
        };

        let gen = self.generation;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| gen - entry.last_used <= max_age as u64);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            self.compact();
        }
        evicted
    }

    /// Packs the surviving runs to the front of the slabs.
    fn compact(&mut self) {
        let mut live: Vec<(u64, CacheEntry)> = self.entries.iter().map(|(k, e)| (*k, *e)).collect();
        live.sort_by_key(|(_, entry)| entry.vertex_start);

        let mut vertices = Vec::with_capacity(self.vertices.len());
        let mut indices = Vec::with_capacity(self.indices.len());
        for (hash, entry) in live {
            let moved = CacheEntry {
                vertex_start: vertices.len(),
                index_start: indices.len(),
                ..entry
            };
            vertices.extend_from_slice(
                &self.vertices[entry.vertex_start..entry.vertex_start + entry.vertex_count],
            );
            indices.extend_from_slice(
                &self.indices[entry.index_start..entry.index_start + entry.index_count],
            );
            self.entries.insert(hash, moved);
        }
        self.vertices = vertices;
        self.indices = indices;
    }
}

/// Cache key of a text run drawn in `color`.
///
/// An explicit [`TextPayload::hash`] wins over the derived one.
pub fn text_hash(text: &TextPayload, color: Color) -> u64 {
    if text.hash != 0 {
        return text.hash;
    }
    let mut hasher = FxHasher::default();
    text.text.as_bytes().hash(&mut hasher);
    text.font.hash(&mut hasher);
    text.scale.to_bits().hash(&mut hasher);
    text.spacing.hash(&mut hasher);
    for channel in color.to_array() {
        channel.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
