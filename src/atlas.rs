use crate::font::AtlasKind;
use crate::id::AtlasId;

/// A free band of atlas rows, `y .. y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub y: u32,
    pub height: u32,
}

/// Fixed-size glyph bitmap shared by fonts of one [`AtlasKind`].
///
/// Fonts own full-width horizontal bands; the free bands are kept as a list
/// of [`Slice`]s sorted by `y`.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub(crate) id: AtlasId,
    width: u32,
    height: u32,
    kind: AtlasKind,
    free: Vec<Slice>,
    font_count: usize,
    data: Vec<u8>,
}

impl Atlas {
    pub fn new(id: AtlasId, width: u32, height: u32, kind: AtlasKind) -> Self {
        Self {
            id,
            width,
            height,
            kind,
            free: vec![Slice { y: 0, height }],
            font_count: 0,
            data: vec![0; width as usize * height as usize * kind.bytes_per_pixel()],
        }
    }

    pub fn id(&self) -> AtlasId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> AtlasKind {
        self.kind
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.kind.bytes_per_pixel()
    }

    /// Full bitmap, rows top to bottom, `bytes_per_pixel` bytes per pixel.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn free_slices(&self) -> &[Slice] {
        &self.free
    }

    pub fn font_count(&self) -> usize {
        self.font_count
    }

    pub fn is_empty(&self) -> bool {
        self.font_count == 0
    }

    /// Reserves `height` rows and returns their top.
    ///
    /// Picks the free slice that leaves the least space over. `None` when no
    /// slice is tall enough.
    pub fn allocate(&mut self, height: u32) -> Option<u32> {
        if height > self.height {
            return None;
        }
        let (index, _) = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, slice)| slice.height >= height)
            .min_by_key(|(_, slice)| slice.height - height)?;

        let slice = &mut self.free[index];
        let y = slice.y;
        slice.y += height;
        slice.height -= height;
        if slice.height == 0 {
            self.free.remove(index);
        }
        self.font_count += 1;
        Some(y)
    }

    /// Returns a band reserved by [`allocate`](Self::allocate), merging it with free neighbours.
    pub fn release(&mut self, y: u32, height: u32) {
        self.font_count = self.font_count.saturating_sub(1);
        self.clear_rows(y, height);
        if height == 0 {
            return;
        }

        let at = self.free.partition_point(|slice| slice.y < y);
        self.free.insert(at, Slice { y, height });

        if at + 1 < self.free.len() && self.free[at].y + self.free[at].height == self.free[at + 1].y {
            self.free[at].height += self.free[at + 1].height;
            self.free.remove(at + 1);
        }
        if at > 0 && self.free[at - 1].y + self.free[at - 1].height == self.free[at].y {
            self.free[at - 1].height += self.free[at].height;
            self.free.remove(at);
        }
    }

    /// Copies a glyph bitmap to `(x, y)`.
    pub(crate) fn blit(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        let bpp = self.bytes_per_pixel();
        let row_bytes = width as usize * bpp;
        for row in 0..height as usize {
            let src = &pixels[row * row_bytes..(row + 1) * row_bytes];
            let dst_start = ((y as usize + row) * self.width as usize + x as usize) * bpp;
            self.data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
    }

    fn clear_rows(&mut self, y: u32, height: u32) {
        let row_bytes = self.width as usize * self.bytes_per_pixel();
        let start = y as usize * row_bytes;
        let end = (start + height as usize * row_bytes).min(self.data.len());
        self.data[start.min(end)..end].fill(0);
    }
}
