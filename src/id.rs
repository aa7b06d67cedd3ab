/// Handle to a widget slot in a [`Builder`](crate::Builder).
///
/// The generation is bumped every time a slot is freed. Handles issued
/// before the bump no longer match their slot and are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl WidgetId {
    /// The root widget. It exists for the whole lifetime of a builder.
    pub const ROOT: WidgetId = WidgetId {
        index: 0,
        generation: 0,
    };

    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn is_root(self) -> bool {
        self.index == 0
    }
}

/// Handle to a font owned by a [`FontManager`](crate::font_manager::FontManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl FontId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Identifies an atlas across its created → updated → destroyed lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(pub(crate) u32);

impl AtlasId {
    pub fn raw(self) -> u32 {
        self.0
    }
}
