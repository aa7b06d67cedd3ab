use crate::id::FontId;

/// Text drawn by a widget with [`Shape::Text`](crate::paint::Shape::Text) or
/// [`Shape::CachedText`](crate::paint::Shape::CachedText).
///
/// The glyph color is the widget's paint color.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextPayload {
    pub text: String,
    pub font: Option<FontId>,
    /// Extra pen advance after every glyph, in font pixels before scaling.
    pub spacing: u8,
    /// User scale applied on top of the font's own pixel scale.
    pub scale: f32,
    /// Precomputed cache key for cached text. `0` means derive it from the contents.
    pub hash: u64,
}

impl Default for TextPayload {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: None,
            spacing: 0,
            scale: 1.0,
            hash: 0,
        }
    }
}

impl TextPayload {
    pub fn new(text: impl Into<String>, font: FontId) -> Self {
        Self {
            text: text.into(),
            font: Some(font),
            ..Default::default()
        }
    }

    /// Sets the letter spacing.
    #[inline]
    pub fn spacing(mut self, spacing: u8) -> Self {
        self.spacing = spacing;
        self
    }

    #[inline]
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Pins the cache key, e.g. when the caller already hashes its strings.
    #[inline]
    pub fn hash(mut self, hash: u64) -> Self {
        self.hash = hash;
        self
    }
}
