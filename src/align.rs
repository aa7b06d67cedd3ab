/// Which point of a widget its resolved position refers to, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Anchor {
    /// Left or top edge.
    #[default]
    Start,
    Center,
    /// Right or bottom edge.
    End,
}

impl Anchor {
    /// Distance from the anchor point back to the start edge.
    #[inline]
    pub(crate) fn offset(self, extent: f32) -> f32 {
        match self {
            Anchor::Start => 0.0,
            Anchor::Center => extent * 0.5,
            Anchor::End => extent,
        }
    }
}

/// Gradient axis of a two-color fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GradientDirection {
    #[default]
    Horizontal,
    Vertical,
}
