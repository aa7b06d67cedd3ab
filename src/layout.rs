use crate::align::Anchor;

/// How one axis of a widget's size is resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeAxis {
    /// A fixed pixel extent.
    Absolute(f32),
    /// A factor of the parent's content box (parent size minus its child margins).
    Relative(f32),
    /// An even share of the space the parent's other children leave over.
    Fill,
    /// Same extent as the other axis of this widget.
    CopyOther,
    /// The largest child extent plus this widget's margins.
    MaxChildren,
    /// The sum of child extents and spacing plus this widget's margins.
    TotalChildren,
}

impl Default for SizeAxis {
    fn default() -> Self {
        SizeAxis::Absolute(0.0)
    }
}

impl SizeAxis {
    pub(crate) fn is_aggregate(self) -> bool {
        matches!(self, SizeAxis::MaxChildren | SizeAxis::TotalChildren)
    }
}

/// How one axis of a widget's position is resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PositionAxis {
    /// Pixel offset from the parent's content-box origin.
    Absolute(f32),
    /// Factor of the parent's content box, measured from its origin.
    Relative(f32),
}

impl Default for PositionAxis {
    fn default() -> Self {
        PositionAxis::Relative(0.0)
    }
}

/// How a widget arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChildFlow {
    /// Children position themselves.
    #[default]
    None,
    /// Children are placed left to right.
    Row,
    /// Children are placed top to bottom.
    Column,
}

/// Inner margins a widget applies to its children.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Sets the same margin for all sides.
    pub fn all(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    #[inline]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    #[inline]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl From<f32> for Margins {
    fn from(value: f32) -> Self {
        Self::all(value)
    }
}

/// Declarative size of a widget plus the spacing rules it applies to its children.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeSpec {
    pub width: SizeAxis,
    pub height: SizeAxis,
    pub child_margins: Margins,
    /// Gap between consecutive children, used by aggregate sizing, fill and child flow.
    pub spacing: f32,
}

impl SizeSpec {
    pub fn new(width: SizeAxis, height: SizeAxis) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Sets the child margins.
    #[inline]
    pub fn margins(mut self, margins: impl Into<Margins>) -> Self {
        self.child_margins = margins.into();
        self
    }

    /// Sets the spacing between children.
    #[inline]
    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }
}

/// Declarative position of a widget plus how it flows its children.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionSpec {
    pub x: PositionAxis,
    pub y: PositionAxis,
    pub anchor_x: Anchor,
    pub anchor_y: Anchor,
    pub child_flow: ChildFlow,
    /// Starting offset of the child flow pen along the flow axis.
    pub scroll_offset: f32,
}

impl PositionSpec {
    pub fn new(x: PositionAxis, y: PositionAxis) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    /// Sets the anchor on both axes.
    #[inline]
    pub fn anchor(mut self, x: Anchor, y: Anchor) -> Self {
        self.anchor_x = x;
        self.anchor_y = y;
        self
    }

    #[inline]
    pub fn flow(mut self, flow: ChildFlow) -> Self {
        self.child_flow = flow;
        self
    }

    #[inline]
    pub fn scroll(mut self, offset: f32) -> Self {
        self.scroll_offset = offset;
        self
    }
}

/// Shorthand macro for [`SizeAxis::Absolute`].
#[macro_export]
macro_rules! fixed {
    ($val:expr) => {
        $crate::layout::SizeAxis::Absolute($val)
    };
}

/// Shorthand macro for [`SizeAxis::Relative`].
/// The value has to be in range `0.0..=1.0`.
#[macro_export]
macro_rules! percent {
    ($percent:expr) => {{
        const _: () = assert!(
            $percent >= 0.0 && $percent <= 1.0,
            "Percent value must be between 0.0 and 1.0 inclusive!"
        );
        $crate::layout::SizeAxis::Relative($percent)
    }};
}
