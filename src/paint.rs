use crate::align::GradientDirection;
use crate::color::Color;

/// What the draw compiler emits for a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// Layout only, nothing is drawn.
    #[default]
    None,
    /// A filled rectangle.
    Rect,
    /// A rectangle border of [`Stroke::thickness`] drawn inside the widget bounds.
    Stroke,
    /// Text shaped every frame.
    Text,
    /// Text whose geometry is replayed from the text cache.
    CachedText,
}

/// Per-widget paint descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Paint {
    pub shape: Shape,
    pub color: Color,
    /// Opaque value forwarded with every draw command, e.g. a material or texture key.
    pub user_data: usize,
    /// Buffers are flushed in ascending draw order.
    pub draw_order: u32,
    /// Skip this widget and its whole subtree.
    pub invisible: bool,
    /// Clip descendants to this widget's bounds.
    pub clip_children: bool,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            shape: Shape::None,
            color: Color::WHITE,
            user_data: 0,
            draw_order: 0,
            invisible: false,
            clip_children: false,
        }
    }
}

impl Paint {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    /// Sets the fill color.
    #[inline]
    pub fn color(mut self, color: impl Into<Color>) -> Self {
        self.color = color.into();
        self
    }

    #[inline]
    pub fn user_data(mut self, user_data: usize) -> Self {
        self.user_data = user_data;
        self
    }

    #[inline]
    pub fn draw_order(mut self, draw_order: u32) -> Self {
        self.draw_order = draw_order;
        self
    }

    #[inline]
    pub fn invisible(mut self, invisible: bool) -> Self {
        self.invisible = invisible;
        self
    }

    #[inline]
    pub fn clip_children(mut self, clip: bool) -> Self {
        self.clip_children = clip;
        self
    }
}

/// For [`Shape::Rect`] an outline around the fill, for [`Shape::Stroke`] the border itself.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stroke {
    pub color: Color,
    pub thickness: f32,
}

impl Stroke {
    pub fn new(color: impl Into<Color>, thickness: f32) -> Self {
        Self {
            color: color.into(),
            thickness,
        }
    }
}

/// Width of the transparent fringe added around edges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AntiAliasing {
    pub thickness: f32,
}

/// End color of a two-color fill; [`Paint::color`] is the start color.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecondColor {
    pub color: Color,
    pub direction: GradientDirection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rounding {
    pub radius: f32,
    /// Points per quarter circle. `0` picks the default.
    pub segments: u32,
}

impl Rounding {
    pub fn new(radius: f32, segments: u32) -> Self {
        Self { radius, segments }
    }
}
