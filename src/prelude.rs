//! The vellum prelude: a single import for building and drawing a UI.
//!
//! ```rust
//! use vellum::prelude::*;
//! ```

// Core types
pub use crate::builder::{Builder, BuilderConfig, DrawCallback};
pub use crate::color::Color;
pub use crate::id::{AtlasId, FontId, WidgetId};
pub use crate::math::{BoundingBox, Dimensions, Vector2};
pub use crate::widget::{CustomPass, CustomPasses};

// Layout
pub use crate::align::{Anchor, GradientDirection};
pub use crate::layout::{ChildFlow, Margins, PositionAxis, PositionSpec, SizeAxis, SizeSpec};

// Paint and text
pub use crate::paint::{AntiAliasing, Paint, Rounding, SecondColor, Shape, Stroke};
pub use crate::text::TextPayload;
pub use crate::text_cache::TextCachePolicy;

// Fonts
pub use crate::font::{FontKind, GlyphRasterizer, SdfParams, TrueTypeRasterizer};
pub use crate::font_manager::{AtlasSink, FontManager, FontManagerConfig, NullAtlasSink};

// Output
pub use crate::render_commands::{DrawCommand, Vertex};

// Input
pub use crate::input::{
    ButtonAction, InputPhase, InputResult, KeyEvent, MouseButton, MouseEvent, MouseWheelEvent,
};

// Errors
pub use crate::errors::{FontError, UiError, Verbosity};

// Macros
pub use crate::{fixed, percent};

#[cfg(feature = "renderer")]
pub use crate::renderer::{MacroquadAtlasSink, MacroquadRenderer};
