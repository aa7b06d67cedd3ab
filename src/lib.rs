//! Retained-widget UI builder.
//!
//! Widgets live in a [`Builder`] and are addressed by [`WidgetId`]. Every
//! frame the builder resolves sizes and positions from each widget's
//! [`SizeSpec`](layout::SizeSpec) and [`PositionSpec`](layout::PositionSpec),
//! then compiles the visible widgets into batched vertex and index buffers.
//! Text is shaped against fonts owned by a [`FontManager`], which packs
//! glyphs into atlases and reports their lifecycle to an
//! [`AtlasSink`](font_manager::AtlasSink).
//!
//! ```
//! use vellum::prelude::*;
//!
//! let fonts = FontManager::init(FontManagerConfig::default(), Box::new(NullAtlasSink));
//! let mut ui = Builder::new(BuilderConfig::default());
//!
//! let panel = ui.allocate();
//! ui.widget_set_size(panel, SizeSpec::new(percent!(1.0), percent!(1.0)).margins(8.0));
//! ui.widget_set_paint(panel, Paint::new(Shape::Rect).color(0x202020u32));
//! ui.widget_add_child(WidgetId::ROOT, panel).unwrap();
//!
//! ui.build_begin(Dimensions::new(640.0, 480.0), &fonts);
//! ui.build_end();
//! assert_eq!(ui.widget_computed_size(panel), Dimensions::new(640.0, 480.0));
//! assert_eq!(ui.draw_commands().len(), 1);
//! ```

pub mod align;
pub mod atlas;
pub mod builder;
pub mod color;
mod draw;
mod engine;
pub mod errors;
pub mod font;
pub mod font_manager;
mod geometry;
pub mod id;
pub mod input;
pub mod layout;
pub mod math;
pub mod paint;
pub mod prelude;
pub mod render_commands;
#[cfg(feature = "renderer")]
pub mod renderer;
pub mod text;
pub mod text_cache;
pub mod widget;

pub use builder::{Builder, BuilderConfig};
pub use color::Color;
pub use font_manager::FontManager;
pub use id::{FontId, WidgetId};
