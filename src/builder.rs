use crate::color::Color;
use crate::draw::{ClipInfo, Scratch};
use crate::errors::{Error, ErrorType, LogCallback, Logger, UiError};
use crate::font_manager::FontManager;
use crate::id::WidgetId;
use crate::input::{HoverHandler, InputHandlers, InputLayer, KeyHandler, MouseHandler, MouseWheelHandler};
use crate::layout::{PositionSpec, SizeAxis, SizeSpec};
use crate::math::{BoundingBox, Dimensions, Vector2};
use crate::paint::{AntiAliasing, Paint, Rounding, SecondColor, Shape, Stroke};
use crate::render_commands::{DrawBufferPool, DrawCommand};
use crate::text::TextPayload;
use crate::text_cache::{TextCache, TextCachePolicy};
use crate::widget::{CustomPasses, DepthFirstEntry, WidgetStore};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_WIDGET_CAPACITY: usize = 1024;
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
const DEFAULT_BUFFER_COUNT: usize = 10;

/// Capacities of a [`Builder`]. Sizes are in bytes and fixed for the builder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuilderConfig {
    /// Widget slots, including the root.
    pub widget_capacity: usize,
    /// Total vertex budget, split evenly across the draw buffers.
    pub vertex_buffer_size: usize,
    /// Total index budget, split evenly across the draw buffers.
    pub index_buffer_size: usize,
    pub buffer_count: usize,
    pub text_cache_vertex_buffer_size: usize,
    pub text_cache_index_buffer_size: usize,
    pub text_cache_policy: TextCachePolicy,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            widget_capacity: DEFAULT_WIDGET_CAPACITY,
            vertex_buffer_size: DEFAULT_BUFFER_SIZE,
            index_buffer_size: DEFAULT_BUFFER_SIZE,
            buffer_count: DEFAULT_BUFFER_COUNT,
            text_cache_vertex_buffer_size: DEFAULT_BUFFER_SIZE,
            text_cache_index_buffer_size: DEFAULT_BUFFER_SIZE,
            text_cache_policy: TextCachePolicy::Manual,
        }
    }
}

impl BuilderConfig {
    #[inline]
    pub fn widget_capacity(mut self, capacity: usize) -> Self {
        self.widget_capacity = capacity;
        self
    }

    /// Sets the draw buffer count and their combined vertex and index budgets.
    #[inline]
    pub fn buffers(mut self, count: usize, vertex_bytes: usize, index_bytes: usize) -> Self {
        self.buffer_count = count;
        self.vertex_buffer_size = vertex_bytes;
        self.index_buffer_size = index_bytes;
        self
    }

    #[inline]
    pub fn text_cache(mut self, vertex_bytes: usize, index_bytes: usize) -> Self {
        self.text_cache_vertex_buffer_size = vertex_bytes;
        self.text_cache_index_buffer_size = index_bytes;
        self
    }

    #[inline]
    pub fn text_cache_policy(mut self, policy: TextCachePolicy) -> Self {
        self.text_cache_policy = policy;
        self
    }
}

/// Receives every non-empty draw buffer on [`Builder::flush`].
pub type DrawCallback = Box<dyn FnMut(&DrawCommand<'_>)>;

/// Owns the widget tree and turns it into draw commands once per frame.
///
/// A frame is `build_begin` → `build_end` → `flush`. Between frames the
/// tree can be edited freely; layout results are recomputed from scratch
/// by every `build_begin`.
pub struct Builder {
    config: BuilderConfig,
    pub(crate) widgets: WidgetStore,
    pub(crate) buffers: DrawBufferPool,
    pub(crate) text_cache: TextCache,
    pub(crate) clip_stack: Vec<ClipInfo>,
    pub(crate) input_layers: Vec<InputLayer>,
    pub(crate) logger: Logger,
    pub(crate) scratch: Scratch,
    on_draw: Option<DrawCallback>,
    screen: Dimensions,
    in_frame: bool,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("widgets", &self.widgets.live_count())
            .field("input_layers", &self.input_layers)
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

impl Builder {
    pub fn new(config: BuilderConfig) -> Self {
        let vertex_size = std::mem::size_of::<crate::render_commands::Vertex>();
        Self {
            widgets: WidgetStore::new(config.widget_capacity),
            buffers: DrawBufferPool::new(
                config.buffer_count,
                config.vertex_buffer_size,
                config.index_buffer_size,
            ),
            text_cache: TextCache::new(
                config.text_cache_vertex_buffer_size / vertex_size,
                config.text_cache_index_buffer_size / std::mem::size_of::<u16>(),
                config.text_cache_policy,
            ),
            clip_stack: Vec::new(),
            input_layers: Vec::new(),
            logger: Logger::default(),
            scratch: Scratch::default(),
            on_draw: None,
            screen: Dimensions::default(),
            in_frame: false,
            config,
        }
    }

    /// Frees every widget except the root and drops layers, cached text and pending buffers.
    pub fn uninit(&mut self) {
        self.input_layers.clear();
        self.widgets.clear();
        self.text_cache.clear();
        self.buffers.reset();
        self.clip_stack.clear();
        self.in_frame = false;
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn set_log_callback(&mut self, callback: Option<LogCallback>) {
        self.logger.set_callback(callback);
    }

    pub fn set_on_draw(&mut self, callback: Option<DrawCallback>) {
        self.on_draw = callback;
    }

    pub fn screen(&self) -> Dimensions {
        self.screen
    }

    pub(crate) fn report(&self, err: UiError) -> UiError {
        self.logger.error(Error {
            type_: err.error_type(),
            text: &err.to_string(),
        });
        err
    }

    // ------------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------------

    /// A detached widget with default properties.
    ///
    /// # Panics
    /// When every widget slot is in use.
    pub fn allocate(&mut self) -> WidgetId {
        self.widgets.allocate()
    }

    /// Frees `id` and its whole subtree.
    ///
    /// The root is refused, and so is any subtree holding an input layer root.
    pub fn deallocate(&mut self, id: WidgetId) -> Result<(), UiError> {
        if !self.widgets.is_valid(id) {
            return Err(self.report(UiError::StaleWidget(id)));
        }
        if id.is_root() {
            return Err(self.report(UiError::ProtectedWidget(id)));
        }
        let layer_root = self
            .input_layers
            .iter()
            .map(|layer| layer.root)
            .find(|&root| self.widgets.is_valid(root) && self.widgets.is_ancestor(id, root));
        if let Some(root) = layer_root {
            return Err(self.report(UiError::ProtectedWidget(root)));
        }
        let freed = self.widgets.free_subtree(id);
        self.widgets.rebuild_hierarchy();
        self.logger.log(
            crate::errors::Verbosity::Debug,
            format_args!("freed {} widgets under {:?}", freed.len(), id),
        );
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self, id: WidgetId) -> bool {
        self.widgets.is_valid(id)
    }

    /// Appends `child` to `parent`'s children, detaching it from any previous parent.
    pub fn widget_add_child(&mut self, parent: WidgetId, child: WidgetId) -> Result<(), UiError> {
        for id in [parent, child] {
            if !self.widgets.is_valid(id) {
                return Err(self.report(UiError::StaleWidget(id)));
            }
        }
        if child.is_root() || self.widgets.is_ancestor(child, parent) {
            return Err(self.report(UiError::HierarchyCycle { parent, child }));
        }
        self.widgets.attach(parent, child);
        self.widgets.rebuild_hierarchy();
        Ok(())
    }

    pub fn widget_remove_child(&mut self, parent: WidgetId, child: WidgetId) -> Result<(), UiError> {
        for id in [parent, child] {
            if !self.widgets.is_valid(id) {
                return Err(self.report(UiError::StaleWidget(id)));
            }
        }
        if !self.widgets.detach(parent, child) {
            return Err(self.report(UiError::NotAChild { parent, child }));
        }
        self.widgets.rebuild_hierarchy();
        Ok(())
    }

    pub fn widget_parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets.parents[self.widgets.slot(id)]
    }

    pub fn widget_children(&self, id: WidgetId) -> &[WidgetId] {
        &self.widgets.children[self.widgets.slot(id)]
    }

    /// Widgets attached under the root in depth-first order, the root first.
    pub fn depth_first(&self) -> &[DepthFirstEntry] {
        &self.widgets.depth_first
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.live_count()
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    pub fn widget_size(&self, id: WidgetId) -> SizeSpec {
        self.widgets.size_specs[self.widgets.slot(id)]
    }

    pub fn widget_set_size(&mut self, id: WidgetId, size: SizeSpec) {
        let slot = self.widgets.slot(id);
        self.widgets.size_specs[slot] = size;
    }

    pub fn widget_position(&self, id: WidgetId) -> PositionSpec {
        self.widgets.position_specs[self.widgets.slot(id)]
    }

    pub fn widget_set_position(&mut self, id: WidgetId, position: PositionSpec) {
        let slot = self.widgets.slot(id);
        self.widgets.position_specs[slot] = position;
    }

    pub fn widget_paint(&self, id: WidgetId) -> Paint {
        self.widgets.paints[self.widgets.slot(id)]
    }

    pub fn widget_set_paint(&mut self, id: WidgetId, paint: Paint) {
        let slot = self.widgets.slot(id);
        self.widgets.paints[slot] = paint;
    }

    pub fn widget_stroke(&self, id: WidgetId) -> Option<Stroke> {
        self.widgets.strokes[self.widgets.slot(id)]
    }

    pub fn widget_set_stroke(&mut self, id: WidgetId, stroke: Option<Stroke>) {
        let slot = self.widgets.slot(id);
        self.widgets.strokes[slot] = stroke;
    }

    pub fn widget_rounding(&self, id: WidgetId) -> Option<Rounding> {
        self.widgets.roundings[self.widgets.slot(id)]
    }

    pub fn widget_set_rounding(&mut self, id: WidgetId, rounding: Option<Rounding>) {
        let slot = self.widgets.slot(id);
        self.widgets.roundings[slot] = rounding;
    }

    pub fn widget_anti_aliasing(&self, id: WidgetId) -> Option<AntiAliasing> {
        self.widgets.anti_aliasing[self.widgets.slot(id)]
    }

    pub fn widget_set_anti_aliasing(&mut self, id: WidgetId, aa: Option<AntiAliasing>) {
        let slot = self.widgets.slot(id);
        self.widgets.anti_aliasing[slot] = aa;
    }

    pub fn widget_second_color(&self, id: WidgetId) -> Option<SecondColor> {
        self.widgets.second_colors[self.widgets.slot(id)]
    }

    pub fn widget_set_second_color(&mut self, id: WidgetId, second: Option<SecondColor>) {
        let slot = self.widgets.slot(id);
        self.widgets.second_colors[slot] = second;
    }

    pub fn widget_text(&self, id: WidgetId) -> Option<&TextPayload> {
        self.widgets.texts[self.widgets.slot(id)].as_ref()
    }

    pub fn widget_set_text(&mut self, id: WidgetId, text: Option<TextPayload>) {
        let slot = self.widgets.slot(id);
        self.widgets.texts[slot] = text;
    }

    pub fn widget_passes(&self, id: WidgetId) -> &CustomPasses {
        &self.widgets.passes[self.widgets.slot(id)]
    }

    /// Replaces the generic size, position or draw rule of one widget.
    pub fn widget_set_passes(&mut self, id: WidgetId, passes: CustomPasses) {
        let slot = self.widgets.slot(id);
        self.widgets.passes[slot] = passes;
    }

    pub fn widget_handlers(&self, id: WidgetId) -> &InputHandlers {
        &self.widgets.handlers[self.widgets.slot(id)]
    }

    pub fn widget_set_handlers(&mut self, id: WidgetId, handlers: InputHandlers) {
        let slot = self.widgets.slot(id);
        self.widgets.handlers[slot] = handlers;
    }

    pub fn widget_set_mouse_handler(&mut self, id: WidgetId, handler: Option<MouseHandler>) {
        let slot = self.widgets.slot(id);
        self.widgets.handlers[slot].on_mouse = handler;
    }

    pub fn widget_set_mouse_wheel_handler(&mut self, id: WidgetId, handler: Option<MouseWheelHandler>) {
        let slot = self.widgets.slot(id);
        self.widgets.handlers[slot].on_mouse_wheel = handler;
    }

    pub fn widget_set_key_handler(&mut self, id: WidgetId, handler: Option<KeyHandler>) {
        let slot = self.widgets.slot(id);
        self.widgets.handlers[slot].on_key = handler;
    }

    pub fn widget_set_hover_handlers(
        &mut self,
        id: WidgetId,
        begin: Option<HoverHandler>,
        end: Option<HoverHandler>,
    ) {
        let slot = self.widgets.slot(id);
        self.widgets.handlers[slot].on_hover_begin = begin;
        self.widgets.handlers[slot].on_hover_end = end;
    }

    /// Size resolved by the last layout, in pixels.
    pub fn widget_computed_size(&self, id: WidgetId) -> Dimensions {
        self.widgets.sizes[self.widgets.slot(id)]
    }

    /// Used by custom size passes to publish their result.
    pub fn widget_set_computed_size(&mut self, id: WidgetId, size: Dimensions) {
        let slot = self.widgets.slot(id);
        self.widgets.sizes[slot] = size;
    }

    /// Top-left corner resolved by the last layout, in screen pixels.
    pub fn widget_computed_position(&self, id: WidgetId) -> Vector2 {
        self.widgets.positions[self.widgets.slot(id)]
    }

    /// Used by custom position passes to publish their result.
    pub fn widget_set_computed_position(&mut self, id: WidgetId, position: Vector2) {
        let slot = self.widgets.slot(id);
        self.widgets.positions[slot] = position;
    }

    pub fn widget_bounds(&self, id: WidgetId) -> BoundingBox {
        let slot = self.widgets.slot(id);
        BoundingBox::from_pos_size(self.widgets.positions[slot], self.widgets.sizes[slot])
    }

    /// Adds a child that outlines `id` in red. Returns the new widget.
    pub fn widget_add_debug_wrap(&mut self, id: WidgetId) -> Result<WidgetId, UiError> {
        if !self.widgets.is_valid(id) {
            return Err(self.report(UiError::StaleWidget(id)));
        }
        let wrap = self.allocate();
        self.widget_set_size(
            wrap,
            SizeSpec::new(SizeAxis::Relative(1.0), SizeAxis::Relative(1.0)),
        );
        self.widget_set_paint(
            wrap,
            Paint::new(Shape::Stroke).draw_order(self.widget_paint(id).draw_order),
        );
        self.widget_set_stroke(wrap, Some(Stroke::new(Color::RED, 1.0)));
        self.widget_add_child(id, wrap)?;
        Ok(wrap)
    }

    // ------------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------------

    /// Sizes `id` to its text and marks it as a text widget.
    ///
    /// A widget already drawing [`Shape::CachedText`] keeps it.
    pub fn widget_update_text(&mut self, id: WidgetId, fonts: &FontManager) {
        let slot = self.widgets.slot(id);
        let Some(text) = self.widgets.texts[slot].as_ref() else {
            self.logger.error(Error {
                type_: ErrorType::MissingText,
                text: "widget has no text to measure",
            });
            return;
        };
        let size = self.text_size(text, fonts);
        let spec = &mut self.widgets.size_specs[slot];
        spec.width = SizeAxis::Absolute(size.width);
        spec.height = SizeAxis::Absolute(size.height);
        let paint = &mut self.widgets.paints[slot];
        if !matches!(paint.shape, Shape::Text | Shape::CachedText) {
            paint.shape = Shape::Text;
        }
    }

    pub fn clear_text_cache(&mut self) {
        self.text_cache.clear();
    }

    pub fn text_cache(&self) -> &TextCache {
        &self.text_cache
    }

    pub fn set_text_cache_policy(&mut self, policy: TextCachePolicy) {
        self.text_cache.set_policy(policy);
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    /// Lays out the tree for `screen` and compiles it into draw buffers.
    pub fn build_begin(&mut self, screen: Dimensions, fonts: &FontManager) {
        if self.in_frame {
            self.logger
                .warn(format_args!("build_begin called twice without build_end"));
        }
        self.in_frame = true;
        self.screen = screen;

        let evicted = self.text_cache.begin_frame();
        if evicted > 0 {
            self.logger.log(
                crate::errors::Verbosity::Debug,
                format_args!("evicted {evicted} cached text runs"),
            );
        }
        self.buffers.reset();

        self.calculate_sizes();
        self.calculate_positions();
        self.calculate_draw(fonts);
    }

    pub fn build_end(&mut self) {
        self.in_frame = false;
        self.clip_stack.clear();
    }

    /// Hands every non-empty buffer to the draw callback in ascending draw order.
    pub fn flush(&mut self) {
        let Some(on_draw) = self.on_draw.as_mut() else {
            return;
        };
        for buffer in self.buffers.sorted() {
            on_draw(&DrawCommand::from(buffer));
        }
    }

    /// The same commands [`flush`](Self::flush) would send.
    pub fn draw_commands(&self) -> Vec<DrawCommand<'_>> {
        self.buffers
            .sorted()
            .into_iter()
            .map(DrawCommand::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed;

    #[test]
    fn allocate_gives_detached_widget() {
        let mut builder = Builder::new(BuilderConfig::default());
        let id = builder.allocate();
        assert!(builder.is_valid(id));
        assert_eq!(builder.widget_parent(id), None);
        assert!(builder.widget_children(id).is_empty());
        assert_eq!(builder.widget_paint(id), Paint::default());
    }

    #[test]
    fn deallocate_invalidates_descendants() {
        let mut builder = Builder::new(BuilderConfig::default());
        let a = builder.allocate();
        let b = builder.allocate();
        let c = builder.allocate();
        builder.widget_add_child(WidgetId::ROOT, a).unwrap();
        builder.widget_add_child(a, b).unwrap();
        builder.widget_add_child(b, c).unwrap();

        builder.deallocate(a).unwrap();
        assert!(!builder.is_valid(a));
        assert!(!builder.is_valid(b));
        assert!(!builder.is_valid(c));
        assert_eq!(builder.depth_first().len(), 1);
        assert_eq!(builder.deallocate(a), Err(UiError::StaleWidget(a)));
    }

    #[test]
    fn protected_widgets_are_refused() {
        let mut builder = Builder::new(BuilderConfig::default());
        assert_eq!(
            builder.deallocate(WidgetId::ROOT),
            Err(UiError::ProtectedWidget(WidgetId::ROOT))
        );

        let layer = builder.allocate();
        builder.widget_add_child(WidgetId::ROOT, layer).unwrap();
        builder.add_input_layer(0, layer).unwrap();
        assert_eq!(builder.deallocate(layer), Err(UiError::ProtectedWidget(layer)));
        assert!(builder.is_valid(layer));

        builder.remove_input_layer(0).unwrap();
        assert_eq!(builder.deallocate(layer), Ok(()));
    }

    #[test]
    fn update_text_without_payload_reports_missing_text() {
        use crate::errors::Verbosity;
        use crate::font_manager::{FontManagerConfig, NullAtlasSink};
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<(Verbosity, String)>>> = Rc::default();
        let sink = seen.clone();
        let mut builder = Builder::new(BuilderConfig::default());
        builder.set_log_callback(Some(Rc::new(move |v: Verbosity, msg: &str| {
            sink.borrow_mut().push((v, msg.to_owned()))
        })));
        let fonts = FontManager::init(FontManagerConfig::default(), Box::new(NullAtlasSink));

        let id = builder.allocate();
        builder.widget_update_text(id, &fonts);
        assert_eq!(
            *seen.borrow(),
            vec![(
                Verbosity::Error,
                "MissingText: widget has no text to measure".to_owned()
            )]
        );
        assert_eq!(builder.widget_size(id), SizeSpec::default());
        assert_eq!(builder.widget_paint(id).shape, Shape::None);
    }

    #[test]
    fn cycles_are_refused() {
        let mut builder = Builder::new(BuilderConfig::default());
        let a = builder.allocate();
        let b = builder.allocate();
        builder.widget_add_child(a, b).unwrap();
        assert_eq!(
            builder.widget_add_child(b, a),
            Err(UiError::HierarchyCycle { parent: b, child: a })
        );
        assert_eq!(
            builder.widget_add_child(a, a),
            Err(UiError::HierarchyCycle { parent: a, child: a })
        );
        assert_eq!(
            builder.widget_remove_child(b, a),
            Err(UiError::NotAChild { parent: b, child: a })
        );
    }

    #[test]
    #[should_panic(expected = "stale widget id")]
    fn stale_handle_access_panics() {
        let mut builder = Builder::new(BuilderConfig::default());
        let a = builder.allocate();
        builder.deallocate(a).unwrap();
        let _ = builder.widget_size(a);
    }

    #[test]
    fn reused_slot_does_not_revive_old_handle() {
        let mut builder = Builder::new(BuilderConfig::default().widget_capacity(2));
        let a = builder.allocate();
        builder.deallocate(a).unwrap();
        let b = builder.allocate();
        assert_eq!(a.index(), b.index());
        assert!(!builder.is_valid(a));
        assert!(builder.is_valid(b));
    }

    #[test]
    fn debug_wrap_is_a_red_stroke_child() {
        let mut builder = Builder::new(BuilderConfig::default());
        let a = builder.allocate();
        builder.widget_set_size(a, SizeSpec::new(fixed!(10.0), fixed!(10.0)));
        let wrap = builder.widget_add_debug_wrap(a).unwrap();
        assert_eq!(builder.widget_children(a), &[wrap]);
        assert_eq!(builder.widget_paint(wrap).shape, Shape::Stroke);
        assert_eq!(builder.widget_stroke(wrap).unwrap().color, Color::RED);
    }

    #[test]
    fn uninit_keeps_only_the_root() {
        let mut builder = Builder::new(BuilderConfig::default());
        let a = builder.allocate();
        builder.widget_add_child(WidgetId::ROOT, a).unwrap();
        builder.add_input_layer(1, a).unwrap();
        let detached = builder.allocate();
        builder.uninit();
        assert!(!builder.is_valid(a));
        assert!(!builder.is_valid(detached));
        assert!(builder.input_layers().is_empty());
        assert_eq!(builder.widget_count(), 1);
    }
}
