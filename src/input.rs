//! Input routing through prioritized layers.
//!
//! Each layer names a root widget. Layers are visited in ascending priority.
//! Mouse button and key events walk the layer's subtree in depth-first
//! order (tunneling), then in reverse (bubbling); wheel events only tunnel.
//! The first handler returning [`InputResult::Handled`] ends dispatch.

use std::rc::Rc;

use crate::builder::Builder;
use crate::errors::{Error, ErrorType, UiError};
use crate::id::WidgetId;
use crate::math::{BoundingBox, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonAction {
    Press,
    Release,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub action: ButtonAction,
    pub position: Vector2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseWheelEvent {
    pub delta: Vector2,
    pub position: Vector2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Platform key code.
    pub key: u32,
    pub scancode: u32,
    pub action: ButtonAction,
    /// Platform modifier bits.
    pub modifiers: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InputPhase {
    Tunneling,
    Bubbling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum InputResult {
    Handled,
    #[default]
    NotHandled,
}

pub type MouseHandler = Rc<dyn Fn(&mut Builder, WidgetId, &MouseEvent, InputPhase) -> InputResult>;
pub type MouseWheelHandler = Rc<dyn Fn(&mut Builder, WidgetId, &MouseWheelEvent) -> InputResult>;
pub type KeyHandler = Rc<dyn Fn(&mut Builder, WidgetId, &KeyEvent, InputPhase) -> InputResult>;
pub type HoverHandler = Rc<dyn Fn(&mut Builder, WidgetId)>;

#[derive(Clone, Default)]
pub struct InputHandlers {
    pub on_mouse: Option<MouseHandler>,
    pub on_mouse_wheel: Option<MouseWheelHandler>,
    pub on_key: Option<KeyHandler>,
    pub on_hover_begin: Option<HoverHandler>,
    pub on_hover_end: Option<HoverHandler>,
}

impl std::fmt::Debug for InputHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandlers")
            .field("on_mouse", &self.on_mouse.is_some())
            .field("on_mouse_wheel", &self.on_mouse_wheel.is_some())
            .field("on_key", &self.on_key.is_some())
            .field("on_hover_begin", &self.on_hover_begin.is_some())
            .field("on_hover_end", &self.on_hover_end.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLayer {
    pub priority: u32,
    pub root: WidgetId,
}

impl Builder {
    /// Registers `root` as an input layer. Priorities are unique.
    pub fn add_input_layer(&mut self, priority: u32, root: WidgetId) -> Result<(), UiError> {
        if self.input_layers.iter().any(|layer| layer.priority == priority) {
            let err = UiError::DuplicateInputLayer(priority);
            self.logger.warn(format_args!("{err}, layer not added"));
            return Err(err);
        }
        if !self.widgets.is_valid(root) {
            return Err(self.report(UiError::StaleWidget(root)));
        }
        self.input_layers.push(InputLayer { priority, root });
        self.input_layers.sort_by_key(|layer| layer.priority);
        Ok(())
    }

    pub fn remove_input_layer(&mut self, priority: u32) -> Result<(), UiError> {
        match self
            .input_layers
            .iter()
            .position(|layer| layer.priority == priority)
        {
            Some(at) => {
                self.input_layers.remove(at);
                Ok(())
            }
            None => Err(self.report(UiError::InputLayerNotFound(priority))),
        }
    }

    pub fn input_layers(&self) -> &[InputLayer] {
        &self.input_layers
    }

    pub fn is_input_layer_root(&self, id: WidgetId) -> bool {
        self.input_layers.iter().any(|layer| layer.root == id)
    }

    pub fn widget_is_hovered(&self, id: WidgetId) -> bool {
        self.widgets.hovered[self.widgets.slot(id)]
    }

    /// Fires hover begin/end callbacks for every attached widget whose hover state changed.
    pub fn on_mouse_move(&mut self, position: Vector2) {
        let widgets: Vec<WidgetId> = self
            .widgets
            .depth_first
            .iter()
            .map(|entry| entry.widget)
            .collect();
        for id in widgets {
            if !self.widgets.is_valid(id) {
                continue;
            }
            let index = id.index();
            let bounds =
                BoundingBox::from_pos_size(self.widgets.positions[index], self.widgets.sizes[index]);
            let inside = bounds.contains(position);
            let handler = match (inside, self.widgets.hovered[index]) {
                (true, false) => {
                    self.widgets.hovered[index] = true;
                    self.widgets.handlers[index].on_hover_begin.clone()
                }
                (false, true) => {
                    self.widgets.hovered[index] = false;
                    self.widgets.handlers[index].on_hover_end.clone()
                }
                _ => None,
            };
            if let Some(handler) = handler {
                handler(self, id);
            }
        }
    }

    pub fn on_mouse_event(&mut self, event: &MouseEvent) -> InputResult {
        self.dispatch_phased(|builder, id, phase| {
            let handler = builder.widgets.handlers[id.index()].on_mouse.clone();
            handler.map_or(InputResult::NotHandled, |h| h(builder, id, event, phase))
        })
    }

    pub fn on_key_event(&mut self, event: &KeyEvent) -> InputResult {
        self.dispatch_phased(|builder, id, phase| {
            let handler = builder.widgets.handlers[id.index()].on_key.clone();
            handler.map_or(InputResult::NotHandled, |h| h(builder, id, event, phase))
        })
    }

    pub fn on_mouse_wheel_event(&mut self, event: &MouseWheelEvent) -> InputResult {
        if !self.has_input_layers() {
            return InputResult::NotHandled;
        }
        for layer in self.input_layers.clone() {
            for id in self.layer_widgets(layer) {
                if !self.widgets.is_valid(id) {
                    continue;
                }
                let handler = self.widgets.handlers[id.index()].on_mouse_wheel.clone();
                if let Some(handler) = handler {
                    if handler(self, id, event) == InputResult::Handled {
                        return InputResult::Handled;
                    }
                }
            }
        }
        InputResult::NotHandled
    }

    fn dispatch_phased(
        &mut self,
        mut call: impl FnMut(&mut Builder, WidgetId, InputPhase) -> InputResult,
    ) -> InputResult {
        if !self.has_input_layers() {
            return InputResult::NotHandled;
        }
        for layer in self.input_layers.clone() {
            let widgets = self.layer_widgets(layer);
            let tunnel = widgets.iter().map(|id| (*id, InputPhase::Tunneling));
            let bubble = widgets.iter().rev().map(|id| (*id, InputPhase::Bubbling));
            for (id, phase) in tunnel.chain(bubble) {
                if self.widgets.is_valid(id) && call(self, id, phase) == InputResult::Handled {
                    return InputResult::Handled;
                }
            }
        }
        InputResult::NotHandled
    }

    fn has_input_layers(&self) -> bool {
        if self.input_layers.is_empty() {
            self.logger.error(Error {
                type_: ErrorType::NoInputLayers,
                text: "input event received but no input layer is registered",
            });
            return false;
        }
        true
    }

    /// Snapshot of a layer's subtree in depth-first order.
    fn layer_widgets(&self, layer: InputLayer) -> Vec<WidgetId> {
        if !self.widgets.is_valid(layer.root) {
            return Vec::new();
        }
        let Some(start) = self.widgets.depth_first_position[layer.root.index()] else {
            return Vec::new();
        };
        let start = start as usize;
        let end = start + self.widgets.depth_first[start].owned_children as usize + 1;
        self.widgets.depth_first[start..end]
            .iter()
            .map(|entry| entry.widget)
            .collect()
    }
}
