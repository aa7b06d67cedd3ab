use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::id::{FontId, WidgetId};

/// Classification of every problem the builder and font manager report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorType {
    /// A widget handle refers to a slot that was freed or reused.
    StaleWidget,
    /// Tried to free the root widget or a subtree holding an input layer root.
    ProtectedWidget,
    /// Re-parenting would create a cycle.
    HierarchyCycle,
    /// Tried to remove a child that is not attached to the given parent.
    NotAChild,
    /// An input layer already exists at this priority.
    DuplicateInputLayer,
    InputLayerNotFound,
    /// Input arrived while no input layer was registered.
    NoInputLayers,
    /// Text was drawn or measured without a (live) font.
    MissingFont,
    /// Text was measured on a widget that has no text payload.
    MissingText,
    /// A font is taller than any atlas can hold.
    AtlasFull,
    FontLoadFailed,
    /// A text run did not fit in the text cache.
    TextCacheFull,
}

#[derive(Debug, Clone, Copy)]
pub struct Error<'a> {
    pub type_: ErrorType,
    pub text: &'a str,
}

/// Structural misuse of the widget tree or the input layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    #[error("widget {0:?} is no longer alive")]
    StaleWidget(WidgetId),

    #[error("widget {0:?} is the root widget or an input layer root and cannot be freed")]
    ProtectedWidget(WidgetId),

    #[error("adding {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { parent: WidgetId, child: WidgetId },

    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: WidgetId, child: WidgetId },

    #[error("an input layer with priority {0} already exists")]
    DuplicateInputLayer(u32),

    #[error("no input layer with priority {0}")]
    InputLayerNotFound(u32),
}

impl UiError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            UiError::StaleWidget(_) => ErrorType::StaleWidget,
            UiError::ProtectedWidget(_) => ErrorType::ProtectedWidget,
            UiError::HierarchyCycle { .. } => ErrorType::HierarchyCycle,
            UiError::NotAChild { .. } => ErrorType::NotAChild,
            UiError::DuplicateInputLayer(_) => ErrorType::DuplicateInputLayer,
            UiError::InputLayerNotFound(_) => ErrorType::InputLayerNotFound,
        }
    }
}

/// Failures while loading or placing a font.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse font: {0}")]
    Parse(&'static str),

    #[error("invalid glyph range {start}..{end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("font needs {required} rows of atlas space but atlases are {available} tall")]
    AtlasFull { required: u32, available: u32 },

    #[error("font {0:?} is not loaded")]
    NotLoaded(FontId),
}

impl FontError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            FontError::AtlasFull { .. } => ErrorType::AtlasFull,
            FontError::NotLoaded(_) => ErrorType::MissingFont,
            _ => ErrorType::FontLoadFailed,
        }
    }
}

/// Severity passed to the user log callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    Debug,
    Info,
    Warning,
    Error,
}

pub type LogCallback = Rc<dyn Fn(Verbosity, &str)>;

/// Emits `tracing` events and mirrors them to an optional user callback.
#[derive(Clone, Default)]
pub struct Logger {
    callback: Option<LogCallback>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Logger {
    pub fn new(callback: Option<LogCallback>) -> Self {
        Self { callback }
    }

    pub fn set_callback(&mut self, callback: Option<LogCallback>) {
        self.callback = callback;
    }

    pub fn log(&self, verbosity: Verbosity, message: fmt::Arguments<'_>) {
        match verbosity {
            Verbosity::Debug => tracing::debug!("{}", message),
            Verbosity::Info => tracing::info!("{}", message),
            Verbosity::Warning => tracing::warn!("{}", message),
            Verbosity::Error => tracing::error!("{}", message),
        }
        if let Some(callback) = &self.callback {
            callback(verbosity, &message.to_string());
        }
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.log(Verbosity::Info, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.log(Verbosity::Warning, message);
    }

    /// Reports a classified error.
    pub fn error(&self, error: Error<'_>) {
        self.log(
            Verbosity::Error,
            format_args!("{:?}: {}", error.type_, error.text),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn callback_receives_messages() {
        let seen: Rc<RefCell<Vec<(Verbosity, String)>>> = Rc::default();
        let sink = seen.clone();
        let logger = Logger::new(Some(Rc::new(move |v: Verbosity, m: &str| {
            sink.borrow_mut().push((v, m.to_owned()))
        })));

        logger.warn(format_args!("low on {}", "buffers"));
        logger.error(Error {
            type_: ErrorType::MissingFont,
            text: "no font",
        });

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (Verbosity::Warning, "low on buffers".to_owned()));
        assert_eq!(seen[1], (Verbosity::Error, "MissingFont: no font".to_owned()));
    }

    #[test]
    fn ui_error_classification() {
        let err = UiError::DuplicateInputLayer(3);
        assert_eq!(err.error_type(), ErrorType::DuplicateInputLayer);
        assert_eq!(err.to_string(), "an input layer with priority 3 already exists");
    }
}
