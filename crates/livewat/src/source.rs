//! Read side of the display surface.

use std::cell::RefCell;
use std::rc::Rc;

/// Surface holding the current program text.
///
/// The text is owned and mutated elsewhere; the host only reads it once per
/// tick. `None` means the surface could not be read this tick, which skips
/// the tick without touching the change detector.
pub trait SourceSurface {
    fn read(&self) -> Option<String>;
}

/// In-memory surface shared between the writer and the host.
#[derive(Debug, Clone, Default)]
pub struct SharedSource {
    text: Rc<RefCell<String>>,
}

impl SharedSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Rc::new(RefCell::new(text.into())),
        }
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = text.into();
    }

    pub fn get(&self) -> String {
        self.text.borrow().clone()
    }
}

impl SourceSurface for SharedSource {
    fn read(&self) -> Option<String> {
        Some(self.get())
    }
}

impl<T: SourceSurface + ?Sized> SourceSurface for Rc<T> {
    fn read(&self) -> Option<String> {
        (**self).read()
    }
}
