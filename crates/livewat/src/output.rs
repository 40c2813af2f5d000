//! Write side of the display surface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::DEFAULT_ERROR_PREFIX;
use crate::cycle::CycleId;
use crate::error::Outcome;

/// Receives the outcome of every reported cycle.
///
/// Each report replaces whatever the previous cycle wrote.
pub trait OutputSink {
    fn report(&self, cycle: CycleId, outcome: &Outcome);
}

impl<T: OutputSink + ?Sized> OutputSink for Rc<T> {
    fn report(&self, cycle: CycleId, outcome: &Outcome) {
        (**self).report(cycle, outcome)
    }
}

/// Text form of an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub text: String,
    pub is_error: bool,
}

/// Success shows the value, failure shows `error_prefix` followed by the tagged error.
pub fn render(outcome: &Outcome, error_prefix: &str) -> Rendered {
    match outcome {
        Ok(value) => Rendered {
            text: value.to_string(),
            is_error: false,
        },
        Err(error) => Rendered {
            text: format!("{error_prefix}{error}"),
            is_error: true,
        },
    }
}

/// JSON line for machine consumers.
#[cfg(feature = "cli")]
pub fn outcome_json(cycle: CycleId, outcome: &Outcome) -> serde_json::Value {
    match outcome {
        Ok(value) => serde_json::json!({
            "status": "ok",
            "cycle": cycle.0,
            "result": value.to_string(),
        }),
        Err(error) => serde_json::json!({
            "status": "error",
            "cycle": cycle.0,
            "kind": error.kind(),
            "error": error.diagnostic().to_string(),
        }),
    }
}

/// In-memory output surface.
///
/// Clones share the same content, so a caller can keep one handle while the
/// host owns another.
#[derive(Debug, Clone)]
pub struct TextSurface {
    content: Rc<RefCell<Rendered>>,
    writes: Rc<Cell<usize>>,
    error_prefix: Rc<str>,
}

impl TextSurface {
    pub fn new(error_prefix: &str) -> Self {
        Self {
            content: Rc::default(),
            writes: Rc::default(),
            error_prefix: Rc::from(error_prefix),
        }
    }

    pub fn text(&self) -> String {
        self.content.borrow().text.clone()
    }

    pub fn is_error(&self) -> bool {
        self.content.borrow().is_error
    }

    pub fn rendered(&self) -> Rendered {
        self.content.borrow().clone()
    }

    /// Number of reports written so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl Default for TextSurface {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_PREFIX)
    }
}

impl OutputSink for TextSurface {
    fn report(&self, _cycle: CycleId, outcome: &Outcome) {
        *self.content.borrow_mut() = render(outcome, &self.error_prefix);
        self.writes.set(self.writes.get() + 1);
    }
}
