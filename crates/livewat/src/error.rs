use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::value::Value;

/// Result of one cycle: the entry point's value or the stage that failed.
pub type Outcome = Result<Value, CycleError>;

/// Failure of a single cycle, tagged by the stage that produced it.
///
/// None of these stop the scheduler; they are reported and the cycle ends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// The text could not be turned into a binary
    #[error("assembly error: {0}")]
    Assembly(Diagnostic),
    /// The binary failed to load or lacks a callable `main`
    #[error("instantiation error: {0}")]
    Instantiation(Diagnostic),
    /// `main` trapped or raised
    #[error("runtime error: {0}")]
    Runtime(Diagnostic),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Assembly(_) => "assembly",
            Self::Instantiation(_) => "instantiation",
            Self::Runtime(_) => "runtime",
        }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Assembly(diagnostic)
            | Self::Instantiation(diagnostic)
            | Self::Runtime(diagnostic) => diagnostic,
        }
    }
}
