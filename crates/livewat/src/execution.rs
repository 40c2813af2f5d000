//! Instantiation and entry-point invocation.

use std::future::Future;

use log::debug;

use crate::assembler::BinaryModule;
use crate::diagnostic::Diagnostic;
use crate::error::{CycleError, Outcome};
use crate::value::Value;

/// Name of the export invoked on every successfully instantiated module.
pub const ENTRY_POINT: &str = "main";

/// Instantiated module exposing the entry point.
pub trait EntryPoint {
    /// Call `main` with no arguments.
    fn call_main(&mut self) -> impl Future<Output = Result<Value, Diagnostic>>;
}

/// Isolated environment that loads binaries.
///
/// Implementations report a missing or non-callable `main` export as an
/// instantiation failure.
pub trait Sandbox {
    type Instance: EntryPoint;

    fn instantiate(&self, bytes: Vec<u8>) -> impl Future<Output = Result<Self::Instance, Diagnostic>>;
}

/// Runs assembled modules inside a [`Sandbox`].
#[derive(Debug, Clone)]
pub struct ExecutionHost<X> {
    sandbox: X,
}

impl<X: Sandbox> ExecutionHost<X> {
    pub fn new(sandbox: X) -> Self {
        Self { sandbox }
    }

    /// Instantiate `module` and call its entry point.
    ///
    /// Every failure comes back as a tagged [`CycleError`].
    pub async fn run(&self, module: BinaryModule) -> Outcome {
        let size = module.len();
        let mut instance = self
            .sandbox
            .instantiate(module.into_bytes())
            .await
            .map_err(CycleError::Instantiation)?;
        debug!("Instantiated {size} byte module, calling `{ENTRY_POINT}`");
        instance.call_main().await.map_err(CycleError::Runtime)
    }

    pub fn sandbox(&self) -> &X {
        &self.sandbox
    }
}
