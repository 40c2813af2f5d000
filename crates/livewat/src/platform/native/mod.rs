//! Native bindings: wasmtime sandbox, tokio frame source and file-backed source.

pub mod runtime;
pub mod sandbox;
pub mod source;

pub use runtime::{IntervalFrames, LocalTasks};
pub use sandbox::{WasmtimeInstance, WasmtimeSandbox};
pub use source::FileSource;
