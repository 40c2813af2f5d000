//! Live execution host for WebAssembly text.
//!
//! A [`FrameScheduler`] polls a [`SourceSurface`] once per frame. Whenever the
//! text changes, a [`LiveHost`] assembles it, instantiates the binary in a
//! [`Sandbox`], calls its `main` export and hands the outcome to an
//! [`OutputSink`]. Failures at any stage end up on the sink as tagged
//! [`CycleError`]s and never stop the scheduler.

pub mod assembler;
pub mod change_detector;
pub mod config;
pub mod cycle;
pub mod diagnostic;
pub mod error;
pub mod execution;
pub mod output;
pub mod platform;
pub mod scheduler;
pub mod source;
pub mod value;

pub use assembler::{Assembler, AssemblerAdapter, BinaryModule, ModuleHandle, ParseOptions, WatAssembler};
pub use change_detector::ChangeDetector;
pub use config::{ConfigError, HostConfig, ReportPolicy};
pub use cycle::{CycleId, CycleState, HostStats, LiveHost, PendingCycle, Watch};
pub use diagnostic::Diagnostic;
pub use error::{CycleError, Outcome};
pub use execution::{EntryPoint, ExecutionHost, Sandbox};
pub use output::{OutputSink, Rendered, TextSurface, render};
pub use scheduler::{FrameCallback, FrameScheduler, FrameSource, ManualFrames, Spawner};
pub use source::{SharedSource, SourceSurface};
pub use value::Value;
