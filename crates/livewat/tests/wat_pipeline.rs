//! End-to-end cycles through the real text assembler and Wasmtime.
#![cfg(not(target_arch = "wasm32"))]

use std::rc::Rc;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;

use livewat::platform::native::WasmtimeSandbox;
use livewat::{
    CycleError, FrameScheduler, FrameSource, HostConfig, LiveHost, ManualFrames, SharedSource,
    Spawner, TextSurface, Value, WatAssembler,
};

const ANSWER: &str = r#"(module (func (export "main") (result i32) i32.const 42))"#;
const DIVIDE_BY_ZERO: &str =
    r#"(module (func (export "main") (result i32) i32.const 1 i32.const 0 i32.div_s))"#;

type Host = LiveHost<SharedSource, WatAssembler, WasmtimeSandbox, TextSurface>;

fn host(source: &SharedSource, output: &TextSurface) -> Host {
    let config = HostConfig::default();
    let sandbox = WasmtimeSandbox::new(&config).unwrap();
    LiveHost::new(source.clone(), WatAssembler, sandbox, output.clone(), &config)
}

/// Runs every detected cycle to completion before the next tick.
struct Frames {
    source: SharedSource,
    output: TextSurface,
    frames: ManualFrames,
    pool: LocalPool,
    scheduler: Rc<FrameScheduler<Host, ManualFrames, PoolSpawner>>,
}

struct PoolSpawner(futures::executor::LocalSpawner);

impl Spawner for PoolSpawner {
    fn spawn(&self, task: futures::future::LocalBoxFuture<'static, ()>) {
        self.0.spawn_local(task).unwrap();
    }
}

impl Frames {
    fn new() -> Self {
        let source = SharedSource::default();
        let output = TextSurface::default();
        let frames = ManualFrames::new();
        let pool = LocalPool::new();
        let host = Rc::new(host(&source, &output));
        let scheduler = FrameScheduler::new(host, frames.clone(), PoolSpawner(pool.spawner()));
        scheduler.start();
        Self {
            source,
            output,
            frames,
            pool,
            scheduler,
        }
    }

    fn tick(&mut self) {
        assert!(self.frames.fire());
        self.pool.run_until_stalled();
    }

    fn show(&mut self, text: &str) {
        self.source.set(text);
        self.tick();
    }
}

#[test]
fn module_without_main_is_marked_error() {
    let mut frames = Frames::new();
    frames.show("(module)");
    assert!(frames.output.is_error());
    assert_eq!(
        frames.output.text(),
        "⚠️ Error running program: instantiation error: module does not export a `main` function"
    );
}

#[test]
fn main_returning_42_shows_42() {
    let mut frames = Frames::new();
    frames.show(ANSWER);
    assert_eq!(frames.output.text(), "42");
    assert!(!frames.output.is_error());
}

#[test]
fn unchanged_text_is_processed_once() {
    let mut frames = Frames::new();
    frames.show(ANSWER);
    frames.tick();

    let stats = frames.scheduler.host().stats();
    assert_eq!(stats.cycles_started, 1);
    assert_eq!(stats.assemblies, 1);
    assert_eq!(stats.executions, 1);
    assert_eq!(frames.output.writes(), 1);
}

#[test]
fn valid_then_invalid_text_shows_error() {
    let mut frames = Frames::new();
    frames.show(ANSWER);
    assert_eq!(frames.output.text(), "42");

    frames.show(r#"(module (func (export "main") (result i32) i32.const))"#);
    assert!(frames.output.is_error());
    assert!(
        frames
            .output
            .text()
            .starts_with("⚠️ Error running program: assembly error: "),
        "{}",
        frames.output.text()
    );
}

#[test]
fn trap_is_reported_once() {
    let mut frames = Frames::new();
    frames.show(DIVIDE_BY_ZERO);
    let text = frames.output.text();
    assert!(text.contains("runtime error"), "{text}");
    assert!(text.contains("divide by zero"), "{text}");

    frames.tick();
    frames.tick();
    let stats = frames.scheduler.host().stats();
    assert_eq!(stats.assemblies, 1);
    assert_eq!(stats.executions, 1);
    assert_eq!(frames.output.writes(), 1);
}

#[test]
fn run_cycle_returns_outcome() {
    let source = SharedSource::new(ANSWER);
    let output = TextSurface::default();
    let host = host(&source, &output);

    let cycle = host.detect().unwrap();
    assert_eq!(cycle.text(), ANSWER);
    let outcome = futures::executor::block_on(host.run_cycle(cycle));
    assert_eq!(outcome, Ok(Value::I32(42)));
    assert!(host.detect().is_none());

    source.set("(module");
    let cycle = host.detect().unwrap();
    let outcome = futures::executor::block_on(host.run_cycle(cycle));
    assert!(matches!(outcome, Err(CycleError::Assembly(_))), "{outcome:?}");
}

#[test]
fn manual_frames_accept_plain_callbacks() {
    let frames = ManualFrames::new();
    let fired = Rc::new(std::cell::Cell::new(false));
    let flag = fired.clone();
    frames.request_frame(Box::new(move || flag.set(true)));
    assert!(frames.fire());
    assert!(fired.get());
    assert!(!frames.fire());
}
