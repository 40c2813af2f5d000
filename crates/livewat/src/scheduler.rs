//! Frame-driven polling loop.
//!
//! Single-threaded and cooperative: a tick re-arms itself for the next frame
//! before doing any work, runs change detection synchronously and hands a
//! detected cycle to a [`Spawner`] instead of awaiting it. A failing or slow
//! cycle therefore never prevents the following tick.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::cycle::Watch;

pub type FrameCallback = Box<dyn FnOnce()>;

/// Calls back once at the next refresh opportunity.
pub trait FrameSource {
    fn request_frame(&self, callback: FrameCallback);
}

/// Runs cycle tasks on the scheduler's thread.
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

pub struct FrameScheduler<H, F, P> {
    host: Rc<H>,
    frames: F,
    spawner: P,
    ticks: Cell<u64>,
}

impl<H, F, P> FrameScheduler<H, F, P>
where
    H: Watch + 'static,
    F: FrameSource + 'static,
    P: Spawner + 'static,
{
    pub fn new(host: Rc<H>, frames: F, spawner: P) -> Rc<Self> {
        Rc::new(Self {
            host,
            frames,
            spawner,
            ticks: Cell::new(0),
        })
    }

    /// Arm the first frame. Ticks continue until the frame source stops calling back.
    pub fn start(self: &Rc<Self>) {
        self.arm();
    }

    pub fn tick(self: &Rc<Self>) {
        self.arm();
        self.ticks.set(self.ticks.get() + 1);
        if let Some(cycle) = Rc::clone(&self.host).tick() {
            self.spawner.spawn(cycle);
        }
    }

    fn arm(self: &Rc<Self>) {
        let scheduler = Rc::clone(self);
        self.frames.request_frame(Box::new(move || scheduler.tick()));
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }
}

/// Frame source driven by hand, one frame per [`ManualFrames::fire`].
#[derive(Clone, Default)]
pub struct ManualFrames {
    pending: Rc<RefCell<Option<FrameCallback>>>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the armed callback. Returns `false` when nothing was armed.
    pub fn fire(&self) -> bool {
        let callback = self.pending.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

impl FrameSource for ManualFrames {
    fn request_frame(&self, callback: FrameCallback) {
        *self.pending.borrow_mut() = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: Cell<u32>,
    }

    impl Watch for Counter {
        fn tick(self: Rc<Self>) -> Option<LocalBoxFuture<'static, ()>> {
            self.ticks.set(self.ticks.get() + 1);
            None
        }
    }

    struct NoSpawn;

    impl Spawner for NoSpawn {
        fn spawn(&self, _task: LocalBoxFuture<'static, ()>) {
            unreachable!("no cycles expected");
        }
    }

    #[test]
    fn rearms_before_work() {
        let frames = ManualFrames::new();
        let host = Rc::new(Counter { ticks: Cell::new(0) });
        let scheduler = FrameScheduler::new(host.clone(), frames.clone(), NoSpawn);

        assert!(!frames.is_armed());
        scheduler.start();
        assert!(frames.is_armed());

        for _ in 0..5 {
            assert!(frames.fire());
            assert!(frames.is_armed());
        }
        assert_eq!(scheduler.ticks(), 5);
        assert_eq!(host.ticks.get(), 5);
    }
}
