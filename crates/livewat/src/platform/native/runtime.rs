//! Tokio-based frame source and spawner.
//!
//! Both must be used from inside a [`tokio::task::LocalSet`]: cycles are
//! `!Send` and stay on the thread that runs the scheduler.

use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::scheduler::{FrameCallback, FrameSource, Spawner};

/// Fires one frame every `period`.
#[derive(Debug, Clone, Copy)]
pub struct IntervalFrames {
    period: Duration,
}

impl IntervalFrames {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl FrameSource for IntervalFrames {
    fn request_frame(&self, callback: FrameCallback) {
        let period = self.period;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(period).await;
            callback();
        });
    }
}

/// Spawns cycles onto the current `LocalSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTasks;

impl Spawner for LocalTasks {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}
