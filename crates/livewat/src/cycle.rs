//! One detect, assemble, execute, report iteration.
//!
//! Detection is synchronous and runs inside the tick. Everything after it
//! lives in a [`PendingCycle`] that the scheduler spawns, so a slow sandbox
//! never holds up the next tick. Cycles may overlap; by default whichever
//! finishes last owns the output surface.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, info, trace, warn};

use crate::assembler::{Assembler, AssemblerAdapter};
use crate::change_detector::ChangeDetector;
use crate::config::{HostConfig, ReportPolicy};
use crate::error::Outcome;
use crate::execution::{ExecutionHost, Sandbox};
use crate::output::OutputSink;
use crate::source::SourceSurface;

/// Sequence number assigned when a change is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-cycle state machine.
///
/// `Idle → Detecting → {Idle | Assembling} → {Executing | Failed} → Reported → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Detecting,
    Assembling,
    Executing,
    /// Assembly failed
    Failed,
    Reported { success: bool },
}

impl CycleState {
    pub fn can_advance_to(self, next: CycleState) -> bool {
        use CycleState::*;
        matches!(
            (self, next),
            (Idle, Detecting)
                | (Detecting, Idle)
                | (Detecting, Assembling)
                | (Assembling, Executing)
                | (Assembling, Failed)
                | (Executing, Reported { .. })
                | (Failed, Reported { success: false })
                | (Reported { .. }, Idle)
        )
    }
}

/// Counters describing what the host has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub cycles_started: u64,
    pub assemblies: u64,
    pub executions: u64,
    pub reports: u64,
    pub dropped_reports: u64,
}

/// A detected change waiting to be assembled and executed.
#[derive(Debug)]
pub struct PendingCycle {
    id: CycleId,
    text: String,
    state: CycleState,
}

impl PendingCycle {
    pub fn id(&self) -> CycleId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    fn advance(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "cycle {}: illegal transition {:?} -> {:?}",
            self.id,
            self.state,
            next
        );
        trace!("Cycle {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Source surface, change detector, assembler, sandbox and output sink wired together.
pub struct LiveHost<S, A, X, O> {
    source: S,
    detector: RefCell<ChangeDetector>,
    assembler: AssemblerAdapter<A>,
    execution: ExecutionHost<X>,
    sink: O,
    policy: ReportPolicy,
    next_cycle: Cell<u64>,
    last_reported: Cell<Option<CycleId>>,
    stats: Cell<HostStats>,
}

impl<S, A, X, O> LiveHost<S, A, X, O>
where
    S: SourceSurface,
    A: Assembler,
    X: Sandbox,
    O: OutputSink,
{
    pub fn new(source: S, assembler: A, sandbox: X, sink: O, config: &HostConfig) -> Self {
        Self {
            source,
            detector: RefCell::new(ChangeDetector::new()),
            assembler: AssemblerAdapter::new(
                assembler,
                config.module_name.clone(),
                config.parse_options(),
            ),
            execution: ExecutionHost::new(sandbox),
            sink,
            policy: config.report_policy,
            next_cycle: Cell::new(0),
            last_reported: Cell::new(None),
            stats: Cell::new(HostStats::default()),
        }
    }

    /// Read the surface and start a cycle if the text changed.
    pub fn detect(&self) -> Option<PendingCycle> {
        let text = self.source.read()?;
        if !self.detector.borrow_mut().should_process(&text) {
            return None;
        }

        let id = CycleId(self.next_cycle.get());
        self.next_cycle.set(id.0 + 1);
        self.update_stats(|stats| stats.cycles_started += 1);
        debug!("Cycle {id}: source changed ({} bytes)", text.len());

        let mut cycle = PendingCycle {
            id,
            text,
            state: CycleState::Detecting,
        };
        cycle.advance(CycleState::Assembling);
        Some(cycle)
    }

    /// Assemble, execute and report a detected change.
    pub async fn run_cycle(&self, mut cycle: PendingCycle) -> Outcome {
        self.update_stats(|stats| stats.assemblies += 1);
        let outcome = match self.assembler.assemble(&cycle.text) {
            Ok(module) => {
                cycle.advance(CycleState::Executing);
                self.update_stats(|stats| stats.executions += 1);
                self.execution.run(module).await
            }
            Err(error) => {
                cycle.advance(CycleState::Failed);
                Err(error)
            }
        };

        cycle.advance(CycleState::Reported {
            success: outcome.is_ok(),
        });
        self.report(cycle.id, &outcome);
        cycle.advance(CycleState::Idle);
        outcome
    }

    fn report(&self, id: CycleId, outcome: &Outcome) {
        let newest = self.last_reported.get();
        if self.policy == ReportPolicy::LatestStarted && newest.is_some_and(|newest| newest > id) {
            self.update_stats(|stats| stats.dropped_reports += 1);
            debug!("Cycle {id}: dropping stale report");
            return;
        }

        match outcome {
            Ok(value) => info!("Cycle {id}: main returned {value}"),
            Err(error) => warn!("Cycle {id}: {error}"),
        }
        self.sink.report(id, outcome);
        self.last_reported.set(Some(newest.map_or(id, |newest| newest.max(id))));
        self.update_stats(|stats| stats.reports += 1);
    }

    fn update_stats(&self, update: impl FnOnce(&mut HostStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    pub fn stats(&self) -> HostStats {
        self.stats.get()
    }

    pub fn last_processed(&self) -> String {
        self.detector.borrow().last_processed().to_owned()
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Something the [`FrameScheduler`](crate::scheduler::FrameScheduler) can tick.
pub trait Watch {
    /// Synchronous detection; a detected change comes back as a task to spawn.
    fn tick(self: Rc<Self>) -> Option<LocalBoxFuture<'static, ()>>;
}

impl<S, A, X, O> Watch for LiveHost<S, A, X, O>
where
    S: SourceSurface + 'static,
    A: Assembler + 'static,
    X: Sandbox + 'static,
    O: OutputSink + 'static,
{
    fn tick(self: Rc<Self>) -> Option<LocalBoxFuture<'static, ()>> {
        let cycle = self.detect()?;
        Some(
            async move {
                self.run_cycle(cycle).await;
            }
            .boxed_local(),
        )
    }
}
