//! src/integral.rs
//!
//! The numeric workload: a definite integral of `sin(x)` accumulated over a
//! fixed interval, reporting progress at every decile of the iteration
//! count.
//!
//! The routine is pure and single-threaded per invocation; all concurrency
//! lives in the gates of [`crate::gate`]. Observers receive typed events
//! through an [`EventSink`] passed per call, so there is no shared
//! subscriber state to protect.

use std::time::{Duration, Instant};

/// Integration bounds and step width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Lower bound of the integration range.
    pub lo: f64,
    /// Upper bound of the integration range.
    pub hi: f64,
    /// Step width. Smaller steps mean more iterations and more CPU time.
    pub step: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64, step: f64) -> Self {
        Self { lo, hi, step }
    }

    /// The `[0, 1]` interval used by the demo scenarios.
    pub fn unit(step: f64) -> Self {
        Self::new(0.0, 1.0, step)
    }

    /// Number of accumulation steps, clamped to a minimum of 10 so the
    /// decile boundary below never divides by zero.
    pub fn iterations(&self) -> usize {
        let n = ((self.hi - self.lo) / self.step) as usize;
        n.max(10)
    }
}

/// Final product of one workload invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegralOutcome {
    /// Accumulated integral value.
    pub sum: f64,
    /// Wall-clock time spent inside the accumulation loop.
    pub elapsed: Duration,
    /// Identifier of the logical worker that ran the computation.
    pub worker: usize,
}

/// Notifications emitted while a workload runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkloadEvent {
    /// Reached another decile of the iteration count. `percent` is in
    /// `[0, 100)` and non-decreasing within one invocation.
    Progress { percent: f64, worker: usize },
    /// The accumulation loop finished. Emitted exactly once per invocation.
    Completed(IntegralOutcome),
}

/// Receiver for [`WorkloadEvent`]s, injected per invocation.
///
/// Sinks must tolerate delivery from whichever thread runs the workload.
/// A sink that drops events (disconnected channel, full console) must not
/// fail the computation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: WorkloadEvent);
}

/// Channel-backed sink; send failures are ignored because events are
/// observational only.
impl EventSink for crossbeam_channel::Sender<WorkloadEvent> {
    fn emit(&self, event: WorkloadEvent) {
        let _ = self.send(event);
    }
}

/// Sink for callers that do not care about notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn emit(&self, _event: WorkloadEvent) {}
}

/// Accumulates `sin(x) * step` over `interval`, emitting a progress event
/// at every decile boundary and exactly one completion event at the end.
///
/// The completion event and the return value carry the same
/// [`IntegralOutcome`]; the return value is the authoritative delivery,
/// events exist for observers.
pub fn integrate(interval: Interval, worker: usize, sink: &dyn EventSink) -> IntegralOutcome {
    let started = Instant::now();
    let iterations = interval.iterations();
    let decile = iterations / 10;

    let mut sum = 0.0;
    for i in 0..iterations {
        let x = interval.lo + i as f64 * interval.step;
        sum += x.sin() * interval.step;

        if i % decile == 0 {
            sink.emit(WorkloadEvent::Progress {
                percent: i as f64 / iterations as f64 * 100.0,
                worker,
            });
        }
    }

    let outcome = IntegralOutcome {
        sum,
        elapsed: started.elapsed(),
        worker,
    };
    sink.emit(WorkloadEvent::Completed(outcome));
    outcome
}
