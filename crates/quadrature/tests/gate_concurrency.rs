//! Concurrency properties of the execution gates.
//!
//! Each workload invocation brackets itself with an instrumented gauge:
//! the first progress event increments it, the completion event decrements
//! it, and the peak observed value is recorded. Both events fire inside the
//! workload, so the gauge tracks how many computations were genuinely
//! in-flight at once.

use quadrature::{
    integrate, run_bounded, EventSink, ExclusiveGate, Interval, TokenPool, WorkloadEvent,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Sink that maintains an in-flight gauge and its high-water mark.
struct GaugeSink {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeSink {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl EventSink for GaugeSink {
    fn emit(&self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Progress { percent, .. } if percent == 0.0 => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                // Widen the in-workload window so overlap is observable.
                thread::sleep(Duration::from_millis(5));
            }
            WorkloadEvent::Completed(_) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            WorkloadEvent::Progress { .. } => {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

const INTERVAL: Interval = Interval {
    lo: 0.0,
    hi: 1.0,
    step: 1e-5,
};

#[test]
fn unrestricted_workers_overlap() {
    let gauge = GaugeSink::new();

    thread::scope(|s| {
        for worker in 0..4 {
            let gauge = &gauge;
            s.spawn(move || {
                integrate(INTERVAL, worker, gauge);
            });
        }
    });

    // Not a guarantee of the scheduler, but with 100k iterations per worker
    // a total absence of overlap would indicate accidental serialization.
    assert!(
        gauge.peak() > 1,
        "four unrestricted workers never overlapped"
    );
}

#[test]
fn exclusive_gate_admits_one_at_a_time() {
    let gate = ExclusiveGate::new();
    let gauge = GaugeSink::new();
    let completed = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..4 {
            let (gate, gauge, completed) = (&gate, &gauge, &completed);
            s.spawn(move || {
                gate.run(INTERVAL, worker, gauge);
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    assert_eq!(gauge.peak(), 1, "exclusive gate admitted concurrent workers");
    assert_eq!(completed.load(Ordering::SeqCst), 4);
}

#[test]
fn token_pool_admits_at_most_capacity() {
    let pool = TokenPool::new(2).unwrap();
    let gauge = GaugeSink::new();
    let completed = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..6 {
            let (pool, gauge, completed) = (&pool, &gauge, &completed);
            s.spawn(move || {
                run_bounded(pool, INTERVAL, worker, gauge).unwrap();
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    assert!(
        gauge.peak() <= 2,
        "pool of 2 admitted {} concurrent workers",
        gauge.peak()
    );
    assert_eq!(completed.load(Ordering::SeqCst), 6);
    assert_eq!(pool.available(), 2, "all tokens must come back");
}
