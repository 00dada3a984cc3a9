//! src/gate.rs
//!
//! Execution gates for the integral workload.
//!
//! Three disciplines are supported:
//! - unrestricted: call [`crate::integrate`] directly, no gate involved;
//! - exclusive: [`ExclusiveGate`] admits one execution at a time;
//! - bounded: [`TokenPool`] admits up to `capacity` executions at a time.
//!
//! Gates are explicit values shared by handle (`Arc` or scoped borrow).
//! Process-wide exclusion is obtained by sharing one gate across callers;
//! independent gates do not serialize against each other. Waiters block on
//! a condition variable rather than spinning, and every acquisition is
//! released through `Drop` so errors and panics inside the workload cannot
//! leak a slot.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Result};
use thiserror::Error;
use tracing::debug;

use crate::integral::{integrate, EventSink, IntegralOutcome, Interval};

/// Failure modes of token acquisition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// The pool was closed while this caller was waiting. Surfaced as a
    /// cancellation so callers can tell it apart from real failures.
    #[error("cancelled: token pool closed while waiting for a slot")]
    Cancelled,
    /// No token became available within the allotted wait.
    #[error("no token became available within {0:?}")]
    Timeout(Duration),
}

/// One-at-a-time gate around the workload.
///
/// Only mutual exclusion is guaranteed; blocked callers are not served in
/// arrival order. The mutex protects no data, so a poisoned guard (a
/// previous holder panicked) is recovered rather than propagated.
#[derive(Debug, Default)]
pub struct ExclusiveGate {
    lock: Mutex<()>,
}

impl ExclusiveGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the workload while holding the gate. The guard is released on
    /// every exit path, including unwinding out of the workload.
    pub fn run(&self, interval: Interval, worker: usize, sink: &dyn EventSink) -> IntegralOutcome {
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(worker, "exclusive gate acquired");
        integrate(interval, worker, sink)
    }
}

/// Fixed-capacity permit pool.
///
/// `acquire` suspends the caller until a slot frees up. Construct once at
/// startup and pass by handle to every caller; there is no lazy global
/// instance to race on.
#[derive(Debug)]
pub struct TokenPool {
    state: Mutex<PoolState>,
    freed: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct PoolState {
    available: usize,
    closed: bool,
}

/// An admission slot held by one caller. Returning the slot happens in
/// `Drop`, unconditionally.
#[derive(Debug)]
pub struct Token<'pool> {
    pool: &'pool TokenPool,
}

impl Drop for Token<'_> {
    fn drop(&mut self) {
        let mut state = self
            .pool
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.available += 1;
        self.pool.freed.notify_one();
    }
}

impl TokenPool {
    /// Creates a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(anyhow!(
                "Cannot create TokenPool with 0 slots. \
                Use capacity >= 1, or skip the pool for unrestricted execution."
            ));
        }
        Ok(Self {
            state: Mutex::new(PoolState {
                available: capacity,
                closed: false,
            }),
            freed: Condvar::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free. Racy by nature; useful for tests and
    /// diagnostics only.
    pub fn available(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .available
    }

    /// Blocks until a slot is free or the pool is closed.
    pub fn acquire(&self) -> Result<Token<'_>, GateError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.closed {
                return Err(GateError::Cancelled);
            }
            if state.available > 0 {
                state.available -= 1;
                return Ok(Token { pool: self });
            }
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant; `None` when every slot is taken.
    pub fn try_acquire(&self) -> Option<Token<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed || state.available == 0 {
            return None;
        }
        state.available -= 1;
        Some(Token { pool: self })
    }

    /// Blocks until a slot is free, the pool closes, or `timeout` passes.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Token<'_>, GateError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.closed {
                return Err(GateError::Cancelled);
            }
            if state.available > 0 {
                state.available -= 1;
                return Ok(Token { pool: self });
            }
            let remaining = deadline
                .checked_duration_since(std::time::Instant::now())
                .ok_or(GateError::Timeout(timeout))?;
            let (guard, wait) = self
                .freed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if wait.timed_out() && state.available == 0 {
                return Err(GateError::Timeout(timeout));
            }
        }
    }

    /// Closes the pool. Current waiters wake up with
    /// [`GateError::Cancelled`]; tokens already handed out stay valid until
    /// dropped.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.freed.notify_all();
    }
}

/// Runs the workload under a pool slot: acquire, compute, release on drop.
pub fn run_bounded(
    pool: &TokenPool,
    interval: Interval,
    worker: usize,
    sink: &dyn EventSink,
) -> Result<IntegralOutcome, GateError> {
    let _token = pool.acquire()?;
    debug!(worker, "token acquired");
    Ok(integrate(interval, worker, sink))
}
