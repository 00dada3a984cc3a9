//! Definite-integral workload with progress events and gated execution.
//!
//! [`integrate`] is the CPU-bound unit of work; [`gate`] wraps it in the
//! admission disciplines the demo exercises (exclusive and bounded). Run it
//! directly for unrestricted parallelism.

pub mod gate;
pub mod integral;

pub use gate::{run_bounded, ExclusiveGate, GateError, Token, TokenPool};
pub use integral::{integrate, DiscardEvents, EventSink, IntegralOutcome, Interval, WorkloadEvent};
