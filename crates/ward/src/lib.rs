//! Patient records, single-writer buffer handoff, and snapshot statistics.
//!
//! [`handoff::HandoffBuffer`] moves a serialized roster between a writer
//! and a reader running concurrently; [`snapshot::count_matching`] answers
//! predicate queries over the persisted result.

pub mod handoff;
pub mod patient;
pub mod snapshot;

pub use handoff::{DiscardProgress, HandoffBuffer, HandoffConfig, HandoffError, ProgressSink};
pub use patient::{admit_roster, Patient, DIAGNOSES};
pub use snapshot::count_matching;
