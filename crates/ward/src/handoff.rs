//! src/handoff.rs
//!
//! Single-writer / single-reader byte buffer for passing a serialized
//! payload between two concurrent actors.
//!
//! The writer serializes a record collection and appends it to the shared
//! buffer in small chunks, holding a `writing` flag for the whole
//! operation. The reader polls that flag at a fixed interval and consumes
//! the buffer only once the flag is clear, so it never observes a
//! partially-written payload. The wait is level-triggered: a reader that
//! arrives after the write finished returns immediately.
//!
//! A second writer arriving while the flag is set is rejected outright;
//! this is a handoff, not a queue.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Failure modes of the handoff buffer.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// A write was attempted while another write held the buffer.
    /// Fatal to this call only; the caller may retry once the first write
    /// completes.
    #[error("another write is already in progress")]
    WriteInProgress,
    /// The payload could not be serialized. The buffer is left idle.
    #[error("payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The buffer was still being written when the reader's deadline
    /// passed.
    #[error("buffer still being written after {0:?}")]
    ReadTimeout(Duration),
}

/// Timing knobs for the handoff. Defaults match the demo cadence; tests
/// shrink the delays to keep runs fast.
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    /// Number of chunks the serialized payload is split into.
    pub chunk_count: usize,
    /// Pause between chunk appends, making the interleaving observable.
    pub chunk_delay: Duration,
    /// How often the reader re-checks the `writing` flag.
    pub poll_interval: Duration,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            chunk_count: 30,
            chunk_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl HandoffConfig {
    /// Near-zero delays for tests.
    pub fn immediate() -> Self {
        Self {
            chunk_count: 30,
            chunk_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Receiver for free-text progress strings, injected per call. Reports are
/// observational; a sink that discards them must not affect the transfer.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

impl ProgressSink for crossbeam_channel::Sender<String> {
    fn report(&self, message: &str) {
        let _ = self.send(message.to_owned());
    }
}

/// Sink for callers that do not care about progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardProgress;

impl ProgressSink for DiscardProgress {
    fn report(&self, _message: &str) {}
}

#[derive(Debug, Default)]
struct BufferState {
    bytes: Vec<u8>,
    writing: bool,
}

/// The shared buffer. Flag and bytes are only touched under one guard.
#[derive(Debug, Default)]
pub struct HandoffBuffer {
    state: Mutex<BufferState>,
}

/// Clears the `writing` flag when dropped, so every exit path of a write
/// (success, serialization failure, panic) leaves the buffer idle.
struct WritingReset<'a> {
    buffer: &'a HandoffBuffer,
}

impl Drop for WritingReset<'_> {
    fn drop(&mut self) {
        let mut state = self.buffer.lock_state();
        state.writing = false;
    }
}

impl HandoffBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a write currently holds the buffer. Racy; diagnostics only.
    pub fn is_writing(&self) -> bool {
        self.lock_state().writing
    }

    /// Bytes currently in the buffer. Racy; diagnostics only.
    pub fn len(&self) -> usize {
        self.lock_state().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes `records` to pretty JSON and writes it into the buffer in
    /// `config.chunk_count` chunks with `config.chunk_delay` between them.
    /// Returns the total byte length written.
    ///
    /// Fails fast with [`HandoffError::WriteInProgress`] if another write
    /// holds the buffer.
    pub fn write_records<T: Serialize>(
        &self,
        records: &[T],
        config: &HandoffConfig,
        progress: &dyn ProgressSink,
    ) -> Result<usize, HandoffError> {
        {
            let mut state = self.lock_state();
            if state.writing {
                return Err(HandoffError::WriteInProgress);
            }
            state.writing = true;
        }
        let _reset = WritingReset { buffer: self };

        progress.report(&format!("{}: starting buffer write", actor()));
        let payload = serde_json::to_vec_pretty(records)?;

        self.lock_state().bytes.clear();

        let chunk_size = (payload.len() / config.chunk_count.max(1)).max(1);
        let mut written = 0;
        for (index, chunk) in payload.chunks(chunk_size).enumerate() {
            self.lock_state().bytes.extend_from_slice(chunk);
            written += chunk.len();

            if !config.chunk_delay.is_zero() {
                thread::sleep(config.chunk_delay);
            }
            if index % 10 == 0 {
                progress.report(&format!(
                    "{}: write {}% complete",
                    actor(),
                    written * 100 / payload.len()
                ));
            }
        }

        debug!(bytes = payload.len(), "buffer write finished");
        progress.report(&format!("{}: buffer write complete", actor()));
        Ok(payload.len())
    }

    /// Blocks until no write is in progress, then returns the full buffer
    /// contents. Never times out; see [`Self::read_when_ready_timeout`] for
    /// a bounded wait.
    pub fn read_when_ready(&self, config: &HandoffConfig, progress: &dyn ProgressSink) -> Vec<u8> {
        progress.report(&format!("{}: waiting for buffer", actor()));
        loop {
            let ready = {
                let state = self.lock_state();
                (!state.writing).then(|| state.bytes.clone())
            };
            if let Some(bytes) = ready {
                progress.report(&format!("{}: buffer read complete", actor()));
                return bytes;
            }
            thread::sleep(config.poll_interval);
        }
    }

    /// Like [`Self::read_when_ready`], but gives up once `timeout` passes
    /// while the writer still holds the buffer.
    pub fn read_when_ready_timeout(
        &self,
        config: &HandoffConfig,
        timeout: Duration,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<u8>, HandoffError> {
        let deadline = Instant::now() + timeout;
        progress.report(&format!("{}: waiting for buffer", actor()));
        loop {
            let ready = {
                let state = self.lock_state();
                (!state.writing).then(|| state.bytes.clone())
            };
            if let Some(bytes) = ready {
                progress.report(&format!("{}: buffer read complete", actor()));
                return Ok(bytes);
            }
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(HandoffError::ReadTimeout(timeout))?;
            thread::sleep(remaining.min(config.poll_interval));
        }
    }

    /// Waits for readiness, then overwrites `path` with the buffer
    /// contents. Returns the number of bytes written to the file.
    pub fn copy_to_file(
        &self,
        path: &Path,
        config: &HandoffConfig,
        progress: &dyn ProgressSink,
    ) -> anyhow::Result<u64> {
        let bytes = self.read_when_ready(config, progress);
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        progress.report(&format!(
            "{}: copied {} bytes to {}",
            actor(),
            bytes.len(),
            path.display()
        ));
        Ok(bytes.len() as u64)
    }
}

/// Tag for progress strings: the current thread's name, or its id when
/// unnamed.
fn actor() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", current.id()),
    }
}
