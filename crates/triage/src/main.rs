//! Demo orchestration: runs the integral workload under each execution
//! gate, then drives a writer and a reader concurrently against one
//! handoff buffer and queries the persisted snapshot.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use quadrature::{
    integrate, run_bounded, EventSink, ExclusiveGate, Interval, TokenPool, WorkloadEvent,
};
use ward::{admit_roster, count_matching, HandoffBuffer, HandoffConfig, Patient, ProgressSink};

/// Step width for the demo integrations; ~1M iterations per run.
const DEMO_STEP: f64 = 1e-6;
const SNAPSHOT_PATH: &str = "patients.json";
const ROSTER_SIZE: usize = 1000;
const ROSTER_SEED: u64 = 42;

/// Prints workload events and handoff progress lines as they arrive.
struct Console;

impl EventSink for Console {
    fn emit(&self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Progress { percent, worker } => {
                println!("worker {worker}: progress {percent:.2}%");
            }
            WorkloadEvent::Completed(outcome) => {
                println!(
                    "worker {}: finished with sum {:.6} in {:?}",
                    outcome.worker, outcome.sum, outcome.elapsed
                );
            }
        }
    }
}

impl ProgressSink for Console {
    fn report(&self, message: &str) {
        println!("# {message}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== single worker ===");
    single_worker();

    println!("\n=== two unrestricted workers ===");
    unrestricted_pair();

    println!("\n=== five workers, exclusive gate ===");
    exclusive_five();

    println!("\n=== five workers, token pool of 2 ===");
    bounded_five()?;

    println!("\n=== buffer handoff and snapshot statistics ===");
    handoff_run()?;

    Ok(())
}

fn single_worker() {
    let outcome = integrate(Interval::unit(DEMO_STEP), 1, &Console);
    info!(sum = outcome.sum, "single worker done");
}

fn unrestricted_pair() {
    thread::scope(|s| {
        for worker in [2, 3] {
            s.spawn(move || integrate(Interval::unit(DEMO_STEP), worker, &Console));
        }
    });
}

fn exclusive_five() {
    let gate = ExclusiveGate::new();

    thread::scope(|s| {
        for worker in 1..=5 {
            let gate = &gate;
            s.spawn(move || {
                println!("worker {worker}: waiting for the exclusive gate");
                gate.run(Interval::unit(DEMO_STEP), worker, &Console);
            });
            // Staggered starts make the serialization visible.
            thread::sleep(Duration::from_millis(10));
        }
    });
}

fn bounded_five() -> Result<()> {
    let pool = TokenPool::new(2)?;

    thread::scope(|s| {
        for worker in 1..=5 {
            let pool = &pool;
            s.spawn(move || {
                println!("worker {worker}: waiting for a token");
                if let Err(e) = run_bounded(pool, Interval::unit(DEMO_STEP), worker, &Console) {
                    eprintln!("worker {worker}: {e}");
                }
            });
            thread::sleep(Duration::from_millis(50));
        }
    });

    Ok(())
}

fn handoff_run() -> Result<()> {
    let roster = admit_roster(ROSTER_SIZE, ROSTER_SEED);
    let buffer = HandoffBuffer::new();
    let config = HandoffConfig::default();
    let path = Path::new(SNAPSHOT_PATH);

    thread::scope(|s| -> Result<()> {
        let (buffer, config, roster) = (&buffer, &config, &roster);

        let writer = thread::Builder::new()
            .name("ward-writer".into())
            .spawn_scoped(s, move || buffer.write_records(roster, config, &Console))
            .context("Failed to spawn writer thread")?;

        // Give the writer a head start so the reader polls while chunks
        // are still landing.
        thread::sleep(Duration::from_millis(200));

        let reader = thread::Builder::new()
            .name("ward-reader".into())
            .spawn_scoped(s, move || buffer.copy_to_file(path, config, &Console))
            .context("Failed to spawn reader thread")?;

        writer
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))?
            .context("Buffer write failed")?;
        reader
            .join()
            .map_err(|_| anyhow::anyhow!("reader thread panicked"))?
            .context("Snapshot copy failed")?;
        Ok(())
    })?;

    let size = std::fs::metadata(path)
        .with_context(|| format!("Missing snapshot at {}", path.display()))?
        .len();
    println!("snapshot {} holds {size} bytes", path.display());

    for diagnosis in ["Pneumonia", "Flu", "Hypertension"] {
        let count = count_matching::<Patient, _>(path, |p| p.diagnosis == diagnosis);
        println!("{count} patients admitted with {diagnosis}");
    }

    Ok(())
}
