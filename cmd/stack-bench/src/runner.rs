//! Timed insert/pop phases and their CSV output.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use bytestack_core::constants::TRANSFER_SIZE;
use bytestack_core::kwarn;

use crate::backend::{BenchError, StackBackend};
use crate::config::BenchConfig;

pub const CSV_HEADER: &str = "Data Written,Bytes Written,Elapsed Time (microseconds),Outcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Insert,
    Pop,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Insert => "insert",
            Phase::Pop => "pop",
        }
    }
}

/// Aggregate of one phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseSummary {
    pub calls: usize,
    pub ok: usize,
    /// Failure outcome name -> count
    pub failures: BTreeMap<&'static str, usize>,
    pub total_us: f64,
    pub min_us: f64,
    pub max_us: f64,
}

impl PhaseSummary {
    fn record(&mut self, elapsed_us: f64, outcome: Result<(), &'static str>) {
        if self.calls == 0 {
            self.min_us = elapsed_us;
            self.max_us = elapsed_us;
        } else {
            self.min_us = self.min_us.min(elapsed_us);
            self.max_us = self.max_us.max(elapsed_us);
        }
        self.calls += 1;
        self.total_us += elapsed_us;
        match outcome {
            Ok(()) => self.ok += 1,
            Err(name) => *self.failures.entry(name).or_default() += 1,
        }
    }

    pub fn mean_us(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_us / self.calls as f64
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }
}

/// Run `config.iterations` timed calls of `phase`, writing one CSV row each.
///
/// Stack failures are recorded and the phase continues, unless
/// `stop_on_error` is set. CSV write errors always abort.
pub fn run_phase(
    backend: &mut dyn StackBackend,
    phase: Phase,
    config: &BenchConfig,
    csv_path: &Path,
) -> Result<PhaseSummary, BenchError> {
    let mut csv = BufWriter::new(File::create(csv_path)?);
    writeln!(csv, "{}", CSV_HEADER)?;

    let mut summary = PhaseSummary::default();

    for i in 1..=config.iterations {
        let start = Instant::now();
        let result = match phase {
            Phase::Insert => backend.push(config.value),
            Phase::Pop => backend.pop().map(|_| ()),
        };
        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;

        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.outcome());
        let label = match outcome {
            Ok(()) => "ok",
            Err(name) => name,
        };
        writeln!(csv, "{},{},{:.6},{}", i, TRANSFER_SIZE, elapsed_us, label)?;
        summary.record(elapsed_us, outcome);

        if let Err(e) = result {
            if config.stop_on_error || !matches!(e, BenchError::Stack(_)) {
                csv.flush()?;
                return Err(e);
            }
            if summary.failed() == 1 {
                kwarn!("{} #{}: {} (recording and continuing)", phase.name(), i, e);
            }
        }

        if !config.pause.is_zero() {
            std::thread::sleep(config.pause);
        }
    }

    csv.flush()?;
    Ok(summary)
}

pub fn print_summary(phase: Phase, summary: &PhaseSummary, csv_path: &Path) {
    println!("Phase: {}", phase.name());
    println!("{}", "─".repeat(40));
    println!("  Calls:       {}", summary.calls);
    println!("  Ok:          {}", summary.ok);
    for (name, count) in &summary.failures {
        println!("  {:<12} {}", format!("{}:", name), count);
    }
    println!("  Mean:        {:.3} us", summary.mean_us());
    println!("  Min / Max:   {:.3} / {:.3} us", summary.min_us, summary.max_us);
    println!("  CSV:         {}\n", csv_path.display());
}
