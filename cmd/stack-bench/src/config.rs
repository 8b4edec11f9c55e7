//! Benchmark configuration
//!
//! Environment variables (all optional):
//! - `BSTACK_BENCH_ITERATIONS` - calls per phase (256)
//! - `BSTACK_BENCH_PAUSE_US` - sleep between calls in microseconds (200)
//! - `BSTACK_BENCH_VALUE` - byte pushed on every insert (1)
//! - `BSTACK_BENCH_OUT_DIR` - directory for CSV files (.)
//! - `BSTACK_BENCH_LABEL` - suffix for CSV names, `insert_<label>.csv` (rust)
//! - `BSTACK_BENCH_CPU` - CPU to pin to, negative disables pinning (0)
//! - `BSTACK_BENCH_STOP_ON_ERROR` - abort a phase on the first failure (0)
//! - `BSTACK_DEVICE_PATH` - drive this device node via ioctl instead of an
//!   in-process device

use std::path::PathBuf;
use std::time::Duration;

use bytestack_core::env::{env_get, env_get_bool, env_get_opt, env_get_str};

pub mod defaults {
    pub const ITERATIONS: usize = 256;
    pub const PAUSE_US: u64 = 200;
    pub const VALUE: u8 = 1;
    pub const OUT_DIR: &str = ".";
    pub const LABEL: &str = "rust";
    pub const CPU: i64 = 0;
    pub const STOP_ON_ERROR: bool = false;
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub iterations: usize,
    pub pause: Duration,
    pub value: u8,
    pub out_dir: PathBuf,
    pub label: String,
    /// `None` = leave affinity alone
    pub cpu: Option<usize>,
    pub stop_on_error: bool,
    /// `None` = in-process device
    pub device_path: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: defaults::ITERATIONS,
            pause: Duration::from_micros(defaults::PAUSE_US),
            value: defaults::VALUE,
            out_dir: PathBuf::from(defaults::OUT_DIR),
            label: defaults::LABEL.to_string(),
            cpu: usize::try_from(defaults::CPU).ok(),
            stop_on_error: defaults::STOP_ON_ERROR,
            device_path: None,
        }
    }
}

impl BenchConfig {
    pub fn from_env() -> Self {
        Self {
            iterations: env_get("BSTACK_BENCH_ITERATIONS", defaults::ITERATIONS),
            pause: Duration::from_micros(env_get("BSTACK_BENCH_PAUSE_US", defaults::PAUSE_US)),
            value: env_get("BSTACK_BENCH_VALUE", defaults::VALUE),
            out_dir: PathBuf::from(env_get_str("BSTACK_BENCH_OUT_DIR", defaults::OUT_DIR)),
            label: env_get_str("BSTACK_BENCH_LABEL", defaults::LABEL),
            cpu: usize::try_from(env_get("BSTACK_BENCH_CPU", defaults::CPU)).ok(),
            stop_on_error: env_get_bool("BSTACK_BENCH_STOP_ON_ERROR", defaults::STOP_ON_ERROR),
            device_path: env_get_opt::<String>("BSTACK_DEVICE_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn pause(mut self, d: Duration) -> Self {
        self.pause = d;
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn cpu(mut self, cpu: Option<usize>) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn insert_csv(&self) -> PathBuf {
        self.out_dir.join(format!("insert_{}.csv", self.label))
    }

    pub fn pop_csv(&self) -> PathBuf {
        self.out_dir.join(format!("pop_{}.csv", self.label))
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.iterations == 0 {
            return Err("iterations must be at least 1");
        }
        if self.label.is_empty() {
            return Err("label must not be empty");
        }
        if self.label.contains('/') {
            return Err("label must not contain '/'");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.iterations, 256);
        assert_eq!(config.pause, Duration::from_micros(200));
        assert_eq!(config.cpu, Some(0));
        assert!(config.device_path.is_none());
        assert_eq!(config.insert_csv(), PathBuf::from("./insert_rust.csv"));
        assert_eq!(config.pop_csv(), PathBuf::from("./pop_rust.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(BenchConfig::default().iterations(0).validate().is_err());
        assert!(BenchConfig::default().label("").validate().is_err());
        assert!(BenchConfig::default().label("a/b").validate().is_err());
    }

    #[test]
    fn test_from_env_negative_cpu_disables_pinning() {
        std::env::set_var("BSTACK_BENCH_CPU", "-1");
        std::env::set_var("BSTACK_BENCH_LABEL", "c");
        let config = BenchConfig::from_env();
        std::env::remove_var("BSTACK_BENCH_CPU");
        std::env::remove_var("BSTACK_BENCH_LABEL");
        assert_eq!(config.cpu, None);
        assert_eq!(config.label, "c");
    }
}
