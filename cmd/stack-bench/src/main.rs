//! Timing client for the stack device
//!
//! Pushes `BSTACK_BENCH_ITERATIONS` bytes, then pops as many, timing every
//! call and writing `insert_<label>.csv` / `pop_<label>.csv`.
//!
//! Run: ./target/release/stack-bench
//!      BSTACK_DEVICE_PATH=/dev/stack_module_rust ./target/release/stack-bench
//! (a device node needs the kernel module loaded and usually sudo)

mod backend;
mod config;
mod runner;

use bytestack_core::{kerror, kinfo, kprint};
use bytestack_device::{DeviceConfig, StackDevice};
use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use backend::{BenchError, DevNode, InProcess, StackBackend};
use config::BenchConfig;
use runner::{print_summary, run_phase, Phase};

fn main() {
    kprint::init();

    let config = BenchConfig::from_env();
    if let Err(e) = run(&config) {
        kerror!("stack-bench: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(config: &BenchConfig) -> Result<(), BenchError> {
    config.validate().map_err(BenchError::Config)?;

    if let Some(cpu) = config.cpu {
        pin_to_cpu(cpu)?;
    }

    match &config.device_path {
        Some(path) => {
            let mut node = DevNode::open(path)?;
            println!("Device file opened successfully.");
            bench(&mut node, config)?;
            println!("Device file closed successfully.");
        }
        None => {
            let device_config = DeviceConfig::from_env();
            device_config.validate().map_err(BenchError::Config)?;
            let device: StackDevice = StackDevice::register(device_config.options());
            let mut local = InProcess::new(device.open());
            bench(&mut local, config)?;
        }
    }
    Ok(())
}

fn bench(backend: &mut dyn StackBackend, config: &BenchConfig) -> Result<(), BenchError> {
    println!("=== stack-bench: {} ===\n", backend.describe());
    println!(
        "  {} calls per phase, {:?} pause, CPU {}\n",
        config.iterations,
        config.pause,
        config.cpu.map_or_else(|| "unpinned".to_string(), |c| c.to_string())
    );

    for (phase, path) in [
        (Phase::Insert, config.insert_csv()),
        (Phase::Pop, config.pop_csv()),
    ] {
        let summary = run_phase(backend, phase, config, &path)?;
        print_summary(phase, &summary, &path);
    }

    println!("=== stack-bench complete ===");
    Ok(())
}

fn pin_to_cpu(cpu: usize) -> Result<(), BenchError> {
    let mut set = CpuSet::new();
    set.set(cpu)?;
    sched_setaffinity(Pid::from_raw(0), &set)?;
    kinfo!("pinned to CPU {}", cpu);
    Ok(())
}
