//! Byte Stack End-to-End Smoke Test
//!
//! Tests the full device path:
//!   Part A: Registration and sessions
//!   Part B: Push/pop through the raw ioctl codes
//!   Part C: Failure codes: state unchanged, errno mapping
//!   Part D: Concurrent clients on one device
//!   Part E: Device node (only when BSTACK_DEVICE_PATH is set)
//!
//! Run: ./target/release/stack-smoke
//!      sudo BSTACK_DEVICE_PATH=/dev/stack_module_rust ./target/release/stack-smoke

use bytestack_core::constants::STACK_CAPACITY;
use bytestack_core::{env_get_opt, kprint, StackError};
use bytestack_device::uapi::{self, INSERT_VALUE, POP_VALUE};
use bytestack_device::{DeviceConfig, DeviceOptions, StackCommand, StackDevice};

use std::collections::HashSet;
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::thread;

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn skip(&self, name: &str, reason: &str) {
        println!("  [--] {:<52} SKIP: {}", name, reason);
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

fn opts(name: &str) -> DeviceOptions {
    DeviceOptions { name: name.to_string() }
}

// ════════════════════════════════════════════════════════════
// Part A: Registration and sessions
// ════════════════════════════════════════════════════════════

fn test_registration(t: &mut TestRunner) {
    t.section("Part A: Registration and sessions");

    let config = DeviceConfig::from_env();
    match config.validate() {
        Ok(()) => t.pass("device config from env is valid"),
        Err(e) => t.fail("device config from env is valid", e),
    }

    let device: StackDevice = StackDevice::register(config.options());
    t.check(
        "registered with empty stack",
        device.is_empty() && device.len() == 0,
        &format!("len={}", device.len()),
    );
    t.check(
        "default capacity is 127",
        device.capacity() == STACK_CAPACITY,
        &format!("capacity={}", device.capacity()),
    );

    let first = device.open();
    let _ = first.push(1);
    let _ = first.push(2);
    drop(first);
    t.check(
        "stack survives session release",
        device.snapshot() == [1, 2],
        &format!("{:?}", device.snapshot()),
    );

    let second = device.open();
    t.check("open resets the stack", device.is_empty(), &format!("len={}", device.len()));
    t.check(
        "session ids increase",
        second.id() == 2 && device.stats().sessions == 2,
        &format!("id={} sessions={}", second.id(), device.stats().sessions),
    );
    drop(second);

    let a: StackDevice = StackDevice::register(opts("smoke_a"));
    let b: StackDevice = StackDevice::register(opts("smoke_b"));
    let sa = a.open();
    let _sb = b.open();
    let _ = sa.push(9);
    t.check(
        "devices do not share a stack",
        a.len() == 1 && b.is_empty(),
        &format!("a={} b={}", a.len(), b.len()),
    );
}

// ════════════════════════════════════════════════════════════
// Part B: Push/pop through ioctl codes
// ════════════════════════════════════════════════════════════

fn test_ioctl(t: &mut TestRunner) {
    t.section("Part B: Push/pop via ioctl codes");

    t.check(
        "INSERT_VALUE code",
        INSERT_VALUE == 0x8004_7c01,
        &format!("{:#x}", INSERT_VALUE),
    );
    t.check(
        "POP_VALUE code",
        POP_VALUE == 0x4004_7c02,
        &format!("{:#x}", POP_VALUE),
    );
    t.check(
        "codes decode to commands",
        StackCommand::try_from(INSERT_VALUE) == Ok(StackCommand::Push)
            && StackCommand::try_from(POP_VALUE) == Ok(StackCommand::Pop),
        "decode mismatch",
    );
    t.check(
        "payload window is one int",
        StackCommand::Push.payload_size() == 4 && StackCommand::Pop.payload_size() == 4,
        &format!("{}", StackCommand::Push.payload_size()),
    );

    let device: StackDevice = StackDevice::register(opts("smoke_ioctl"));
    let session = device.open();

    let mut pushed_ok = true;
    for v in [10u8, 20, 30] {
        let mut arg = [v];
        pushed_ok &= session.ioctl(INSERT_VALUE, &mut arg) == Ok(0);
    }
    t.check("push 10, 20, 30 returns 0", pushed_ok, "non-zero return");
    t.check(
        "stack holds [10, 20, 30]",
        device.snapshot() == [10, 20, 30],
        &format!("{:?}", device.snapshot()),
    );

    let mut popped = Vec::new();
    for _ in 0..3 {
        let mut arg = [0u8];
        if session.ioctl(POP_VALUE, &mut arg) == Ok(0) {
            popped.push(arg[0]);
        }
    }
    t.check("pop order is LIFO", popped == [30, 20, 10], &format!("{:?}", popped));

    let mut wide = [0xAAu8; 4];
    let _ = session.ioctl(INSERT_VALUE, &mut [7]);
    let r = session.ioctl(POP_VALUE, &mut wide);
    t.check(
        "pop writes exactly one byte",
        r == Ok(0) && wide == [7, 0xAA, 0xAA, 0xAA],
        &format!("{:?} {:?}", r, wide),
    );
}

// ════════════════════════════════════════════════════════════
// Part C: Failure codes
// ════════════════════════════════════════════════════════════

fn test_failures(t: &mut TestRunner) {
    t.section("Part C: Failure codes");

    let device: StackDevice = StackDevice::register(opts("smoke_fail"));
    let session = device.open();

    let r = session.pop();
    t.check("pop on empty -> Underflow", r == Err(StackError::Underflow), &format!("{:?}", r));

    let mut filled = 0;
    for i in 0..STACK_CAPACITY {
        if session.push(i as u8).is_ok() {
            filled += 1;
        }
    }
    t.check("127 pushes succeed", filled == STACK_CAPACITY, &format!("{}", filled));

    let before = device.snapshot();
    let r = session.push(0xFF);
    t.check("128th push -> Overflow", r == Err(StackError::Overflow), &format!("{:?}", r));
    t.check("overflow leaves stack unchanged", device.snapshot() == before, "stack changed");

    let r = session.ioctl(0x1234, &mut [0]);
    t.check(
        "unknown command rejected",
        r == Err(StackError::UnknownCommand(0x1234)),
        &format!("{:?}", r),
    );
    t.check("unknown command leaves stack unchanged", device.snapshot() == before, "stack changed");

    let r = session.ioctl(POP_VALUE, &mut []);
    t.check("pop into empty buffer -> TransferFault", r == Err(StackError::TransferFault), &format!("{:?}", r));
    t.check("faulted pop keeps the byte", device.snapshot() == before, "byte lost");

    device.reset();
    let r = session.ioctl(INSERT_VALUE, &mut []);
    t.check("push from empty buffer -> TransferFault", r == Err(StackError::TransferFault), &format!("{:?}", r));
    t.check("faulted push adds nothing", device.is_empty(), &format!("len={}", device.len()));

    let stats = device.stats();
    t.check(
        "failure counters",
        stats.overflows == 1
            && stats.underflows == 1
            && stats.unknown_commands == 1
            && stats.transfer_faults == 2,
        &format!("{:?}", stats),
    );

    t.check(
        "errno mapping",
        uapi::errno_of(&StackError::Overflow) == libc::ENOSPC
            && uapi::errno_of(&StackError::Underflow) == libc::ENODATA
            && uapi::errno_of(&StackError::UnknownCommand(0)) == libc::ENOTTY
            && uapi::errno_of(&StackError::TransferFault) == libc::EFAULT,
        "errno mismatch",
    );
    t.check(
        "ioctl return convention",
        uapi::ioctl_return(Ok(0)) == 0
            && uapi::ioctl_return(Err(StackError::Underflow)) == -(libc::ENODATA as isize),
        "bad return value",
    );
    t.check(
        "errno round-trips",
        uapi::error_from_errno(libc::ENOSPC, INSERT_VALUE) == Some(StackError::Overflow)
            && uapi::error_from_errno(libc::EIO, INSERT_VALUE).is_none(),
        "inverse mismatch",
    );
}

// ════════════════════════════════════════════════════════════
// Part D: Concurrency
// ════════════════════════════════════════════════════════════

fn test_concurrency(t: &mut TestRunner) {
    t.section("Part D: Concurrent clients");

    const THREADS: usize = 4;
    const PER_THREAD: usize = 30;

    let device: StackDevice = StackDevice::register(opts("smoke_concurrent"));
    let session = device.open();

    let overflows = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let session = &session;
                scope.spawn(move || {
                    (0..PER_THREAD)
                        .filter(|i| session.push((t * PER_THREAD + i) as u8).is_err())
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap_or(PER_THREAD)).sum::<usize>()
    });

    t.check(
        "120 concurrent pushes, no overflow",
        overflows == 0 && device.len() == THREADS * PER_THREAD,
        &format!("overflows={} len={}", overflows, device.len()),
    );

    let values: HashSet<u8> = device.snapshot().into_iter().collect();
    t.check(
        "every pushed value present once",
        values.len() == THREADS * PER_THREAD,
        &format!("distinct={}", values.len()),
    );

    // Drain from all threads; no value may come out twice.
    let drained = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let session = &session;
                scope.spawn(move || {
                    let mut out = Vec::new();
                    while let Ok(v) = session.pop() {
                        out.push(v);
                    }
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_default())
            .collect::<Vec<u8>>()
    });
    let distinct: HashSet<u8> = drained.iter().copied().collect();
    t.check(
        "concurrent drain returns each value once",
        drained.len() == THREADS * PER_THREAD && distinct == values,
        &format!("drained={} distinct={}", drained.len(), distinct.len()),
    );
    t.check("device empty after drain", device.is_empty(), &format!("len={}", device.len()));
}

// ════════════════════════════════════════════════════════════
// Part E: Device node
// ════════════════════════════════════════════════════════════

fn test_device_node(t: &mut TestRunner) {
    t.section("Part E: Device node");

    let path = match env_get_opt::<String>("BSTACK_DEVICE_PATH").filter(|p| !p.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => {
            t.skip("device node tests", "BSTACK_DEVICE_PATH not set");
            return;
        }
    };

    let fd = match uapi::open_device(&path) {
        Ok(fd) => {
            t.pass(&format!("open {}", path.display()));
            fd
        }
        Err(e) => {
            t.fail(&format!("open {}", path.display()), &e.to_string());
            return;
        }
    };
    let raw = fd.as_raw_fd();

    // Safety: every pointer below is valid for one byte for the call's duration
    let mut ok = true;
    for v in [1u8, 2, 3] {
        ok &= unsafe { uapi::stack_ioc_insert(raw, &v) }.is_ok();
    }
    t.check("node: push 1, 2, 3", ok, "ioctl failed");

    let mut popped = Vec::new();
    for _ in 0..3 {
        let mut v = 0u8;
        if unsafe { uapi::stack_ioc_pop(raw, &mut v) }.is_ok() {
            popped.push(v);
        }
    }
    t.check("node: pop order is LIFO", popped == [3, 2, 1], &format!("{:?}", popped));

    let mut v = 0u8;
    let r = unsafe { uapi::stack_ioc_pop(raw, &mut v) };
    let errno = r.err().map(|e| e as i32);
    t.check(
        "node: pop on empty -> ENODATA",
        errno == Some(libc::ENODATA),
        &format!("{:?}", errno),
    );
}

fn main() {
    kprint::init();

    println!("=== stack-smoke ===");

    let mut t = TestRunner::new();
    test_registration(&mut t);
    test_ioctl(&mut t);
    test_failures(&mut t);
    test_concurrency(&mut t);
    test_device_node(&mut t);

    t.summary();
    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}
