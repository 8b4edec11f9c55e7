//! Portable sleep/wake for platforms without futex
//!
//! Waiting yields the OS thread until the word changes. Less efficient than
//! futex, but the gate's critical sections are a handful of instructions.

use std::sync::atomic::{AtomicU32, Ordering};

pub(super) fn wait(word: &AtomicU32, expected: u32) {
    while word.load(Ordering::Relaxed) == expected {
        std::thread::yield_now();
    }
}

pub(super) fn wake_one(_word: &AtomicU32) {
    // Waiters poll the word; nothing to signal.
}
