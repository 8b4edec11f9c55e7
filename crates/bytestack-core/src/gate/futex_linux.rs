//! Linux futex sleep/wake on the gate's lock word
//!
//! `wait` sleeps only while the word still equals `expected`; the kernel
//! checks this atomically, so a release between the caller's last load and
//! the syscall cannot be missed. Spurious returns (EAGAIN, EINTR) are fine:
//! the caller re-reads the word and loops.

use std::sync::atomic::AtomicU32;

/// Sleep while `word == expected`
pub(super) fn wait(word: &AtomicU32, expected: u32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            expected,
            std::ptr::null::<libc::timespec>(), // No timeout
            std::ptr::null::<u32>(),            // uaddr2 (unused)
            0u32,                               // val3 (unused)
        );
    }
}

/// Wake at most one sleeper on `word`
pub(super) fn wake_one(word: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            1i32,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}
