//! Per-device operation counters.
//!
//! Diagnostics only: counters are bumped after the gate is released and
//! never influence behavior.

use std::sync::atomic::{AtomicU64, Ordering};

use bytestack_core::StackError;

#[derive(Debug, Default)]
pub(crate) struct DeviceCounters {
    pushes: AtomicU64,
    pops: AtomicU64,
    overflows: AtomicU64,
    underflows: AtomicU64,
    unknown_commands: AtomicU64,
    transfer_faults: AtomicU64,
    sessions: AtomicU64,
}

impl DeviceCounters {
    pub(crate) fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pop(&self) {
        self.pops.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the new session count, which doubles as the session id.
    pub(crate) fn record_session(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_failure(&self, err: &StackError) {
        let counter = match err {
            StackError::Overflow => &self.overflows,
            StackError::Underflow => &self.underflows,
            StackError::UnknownCommand(_) => &self.unknown_commands,
            StackError::TransferFault => &self.transfer_faults,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DeviceStats {
        DeviceStats {
            pushes: self.pushes.load(Ordering::Relaxed),
            pops: self.pops.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            underflows: self.underflows.load(Ordering::Relaxed),
            unknown_commands: self.unknown_commands.load(Ordering::Relaxed),
            transfer_faults: self.transfer_faults.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a device's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Successful pushes
    pub pushes: u64,
    /// Successful pops
    pub pops: u64,
    pub overflows: u64,
    pub underflows: u64,
    pub unknown_commands: u64,
    pub transfer_faults: u64,
    /// Sessions opened since registration
    pub sessions: u64,
}

impl DeviceStats {
    pub fn failures(&self) -> u64 {
        self.overflows + self.underflows + self.unknown_commands + self.transfer_faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = DeviceCounters::default();
        counters.record_push();
        counters.record_push();
        counters.record_pop();
        counters.record_failure(&StackError::Overflow);
        counters.record_failure(&StackError::UnknownCommand(3));
        assert_eq!(counters.record_session(), 1);
        assert_eq!(counters.record_session(), 2);

        let stats = counters.snapshot();
        assert_eq!(stats.pushes, 2);
        assert_eq!(stats.pops, 1);
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.underflows, 0);
        assert_eq!(stats.unknown_commands, 1);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.failures(), 2);
    }
}
