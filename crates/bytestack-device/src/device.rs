//! `StackDevice`: one gated stack plus the dispatch that drives it.
//!
//! Lifecycle:
//!
//! ```text
//! register ──► open ──► ioctl/push/pop ... ──► (Session dropped) release
//!                ▲                                       │
//!                └──────────── next client ──────────────┘
//! drop(device) ──► unregistered
//! ```
//!
//! Opening a session resets the stack. Sessions share the one stack; the
//! gate orders their operations.

use bytestack_core::constants::STACK_CAPACITY;
use bytestack_core::{kdebug, kerror, kinfo};
use bytestack_core::{ExclusiveGate, StackError, StackResult, StackStore};

use crate::command::StackCommand;
use crate::stats::{DeviceCounters, DeviceStats};
use crate::user_slice::{UserSlice, UserSliceReader, UserSliceWriter};

/// Registration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    pub name: String,
}

/// A registered stack device.
///
/// Owns exactly one `StackStore`, reachable only through the gate. Hosts
/// keep one instance alive for the lifetime of the service and hand out
/// references (or an `Arc`) to the code that serves clients.
pub struct StackDevice<const C: usize = STACK_CAPACITY> {
    name: String,
    stack: ExclusiveGate<StackStore<C>>,
    counters: DeviceCounters,
}

impl<const C: usize> StackDevice<C> {
    /// Create the device with an empty stack.
    pub fn register(options: DeviceOptions) -> Self {
        kinfo!("stack device '{}' registered (capacity {})", options.name, C);
        Self {
            name: options.name,
            stack: ExclusiveGate::new(StackStore::new()),
            counters: DeviceCounters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn capacity(&self) -> usize {
        C
    }

    /// Start a client session. Always succeeds; resets the stack.
    pub fn open(&self) -> Session<'_, C> {
        self.reset();
        let id = self.counters.record_session();
        kinfo!("stack device '{}' opened (session {})", self.name, id);
        Session { device: self, id }
    }

    /// Empty the stack and zero its buffer.
    pub fn reset(&self) {
        self.stack.with_exclusive_access(|s| s.reset());
    }

    /// Occupied slots at the instant of the call.
    pub fn len(&self) -> usize {
        self.stack.with_exclusive_access(|s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the live contents, bottom first.
    pub fn snapshot(&self) -> Vec<u8> {
        self.stack.with_exclusive_access(|s| s.as_slice().to_vec())
    }

    pub fn stats(&self) -> DeviceStats {
        self.counters.snapshot()
    }

    fn dispatch(&self, session: u64, cmd: u32, arg: &mut [u8]) -> StackResult<isize> {
        let command = StackCommand::try_from(cmd).map_err(|e| self.fail(session, e))?;
        let slice = UserSlice::new(arg, command.payload_size());

        match command {
            StackCommand::Push => self.insert_value(session, slice.reader())?,
            StackCommand::Pop => {
                self.pop_value(session, slice.writer())?;
            }
        }
        Ok(0)
    }

    fn insert_value(&self, session: u64, mut reader: UserSliceReader<'_>) -> StackResult<()> {
        // Copy in before taking the gate; a fault never reaches the stack.
        let value = reader.read_u8().map_err(|e| self.fail(session, e))?;
        self.push_value(session, value)
    }

    fn push_value(&self, session: u64, value: u8) -> StackResult<()> {
        self.stack
            .with_exclusive_access(|s| s.push(value))
            .map_err(|e| self.fail(session, e))?;
        self.counters.record_push();
        kdebug!("session {}: value inserted: {}", session, value);
        Ok(())
    }

    fn pop_value(&self, session: u64, mut writer: UserSliceWriter<'_>) -> StackResult<u8> {
        // The byte leaves the stack only if the copy-out succeeded.
        let value = self
            .stack
            .with_exclusive_access(|s| s.pop_into(|v| writer.write_u8(v)))
            .map_err(|e| self.fail(session, e))?;
        self.counters.record_pop();
        kdebug!("session {}: value popped: {}", session, value);
        Ok(value)
    }

    fn take_value(&self, session: u64) -> StackResult<u8> {
        let value = self
            .stack
            .with_exclusive_access(|s| s.pop())
            .map_err(|e| self.fail(session, e))?;
        self.counters.record_pop();
        kdebug!("session {}: value popped: {}", session, value);
        Ok(value)
    }

    fn fail(&self, session: u64, err: StackError) -> StackError {
        self.counters.record_failure(&err);
        match err {
            StackError::Overflow | StackError::Underflow => {
                kdebug!("session {}: {}", session, err);
            }
            StackError::UnknownCommand(cmd) => {
                kerror!("session {}: ioctl command not recognized: {:#x}", session, cmd);
            }
            StackError::TransferFault => {
                kerror!("session {}: failed to transfer value to/from caller", session);
            }
        }
        err
    }
}

impl<const C: usize> Drop for StackDevice<C> {
    fn drop(&mut self) {
        kinfo!("stack device '{}' unregistered", self.name);
    }
}

impl<const C: usize> std::fmt::Debug for StackDevice<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackDevice")
            .field("name", &self.name)
            .field("stack", &self.stack)
            .finish()
    }
}

/// One client's handle on a device.
///
/// Sessions are `Sync`: a client may share its session across threads, and
/// each call is still one gated operation.
pub struct Session<'d, const C: usize = STACK_CAPACITY> {
    device: &'d StackDevice<C>,
    id: u64,
}

impl<'d, const C: usize> Session<'d, C> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> &'d StackDevice<C> {
        self.device
    }

    /// Execute a raw command against the caller's payload buffer.
    ///
    /// `arg` plays the role of the user pointer: push reads its first byte,
    /// pop writes its first byte. Returns `Ok(0)` on success.
    pub fn ioctl(&self, cmd: u32, arg: &mut [u8]) -> StackResult<isize> {
        self.device.dispatch(self.id, cmd, arg)
    }

    pub fn push(&self, value: u8) -> StackResult<()> {
        self.device.push_value(self.id, value)
    }

    pub fn pop(&self) -> StackResult<u8> {
        self.device.take_value(self.id)
    }
}

impl<'d, const C: usize> Drop for Session<'d, C> {
    fn drop(&mut self) {
        kinfo!("stack device '{}' released (session {})", self.device.name, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uapi::{INSERT_VALUE, POP_VALUE};
    use std::collections::HashMap;
    use std::thread;

    fn options(name: &str) -> DeviceOptions {
        DeviceOptions { name: name.to_string() }
    }

    fn push_raw<const C: usize>(session: &Session<'_, C>, value: u8) -> StackResult<isize> {
        let mut arg = [value, 0, 0, 0];
        session.ioctl(INSERT_VALUE, &mut arg)
    }

    fn pop_raw<const C: usize>(session: &Session<'_, C>) -> StackResult<u8> {
        let mut arg = [0u8; 4];
        session.ioctl(POP_VALUE, &mut arg)?;
        Ok(arg[0])
    }

    #[test]
    fn test_register_defaults() {
        let device: StackDevice = StackDevice::register(options("stack_a"));
        assert_eq!(device.name(), "stack_a");
        assert_eq!(device.capacity(), 127);
        assert!(device.is_empty());
        assert_eq!(device.stats(), DeviceStats::default());
    }

    #[test]
    fn test_ioctl_push_pop_lifo() {
        let device: StackDevice = StackDevice::register(options("stack_lifo"));
        let session = device.open();

        assert_eq!(push_raw(&session, b'a'), Ok(0));
        assert_eq!(push_raw(&session, b'b'), Ok(0));
        assert_eq!(device.snapshot(), vec![b'a', b'b']);
        assert_eq!(pop_raw(&session), Ok(b'b'));
        assert_eq!(pop_raw(&session), Ok(b'a'));
        assert_eq!(pop_raw(&session), Err(StackError::Underflow));
    }

    #[test]
    fn test_capacity_four_scenario_through_ioctl() {
        let device = StackDevice::<4>::register(options("stack_c4"));
        let session = device.open();

        for v in [10, 20, 30] {
            assert_eq!(push_raw(&session, v), Ok(0));
        }
        assert_eq!(device.len(), 3);
        assert_eq!(push_raw(&session, 40), Ok(0));
        assert_eq!(device.len(), 4);
        assert_eq!(push_raw(&session, 50), Err(StackError::Overflow));
        assert_eq!(device.len(), 4);

        let popped: Vec<u8> = (0..4).map(|_| pop_raw(&session).unwrap()).collect();
        assert_eq!(popped, vec![40, 30, 20, 10]);
        assert_eq!(pop_raw(&session), Err(StackError::Underflow));

        let stats = device.stats();
        assert_eq!(stats.pushes, 4);
        assert_eq!(stats.pops, 4);
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.underflows, 1);
    }

    #[test]
    fn test_unknown_command_leaves_stack_unchanged() {
        let device = StackDevice::<4>::register(options("stack_unknown"));
        let session = device.open();
        session.push(1).unwrap();

        let mut arg = [9u8; 4];
        let bogus = 0x1234;
        assert_eq!(session.ioctl(bogus, &mut arg), Err(StackError::UnknownCommand(bogus)));
        assert_eq!(arg, [9; 4]);
        assert_eq!(device.snapshot(), vec![1]);
        assert_eq!(device.stats().unknown_commands, 1);
    }

    #[test]
    fn test_push_transfer_fault_leaves_stack_unchanged() {
        let device = StackDevice::<4>::register(options("stack_fault_in"));
        let session = device.open();

        let mut empty: [u8; 0] = [];
        assert_eq!(session.ioctl(INSERT_VALUE, &mut empty), Err(StackError::TransferFault));
        assert!(device.is_empty());
        assert_eq!(device.stats().transfer_faults, 1);
    }

    #[test]
    fn test_pop_transfer_fault_keeps_byte() {
        let device = StackDevice::<4>::register(options("stack_fault_out"));
        let session = device.open();
        session.push(77).unwrap();

        let mut empty: [u8; 0] = [];
        assert_eq!(session.ioctl(POP_VALUE, &mut empty), Err(StackError::TransferFault));
        assert_eq!(device.snapshot(), vec![77]);

        // The byte is still there for a well-formed request.
        assert_eq!(pop_raw(&session), Ok(77));
    }

    #[test]
    fn test_pop_underflow_takes_precedence_over_bad_buffer() {
        let device = StackDevice::<4>::register(options("stack_empty_fault"));
        let session = device.open();
        let mut empty: [u8; 0] = [];
        assert_eq!(session.ioctl(POP_VALUE, &mut empty), Err(StackError::Underflow));
    }

    #[test]
    fn test_single_byte_buffer_is_enough() {
        let device = StackDevice::<4>::register(options("stack_one_byte"));
        let session = device.open();
        let mut arg = [5u8];
        assert_eq!(session.ioctl(INSERT_VALUE, &mut arg), Ok(0));
        arg[0] = 0;
        assert_eq!(session.ioctl(POP_VALUE, &mut arg), Ok(0));
        assert_eq!(arg[0], 5);
    }

    #[test]
    fn test_open_resets_previous_session_state() {
        let device = StackDevice::<4>::register(options("stack_reset"));
        let first = device.open();
        first.push(1).unwrap();
        first.push(2).unwrap();
        drop(first);

        let second = device.open();
        assert!(device.is_empty());
        assert_eq!(second.pop(), Err(StackError::Underflow));
        assert_eq!(device.stats().sessions, 2);
        assert_ne!(second.id(), 1);
    }

    #[test]
    fn test_explicit_reset() {
        let device = StackDevice::<4>::register(options("stack_explicit_reset"));
        let session = device.open();
        session.push(3).unwrap();
        device.reset();
        assert_eq!(session.pop(), Err(StackError::Underflow));
    }

    #[test]
    fn test_devices_are_independent() {
        let a = StackDevice::<4>::register(options("stack_ind_a"));
        let b = StackDevice::<4>::register(options("stack_ind_b"));
        let sa = a.open();
        let sb = b.open();
        sa.push(1).unwrap();
        assert!(b.is_empty());
        assert_eq!(sb.pop(), Err(StackError::Underflow));
        assert_eq!(sa.pop(), Ok(1));
    }

    #[test]
    fn test_concurrent_sessions_push_every_value_once() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 25;

        let device: StackDevice = StackDevice::register(options("stack_concurrent"));
        let session = device.open();

        thread::scope(|scope| {
            for t in 0..THREADS {
                let session = &session;
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        let value = (t * PER_THREAD + i) as u8;
                        assert_eq!(push_raw(session, value), Ok(0));
                    }
                });
            }
        });

        assert_eq!(device.len(), THREADS * PER_THREAD);

        let mut counts: HashMap<u8, usize> = HashMap::new();
        while let Ok(v) = pop_raw(&session) {
            *counts.entry(v).or_default() += 1;
        }
        assert_eq!(counts.len(), THREADS * PER_THREAD);
        assert!(counts.values().all(|&n| n == 1));
    }

    #[test]
    fn test_per_thread_order_is_preserved() {
        // Each thread pushes an increasing sequence tagged with its id; in the
        // final stack (bottom first) each thread's values must still increase.
        let device = StackDevice::<120>::register(options("stack_order"));
        let session = device.open();

        thread::scope(|scope| {
            for t in 0..3u8 {
                let session = &session;
                scope.spawn(move || {
                    for i in 0..40u8 {
                        session.push(t * 40 + i).unwrap();
                    }
                });
            }
        });

        let contents = device.snapshot();
        for t in 0..3u8 {
            let mine: Vec<u8> = contents.iter().copied().filter(|v| v / 40 == t).collect();
            assert_eq!(mine.len(), 40);
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
