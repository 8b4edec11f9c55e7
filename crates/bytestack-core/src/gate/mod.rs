//! Exclusive gate
//!
//! Serializes every operation against the value it wraps. At most one
//! closure runs inside the gate at any instant; callers that arrive while it
//! is held block until it is released.
//!
//! Lock word states:
//! - `FREE` = nobody inside
//! - `HELD` = one owner, no sleepers
//! - `CONTENDED` = one owner, possibly sleepers (release must wake one)
//!
//! The sleep/wake primitive is platform-specific: futex on Linux, a
//! yield loop elsewhere.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

const FREE: u32 = 0;
const HELD: u32 = 1;
const CONTENDED: u32 = 2;

/// Spins on a held gate before going to sleep
const SPIN_LIMIT: u32 = 100;

// Platform-specific sleep/wake on the lock word
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        use futex_linux as platform;
    } else {
        mod fallback;
        use fallback as platform;
    }
}

/// Mutual-exclusion wrapper with a closure-based entry point
///
/// There is no unsynchronized path to the wrapped value while the gate is
/// shared: `get_mut` and `into_inner` need ownership or `&mut self`.
///
/// The gate does not poison. A panic inside the closure releases it on
/// unwind, so values whose operations validate before mutating stay usable.
///
/// # Example
///
/// ```
/// use bytestack_core::{ExclusiveGate, StackStore};
///
/// let gate = ExclusiveGate::new(StackStore::<4>::new());
/// gate.with_exclusive_access(|s| s.push(3)).unwrap();
/// assert_eq!(gate.with_exclusive_access(|s| s.pop()), Ok(3));
/// ```
pub struct ExclusiveGate<T> {
    state: AtomicU32,
    data: UnsafeCell<T>,
}

// Safety: ExclusiveGate hands out at most one reference to T at a time
unsafe impl<T: Send> Send for ExclusiveGate<T> {}
unsafe impl<T: Send> Sync for ExclusiveGate<T> {}

impl<T> ExclusiveGate<T> {
    /// Create a free gate around `value`
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicU32::new(FREE),
            data: UnsafeCell::new(value),
        }
    }

    /// Run `op` with exclusive access and return its result unchanged
    ///
    /// Blocks until the gate is free. The gate is released on every exit
    /// path of `op`, including unwinding.
    #[inline]
    pub fn with_exclusive_access<R, F>(&self, op: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock();
        op(&mut guard)
    }

    /// Acquire the gate, blocking while another caller holds it
    #[inline]
    pub fn lock(&self) -> GateGuard<'_, T> {
        if self
            .state
            .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_contended();
        }
        GateGuard { gate: self }
    }

    #[cold]
    fn lock_contended(&self) {
        let mut state = self.spin();

        if state == FREE {
            match self
                .state
                .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(s) => state = s,
            }
        }

        loop {
            // Marking CONTENDED before sleeping makes the owner's release
            // issue a wake. If the swap observed FREE we own the gate.
            if state != CONTENDED && self.state.swap(CONTENDED, Ordering::Acquire) == FREE {
                return;
            }

            platform::wait(&self.state, CONTENDED);

            state = self.spin();
        }
    }

    /// Spin while the gate is held without sleepers
    fn spin(&self) -> u32 {
        let mut spins = SPIN_LIMIT;
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state != HELD || spins == 0 {
                return state;
            }
            core::hint::spin_loop();
            spins -= 1;
        }
    }

    /// Acquire the gate only if it is free right now
    pub fn try_lock(&self) -> Option<GateGuard<'_, T>> {
        if self
            .state
            .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(GateGuard { gate: self })
        } else {
            None
        }
    }

    /// Whether someone is inside the gate (hint, may be stale)
    pub fn is_held(&self) -> bool {
        self.state.load(Ordering::Relaxed) != FREE
    }

    /// Access the value through exclusive ownership of the gate
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the gate and return the inner value
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    fn unlock(&self) {
        if self.state.swap(FREE, Ordering::Release) == CONTENDED {
            platform::wake_one(&self.state);
        }
    }
}

impl<T: Default> Default for ExclusiveGate<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ExclusiveGate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("ExclusiveGate")
                .field("data", &*guard)
                .finish(),
            None => f.debug_struct("ExclusiveGate")
                .field("data", &"<held>")
                .finish(),
        }
    }
}

/// Guard that releases the gate when dropped
pub struct GateGuard<'a, T> {
    gate: &'a ExclusiveGate<T>,
}

impl<'a, T> Deref for GateGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: We hold the gate
        unsafe { &*self.gate.data.get() }
    }
}

impl<'a, T> DerefMut for GateGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: We hold the gate
        unsafe { &mut *self.gate.data.get() }
    }
}

impl<'a, T> Drop for GateGuard<'a, T> {
    fn drop(&mut self) {
        self.gate.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::store::StackStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_basic_access() {
        let gate = ExclusiveGate::new(0u32);
        gate.with_exclusive_access(|v| *v = 42);
        assert_eq!(gate.with_exclusive_access(|v| *v), 42);
        assert!(!gate.is_held());
    }

    #[test]
    fn test_try_lock() {
        let gate = ExclusiveGate::new(0u32);

        let guard = gate.try_lock();
        assert!(guard.is_some());
        assert!(gate.is_held());

        // While held, try_lock should fail
        assert!(gate.try_lock().is_none());

        drop(guard);

        assert!(gate.try_lock().is_some());
    }

    #[test]
    fn test_released_after_error_result() {
        let gate = ExclusiveGate::new(StackStore::<2>::new());
        let result = gate.with_exclusive_access(|s| s.pop());
        assert_eq!(result, Err(StackError::Underflow));
        assert!(!gate.is_held());
        assert!(gate.try_lock().is_some());
    }

    #[test]
    fn test_released_after_panic() {
        let gate = Arc::new(ExclusiveGate::new(StackStore::<2>::new()));
        gate.with_exclusive_access(|s| s.push(1)).unwrap();

        let g = Arc::clone(&gate);
        let joined = thread::spawn(move || {
            g.with_exclusive_access(|_s| panic!("operation blew up"));
        })
        .join();
        assert!(joined.is_err());

        assert!(!gate.is_held());
        assert_eq!(gate.with_exclusive_access(|s| s.pop()), Ok(1));
    }

    #[test]
    fn test_blocked_caller_wakes() {
        let gate = Arc::new(ExclusiveGate::new(0u32));
        let guard = gate.lock();

        let g = Arc::clone(&gate);
        let waiter = thread::spawn(move || g.with_exclusive_access(|v| {
            *v += 1;
            *v
        }));

        // Give the waiter time to block on the held gate
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.join().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_counter() {
        let gate = Arc::new(ExclusiveGate::new(0u64));
        let mut handles = vec![];

        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            handles.push(thread::spawn(move || {
                for _ in 0..2000 {
                    gate.with_exclusive_access(|v| *v += 1);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(gate.with_exclusive_access(|v| *v), 16_000);
    }

    #[test]
    fn test_concurrent_pushes_no_lost_updates() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 15;

        let gate: Arc<ExclusiveGate<StackStore<127>>> = Arc::new(ExclusiveGate::default());
        let mut handles = vec![];

        for t in 0..THREADS {
            let gate = Arc::clone(&gate);
            handles.push(thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let value = (t * PER_THREAD + i) as u8;
                    gate.with_exclusive_access(|s| s.push(value)).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut drained = vec![];
        while let Ok(v) = gate.with_exclusive_access(|s| s.pop()) {
            drained.push(v);
        }
        assert_eq!(drained.len(), THREADS * PER_THREAD);

        let mut counts: HashMap<u8, usize> = HashMap::new();
        for v in drained {
            *counts.entry(v).or_default() += 1;
        }
        for value in 0..(THREADS * PER_THREAD) as u8 {
            assert_eq!(counts.get(&value), Some(&1), "value {} lost or duplicated", value);
        }
    }

    #[test]
    fn test_into_inner() {
        let mut gate = ExclusiveGate::new(StackStore::<4>::new());
        gate.get_mut().push(9).unwrap();
        let store = gate.into_inner();
        assert_eq!(store.as_slice(), &[9]);
    }
}
