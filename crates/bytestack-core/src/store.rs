//! Fixed-capacity byte stack
//!
//! `StackStore` owns the buffer and the occupied-slot count. It has no
//! synchronization of its own; shared use goes through `ExclusiveGate`.
//!
//! Layout invariant: `buffer[..size]` holds the pushed bytes in push order,
//! `buffer[size..]` is filler with no meaning.

use crate::constants::STACK_CAPACITY;
use crate::error::{StackError, StackResult};

/// Bounded LIFO of bytes with capacity `C`
///
/// Every mutating operation checks its precondition before touching state,
/// so a failed push or pop leaves the store exactly as it was.
///
/// # Example
///
/// ```
/// use bytestack_core::{StackError, StackStore};
///
/// let mut stack = StackStore::<2>::new();
/// stack.push(7).unwrap();
/// stack.push(9).unwrap();
/// assert_eq!(stack.push(11), Err(StackError::Overflow));
/// assert_eq!(stack.pop(), Ok(9));
/// ```
#[derive(Clone)]
pub struct StackStore<const C: usize = STACK_CAPACITY> {
    buffer: [u8; C],
    size: usize,
}

impl<const C: usize> StackStore<C> {
    /// Number of slots
    pub const CAPACITY: usize = C;

    /// Create an empty, zero-filled stack
    pub const fn new() -> Self {
        Self {
            buffer: [0; C],
            size: 0,
        }
    }

    /// Push one byte
    ///
    /// Fails with `Overflow` when all `C` slots are occupied.
    #[inline]
    pub fn push(&mut self, value: u8) -> StackResult<()> {
        if self.size >= C {
            return Err(StackError::Overflow);
        }
        self.buffer[self.size] = value;
        self.size += 1;
        Ok(())
    }

    /// Pop the most recently pushed byte
    ///
    /// Fails with `Underflow` when the stack is empty. The vacated slot keeps
    /// its old contents.
    #[inline]
    pub fn pop(&mut self) -> StackResult<u8> {
        if self.size == 0 {
            return Err(StackError::Underflow);
        }
        self.size -= 1;
        Ok(self.buffer[self.size])
    }

    /// Pop, committing only if `sink` accepts the byte
    ///
    /// The top byte is handed to `sink`; if it returns an error the stack is
    /// left untouched and that error is returned. This is the all-or-nothing
    /// path used when the byte has to cross into a caller's buffer.
    #[inline]
    pub fn pop_into<F>(&mut self, sink: F) -> StackResult<u8>
    where
        F: FnOnce(u8) -> StackResult<()>,
    {
        if self.size == 0 {
            return Err(StackError::Underflow);
        }
        let value = self.buffer[self.size - 1];
        sink(value)?;
        self.size -= 1;
        Ok(value)
    }

    /// Drop all contents and zero the buffer
    pub fn reset(&mut self) {
        self.buffer = [0; C];
        self.size = 0;
    }

    /// Occupied slots
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == C
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Live contents, bottom first
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.size]
    }
}

impl<const C: usize> Default for StackStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const C: usize> std::fmt::Debug for StackStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackStore")
            .field("capacity", &C)
            .field("size", &self.size)
            .field("contents", &self.as_slice())
            .finish()
    }
}
