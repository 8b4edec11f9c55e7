//! Error types for stack operations

use core::fmt;

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;

/// Errors returned by the stack and its control surface
///
/// None of these are fatal: the stack is valid and usable after any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackError {
    /// Push attempted while the stack holds `capacity` bytes
    Overflow,

    /// Pop attempted on an empty stack
    Underflow,

    /// Command code is neither push nor pop
    UnknownCommand(u32),

    /// The payload could not be read from or written to the caller's buffer
    TransferFault,
}

impl StackError {
    /// Short lowercase name, stable across releases (used in CSV and logs).
    pub fn name(&self) -> &'static str {
        match self {
            StackError::Overflow => "overflow",
            StackError::Underflow => "underflow",
            StackError::UnknownCommand(_) => "unknown_command",
            StackError::TransferFault => "transfer_fault",
        }
    }

    /// Whether this is a capacity outcome (full or empty) rather than a
    /// malformed request.
    pub fn is_capacity(&self) -> bool {
        matches!(self, StackError::Overflow | StackError::Underflow)
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Overflow => write!(f, "stack overflow: no free slot"),
            StackError::Underflow => write!(f, "stack underflow: stack is empty"),
            StackError::UnknownCommand(cmd) => write!(f, "unknown command: {:#x}", cmd),
            StackError::TransferFault => write!(f, "failed to transfer value to/from caller"),
        }
    }
}

impl std::error::Error for StackError {}
