//! Command decoding.

use bytestack_core::StackError;

use crate::uapi::{ioc_size, INSERT_VALUE, POP_VALUE};

/// The two operations the device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackCommand {
    /// Read one byte from the caller and push it.
    Push,
    /// Pop one byte and write it to the caller.
    Pop,
}

impl StackCommand {
    /// Raw request code.
    pub const fn code(self) -> u32 {
        match self {
            StackCommand::Push => INSERT_VALUE,
            StackCommand::Pop => POP_VALUE,
        }
    }

    /// Payload window declared by the request code.
    pub const fn payload_size(self) -> usize {
        ioc_size(self.code())
    }

    pub fn name(self) -> &'static str {
        match self {
            StackCommand::Push => "push",
            StackCommand::Pop => "pop",
        }
    }
}

impl TryFrom<u32> for StackCommand {
    type Error = StackError;

    fn try_from(cmd: u32) -> Result<Self, Self::Error> {
        match cmd {
            INSERT_VALUE => Ok(StackCommand::Push),
            POP_VALUE => Ok(StackCommand::Pop),
            other => Err(StackError::UnknownCommand(other)),
        }
    }
}
