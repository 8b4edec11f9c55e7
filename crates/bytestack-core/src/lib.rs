//! # bytestack-core
//!
//! Core types for the bytestack device: a fixed-capacity byte stack and the
//! gate that serializes every access to it.
//!
//! This crate is platform-agnostic apart from the gate's sleep primitive
//! (futex on Linux, yield loop elsewhere). The control surface that decodes
//! commands and moves bytes across the caller boundary lives in
//! `bytestack-device`.
//!
//! ## Modules
//!
//! - `store` - `StackStore`, the bounded byte stack
//! - `gate` - `ExclusiveGate`, the mutual-exclusion wrapper
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod store;
pub mod gate;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use store::StackStore;
pub use gate::{ExclusiveGate, GateGuard};
pub use error::{StackError, StackResult};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

/// A stack with the default capacity, behind its gate.
pub type SharedStack = ExclusiveGate<StackStore>;

/// Build-time constants
pub mod constants {
    /// Number of byte slots in the default stack.
    pub const STACK_CAPACITY: usize = 127;

    /// Bytes moved per push or pop.
    pub const TRANSFER_SIZE: usize = 1;
}
