//! # bytestack-device: control surface for the byte stack
//!
//! Maps raw command codes and caller payload buffers onto the core stack,
//! the same way a misc character device maps `ioctl(2)` onto its state.
//!
//! ## Layers
//!
//! | Module       | Role                                                        |
//! |--------------|-------------------------------------------------------------|
//! | `uapi`       | ioctl request codes, errno mapping, device-node bindings    |
//! | `command`    | Decoding a raw code into `StackCommand`                     |
//! | `user_slice` | Bounded reader/writer over the caller's payload buffer      |
//! | `device`     | `StackDevice` (registration, gate, stack) and `Session`     |
//! | `stats`      | Per-device counters                                         |
//! | `config`     | `DeviceConfig` with env overrides                           |
//!
//! A host creates one `StackDevice` and shares it by reference. Each client
//! calls `open()` to get a `Session`, which resets the stack, and then drives
//! it through `Session::ioctl` or the typed `push`/`pop`.

pub mod uapi;
pub mod command;
pub mod user_slice;
pub mod stats;
pub mod device;
pub mod config;

pub use command::StackCommand;
pub use config::DeviceConfig;
pub use device::{DeviceOptions, Session, StackDevice};
pub use stats::DeviceStats;
pub use user_slice::{UserSlice, UserSliceReader, UserSliceWriter};
