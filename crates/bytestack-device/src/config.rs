//! Device configuration
//!
//! Compile-time defaults with environment overrides, same scheme as the
//! rest of the workspace.
//!
//! ```rust,ignore
//! use bytestack_device::{DeviceConfig, StackDevice};
//!
//! let config = DeviceConfig::from_env();
//! config.validate()?;
//! let device: StackDevice = StackDevice::register(config.options());
//! ```

use bytestack_core::env::env_get_str;

use crate::device::DeviceOptions;

/// Library defaults
pub mod defaults {
    pub const DEVICE_NAME: &str = crate::uapi::DEVICE_NAME;

    /// Longest accepted device name (misc device names share this limit
    /// with the `/dev` entry).
    pub const MAX_NAME_LEN: usize = 64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name the device registers under (`/dev/<name>` for a kernel node)
    pub name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: defaults::DEVICE_NAME.to_string(),
        }
    }
}

impl DeviceConfig {
    /// Defaults with environment overrides.
    ///
    /// - `BSTACK_DEVICE_NAME` - device name
    pub fn from_env() -> Self {
        Self {
            name: env_get_str("BSTACK_DEVICE_NAME", defaults::DEVICE_NAME),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("device name must not be empty");
        }
        if self.name.len() > defaults::MAX_NAME_LEN {
            return Err("device name exceeds 64 bytes");
        }
        if self.name.contains('/') {
            return Err("device name must not contain '/'");
        }
        Ok(())
    }

    /// Registration options for `StackDevice::register`.
    pub fn options(&self) -> DeviceOptions {
        DeviceOptions {
            name: self.name.clone(),
        }
    }
}
