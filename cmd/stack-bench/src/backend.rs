//! Targets the benchmark can drive.

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use bytestack_core::constants::STACK_CAPACITY;
use bytestack_core::StackError;
use bytestack_device::uapi::{self, INSERT_VALUE, POP_VALUE};
use bytestack_device::Session;
use nix::errno::Errno;

#[derive(Debug)]
pub enum BenchError {
    /// The stack rejected the call
    Stack(StackError),
    /// A device node returned an errno with no stack meaning
    Os(Errno),
    Io(std::io::Error),
    Config(&'static str),
}

impl BenchError {
    fn from_errno(errno: Errno, cmd: u32) -> Self {
        match uapi::error_from_errno(errno as i32, cmd) {
            Some(e) => BenchError::Stack(e),
            None => BenchError::Os(errno),
        }
    }

    /// Value for the CSV `Outcome` column
    pub fn outcome(&self) -> &'static str {
        match self {
            BenchError::Stack(e) => e.name(),
            BenchError::Os(_) => "os_error",
            BenchError::Io(_) => "io_error",
            BenchError::Config(_) => "config_error",
        }
    }

    /// Process exit status, errno-valued where one exists
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Stack(e) => uapi::errno_of(e),
            BenchError::Os(errno) => *errno as i32,
            BenchError::Io(e) => e.raw_os_error().unwrap_or(1),
            BenchError::Config(_) => 2,
        }
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Stack(e) => write!(f, "{}", e),
            BenchError::Os(errno) => write!(f, "ioctl: {}", errno.desc()),
            BenchError::Io(e) => write!(f, "I/O: {}", e),
            BenchError::Config(msg) => write!(f, "config: {}", msg),
        }
    }
}

impl std::error::Error for BenchError {}

impl From<StackError> for BenchError {
    fn from(e: StackError) -> Self {
        BenchError::Stack(e)
    }
}

impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        BenchError::Io(e)
    }
}

impl From<Errno> for BenchError {
    fn from(e: Errno) -> Self {
        BenchError::Os(e)
    }
}

/// One push/pop target.
pub trait StackBackend {
    fn describe(&self) -> String;

    fn push(&mut self, value: u8) -> Result<(), BenchError>;

    fn pop(&mut self) -> Result<u8, BenchError>;
}

/// An in-process device, driven through the same ioctl codes a device node
/// accepts. The payload is a single `char`, as in the C client.
pub struct InProcess<'d, const C: usize = STACK_CAPACITY> {
    session: Session<'d, C>,
}

impl<'d, const C: usize> InProcess<'d, C> {
    pub fn new(session: Session<'d, C>) -> Self {
        Self { session }
    }
}

impl<const C: usize> StackBackend for InProcess<'_, C> {
    fn describe(&self) -> String {
        format!("in-process device '{}'", self.session.device().name())
    }

    fn push(&mut self, value: u8) -> Result<(), BenchError> {
        let mut data = [value];
        self.session.ioctl(INSERT_VALUE, &mut data)?;
        Ok(())
    }

    fn pop(&mut self) -> Result<u8, BenchError> {
        let mut data = [0u8];
        self.session.ioctl(POP_VALUE, &mut data)?;
        Ok(data[0])
    }
}

/// A device node (`/dev/stack_module_*`) opened read-write.
pub struct DevNode {
    fd: OwnedFd,
    path: PathBuf,
}

impl DevNode {
    pub fn open(path: &Path) -> Result<Self, BenchError> {
        let fd = uapi::open_device(path)?;
        Ok(Self {
            fd,
            path: path.to_path_buf(),
        })
    }
}

impl StackBackend for DevNode {
    fn describe(&self) -> String {
        format!("device node {}", self.path.display())
    }

    fn push(&mut self, value: u8) -> Result<(), BenchError> {
        // Safety: the pointer is valid for one byte for the duration of the call
        unsafe { uapi::stack_ioc_insert(self.fd.as_raw_fd(), &value) }
            .map(|_| ())
            .map_err(|errno| BenchError::from_errno(errno, INSERT_VALUE))
    }

    fn pop(&mut self) -> Result<u8, BenchError> {
        let mut value = 0u8;
        // Safety: the pointer is valid for one writable byte for the duration of the call
        unsafe { uapi::stack_ioc_pop(self.fd.as_raw_fd(), &mut value) }
            .map_err(|errno| BenchError::from_errno(errno, POP_VALUE))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytestack_device::{DeviceOptions, StackDevice};

    #[test]
    fn test_in_process_roundtrip() {
        let device: StackDevice = StackDevice::register(DeviceOptions {
            name: "bench_backend".to_string(),
        });
        let mut backend = InProcess::new(device.open());
        backend.push(3).unwrap();
        backend.push(4).unwrap();
        assert_eq!(backend.pop().unwrap(), 4);
        assert_eq!(backend.pop().unwrap(), 3);
        assert!(matches!(
            backend.pop(),
            Err(BenchError::Stack(StackError::Underflow))
        ));
        assert!(backend.describe().contains("bench_backend"));
    }

    #[test]
    fn test_errno_maps_to_stack_error() {
        let err = BenchError::from_errno(Errno::ENOSPC, INSERT_VALUE);
        assert!(matches!(err, BenchError::Stack(StackError::Overflow)));
        assert_eq!(err.outcome(), "overflow");

        let err = BenchError::from_errno(Errno::EIO, POP_VALUE);
        assert!(matches!(err, BenchError::Os(Errno::EIO)));
        assert_eq!(err.exit_code(), Errno::EIO as i32);
    }

    #[test]
    fn test_missing_node_is_io_error() {
        let result = DevNode::open(Path::new("/nonexistent/stack_module_rust"));
        assert!(matches!(result, Err(BenchError::Io(_))));
    }
}
