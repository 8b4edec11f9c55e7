//! Userspace ABI of the stack device.
//!
//! Request codes are bit-compatible with the `stack_module_*` misc devices,
//! so the same client can drive the in-process device or a kernel node.

use std::mem::size_of;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use bytestack_core::StackError;
use libc::c_int;

// ── Device identity ──

pub const DEVICE_NAME: &str = "stack_module_rust";
pub const DEVICE_DIR: &str = "/dev";

// ── ioctl ──

pub const STACK_IOC_MAGIC: u8 = b'|';
pub const INSERT_VALUE_NR: u8 = 1;
pub const POP_VALUE_NR: u8 = 2;

// The direction bits follow the kernel module headers: push is declared
// _IOR and pop _IOW. Clients must use these exact numbers.

/// `_IOR('|', 1, int)`: push one byte read from the caller.
pub const INSERT_VALUE: u32 =
    nix::request_code_read!(STACK_IOC_MAGIC, INSERT_VALUE_NR, size_of::<c_int>()) as u32;

/// `_IOW('|', 2, int)`: pop one byte into the caller's buffer.
pub const POP_VALUE: u32 =
    nix::request_code_write!(STACK_IOC_MAGIC, POP_VALUE_NR, size_of::<c_int>()) as u32;

#[cfg(any(
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "sparc64"
))]
const IOC_SIZEBITS: u32 = 13;
#[cfg(not(any(
    target_arch = "powerpc",
    target_arch = "powerpc64",
    target_arch = "mips",
    target_arch = "mips64",
    target_arch = "sparc64"
)))]
const IOC_SIZEBITS: u32 = 14;

const IOC_SIZESHIFT: u32 = 16;
const IOC_SIZEMASK: u32 = (1 << IOC_SIZEBITS) - 1;

/// `_IOC_SIZE(cmd)`: payload size encoded in a request code.
#[inline]
pub const fn ioc_size(cmd: u32) -> usize {
    ((cmd >> IOC_SIZESHIFT) & IOC_SIZEMASK) as usize
}

// ioctl wrappers for a device node. The payload is a single byte; the
// kernel side transfers exactly one byte out of the declared int window.
nix::ioctl_write_ptr_bad!(stack_ioc_insert, INSERT_VALUE, u8);
nix::ioctl_read_bad!(stack_ioc_pop, POP_VALUE, u8);

// ── errno mapping ──

/// errno a device node reports for `err`.
pub fn errno_of(err: &StackError) -> i32 {
    match err {
        StackError::Overflow => libc::ENOSPC,
        StackError::Underflow => libc::ENODATA,
        StackError::UnknownCommand(_) => libc::ENOTTY,
        StackError::TransferFault => libc::EFAULT,
    }
}

/// Inverse of `errno_of`; `cmd` fills in `UnknownCommand`.
pub fn error_from_errno(errno: i32, cmd: u32) -> Option<StackError> {
    match errno {
        libc::ENOSPC => Some(StackError::Overflow),
        libc::ENODATA => Some(StackError::Underflow),
        libc::ENOTTY => Some(StackError::UnknownCommand(cmd)),
        libc::EFAULT => Some(StackError::TransferFault),
        _ => None,
    }
}

/// Fold a handler result into the kernel return convention (value or -errno).
pub fn ioctl_return(result: Result<isize, StackError>) -> isize {
    match result {
        Ok(v) => v,
        Err(e) => -(errno_of(&e) as isize),
    }
}

// ── Device node helpers ──

pub fn device_path(name: &str) -> PathBuf {
    Path::new(DEVICE_DIR).join(name)
}

/// Open a device node read-write, close-on-exec.
pub fn open_device(path: &Path) -> std::io::Result<OwnedFd> {
    use std::os::unix::fs::OpenOptionsExt;
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_CLOEXEC)
        .open(path)?;
    Ok(OwnedFd::from(file))
}
