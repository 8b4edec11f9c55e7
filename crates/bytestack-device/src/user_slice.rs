//! Bounded access to the caller's payload buffer.
//!
//! A `UserSlice` is the window `arg[..min(declared, arg.len())]`. Reading or
//! writing past the window is a `TransferFault`, never a panic; that is the
//! in-process counterpart of `copy_from_user`/`copy_to_user` returning
//! `-EFAULT`.

use bytestack_core::{StackError, StackResult};

/// Caller buffer window, before choosing a direction.
#[derive(Debug)]
pub struct UserSlice<'a> {
    buf: &'a mut [u8],
}

impl<'a> UserSlice<'a> {
    /// Window of at most `len` bytes over `buf`.
    pub fn new(buf: &'a mut [u8], len: usize) -> Self {
        let len = len.min(buf.len());
        Self { buf: &mut buf[..len] }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn reader(self) -> UserSliceReader<'a> {
        UserSliceReader { buf: self.buf }
    }

    pub fn writer(self) -> UserSliceWriter<'a> {
        UserSliceWriter { buf: self.buf }
    }
}

/// Consumes bytes from the front of the window.
#[derive(Debug)]
pub struct UserSliceReader<'a> {
    buf: &'a [u8],
}

impl<'a> UserSliceReader<'a> {
    pub fn read_u8(&mut self) -> StackResult<u8> {
        match self.buf.split_first() {
            Some((&value, rest)) => {
                self.buf = rest;
                Ok(value)
            }
            None => Err(StackError::TransferFault),
        }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

/// Fills the window from the front.
#[derive(Debug)]
pub struct UserSliceWriter<'a> {
    buf: &'a mut [u8],
}

impl<'a> UserSliceWriter<'a> {
    pub fn write_u8(&mut self, value: u8) -> StackResult<()> {
        let buf = std::mem::take(&mut self.buf);
        match buf.split_first_mut() {
            Some((slot, rest)) => {
                *slot = value;
                self.buf = rest;
                Ok(())
            }
            None => Err(StackError::TransferFault),
        }
    }

    /// Bytes left to write
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_clamped_to_buffer() {
        let mut buf = [0u8; 2];
        assert_eq!(UserSlice::new(&mut buf, 4).len(), 2);
        assert_eq!(UserSlice::new(&mut buf, 1).len(), 1);
        assert!(UserSlice::new(&mut buf, 0).is_empty());
    }

    #[test]
    fn test_reader_reads_first_byte() {
        let mut buf = [42u8, 0, 0, 0];
        let mut reader = UserSlice::new(&mut buf, 4).reader();
        assert_eq!(reader.read_u8(), Ok(42));
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_reader_faults_when_exhausted() {
        let mut buf = [9u8];
        let mut reader = UserSlice::new(&mut buf, 4).reader();
        assert_eq!(reader.read_u8(), Ok(9));
        assert_eq!(reader.read_u8(), Err(StackError::TransferFault));

        let mut empty: [u8; 0] = [];
        let mut reader = UserSlice::new(&mut empty, 4).reader();
        assert_eq!(reader.read_u8(), Err(StackError::TransferFault));
    }

    #[test]
    fn test_writer_writes_first_byte_only() {
        let mut buf = [0xEEu8; 4];
        {
            let mut writer = UserSlice::new(&mut buf, 4).writer();
            writer.write_u8(7).unwrap();
            assert_eq!(writer.remaining(), 3);
        }
        assert_eq!(buf, [7, 0xEE, 0xEE, 0xEE]);
    }

    #[test]
    fn test_writer_faults_on_empty_window() {
        let mut buf = [0u8; 4];
        let mut writer = UserSlice::new(&mut buf, 0).writer();
        assert_eq!(writer.write_u8(1), Err(StackError::TransferFault));
        assert_eq!(buf, [0; 4]);
    }
}
