//! Caller-defined port backends.
//!
//! A virtual port hands every primitive operation to a [`VirtualPort`]
//! implementation. The port layer performs no buffering or decoding of its
//! own for these; it only drains pending pushback before delegating.

use crate::device::Whence;
use crate::error::Result;

pub trait VirtualPort: Send {
    /// Next byte, or `None` at end of input.
    fn get_byte(&mut self) -> Result<Option<u8>>;

    /// Next character, or `None` at end of input.
    fn get_char(&mut self) -> Result<Option<char>>;

    /// Fill up to `buf.len()` bytes. `Ok(0)` is end of input.
    fn get_block(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn put_byte(&mut self, byte: u8) -> Result<()>;

    fn put_block(&mut self, data: &[u8]) -> Result<()>;

    fn put_char(&mut self, c: char) -> Result<()> {
        let mut tmp = [0u8; 4];
        self.put_block(c.encode_utf8(&mut tmp).as_bytes())
    }

    fn put_string(&mut self, s: &str) -> Result<()> {
        self.put_block(s.as_bytes())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether a read would return without blocking.
    fn ready(&mut self) -> Result<bool> {
        Ok(true)
    }

    /// Reposition. `None` means the backend has no seek operation.
    fn seek(&mut self, _offset: i64, _whence: Whence) -> Option<Result<u64>> {
        None
    }
}
