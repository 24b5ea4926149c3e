//! Buffered backend: a [`StreamBuffer`] in front of a [`Device`].
//!
//! Implements the refill/flush contract the port operations rely on:
//!
//! - `fill(min)` compacts unread input to the front, then reads until at
//!   least `min` new bytes arrived or end of input. Outside fully-buffered
//!   mode, or when non-blocking, a single device read suffices.
//! - `flush_through(n)` writes the first `n` pending output bytes.
//!
//! A character whose bytes straddle a refill boundary is assembled here,
//! so callers always see whole characters.

use std::io;

use tracing::{debug, trace};

use crate::buffer::{BufferMode, StreamBuffer};
use crate::codec::{CharCodec, CharRead, MAX_CHAR_BYTES};
use crate::device::{Device, Readiness, Whence};

pub struct BufferedBackend {
    device: Box<dyn Device>,
    buf: StreamBuffer,
    writable: bool,
    line: u64,
}

impl std::fmt::Debug for BufferedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedBackend")
            .field("mode", &self.buf.mode())
            .field("capacity", &self.buf.capacity())
            .field("writable", &self.writable)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

impl BufferedBackend {
    pub fn new(device: Box<dyn Device>, writable: bool, mode: BufferMode, capacity: usize) -> Self {
        Self {
            device,
            buf: StreamBuffer::new(mode, capacity),
            writable,
            line: 1,
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.buf.mode()
    }

    pub fn set_mode(&mut self, mode: BufferMode) {
        self.buf.set_mode(mode);
    }

    /// Current line number, starting at 1.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Unread input bytes held in the buffer.
    pub fn buffered_input(&self) -> usize {
        if self.writable { 0 } else { self.buf.readable() }
    }

    /// Output bytes not yet handed to the device.
    pub fn pending_output(&self) -> &[u8] {
        if self.writable { self.buf.pending() } else { &[] }
    }

    // -----------------------------------------------------------------------
    // Refill / flush
    // -----------------------------------------------------------------------

    /// Read at least `min` new bytes unless input ends first. Returns the
    /// number of bytes added; `0` means end of input.
    pub fn fill(&mut self, min: usize, non_blocking: bool) -> io::Result<usize> {
        self.buf.compact();
        let allow_less = non_blocking || self.buf.mode() != BufferMode::Full;
        let mut filled = 0;
        while filled < min {
            let spare = self.buf.spare_mut();
            if spare.is_empty() {
                break;
            }
            match self.device.read(spare, non_blocking) {
                Ok(0) => break,
                Ok(n) => {
                    self.buf.commit(n);
                    filled += n;
                    if allow_less {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        trace!(requested = min, filled, "buffer refilled");
        Ok(filled)
    }

    /// Write the first `count` pending output bytes to the device.
    pub fn flush_through(&mut self, count: usize) -> io::Result<()> {
        let mut left = count.min(self.buf.pending().len());
        let total = left;
        while left > 0 {
            match self.device.write(&self.buf.pending()[..left]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "device accepted no bytes",
                    ));
                }
                Ok(n) => {
                    let n = n.min(left);
                    self.buf.consume_front(n);
                    left -= n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        if total > 0 {
            trace!(flushed = total, "buffer flushed");
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_through(self.buf.pending().len())
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.buf.readable() == 0 && self.fill(1, false)? == 0 {
            return Ok(None);
        }
        Ok(self.buf.next_byte())
    }

    /// Read one whole character, refilling as often as needed when its
    /// bytes straddle the end of the buffer.
    pub fn read_char(&mut self, codec: &dyn CharCodec) -> io::Result<CharRead> {
        let Some(lead) = self.read_byte()? else {
            return Ok(CharRead::Eof);
        };
        let expected = codec.sequence_len(lead);
        if expected == 1 {
            if lead == b'\n' {
                self.line += 1;
            }
            return Ok(CharRead::Char(codec.decode(&[lead])));
        }

        let mut seq = [0u8; MAX_CHAR_BYTES];
        seq[0] = lead;
        let mut got = 1;
        loop {
            let chunk = self.buf.take(expected - got);
            seq[got..got + chunk.len()].copy_from_slice(chunk);
            got += chunk.len();
            if got == expected {
                break;
            }
            if self.fill(expected - got, false)? == 0 {
                return Ok(CharRead::Truncated { expected, got });
            }
        }
        Ok(CharRead::Char(codec.decode(&seq[..expected])))
    }

    /// Read up to `out.len()` bytes. `already` is how many bytes the caller
    /// has delivered for this request from elsewhere; outside fully-buffered
    /// mode the read stops instead of blocking once anything is delivered.
    pub fn read_block(&mut self, out: &mut [u8], already: usize) -> io::Result<usize> {
        let mut n = 0;
        while n < out.len() {
            if self.buf.readable() == 0 {
                if self.buf.mode() != BufferMode::Full && n + already > 0 {
                    break;
                }
                if self.fill(1, false)? == 0 {
                    break;
                }
            }
            let chunk = self.buf.take(out.len() - n);
            out[n..n + chunk.len()].copy_from_slice(chunk);
            n += chunk.len();
        }
        Ok(n)
    }

    /// True if buffered input exists or the device says a read won't block.
    pub fn ready(&mut self) -> io::Result<bool> {
        if self.buf.readable() > 0 {
            return Ok(true);
        }
        match self.device.poll_ready() {
            None => Ok(true),
            Some(r) => Ok(r? == Readiness::Ready),
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn put_byte(&mut self, b: u8) -> io::Result<()> {
        if self.buf.room() == 0 {
            self.flush()?;
        }
        self.buf.push(&[b]);
        if self.buf.mode() == BufferMode::None {
            self.flush()?;
        }
        Ok(())
    }

    /// Write one encoded character; `is_newline` drives the line policy.
    pub fn put_char(&mut self, encoded: &[u8], is_newline: bool) -> io::Result<()> {
        if self.buf.room() < encoded.len() {
            self.flush()?;
        }
        self.buf.push(encoded);
        match self.buf.mode() {
            BufferMode::Line if is_newline => self.flush(),
            BufferMode::None => self.flush(),
            _ => Ok(()),
        }
    }

    pub fn put_block(&mut self, data: &[u8]) -> io::Result<()> {
        let mut rest = data;
        while !rest.is_empty() {
            let pushed = self.buf.push(rest);
            rest = &rest[pushed..];
            if !rest.is_empty() {
                self.flush()?;
            }
        }
        match self.buf.mode() {
            BufferMode::Line => match self.buf.last_newline() {
                Some(i) => self.flush_through(i + 1),
                None => Ok(()),
            },
            BufferMode::None => self.flush(),
            BufferMode::Full => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Seek
    // -----------------------------------------------------------------------

    /// Reposition the device. `pushback` counts bytes the port holds ahead
    /// of the buffer. Returns `None` if the device cannot seek there.
    ///
    /// A zero relative seek only reports the position. A real seek discards
    /// buffered input, or flushes pending output first. A rejected target
    /// leaves the input buffer untouched.
    pub fn seek(&mut self, offset: i64, whence: Whence, pushback: usize) -> io::Result<Option<u64>> {
        if !self.device.is_seekable() {
            return Ok(None);
        }
        let query = offset == 0 && whence == Whence::Current;
        let result = if self.writable {
            if query {
                let pending = self.buf.pending().len() as u64;
                self.device.seek(0, Whence::Current).map(|pos| pos + pending)
            } else {
                self.flush()?;
                debug!(offset, ?whence, "seek after flushing output");
                self.device.seek(offset, whence)
            }
        } else {
            let unread = self.buf.readable() + pushback;
            if query {
                self.device
                    .seek(0, Whence::Current)
                    .map(|pos| pos.saturating_sub(unread as u64))
            } else {
                let offset = if whence == Whence::Current {
                    let Some(adjusted) = i64::try_from(unread)
                        .ok()
                        .and_then(|unread| offset.checked_sub(unread))
                    else {
                        return Ok(None);
                    };
                    adjusted
                } else {
                    offset
                };
                let result = self.device.seek(offset, whence);
                if !matches!(&result, Err(e) if e.kind() == io::ErrorKind::InvalidInput) {
                    debug!(offset, ?whence, discarded = unread, "seek invalidates input buffer");
                    self.buf.invalidate();
                }
                result
            }
        };
        match result {
            Ok(pos) => Ok(Some(pos)),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Utf8;
    use crate::device::{ReadDevice, SeekableDevice};
    use std::io::Cursor;

    /// Device that yields its input in fixed chunks, one per read.
    struct Chunked(Vec<Vec<u8>>);

    impl Device for Chunked {
        fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let chunk = self.0.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }

        fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    fn reader(data: &[u8], mode: BufferMode) -> BufferedBackend {
        BufferedBackend::new(Box::new(ReadDevice(Cursor::new(data.to_vec()))), false, mode, 64)
    }

    #[test]
    fn fill_single_read_outside_full_mode() {
        let dev = Chunked(vec![b"ab".to_vec(), b"cd".to_vec()]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Line, 64);
        assert_eq!(b.fill(4, false).unwrap(), 2);
        assert_eq!(b.fill(4, false).unwrap(), 2);
        assert_eq!(b.fill(4, false).unwrap(), 0);
    }

    #[test]
    fn fill_loops_in_full_mode() {
        let dev = Chunked(vec![b"ab".to_vec(), b"cd".to_vec()]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        assert_eq!(b.fill(4, false).unwrap(), 4);
    }

    #[test]
    fn char_split_across_refills() {
        let euro = "€".as_bytes();
        let dev = Chunked(vec![vec![b'x', euro[0]], euro[1..].to_vec()]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 4);
        assert_eq!(b.read_char(&Utf8).unwrap(), CharRead::Char('x'));
        assert_eq!(b.read_char(&Utf8).unwrap(), CharRead::Char('€'));
        assert_eq!(b.read_char(&Utf8).unwrap(), CharRead::Eof);
    }

    #[test]
    fn truncated_character_reports_counts() {
        let dev = Chunked(vec![vec![0xE2, 0x82]]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 8);
        assert_eq!(
            b.read_char(&Utf8).unwrap(),
            CharRead::Truncated {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn newline_counts_lines() {
        let mut b = reader(b"a\nb\n", BufferMode::Full);
        while b.read_char(&Utf8).unwrap() != CharRead::Eof {}
        assert_eq!(b.line(), 3);
    }

    #[test]
    fn read_block_full_mode_fills_request() {
        let dev = Chunked(vec![b"ab".to_vec(), b"cd".to_vec()]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        let mut out = [0u8; 4];
        assert_eq!(b.read_block(&mut out, 0).unwrap(), 4);
        assert_eq!(&out, b"abcd");
    }

    #[test]
    fn read_block_line_mode_returns_early() {
        let dev = Chunked(vec![b"ab".to_vec(), b"cd".to_vec()]);
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Line, 64);
        let mut out = [0u8; 4];
        assert_eq!(b.read_block(&mut out, 0).unwrap(), 2);
        assert_eq!(b.read_block(&mut out, 1).unwrap(), 0);
    }

    #[test]
    fn input_seek_query_subtracts_unread() {
        let dev = SeekableDevice(Cursor::new(b"0123456789".to_vec()));
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        assert_eq!(b.read_byte().unwrap(), Some(b'0'));
        // Device is at 10; nine bytes are still buffered.
        assert_eq!(b.seek(0, Whence::Current, 0).unwrap(), Some(1));
        assert_eq!(b.seek(0, Whence::Current, 1).unwrap(), Some(0));
        assert_eq!(b.buffered_input(), 9);
    }

    #[test]
    fn input_relative_seek_is_from_logical_position() {
        let dev = SeekableDevice(Cursor::new(b"0123456789".to_vec()));
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        b.read_byte().unwrap();
        assert_eq!(b.seek(2, Whence::Current, 0).unwrap(), Some(3));
        assert_eq!(b.buffered_input(), 0);
        assert_eq!(b.read_byte().unwrap(), Some(b'3'));
    }

    #[test]
    fn overflowing_relative_seek_reports_none() {
        let dev = SeekableDevice(Cursor::new(b"0123456789".to_vec()));
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        b.read_byte().unwrap();
        assert_eq!(b.seek(i64::MIN, Whence::Current, 0).unwrap(), None);
        assert_eq!(b.seek(i64::MIN + 3, Whence::Current, 4).unwrap(), None);
        assert_eq!(b.buffered_input(), 9);
        assert_eq!(b.read_byte().unwrap(), Some(b'1'));
    }

    #[test]
    fn rejected_seek_keeps_buffered_input() {
        let dev = SeekableDevice(Cursor::new(b"0123456789".to_vec()));
        let mut b = BufferedBackend::new(Box::new(dev), false, BufferMode::Full, 64);
        b.read_byte().unwrap();
        assert_eq!(b.seek(-5, Whence::Current, 0).unwrap(), None);
        assert_eq!(b.buffered_input(), 9);
        assert_eq!(b.read_byte().unwrap(), Some(b'1'));
    }

    #[test]
    fn unseekable_device_reports_none() {
        let mut b = reader(b"abc", BufferMode::Full);
        assert_eq!(b.seek(0, Whence::Current, 0).unwrap(), None);
    }

    #[test]
    fn output_seek_query_adds_pending() {
        let dev = SeekableDevice(Cursor::new(Vec::new()));
        let mut b = BufferedBackend::new(Box::new(dev), true, BufferMode::Full, 64);
        b.put_block(b"hello").unwrap();
        assert_eq!(b.seek(0, Whence::Current, 0).unwrap(), Some(5));
        assert_eq!(b.pending_output(), b"hello");
        assert_eq!(b.seek(1, Whence::Start, 0).unwrap(), Some(1));
        assert!(b.pending_output().is_empty());
    }

    #[test]
    fn zero_byte_write_is_an_error() {
        let dev = Chunked(Vec::new());
        let mut b = BufferedBackend::new(Box::new(dev), true, BufferMode::None, 8);
        let err = b.put_byte(b'x').unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
