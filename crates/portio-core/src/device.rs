//! Raw byte devices underneath buffered ports.
//!
//! The [`Device`] trait abstracts the transport a buffered port refills
//! from and flushes to. The port layer never touches file descriptors or
//! sockets itself; it only calls through this trait. Adapters over
//! `std::io::{Read, Write, Seek}` let any std stream sit under a port.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    /// Convert from the POSIX `SEEK_SET`/`SEEK_CUR`/`SEEK_END` values.
    pub fn from_posix(whence: i32) -> Option<Self> {
        match whence {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }

    pub(crate) fn to_seek_from(self, offset: i64) -> io::Result<SeekFrom> {
        match self {
            Self::Start => u64::try_from(offset).map(SeekFrom::Start).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "negative absolute offset")
            }),
            Self::Current => Ok(SeekFrom::Current(offset)),
            Self::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// Result of a readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A read would not block.
    Ready,
    /// A read would block.
    WouldBlock,
}

/// Byte transport used by buffered ports.
///
/// All methods are synchronous and may block.
pub trait Device: Send {
    /// Read into `buf`, returning the byte count. `0` means end of input.
    ///
    /// With `non_blocking` set the device should return whatever is
    /// immediately available instead of waiting for more.
    fn read(&mut self, buf: &mut [u8], non_blocking: bool) -> io::Result<usize>;

    /// Write from `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Whether [`Device::seek`] is meaningful.
    fn is_seekable(&self) -> bool {
        false
    }

    /// Reposition the device, returning the new absolute offset.
    fn seek(&mut self, _offset: i64, _whence: Whence) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "device is not seekable",
        ))
    }

    /// Readiness probe. `None` means the device has no probe and is treated
    /// as always ready.
    fn poll_ready(&mut self) -> Option<io::Result<Readiness>> {
        None
    }
}

/// Input-only device over any [`Read`].
#[derive(Debug)]
pub struct ReadDevice<R>(pub R);

impl<R: Read + Send> Device for ReadDevice<R> {
    fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        self.0.read(buf)
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "read-only device",
        ))
    }
}

/// Output-only device over any [`Write`].
#[derive(Debug)]
pub struct WriteDevice<W>(pub W);

impl<W: Write + Send> Device for WriteDevice<W> {
    fn read(&mut self, _buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "write-only device",
        ))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write(data)
    }
}

impl<W> WriteDevice<W> {
    pub fn into_inner(self) -> W {
        self.0
    }
}

/// Seekable device over anything that reads, writes and seeks, such as a
/// `std::fs::File` or an `io::Cursor`.
#[derive(Debug)]
pub struct SeekableDevice<T>(pub T);

impl<T: Read + Write + Seek + Send> Device for SeekableDevice<T> {
    fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        self.0.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write(data)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> io::Result<u64> {
        self.0.seek(whence.to_seek_from(offset)?)
    }
}
