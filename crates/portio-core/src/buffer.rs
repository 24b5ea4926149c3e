//! Buffered stream engine.
//!
//! One fixed-capacity byte buffer with `start <= current <= end <= capacity`
//! cursors (`start` is always index 0). The same buffer serves either
//! direction:
//!
//! - input: unread bytes live in `[current, end)`
//! - output: pending bytes live in `[start, current)`
//!
//! Three buffering modes govern when output is flushed: fully-buffered,
//! line-buffered and unbuffered.

use crate::codec::MAX_CHAR_BYTES;

/// Default buffer size.
pub const BUFSIZ: usize = 8192;

/// Buffering mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BufferMode {
    /// Flush when the buffer is full.
    #[default]
    Full,
    /// Flush on line feed or when the buffer is full.
    Line,
    /// Flush after every write.
    None,
}

impl BufferMode {
    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "block" | "fbf" => Some(Self::Full),
            "line" | "lbf" => Some(Self::Line),
            "none" | "unbuffered" | "nbf" => Some(Self::None),
            _ => Option::None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Line => "line",
            Self::None => "none",
        }
    }
}

/// Cursor-tracked byte buffer.
///
/// Invariants:
/// - `current <= end <= data.len()`
/// - `data.len() >= MAX_CHAR_BYTES` (a whole character always fits)
#[derive(Debug)]
pub struct StreamBuffer {
    data: Vec<u8>,
    current: usize,
    end: usize,
    mode: BufferMode,
}

impl StreamBuffer {
    /// Create a buffer. Capacity is raised to [`MAX_CHAR_BYTES`] if smaller.
    pub fn new(mode: BufferMode, capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(MAX_CHAR_BYTES)],
            current: 0,
            end: 0,
            mode,
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// Change the flush policy. Buffered contents are kept.
    pub fn set_mode(&mut self, mode: BufferMode) {
        self.mode = mode;
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    // -----------------------------------------------------------------------
    // Read-side operations
    // -----------------------------------------------------------------------

    /// Number of buffered bytes available for reading.
    pub fn readable(&self) -> usize {
        self.end - self.current
    }

    /// Unread bytes.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.current..self.end]
    }

    /// Consume up to `count` unread bytes.
    pub fn take(&mut self, count: usize) -> &[u8] {
        let take = count.min(self.readable());
        let start = self.current;
        self.current += take;
        &self.data[start..start + take]
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.data[self.current..self.end].first().copied()?;
        self.current += 1;
        Some(b)
    }

    /// Move unread bytes to the front so the tail is free for a refill.
    pub fn compact(&mut self) {
        if self.current > 0 {
            self.data.copy_within(self.current..self.end, 0);
            self.end -= self.current;
            self.current = 0;
        }
    }

    /// Free space after `end`, for a device read to land in.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.end..]
    }

    /// Mark `n` bytes written into [`Self::spare_mut`] as readable.
    pub fn commit(&mut self, n: usize) {
        self.end = (self.end + n).min(self.data.len());
    }

    /// Discard every buffered byte in either direction.
    pub fn invalidate(&mut self) {
        self.current = 0;
        self.end = 0;
    }

    // -----------------------------------------------------------------------
    // Write-side operations
    // -----------------------------------------------------------------------

    /// Free bytes left for output.
    pub fn room(&self) -> usize {
        self.data.len() - self.current
    }

    /// Buffer as much of `bytes` as fits, returning how many were taken.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.room());
        self.data[self.current..self.current + take].copy_from_slice(&bytes[..take]);
        self.current += take;
        take
    }

    /// Pending output, oldest first.
    pub fn pending(&self) -> &[u8] {
        &self.data[..self.current]
    }

    /// Drop `n` bytes from the front of pending output once written.
    pub fn consume_front(&mut self, n: usize) {
        let n = n.min(self.current);
        self.data.copy_within(n..self.current, 0);
        self.current -= n;
    }

    /// Index of the most recent line feed in pending output.
    pub fn last_newline(&self) -> Option<usize> {
        self.pending().iter().rposition(|&b| b == b'\n')
    }
}
