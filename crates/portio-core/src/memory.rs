//! In-memory byte regions.
//!
//! An input region reads a fixed extent with no refill; reaching the end is
//! end of input. An output region appends to a growable store whose
//! contents can be taken back out as bytes or as a string.

use crate::codec::{CharCodec, CharRead};
use crate::device::Whence;

#[derive(Debug, Clone, Default)]
pub struct MemoryRegion {
    data: Vec<u8>,
    current: usize,
}

impl MemoryRegion {
    /// Region reading `data` from its first byte.
    pub fn input(data: Vec<u8>) -> Self {
        Self { data, current: 0 }
    }

    /// Empty growable output region.
    pub fn output() -> Self {
        Self::default()
    }

    /// Total bytes in the region.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cursor offset from the region start.
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.current
    }

    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.data.get(self.current).copied()?;
        self.current += 1;
        Some(b)
    }

    /// Copy `min(out.len(), remaining)` bytes.
    pub fn read_block(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.data[self.current..self.current + n]);
        self.current += n;
        n
    }

    /// Decode one character. A sequence cut off by the region end consumes
    /// the remaining bytes and reports truncation.
    pub fn read_char(&mut self, codec: &dyn CharCodec) -> CharRead {
        let Some(lead) = self.data.get(self.current).copied() else {
            return CharRead::Eof;
        };
        let expected = codec.sequence_len(lead);
        let available = self.remaining();
        if available < expected {
            self.current = self.data.len();
            return CharRead::Truncated {
                expected,
                got: available,
            };
        }
        let c = codec.decode(&self.data[self.current..self.current + expected]);
        self.current += expected;
        CharRead::Char(c)
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.current = self.data.len();
    }

    /// Everything written so far.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Take the accumulated bytes, leaving the region empty.
    pub fn take_contents(&mut self) -> Vec<u8> {
        self.current = 0;
        std::mem::take(&mut self.data)
    }

    /// Seek within the region.
    ///
    /// `pushback` is the count of bytes handed back to the port but not yet
    /// re-read; positions are reported net of them. Output regions answer
    /// a position query with their size and refuse any real seek. Input
    /// regions refuse targets outside `[0, len]`.
    pub fn seek(
        &mut self,
        offset: i64,
        whence: Whence,
        pushback: usize,
        writable: bool,
    ) -> Option<u64> {
        let query = offset == 0 && whence == Whence::Current;
        if writable {
            return query.then(|| self.data.len() as u64);
        }
        let logical = self.current.saturating_sub(pushback);
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => logical,
            Whence::End => self.data.len(),
        };
        let target = i64::try_from(base).ok()?.checked_add(offset)?;
        let target = usize::try_from(target).ok()?;
        if target > self.data.len() {
            return None;
        }
        if !query {
            self.current = target;
        }
        Some(target as u64)
    }
}
