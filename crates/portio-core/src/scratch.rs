//! Pushback scratch storage.
//!
//! A bounded front-evicting byte queue holding at most one encoded
//! character. Reads pop from the front; pushback prepends.
//!
//! Invariant: `len <= MAX_CHAR_BYTES`.

use crate::codec::MAX_CHAR_BYTES;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scratch {
    bytes: [u8; MAX_CHAR_BYTES],
    len: usize,
}

impl Scratch {
    /// Fixed capacity in bytes.
    pub const CAPACITY: usize = MAX_CHAR_BYTES;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_CHAR_BYTES],
            len: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be queued.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        Self::CAPACITY - self.len
    }

    /// Queued bytes, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[must_use]
    pub fn front(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    pub fn pop_front(&mut self) -> Option<u8> {
        let b = self.front()?;
        self.bytes.copy_within(1..self.len, 0);
        self.len -= 1;
        Some(b)
    }

    /// Append at the back. Returns `false` if full.
    pub fn push_back(&mut self, b: u8) -> bool {
        if self.len == Self::CAPACITY {
            return false;
        }
        self.bytes[self.len] = b;
        self.len += 1;
        true
    }

    /// Append as many of `bytes` as fit, returning how many were taken.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.remaining());
        self.bytes[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        take
    }

    /// Insert `bytes` ahead of everything queued. All-or-nothing.
    pub fn prepend(&mut self, bytes: &[u8]) -> bool {
        let n = bytes.len();
        if n > self.remaining() {
            return false;
        }
        self.bytes.copy_within(0..self.len, n);
        self.bytes[..n].copy_from_slice(bytes);
        self.len += n;
        true
    }

    pub fn push_front(&mut self, b: u8) -> bool {
        self.prepend(&[b])
    }

    /// Move up to `out.len()` queued bytes into `out`, oldest first.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        out[..n].copy_from_slice(&self.bytes[..n]);
        self.bytes.copy_within(n..self.len, 0);
        self.len -= n;
        n
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fifo_order() {
        let mut s = Scratch::new();
        assert!(s.push_back(1));
        assert!(s.push_back(2));
        assert_eq!(s.pop_front(), Some(1));
        assert_eq!(s.pop_front(), Some(2));
        assert_eq!(s.pop_front(), None);
    }

    #[test]
    fn capacity_is_one_character() {
        let mut s = Scratch::new();
        assert_eq!(s.extend(&[1, 2, 3, 4, 5]), 4);
        assert!(!s.push_back(6));
        assert!(!s.push_front(0));
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn prepend_keeps_existing_bytes_behind() {
        let mut s = Scratch::new();
        s.extend(&[3, 4]);
        assert!(s.prepend(&[1, 2]));
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);
        assert!(!s.prepend(&[0]));
    }

    #[test]
    fn drain_partial() {
        let mut s = Scratch::new();
        s.extend(&[9, 8, 7]);
        let mut out = [0u8; 2];
        assert_eq!(s.drain_into(&mut out), 2);
        assert_eq!(out, [9, 8]);
        assert_eq!(s.as_slice(), &[7]);
    }

    proptest! {
        #[test]
        fn prop_push_front_then_pop_returns_byte(
            existing in proptest::collection::vec(any::<u8>(), 0..Scratch::CAPACITY),
            b in any::<u8>(),
        ) {
            let mut s = Scratch::new();
            s.extend(&existing);
            prop_assert!(s.push_front(b));
            prop_assert_eq!(s.pop_front(), Some(b));
            prop_assert_eq!(s.as_slice(), existing.as_slice());
        }
    }
}
