//! Character encodings.
//!
//! The port layer assumes a self-synchronizing multibyte scheme: the
//! leading byte of a sequence alone determines how many bytes the whole
//! character occupies. Anything satisfying that contract can be plugged in
//! through [`CharCodec`]; [`Utf8`] and [`Latin1`] ship with the crate.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Maximum number of bytes any supported encoding uses for one character.
pub const MAX_CHAR_BYTES: usize = 4;

/// Substitute produced for byte sequences that do not decode.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Encoding table consulted by the character-level port operations.
pub trait CharCodec: fmt::Debug + Send + Sync {
    /// Canonical encoding name.
    fn name(&self) -> &'static str;

    /// Total width in bytes of the sequence introduced by `lead`
    /// (`1..=MAX_CHAR_BYTES`).
    fn sequence_len(&self, lead: u8) -> usize;

    /// Number of bytes `c` occupies once encoded.
    fn encoded_len(&self, c: char) -> usize;

    /// Encode `c` into the front of `out`, returning the byte count.
    ///
    /// `out` must hold at least [`CharCodec::encoded_len`] bytes.
    fn encode(&self, c: char, out: &mut [u8]) -> usize;

    /// Decode one complete sequence. `bytes.len()` equals the
    /// `sequence_len` of its first byte.
    fn decode(&self, bytes: &[u8]) -> char;

    /// Encode a whole string.
    fn encode_str<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        let mut out = Vec::with_capacity(s.len());
        let mut tmp = [0u8; MAX_CHAR_BYTES];
        for c in s.chars() {
            let n = self.encode(c, &mut tmp);
            out.extend_from_slice(&tmp[..n]);
        }
        Cow::Owned(out)
    }
}

/// UTF-8.
///
/// Malformed sequences decode to [`REPLACEMENT_CHAR`]; a stray
/// continuation byte or an impossible lead byte is a one-byte sequence so
/// the stream resynchronizes on the next byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utf8;

impl CharCodec for Utf8 {
    fn name(&self) -> &'static str {
        "utf-8"
    }

    fn sequence_len(&self, lead: u8) -> usize {
        match lead {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        }
    }

    fn encoded_len(&self, c: char) -> usize {
        c.len_utf8()
    }

    fn encode(&self, c: char, out: &mut [u8]) -> usize {
        c.encode_utf8(out).len()
    }

    fn decode(&self, bytes: &[u8]) -> char {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(REPLACEMENT_CHAR)
    }

    fn encode_str<'a>(&self, s: &'a str) -> Cow<'a, [u8]> {
        Cow::Borrowed(s.as_bytes())
    }
}

/// ISO-8859-1. Characters above U+00FF encode as `?`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latin1;

impl CharCodec for Latin1 {
    fn name(&self) -> &'static str {
        "iso-8859-1"
    }

    fn sequence_len(&self, _lead: u8) -> usize {
        1
    }

    fn encoded_len(&self, _c: char) -> usize {
        1
    }

    fn encode(&self, c: char, out: &mut [u8]) -> usize {
        out[0] = u8::try_from(u32::from(c)).unwrap_or(b'?');
        1
    }

    fn decode(&self, bytes: &[u8]) -> char {
        bytes.first().map_or(REPLACEMENT_CHAR, |&b| char::from(b))
    }
}

/// Outcome of reading one character from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharRead {
    Char(char),
    Eof,
    /// Input ended after `got` of the `expected` bytes of a sequence.
    Truncated { expected: usize, got: usize },
}

/// Encodings selectable by name (see [`crate::config`]).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    /// Parse from string (case-insensitive). Unknown names fall back to UTF-8.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Self::Latin1,
            _ => Self::Utf8,
        }
    }

    /// Shared codec instance for this encoding.
    #[must_use]
    pub fn codec(self) -> Arc<dyn CharCodec> {
        match self {
            Self::Utf8 => Arc::new(Utf8),
            Self::Latin1 => Arc::new(Latin1),
        }
    }
}
