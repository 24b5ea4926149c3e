//! Port state and the port operations themselves.
//!
//! Every operation here assumes the caller already holds the port's
//! exclusivity; [`crate::Port`] and [`crate::PortGuard`] take care of that.
//! Each one drains pending pushback first and then dispatches to exactly
//! one backend.

use std::sync::Arc;

use tracing::{debug, error};

use crate::buffer::BufferMode;
use crate::buffered::BufferedBackend;
use crate::codec::{CharCodec, CharRead, MAX_CHAR_BYTES};
use crate::device::Whence;
use crate::error::{PortError, Result};
use crate::memory::MemoryRegion;
use crate::scratch::Scratch;
use crate::virtual_port::VirtualPort;

/// Which way data flows through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Bidirectional,
}

impl Direction {
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::Bidirectional)
    }

    #[must_use]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::Output | Self::Bidirectional)
    }
}

pub(crate) enum Backend {
    Buffered(BufferedBackend),
    Memory(MemoryRegion),
    Virtual(Box<dyn VirtualPort>),
}

pub struct PortState {
    label: Arc<str>,
    direction: Direction,
    closed: bool,
    scratch: Scratch,
    ungotten: Option<char>,
    codec: Arc<dyn CharCodec>,
    backend: Backend,
}

impl std::fmt::Debug for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Buffered(_) => "buffered",
            Backend::Memory(_) => "memory",
            Backend::Virtual(_) => "virtual",
        };
        f.debug_struct("PortState")
            .field("label", &self.label)
            .field("direction", &self.direction)
            .field("closed", &self.closed)
            .field("scratch", &self.scratch.as_slice())
            .field("ungotten", &self.ungotten)
            .field("codec", &self.codec.name())
            .field("backend", &backend)
            .finish()
    }
}

impl PortState {
    pub(crate) fn new(
        label: Arc<str>,
        direction: Direction,
        codec: Arc<dyn CharCodec>,
        backend: Backend,
    ) -> Self {
        Self {
            label,
            direction,
            closed: false,
            scratch: Scratch::new(),
            ungotten: None,
            codec,
            backend,
        }
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    fn check_open(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            return Err(PortError::closed(&self.label, operation));
        }
        Ok(())
    }

    fn check_input(&self, operation: &'static str) -> Result<()> {
        self.check_open(operation)?;
        if !self.direction.is_input() {
            return Err(PortError::unsupported(&self.label, operation));
        }
        Ok(())
    }

    fn check_output(&self, operation: &'static str) -> Result<()> {
        self.check_open(operation)?;
        if !self.direction.is_output() {
            return Err(PortError::unsupported(&self.label, operation));
        }
        Ok(())
    }

    /// Bytes held back from the backend: queued scratch plus the encoded
    /// width of an ungotten character.
    fn pushback_len(&self) -> usize {
        self.scratch.len() + self.ungotten.map_or(0, |c| self.codec.encoded_len(c))
    }

    /// Turn an ungotten character into scratch bytes so byte-granularity
    /// operations can see it.
    fn materialize_ungotten(&mut self) {
        if let Some(c) = self.ungotten.take() {
            let mut tmp = [0u8; MAX_CHAR_BYTES];
            let n = self.codec.encode(c, &mut tmp);
            self.scratch.extend(&tmp[..n]);
        }
    }

    fn clear_pushback(&mut self) {
        self.scratch.clear();
        self.ungotten = None;
    }

    fn truncated(&mut self, expected: usize, got: usize) -> PortError {
        self.scratch.clear();
        error!(port = %self.label, expected, got, "input ended inside a multibyte character");
        PortError::TruncatedEncoding {
            port: self.label.to_string(),
            expected,
            got,
        }
    }

    /// One byte straight from the backend, bypassing pushback.
    fn backend_byte(&mut self) -> Result<Option<u8>> {
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.read_byte()?),
            Backend::Memory(m) => Ok(m.next_byte()),
            Backend::Virtual(v) => v.get_byte(),
        }
    }

    // -----------------------------------------------------------------------
    // Byte primitives
    // -----------------------------------------------------------------------

    pub fn get_byte(&mut self) -> Result<Option<u8>> {
        self.check_input("read-byte")?;
        self.materialize_ungotten();
        if let Some(b) = self.scratch.pop_front() {
            return Ok(Some(b));
        }
        self.backend_byte()
    }

    pub fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.check_output("write-byte")?;
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.put_byte(byte)?),
            Backend::Memory(m) => {
                m.append(&[byte]);
                Ok(())
            }
            Backend::Virtual(v) => v.put_byte(byte),
        }
    }

    // -----------------------------------------------------------------------
    // Character primitives
    // -----------------------------------------------------------------------

    pub fn get_char(&mut self) -> Result<Option<char>> {
        self.check_input("read-char")?;
        if !self.scratch.is_empty() {
            return self.char_from_scratch().map(Some);
        }
        if let Some(c) = self.ungotten.take() {
            return Ok(Some(c));
        }
        let read = match &mut self.backend {
            Backend::Buffered(b) => b.read_char(self.codec.as_ref())?,
            Backend::Memory(m) => m.read_char(self.codec.as_ref()),
            Backend::Virtual(v) => return v.get_char(),
        };
        match read {
            CharRead::Char(c) => Ok(Some(c)),
            CharRead::Eof => Ok(None),
            CharRead::Truncated { expected, got } => Err(self.truncated(expected, got)),
        }
    }

    /// Complete the partial sequence at the front of scratch, pulling the
    /// missing bytes from the backend. Bytes after it stay queued.
    fn char_from_scratch(&mut self) -> Result<char> {
        let lead = self.scratch.front().unwrap_or_default();
        let expected = self.codec.sequence_len(lead);
        while self.scratch.len() < expected {
            match self.backend_byte()? {
                Some(b) => {
                    self.scratch.push_back(b);
                }
                None => {
                    let got = self.scratch.len();
                    return Err(self.truncated(expected, got));
                }
            }
        }
        let mut seq = [0u8; MAX_CHAR_BYTES];
        let n = self.scratch.drain_into(&mut seq[..expected]);
        Ok(self.codec.decode(&seq[..n]))
    }

    pub fn put_char(&mut self, c: char) -> Result<()> {
        self.check_output("write-char")?;
        match &mut self.backend {
            Backend::Buffered(b) => {
                let mut tmp = [0u8; MAX_CHAR_BYTES];
                let n = self.codec.encode(c, &mut tmp);
                Ok(b.put_char(&tmp[..n], c == '\n')?)
            }
            Backend::Memory(m) => {
                let mut tmp = [0u8; MAX_CHAR_BYTES];
                let n = self.codec.encode(c, &mut tmp);
                m.append(&tmp[..n]);
                Ok(())
            }
            Backend::Virtual(v) => v.put_char(c),
        }
    }

    // -----------------------------------------------------------------------
    // Block transfer
    // -----------------------------------------------------------------------

    /// Read up to `out.len()` bytes. `None` only when nothing was available.
    /// A virtual backend claiming more bytes than it was given is an I/O
    /// error.
    pub fn get_block(&mut self, out: &mut [u8]) -> Result<Option<usize>> {
        self.check_input("read-block")?;
        if out.is_empty() {
            return Err(PortError::EmptyRequest {
                port: self.label.to_string(),
            });
        }
        self.materialize_ungotten();
        let from_pushback = self.scratch.drain_into(out);
        if from_pushback == out.len() {
            return Ok(Some(from_pushback));
        }
        let rest = &mut out[from_pushback..];
        let from_backend = match &mut self.backend {
            Backend::Buffered(b) => b.read_block(rest, from_pushback)?,
            Backend::Memory(m) => m.read_block(rest),
            Backend::Virtual(v) => {
                let n = v.get_block(rest)?;
                if n > rest.len() {
                    return Err(PortError::Io {
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!(
                                "virtual port reported {n} bytes for a {}-byte block",
                                rest.len()
                            ),
                        ),
                    });
                }
                n
            }
        };
        let total = from_pushback + from_backend;
        Ok((total > 0).then_some(total))
    }

    pub fn put_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.check_output("write-block")?;
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.put_block(data)?),
            Backend::Memory(m) => {
                m.append(data);
                Ok(())
            }
            Backend::Virtual(v) => v.put_block(data),
        }
    }

    pub fn put_str(&mut self, s: &str) -> Result<()> {
        self.check_output("write-string")?;
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.put_block(&self.codec.encode_str(s))?),
            Backend::Memory(m) => {
                m.append(&self.codec.encode_str(s));
                Ok(())
            }
            Backend::Virtual(v) => v.put_string(s),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.check_open("flush")?;
        if !self.direction.is_output() {
            return Ok(());
        }
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.flush()?),
            Backend::Memory(_) => Ok(()),
            Backend::Virtual(v) => v.flush(),
        }
    }

    // -----------------------------------------------------------------------
    // Lines
    // -----------------------------------------------------------------------

    /// Read up to the next line terminator (LF, CR LF or a lone CR), which
    /// is not included.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        self.check_input("read-line")?;
        let mut line = String::new();
        loop {
            match self.get_char()? {
                None => return Ok((!line.is_empty()).then_some(line)),
                Some('\n') => return Ok(Some(line)),
                Some('\r') => {
                    match self.get_char()? {
                        None | Some('\n') => {}
                        Some(c) => self.unget_char(c)?,
                    }
                    return Ok(Some(line));
                }
                Some(c) => line.push(c),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pushback
    // -----------------------------------------------------------------------

    pub fn unget_char(&mut self, c: char) -> Result<()> {
        self.check_input("unread-char")?;
        if self.ungotten.is_some() {
            return Err(PortError::overflow(&self.label));
        }
        if self.scratch.is_empty() {
            self.ungotten = Some(c);
            return Ok(());
        }
        let mut tmp = [0u8; MAX_CHAR_BYTES];
        let n = self.codec.encode(c, &mut tmp);
        if !self.scratch.prepend(&tmp[..n]) {
            return Err(PortError::overflow(&self.label));
        }
        Ok(())
    }

    pub fn peek_char(&mut self) -> Result<Option<char>> {
        self.check_input("peek-char")?;
        if let Some(c) = self.ungotten {
            return Ok(Some(c));
        }
        let c = self.get_char()?;
        if let Some(c) = c {
            self.unget_char(c)?;
        }
        Ok(c)
    }

    pub fn unget_byte(&mut self, byte: u8) -> Result<()> {
        self.check_input("unread-byte")?;
        self.materialize_ungotten();
        if !self.scratch.push_front(byte) {
            return Err(PortError::overflow(&self.label));
        }
        Ok(())
    }

    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        self.check_input("peek-byte")?;
        self.materialize_ungotten();
        if let Some(b) = self.scratch.front() {
            return Ok(Some(b));
        }
        let b = self.backend_byte()?;
        if let Some(b) = b {
            self.scratch.push_back(b);
        }
        Ok(b)
    }

    // -----------------------------------------------------------------------
    // Readiness and positioning
    // -----------------------------------------------------------------------

    pub fn is_ready(&mut self) -> Result<bool> {
        self.check_input("char-ready")?;
        if !self.scratch.is_empty() || self.ungotten.is_some() {
            return Ok(true);
        }
        match &mut self.backend {
            Backend::Buffered(b) => Ok(b.ready()?),
            Backend::Memory(_) => Ok(true),
            Backend::Virtual(v) => v.ready(),
        }
    }

    /// Reposition the port. `Ok(None)` means the backend cannot seek there.
    ///
    /// A zero offset relative to the current position only reports where
    /// the port is; any other seek discards pushback once it succeeds, or
    /// once a buffered device fails it. An offset that cannot be adjusted
    /// for pushback without overflowing reports `Ok(None)`.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<Option<u64>> {
        self.check_open("seek")?;
        let pushback = self.pushback_len();
        let query = offset == 0 && whence == Whence::Current;
        let writable = self.direction.is_output();
        let pos = match &mut self.backend {
            Backend::Buffered(b) => match b.seek(offset, whence, pushback) {
                Ok(pos) => pos,
                Err(e) => {
                    // Buffered input is gone; pushback must go with it.
                    if !query {
                        self.clear_pushback();
                    }
                    return Err(e.into());
                }
            },
            Backend::Memory(m) => m.seek(offset, whence, pushback, writable),
            Backend::Virtual(v) => {
                let adjusted = if whence == Whence::Current && !query {
                    let Some(adjusted) = i64::try_from(pushback)
                        .ok()
                        .and_then(|pushback| offset.checked_sub(pushback))
                    else {
                        return Ok(None);
                    };
                    adjusted
                } else {
                    offset
                };
                match v.seek(adjusted, whence) {
                    None => None,
                    Some(r) => Some(r?).map(|pos| {
                        if query {
                            pos.saturating_sub(pushback as u64)
                        } else {
                            pos
                        }
                    }),
                }
            }
        };
        if pos.is_some() && !query {
            debug!(port = %self.label, offset, ?whence, "seek discards pushback");
            self.clear_pushback();
        }
        Ok(pos)
    }

    pub fn tell(&mut self) -> Result<Option<u64>> {
        self.seek(0, Whence::Current)
    }

    /// Flush pending output and mark the port closed. Closing twice is a
    /// no-op. The port is closed even if the final flush fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let flushed = if self.direction.is_output() {
            match &mut self.backend {
                Backend::Buffered(b) => b.flush().map_err(PortError::from),
                Backend::Memory(_) => Ok(()),
                Backend::Virtual(v) => v.flush(),
            }
        } else {
            Ok(())
        };
        self.closed = true;
        self.clear_pushback();
        debug!(port = %self.label, "port closed");
        flushed
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn is_closed(&mut self) -> Result<bool> {
        Ok(self.closed)
    }

    pub fn set_codec(&mut self, codec: Arc<dyn CharCodec>) -> Result<()> {
        self.codec = codec;
        Ok(())
    }

    pub fn codec_name(&mut self) -> Result<&'static str> {
        Ok(self.codec.name())
    }

    /// Change the flush policy of a buffered port.
    pub fn set_buffer_mode(&mut self, mode: BufferMode) -> Result<()> {
        match &mut self.backend {
            Backend::Buffered(b) => {
                b.set_mode(mode);
                Ok(())
            }
            _ => Err(PortError::unsupported(&self.label, "set-buffer-mode")),
        }
    }

    pub fn buffer_mode(&mut self) -> Result<Option<BufferMode>> {
        Ok(match &self.backend {
            Backend::Buffered(b) => Some(b.mode()),
            _ => None,
        })
    }

    /// Line number of a buffered input port, counted from 1.
    pub fn line_number(&mut self) -> Result<Option<u64>> {
        Ok(match &self.backend {
            Backend::Buffered(b) => Some(b.line()),
            _ => None,
        })
    }

    /// Bytes written so far to an in-memory output port.
    pub fn output_contents(&mut self) -> Result<Vec<u8>> {
        match &self.backend {
            Backend::Memory(m) if self.direction.is_output() => Ok(m.contents().to_vec()),
            _ => Err(PortError::unsupported(&self.label, "get-output-bytes")),
        }
    }

    /// Output so far decoded with the port's codec.
    pub fn output_string(&mut self) -> Result<String> {
        let bytes = self.output_contents()?;
        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        while let Some(&lead) = rest.first() {
            let n = self.codec.sequence_len(lead).min(rest.len());
            out.push(self.codec.decode(&rest[..n]));
            rest = &rest[n..];
        }
        Ok(out)
    }

    /// Take everything written so far, leaving the output port empty.
    pub fn take_output(&mut self) -> Result<Vec<u8>> {
        match &mut self.backend {
            Backend::Memory(m) if self.direction.is_output() => Ok(m.take_contents()),
            _ => Err(PortError::unsupported(&self.label, "get-output-bytes")),
        }
    }
}
