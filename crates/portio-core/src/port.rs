//! Ports and their two entry forms.
//!
//! A [`Port`] owns its state behind a re-entrant lock. Each operation on
//! `Port` acquires the lock for the duration of the call; the same
//! operation on a [`PortGuard`] (from [`Port::lock`]) runs under a lock the
//! caller already holds, so several primitives can be batched under one
//! acquisition. A thread that already holds a port's lock can still call
//! the acquiring forms: acquisition short-circuits instead of deadlocking.
//!
//! The lock is released when the guard drops, so every exit path,
//! including an error return, leaves the port acquirable.

use std::cell::{RefCell, RefMut};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::buffer::BufferMode;
use crate::buffered::BufferedBackend;
use crate::codec::{CharCodec, Encoding};
use crate::config::PortConfig;
use crate::device::{Device, Whence};
use crate::error::{PortError, Result};
use crate::macros::port_operations;
use crate::memory::MemoryRegion;
use crate::state::{Backend, Direction, PortState};
use crate::virtual_port::VirtualPort;

/// A port over one of the buffered, in-memory or virtual backends.
///
/// `Port` is `Send + Sync`; share it across threads with an `Arc`.
pub struct Port {
    label: Arc<str>,
    direction: Direction,
    inner: ReentrantMutex<RefCell<PortState>>,
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("label", &self.label)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a port, held until dropped.
pub struct PortGuard<'a> {
    label: &'a str,
    guard: ReentrantMutexGuard<'a, RefCell<PortState>>,
}

impl Port {
    fn from_parts(
        label: Arc<str>,
        direction: Direction,
        codec: Arc<dyn CharCodec>,
        backend: Backend,
    ) -> Self {
        let state = PortState::new(Arc::clone(&label), direction, codec, backend);
        Self {
            label,
            direction,
            inner: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    /// Buffered port over `device`. Buffered ports move data one way only;
    /// `Direction::Bidirectional` is rejected.
    pub fn buffered(
        label: impl Into<Arc<str>>,
        device: impl Device + 'static,
        direction: Direction,
        config: &PortConfig,
    ) -> Result<Self> {
        let label = label.into();
        if direction == Direction::Bidirectional {
            return Err(PortError::unsupported(&label, "bidirectional buffering"));
        }
        let backend = BufferedBackend::new(
            Box::new(device),
            direction.is_output(),
            config.buffer_mode,
            config.buffer_size,
        );
        Ok(Self::from_parts(
            label,
            direction,
            config.encoding.codec(),
            Backend::Buffered(backend),
        ))
    }

    /// Input port reading `data`.
    pub fn input_bytes(label: impl Into<Arc<str>>, data: impl Into<Vec<u8>>) -> Self {
        Self::from_parts(
            label.into(),
            Direction::Input,
            Encoding::Utf8.codec(),
            Backend::Memory(MemoryRegion::input(data.into())),
        )
    }

    /// Input port reading the UTF-8 bytes of `s`.
    pub fn input_string(label: impl Into<Arc<str>>, s: &str) -> Self {
        Self::input_bytes(label, s.as_bytes())
    }

    /// Output port accumulating into memory.
    pub fn output_bytes(label: impl Into<Arc<str>>) -> Self {
        Self::from_parts(
            label.into(),
            Direction::Output,
            Encoding::Utf8.codec(),
            Backend::Memory(MemoryRegion::output()),
        )
    }

    /// Port delegating every primitive to `backend`.
    pub fn virtual_port(
        label: impl Into<Arc<str>>,
        direction: Direction,
        backend: impl VirtualPort + 'static,
    ) -> Self {
        Self::from_parts(
            label.into(),
            direction,
            Encoding::Utf8.codec(),
            Backend::Virtual(Box::new(backend)),
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Acquire exclusive access, blocking while another thread holds it.
    /// Re-entrant on the owning thread.
    pub fn lock(&self) -> PortGuard<'_> {
        PortGuard {
            label: &self.label,
            guard: self.inner.lock(),
        }
    }

    /// Like [`Port::lock`] but returns `None` instead of blocking.
    pub fn try_lock(&self) -> Option<PortGuard<'_>> {
        self.inner.try_lock().map(|guard| PortGuard {
            label: &self.label,
            guard,
        })
    }
}

impl PortGuard<'_> {
    /// Borrow the state for one operation. Fails if a backend callback
    /// re-entered the port while an operation on it is still running.
    fn state(&self) -> Result<RefMut<'_, PortState>> {
        self.guard.try_borrow_mut().map_err(|_| PortError::Reentered {
            port: self.label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        self.label
    }
}

port_operations! {
    /// Next byte, or `None` at end of input.
    fn get_byte(&mut self) -> Option<u8>;

    /// Next character, or `None` at end of input.
    fn get_char(&mut self) -> Option<char>;

    /// Read up to `out.len()` bytes. Never returns `Some(0)`.
    fn get_block(&mut self, out: &mut [u8]) -> Option<usize>;

    /// Next line without its terminator.
    fn read_line(&mut self) -> Option<String>;

    fn unget_char(&mut self, c: char) -> ();
    fn unget_byte(&mut self, byte: u8) -> ();

    /// Next character without consuming it.
    fn peek_char(&mut self) -> Option<char>;

    /// Next byte without consuming it.
    fn peek_byte(&mut self) -> Option<u8>;

    fn put_byte(&mut self, byte: u8) -> ();
    fn put_char(&mut self, c: char) -> ();
    fn put_str(&mut self, s: &str) -> ();
    fn put_bytes(&mut self, data: &[u8]) -> ();
    fn flush(&mut self) -> ();

    /// Whether a character read would not block.
    fn is_ready(&mut self) -> bool;

    /// Reposition. `None` means the port cannot seek there.
    fn seek(&mut self, offset: i64, whence: Whence) -> Option<u64>;

    /// Current position, if the port has one.
    fn tell(&mut self) -> Option<u64>;

    fn close(&mut self) -> ();
    fn is_closed(&mut self) -> bool;
    fn set_codec(&mut self, codec: Arc<dyn CharCodec>) -> ();
    fn codec_name(&mut self) -> &'static str;
    fn set_buffer_mode(&mut self, mode: BufferMode) -> ();
    fn buffer_mode(&mut self) -> Option<BufferMode>;
    fn line_number(&mut self) -> Option<u64>;

    /// Bytes written so far to an in-memory output port.
    fn output_contents(&mut self) -> Vec<u8>;

    /// Output so far, decoded.
    fn output_string(&mut self) -> String;

    /// Take the output so far, leaving the port empty.
    fn take_output(&mut self) -> Vec<u8>;
}
