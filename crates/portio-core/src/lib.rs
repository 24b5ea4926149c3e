//! # portio-core
//!
//! A unified port I/O layer. One set of operations (byte, character and
//! block transfer, line reading, pushback, readiness, seeking) works the
//! same over three backends:
//!
//! - buffered streams over a [`Device`],
//! - in-memory byte regions,
//! - caller-defined [`VirtualPort`] implementations.
//!
//! Multibyte characters are decoded correctly even when their bytes
//! straddle a buffer refill. Ports are safe to share between threads and
//! re-entrant on the thread that holds them.

#![deny(unsafe_code)]

pub mod buffer;
pub mod buffered;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
mod macros;
pub mod memory;
pub mod port;
pub mod scratch;
mod state;
pub mod virtual_port;

pub use buffer::{BUFSIZ, BufferMode};
pub use codec::{CharCodec, Encoding, Latin1, MAX_CHAR_BYTES, Utf8};
pub use config::{PortConfig, default_config};
pub use device::{Device, ReadDevice, Readiness, SeekableDevice, Whence, WriteDevice};
pub use error::{PortError, Result};
pub use port::{Port, PortGuard};
pub use state::Direction;
pub use virtual_port::VirtualPort;
