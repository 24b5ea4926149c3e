#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use portio_core::{Device, Readiness};

/// Input device that yields one scripted chunk per read.
pub struct ChunkedDevice {
    chunks: VecDeque<Vec<u8>>,
    pub readiness: Option<Readiness>,
}

impl ChunkedDevice {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            readiness: None,
        }
    }

    /// Split `data` into chunks of the given sizes (cycled).
    pub fn split(data: &[u8], sizes: &[usize]) -> Self {
        let mut chunks = Vec::new();
        let mut rest = data;
        let mut i = 0;
        while !rest.is_empty() {
            let n = sizes[i % sizes.len()].clamp(1, rest.len());
            chunks.push(rest[..n].to_vec());
            rest = &rest[n..];
            i += 1;
        }
        Self::new(chunks)
    }
}

impl Device for ChunkedDevice {
    fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "input only"))
    }

    fn poll_ready(&mut self) -> Option<io::Result<Readiness>> {
        self.readiness.map(Ok)
    }
}

/// Output device that records each write call.
#[derive(Clone, Default)]
pub struct RecordingDevice {
    pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingDevice {
    pub fn written(&self) -> Vec<u8> {
        self.writes.lock().unwrap().concat()
    }

    pub fn write_calls(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl Device for RecordingDevice {
    fn read(&mut self, _buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "output only"))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }
}
