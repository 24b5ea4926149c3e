#![no_main]
use std::io::{self, Cursor};

use libfuzzer_sys::fuzz_target;
use portio_core::{BufferMode, Device, Direction, Port, PortConfig, ReadDevice};

/// Hands out the input in reads of at most `step` bytes.
struct Trickle {
    inner: Cursor<Vec<u8>>,
    step: usize,
}

impl Device for Trickle {
    fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        let n = buf.len().min(self.step);
        io::Read::read(&mut self.inner, &mut buf[..n])
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

// Decoding through arbitrarily split refills must agree with decoding the
// whole input from memory.
fuzz_target!(|data: &[u8]| {
    let Some((&step, input)) = data.split_first() else {
        return;
    };
    let step = usize::from(step % 7) + 1;
    let mode = if step % 2 == 0 { BufferMode::Line } else { BufferMode::Full };
    let config = PortConfig::new(4 + usize::from(step), mode);

    let Ok(split) = Port::buffered(
        "fuzz-split",
        Trickle { inner: Cursor::new(input.to_vec()), step },
        Direction::Input,
        &config,
    ) else {
        return;
    };
    let whole = Port::input_bytes("fuzz-whole", input.to_vec());

    loop {
        let a = split.get_char().map_err(|e| e.is_fatal());
        let b = whole.get_char().map_err(|e| e.is_fatal());
        assert_eq!(a, b);
        if !matches!(a, Ok(Some(_))) {
            break;
        }
    }

    // Plain reader adapter, whole input in one read.
    let Ok(plain) = Port::buffered(
        "fuzz-plain",
        ReadDevice(Cursor::new(input.to_vec())),
        Direction::Input,
        &PortConfig::default(),
    ) else {
        return;
    };
    while let Ok(Some(_)) = plain.read_line() {}
});
