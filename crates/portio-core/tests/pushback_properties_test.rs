mod common;

use common::ChunkedDevice;
use portio_core::{BufferMode, Direction, Port, PortConfig};
use proptest::prelude::*;

fn mode_strategy() -> impl Strategy<Value = BufferMode> {
    prop_oneof![
        Just(BufferMode::Full),
        Just(BufferMode::Line),
        Just(BufferMode::None),
    ]
}

fn split_port(text: &str, sizes: &[usize], mode: BufferMode, capacity: usize) -> Port {
    Port::buffered(
        "split",
        ChunkedDevice::split(text.as_bytes(), sizes),
        Direction::Input,
        &PortConfig::new(capacity, mode),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_unget_byte_then_get_byte(text in ".{0,16}", b in any::<u8>()) {
        let port = Port::input_string("in", &text);
        port.unget_byte(b).unwrap();
        prop_assert_eq!(port.peek_byte().unwrap(), Some(b));
        prop_assert_eq!(port.get_byte().unwrap(), Some(b));
        prop_assert_eq!(port.get_byte().unwrap(), text.as_bytes().first().copied());
    }

    #[test]
    fn prop_unget_char_then_get_char(text in ".{0,16}", c in any::<char>()) {
        let port = Port::input_string("in", &text);
        port.unget_char(c).unwrap();
        prop_assert_eq!(port.peek_char().unwrap(), Some(c));
        prop_assert_eq!(port.peek_char().unwrap(), Some(c));
        prop_assert_eq!(port.get_char().unwrap(), Some(c));
        prop_assert_eq!(port.get_char().unwrap(), text.chars().next());
    }

    #[test]
    fn prop_chunked_decoding_matches_str_chars(
        text in ".{0,48}",
        sizes in proptest::collection::vec(1usize..6, 1..8),
        mode in mode_strategy(),
        capacity in 4usize..16,
    ) {
        let port = split_port(&text, &sizes, mode, capacity);
        let mut decoded = String::new();
        while let Some(c) = port.get_char().unwrap() {
            decoded.push(c);
        }
        prop_assert_eq!(decoded, text);
    }

    #[test]
    fn prop_get_block_never_yields_zero(
        text in ".{0,48}",
        sizes in proptest::collection::vec(1usize..6, 1..8),
        mode in mode_strategy(),
        request in 1usize..10,
    ) {
        let port = split_port(&text, &sizes, mode, 8);
        let mut collected = Vec::new();
        let mut buf = vec![0u8; request];
        while let Some(n) = port.get_block(&mut buf).unwrap() {
            prop_assert!(n > 0 && n <= request);
            collected.extend_from_slice(&buf[..n]);
        }
        prop_assert_eq!(collected, text.as_bytes());
    }

    #[test]
    fn prop_peek_then_read_line_matches_lines(lines in proptest::collection::vec("[a-z]{0,6}", 0..5)) {
        let text = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
        let port = Port::input_string("in", &text);
        for expected in &lines {
            port.peek_char().unwrap();
            let line = port.read_line().unwrap();
            prop_assert_eq!(line.as_deref(), Some(expected.as_str()));
        }
        prop_assert_eq!(port.read_line().unwrap(), None);
    }
}
