// ABOUTME: Integration tests for the streaming decoder's container and skip semantics.
// ABOUTME: Covers the canonical wire scenarios, strict/lenient ends, and resumable input.

use serde_msgpack::{
    Decoder, DecoderConfig, Encoder, Error, FeedSource, IgnoreVisitor, SliceSource, TokenKind,
    TokenVisitor, Value, ValueReader,
};

/// Records the order of visitor callbacks.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl TokenVisitor for Recorder {
    fn accept_nil(&mut self) -> serde_msgpack::Result<()> {
        self.events.push("nil".into());
        Ok(())
    }

    fn accept_bool(&mut self, value: bool) -> serde_msgpack::Result<()> {
        self.events.push(format!("bool:{value}"));
        Ok(())
    }

    fn accept_int(&mut self, value: i64) -> serde_msgpack::Result<()> {
        self.events.push(format!("int:{value}"));
        Ok(())
    }

    fn accept_raw(&mut self, value: &[u8]) -> serde_msgpack::Result<()> {
        self.events.push(format!("raw:{}", String::from_utf8_lossy(value)));
        Ok(())
    }

    fn accept_array(&mut self, count: u32) -> serde_msgpack::Result<()> {
        self.events.push(format!("array:{count}"));
        Ok(())
    }

    fn accept_map(&mut self, pair_count: u32) -> serde_msgpack::Result<()> {
        self.events.push(format!("map:{pair_count}"));
        Ok(())
    }

    fn close_container(&mut self) -> serde_msgpack::Result<()> {
        self.events.push("close".into());
        Ok(())
    }
}

#[test]
fn scenario_fixarray_of_two_ints() {
    let bytes = [0x92, 0x01, 0x02];
    let mut dec = Decoder::from_slice(&bytes);
    assert_eq!(dec.read_array_begin().unwrap(), 2);
    assert_eq!(dec.read_int().unwrap(), 1);
    assert_eq!(dec.read_int().unwrap(), 2);
    dec.read_array_end(true).unwrap();
    dec.finish().unwrap();

    assert_eq!(
        serde_msgpack::decode_value(&bytes).unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn scenario_fixmap_with_string_key() {
    let bytes = [0x81, 0xa1, b'a', 0x01];
    let mut dec = Decoder::from_slice(&bytes);
    assert_eq!(dec.read_map_begin().unwrap(), 1);
    assert_eq!(dec.read_byte_string().unwrap(), b"a".to_vec());
    assert_eq!(dec.read_int().unwrap(), 1);
    dec.read_map_end(true).unwrap();
    dec.finish().unwrap();
}

#[test]
fn scenario_array32_header() {
    let bytes = [0xdd, 0x00, 0x00, 0x00, 0x01, 0x00];
    let mut dec = Decoder::from_slice(&bytes);
    assert_eq!(dec.read_array_begin().unwrap(), 1);
    assert_eq!(dec.read_int().unwrap(), 0);
    dec.read_array_end(true).unwrap();
}

#[test]
fn scenario_false() {
    assert!(!Decoder::from_slice(&[0xc2]).read_boolean().unwrap());
    assert_eq!(Decoder::from_slice(&[0xc2]).read_int(), Err(Error::TypeMismatch));
    assert_eq!(Decoder::from_slice(&[0x01]).read_boolean(), Err(Error::TypeMismatch));
}

#[test]
fn map_begin_then_exactly_two_n_children() {
    let mut enc = Encoder::new(Vec::new());
    enc.write_map_header(3).unwrap();
    for i in 0..3 {
        enc.write_i64(i).unwrap();
        enc.write_str("v").unwrap();
    }
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::from_slice(&bytes);
    assert_eq!(dec.read_map_begin().unwrap(), 3);
    for i in 0..6 {
        assert_eq!(dec.read_map_end(true), Err(Error::IncompleteContainer));
        if i % 2 == 0 {
            dec.read_long().unwrap();
        } else {
            dec.read_string().unwrap();
        }
    }
    assert_eq!(dec.read_long(), Err(Error::StackUnderflow));
    dec.read_map_end(true).unwrap();
    dec.finish().unwrap();
}

#[test]
fn lenient_end_from_every_position() {
    // [nil, [1, 2], {"x": [true]}, "s"] followed by 7
    let bytes = [
        0x94, 0xc0, 0x92, 0x01, 0x02, 0x81, 0xa1, b'x', 0x91, 0xc3, 0xa1, b's', 0x07,
    ];
    for consumed in 0..=4 {
        let mut dec = Decoder::from_slice(&bytes);
        dec.read_array_begin().unwrap();
        for _ in 0..consumed {
            dec.skip().unwrap();
        }
        assert_eq!(dec.read_array_end(true).is_err(), consumed < 4);
        if consumed < 4 {
            dec.read_array_end(false).unwrap();
        }
        assert_eq!(dec.depth(), 0);
        assert_eq!(dec.read_int().unwrap(), 7);
        dec.finish().unwrap();
    }
}

#[test]
fn lenient_end_inside_nested_container() {
    // {"a": [1, 2, 3], "b": 4}
    let bytes = [0x82, 0xa1, b'a', 0x93, 0x01, 0x02, 0x03, 0xa1, b'b', 0x04];
    let mut dec = Decoder::from_slice(&bytes);
    dec.read_map_begin().unwrap();
    assert_eq!(dec.read_string().unwrap(), "a");
    dec.read_array_begin().unwrap();
    assert_eq!(dec.read_int().unwrap(), 1);
    dec.read_array_end(false).unwrap();
    assert_eq!(dec.read_string().unwrap(), "b");
    assert_eq!(dec.read_int().unwrap(), 4);
    dec.read_map_end(true).unwrap();
    dec.finish().unwrap();
}

#[test]
fn skip_consumes_exactly_one_value() {
    let values = [
        serde_msgpack::msgpack!(nil),
        serde_msgpack::msgpack!(-70000),
        serde_msgpack::msgpack!("a string longer than thirty-one bytes, for raw16"),
        serde_msgpack::msgpack!([]),
        serde_msgpack::msgpack!({}),
        serde_msgpack::msgpack!([1, [2, [3, [4, {}]]], { "k": [nil, true] }]),
    ];
    for value in &values {
        let mut bytes = serde_msgpack::encode_value(value).unwrap();
        let len = bytes.len();
        bytes.push(0x2a);

        let mut src = SliceSource::new(&bytes);
        let mut dec = Decoder::new(&mut src);
        dec.skip().unwrap();
        assert_eq!(dec.depth(), 0);
        drop(dec);
        assert_eq!(src.position(), len, "{value}");
    }
}

#[test]
fn skip_inside_exhausted_container_underflows() {
    let mut dec = Decoder::from_slice(&[0x91, 0x01, 0x02]);
    dec.read_array_begin().unwrap();
    dec.skip().unwrap();
    assert_eq!(dec.skip(), Err(Error::StackUnderflow));
}

#[test]
fn visit_value_reports_closes() {
    let bytes = [0x92, 0x81, 0xa1, b'k', 0xc0, 0x90];
    let mut dec = Decoder::from_slice(&bytes);
    let mut rec = Recorder::default();
    // Empty arrays are not accepted by the recorder
    assert_eq!(dec.visit_value(&mut rec), Err(Error::TypeMismatch));
    assert_eq!(rec.events, vec!["array:2", "map:1", "raw:k", "nil", "close"]);
}

#[test]
fn decode_one_tracked_drives_a_manual_loop() {
    let bytes = [0x93, 0x01, 0x92, 0x02, 0x03, 0x04];
    let mut dec = Decoder::from_slice(&bytes);
    let mut rec = Recorder::default();
    assert!(!dec.decode_one_tracked(&mut rec).unwrap());
    let mut steps = 0;
    while dec.depth() > 0 {
        if dec.remaining_in_container() == 0 {
            dec.read_array_end(true).unwrap();
            continue;
        }
        dec.decode_one_tracked(&mut rec).unwrap();
        steps += 1;
    }
    assert_eq!(steps, 5);
    assert_eq!(rec.events, vec!["array:3", "int:1", "array:2", "int:2", "int:3", "int:4"]);
}

/// Accepts integers only, like a caller filtering a numeric column.
struct IntsOnly;

impl TokenVisitor for IntsOnly {
    fn accept_int(&mut self, _value: i64) -> serde_msgpack::Result<()> {
        Ok(())
    }
}

#[test]
fn rejected_token_does_not_shift_a_lenient_end() {
    // [true, 7] followed by 9
    let bytes = [0x92, 0xc3, 0x07, 0x09];
    let mut dec = Decoder::from_slice(&bytes);
    dec.read_array_begin().unwrap();
    assert_eq!(dec.decode_one_tracked(&mut IntsOnly), Err(Error::TypeMismatch));
    assert_eq!(dec.remaining_in_container(), 2);
    dec.read_array_end(false).unwrap();
    assert_eq!(dec.depth(), 0);
    assert_eq!(dec.read_int().unwrap(), 9);
    dec.finish().unwrap();

    // A rejected header leaves its array unopened
    let mut dec = Decoder::from_slice(&[0x91, 0x01]);
    assert_eq!(dec.decode_one_tracked(&mut IntsOnly), Err(Error::TypeMismatch));
    assert_eq!(dec.depth(), 0);
    dec.skip().unwrap();
    dec.finish().unwrap();
}

#[test]
fn deep_nesting_round_trips_without_recursion() {
    let depth = 10_000;
    let mut enc = Encoder::validating(Vec::new());
    for _ in 0..depth {
        enc.write_array_header(1).unwrap();
    }
    enc.write_str("leaf").unwrap();
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::from_slice(&bytes);
    dec.skip().unwrap();
    dec.finish().unwrap();

    let mut dec = Decoder::from_slice(&bytes);
    for _ in 0..depth {
        assert_eq!(dec.read_array_begin().unwrap(), 1);
    }
    assert_eq!(dec.depth(), depth);
    assert_eq!(dec.read_string().unwrap(), "leaf");
    for _ in 0..depth {
        dec.read_array_end(true).unwrap();
    }
    dec.finish().unwrap();
}

#[test]
fn nesting_depth_100_builds_tree() {
    let mut value = Value::Int(1);
    for _ in 0..100 {
        value = Value::Array(vec![value]);
    }
    let bytes = serde_msgpack::encode_value(&value).unwrap();
    assert_eq!(serde_msgpack::decode_value(&bytes).unwrap(), value);
}

#[test]
fn depth_limit_for_untrusted_input() {
    let bytes = vec![0x91; 1000];
    let config = DecoderConfig {
        max_depth: 64,
        ..DecoderConfig::default()
    };
    let mut dec = Decoder::with_config(SliceSource::new(&bytes), config);
    assert_eq!(dec.skip(), Err(Error::MaxDepthExceeded));
    assert_eq!(dec.depth(), 64);
}

#[test]
fn invalid_tags_are_rejected_everywhere() {
    for tag in [0xc1u8, 0xc4, 0xc9, 0xd4, 0xd9] {
        let bytes = [0x91, tag];
        let mut dec = Decoder::from_slice(&bytes);
        assert_eq!(dec.read_value(), Err(Error::InvalidTag(tag)));
        assert_eq!(dec.read_value(), Err(Error::InvalidTag(tag)));

        let mut dec = Decoder::from_slice(&bytes);
        dec.read_array_begin().unwrap();
        assert_eq!(dec.next_kind(), Err(Error::InvalidTag(tag)));

        let mut dec = Decoder::from_slice(&bytes);
        dec.read_array_begin().unwrap();
        assert_eq!(dec.try_read_nil(), Err(Error::InvalidTag(tag)));
        assert_eq!(dec.read_nil(), Err(Error::InvalidTag(tag)));
        assert_eq!(dec.finish(), Err(Error::InvalidTag(tag)));
    }
}

#[test]
fn truncated_input_at_every_split_point() {
    let value = serde_msgpack::msgpack!({ "key": [1, 300, (-70000), 1.5, "text"], "n": nil });
    let bytes = serde_msgpack::encode_value(&value).unwrap();
    for cut in 0..bytes.len() {
        let mut dec = Decoder::from_slice(&bytes[..cut]);
        assert_eq!(dec.read_value(), Err(Error::IncompleteInput), "cut at {cut}");
    }
}

#[test]
fn feed_one_byte_at_a_time_with_typed_reads() {
    let mut enc = Encoder::new(Vec::new());
    enc.write_map_header(2).unwrap();
    enc.write_str("id").unwrap();
    enc.write_u64(u64::MAX).unwrap();
    enc.write_str("blob").unwrap();
    enc.write_bytes(&[7u8; 300]).unwrap();
    let bytes = enc.finish().unwrap();

    let mut feed = bytes.iter().copied();
    let mut dec = Decoder::new(FeedSource::new());

    macro_rules! retry {
        ($op:expr) => {
            loop {
                match $op {
                    Err(Error::WouldBlock) => {
                        let b = feed.next().expect("ran out of input");
                        dec.source_mut().feed(&[b]);
                    }
                    other => break other.unwrap(),
                }
            }
        };
    }

    assert_eq!(retry!(dec.read_map_begin()), 2);
    assert_eq!(retry!(dec.read_string()), "id");
    assert_eq!(retry!(dec.read_u64()), u64::MAX);
    assert_eq!(retry!(dec.read_string()), "blob");
    assert_eq!(retry!(dec.read_byte_string()), vec![7u8; 300]);
    retry!(dec.read_map_end(true));
    assert!(feed.next().is_none());
    dec.source_mut().close();
    dec.finish().unwrap();
}

#[test]
fn lenient_end_resumes_after_would_block() {
    let bytes = [0x93, 0x01, 0x92, 0x02, 0x03, 0x04, 0x2a];
    let mut dec = Decoder::new(FeedSource::new());
    dec.source_mut().feed(&bytes[..4]);
    dec.read_array_begin().unwrap();
    dec.read_int().unwrap();
    assert_eq!(dec.read_array_end(false), Err(Error::WouldBlock));
    dec.source_mut().feed(&bytes[4..]);
    dec.read_array_end(false).unwrap();
    assert_eq!(dec.depth(), 0);
    assert_eq!(dec.read_int().unwrap(), 42);
}

#[test]
fn next_kind_classifies_without_consuming() {
    let bytes = [0xc0, 0xc3, 0xd0, 0x80, 0xcc, 0x01, 0xca, 0, 0, 0, 0, 0xa0, 0x90, 0x80];
    let expected = [
        TokenKind::Nil,
        TokenKind::Bool,
        TokenKind::Int,
        TokenKind::UInt,
        TokenKind::Float32,
        TokenKind::Raw,
        TokenKind::Array,
        TokenKind::Map,
    ];
    let mut dec = Decoder::from_slice(&bytes);
    for kind in expected {
        assert_eq!(dec.next_kind().unwrap(), kind);
        dec.skip().unwrap();
    }
    dec.finish().unwrap();
}

#[test]
fn value_reader_over_concatenated_stream() {
    let mut bytes = Vec::new();
    for value in [serde_msgpack::msgpack!(1), serde_msgpack::msgpack!([true]), serde_msgpack::msgpack!("x")] {
        bytes.extend(serde_msgpack::encode_value(&value).unwrap());
    }
    let values: Vec<Value> = ValueReader::new(SliceSource::new(&bytes))
        .collect::<serde_msgpack::Result<_>>()
        .unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[2].as_str(), Some("x"));
}

#[test]
fn ignore_visitor_accepts_everything() {
    let bytes = serde_msgpack::encode_value(&serde_msgpack::msgpack!([1.5, nil, {}, []])).unwrap();
    let mut dec = Decoder::from_slice(&bytes);
    dec.visit_value(&mut IgnoreVisitor).unwrap();
    dec.finish().unwrap();
}
