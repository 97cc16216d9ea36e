use std::cmp::Ordering;

use forma_serialization::{
    primitive::{decode_array, encode_array},
    protocol::WireType,
    record::{decode, decode_with_limits, encode},
    Chunk, DataValue, DecodeLimits, FireValue, FormaValue, Protocol, SerializationError,
    SerializationRegistry, TimeSeries,
};

fn limits() -> DecodeLimits {
    DecodeLimits {
        max_array_length: 1 << 16,
        max_container_length: 1 << 16,
        max_depth: 16,
    }
}

fn sample_chunks() -> Vec<Chunk> {
    let payloads = vec![
        DataValue::DoubleVal(-3.25),
        DataValue::IntVal(i32::MIN),
        DataValue::LongVal(i64::MAX),
        DataValue::ShortVal(i16::MIN),
        DataValue::FireVal(FireValue::new(1, 2, 3, 4)),
        DataValue::TimeSeries(TimeSeries::new(690, 693, vec![1, -1, 300, 0])),
        DataValue::Forma(FormaValue::new(FireValue::new(0, 1, 0, 1), 0.1, -0.2, 2.5)),
        DataValue::Forma(
            FormaValue::new(FireValue::default(), f64::NAN, -0.0, f64::INFINITY)
                .with_param_break(42.0),
        ),
    ];

    let mut chunks = Vec::new();
    for (i, data) in payloads.into_iter().enumerate() {
        let chunk = Chunk::new("ndvi", "16", "1000", 28, 8, i as i32, 24000, data);
        chunks.push(chunk.clone());
        chunks.push(chunk.with_date("2006-01-01"));
    }
    chunks
}

#[test]
fn chunks_round_trip_in_both_protocols() {
    for protocol in [Protocol::Verbose, Protocol::Compact] {
        for chunk in sample_chunks() {
            let bytes = encode(&chunk, protocol).unwrap();
            let decoded: Chunk = decode_with_limits(&bytes, protocol, limits()).unwrap();
            assert_eq!(decoded, chunk, "{protocol}");
        }
    }
}

#[test]
fn compact_is_smaller_than_verbose() {
    for chunk in sample_chunks() {
        let verbose = encode(&chunk, Protocol::Verbose).unwrap();
        let compact = encode(&chunk, Protocol::Compact).unwrap();
        assert!(compact.len() < verbose.len());
    }
}

/// Insert extra fields in front of the outermost stop byte.
fn splice_before_stop(mut bytes: Vec<u8>, extra: &[u8]) -> Vec<u8> {
    assert_eq!(bytes.pop(), Some(0));
    bytes.extend_from_slice(extra);
    bytes.push(0);
    bytes
}

#[test]
fn verbose_decoder_skips_unknown_fields() {
    let mut extra = Vec::new();
    // tag 42: string "abc"
    extra.extend_from_slice(&[WireType::String as u8, 0, 42, 0, 0, 0, 3, b'a', b'b', b'c']);
    // tag 43: list<i64> with two elements
    extra.extend_from_slice(&[WireType::List as u8, 0, 43, WireType::I64 as u8, 0, 0, 0, 2]);
    extra.extend_from_slice(&[0; 16]);
    // tag 44: map<i16, struct{ tag 1: bool }> with one entry
    extra.extend_from_slice(&[WireType::Map as u8, 0, 44]);
    extra.extend_from_slice(&[WireType::I16 as u8, WireType::Struct as u8, 0, 0, 0, 1]);
    extra.extend_from_slice(&[0, 7, WireType::Bool as u8, 0, 1, 1, 0]);
    // known tag 4 (`h`) with the wrong wire type is treated as unknown
    extra.extend_from_slice(&[WireType::I64 as u8, 0, 4, 0, 0, 0, 0, 0, 0, 0, 9]);

    for chunk in sample_chunks() {
        let bytes = encode(&chunk, Protocol::Verbose).unwrap();
        let spliced = splice_before_stop(bytes, &extra);
        let decoded: Chunk = decode(&spliced, Protocol::Verbose).unwrap();
        assert_eq!(decoded, chunk);
    }
}

#[test]
fn compact_decoder_reports_out_of_range_values() {
    // short_val bit set, but the value needs more than 16 bits
    let bytes = [0b0000_1000, 0x80, 0x80, 0x80, 0x01];
    let err = decode::<DataValue>(&bytes, Protocol::Compact).unwrap_err();
    assert!(matches!(
        err,
        SerializationError::TypeMismatch {
            field: "short_val",
            ..
        }
    ));
}

#[test]
fn union_decodes_to_exactly_the_encoded_variant() {
    for protocol in [Protocol::Verbose, Protocol::Compact] {
        for chunk in sample_chunks() {
            let decoded: Chunk = decode(&encode(&chunk, protocol).unwrap(), protocol).unwrap();
            let active = chunk.data.set_field();
            assert_eq!(decoded.data.set_field(), active);
            for field in forma_serialization::DataValueField::ALL {
                assert_eq!(decoded.data.is_set(field), field == active);
            }
        }
    }
}

#[test]
fn comparator_follows_bytes_not_numbers() {
    let registry = SerializationRegistry::with_defaults().unwrap();
    let comparator = registry.comparator::<Vec<f32>>().unwrap();

    let negative = encode_array(&[-1.0f32]).unwrap();
    let positive = encode_array(&[1.0f32]).unwrap();
    assert_eq!(comparator.compare(&negative, &positive), Ordering::Greater);
    assert_eq!(
        comparator.compare(&negative, &positive),
        negative.as_slice().cmp(positive.as_slice())
    );

    let ints = registry.comparator::<Vec<i32>>().unwrap();
    let short = encode_array(&[i32::MAX]).unwrap();
    let long = encode_array(&[0i32, 0]).unwrap();
    assert_eq!(ints.compare(&short, &long), Ordering::Less);
}

#[test]
fn arrays_round_trip_including_empty() {
    for values in [vec![], vec![0], vec![i32::MIN, -1, 0, 1, i32::MAX]] {
        let bytes = encode_array(&values).unwrap();
        assert_eq!(bytes.len(), 4 + 4 * values.len());
        assert_eq!(decode_array::<i32>(&bytes, limits()).unwrap(), values);
    }
}

#[test]
fn every_truncation_is_stream_exhaustion() {
    let chunk = Chunk::new(
        "precl",
        "32",
        "500",
        1,
        2,
        3,
        4,
        DataValue::TimeSeries(TimeSeries::new(0, 2, vec![5, 6, 7])),
    )
    .with_date("2010-10-10");

    for protocol in [Protocol::Verbose, Protocol::Compact] {
        let bytes = encode(&chunk, protocol).unwrap();
        for cut in 0..bytes.len() {
            let err = decode::<Chunk>(&bytes[..cut], protocol).unwrap_err();
            assert!(
                matches!(err, SerializationError::StreamExhausted { .. }),
                "{protocol} cut at {cut}: {err}"
            );
        }
    }

    let array = encode_array(&[1.0f32, 2.0, 3.0]).unwrap();
    for cut in 0..array.len() {
        let err = decode_array::<f32>(&array[..cut], limits()).unwrap_err();
        assert!(matches!(err, SerializationError::StreamExhausted { .. }));
    }
}

#[test]
fn hostile_string_length_is_rejected_before_allocation() {
    // `dataset` header claiming a 2 GiB string
    let bytes = [WireType::String as u8, 0, 1, 0x7f, 0xff, 0xff, 0xff];
    let err = decode_with_limits::<Chunk>(&bytes, Protocol::Verbose, limits()).unwrap_err();
    assert!(matches!(err, SerializationError::LengthOutOfBounds { .. }));
}

#[test]
fn nesting_limit_applies_to_skipped_structs() {
    let shallow = DecodeLimits {
        max_depth: 2,
        ..limits()
    };
    // unknown tag 50 holding a struct holding a struct
    let mut extra = vec![WireType::Struct as u8, 0, 50];
    extra.extend_from_slice(&[WireType::Struct as u8, 0, 1, 0, 0]);
    let chunk = sample_chunks().remove(0);
    let spliced = splice_before_stop(encode(&chunk, Protocol::Verbose).unwrap(), &extra);

    let err = decode_with_limits::<Chunk>(&spliced, Protocol::Verbose, shallow).unwrap_err();
    assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    assert_eq!(
        decode_with_limits::<Chunk>(&spliced, Protocol::Verbose, limits()).unwrap(),
        chunk
    );
}

#[test]
fn zero_width_containers_under_unknown_tags_are_rejected() {
    // tag 100: list<map> with four maps, each map<void, void> claiming 65536 entries
    let mut extra = vec![WireType::List as u8, 0, 100, WireType::Map as u8, 0, 0, 0, 4];
    for _ in 0..4 {
        extra.extend_from_slice(&[WireType::Void as u8, WireType::Void as u8, 0, 1, 0, 0]);
    }
    let chunk = sample_chunks().remove(0);
    let spliced = splice_before_stop(encode(&chunk, Protocol::Verbose).unwrap(), &extra);

    let err = decode_with_limits::<Chunk>(&spliced, Protocol::Verbose, limits()).unwrap_err();
    assert!(matches!(err, SerializationError::StructuralMismatch { .. }));

    // tag 101: list<stop> claiming 65536 elements
    let extra = [WireType::List as u8, 0, 101, WireType::Stop as u8, 0, 1, 0, 0];
    let spliced = splice_before_stop(encode(&chunk, Protocol::Verbose).unwrap(), &extra);
    let err = decode_with_limits::<Chunk>(&spliced, Protocol::Verbose, limits()).unwrap_err();
    assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
}
