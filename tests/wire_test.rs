use bytes::{Bytes, BytesMut};
use tl_wire::{
    decode, encode, DecodeError, Decoder, EncodeError, Encoder, EncoderError, BOOL_FALSE_ID,
    BOOL_TRUE_ID, VECTOR_ID,
};

fn round_trip<T: Encoder + Decoder + PartialEq + std::fmt::Debug>(value: T) {
    let mut bytes = encode(&value).unwrap();
    let decoded: T = decode(&mut bytes).unwrap();
    assert_eq!(value, decoded);
    assert!(bytes.is_empty(), "decoder left {} bytes behind", bytes.len());
}

#[test]
fn test_integers_are_little_endian() {
    assert_eq!(&encode(&1i32).unwrap()[..], &[1, 0, 0, 0]);
    assert_eq!(&encode(&-1i32).unwrap()[..], &[0xff, 0xff, 0xff, 0xff]);
    assert_eq!(&encode(&0x0102_0304u32).unwrap()[..], &[4, 3, 2, 1]);
    assert_eq!(
        &encode(&0x0102_0304_0506_0708i64).unwrap()[..],
        &[8, 7, 6, 5, 4, 3, 2, 1]
    );

    round_trip(i32::MIN);
    round_trip(u32::MAX);
    round_trip(i64::MIN);
}

#[test]
fn test_double_is_ieee754_le() {
    assert_eq!(&encode(&1.0f64).unwrap()[..], &1.0f64.to_le_bytes());
    round_trip(-12.5f64);
}

#[test]
fn test_bool_is_a_constructor_tag() {
    assert_eq!(&encode(&true).unwrap()[..], &BOOL_TRUE_ID.to_le_bytes());
    assert_eq!(&encode(&false).unwrap()[..], &BOOL_FALSE_ID.to_le_bytes());
    round_trip(true);
    round_trip(false);

    let mut bytes = Bytes::from_static(&[1, 0, 0, 0]);
    match bool::decode(&mut bytes) {
        Err(EncoderError::Decode(DecodeError::InvalidBool { tag })) => assert_eq!(tag, 1),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_strings_are_padded() {
    assert_eq!(&encode(&String::new()).unwrap()[..], &[0, 0, 0, 0]);
    assert_eq!(
        &encode(&"hello".to_string()).unwrap()[..],
        &[5, b'h', b'e', b'l', b'l', b'o', 0, 0]
    );
    round_trip("hello".to_string());
    round_trip("ünïcödé".to_string());
    round_trip("x".repeat(253));
    round_trip("y".repeat(254));
    round_trip("z".repeat(70_000));
}

#[test]
fn test_bytes_long_prefix() {
    let data = Bytes::from(vec![0xabu8; 1000]);
    let encoded = encode(&data).unwrap();
    assert_eq!(&encoded[..4], &[254, 0xe8, 0x03, 0x00]);
    assert_eq!(encoded.len() % 4, 0);
    round_trip(data);
}

#[test]
fn test_oversized_bytes_refuse_to_encode() {
    let data = Bytes::from(vec![0u8; 0x0100_0000]);
    match encode(&data) {
        Err(EncoderError::Encode(EncodeError::BytesTooLong { len })) => {
            assert_eq!(len, 0x0100_0000)
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_invalid_utf8_is_rejected() {
    let mut bytes = Bytes::from_static(&[2, 0xc3, 0x28, 0]);
    assert!(matches!(
        String::decode(&mut bytes),
        Err(EncoderError::Decode(DecodeError::InvalidUtf8))
    ));
}

#[test]
fn test_empty_vector_framing() {
    let encoded = encode(&Vec::<i32>::new()).unwrap();
    let mut expected = VECTOR_ID.to_le_bytes().to_vec();
    expected.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(&encoded[..], &expected[..]);

    let mut bytes = encoded;
    let decoded: Vec<i32> = decode(&mut bytes).unwrap();
    assert!(decoded.is_empty());
    assert!(bytes.is_empty());
}

#[test]
fn test_primitive_vector_has_no_element_tags() {
    let encoded = encode(&vec![1i64, 2, 3]).unwrap();
    assert_eq!(encoded.len(), 4 + 4 + 3 * 8);
    assert_eq!(&encoded[4..8], &3i32.to_le_bytes());
    assert_eq!(&encoded[8..16], &1i64.to_le_bytes());

    round_trip(vec!["a".to_string(), "bc".to_string()]);
    round_trip(vec![true, false, true]);
}

#[test]
fn test_wrong_vector_tag() {
    let mut writer = BytesMut::new();
    0xdead_beefu32.encode(&mut writer).unwrap();
    0i32.encode(&mut writer).unwrap();
    let mut bytes = writer.freeze();
    match Vec::<i32>::decode(&mut bytes) {
        Err(EncoderError::Decode(DecodeError::VectorTag { found })) => {
            assert_eq!(found, 0xdead_beef)
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_negative_vector_length() {
    let mut writer = BytesMut::new();
    VECTOR_ID.encode(&mut writer).unwrap();
    (-1i32).encode(&mut writer).unwrap();
    let mut bytes = writer.freeze();
    match Vec::<i64>::decode(&mut bytes) {
        Err(EncoderError::Decode(DecodeError::NegativeLength { len })) => assert_eq!(len, -1),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_huge_vector_count_fails_on_underrun() {
    let mut writer = BytesMut::new();
    VECTOR_ID.encode(&mut writer).unwrap();
    i32::MAX.encode(&mut writer).unwrap();
    7i32.encode(&mut writer).unwrap();
    let mut bytes = writer.freeze();
    assert!(matches!(
        Vec::<i32>::decode(&mut bytes),
        Err(EncoderError::InsufficientData { needed: 4, remaining: 0 })
    ));
}

#[test]
fn test_underrun_is_reported() {
    let mut bytes = Bytes::from_static(&[1, 2, 3]);
    assert!(matches!(
        u32::decode(&mut bytes),
        Err(EncoderError::InsufficientData { needed: 4, remaining: 3 })
    ));

    let mut bytes = Bytes::from_static(&[1, 2, 3, 4]);
    assert!(matches!(
        i64::decode(&mut bytes),
        Err(EncoderError::InsufficientData { needed: 8, remaining: 4 })
    ));
}
