use crate::{DecodeError, Decoder, EncodeError, Encoder, EncoderError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Constructor tags that are part of the wire format itself.
///
/// These never come from a schema document: `vector` frames every
/// `Vector<X>` field and the two `Bool` constructors stand in for a boolean
/// byte, which does not exist on the wire.
pub const VECTOR_ID: u32 = 0x1cb5_c415;
pub const BOOL_TRUE_ID: u32 = 0x9972_75b5;
pub const BOOL_FALSE_ID: u32 = 0xbc79_9737;

/// Byte-string lengths at or above this value use the long prefix.
pub const SHORT_BYTES_LIMIT: usize = 254;
/// Marker byte introducing a 3-byte little-endian length.
pub const LONG_BYTES_MARKER: u8 = 254;
/// Largest length expressible in the long prefix.
pub const MAX_BYTES_LEN: usize = 0x00ff_ffff;

/// Fails with `InsufficientData` unless `reader` holds at least `needed` bytes.
#[inline]
pub fn ensure_remaining(reader: &Bytes, needed: usize) -> Result<()> {
    if reader.remaining() < needed {
        return Err(EncoderError::InsufficientData {
            needed,
            remaining: reader.remaining(),
        });
    }
    Ok(())
}

/// Number of zero bytes needed to bring `len` to a 4-byte boundary.
#[inline]
pub fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

// --- integers ---
/// Encodes a `u32` as 4 little-endian bytes. Tags and flags words use this.
impl Encoder for u32 {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        writer.put_u32_le(*self);
        Ok(())
    }
}
impl Decoder for u32 {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        ensure_remaining(reader, 4)?;
        Ok(reader.get_u32_le())
    }
}

/// Encodes an `i32` (`int`) as 4 little-endian two's-complement bytes.
impl Encoder for i32 {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        writer.put_i32_le(*self);
        Ok(())
    }
}
impl Decoder for i32 {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        ensure_remaining(reader, 4)?;
        Ok(reader.get_i32_le())
    }
}

/// Encodes an `i64` (`long`) as 8 little-endian two's-complement bytes.
impl Encoder for i64 {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        writer.put_i64_le(*self);
        Ok(())
    }
}
impl Decoder for i64 {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        ensure_remaining(reader, 8)?;
        Ok(reader.get_i64_le())
    }
}

// --- f64 ---
/// Encodes an `f64` (`double`) as 8 little-endian IEEE-754 bytes.
impl Encoder for f64 {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        writer.put_f64_le(*self);
        Ok(())
    }
}
impl Decoder for f64 {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        ensure_remaining(reader, 8)?;
        Ok(reader.get_f64_le())
    }
}

// --- bool ---
/// Encodes a `bool` as one of the two zero-field `Bool` constructors.
impl Encoder for bool {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        let tag = if *self { BOOL_TRUE_ID } else { BOOL_FALSE_ID };
        writer.put_u32_le(tag);
        Ok(())
    }
}
/// Decodes a `bool` from its constructor tag.
///
/// # Errors
/// Returns an error if the tag is neither `boolTrue` nor `boolFalse`.
impl Decoder for bool {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        match u32::decode(reader)? {
            BOOL_TRUE_ID => Ok(true),
            BOOL_FALSE_ID => Ok(false),
            tag => Err(DecodeError::InvalidBool { tag }.into()),
        }
    }
}

// --- byte strings ---
/// Writes a length-prefixed byte string padded to a 4-byte boundary.
///
/// Lengths below 254 take a single prefix byte; longer ones are introduced by
/// the marker byte 254 followed by a 3-byte little-endian length.
pub fn encode_bytes(data: &[u8], writer: &mut BytesMut) -> Result<()> {
    let len = data.len();
    let header = if len < SHORT_BYTES_LIMIT {
        writer.put_u8(len as u8);
        1
    } else if len <= MAX_BYTES_LEN {
        writer.put_u8(LONG_BYTES_MARKER);
        writer.put_uint_le(len as u64, 3);
        4
    } else {
        return Err(EncodeError::BytesTooLong { len }.into());
    };
    writer.put_slice(data);
    writer.put_bytes(0, padding_for(header + len));
    Ok(())
}

/// Reads a length-prefixed byte string and skips its padding.
pub fn decode_bytes(reader: &mut Bytes) -> Result<Bytes> {
    ensure_remaining(reader, 1)?;
    let first = reader.get_u8();
    let (header, len) = match first {
        LONG_BYTES_MARKER => {
            ensure_remaining(reader, 3)?;
            (4, reader.get_uint_le(3) as usize)
        }
        255 => return Err(DecodeError::InvalidLengthPrefix { marker: first }.into()),
        short => (1, short as usize),
    };
    let padding = padding_for(header + len);
    ensure_remaining(reader, len + padding)?;
    let data = reader.split_to(len);
    reader.advance(padding);
    Ok(data)
}

/// Encodes `bytes` as a TL byte string.
impl Encoder for Bytes {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        encode_bytes(self, writer)
    }
}
impl Decoder for Bytes {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        decode_bytes(reader)
    }
}

/// Encodes a `String` as a TL byte string of its UTF-8 bytes.
impl Encoder for String {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        encode_bytes(self.as_bytes(), writer)
    }
}
/// Decodes a `String`; invalid UTF-8 is an error, never replaced.
impl Decoder for String {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        let data = decode_bytes(reader)?;
        String::from_utf8(data.to_vec()).map_err(|_| DecodeError::InvalidUtf8.into())
    }
}

// --- Vec<T> ---
/// The signed 32-bit element count written after the vector tag.
pub fn vector_count(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| EncodeError::VectorTooLong { len }.into())
}

/// Encodes a `Vec<T>` as the vector tag, a signed 32-bit count and the
/// elements back to back.
///
/// Primitive elements write no tag of their own; generated records and
/// `Object` values write theirs, so the element kind alone decides between
/// the three vector encodings.
impl<T: Encoder> Encoder for Vec<T> {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        writer.put_u32_le(VECTOR_ID);
        writer.put_i32_le(vector_count(self.len())?);
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}
/// Decodes a `Vec<T>`, rejecting a wrong framing tag or a negative count
/// before any element is read.
impl<T: Decoder> Decoder for Vec<T> {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        let found = u32::decode(reader)?;
        if found != VECTOR_ID {
            tracing::debug!(found, "bad vector framing");
            return Err(DecodeError::VectorTag { found }.into());
        }
        let len = i32::decode(reader)?;
        if len < 0 {
            tracing::debug!(len, "negative vector length");
            return Err(DecodeError::NegativeLength { len }.into());
        }
        // Every element occupies at least 4 bytes, so a count larger than that
        // cannot be satisfied and must not drive the allocation.
        let mut vec = Vec::with_capacity((len as usize).min(reader.remaining() / 4));
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

// --- Box<T> ---
/// Encodes a `Box<T>` by encoding the inner value.
impl<T: Encoder> Encoder for Box<T> {
    fn encode(&self, writer: &mut BytesMut) -> Result<()> {
        (**self).encode(writer)
    }
}
/// Decodes a `Box<T>` by decoding the inner value and wrapping it in a Box.
impl<T: Decoder> Decoder for Box<T> {
    fn decode(reader: &mut Bytes) -> Result<Self> {
        Ok(Box::new(T::decode(reader)?))
    }
}
