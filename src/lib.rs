//! # tl-wire
//!
//! A schema-driven binary codec for MTProto-style "Type Language" records.
//!
//! - Every serialized record starts with its 32-bit constructor tag
//! - Optional fields are gated by the bits of a `#` flags word
//! - Vectors are framed by a fixed sentinel tag and a signed element count
//! - Per-constructor codecs are generated at compile time from a JSON schema
//!   document by [`include_schema!`]
//!
//! ## Generated code
//!
//! ```rust,ignore
//! tl_wire::include_schema!("schema/api.json");
//!
//! let ping = functions::Ping { ping_id: 7 };
//! let bytes = tl_wire::encode(&ping).unwrap();
//! let back: Object = tl_wire::decode(&mut bytes.clone()).unwrap();
//! assert_eq!(back, Object::Ping(ping));
//! ```
//!
//! The macro expands to a `types` module (one struct per constructor), a
//! `functions` module (one struct per method), the closed `Object` enum over
//! all of them and a `name_for_id` lookup. See the `tl-wire-derive` crate for
//! the schema rules.
//!
//! ## Macro Arguments
//!
//! - `include_schema!("path")`: Path to the schema document, relative to the
//!   invoking crate's `CARGO_MANIFEST_DIR`.
//! - `functions = false`: Validate the "methods" group but do not generate
//!   code for it.

pub mod core;

pub use bytes;
use bytes::{Bytes, BytesMut};
pub use crate::core::{BOOL_FALSE_ID, BOOL_TRUE_ID, VECTOR_ID};
pub use tl_wire_derive::include_schema;

/// Errors that can occur during encoding or decoding operations.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The value could not be encoded because it was built inconsistently.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The buffer did not contain enough data to complete the operation.
    #[error("Insufficient data in buffer: needed {needed} bytes, {remaining} remaining")]
    InsufficientData { needed: usize, remaining: usize },
    /// The bytes do not follow the wire format.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The result type used throughout this crate for encode/decode operations.
///
/// All `Encoder`, `Decoder` and `Bare` trait methods return this type.
pub type Result<T> = std::result::Result<T, EncoderError>;

/// Programmer errors detected while encoding a generated value.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Field '{field}' of {constructor} is flagged present (bit {bit}) but has no value")]
    MissingFlaggedField {
        constructor: &'static str,
        field: &'static str,
        bit: u32,
    },
    #[error("Field '{field}' of {constructor} has a value but flag bit {bit} is clear")]
    UnexpectedFlaggedField {
        constructor: &'static str,
        field: &'static str,
        bit: u32,
    },
    #[error("Byte string of {len} bytes exceeds the 24-bit length prefix")]
    BytesTooLong { len: usize },
    #[error("Vector of {len} elements exceeds the 32-bit signed count")]
    VectorTooLong { len: usize },
}

/// Run-time decode failures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unknown constructor: 0x{tag:08x}")]
    UnknownConstructor { tag: u32 },
    #[error("Expected constructor {expected}, got {found}")]
    UnexpectedConstructor {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Wrong vector constructor: 0x{found:08x}")]
    VectorTag { found: u32 },
    #[error("Negative vector length: {len}")]
    NegativeLength { len: i32 },
    #[error("Expected Bool constructor, got 0x{tag:08x}")]
    InvalidBool { tag: u32 },
    #[error("Invalid byte string length marker: {marker}")]
    InvalidLengthPrefix { marker: u8 },
    #[error("String is not valid UTF-8")]
    InvalidUtf8,
}

/// Anything carrying a constructor tag on the wire.
pub trait Identifiable {
    /// The tag written before the record's fields.
    const CONSTRUCTOR_ID: u32;
    /// The normalized schema name of the constructor.
    const NAME: &'static str;
}

/// Trait for types that can be written in the TL binary format.
///
/// Generated records write their tag followed by their fields. Primitive
/// kinds write their raw representation with no tag.
///
/// # Errors
/// Returns `EncoderError` if the value was built inconsistently.
pub trait Encoder {
    /// Append the encoded value to `writer`.
    fn encode(&self, writer: &mut BytesMut) -> Result<()>;
}

/// Trait for types that can be read back from the TL binary format.
///
/// For generated records this reads the tag, dispatches on it and checks that
/// the decoded constructor is the expected one.
pub trait Decoder: Sized {
    /// Decode one value, advancing `reader` exactly past the consumed bytes.
    fn decode(reader: &mut Bytes) -> Result<Self>;
}

/// The body of a tagged record, read after the dispatcher consumed the tag.
pub trait Bare: Identifiable + Sized {
    fn decode_bare(reader: &mut Bytes) -> Result<Self>;
}

/// Convenience function to decode a value from bytes.
///
/// This is equivalent to calling `T::decode(reader)`.
pub fn decode<T: Decoder>(reader: &mut Bytes) -> Result<T> {
    T::decode(reader)
}

/// Convenience function to encode a value to bytes.
///
/// # Example
/// ```rust
/// let bytes = tl_wire::encode(&0x1234_5678u32).unwrap();
/// assert_eq!(&bytes[..], &[0x78, 0x56, 0x34, 0x12]);
/// ```
pub fn encode<T: Encoder>(value: &T) -> Result<Bytes> {
    let mut writer = BytesMut::new();
    value.encode(&mut writer)?;
    Ok(writer.freeze())
}

/// Builds the error returned by a dispatch table's default arm.
pub fn unknown_constructor(tag: u32) -> EncoderError {
    tracing::debug!(tag, "unknown constructor");
    DecodeError::UnknownConstructor { tag }.into()
}
