/// Fatal problems found while compiling a schema document.
///
/// None of these are recoverable: the macro expands to a single
/// `compile_error!` and emits no codec at all.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid flag marker pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Schema defines no constructors")]
    Empty,
    #[error("Malformed tag '{id}' for {name}")]
    MalformedTag { id: String, name: String },
    #[error("Malformed identifier '{0}'")]
    MalformedName(String),
    #[error("Malformed type '{ty}' for field '{field}' of {constructor}")]
    MalformedType {
        constructor: String,
        field: String,
        ty: String,
    },
    #[error("Tag 0x{tag:08x} is used by both {first} and {second}")]
    DuplicateTag {
        tag: u32,
        first: String,
        second: String,
    },
    #[error("Name '{0}' is generated more than once")]
    DuplicateName(String),
    #[error("Field '{field}' of {constructor} refers to unknown flags word '{word}'")]
    UnknownFlagsWord {
        constructor: String,
        field: String,
        word: String,
    },
    #[error("Field '{field}' of {constructor} uses flag bit {bit}, outside the 32-bit flags word")]
    FlagBitOutOfRange {
        constructor: String,
        field: String,
        bit: u32,
    },
    #[error("Field '{field}' of {constructor} has type 'true' but no flag bit")]
    PresenceWithoutFlag { constructor: String, field: String },
    #[error("Unsupported type '{ty}' for field '{field}' of {constructor}")]
    UnsupportedType {
        constructor: String,
        field: String,
        ty: String,
    },
}
