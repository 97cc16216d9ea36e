pub type SerializationResult<T> = std::result::Result<T, SerializationError>;

/// Errors raised while encoding or decoding values.
///
/// Unknown fields in the verbose protocol never surface here: they are
/// skipped by the reader.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// Fewer bytes were available than a declared length demanded.
    #[error("Stream exhausted while reading {context}")]
    StreamExhausted { context: &'static str },

    /// Envelope, bitset or presence information disagrees with the schema.
    #[error("Structural mismatch in {record}: {reason}")]
    StructuralMismatch { record: &'static str, reason: String },

    /// A declared length is negative or exceeds the configured bound.
    #[error("Length {length} of {context} is outside the accepted range 0..={limit}")]
    LengthOutOfBounds {
        context: &'static str,
        length: i64,
        limit: usize,
    },

    /// Only raised by the compact protocol, which has no way to skip values.
    #[error("Field `{field}` of {record} expected wire type {expected} but found {found}")]
    TypeMismatch {
        record: &'static str,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// An inactive union variant was read. This is a caller error, not data corruption.
    #[error("Cannot read variant `{requested}` of {union}: active variant is `{active}`")]
    UnionStateMisuse {
        union: &'static str,
        requested: &'static str,
        active: &'static str,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Invalid UTF-8 in {context}: {source}")]
    InvalidUtf8 {
        context: &'static str,
        source: std::string::FromUtf8Error,
    },

    #[error("No serialization registered for type {0}")]
    NotRegistered(&'static str),

    #[error("Serialization token {token} is already bound to {existing}, cannot bind {requested}")]
    TokenConflict {
        token: u32,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerializationError {
    pub(crate) fn structural(record: &'static str, reason: impl Into<String>) -> Self {
        SerializationError::StructuralMismatch {
            record,
            reason: reason.into(),
        }
    }

    /// Whether the error originates from corrupt or truncated input rather than misuse.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            SerializationError::StreamExhausted { .. }
                | SerializationError::StructuralMismatch { .. }
                | SerializationError::LengthOutOfBounds { .. }
                | SerializationError::TypeMismatch { .. }
                | SerializationError::InvalidUtf8 { .. }
        )
    }
}
