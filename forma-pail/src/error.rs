use forma_serialization::SerializationError;

pub type PailResult<T> = std::result::Result<T, PailError>;

#[derive(Debug, thiserror::Error)]
pub enum PailError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    #[error("Failed to (de)serialize pail metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Target {target:?} is not valid for pail structure {structure}")]
    InvalidTarget {
        structure: String,
        target: Vec<String>,
    },
    #[error("Pail at {root} was written with {found}, cannot open it as {expected}")]
    StructureMismatch {
        root: String,
        expected: String,
        found: String,
    },
    #[error("No pail metadata found at {0}")]
    MissingMetadata(String),
    #[error("Malformed pail file {path}: {reason}")]
    MalformedFile { path: String, reason: String },
    #[error("File {path} is {size} bytes, above the ingest limit of {limit} bytes")]
    FileTooLarge {
        path: String,
        size: usize,
        limit: usize,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}
