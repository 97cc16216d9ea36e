//! Partitioned record storage ("pails") on top of `object_store`.
//!
//! A [`structure::PailStructure`] decides how a record becomes bytes and
//! which directory it belongs in. A [`pail::Pail`] stores framed records in
//! content-addressed files below those directories and reads them back,
//! filtered by target. [`ingest`] adapts plain input files into the same
//! world as read-only records.

pub mod error;
pub mod ingest;
pub mod layout;
pub mod opaque;
pub mod pail;
pub mod pail_file;
pub mod record_structure;
pub mod structure;

pub use error::{PailError, PailResult};
pub use ingest::{WholeFile, WholeFileScheme, WholeFileSerialization};
pub use opaque::{JsonObjectCodec, ObjectCodec, OpaquePailStructure, PailObject};
pub use pail::{read_spec, Pail, PailSpec, PailWriter};
pub use record_structure::{
    DataChunkPailStructure, RecordPailStructure, SplitDataChunkPailStructure,
    DATA_CHUNK_STRUCTURE, SPLIT_DATA_CHUNK_STRUCTURE,
};
pub use structure::{DatasetRouter, NoRouting, PailStructure, Router};
