//! Binary codecs for forma chunks.
//!
//! Three layers live here:
//!
//! * `primitive`: length-prefixed big-endian arrays of `i32` or `f32`.
//! * `record` and `protocol`: structured records with required and optional
//!   tagged fields and tagged unions, in a verbose field-tagged encoding
//!   that tolerates unknown fields and a compact bitset encoding that does
//!   not.
//! * `registry` and `session`: exact-type lookup of codecs and their binding
//!   to an owned stream.
//!
//! Format Overview
//!
//! primitive array:   [len: i32 BE][len x element: 4 bytes BE]
//! verbose record:    ([wire type: u8][tag: i16 BE][value])* [0x00]
//! compact record:    [presence bitset][present values in declaration order]
//!
//! Every length read from the wire is checked against [`protocol::DecodeLimits`]
//! before memory is reserved for it.

pub mod comparator;
pub mod error;
mod io;
pub mod primitive;
pub mod protocol;
pub mod record;
pub mod registry;
pub mod schema;
pub mod session;

pub use comparator::{BytesComparator, RawComparator};
pub use error::{SerializationError, SerializationResult};
pub use primitive::{ElementType, FloatsSerialization, IntsSerialization, PrimitiveArray};
pub use protocol::{DecodeLimits, Protocol};
pub use record::{Record, RecordSerialization};
pub use registry::{SerializationRegistry, SerializationToken};
pub use schema::{Chunk, DataValue, DataValueField, FireValue, FormaValue, TimeSeries};
