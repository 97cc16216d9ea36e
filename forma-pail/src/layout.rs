//! Object layout of a pail.
//!
//! ```text
//! <root>/
//!     ├── pail.meta             (JSON descriptor: format, structure, properties)
//!     ├── <sha256>.pailfile     (records routed to the empty target)
//!     ├── <segment>/
//!     │   ├── <sha256>.pailfile
//!     │   ├── <segment>/...
//! ```

/// JSON descriptor written once when the pail is created.
pub const PAIL_META_FILE: &str = "pail.meta";

/// Extension of record files. Other objects under the root are ignored.
pub const PAIL_FILE_EXTENSION: &str = "pailfile";

/// Value of the `format` field in the descriptor.
pub const PAIL_FORMAT: &str = "framed-records";

pub const PAIL_FORMAT_VERSION: u32 = 1;
