//! Chunk record and the payload types its union can carry.

use std::cmp::Ordering;

pub mod chunk;
pub mod data_value;
pub mod fire_value;
pub mod forma_value;
pub mod time_series;

pub use chunk::Chunk;
pub use data_value::{DataValue, DataValueField};
pub use fire_value::FireValue;
pub use forma_value::FormaValue;
pub use time_series::TimeSeries;

/// Total order on doubles so records stay `Eq`/`Ord`.
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
