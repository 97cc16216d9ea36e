//! How records map onto bytes and onto directories inside a pail.

use bytes::Bytes;
use indexmap::IndexMap;
use object_store::path::PathPart;

use forma_serialization::Chunk;

use crate::error::PailResult;

/// Byte codec plus routing for the records stored in one pail.
///
/// `target` must be a pure function of the record: the same record always
/// lands in the same directory.
pub trait PailStructure: Send + Sync {
    type Record: Send;

    /// Identifier persisted in the pail descriptor.
    fn name(&self) -> &str;

    /// Settings that must match between the writer and every later reader.
    fn properties(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn serialize(&self, record: &Self::Record) -> PailResult<Bytes>;

    fn deserialize(&self, bytes: &[u8]) -> PailResult<Self::Record>;

    /// Directory segments below the pail root for `record`.
    fn target(&self, _record: &Self::Record) -> Vec<String> {
        Vec::new()
    }

    /// Whether records may live under `dirs`.
    fn is_valid_target(&self, _dirs: &[String]) -> bool {
        true
    }
}

/// Pure function from a record to its partition path.
pub trait Router<R>: Send + Sync {
    fn route(&self, record: &R) -> Vec<String>;

    fn is_valid_target(&self, _dirs: &[String]) -> bool {
        true
    }
}

/// Everything lands at the pail root.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRouting;

impl<R> Router<R> for NoRouting {
    fn route(&self, _record: &R) -> Vec<String> {
        Vec::new()
    }
}

/// One directory per dataset name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetRouter;

impl Router<Chunk> for DatasetRouter {
    fn route(&self, record: &Chunk) -> Vec<String> {
        vec![record.dataset.clone()]
    }

    fn is_valid_target(&self, dirs: &[String]) -> bool {
        dirs.len() == 1
    }
}

/// A segment is usable as a directory name when the object store keeps it verbatim.
pub fn is_literal_segment(segment: &str) -> bool {
    !segment.is_empty() && PathPart::from(segment).as_ref() == segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use forma_serialization::DataValue;

    fn chunk(dataset: &str) -> Chunk {
        Chunk::new(dataset, "32", "1000", 8, 6, 1, 24000, DataValue::IntVal(1))
    }

    #[test]
    fn dataset_router_uses_dataset_only() {
        assert_eq!(DatasetRouter.route(&chunk("ndvi")), vec!["ndvi".to_string()]);
        assert_eq!(DatasetRouter.route(&chunk("precl")), vec!["precl".to_string()]);

        let mut moved = chunk("ndvi").with_date("2000-02-18");
        moved.h = 30;
        assert_eq!(DatasetRouter.route(&moved), DatasetRouter.route(&chunk("ndvi")));
    }

    #[test]
    fn no_routing_targets_the_root() {
        assert!(Router::<Chunk>::route(&NoRouting, &chunk("ndvi")).is_empty());
        assert!(Router::<Chunk>::is_valid_target(&NoRouting, &["any".into(), "depth".into()]));
    }

    #[test]
    fn dataset_router_accepts_single_level_only() {
        assert!(DatasetRouter.is_valid_target(&["ndvi".into()]));
        assert!(!DatasetRouter.is_valid_target(&[]));
        assert!(!DatasetRouter.is_valid_target(&["ndvi".into(), "extra".into()]));
    }

    #[test]
    fn segments_needing_escapes_are_not_literal() {
        assert!(is_literal_segment("ndvi"));
        assert!(!is_literal_segment(""));
        assert!(!is_literal_segment(".."));
        assert!(!is_literal_segment("a/b"));
    }
}
