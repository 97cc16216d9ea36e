use std::cmp::Ordering;

/// Orders two encoded values without decoding them.
pub trait RawComparator: Send + Sync {
    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering;
}

/// Unsigned lexicographic order over the raw bytes.
///
/// This is not numeric order: the encoding of `[-1.0f32]` sorts after the
/// encoding of `[1.0f32]` because the sign bit makes its first element byte
/// larger.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesComparator;

impl RawComparator for BytesComparator {
    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering {
        left.cmp(right)
    }
}
