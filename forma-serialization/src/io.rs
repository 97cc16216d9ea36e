//! Byte-level helpers shared by the array codec and both record protocols.

use std::io::{ErrorKind, Read, Write};

use crate::error::{SerializationError, SerializationResult};

/// Read exactly `N` bytes, mapping a short read onto `StreamExhausted`.
pub(crate) fn read_bytes<const N: usize>(
    input: &mut dyn Read,
    context: &'static str,
) -> SerializationResult<[u8; N]> {
    let mut buf = [0u8; N];
    fill(input, &mut buf, context)?;
    Ok(buf)
}

pub(crate) fn fill(
    input: &mut dyn Read,
    buf: &mut [u8],
    context: &'static str,
) -> SerializationResult<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => SerializationError::StreamExhausted { context },
        _ => SerializationError::Io(e),
    })
}

/// Read `len` bytes without trusting `len` for the initial allocation.
///
/// The buffer grows as bytes actually arrive, so a hostile length on a short
/// stream fails with `StreamExhausted` instead of reserving the full amount.
pub(crate) fn read_vec(
    input: &mut dyn Read,
    len: usize,
    context: &'static str,
) -> SerializationResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(PREALLOCATION_LIMIT));
    let read = (&mut *input).take(len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(SerializationError::StreamExhausted { context });
    }
    Ok(buf)
}

pub(crate) fn write_all(out: &mut dyn Write, bytes: &[u8]) -> SerializationResult<()> {
    out.write_all(bytes).map_err(SerializationError::Io)
}

/// Convert a signed wire length into `usize`, rejecting negatives and values above `limit`.
pub(crate) fn checked_length(
    length: i64,
    limit: usize,
    context: &'static str,
) -> SerializationResult<usize> {
    if length < 0 || length as u64 > limit as u64 {
        return Err(SerializationError::LengthOutOfBounds {
            context,
            length,
            limit,
        });
    }
    Ok(length as usize)
}

/// Largest capacity reserved up front for any length-prefixed value.
pub(crate) const PREALLOCATION_LIMIT: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_is_stream_exhaustion() {
        let mut input: &[u8] = &[1, 2];
        let err = read_bytes::<4>(&mut input, "test value").unwrap_err();
        assert!(matches!(
            err,
            SerializationError::StreamExhausted {
                context: "test value"
            }
        ));
    }

    #[test]
    fn read_vec_does_not_trust_length() {
        let mut input: &[u8] = &[7; 10];
        let err = read_vec(&mut input, usize::MAX / 2, "blob").unwrap_err();
        assert!(matches!(err, SerializationError::StreamExhausted { .. }));
    }

    #[test]
    fn checked_length_rejects_negative_and_oversized() {
        assert!(checked_length(-1, 10, "len").is_err());
        assert!(checked_length(11, 10, "len").is_err());
        assert_eq!(checked_length(10, 10, "len").unwrap(), 10);
    }
}
