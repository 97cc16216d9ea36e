//! Record framing inside a `.pailfile`: `([len: i32 BE][record bytes])*`.

use bytes::{Buf, Bytes};

use crate::error::{PailError, PailResult};

/// Append one framed record to `buf`.
pub fn frame_record(buf: &mut Vec<u8>, record: &[u8]) -> PailResult<()> {
    let len = i32::try_from(record.len()).map_err(|_| PailError::MalformedFile {
        path: "<buffer>".to_string(),
        reason: format!("record of {} bytes exceeds the frame limit", record.len()),
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(record);
    Ok(())
}

/// Split a file body into its records without copying them.
pub fn read_frames(mut body: Bytes, path: &str) -> PailResult<Vec<Bytes>> {
    let mut records = Vec::new();
    while body.has_remaining() {
        if body.remaining() < 4 {
            return Err(malformed(path, "truncated frame header"));
        }
        let len = body.get_i32();
        if len < 0 || len as usize > body.remaining() {
            return Err(malformed(
                path,
                format!("frame of {} bytes with {} bytes left", len, body.remaining()),
            ));
        }
        records.push(body.split_to(len as usize));
    }
    Ok(records)
}

fn malformed(path: &str, reason: impl Into<String>) -> PailError {
    PailError::MalformedFile {
        path: path.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_back_into_records() {
        let mut buf = Vec::new();
        frame_record(&mut buf, b"abc").unwrap();
        frame_record(&mut buf, b"").unwrap();
        frame_record(&mut buf, &[0xff]).unwrap();
        assert_eq!(&buf[..7], &[0, 0, 0, 3, b'a', b'b', b'c']);

        let records = read_frames(Bytes::from(buf), "test").unwrap();
        assert_eq!(records, vec![Bytes::from_static(b"abc"), Bytes::new(), Bytes::from_static(&[0xff])]);
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let err = read_frames(Bytes::from_static(&[0, 0, 0, 9, 1]), "x.pailfile").unwrap_err();
        assert!(matches!(err, PailError::MalformedFile { .. }));

        let err = read_frames(Bytes::from_static(&[0, 0]), "x.pailfile").unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }
}
