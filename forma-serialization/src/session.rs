//! Codec instances bound to an owned stream.
//!
//! A session owns its stream from `open` until `close` returns it. Dropping
//! a session without closing it still flushes a writer, so the stream is
//! released on every exit path including early returns through `?`.

use std::io::{Read, Write};

use crate::{
    error::{SerializationError, SerializationResult},
    registry::{Deserializer, Serializer},
};

pub struct SerializerSession<T, W: Write> {
    serializer: Box<dyn Serializer<T>>,
    out: Option<W>,
}

impl<T, W: Write> SerializerSession<T, W> {
    pub fn open(serializer: Box<dyn Serializer<T>>, out: W) -> Self {
        Self {
            serializer,
            out: Some(out),
        }
    }

    pub fn serialize(&mut self, value: &T) -> SerializationResult<()> {
        let out = self
            .out
            .as_mut()
            .ok_or(SerializationError::Unsupported("serialize on a closed session"))?;
        self.serializer.serialize(out, value)
    }

    /// Flush and hand the stream back.
    pub fn close(mut self) -> SerializationResult<W> {
        let mut out = self
            .out
            .take()
            .ok_or(SerializationError::Unsupported("close on a closed session"))?;
        out.flush()?;
        Ok(out)
    }
}

impl<T, W: Write> Drop for SerializerSession<T, W> {
    fn drop(&mut self) {
        if let Some(out) = self.out.as_mut() {
            if let Err(e) = out.flush() {
                tracing::warn!("Failed to flush unclosed serializer session: {}", e);
            }
        }
    }
}

pub struct DeserializerSession<T, R: Read> {
    deserializer: Box<dyn Deserializer<T>>,
    input: R,
}

impl<T, R: Read> DeserializerSession<T, R> {
    pub fn open(deserializer: Box<dyn Deserializer<T>>, input: R) -> Self {
        Self {
            deserializer,
            input,
        }
    }

    pub fn deserialize(&mut self) -> SerializationResult<T> {
        self.deserializer.deserialize(&mut self.input)
    }

    pub fn close(self) -> R {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io, rc::Rc};

    use crate::{registry::SerializationRegistry, schema::DataValue};

    /// Writer that records whether it was flushed.
    struct Tracked {
        bytes: Vec<u8>,
        flushed: Rc<RefCell<bool>>,
    }

    impl io::Write for Tracked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.flushed.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn close_returns_flushed_stream() {
        let registry = SerializationRegistry::with_defaults().unwrap();
        let mut session = registry.open_serializer::<Vec<i32>, _>(Vec::new()).unwrap();
        session.serialize(&vec![1, 2]).unwrap();
        session.serialize(&vec![]).unwrap();
        let bytes = session.close().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 0]);

        let mut session = registry
            .open_deserializer::<Vec<i32>, _>(bytes.as_slice())
            .unwrap();
        assert_eq!(session.deserialize().unwrap(), vec![1, 2]);
        assert_eq!(session.deserialize().unwrap(), Vec::<i32>::new());
        assert!(session.close().is_empty());
    }

    #[test]
    fn dropped_session_still_flushes() {
        let registry = SerializationRegistry::with_defaults().unwrap();
        let flushed = Rc::new(RefCell::new(false));
        {
            let out = Tracked {
                bytes: Vec::new(),
                flushed: flushed.clone(),
            };
            let mut session = registry.open_serializer::<DataValue, _>(out).unwrap();
            session.serialize(&DataValue::IntVal(1)).unwrap();
        }
        assert!(*flushed.borrow());
    }
}
