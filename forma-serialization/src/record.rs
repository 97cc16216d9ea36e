//! Structured record codec.
//!
//! A [`Record`] knows how to write and read itself in both protocols; the
//! free functions here wrap that with stream handling, validation and the
//! trailing-bytes check for in-memory buffers.

use std::{
    io::{Read, Write},
    marker::PhantomData,
};

use crate::{
    error::{SerializationError, SerializationResult},
    protocol::{
        CompactReader, CompactWriter, DecodeLimits, FieldSpec, Protocol, VerboseReader,
        VerboseWriter,
    },
    registry::{Deserializer, Serialization, Serializer},
};

pub trait Record: Sized + Send + 'static {
    /// Struct name used in diagnostics.
    const NAME: &'static str;
    /// Declared fields in declaration order. Compact bit `i` is `FIELDS[i]`.
    const FIELDS: &'static [FieldSpec];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()>;
    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self>;
    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()>;
    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self>;

    /// Structural check run before encoding and after decoding.
    fn validate(&self) -> SerializationResult<()> {
        Ok(())
    }
}

/// Unwrap a required field collected while decoding.
pub fn required<T>(value: Option<T>, record: &'static str, spec: &FieldSpec) -> SerializationResult<T> {
    value.ok_or_else(|| {
        SerializationError::structural(
            record,
            format!("required field `{}` ({}) is missing", spec.name, spec.id),
        )
    })
}

pub fn write_record<R: Record>(
    out: &mut dyn Write,
    record: &R,
    protocol: Protocol,
) -> SerializationResult<()> {
    record.validate()?;
    match protocol {
        Protocol::Verbose => record.write_verbose(&mut VerboseWriter::new(out)),
        Protocol::Compact => record.write_compact(&mut CompactWriter::new(out)),
    }
}

pub fn read_record<R: Record>(
    input: &mut dyn Read,
    protocol: Protocol,
    limits: DecodeLimits,
) -> SerializationResult<R> {
    let record = match protocol {
        Protocol::Verbose => R::read_verbose(&mut VerboseReader::new(input, limits))?,
        Protocol::Compact => R::read_compact(&mut CompactReader::new(input, limits))?,
    };
    record.validate()?;
    Ok(record)
}

pub fn encode<R: Record>(record: &R, protocol: Protocol) -> SerializationResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_record(&mut buf, record, protocol)?;
    Ok(buf)
}

pub fn decode<R: Record>(bytes: &[u8], protocol: Protocol) -> SerializationResult<R> {
    decode_with_limits(bytes, protocol, DecodeLimits::default())
}

/// Decode exactly one record from `bytes`; leftover bytes are a structural error.
pub fn decode_with_limits<R: Record>(
    bytes: &[u8],
    protocol: Protocol,
    limits: DecodeLimits,
) -> SerializationResult<R> {
    let mut input = bytes;
    let record = read_record(&mut input, protocol, limits)?;
    if !input.is_empty() {
        return Err(SerializationError::structural(
            R::NAME,
            format!("{} trailing bytes after record", input.len()),
        ));
    }
    Ok(record)
}

/// Registry adapter for any [`Record`] type.
pub struct RecordSerialization<R> {
    protocol: Protocol,
    limits: DecodeLimits,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordSerialization<R> {
    pub fn new(protocol: Protocol, limits: DecodeLimits) -> Self {
        Self {
            protocol,
            limits,
            _record: PhantomData,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl<R: Record> Default for RecordSerialization<R> {
    fn default() -> Self {
        Self::new(Protocol::from_config(), DecodeLimits::default())
    }
}

impl<R: Record> Serialization<R> for RecordSerialization<R> {
    fn serializer(&self) -> Box<dyn Serializer<R>> {
        Box::new(RecordSerializer {
            protocol: self.protocol,
            _record: PhantomData,
        })
    }

    fn deserializer(&self) -> Box<dyn Deserializer<R>> {
        Box::new(RecordDeserializer {
            protocol: self.protocol,
            limits: self.limits,
            _record: PhantomData,
        })
    }
}

struct RecordSerializer<R> {
    protocol: Protocol,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Serializer<R> for RecordSerializer<R> {
    fn serialize(&mut self, out: &mut dyn Write, value: &R) -> SerializationResult<()> {
        write_record(out, value, self.protocol)
    }
}

struct RecordDeserializer<R> {
    protocol: Protocol,
    limits: DecodeLimits,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Deserializer<R> for RecordDeserializer<R> {
    fn deserialize(&mut self, input: &mut dyn Read) -> SerializationResult<R> {
        read_record(input, self.protocol, self.limits)
    }
}
