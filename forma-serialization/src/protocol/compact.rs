//! Positional encoding driven by a presence bitset.
//!
//! Integers are zigzag varints, doubles are 8 little-endian bytes, strings
//! and lists carry a varint length. Nothing on the wire names a field or a
//! type, so the reader can only notice schema skew when a value cannot fit
//! the type expected at its position.

use std::io::{Read, Write};

use super::{DecodeLimits, FieldSet, FieldSpec};
use crate::{
    error::{SerializationError, SerializationResult},
    io::{checked_length, fill, read_bytes, read_vec, write_all},
};

const MAX_VARINT_LEN: usize = 10;

pub struct CompactWriter<'a> {
    out: &'a mut dyn Write,
}

impl<'a> CompactWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    pub fn write_field_set(&mut self, set: &FieldSet) -> SerializationResult<()> {
        write_all(self.out, &set.to_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> SerializationResult<()> {
        self.write_varint(zigzag_encode(value as i64))
    }

    pub fn write_i32(&mut self, value: i32) -> SerializationResult<()> {
        self.write_varint(zigzag_encode(value as i64))
    }

    pub fn write_i64(&mut self, value: i64) -> SerializationResult<()> {
        self.write_varint(zigzag_encode(value))
    }

    pub fn write_double(&mut self, value: f64) -> SerializationResult<()> {
        write_all(self.out, &value.to_bits().to_le_bytes())
    }

    pub fn write_string(&mut self, value: &str) -> SerializationResult<()> {
        self.write_length(value.len(), "string")?;
        write_all(self.out, value.as_bytes())
    }

    pub fn write_i32_list(&mut self, values: &[i32]) -> SerializationResult<()> {
        self.write_length(values.len(), "list")?;
        values.iter().try_for_each(|v| self.write_i32(*v))
    }

    fn write_length(&mut self, len: usize, context: &'static str) -> SerializationResult<()> {
        if len > i32::MAX as usize {
            return Err(SerializationError::LengthOutOfBounds {
                context,
                length: len as i64,
                limit: i32::MAX as usize,
            });
        }
        self.write_varint(len as u64)
    }

    fn write_varint(&mut self, mut value: u64) -> SerializationResult<()> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let mut n = 0;
        loop {
            if value < 0x80 {
                buf[n] = value as u8;
                n += 1;
                break;
            }
            buf[n] = (value as u8 & 0x7f) | 0x80;
            value >>= 7;
            n += 1;
        }
        write_all(self.out, &buf[..n])
    }
}

pub struct CompactReader<'a> {
    input: &'a mut dyn Read,
    limits: DecodeLimits,
    records: Vec<&'static str>,
}

impl<'a> CompactReader<'a> {
    pub fn new(input: &'a mut dyn Read, limits: DecodeLimits) -> Self {
        Self {
            input,
            limits,
            records: Vec::new(),
        }
    }

    pub fn record(&self) -> &'static str {
        self.records.last().copied().unwrap_or("<top level>")
    }

    pub fn enter_struct(&mut self, name: &'static str) -> SerializationResult<()> {
        if self.records.len() >= self.limits.max_depth {
            return Err(SerializationError::structural(
                name,
                format!("nesting deeper than {} structs", self.limits.max_depth),
            ));
        }
        self.records.push(name);
        Ok(())
    }

    pub fn exit_struct(&mut self) {
        self.records.pop();
    }

    /// Read the presence bitset of `fields`; every required field must be present.
    pub fn read_field_set(&mut self, fields: &[FieldSpec]) -> SerializationResult<FieldSet> {
        let width = fields.len();
        let mut bytes = vec![0u8; width.div_ceil(8)];
        fill(self.input, &mut bytes, "presence bitset")?;
        let set = FieldSet::from_bytes(&bytes, width, self.record())?;
        if let Some((_, missing)) = fields
            .iter()
            .enumerate()
            .find(|(i, field)| field.is_required() && !set.get(*i))
        {
            return Err(SerializationError::structural(
                self.record(),
                format!("required field `{}` ({}) is missing", missing.name, missing.id),
            ));
        }
        Ok(set)
    }

    /// Read the value at `index` when its presence bit is set.
    pub fn read_if<T, F>(
        &mut self,
        present: &FieldSet,
        index: usize,
        read_value: F,
    ) -> SerializationResult<Option<T>>
    where
        F: FnOnce(&mut Self) -> SerializationResult<T>,
    {
        if present.get(index) {
            read_value(self).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_i16(&mut self, field: &'static str) -> SerializationResult<i16> {
        let value = self.read_zigzag(field, "i16")?;
        i16::try_from(value).map_err(|_| self.mismatch(field, "i16", "wider integer"))
    }

    pub fn read_i32(&mut self, field: &'static str) -> SerializationResult<i32> {
        let value = self.read_zigzag(field, "i32")?;
        i32::try_from(value).map_err(|_| self.mismatch(field, "i32", "wider integer"))
    }

    pub fn read_i64(&mut self, field: &'static str) -> SerializationResult<i64> {
        self.read_zigzag(field, "i64")
    }

    pub fn read_double(&mut self, _field: &'static str) -> SerializationResult<f64> {
        Ok(f64::from_bits(u64::from_le_bytes(read_bytes(
            self.input, "double",
        )?)))
    }

    pub fn read_string(&mut self, field: &'static str) -> SerializationResult<String> {
        let len = self.read_length(field, "string")?;
        let bytes = read_vec(self.input, len, "string")?;
        String::from_utf8(bytes).map_err(|source| SerializationError::InvalidUtf8 {
            context: "string field",
            source,
        })
    }

    pub fn read_i32_list(&mut self, field: &'static str) -> SerializationResult<Vec<i32>> {
        let len = self.read_length(field, "list")?;
        let mut values = Vec::with_capacity(len.min(crate::io::PREALLOCATION_LIMIT));
        for _ in 0..len {
            values.push(self.read_i32(field)?);
        }
        Ok(values)
    }

    fn read_length(
        &mut self,
        field: &'static str,
        context: &'static str,
    ) -> SerializationResult<usize> {
        let len = self.read_varint(field, "length")?;
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        checked_length(len, self.limits.max_container_length, context)
    }

    fn read_zigzag(&mut self, field: &'static str, expected: &'static str) -> SerializationResult<i64> {
        Ok(zigzag_decode(self.read_varint(field, expected)?))
    }

    fn read_varint(&mut self, field: &'static str, expected: &'static str) -> SerializationResult<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = read_bytes::<1>(self.input, "varint")?[0];
            value |= ((byte & 0x7f) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(self.mismatch(field, expected, "unterminated varint"))
    }

    fn mismatch(
        &self,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    ) -> SerializationError {
        SerializationError::TypeMismatch {
            record: self.record(),
            field,
            expected,
            found,
        }
    }
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
