//! Field-tagged binary encoding.
//!
//! Layout of a struct: zero or more `[wire type: u8][tag: i16 BE][value]`
//! entries followed by a single `0x00` stop byte. Struct begin and end carry
//! no bytes of their own; every struct, nested or not, must be closed by its
//! own stop byte. Scalars are big-endian, doubles are written as their IEEE
//! bits, strings and lists carry an `i32` length prefix.

use std::io::{Read, Write};

use super::{DecodeLimits, FieldHeader, FieldSpec, WireType};
use crate::{
    error::{SerializationError, SerializationResult},
    io::{checked_length, read_bytes, read_vec, write_all},
};

pub struct VerboseWriter<'a> {
    out: &'a mut dyn Write,
}

impl<'a> VerboseWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    pub fn write_struct_begin(&mut self, _name: &'static str) -> SerializationResult<()> {
        Ok(())
    }

    pub fn write_struct_end(&mut self) -> SerializationResult<()> {
        Ok(())
    }

    pub fn write_field_begin(&mut self, spec: &FieldSpec) -> SerializationResult<()> {
        self.write_byte(spec.wire_type as u8)?;
        self.write_i16(spec.id)
    }

    pub fn write_field_end(&mut self) -> SerializationResult<()> {
        Ok(())
    }

    pub fn write_field_stop(&mut self) -> SerializationResult<()> {
        self.write_byte(WireType::Stop as u8)
    }

    pub fn write_byte(&mut self, value: u8) -> SerializationResult<()> {
        write_all(self.out, &[value])
    }

    pub fn write_bool(&mut self, value: bool) -> SerializationResult<()> {
        self.write_byte(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> SerializationResult<()> {
        write_all(self.out, &value.to_be_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> SerializationResult<()> {
        write_all(self.out, &value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> SerializationResult<()> {
        write_all(self.out, &value.to_be_bytes())
    }

    pub fn write_double(&mut self, value: f64) -> SerializationResult<()> {
        write_all(self.out, &value.to_bits().to_be_bytes())
    }

    pub fn write_string(&mut self, value: &str) -> SerializationResult<()> {
        self.write_length(value.len(), "string")?;
        write_all(self.out, value.as_bytes())
    }

    pub fn write_list_begin(
        &mut self,
        element_type: WireType,
        len: usize,
    ) -> SerializationResult<()> {
        self.write_byte(element_type as u8)?;
        self.write_length(len, "list")
    }

    fn write_length(&mut self, len: usize, context: &'static str) -> SerializationResult<()> {
        let len = i32::try_from(len).map_err(|_| SerializationError::LengthOutOfBounds {
            context,
            length: len as i64,
            limit: i32::MAX as usize,
        })?;
        self.write_i32(len)
    }

    /// Write a required field: header, value, field end.
    pub fn field<F>(&mut self, spec: &FieldSpec, write_value: F) -> SerializationResult<()>
    where
        F: FnOnce(&mut Self) -> SerializationResult<()>,
    {
        self.write_field_begin(spec)?;
        write_value(self)?;
        self.write_field_end()
    }

    /// Write an optional field only when it is set.
    pub fn optional_field<T, F>(
        &mut self,
        spec: &FieldSpec,
        value: Option<&T>,
        write_value: F,
    ) -> SerializationResult<()>
    where
        T: ?Sized,
        F: FnOnce(&mut Self, &T) -> SerializationResult<()>,
    {
        match value {
            Some(value) => self.field(spec, |w| write_value(w, value)),
            None => Ok(()),
        }
    }
}

pub struct VerboseReader<'a> {
    input: &'a mut dyn Read,
    limits: DecodeLimits,
    records: Vec<&'static str>,
}

impl<'a> VerboseReader<'a> {
    pub fn new(input: &'a mut dyn Read, limits: DecodeLimits) -> Self {
        Self {
            input,
            limits,
            records: Vec::new(),
        }
    }

    /// Name of the struct currently being decoded.
    pub fn record(&self) -> &'static str {
        self.records.last().copied().unwrap_or("<top level>")
    }

    pub fn read_struct_begin(&mut self, name: &'static str) -> SerializationResult<()> {
        if self.records.len() >= self.limits.max_depth {
            return Err(SerializationError::structural(
                name,
                format!("nesting deeper than {} structs", self.limits.max_depth),
            ));
        }
        self.records.push(name);
        Ok(())
    }

    pub fn read_struct_end(&mut self) -> SerializationResult<()> {
        match self.records.pop() {
            Some(_) => Ok(()),
            None => Err(SerializationError::structural(
                "<top level>",
                "struct end without matching struct begin",
            )),
        }
    }

    pub fn read_field_begin(&mut self) -> SerializationResult<FieldHeader> {
        let record = self.record();
        let wire_type = WireType::from_byte(self.read_byte()?, record)?;
        if wire_type == WireType::Stop {
            return Ok(FieldHeader { id: 0, wire_type });
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { id, wire_type })
    }

    pub fn read_byte(&mut self) -> SerializationResult<u8> {
        Ok(read_bytes::<1>(self.input, "byte")?[0])
    }

    pub fn read_bool(&mut self) -> SerializationResult<bool> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_i16(&mut self) -> SerializationResult<i16> {
        Ok(i16::from_be_bytes(read_bytes(self.input, "i16")?))
    }

    pub fn read_i32(&mut self) -> SerializationResult<i32> {
        Ok(i32::from_be_bytes(read_bytes(self.input, "i32")?))
    }

    pub fn read_i64(&mut self) -> SerializationResult<i64> {
        Ok(i64::from_be_bytes(read_bytes(self.input, "i64")?))
    }

    pub fn read_double(&mut self) -> SerializationResult<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(read_bytes(
            self.input, "double",
        )?)))
    }

    pub fn read_string(&mut self) -> SerializationResult<String> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes).map_err(|source| SerializationError::InvalidUtf8 {
            context: "string field",
            source,
        })
    }

    fn read_binary(&mut self) -> SerializationResult<Vec<u8>> {
        let len = self.read_length("string")?;
        read_vec(self.input, len, "string")
    }

    /// Returns the element type and size of a list.
    pub fn read_list_begin(&mut self) -> SerializationResult<(WireType, usize)> {
        let element_type = WireType::from_byte(self.read_byte()?, self.record())?;
        let len = self.read_length("list")?;
        Ok((element_type, len))
    }

    fn read_length(&mut self, context: &'static str) -> SerializationResult<usize> {
        let len = self.read_i32()?;
        checked_length(len as i64, self.limits.max_container_length, context)
    }

    /// Read a `list<i32>` whose header must declare `i32` elements.
    pub fn read_i32_list(&mut self, field: &'static str) -> SerializationResult<Vec<i32>> {
        let (element_type, len) = self.read_list_begin()?;
        if element_type != WireType::I32 {
            return Err(SerializationError::structural(
                self.record(),
                format!("list field `{field}` declares {element_type} elements, expected i32"),
            ));
        }
        let mut values = Vec::with_capacity(len.min(crate::io::PREALLOCATION_LIMIT));
        for _ in 0..len {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }

    /// Discard a field the schema does not recognise.
    pub fn skip_field(&mut self, header: &FieldHeader) -> SerializationResult<()> {
        tracing::debug!(
            record = self.record(),
            tag = header.id,
            wire_type = header.wire_type.name(),
            "skipping unrecognised field"
        );
        self.skip(header.wire_type)
    }

    /// Consume one value of `wire_type` without interpreting it.
    pub fn skip(&mut self, wire_type: WireType) -> SerializationResult<()> {
        match wire_type {
            WireType::Stop | WireType::Void => Ok(()),
            WireType::Bool | WireType::Byte => self.read_byte().map(drop),
            WireType::I16 => self.read_i16().map(drop),
            WireType::I32 => self.read_i32().map(drop),
            WireType::I64 | WireType::Double => self.read_i64().map(drop),
            WireType::String => self.read_binary().map(drop),
            WireType::Struct => {
                self.read_struct_begin("<skipped struct>")?;
                loop {
                    let header = self.read_field_begin()?;
                    if header.is_stop() {
                        break;
                    }
                    self.skip(header.wire_type)?;
                }
                self.read_struct_end()
            }
            WireType::Map => {
                let key_type = WireType::from_byte(self.read_byte()?, self.record())?;
                let value_type = WireType::from_byte(self.read_byte()?, self.record())?;
                self.check_element_type(key_type, "map key")?;
                self.check_element_type(value_type, "map value")?;
                let len = self.read_length("map")?;
                self.skip_nested(|r| {
                    for _ in 0..len {
                        r.skip(key_type)?;
                        r.skip(value_type)?;
                    }
                    Ok(())
                })
            }
            WireType::Set | WireType::List => {
                let (element_type, len) = self.read_list_begin()?;
                self.check_element_type(element_type, "list element")?;
                self.skip_nested(|r| {
                    for _ in 0..len {
                        r.skip(element_type)?;
                    }
                    Ok(())
                })
            }
        }
    }

    /// Stop and void elements occupy no bytes, so a container of them could
    /// declare any number of elements without the input ever running out.
    fn check_element_type(
        &self,
        wire_type: WireType,
        context: &'static str,
    ) -> SerializationResult<()> {
        match wire_type {
            WireType::Stop | WireType::Void => Err(SerializationError::structural(
                self.record(),
                format!("{context} declared with zero-width type {wire_type}"),
            )),
            _ => Ok(()),
        }
    }

    /// Containers count towards the nesting depth while their elements are skipped.
    fn skip_nested<F>(&mut self, skip_elements: F) -> SerializationResult<()>
    where
        F: FnOnce(&mut Self) -> SerializationResult<()>,
    {
        self.read_struct_begin("<skipped container>")?;
        skip_elements(self)?;
        self.read_struct_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Requirement;

    fn limits() -> DecodeLimits {
        DecodeLimits {
            max_array_length: 1024,
            max_container_length: 1024,
            max_depth: 4,
        }
    }

    const NAME: FieldSpec = FieldSpec {
        id: 3,
        name: "name",
        wire_type: WireType::String,
        requirement: Requirement::Required,
    };

    #[test]
    fn field_header_is_type_then_tag() {
        let mut buf = Vec::new();
        let mut writer = VerboseWriter::new(&mut buf);
        writer.field(&NAME, |w| w.write_string("ab")).unwrap();
        writer.write_field_stop().unwrap();

        assert_eq!(buf, vec![11, 0, 3, 0, 0, 0, 2, b'a', b'b', 0]);
    }

    #[test]
    fn skip_consumes_nested_containers() {
        let mut buf = Vec::new();
        let mut writer = VerboseWriter::new(&mut buf);
        // list<string> ["x", "yz"], then an i32 that must still be readable
        writer.write_list_begin(WireType::String, 2).unwrap();
        writer.write_string("x").unwrap();
        writer.write_string("yz").unwrap();
        writer.write_i32(77).unwrap();

        let mut input = buf.as_slice();
        let mut reader = VerboseReader::new(&mut input, limits());
        reader.skip(WireType::List).unwrap();
        assert_eq!(reader.read_i32().unwrap(), 77);
    }

    #[test]
    fn negative_string_length_is_rejected() {
        let bytes = (-5i32).to_be_bytes();
        let mut input = &bytes[..];
        let mut reader = VerboseReader::new(&mut input, limits());
        let err = reader.read_string().unwrap_err();
        assert!(matches!(
            err,
            SerializationError::LengthOutOfBounds { length: -5, .. }
        ));
    }

    #[test]
    fn skip_rejects_zero_width_container_elements() {
        // list<void> declaring 1000 elements
        let bytes = [WireType::Void as u8, 0, 0, 0x03, 0xe8];
        let mut input = &bytes[..];
        let mut reader = VerboseReader::new(&mut input, limits());
        let err = reader.skip(WireType::List).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));

        // map<i32, stop>
        let bytes = [WireType::I32 as u8, WireType::Stop as u8, 0, 0, 0, 1];
        let mut input = &bytes[..];
        let mut reader = VerboseReader::new(&mut input, limits());
        let err = reader.skip(WireType::Map).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    }

    #[test]
    fn skip_enforces_depth_limit() {
        // four nested structs, each opened by a struct-typed field with tag 1
        let mut buf = Vec::new();
        for _ in 0..5 {
            buf.extend_from_slice(&[WireType::Struct as u8, 0, 1]);
        }
        let mut input = buf.as_slice();
        let mut reader = VerboseReader::new(&mut input, limits());
        reader.read_field_begin().unwrap();
        let err = reader.skip(WireType::Struct).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    }
}
