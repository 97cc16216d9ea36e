use serde::{Deserialize, Serialize};

use super::DataValue;
use crate::{
    error::SerializationResult,
    protocol::{CompactReader, CompactWriter, FieldSet, FieldSpec, VerboseReader, VerboseWriter, WireType},
    record::{required, Record},
};

/// One tile of one dataset at a given temporal and spatial resolution.
///
/// Ordering is field by field in declaration order; an absent `date` sorts
/// before any present one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub dataset: String,
    pub tres: String,
    pub sres: String,
    pub h: i32,
    pub v: i32,
    pub id: i32,
    pub size: i32,
    pub data: DataValue,
    pub date: Option<String>,
}

const DATASET: FieldSpec = FieldSpec::required(1, "dataset", WireType::String);
const TRES: FieldSpec = FieldSpec::required(2, "tres", WireType::String);
const SRES: FieldSpec = FieldSpec::required(3, "sres", WireType::String);
const H: FieldSpec = FieldSpec::required(4, "h", WireType::I32);
const V: FieldSpec = FieldSpec::required(5, "v", WireType::I32);
const ID: FieldSpec = FieldSpec::required(6, "id", WireType::I32);
const SIZE: FieldSpec = FieldSpec::required(7, "size", WireType::I32);
const DATA: FieldSpec = FieldSpec::required(8, "data", WireType::Struct);
const DATE: FieldSpec = FieldSpec::optional(9, "date", WireType::String);

impl Chunk {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dataset: impl Into<String>,
        tres: impl Into<String>,
        sres: impl Into<String>,
        h: i32,
        v: i32,
        id: i32,
        size: i32,
        data: DataValue,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            tres: tres.into(),
            sres: sres.into(),
            h,
            v,
            id,
            size,
            data,
            date: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

impl Record for Chunk {
    const NAME: &'static str = "Chunk";
    const FIELDS: &'static [FieldSpec] = &[DATASET, TRES, SRES, H, V, ID, SIZE, DATA, DATE];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        w.write_struct_begin(Self::NAME)?;
        w.field(&DATASET, |w| w.write_string(&self.dataset))?;
        w.field(&TRES, |w| w.write_string(&self.tres))?;
        w.field(&SRES, |w| w.write_string(&self.sres))?;
        w.field(&H, |w| w.write_i32(self.h))?;
        w.field(&V, |w| w.write_i32(self.v))?;
        w.field(&ID, |w| w.write_i32(self.id))?;
        w.field(&SIZE, |w| w.write_i32(self.size))?;
        w.field(&DATA, |w| self.data.write_verbose(w))?;
        w.optional_field(&DATE, self.date.as_deref(), |w, v| w.write_string(v))?;
        w.write_field_stop()?;
        w.write_struct_end()
    }

    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self> {
        r.read_struct_begin(Self::NAME)?;
        let (mut dataset, mut tres, mut sres) = (None, None, None);
        let (mut h, mut v, mut id, mut size) = (None, None, None, None);
        let (mut data, mut date) = (None, None);
        loop {
            let header = r.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            match (header.id, header.wire_type) {
                (1, WireType::String) => dataset = Some(r.read_string()?),
                (2, WireType::String) => tres = Some(r.read_string()?),
                (3, WireType::String) => sres = Some(r.read_string()?),
                (4, WireType::I32) => h = Some(r.read_i32()?),
                (5, WireType::I32) => v = Some(r.read_i32()?),
                (6, WireType::I32) => id = Some(r.read_i32()?),
                (7, WireType::I32) => size = Some(r.read_i32()?),
                (8, WireType::Struct) => data = Some(DataValue::read_verbose(r)?),
                (9, WireType::String) => date = Some(r.read_string()?),
                _ => r.skip_field(&header)?,
            }
        }
        r.read_struct_end()?;

        Ok(Chunk {
            dataset: required(dataset, Self::NAME, &DATASET)?,
            tres: required(tres, Self::NAME, &TRES)?,
            sres: required(sres, Self::NAME, &SRES)?,
            h: required(h, Self::NAME, &H)?,
            v: required(v, Self::NAME, &V)?,
            id: required(id, Self::NAME, &ID)?,
            size: required(size, Self::NAME, &SIZE)?,
            data: required(data, Self::NAME, &DATA)?,
            date,
        })
    }

    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        let mut present = FieldSet::with_required(Self::FIELDS);
        present.set_if(8, self.date.is_some());
        w.write_field_set(&present)?;
        w.write_string(&self.dataset)?;
        w.write_string(&self.tres)?;
        w.write_string(&self.sres)?;
        w.write_i32(self.h)?;
        w.write_i32(self.v)?;
        w.write_i32(self.id)?;
        w.write_i32(self.size)?;
        self.data.write_compact(w)?;
        if let Some(date) = &self.date {
            w.write_string(date)?;
        }
        Ok(())
    }

    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self> {
        r.enter_struct(Self::NAME)?;
        let present = r.read_field_set(Self::FIELDS)?;
        let dataset = r.read_if(&present, 0, |r| r.read_string(DATASET.name))?;
        let tres = r.read_if(&present, 1, |r| r.read_string(TRES.name))?;
        let sres = r.read_if(&present, 2, |r| r.read_string(SRES.name))?;
        let h = r.read_if(&present, 3, |r| r.read_i32(H.name))?;
        let v = r.read_if(&present, 4, |r| r.read_i32(V.name))?;
        let id = r.read_if(&present, 5, |r| r.read_i32(ID.name))?;
        let size = r.read_if(&present, 6, |r| r.read_i32(SIZE.name))?;
        let data = r.read_if(&present, 7, DataValue::read_compact)?;
        let date = r.read_if(&present, 8, |r| r.read_string(DATE.name))?;
        r.exit_struct();

        Ok(Chunk {
            dataset: required(dataset, Self::NAME, &DATASET)?,
            tres: required(tres, Self::NAME, &TRES)?,
            sres: required(sres, Self::NAME, &SRES)?,
            h: required(h, Self::NAME, &H)?,
            v: required(v, Self::NAME, &V)?,
            id: required(id, Self::NAME, &ID)?,
            size: required(size, Self::NAME, &SIZE)?,
            data: required(data, Self::NAME, &DATA)?,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SerializationError, protocol::Protocol, record};

    fn chunk() -> Chunk {
        Chunk::new("ndvi", "16", "1000", 28, 8, 59, 24000, DataValue::IntVal(42))
    }

    #[test]
    fn optional_date_round_trips_in_both_states() {
        for protocol in [Protocol::Verbose, Protocol::Compact] {
            for value in [chunk(), chunk().with_date("2005-12-19")] {
                let bytes = record::encode(&value, protocol).unwrap();
                let decoded: Chunk = record::decode(&bytes, protocol).unwrap();
                assert_eq!(decoded, value);
            }
        }
    }

    #[test]
    fn absent_date_sorts_before_present() {
        assert!(chunk() < chunk().with_date(""));
    }

    #[test]
    fn compact_bitset_spans_two_bytes() {
        let bytes = record::encode(&chunk(), Protocol::Compact).unwrap();
        // nine declared fields, date absent: bit 8 clear in the leading byte
        assert_eq!(&bytes[..2], &[0b0000_0000, 0b1111_1111]);

        let bytes = record::encode(&chunk().with_date("x"), Protocol::Compact).unwrap();
        assert_eq!(&bytes[..2], &[0b0000_0001, 0b1111_1111]);
    }

    #[test]
    fn compact_bit_beyond_width_is_structural() {
        let mut bytes = record::encode(&chunk(), Protocol::Compact).unwrap();
        bytes[0] |= 0b0000_0010;
        let err = record::decode::<Chunk>(&bytes, Protocol::Compact).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    }

    #[test]
    fn compact_cleared_required_bit_is_rejected_before_values() {
        let mut bytes = record::encode(&chunk(), Protocol::Compact).unwrap();
        // clear the `dataset` bit; the value bytes stay in place
        bytes[1] &= !0b0000_0001;
        let err = record::decode::<Chunk>(&bytes, Protocol::Compact).unwrap_err();
        assert!(err.to_string().contains("`dataset`"), "{err}");
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = record::encode(&chunk(), Protocol::Verbose).unwrap();
        bytes.push(0);
        let err = record::decode::<Chunk>(&bytes, Protocol::Verbose).unwrap_err();
        assert!(err.to_string().contains("trailing"), "{err}");
    }
}
