use serde::{Deserialize, Serialize};

use crate::{
    error::SerializationResult,
    protocol::{CompactReader, CompactWriter, FieldSet, FieldSpec, VerboseReader, VerboseWriter, WireType},
    record::{required, Record},
};

/// Fire detection counts for one pixel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FireValue {
    pub temp330: i32,
    pub conf50: i32,
    pub both_preds: i32,
    pub count: i32,
}

const TEMP330: FieldSpec = FieldSpec::required(1, "temp330", WireType::I32);
const CONF50: FieldSpec = FieldSpec::required(2, "conf50", WireType::I32);
const BOTH_PREDS: FieldSpec = FieldSpec::required(3, "both_preds", WireType::I32);
const COUNT: FieldSpec = FieldSpec::required(4, "count", WireType::I32);

impl FireValue {
    pub fn new(temp330: i32, conf50: i32, both_preds: i32, count: i32) -> Self {
        Self {
            temp330,
            conf50,
            both_preds,
            count,
        }
    }
}

impl Record for FireValue {
    const NAME: &'static str = "FireValue";
    const FIELDS: &'static [FieldSpec] = &[TEMP330, CONF50, BOTH_PREDS, COUNT];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        w.write_struct_begin(Self::NAME)?;
        w.field(&TEMP330, |w| w.write_i32(self.temp330))?;
        w.field(&CONF50, |w| w.write_i32(self.conf50))?;
        w.field(&BOTH_PREDS, |w| w.write_i32(self.both_preds))?;
        w.field(&COUNT, |w| w.write_i32(self.count))?;
        w.write_field_stop()?;
        w.write_struct_end()
    }

    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self> {
        r.read_struct_begin(Self::NAME)?;
        let (mut temp330, mut conf50, mut both_preds, mut count) = (None, None, None, None);
        loop {
            let header = r.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            match (header.id, header.wire_type) {
                (1, WireType::I32) => temp330 = Some(r.read_i32()?),
                (2, WireType::I32) => conf50 = Some(r.read_i32()?),
                (3, WireType::I32) => both_preds = Some(r.read_i32()?),
                (4, WireType::I32) => count = Some(r.read_i32()?),
                _ => r.skip_field(&header)?,
            }
        }
        r.read_struct_end()?;

        Ok(FireValue {
            temp330: required(temp330, Self::NAME, &TEMP330)?,
            conf50: required(conf50, Self::NAME, &CONF50)?,
            both_preds: required(both_preds, Self::NAME, &BOTH_PREDS)?,
            count: required(count, Self::NAME, &COUNT)?,
        })
    }

    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        let present = FieldSet::with_required(Self::FIELDS);
        w.write_field_set(&present)?;
        w.write_i32(self.temp330)?;
        w.write_i32(self.conf50)?;
        w.write_i32(self.both_preds)?;
        w.write_i32(self.count)
    }

    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self> {
        r.enter_struct(Self::NAME)?;
        let present = r.read_field_set(Self::FIELDS)?;
        let temp330 = r.read_if(&present, 0, |r| r.read_i32(TEMP330.name))?;
        let conf50 = r.read_if(&present, 1, |r| r.read_i32(CONF50.name))?;
        let both_preds = r.read_if(&present, 2, |r| r.read_i32(BOTH_PREDS.name))?;
        let count = r.read_if(&present, 3, |r| r.read_i32(COUNT.name))?;
        r.exit_struct();

        Ok(FireValue {
            temp330: required(temp330, Self::NAME, &TEMP330)?,
            conf50: required(conf50, Self::NAME, &CONF50)?,
            both_preds: required(both_preds, Self::NAME, &BOTH_PREDS)?,
            count: required(count, Self::NAME, &COUNT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::Protocol, record};

    #[test]
    fn compact_form_is_bitset_then_varints() {
        let bytes = record::encode(&FireValue::new(1, 0, -1, 2), Protocol::Compact).unwrap();
        assert_eq!(bytes, vec![0b0000_1111, 2, 0, 1, 4]);
    }

    #[test]
    fn missing_required_field_is_structural() {
        // only `temp330` followed by stop
        let bytes = vec![WireType::I32 as u8, 0, 1, 0, 0, 0, 9, 0];
        let err = record::decode::<FireValue>(&bytes, Protocol::Verbose).unwrap_err();
        assert!(err.to_string().contains("conf50"), "{err}");
    }
}
