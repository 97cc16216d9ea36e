use serde::{Deserialize, Serialize};

use crate::{
    error::SerializationResult,
    protocol::{CompactReader, CompactWriter, FieldSet, FieldSpec, VerboseReader, VerboseWriter, WireType},
    record::{required, Record},
};

/// Per-pixel series covering periods `start_idx..=end_idx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSeries {
    pub start_idx: i32,
    pub end_idx: i32,
    pub series: Vec<i32>,
}

const START_IDX: FieldSpec = FieldSpec::required(1, "start_idx", WireType::I32);
const END_IDX: FieldSpec = FieldSpec::required(2, "end_idx", WireType::I32);
const SERIES: FieldSpec = FieldSpec::required(3, "series", WireType::List);

impl TimeSeries {
    pub fn new(start_idx: i32, end_idx: i32, series: Vec<i32>) -> Self {
        Self {
            start_idx,
            end_idx,
            series,
        }
    }
}

impl Record for TimeSeries {
    const NAME: &'static str = "TimeSeries";
    const FIELDS: &'static [FieldSpec] = &[START_IDX, END_IDX, SERIES];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        w.write_struct_begin(Self::NAME)?;
        w.field(&START_IDX, |w| w.write_i32(self.start_idx))?;
        w.field(&END_IDX, |w| w.write_i32(self.end_idx))?;
        w.field(&SERIES, |w| {
            w.write_list_begin(WireType::I32, self.series.len())?;
            self.series.iter().try_for_each(|v| w.write_i32(*v))
        })?;
        w.write_field_stop()?;
        w.write_struct_end()
    }

    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self> {
        r.read_struct_begin(Self::NAME)?;
        let (mut start_idx, mut end_idx, mut series) = (None, None, None);
        loop {
            let header = r.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            match (header.id, header.wire_type) {
                (1, WireType::I32) => start_idx = Some(r.read_i32()?),
                (2, WireType::I32) => end_idx = Some(r.read_i32()?),
                (3, WireType::List) => series = Some(r.read_i32_list(SERIES.name)?),
                _ => r.skip_field(&header)?,
            }
        }
        r.read_struct_end()?;

        Ok(TimeSeries {
            start_idx: required(start_idx, Self::NAME, &START_IDX)?,
            end_idx: required(end_idx, Self::NAME, &END_IDX)?,
            series: required(series, Self::NAME, &SERIES)?,
        })
    }

    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        let present = FieldSet::with_required(Self::FIELDS);
        w.write_field_set(&present)?;
        w.write_i32(self.start_idx)?;
        w.write_i32(self.end_idx)?;
        w.write_i32_list(&self.series)
    }

    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self> {
        r.enter_struct(Self::NAME)?;
        let present = r.read_field_set(Self::FIELDS)?;
        let start_idx = r.read_if(&present, 0, |r| r.read_i32(START_IDX.name))?;
        let end_idx = r.read_if(&present, 1, |r| r.read_i32(END_IDX.name))?;
        let series = r.read_if(&present, 2, |r| r.read_i32_list(SERIES.name))?;
        r.exit_struct();

        Ok(TimeSeries {
            start_idx: required(start_idx, Self::NAME, &START_IDX)?,
            end_idx: required(end_idx, Self::NAME, &END_IDX)?,
            series: required(series, Self::NAME, &SERIES)?,
        })
    }
}
