use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use super::{cmp_f64, FireValue, FormaValue, TimeSeries};
use crate::{
    error::{SerializationError, SerializationResult},
    protocol::{CompactReader, CompactWriter, FieldSet, FieldSpec, VerboseReader, VerboseWriter, WireType},
    record::Record,
};

/// Payload carried by a chunk: exactly one of a closed set of variants.
///
/// Assigning through one of the `set_*` methods replaces whatever variant
/// was active before. Reading a variant that is not active returns
/// [`SerializationError::UnionStateMisuse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataValue {
    DoubleVal(f64),
    IntVal(i32),
    LongVal(i64),
    ShortVal(i16),
    FireVal(FireValue),
    TimeSeries(TimeSeries),
    Forma(FormaValue),
}

/// Variant selector. Discriminants are the wire tags; tag 7 is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i16)]
pub enum DataValueField {
    DoubleVal = 1,
    IntVal = 2,
    LongVal = 3,
    ShortVal = 4,
    FireVal = 5,
    TimeSeries = 6,
    Forma = 8,
}

const DOUBLE_VAL: FieldSpec = FieldSpec::optional(1, "double_val", WireType::Double);
const INT_VAL: FieldSpec = FieldSpec::optional(2, "int_val", WireType::I32);
const LONG_VAL: FieldSpec = FieldSpec::optional(3, "long_val", WireType::I64);
const SHORT_VAL: FieldSpec = FieldSpec::optional(4, "short_val", WireType::I16);
const FIRE_VAL: FieldSpec = FieldSpec::optional(5, "fire_val", WireType::Struct);
const TIME_SERIES: FieldSpec = FieldSpec::optional(6, "time_series", WireType::Struct);
const FORMA: FieldSpec = FieldSpec::optional(8, "forma", WireType::Struct);

impl DataValueField {
    pub const ALL: [DataValueField; 7] = [
        DataValueField::DoubleVal,
        DataValueField::IntVal,
        DataValueField::LongVal,
        DataValueField::ShortVal,
        DataValueField::FireVal,
        DataValueField::TimeSeries,
        DataValueField::Forma,
    ];

    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }

    pub fn spec(self) -> &'static FieldSpec {
        &DataValue::FIELDS[self.position()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Position in declaration order, which is also the compact bit index.
    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for DataValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DataValue {
    pub fn set_field(&self) -> DataValueField {
        match self {
            DataValue::DoubleVal(_) => DataValueField::DoubleVal,
            DataValue::IntVal(_) => DataValueField::IntVal,
            DataValue::LongVal(_) => DataValueField::LongVal,
            DataValue::ShortVal(_) => DataValueField::ShortVal,
            DataValue::FireVal(_) => DataValueField::FireVal,
            DataValue::TimeSeries(_) => DataValueField::TimeSeries,
            DataValue::Forma(_) => DataValueField::Forma,
        }
    }

    pub fn is_set(&self, field: DataValueField) -> bool {
        self.set_field() == field
    }

    fn misuse(&self, requested: DataValueField) -> SerializationError {
        SerializationError::UnionStateMisuse {
            union: Self::NAME,
            requested: requested.name(),
            active: self.set_field().name(),
        }
    }

    pub fn double_val(&self) -> SerializationResult<f64> {
        match self {
            DataValue::DoubleVal(v) => Ok(*v),
            _ => Err(self.misuse(DataValueField::DoubleVal)),
        }
    }

    pub fn int_val(&self) -> SerializationResult<i32> {
        match self {
            DataValue::IntVal(v) => Ok(*v),
            _ => Err(self.misuse(DataValueField::IntVal)),
        }
    }

    pub fn long_val(&self) -> SerializationResult<i64> {
        match self {
            DataValue::LongVal(v) => Ok(*v),
            _ => Err(self.misuse(DataValueField::LongVal)),
        }
    }

    pub fn short_val(&self) -> SerializationResult<i16> {
        match self {
            DataValue::ShortVal(v) => Ok(*v),
            _ => Err(self.misuse(DataValueField::ShortVal)),
        }
    }

    pub fn fire_val(&self) -> SerializationResult<&FireValue> {
        match self {
            DataValue::FireVal(v) => Ok(v),
            _ => Err(self.misuse(DataValueField::FireVal)),
        }
    }

    pub fn time_series(&self) -> SerializationResult<&TimeSeries> {
        match self {
            DataValue::TimeSeries(v) => Ok(v),
            _ => Err(self.misuse(DataValueField::TimeSeries)),
        }
    }

    pub fn forma(&self) -> SerializationResult<&FormaValue> {
        match self {
            DataValue::Forma(v) => Ok(v),
            _ => Err(self.misuse(DataValueField::Forma)),
        }
    }

    pub fn set_double_val(&mut self, value: f64) {
        *self = DataValue::DoubleVal(value);
    }

    pub fn set_int_val(&mut self, value: i32) {
        *self = DataValue::IntVal(value);
    }

    pub fn set_long_val(&mut self, value: i64) {
        *self = DataValue::LongVal(value);
    }

    pub fn set_short_val(&mut self, value: i16) {
        *self = DataValue::ShortVal(value);
    }

    pub fn set_fire_val(&mut self, value: FireValue) {
        *self = DataValue::FireVal(value);
    }

    pub fn set_time_series(&mut self, value: TimeSeries) {
        *self = DataValue::TimeSeries(value);
    }

    pub fn set_forma(&mut self, value: FormaValue) {
        *self = DataValue::Forma(value);
    }

    fn write_verbose_value(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        match self {
            DataValue::DoubleVal(v) => w.write_double(*v),
            DataValue::IntVal(v) => w.write_i32(*v),
            DataValue::LongVal(v) => w.write_i64(*v),
            DataValue::ShortVal(v) => w.write_i16(*v),
            DataValue::FireVal(v) => v.write_verbose(w),
            DataValue::TimeSeries(v) => v.write_verbose(w),
            DataValue::Forma(v) => v.write_verbose(w),
        }
    }

    fn write_compact_value(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        match self {
            DataValue::DoubleVal(v) => w.write_double(*v),
            DataValue::IntVal(v) => w.write_i32(*v),
            DataValue::LongVal(v) => w.write_i64(*v),
            DataValue::ShortVal(v) => w.write_i16(*v),
            DataValue::FireVal(v) => v.write_compact(w),
            DataValue::TimeSeries(v) => v.write_compact(w),
            DataValue::Forma(v) => v.write_compact(w),
        }
    }

    fn read_verbose_value(
        field: DataValueField,
        r: &mut VerboseReader<'_>,
    ) -> SerializationResult<Self> {
        Ok(match field {
            DataValueField::DoubleVal => DataValue::DoubleVal(r.read_double()?),
            DataValueField::IntVal => DataValue::IntVal(r.read_i32()?),
            DataValueField::LongVal => DataValue::LongVal(r.read_i64()?),
            DataValueField::ShortVal => DataValue::ShortVal(r.read_i16()?),
            DataValueField::FireVal => DataValue::FireVal(FireValue::read_verbose(r)?),
            DataValueField::TimeSeries => DataValue::TimeSeries(TimeSeries::read_verbose(r)?),
            DataValueField::Forma => DataValue::Forma(FormaValue::read_verbose(r)?),
        })
    }

    fn read_compact_value(
        field: DataValueField,
        r: &mut CompactReader<'_>,
    ) -> SerializationResult<Self> {
        let name = field.name();
        Ok(match field {
            DataValueField::DoubleVal => DataValue::DoubleVal(r.read_double(name)?),
            DataValueField::IntVal => DataValue::IntVal(r.read_i32(name)?),
            DataValueField::LongVal => DataValue::LongVal(r.read_i64(name)?),
            DataValueField::ShortVal => DataValue::ShortVal(r.read_i16(name)?),
            DataValueField::FireVal => DataValue::FireVal(FireValue::read_compact(r)?),
            DataValueField::TimeSeries => DataValue::TimeSeries(TimeSeries::read_compact(r)?),
            DataValueField::Forma => DataValue::Forma(FormaValue::read_compact(r)?),
        })
    }
}

impl Record for DataValue {
    const NAME: &'static str = "DataValue";
    const FIELDS: &'static [FieldSpec] = &[
        DOUBLE_VAL,
        INT_VAL,
        LONG_VAL,
        SHORT_VAL,
        FIRE_VAL,
        TIME_SERIES,
        FORMA,
    ];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        w.write_struct_begin(Self::NAME)?;
        w.field(self.set_field().spec(), |w| self.write_verbose_value(w))?;
        w.write_field_stop()?;
        w.write_struct_end()
    }

    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self> {
        r.read_struct_begin(Self::NAME)?;
        let mut value: Option<DataValue> = None;
        loop {
            let header = r.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            let field = DataValueField::from_id(header.id)
                .filter(|field| field.spec().wire_type == header.wire_type);
            match field {
                Some(field) => {
                    if let Some(active) = &value {
                        return Err(SerializationError::structural(
                            Self::NAME,
                            format!(
                                "second variant `{}` after `{}`",
                                field.name(),
                                active.set_field().name()
                            ),
                        ));
                    }
                    value = Some(Self::read_verbose_value(field, r)?);
                }
                None => r.skip_field(&header)?,
            }
        }
        r.read_struct_end()?;

        value.ok_or_else(|| {
            SerializationError::structural(Self::NAME, "union carries no recognised variant")
        })
    }

    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        let mut present = FieldSet::new(Self::FIELDS.len());
        present.set(self.set_field().position());
        w.write_field_set(&present)?;
        self.write_compact_value(w)
    }

    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self> {
        r.enter_struct(Self::NAME)?;
        let present = r.read_field_set(Self::FIELDS)?;
        if present.cardinality() != 1 {
            return Err(SerializationError::structural(
                Self::NAME,
                format!("expected exactly one variant bit, found {}", present.cardinality()),
            ));
        }
        let field = DataValueField::ALL
            .into_iter()
            .enumerate()
            .find(|(position, _)| present.get(*position))
            .map(|(_, field)| field)
            .ok_or_else(|| SerializationError::structural(Self::NAME, "no variant bit set"))?;
        let value = Self::read_compact_value(field, r)?;
        r.exit_struct();
        Ok(value)
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DataValue {}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    /// Active variant tag first, then the payload.
    fn cmp(&self, other: &Self) -> Ordering {
        use DataValue::*;
        match (self, other) {
            (DoubleVal(a), DoubleVal(b)) => cmp_f64(*a, *b),
            (IntVal(a), IntVal(b)) => a.cmp(b),
            (LongVal(a), LongVal(b)) => a.cmp(b),
            (ShortVal(a), ShortVal(b)) => a.cmp(b),
            (FireVal(a), FireVal(b)) => a.cmp(b),
            (TimeSeries(a), TimeSeries(b)) => a.cmp(b),
            (Forma(a), Forma(b)) => a.cmp(b),
            _ => self.set_field().cmp(&other.set_field()),
        }
    }
}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.set_field().hash(state);
        match self {
            DataValue::DoubleVal(v) => v.to_bits().hash(state),
            DataValue::IntVal(v) => v.hash(state),
            DataValue::LongVal(v) => v.hash(state),
            DataValue::ShortVal(v) => v.hash(state),
            DataValue::FireVal(v) => v.hash(state),
            DataValue::TimeSeries(v) => v.hash(state),
            DataValue::Forma(v) => v.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::Protocol, record};

    fn one_of_each() -> Vec<DataValue> {
        vec![
            DataValue::DoubleVal(2.5),
            DataValue::IntVal(42),
            DataValue::LongVal(1 << 40),
            DataValue::ShortVal(-7),
            DataValue::FireVal(FireValue::new(1, 2, 3, 4)),
            DataValue::TimeSeries(TimeSeries::new(693, 695, vec![10, -20, 30])),
            DataValue::Forma(
                FormaValue::new(FireValue::new(0, 0, 0, 1), -0.5, 0.25, 3.0)
                    .with_param_break(1.5),
            ),
        ]
    }

    #[test]
    fn exactly_one_variant_is_set() {
        for value in one_of_each() {
            let active = value.set_field();
            for field in DataValueField::ALL {
                assert_eq!(value.is_set(field), field == active, "{value:?} / {field}");
            }
        }
    }

    #[test]
    fn int_variant_reports_misuse_for_other_accessors() {
        let value = DataValue::IntVal(42);
        assert_eq!(value.int_val().unwrap(), 42);

        let err = value.double_val().unwrap_err();
        assert!(matches!(
            err,
            SerializationError::UnionStateMisuse {
                requested: "double_val",
                active: "int_val",
                ..
            }
        ));
        assert!(!err.is_data_error());
    }

    #[test]
    fn setter_replaces_active_variant() {
        let mut value = DataValue::IntVal(1);
        value.set_fire_val(FireValue::new(5, 6, 7, 8));
        assert!(value.is_set(DataValueField::FireVal));
        assert!(value.int_val().is_err());
        assert_eq!(value.fire_val().unwrap().count, 8);
    }

    #[test]
    fn every_variant_round_trips_in_both_protocols() {
        for protocol in [Protocol::Verbose, Protocol::Compact] {
            for value in one_of_each() {
                let bytes = record::encode(&value, protocol).unwrap();
                let decoded: DataValue = record::decode(&bytes, protocol).unwrap();
                assert_eq!(decoded.set_field(), value.set_field());
                assert_eq!(decoded, value, "{protocol}");
            }
        }
    }

    #[test]
    fn verbose_union_is_a_single_field_struct() {
        let bytes = record::encode(&DataValue::IntVal(42), Protocol::Verbose).unwrap();
        assert_eq!(bytes, vec![WireType::I32 as u8, 0, 2, 0, 0, 0, 42, 0]);
    }

    #[test]
    fn compact_union_is_one_hot_bitset() {
        let bytes = record::encode(&DataValue::ShortVal(-1), Protocol::Compact).unwrap();
        assert_eq!(bytes, vec![0b0000_1000, 1]);
    }

    #[test]
    fn verbose_union_with_two_variants_is_rejected() {
        let mut bytes = vec![WireType::I32 as u8, 0, 2, 0, 0, 0, 1];
        bytes.extend_from_slice(&[WireType::I16 as u8, 0, 4, 0, 2, 0]);
        let err = record::decode::<DataValue>(&bytes, Protocol::Verbose).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    }

    #[test]
    fn verbose_union_with_only_unknown_variant_is_rejected() {
        // retired tag 7 carrying a struct with no fields
        let bytes = vec![WireType::Struct as u8, 0, 7, 0, 0];
        let err = record::decode::<DataValue>(&bytes, Protocol::Verbose).unwrap_err();
        assert!(err.to_string().contains("no recognised variant"), "{err}");
    }

    #[test]
    fn compact_union_with_two_bits_is_rejected() {
        let err = record::decode::<DataValue>(&[0b0000_0011, 0, 0], Protocol::Compact).unwrap_err();
        assert!(matches!(err, SerializationError::StructuralMismatch { .. }));
    }

    #[test]
    fn ordering_compares_tag_before_payload() {
        assert!(DataValue::DoubleVal(1e9) < DataValue::IntVal(-1));
        assert!(DataValue::IntVal(1) < DataValue::IntVal(2));
    }
}
