use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use super::{cmp_f64, FireValue};
use crate::{
    error::SerializationResult,
    protocol::{CompactReader, CompactWriter, FieldSet, FieldSpec, VerboseReader, VerboseWriter, WireType},
    record::{required, Record},
};

/// Deforestation statistics for one pixel and period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormaValue {
    pub fire_value: FireValue,
    pub short_drop: f64,
    pub long_drop: f64,
    pub t_stat: f64,
    pub param_break: Option<f64>,
}

const FIRE_VALUE: FieldSpec = FieldSpec::required(1, "fire_value", WireType::Struct);
const SHORT_DROP: FieldSpec = FieldSpec::required(2, "short_drop", WireType::Double);
const LONG_DROP: FieldSpec = FieldSpec::required(3, "long_drop", WireType::Double);
const T_STAT: FieldSpec = FieldSpec::required(4, "t_stat", WireType::Double);
const PARAM_BREAK: FieldSpec = FieldSpec::optional(5, "param_break", WireType::Double);

impl FormaValue {
    pub fn new(fire_value: FireValue, short_drop: f64, long_drop: f64, t_stat: f64) -> Self {
        Self {
            fire_value,
            short_drop,
            long_drop,
            t_stat,
            param_break: None,
        }
    }

    pub fn with_param_break(mut self, param_break: f64) -> Self {
        self.param_break = Some(param_break);
        self
    }
}

impl PartialEq for FormaValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FormaValue {}

impl PartialOrd for FormaValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FormaValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_value
            .cmp(&other.fire_value)
            .then_with(|| cmp_f64(self.short_drop, other.short_drop))
            .then_with(|| cmp_f64(self.long_drop, other.long_drop))
            .then_with(|| cmp_f64(self.t_stat, other.t_stat))
            .then_with(|| match (self.param_break, other.param_break) {
                (Some(a), Some(b)) => cmp_f64(a, b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }
}

impl Hash for FormaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fire_value.hash(state);
        self.short_drop.to_bits().hash(state);
        self.long_drop.to_bits().hash(state);
        self.t_stat.to_bits().hash(state);
        self.param_break.map(f64::to_bits).hash(state);
    }
}

impl Record for FormaValue {
    const NAME: &'static str = "FormaValue";
    const FIELDS: &'static [FieldSpec] = &[FIRE_VALUE, SHORT_DROP, LONG_DROP, T_STAT, PARAM_BREAK];

    fn write_verbose(&self, w: &mut VerboseWriter<'_>) -> SerializationResult<()> {
        w.write_struct_begin(Self::NAME)?;
        w.field(&FIRE_VALUE, |w| self.fire_value.write_verbose(w))?;
        w.field(&SHORT_DROP, |w| w.write_double(self.short_drop))?;
        w.field(&LONG_DROP, |w| w.write_double(self.long_drop))?;
        w.field(&T_STAT, |w| w.write_double(self.t_stat))?;
        w.optional_field(&PARAM_BREAK, self.param_break.as_ref(), |w, v| {
            w.write_double(*v)
        })?;
        w.write_field_stop()?;
        w.write_struct_end()
    }

    fn read_verbose(r: &mut VerboseReader<'_>) -> SerializationResult<Self> {
        r.read_struct_begin(Self::NAME)?;
        let mut fire_value = None;
        let (mut short_drop, mut long_drop, mut t_stat, mut param_break) = (None, None, None, None);
        loop {
            let header = r.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            match (header.id, header.wire_type) {
                (1, WireType::Struct) => fire_value = Some(FireValue::read_verbose(r)?),
                (2, WireType::Double) => short_drop = Some(r.read_double()?),
                (3, WireType::Double) => long_drop = Some(r.read_double()?),
                (4, WireType::Double) => t_stat = Some(r.read_double()?),
                (5, WireType::Double) => param_break = Some(r.read_double()?),
                _ => r.skip_field(&header)?,
            }
        }
        r.read_struct_end()?;

        Ok(FormaValue {
            fire_value: required(fire_value, Self::NAME, &FIRE_VALUE)?,
            short_drop: required(short_drop, Self::NAME, &SHORT_DROP)?,
            long_drop: required(long_drop, Self::NAME, &LONG_DROP)?,
            t_stat: required(t_stat, Self::NAME, &T_STAT)?,
            param_break,
        })
    }

    fn write_compact(&self, w: &mut CompactWriter<'_>) -> SerializationResult<()> {
        let mut present = FieldSet::with_required(Self::FIELDS);
        present.set_if(4, self.param_break.is_some());
        w.write_field_set(&present)?;
        self.fire_value.write_compact(w)?;
        w.write_double(self.short_drop)?;
        w.write_double(self.long_drop)?;
        w.write_double(self.t_stat)?;
        if let Some(param_break) = self.param_break {
            w.write_double(param_break)?;
        }
        Ok(())
    }

    fn read_compact(r: &mut CompactReader<'_>) -> SerializationResult<Self> {
        r.enter_struct(Self::NAME)?;
        let present = r.read_field_set(Self::FIELDS)?;
        let fire_value = r.read_if(&present, 0, FireValue::read_compact)?;
        let short_drop = r.read_if(&present, 1, |r| r.read_double(SHORT_DROP.name))?;
        let long_drop = r.read_if(&present, 2, |r| r.read_double(LONG_DROP.name))?;
        let t_stat = r.read_if(&present, 3, |r| r.read_double(T_STAT.name))?;
        let param_break = r.read_if(&present, 4, |r| r.read_double(PARAM_BREAK.name))?;
        r.exit_struct();

        Ok(FormaValue {
            fire_value: required(fire_value, Self::NAME, &FIRE_VALUE)?,
            short_drop: required(short_drop, Self::NAME, &SHORT_DROP)?,
            long_drop: required(long_drop, Self::NAME, &LONG_DROP)?,
            t_stat: required(t_stat, Self::NAME, &T_STAT)?,
            param_break,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_follow_total_order_equality() {
        let base = FormaValue::new(FireValue::default(), f64::NAN, 0.0, 1.0);
        assert_eq!(base, base.clone());

        let mut negative_zero = base.clone();
        negative_zero.long_drop = -0.0;
        assert_ne!(base, negative_zero);
        assert!(negative_zero < base);
    }

    #[test]
    fn unset_param_break_sorts_first() {
        let unset = FormaValue::new(FireValue::default(), 1.0, 2.0, 3.0);
        let set = unset.clone().with_param_break(-100.0);
        assert!(unset < set);
    }
}
