//! Wire protocols for structured records.
//!
//! Two encodings share one in-memory model:
//!
//! * [`verbose`]: every present field carries a `[wire type][tag]` header and
//!   the struct ends with a stop marker. Readers skip tags they do not know,
//!   which is what makes schema evolution possible.
//! * [`compact`]: a presence bitset followed by raw values in declaration
//!   order. Smaller, but writer and reader must agree on the exact schema.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{SerializationError, SerializationResult};

pub mod compact;
pub mod verbose;

pub use compact::{CompactReader, CompactWriter};
pub use verbose::{VerboseReader, VerboseWriter};

/// Selects one of the two record encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Verbose,
    Compact,
}

impl Protocol {
    /// Protocol named by `FORMA_RECORD_PROTOCOL`, falling back to verbose.
    pub fn from_config() -> Self {
        forma_config::CONFIG
            .record_protocol
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("{}; using verbose record protocol", e);
                Protocol::Verbose
            })
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" | "binary" => Ok(Protocol::Verbose),
            "compact" | "tuple" => Ok(Protocol::Compact),
            other => Err(format!(
                "Unknown record protocol: {} (valid: verbose, compact)",
                other
            )),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Verbose => write!(f, "verbose"),
            Protocol::Compact => write!(f, "compact"),
        }
    }
}

/// Type byte written in front of every verbose field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl WireType {
    pub fn from_byte(byte: u8, record: &'static str) -> SerializationResult<Self> {
        Ok(match byte {
            0 => WireType::Stop,
            1 => WireType::Void,
            2 => WireType::Bool,
            3 => WireType::Byte,
            4 => WireType::Double,
            6 => WireType::I16,
            8 => WireType::I32,
            10 => WireType::I64,
            11 => WireType::String,
            12 => WireType::Struct,
            13 => WireType::Map,
            14 => WireType::Set,
            15 => WireType::List,
            other => {
                return Err(SerializationError::structural(
                    record,
                    format!("unknown wire type byte {other}"),
                ))
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            WireType::Stop => "stop",
            WireType::Void => "void",
            WireType::Bool => "bool",
            WireType::Byte => "byte",
            WireType::Double => "double",
            WireType::I16 => "i16",
            WireType::I32 => "i32",
            WireType::I64 => "i64",
            WireType::String => "string",
            WireType::Struct => "struct",
            WireType::Map => "map",
            WireType::Set => "set",
            WireType::List => "list",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// Static description of one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: i16,
    pub name: &'static str,
    pub wire_type: WireType,
    pub requirement: Requirement,
}

impl FieldSpec {
    pub const fn required(id: i16, name: &'static str, wire_type: WireType) -> Self {
        FieldSpec {
            id,
            name,
            wire_type,
            requirement: Requirement::Required,
        }
    }

    pub const fn optional(id: i16, name: &'static str, wire_type: WireType) -> Self {
        FieldSpec {
            id,
            name,
            wire_type,
            requirement: Requirement::Optional,
        }
    }

    pub const fn is_required(&self) -> bool {
        matches!(self.requirement, Requirement::Required)
    }
}

/// Header read in front of a verbose field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub id: i16,
    pub wire_type: WireType,
}

impl FieldHeader {
    pub fn is_stop(&self) -> bool {
        self.wire_type == WireType::Stop
    }
}

/// Bounds applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum element count of a primitive array.
    pub max_array_length: usize,
    /// Maximum byte length of a string and maximum size of a list, set or map.
    pub max_container_length: usize,
    /// Maximum struct nesting depth, including the outermost record.
    pub max_depth: usize,
}

impl DecodeLimits {
    pub fn from_config() -> Self {
        let config = &*forma_config::CONFIG;
        DecodeLimits {
            max_array_length: config.max_array_length,
            max_container_length: config.max_container_length,
            max_depth: config.max_nesting_depth,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from_config()
    }
}

/// Presence bitset used by the compact protocol, one bit per declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    bits: u64,
    width: usize,
}

impl FieldSet {
    pub const MAX_WIDTH: usize = 64;

    pub fn new(width: usize) -> Self {
        assert!(width <= Self::MAX_WIDTH, "field set wider than 64 bits");
        FieldSet { bits: 0, width }
    }

    /// Set holding exactly the required fields of `fields`.
    pub fn with_required(fields: &[FieldSpec]) -> Self {
        let mut set = FieldSet::new(fields.len());
        for (i, field) in fields.iter().enumerate() {
            set.set_if(i, field.is_required());
        }
        set
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.width);
        self.bits |= 1 << index;
    }

    pub fn set_if(&mut self, index: usize, present: bool) {
        if present {
            self.set(index);
        }
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.width && self.bits & (1 << index) != 0
    }

    pub fn cardinality(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of bytes used on the wire.
    pub fn byte_len(&self) -> usize {
        self.width.div_ceil(8)
    }

    /// Bit `i` lands in byte `len - 1 - i / 8`, at position `i % 8`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.byte_len();
        let mut bytes = vec![0u8; len];
        for i in 0..self.width {
            if self.get(i) {
                bytes[len - 1 - i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    pub fn from_bytes(
        bytes: &[u8],
        width: usize,
        record: &'static str,
    ) -> SerializationResult<Self> {
        let mut set = FieldSet::new(width);
        let len = bytes.len();
        for (pos, byte) in bytes.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) == 0 {
                    continue;
                }
                let index = (len - 1 - pos) * 8 + bit;
                if index >= width {
                    return Err(SerializationError::structural(
                        record,
                        format!("presence bit {index} set beyond declared width {width}"),
                    ));
                }
                set.set(index);
            }
        }
        Ok(set)
    }
}
