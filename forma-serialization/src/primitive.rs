//! Length-prefixed codec for fixed-width numeric arrays.
//!
//! Layout: `[len: i32 BE][len x 4-byte BE element]`, no padding, no type
//! tag. The element type is implied by the serialization token the host
//! negotiated for the stream.

use std::{
    fmt,
    io::{Read, Write},
    marker::PhantomData,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{SerializationError, SerializationResult},
    io::{checked_length, read_bytes, read_vec, write_all},
    protocol::DecodeLimits,
    registry::{Deserializer, Serialization, Serializer},
};

const ELEMENT_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int32,
    Float32,
}

impl ElementType {
    /// Host wire token for arrays of this element type.
    pub fn token(self) -> u32 {
        match self {
            ElementType::Float32 => 130,
            ElementType::Int32 => 131,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Int32 => write!(f, "int32"),
            ElementType::Float32 => write!(f, "float32"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Element types the array codec supports. Sealed: the set is closed.
pub trait ArrayElement: sealed::Sealed + Copy + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn to_wire(self) -> [u8; 4];
    fn from_wire(bytes: [u8; 4]) -> Self;
}

impl ArrayElement for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::Int32;

    fn to_wire(self) -> [u8; 4] {
        i32::to_be_bytes(self)
    }

    fn from_wire(bytes: [u8; 4]) -> Self {
        i32::from_be_bytes(bytes)
    }
}

impl ArrayElement for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float32;

    fn to_wire(self) -> [u8; 4] {
        f32::to_be_bytes(self)
    }

    fn from_wire(bytes: [u8; 4]) -> Self {
        f32::from_be_bytes(bytes)
    }
}

/// A decoded array whose element type is only known at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveArray {
    Ints(Vec<i32>),
    Floats(Vec<f32>),
}

impl PrimitiveArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            PrimitiveArray::Ints(_) => ElementType::Int32,
            PrimitiveArray::Floats(_) => ElementType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Ints(values) => values.len(),
            PrimitiveArray::Floats(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self) -> SerializationResult<Vec<u8>> {
        match self {
            PrimitiveArray::Ints(values) => encode_array(values),
            PrimitiveArray::Floats(values) => encode_array(values),
        }
    }

    pub fn decode(element_type: ElementType, bytes: &[u8]) -> SerializationResult<Self> {
        let limits = DecodeLimits::default();
        Ok(match element_type {
            ElementType::Int32 => PrimitiveArray::Ints(decode_array(bytes, limits)?),
            ElementType::Float32 => PrimitiveArray::Floats(decode_array(bytes, limits)?),
        })
    }
}

impl From<Vec<i32>> for PrimitiveArray {
    fn from(values: Vec<i32>) -> Self {
        PrimitiveArray::Ints(values)
    }
}

impl From<Vec<f32>> for PrimitiveArray {
    fn from(values: Vec<f32>) -> Self {
        PrimitiveArray::Floats(values)
    }
}

pub fn write_array<E: ArrayElement>(out: &mut dyn Write, values: &[E]) -> SerializationResult<()> {
    let len = i32::try_from(values.len()).map_err(|_| SerializationError::LengthOutOfBounds {
        context: "primitive array",
        length: values.len() as i64,
        limit: i32::MAX as usize,
    })?;
    let mut buf = Vec::with_capacity(ELEMENT_WIDTH * (values.len() + 1));
    buf.extend_from_slice(&len.to_be_bytes());
    for value in values {
        buf.extend_from_slice(&value.to_wire());
    }
    write_all(out, &buf)
}

/// Read one array from a stream.
///
/// The length prefix is checked against `limits` before anything is
/// allocated, and the element buffer grows only as bytes arrive.
pub fn read_array<E: ArrayElement>(
    input: &mut dyn Read,
    limits: DecodeLimits,
) -> SerializationResult<Vec<E>> {
    let len = read_length(input, limits)?;
    let bytes = read_vec(input, len * ELEMENT_WIDTH, "primitive array elements")?;
    Ok(elements(&bytes))
}

pub fn encode_array<E: ArrayElement>(values: &[E]) -> SerializationResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_array(&mut buf, values)?;
    Ok(buf)
}

/// Decode exactly one array occupying all of `bytes`.
pub fn decode_array<E: ArrayElement>(
    bytes: &[u8],
    limits: DecodeLimits,
) -> SerializationResult<Vec<E>> {
    let mut input = bytes;
    let len = read_length(&mut input, limits)?;
    let body = len * ELEMENT_WIDTH;
    if body > input.len() {
        return Err(SerializationError::StreamExhausted {
            context: "primitive array elements",
        });
    }
    if body < input.len() {
        return Err(SerializationError::structural(
            "PrimitiveArray",
            format!("{} trailing bytes after array", input.len() - body),
        ));
    }
    Ok(elements(input))
}

fn read_length(input: &mut dyn Read, limits: DecodeLimits) -> SerializationResult<usize> {
    let len = i32::from_be_bytes(read_bytes(input, "primitive array length")?);
    checked_length(len as i64, limits.max_array_length, "primitive array")
}

fn elements<E: ArrayElement>(bytes: &[u8]) -> Vec<E> {
    bytes
        .chunks_exact(ELEMENT_WIDTH)
        .map(|chunk| E::from_wire([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Registry adapter for `Vec<E>`.
pub struct PrimitiveArraySerialization<E> {
    limits: DecodeLimits,
    _element: PhantomData<fn() -> E>,
}

pub type IntsSerialization = PrimitiveArraySerialization<i32>;
pub type FloatsSerialization = PrimitiveArraySerialization<f32>;

impl<E: ArrayElement> PrimitiveArraySerialization<E> {
    pub fn new(limits: DecodeLimits) -> Self {
        Self {
            limits,
            _element: PhantomData,
        }
    }
}

impl<E: ArrayElement> Default for PrimitiveArraySerialization<E> {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

impl<E: ArrayElement> Serialization<Vec<E>> for PrimitiveArraySerialization<E> {
    fn token(&self) -> Option<u32> {
        Some(E::ELEMENT_TYPE.token())
    }

    fn serializer(&self) -> Box<dyn Serializer<Vec<E>>> {
        Box::new(ArraySerializer::<E>(PhantomData))
    }

    fn deserializer(&self) -> Box<dyn Deserializer<Vec<E>>> {
        Box::new(ArrayDeserializer::<E> {
            limits: self.limits,
            _element: PhantomData,
        })
    }
}

struct ArraySerializer<E>(PhantomData<fn() -> E>);

impl<E: ArrayElement> Serializer<Vec<E>> for ArraySerializer<E> {
    fn serialize(&mut self, out: &mut dyn Write, value: &Vec<E>) -> SerializationResult<()> {
        write_array(out, value)
    }
}

struct ArrayDeserializer<E> {
    limits: DecodeLimits,
    _element: PhantomData<fn() -> E>,
}

impl<E: ArrayElement> Deserializer<Vec<E>> for ArrayDeserializer<E> {
    fn deserialize(&mut self, input: &mut dyn Read) -> SerializationResult<Vec<E>> {
        read_array(input, self.limits)
    }
}
