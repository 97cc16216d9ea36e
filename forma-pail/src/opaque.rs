//! Pails of arbitrary objects whose codec is chosen at runtime.
//!
//! Objects implement [`PailObject`], which `typetag` makes serializable as a
//! trait object. The codec turning them into bytes is built lazily, at most
//! once per structure instance, from a factory supplied by the caller.

use std::{any::Any, fmt::Debug, sync::Arc};

use bytes::Bytes;
use once_cell::sync::OnceCell;

use forma_serialization::Chunk;

use crate::{error::PailResult, ingest::WholeFile, structure::PailStructure};

#[typetag::serde(tag = "type")]
pub trait PailObject: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

#[typetag::serde(name = "chunk")]
impl PailObject for Chunk {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde(name = "whole_file")]
impl PailObject for WholeFile {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Converts trait objects to bytes and back, including their concrete type.
pub trait ObjectCodec: Send + Sync {
    fn encode(&self, object: &dyn PailObject) -> PailResult<Bytes>;
    fn decode(&self, bytes: &[u8]) -> PailResult<Box<dyn PailObject>>;
}

/// Self-describing JSON, tagged with the registered object name.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonObjectCodec;

impl ObjectCodec for JsonObjectCodec {
    fn encode(&self, object: &dyn PailObject) -> PailResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(object)?))
    }

    fn decode(&self, bytes: &[u8]) -> PailResult<Box<dyn PailObject>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub type CodecFactory = Arc<dyn Fn() -> Box<dyn ObjectCodec> + Send + Sync>;

pub struct OpaquePailStructure {
    name: String,
    factory: CodecFactory,
    codec: OnceCell<Box<dyn ObjectCodec>>,
}

impl OpaquePailStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_codec_factory(
            name,
            Arc::new(|| Box::new(JsonObjectCodec) as Box<dyn ObjectCodec>),
        )
    }

    pub fn with_codec_factory(name: impl Into<String>, factory: CodecFactory) -> Self {
        Self {
            name: name.into(),
            factory,
            codec: OnceCell::new(),
        }
    }

    fn codec(&self) -> &dyn ObjectCodec {
        self.codec
            .get_or_init(|| {
                tracing::debug!("Building object codec for pail structure {}", self.name);
                (self.factory)()
            })
            .as_ref()
    }
}

impl Debug for OpaquePailStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaquePailStructure")
            .field("name", &self.name)
            .field("codec_initialized", &self.codec.get().is_some())
            .finish()
    }
}

impl PailStructure for OpaquePailStructure {
    type Record = Box<dyn PailObject>;

    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self, record: &Self::Record) -> PailResult<Bytes> {
        self.codec().encode(record.as_ref())
    }

    fn deserialize(&self, bytes: &[u8]) -> PailResult<Self::Record> {
        self.codec().decode(bytes)
    }
}
