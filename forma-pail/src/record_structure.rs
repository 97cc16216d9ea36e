use std::marker::PhantomData;

use bytes::Bytes;
use indexmap::IndexMap;

use forma_serialization::{
    record::{decode_with_limits, encode},
    Chunk, DecodeLimits, Protocol, Record,
};

use crate::{
    error::PailResult,
    structure::{DatasetRouter, NoRouting, PailStructure, Router},
};

/// Descriptor name of [`DataChunkPailStructure`] pails.
pub const DATA_CHUNK_STRUCTURE: &str = "data_chunk";
/// Descriptor name of [`SplitDataChunkPailStructure`] pails.
pub const SPLIT_DATA_CHUNK_STRUCTURE: &str = "split_data_chunk";

/// Structured records encoded with one record protocol and placed by a [`Router`].
pub struct RecordPailStructure<R, Rt> {
    name: &'static str,
    protocol: Protocol,
    limits: DecodeLimits,
    router: Rt,
    _record: PhantomData<fn() -> R>,
}

/// Chunks stored flat at the pail root.
pub type DataChunkPailStructure = RecordPailStructure<Chunk, NoRouting>;

/// Chunks split into one directory per dataset.
pub type SplitDataChunkPailStructure = RecordPailStructure<Chunk, DatasetRouter>;

impl<R: Record, Rt: Router<R>> RecordPailStructure<R, Rt> {
    pub fn new(name: &'static str, protocol: Protocol, router: Rt) -> Self {
        Self {
            name,
            protocol,
            limits: DecodeLimits::default(),
            router,
            _record: PhantomData,
        }
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl Default for DataChunkPailStructure {
    fn default() -> Self {
        Self::new(DATA_CHUNK_STRUCTURE, Protocol::from_config(), NoRouting)
    }
}

impl Default for SplitDataChunkPailStructure {
    fn default() -> Self {
        Self::new(SPLIT_DATA_CHUNK_STRUCTURE, Protocol::from_config(), DatasetRouter)
    }
}

impl<R: Record, Rt: Router<R>> PailStructure for RecordPailStructure<R, Rt> {
    type Record = R;

    fn name(&self) -> &str {
        self.name
    }

    fn properties(&self) -> IndexMap<String, String> {
        IndexMap::from([
            ("record".to_string(), R::NAME.to_string()),
            ("protocol".to_string(), self.protocol.to_string()),
        ])
    }

    fn serialize(&self, record: &R) -> PailResult<Bytes> {
        Ok(Bytes::from(encode(record, self.protocol)?))
    }

    fn deserialize(&self, bytes: &[u8]) -> PailResult<R> {
        Ok(decode_with_limits(bytes, self.protocol, self.limits)?)
    }

    fn target(&self, record: &R) -> Vec<String> {
        self.router.route(record)
    }

    fn is_valid_target(&self, dirs: &[String]) -> bool {
        self.router.is_valid_target(dirs)
    }
}
