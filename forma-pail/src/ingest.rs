//! Read-only adapters that treat every input file as one opaque record.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use futures::TryStreamExt;
use object_store::{path::Path, ObjectStore};
use serde::{Deserialize, Serialize};

use forma_serialization::{
    registry::{Deserializer, Serialization, Serializer},
    SerializationError, SerializationResult,
};

use crate::error::{PailError, PailResult};

/// Contents of one input file together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl WholeFile {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

/// Source of [`WholeFile`] records backed by an object store. Cannot be written to.
#[derive(Debug, Clone)]
pub struct WholeFileScheme {
    store: Arc<dyn ObjectStore>,
    max_file_size: usize,
}

impl WholeFileScheme {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_max_file_size(store, forma_config::CONFIG.max_whole_file_size)
    }

    pub fn with_max_file_size(store: Arc<dyn ObjectStore>, max_file_size: usize) -> Self {
        Self {
            store,
            max_file_size,
        }
    }

    /// Read one file in full.
    pub async fn source(&self, location: &Path) -> PailResult<WholeFile> {
        let meta = self.store.head(location).await?;
        if meta.size > self.max_file_size {
            return Err(PailError::FileTooLarge {
                path: location.to_string(),
                size: meta.size,
                limit: self.max_file_size,
            });
        }
        let bytes = self.store.get(location).await?.bytes().await?;
        Ok(WholeFile::new(location.to_string(), bytes.to_vec()))
    }

    /// Read every file under `prefix`, ordered by path.
    pub async fn source_all(&self, prefix: &Path) -> PailResult<Vec<WholeFile>> {
        let mut locations: Vec<Path> = self
            .store
            .list(Some(prefix))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;
        locations.sort();
        tracing::debug!("Found {} files under {}", locations.len(), prefix);

        let mut files = Vec::with_capacity(locations.len());
        for location in &locations {
            files.push(self.source(location).await?);
        }
        Ok(files)
    }

    pub fn sink_init(&self) -> PailResult<()> {
        Err(PailError::Unsupported("whole file scheme cannot be used as a sink"))
    }

    pub async fn sink(&self, _file: &WholeFile) -> PailResult<()> {
        Err(PailError::Unsupported("whole file scheme cannot be used as a sink"))
    }
}

/// Registry adapter reading an entire stream as a single payload.
#[derive(Debug, Clone, Copy)]
pub struct WholeFileSerialization {
    max_file_size: usize,
}

impl WholeFileSerialization {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }
}

impl Default for WholeFileSerialization {
    fn default() -> Self {
        Self::new(forma_config::CONFIG.max_whole_file_size)
    }
}

impl Serialization<Vec<u8>> for WholeFileSerialization {
    fn serializer(&self) -> Box<dyn Serializer<Vec<u8>>> {
        Box::new(RejectingSerializer)
    }

    fn deserializer(&self) -> Box<dyn Deserializer<Vec<u8>>> {
        Box::new(WholeFileDeserializer {
            max_file_size: self.max_file_size,
        })
    }
}

struct RejectingSerializer;

impl Serializer<Vec<u8>> for RejectingSerializer {
    fn serialize(&mut self, _out: &mut dyn Write, _value: &Vec<u8>) -> SerializationResult<()> {
        Err(SerializationError::Unsupported(
            "whole file payloads are read-only",
        ))
    }
}

struct WholeFileDeserializer {
    max_file_size: usize,
}

impl Deserializer<Vec<u8>> for WholeFileDeserializer {
    fn deserialize(&mut self, input: &mut dyn Read) -> SerializationResult<Vec<u8>> {
        let mut bytes = Vec::new();
        let limit = self.max_file_size as u64 + 1;
        (&mut *input).take(limit).read_to_end(&mut bytes)?;
        if bytes.len() > self.max_file_size {
            return Err(SerializationError::LengthOutOfBounds {
                context: "whole file payload",
                length: bytes.len() as i64,
                limit: self.max_file_size,
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use forma_serialization::SerializationRegistry;
    use object_store::{memory::InMemory, PutPayload};

    use super::*;

    async fn store_with(files: &[(&str, &[u8])]) -> Arc<dyn ObjectStore> {
        let store = Arc::new(InMemory::new());
        for (path, bytes) in files {
            store
                .put(&Path::from(*path), PutPayload::from(Bytes::copy_from_slice(bytes)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn source_all_reads_every_file_in_path_order() {
        let store = store_with(&[
            ("ingest/b.bin", &b"second"[..]),
            ("ingest/a.bin", &b"first"[..]),
            ("other/c.bin", &b"ignored"[..]),
        ])
        .await;
        let scheme = WholeFileScheme::with_max_file_size(store, 1024);

        let files = scheme.source_all(&Path::from("ingest")).await.unwrap();
        assert_eq!(
            files,
            vec![
                WholeFile::new("ingest/a.bin", b"first".to_vec()),
                WholeFile::new("ingest/b.bin", b"second".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn oversized_file_is_refused() {
        let store = store_with(&[("ingest/big.bin", &[0u8; 32][..])]).await;
        let scheme = WholeFileScheme::with_max_file_size(store, 16);
        let err = scheme.source(&Path::from("ingest/big.bin")).await.unwrap_err();
        assert!(matches!(err, PailError::FileTooLarge { size: 32, .. }));
    }

    #[tokio::test]
    async fn sink_is_unsupported() {
        let scheme = WholeFileScheme::with_max_file_size(Arc::new(InMemory::new()), 16);
        assert!(matches!(scheme.sink_init(), Err(PailError::Unsupported(_))));
        let err = scheme.sink(&WholeFile::new("x", vec![])).await.unwrap_err();
        assert!(matches!(err, PailError::Unsupported(_)));
    }

    #[test]
    fn serialization_reads_whole_stream_and_refuses_writes() {
        let mut registry = SerializationRegistry::new();
        registry
            .register::<Vec<u8>, _>(WholeFileSerialization::new(8))
            .unwrap();

        let mut session = registry.open_deserializer::<Vec<u8>, _>(&b"payload"[..]).unwrap();
        assert_eq!(session.deserialize().unwrap(), b"payload".to_vec());

        let mut session = registry.open_deserializer::<Vec<u8>, _>(&[0u8; 9][..]).unwrap();
        assert!(matches!(
            session.deserialize().unwrap_err(),
            SerializationError::LengthOutOfBounds { .. }
        ));

        let mut session = registry.open_serializer::<Vec<u8>, _>(Vec::new()).unwrap();
        assert!(matches!(
            session.serialize(&vec![1]).unwrap_err(),
            SerializationError::Unsupported(_)
        ));
    }
}
