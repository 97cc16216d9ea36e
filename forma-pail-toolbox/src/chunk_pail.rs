//! Chunk pails of either layout, chosen from the descriptor on disk.

use std::sync::Arc;

use forma_pail::{
    read_spec, DataChunkPailStructure, DatasetRouter, NoRouting, Pail, PailError, PailResult,
    PailSpec,
    SplitDataChunkPailStructure, DATA_CHUNK_STRUCTURE, SPLIT_DATA_CHUNK_STRUCTURE,
};
use forma_serialization::{Chunk, Protocol};
use object_store::{path::Path, ObjectStore};

pub enum ChunkPail {
    Flat(Pail<DataChunkPailStructure>),
    Split(Pail<SplitDataChunkPailStructure>),
}

pub fn pail_root(name: &str) -> Path {
    forma_config::PAILS_DIR_PREFIX.child(name)
}

/// Render a target the way it appears below the pail root.
pub fn display_target(target: &[String]) -> String {
    if target.is_empty() {
        ".".to_string()
    } else {
        target.join("/")
    }
}

pub fn parse_target(target: &str) -> Vec<String> {
    target
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}

impl ChunkPail {
    pub async fn create(
        store: Arc<dyn ObjectStore>,
        name: &str,
        split: bool,
        protocol: Protocol,
    ) -> PailResult<Self> {
        let root = pail_root(name);
        Ok(if split {
            let structure =
                SplitDataChunkPailStructure::new(SPLIT_DATA_CHUNK_STRUCTURE, protocol, DatasetRouter);
            ChunkPail::Split(Pail::create(store, root, structure).await?)
        } else {
            let structure = DataChunkPailStructure::new(DATA_CHUNK_STRUCTURE, protocol, NoRouting);
            ChunkPail::Flat(Pail::create(store, root, structure).await?)
        })
    }

    /// Open the pail called `name`, creating it when it has no descriptor yet.
    ///
    /// `split` and `protocol` choose the layout of a new pail. An existing
    /// pail keeps its own and only fails when an explicit choice disagrees.
    pub async fn open_or_create(
        store: Arc<dyn ObjectStore>,
        name: &str,
        split: Option<bool>,
        protocol: Option<Protocol>,
    ) -> anyhow::Result<Self> {
        match read_spec(store.as_ref(), &pail_root(name)).await {
            Ok(_) => {
                let pail = Self::open(store, name).await?;
                if let Some(split) = split {
                    if split != pail.is_split() {
                        anyhow::bail!(
                            "Pail {} exists with structure {}, which conflicts with --split {}",
                            name,
                            pail.spec().structure,
                            split
                        );
                    }
                }
                if let Some(protocol) = protocol {
                    if protocol != pail.protocol() {
                        anyhow::bail!(
                            "Pail {} exists with protocol {}, which conflicts with --protocol {}",
                            name,
                            pail.protocol(),
                            protocol
                        );
                    }
                }
                Ok(pail)
            }
            Err(PailError::MissingMetadata(_)) => {
                let protocol = protocol.unwrap_or_else(Protocol::from_config);
                Ok(Self::create(store, name, split.unwrap_or(false), protocol).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn open(store: Arc<dyn ObjectStore>, name: &str) -> anyhow::Result<Self> {
        let root = pail_root(name);
        let spec = read_spec(store.as_ref(), &root).await?;
        let protocol = spec
            .properties
            .get("protocol")
            .map(|p| p.parse::<Protocol>())
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or_default();

        tracing::debug!("Opening pail {} ({})", name, spec);
        match spec.structure.as_str() {
            DATA_CHUNK_STRUCTURE => {
                let structure = DataChunkPailStructure::new(DATA_CHUNK_STRUCTURE, protocol, NoRouting);
                Ok(ChunkPail::Flat(Pail::open(store, root, structure).await?))
            }
            SPLIT_DATA_CHUNK_STRUCTURE => {
                let structure = SplitDataChunkPailStructure::new(
                    SPLIT_DATA_CHUNK_STRUCTURE,
                    protocol,
                    DatasetRouter,
                );
                Ok(ChunkPail::Split(Pail::open(store, root, structure).await?))
            }
            other => anyhow::bail!("Pail {} has structure {} which does not hold chunks", name, other),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, ChunkPail::Split(_))
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ChunkPail::Flat(pail) => pail.structure().protocol(),
            ChunkPail::Split(pail) => pail.structure().protocol(),
        }
    }

    pub fn spec(&self) -> &PailSpec {
        match self {
            ChunkPail::Flat(pail) => pail.spec(),
            ChunkPail::Split(pail) => pail.spec(),
        }
    }

    pub async fn targets(&self) -> PailResult<Vec<Vec<String>>> {
        match self {
            ChunkPail::Flat(pail) => pail.targets().await,
            ChunkPail::Split(pail) => pail.targets().await,
        }
    }

    pub async fn files(&self) -> PailResult<Vec<Path>> {
        match self {
            ChunkPail::Flat(pail) => pail.files().await,
            ChunkPail::Split(pail) => pail.files().await,
        }
    }

    pub async fn records_under(&self, prefix: &[String]) -> PailResult<Vec<Chunk>> {
        match self {
            ChunkPail::Flat(pail) => pail.records_under(prefix).await,
            ChunkPail::Split(pail) => pail.records_under(prefix).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use forma_serialization::DataValue;
    use object_store::memory::InMemory;

    use super::*;

    #[tokio::test]
    async fn open_picks_the_layout_from_the_descriptor() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let created = ChunkPail::create(store.clone(), "modis", true, Protocol::Compact)
            .await
            .unwrap();
        if let ChunkPail::Split(pail) = &created {
            let mut writer = pail.writer();
            writer
                .write(&Chunk::new("ndvi", "16", "1000", 1, 2, 0, 24000, DataValue::IntVal(4)))
                .unwrap();
            writer.finish().await.unwrap();
        }

        let opened = ChunkPail::open(store, "modis").await.unwrap();
        assert!(matches!(opened, ChunkPail::Split(_)));
        assert_eq!(opened.spec().properties.get("protocol").map(String::as_str), Some("compact"));
        assert_eq!(opened.targets().await.unwrap(), vec![vec!["ndvi".to_string()]]);
        assert_eq!(opened.records_under(&parse_target("ndvi")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_pail_keeps_its_layout_unless_told_otherwise() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        ChunkPail::create(store.clone(), "modis", true, Protocol::Compact)
            .await
            .unwrap();

        let reopened = ChunkPail::open_or_create(store.clone(), "modis", None, None)
            .await
            .unwrap();
        assert!(reopened.is_split());
        assert_eq!(reopened.protocol(), Protocol::Compact);

        let matching =
            ChunkPail::open_or_create(store.clone(), "modis", Some(true), Some(Protocol::Compact))
                .await;
        assert!(matching.is_ok());

        let err = ChunkPail::open_or_create(store.clone(), "modis", None, Some(Protocol::Verbose))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--protocol"));

        let err = ChunkPail::open_or_create(store, "modis", Some(false), None)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("--split"));
    }

    #[tokio::test]
    async fn missing_pail_is_created_with_the_requested_layout() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let created = ChunkPail::open_or_create(store, "fresh", Some(true), Some(Protocol::Verbose))
            .await
            .unwrap();
        assert!(created.is_split());
        assert_eq!(created.protocol(), Protocol::Verbose);
    }

    #[tokio::test]
    async fn missing_pail_cannot_be_opened() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        assert!(ChunkPail::open(store, "absent").await.is_err());
    }

    #[test]
    fn targets_render_relative_to_the_root() {
        assert_eq!(display_target(&[]), ".");
        assert_eq!(display_target(&["ndvi".to_string()]), "ndvi");
        assert_eq!(parse_target("/ndvi/"), vec!["ndvi".to_string()]);
        assert!(parse_target("").is_empty());
    }
}
