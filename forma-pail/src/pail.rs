//! Directory-partitioned record store on top of an [`ObjectStore`].

use std::{fmt, sync::Arc};

use bytes::Bytes;
use futures::TryStreamExt;
use hmac_sha256::Hash;
use indexmap::IndexMap;
use object_store::{path::Path, ObjectMeta, ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};

use crate::{
    error::{PailError, PailResult},
    layout::{PAIL_FILE_EXTENSION, PAIL_FORMAT, PAIL_FORMAT_VERSION, PAIL_META_FILE},
    pail_file::{frame_record, read_frames},
    structure::{is_literal_segment, PailStructure},
};

/// Contents of `pail.meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PailSpec {
    pub format: String,
    pub version: u32,
    pub structure: String,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl PailSpec {
    pub fn for_structure<S: PailStructure>(structure: &S) -> Self {
        PailSpec {
            format: PAIL_FORMAT.to_string(),
            version: PAIL_FORMAT_VERSION,
            structure: structure.name().to_string(),
            properties: structure.properties(),
        }
    }

    /// Whether a pail described by `self` can be read with a structure described by `expected`.
    fn is_compatible_with(&self, expected: &PailSpec) -> bool {
        self.format == expected.format
            && self.version <= expected.version
            && self.structure == expected.structure
            && self.properties == expected.properties
    }
}

impl fmt::Display for PailSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} structure {}", self.format, self.version, self.structure)?;
        for (key, value) in &self.properties {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Read the descriptor of the pail at `root`.
pub async fn read_spec(store: &dyn ObjectStore, root: &Path) -> PailResult<PailSpec> {
    let location = root.child(PAIL_META_FILE);
    match store.get(&location).await {
        Ok(result) => Ok(serde_json::from_slice(&result.bytes().await?)?),
        Err(object_store::Error::NotFound { .. }) => {
            Err(PailError::MissingMetadata(root.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub struct Pail<S> {
    store: Arc<dyn ObjectStore>,
    root: Path,
    structure: S,
    spec: PailSpec,
}

impl<S: PailStructure> Pail<S> {
    /// Create a pail at `root`, or open it when one with the same structure already exists.
    pub async fn create(store: Arc<dyn ObjectStore>, root: Path, structure: S) -> PailResult<Self> {
        let spec = PailSpec::for_structure(&structure);
        match read_spec(store.as_ref(), &root).await {
            Ok(found) => {
                Self::verify(&root, &found, &spec)?;
                tracing::debug!("Pail at {} already exists", root);
            }
            Err(PailError::MissingMetadata(_)) => {
                let location = root.child(PAIL_META_FILE);
                let body = serde_json::to_vec_pretty(&spec)?;
                store.put(&location, PutPayload::from(body)).await?;
                tracing::info!("Created pail at {} ({})", root, spec);
            }
            Err(e) => return Err(e),
        }
        Ok(Pail {
            store,
            root,
            structure,
            spec,
        })
    }

    /// Open an existing pail, checking it was written with a compatible structure.
    pub async fn open(store: Arc<dyn ObjectStore>, root: Path, structure: S) -> PailResult<Self> {
        let found = read_spec(store.as_ref(), &root).await?;
        Self::verify(&root, &found, &PailSpec::for_structure(&structure))?;
        Ok(Pail {
            store,
            root,
            structure,
            spec: found,
        })
    }

    fn verify(root: &Path, found: &PailSpec, expected: &PailSpec) -> PailResult<()> {
        if found.is_compatible_with(expected) {
            Ok(())
        } else {
            Err(PailError::StructureMismatch {
                root: root.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn structure(&self) -> &S {
        &self.structure
    }

    pub fn spec(&self) -> &PailSpec {
        &self.spec
    }

    pub fn writer(&self) -> PailWriter<'_, S> {
        PailWriter {
            pail: self,
            buffers: IndexMap::new(),
            records: 0,
        }
    }

    /// Distinct valid targets that hold at least one record file, sorted.
    pub async fn targets(&self) -> PailResult<Vec<Vec<String>>> {
        let mut targets: Vec<Vec<String>> = self
            .entries()
            .await?
            .into_iter()
            .map(|(dirs, _)| dirs)
            .collect();
        targets.dedup();
        Ok(targets)
    }

    /// Record files under valid targets, sorted by target then name.
    pub async fn files(&self) -> PailResult<Vec<Path>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|(_, location)| location)
            .collect())
    }

    pub async fn records(&self) -> PailResult<Vec<S::Record>> {
        self.records_under(&[]).await
    }

    /// Records whose target starts with `prefix`.
    pub async fn records_under(&self, prefix: &[String]) -> PailResult<Vec<S::Record>> {
        self.raw_records_under(prefix)
            .await?
            .iter()
            .map(|bytes| self.structure.deserialize(bytes))
            .collect()
    }

    /// Stored bytes of the records whose target starts with `prefix`.
    pub async fn raw_records_under(&self, prefix: &[String]) -> PailResult<Vec<Bytes>> {
        let mut records = Vec::new();
        for (dirs, location) in self.entries().await? {
            if !dirs.starts_with(prefix) {
                continue;
            }
            let body = self.store.get(&location).await?.bytes().await?;
            records.extend(read_frames(body, location.as_ref())?);
        }
        Ok(records)
    }

    async fn entries(&self) -> PailResult<Vec<(Vec<String>, Path)>> {
        let objects: Vec<ObjectMeta> = self.store.list(Some(&self.root)).try_collect().await?;
        let mut entries = Vec::new();
        for meta in objects {
            if meta.location.extension() != Some(PAIL_FILE_EXTENSION) {
                continue;
            }
            let Some(parts) = meta.location.prefix_match(&self.root) else {
                continue;
            };
            let mut dirs: Vec<String> = parts.map(|part| part.as_ref().to_string()).collect();
            dirs.pop();
            if !self.structure.is_valid_target(&dirs) {
                tracing::warn!("Skipping {}: not a valid target for {}", meta.location, self.spec);
                continue;
            }
            entries.push((dirs, meta.location));
        }
        entries.sort();
        Ok(entries)
    }

    fn check_target(&self, target: &[String]) -> PailResult<()> {
        let literal = target.iter().all(|segment| is_literal_segment(segment));
        if literal && self.structure.is_valid_target(target) {
            Ok(())
        } else {
            Err(PailError::InvalidTarget {
                structure: self.structure.name().to_string(),
                target: target.to_vec(),
            })
        }
    }

    fn location_for(&self, target: &[String], file_name: String) -> Path {
        target
            .iter()
            .fold(self.root.clone(), |path, segment| path.child(segment.as_str()))
            .child(file_name)
    }
}

/// Buffers routed records and uploads one file per target on [`PailWriter::finish`].
pub struct PailWriter<'a, S> {
    pail: &'a Pail<S>,
    buffers: IndexMap<Vec<String>, Vec<u8>>,
    records: usize,
}

impl<S: PailStructure> PailWriter<'_, S> {
    pub fn write(&mut self, record: &S::Record) -> PailResult<()> {
        let target = self.pail.structure.target(record);
        let bytes = self.pail.structure.serialize(record)?;
        self.append(target, &bytes)
    }

    /// Route already encoded bytes and store them unchanged.
    pub fn write_encoded(&mut self, bytes: &[u8]) -> PailResult<()> {
        let record = self.pail.structure.deserialize(bytes)?;
        let target = self.pail.structure.target(&record);
        self.append(target, bytes)
    }

    pub fn buffered_records(&self) -> usize {
        self.records
    }

    fn append(&mut self, target: Vec<String>, bytes: &[u8]) -> PailResult<()> {
        self.pail.check_target(&target)?;
        frame_record(self.buffers.entry(target).or_default(), bytes)?;
        self.records += 1;
        Ok(())
    }

    /// Upload buffered records. Files are named by the SHA-256 of their contents.
    pub async fn finish(self) -> PailResult<Vec<Path>> {
        let mut written = Vec::with_capacity(self.buffers.len());
        for (target, body) in self.buffers {
            let name = format!("{}.{}", hex(&Hash::hash(&body)), PAIL_FILE_EXTENSION);
            let location = self.pail.location_for(&target, name);
            let size = body.len();
            self.pail.store.put(&location, PutPayload::from(body)).await?;
            tracing::debug!("Uploaded {} ({} bytes)", location, size);
            written.push(location);
        }
        tracing::info!(
            "Wrote {} records in {} files to pail {}",
            self.records,
            written.len(),
            self.pail.root
        );
        Ok(written)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
