use std::sync::Arc;

use anyhow::Context;
use forma_pail::{Pail, PailError, PailStructure, WholeFile, WholeFileScheme};
use forma_serialization::Protocol;
use object_store::{path::Path, ObjectStore};

use crate::chunk_pail::ChunkPail;

pub async fn ingest(
    store: Arc<dyn ObjectStore>,
    pail_name: String,
    source: String,
    split: Option<bool>,
    protocol: Option<Protocol>,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let prefix = Path::from(format!("{}/{}", forma_config::INGEST_DIR_PREFIX.as_ref(), source));
    let files = WholeFileScheme::new(store.clone())
        .source_all(&prefix)
        .await
        .with_context(|| format!("Failed to read input files under {}", prefix))?;

    let pail = ChunkPail::open_or_create(store, &pail_name, split, protocol).await?;
    let (written, skipped) = match &pail {
        ChunkPail::Flat(pail) => write_files(pail, &files, fail_fast).await?,
        ChunkPail::Split(pail) => write_files(pail, &files, fail_fast).await?,
    };

    println!(
        "Ingested {} of {} files into pail {} ({} skipped)",
        written,
        files.len(),
        pail_name,
        skipped
    );
    Ok(())
}

async fn write_files<S: PailStructure>(
    pail: &Pail<S>,
    files: &[WholeFile],
    fail_fast: bool,
) -> anyhow::Result<(usize, usize)> {
    let mut writer = pail.writer();
    let mut skipped = 0;
    for file in files {
        match writer.write_encoded(&file.bytes) {
            Ok(()) => {}
            Err(PailError::Serialization(e)) if e.is_data_error() && !fail_fast => {
                tracing::warn!("Skipping {}: {}", file.path, e);
                skipped += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to ingest {}", file.path)))
            }
        }
    }

    let written = writer.buffered_records();
    let paths = writer.finish().await?;
    tracing::debug!("Wrote {} pail files", paths.len());
    Ok((written, skipped))
}
