use std::sync::Arc;

use forma_pail::{
    DatasetRouter, PailStructure, SplitDataChunkPailStructure, WholeFileScheme,
    SPLIT_DATA_CHUNK_STRUCTURE,
};
use forma_serialization::Protocol;
use object_store::{path::Path, ObjectStore};

use crate::chunk_pail::display_target;

pub async fn route(store: Arc<dyn ObjectStore>, file: String, protocol: Protocol) -> anyhow::Result<()> {
    let location = Path::from(format!("{}/{}", forma_config::INGEST_DIR_PREFIX.as_ref(), file));
    let input = WholeFileScheme::new(store).source(&location).await?;

    let structure =
        SplitDataChunkPailStructure::new(SPLIT_DATA_CHUNK_STRUCTURE, protocol, DatasetRouter);
    let chunk = structure.deserialize(&input.bytes)?;
    let target = structure.target(&chunk);
    if !structure.is_valid_target(&target) {
        anyhow::bail!("Chunk in {} has no valid target ({:?})", input.path, target);
    }

    println!("{}", display_target(&target));
    Ok(())
}
