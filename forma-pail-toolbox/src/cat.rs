use std::sync::Arc;

use object_store::ObjectStore;

use crate::chunk_pail::{parse_target, ChunkPail};

pub async fn cat(
    store: Arc<dyn ObjectStore>,
    pail_name: String,
    target: Option<String>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let pail = ChunkPail::open(store, &pail_name).await?;
    let prefix = target.as_deref().map(parse_target).unwrap_or_default();
    let records = pail.records_under(&prefix).await?;

    let limit = limit.unwrap_or(records.len());
    for chunk in records.iter().take(limit) {
        println!("{}", serde_json::to_string(chunk)?);
    }
    Ok(())
}
