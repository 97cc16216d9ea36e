use std::sync::Arc;

use object_store::ObjectStore;

use crate::chunk_pail::{display_target, ChunkPail};

pub async fn list(store: Arc<dyn ObjectStore>, pail_name: String) -> anyhow::Result<()> {
    let pail = ChunkPail::open(store, &pail_name).await?;
    let targets = pail.targets().await?;
    let files = pail.files().await?;

    println!("Pail: {}", pail_name);
    println!("Descriptor: {}", pail.spec());
    for (key, value) in &pail.spec().properties {
        println!("  {} = {}", key, value);
    }
    println!("Targets:");
    for target in &targets {
        println!("  {}", display_target(target));
    }
    println!("Number of Targets: {}", targets.len());
    println!("Number of Files: {}", files.len());
    Ok(())
}
