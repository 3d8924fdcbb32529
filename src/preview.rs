//! `ragdoll preview`: a tracked file with all its chunks.

use anyhow::Result;
use std::path::Path;

use ragdoll_core::models::FilePreview;

use crate::config::Config;
use crate::session::Session;

/// Look up `path`. `None` means the path is not tracked.
pub async fn preview_file(config: &Config, path: &Path) -> Result<Option<FilePreview>> {
    let session = Session::open(config).await?;
    let result = session.tracker.preview(path).await.map_err(anyhow::Error::from);
    session.finish(result).await
}

/// Print the preview. Returns `false` when the path is not tracked.
pub async fn run_preview(config: &Config, path: &Path, json: bool) -> Result<bool> {
    let Some(preview) = preview_file(config, path).await? else {
        eprintln!("File not tracked: {}", path.display());
        return Ok(false);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(true);
    }

    let f = &preview.file;
    println!("id:           {}", f.id);
    println!("path:         {}", f.path);
    println!("content_hash: {}", f.content_hash);
    println!("dirty:        {}", f.is_dirty);
    println!(
        "indexed_at:   {}",
        f.indexed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "metadata:     {}",
        serde_json::Value::Object(f.metadata.clone())
    );
    println!("chunks:       {}", preview.chunks.len());

    for chunk in &preview.chunks {
        println!();
        println!("--- chunk {} ({} dims) ---", chunk.chunk_index, chunk.embedding.len());
        match &chunk.content {
            Some(text) => println!("{}", text),
            None => println!("(text not stored)"),
        }
    }
    Ok(true)
}
