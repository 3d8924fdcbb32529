//! `ragdoll search`: semantic search over indexed files.

use anyhow::Result;

use ragdoll_core::models::SearchResult;

use crate::config::Config;
use crate::session::Session;

/// Run a search and return file-level results.
pub async fn search_files(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    include_chunks: bool,
) -> Result<Vec<SearchResult>> {
    let limit = limit.unwrap_or(config.retrieval.default_limit);
    let session = Session::open(config).await?;
    let result = async {
        let aggregator = session.search(config)?;
        Ok::<_, anyhow::Error>(aggregator.search(query, limit, include_chunks).await?)
    }
    .await;
    session.finish(result).await
}

pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    include_chunks: bool,
    json: bool,
) -> Result<()> {
    let results = search_files(config, query, limit, include_chunks).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, r.score, r.file.path);
        if !r.file.metadata.is_empty() {
            println!(
                "    metadata: {}",
                serde_json::Value::Object(r.file.metadata.clone())
            );
        }
        for chunk in r.matched_chunks.iter().flatten() {
            println!("    chunk {} [{:.3}]", chunk.chunk_index, chunk.score);
            if let Some(content) = &chunk.content {
                println!("      {}", snippet(content, 160));
            }
        }
    }
    Ok(())
}

/// First `max` chars of `text` on one line.
fn snippet(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &flat[..i]),
        None => flat,
    }
}
