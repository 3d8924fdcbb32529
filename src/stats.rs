//! Database statistics.
//!
//! A quick view of how much is tracked and how much still waits for
//! `ragdoll index`.

use anyhow::Result;

use ragdoll_core::models::StoreStats;

use crate::config::Config;
use crate::session::Session;

/// Query the store and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let session = Session::open(config).await?;
    let result = session.store_stats().await;
    let stats = session.finish(result).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    if json {
        let obj = serde_json::json!({
            "database": config.db.path.display().to_string(),
            "size_bytes": db_size,
            "embedding_dims": config.embedding.dims,
            "files": stats.files,
            "dirty_files": stats.dirty_files,
            "never_indexed": stats.never_indexed,
            "chunks": stats.chunks,
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
        return Ok(());
    }

    print_stats(config, &stats, db_size);
    Ok(())
}

fn print_stats(config: &Config, stats: &StoreStats, db_size: u64) {
    println!("Ragdoll Database Stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Dimensions:  {}", config.embedding.dims);
    println!();
    println!("  Files:       {}", stats.files);
    println!(
        "  Indexed:     {} / {}",
        stats.files - stats.dirty_files,
        stats.files
    );
    println!("  Dirty:       {}", stats.dirty_files);
    println!("  Never run:   {}", stats.never_indexed);
    println!("  Chunks:      {}", stats.chunks);
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
