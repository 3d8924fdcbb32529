//! `ragdoll add`: start tracking files.
//!
//! A file path is registered directly. A directory is walked and every file
//! matching the `[tracking]` globs is registered with the same metadata.
//! Nothing is embedded here; `ragdoll index` picks up the dirty records.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use ragdoll_core::models::{FileRecord, Metadata};
use ragdoll_core::tracker::ChangeTracker;

use crate::config::{Config, TrackingConfig};
use crate::session::Session;

/// Parse `--metadata` JSON. It must be an object.
pub fn parse_metadata(raw: Option<&str>) -> Result<Metadata> {
    let Some(raw) = raw else {
        return Ok(Metadata::new());
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| "Invalid JSON string in --metadata")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("--metadata must be a JSON object, got: {}", other),
    }
}

/// Expand `path` into the files to register.
pub fn collect_paths(tracking: &TrackingConfig, path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let include_set = build_globset(&tracking.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(tracking.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut paths = Vec::new();
    let walker = WalkDir::new(path).follow_links(tracking.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.path();
        let relative = file.strip_prefix(path).unwrap_or(file);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }
        paths.push(file.to_path_buf());
    }

    // Sort for deterministic ordering
    paths.sort();
    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Register every file under `path`. Returns the stored records.
pub async fn add_paths(
    tracker: &ChangeTracker,
    tracking: &TrackingConfig,
    path: &Path,
    metadata: &Metadata,
) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    for file in collect_paths(tracking, path)? {
        let record = tracker
            .register_or_update(&file, metadata.clone())
            .await
            .with_context(|| format!("Failed to add {}", file.display()))?;
        records.push(record);
    }
    Ok(records)
}

pub async fn run_add(config: &Config, path: &Path, metadata: Option<&str>, json: bool) -> Result<()> {
    let metadata = parse_metadata(metadata)?;

    let session = Session::open(config).await?;
    let result = add_paths(&session.tracker, &config.tracking, path, &metadata).await;
    let records = session.finish(result).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        let state = if record.is_dirty { "dirty" } else { "unchanged" };
        println!("{}  {}  {}", record.id, state, record.path);
    }
    let dirty = records.iter().filter(|r| r.is_dirty).count();
    println!();
    println!(
        "Tracked {} file(s), {} awaiting indexing. Run 'ragdoll index' to process them.",
        records.len(),
        dirty
    );
    Ok(())
}
