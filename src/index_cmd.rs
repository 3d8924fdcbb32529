//! `ragdoll index`: process dirty files.

use anyhow::Result;

use ragdoll_core::pipeline::{FileStatus, IndexReport};

use crate::config::Config;
use crate::progress::ProgressMode;
use crate::session::Session;

/// Run one indexing pass and print a summary.
///
/// `refresh` marks every tracked file dirty first. Per-file failures are
/// listed but do not fail the command; the affected files stay dirty for
/// the next run.
pub async fn run_index(
    config: &Config,
    limit: Option<usize>,
    refresh: bool,
    progress: ProgressMode,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.indexing.batch_limit);
    let session = Session::open(config).await?;

    let result = async {
        if refresh {
            let n = session.tracker.mark_all_dirty().await?;
            tracing::info!(files = n, "marked all files dirty");
        }
        let pipeline = session.pipeline(config)?;
        let reporter = progress.reporter();
        Ok::<_, anyhow::Error>(pipeline.run(limit, reporter.as_ref()).await?)
    }
    .await;
    let report = session.finish(result).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &IndexReport) {
    if report.files.is_empty() {
        println!("Nothing to index.");
        return;
    }

    for file in report.files.iter().filter(|f| f.status != FileStatus::Indexed) {
        match &file.error {
            Some(err) => println!("  {:<10} {}: {}", file.status.as_str(), file.path, err),
            None => println!("  {:<10} {}", file.status.as_str(), file.path),
        }
    }

    println!("Indexing complete.");
    for status in [
        FileStatus::Indexed,
        FileStatus::Skipped,
        FileStatus::Aborted,
        FileStatus::Failed,
        FileStatus::TimedOut,
        FileStatus::Superseded,
    ] {
        let n = report.count(status);
        if n > 0 || status == FileStatus::Indexed {
            println!("  {}: {}", status.as_str(), n);
        }
    }
    println!("  chunks written: {}", report.total_chunks());
}
