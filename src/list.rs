//! `ragdoll list`: paginated listing of tracked files.

use anyhow::Result;

use ragdoll_core::models::FileListPage;

use crate::config::Config;
use crate::session::Session;

pub async fn run_list(config: &Config, page: u32, per_page: u32, json: bool) -> Result<()> {
    let session = Session::open(config).await?;
    let result = session.tracker.list(page, per_page).await.map_err(anyhow::Error::from);
    let listing = session.finish(result).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print_listing(&listing);
    }
    Ok(())
}

fn print_listing(listing: &FileListPage) {
    let p = &listing.pagination;
    if p.total_count == 0 {
        println!("No files tracked. Use 'ragdoll add <path>' to start.");
        return;
    }

    println!("{:<36}  {:<7}  {:<20}  PATH", "ID", "STATE", "INDEXED");
    for file in &listing.files {
        let state = if file.is_dirty { "dirty" } else { "clean" };
        let indexed = file
            .indexed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("{:<36}  {:<7}  {:<20}  {}", file.id, state, indexed, file.path);
    }
    println!();
    println!(
        "Page {} of {} ({} files total)",
        p.page, p.page_count, p.total_count
    );
}
