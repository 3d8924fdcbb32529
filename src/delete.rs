//! `ragdoll delete`: stop tracking a file and drop its chunks.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use crate::config::Config;
use crate::session::Session;

/// Remove `path` from the index. Returns the number of records deleted.
///
/// Without `yes`, asks for confirmation on the terminal and refuses to
/// proceed when stdin is not interactive.
pub async fn run_delete(config: &Config, path: &Path, yes: bool, json: bool) -> Result<u64> {
    if !yes {
        if !atty::is(atty::Stream::Stdin) {
            bail!("Refusing to delete without confirmation; pass --yes when not on a terminal");
        }
        if !confirm(&format!("Stop tracking {}? [y/N] ", path.display()))? {
            println!("Aborted.");
            return Ok(0);
        }
    }

    let session = Session::open(config).await?;
    let result = session.tracker.remove(path).await.map_err(anyhow::Error::from);
    let deleted = session.finish(result).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "path": path.display().to_string(), "deleted": deleted })
        );
    } else if deleted == 0 {
        println!("File not tracked: {}", path.display());
    } else {
        println!("Deleted {}", path.display());
    }
    Ok(deleted)
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }
}
