//! Index progress reporting.
//!
//! Reports observable progress during `ragdoll index` so users see which
//! file just finished, how it went, and how much is left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use ragdoll_core::pipeline::{FileReport, IndexProgress, NoProgress};

/// Human-friendly progress on stderr: "index  12 / 40  indexed  /docs/a.md (3 chunks)".
pub struct StderrProgress;

impl IndexProgress for StderrProgress {
    fn file_done(&self, report: &FileReport, done: usize, total: usize) {
        let mut line = format!(
            "index  {} / {}  {:<10} {}",
            format_number(done as u64),
            format_number(total as u64),
            report.status.as_str(),
            report.path
        );
        if report.chunks > 0 {
            line.push_str(&format!(" ({} chunks)", report.chunks));
        }
        if let Some(err) = &report.error {
            line.push_str(&format!(": {}", err));
        }
        line.push('\n');

        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgress for JsonProgress {
    fn file_done(&self, report: &FileReport, done: usize, total: usize) {
        let obj = serde_json::json!({
            "event": "progress",
            "phase": "indexing",
            "n": done,
            "total": total,
            "file": report,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IndexProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
