//! # Ragdoll CLI (`ragdoll`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragdoll init` | Create the SQLite database and run schema migrations |
//! | `ragdoll add <path>` | Track a file, or every matching file under a directory |
//! | `ragdoll index` | Chunk and embed dirty files |
//! | `ragdoll list` | List tracked files |
//! | `ragdoll search "<query>"` | Semantic search over indexed files |
//! | `ragdoll preview <path>` | Show a tracked file and its chunks |
//! | `ragdoll delete <path>` | Stop tracking a file |
//! | `ragdoll stats` | Database summary |
//!
//! ## Examples
//!
//! ```bash
//! ragdoll init
//! ragdoll add ./docs --metadata '{"project": "handbook"}'
//! ragdoll index --limit 100
//! ragdoll search "how are refunds processed" --chunks
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ragdoll::config::{self, DEFAULT_CONFIG_PATH};
use ragdoll::progress::ProgressMode;
use ragdoll::{add, delete, index_cmd, list, logging, preview, search, session, stats};

/// Ragdoll: track files, embed their chunks, and search them by meaning.
///
/// All commands accept `--config` pointing to a TOML file. See
/// `ragdoll.example.toml` for every key.
#[derive(Parser)]
#[command(name = "ragdoll", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./ragdoll.toml`; built-in defaults are used when that
    /// file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the embedding provider, e.g. `mock` or `ollama/nomic-embed-text`.
    #[arg(long, global = true)]
    embedder: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent. Records the configured embedding dimension and refuses
    /// to open a database created with a different one.
    Init,

    /// Track a file, or every file under a directory.
    ///
    /// Unchanged files stay clean; new or modified files are marked dirty
    /// and picked up by the next `ragdoll index`.
    Add {
        path: PathBuf,

        /// JSON object stored with the file and returned in search results.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Chunk, embed, and store dirty files.
    Index {
        /// Maximum number of files to process (default: indexing.batch_limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Mark every tracked file dirty before indexing.
        #[arg(long)]
        refresh: bool,

        /// Progress output on stderr (default: human on a TTY, else off).
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// List tracked files.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },

    /// Search indexed files.
    Search {
        query: String,

        /// Maximum number of files (default: retrieval.default_limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Include the matching chunks of each file.
        #[arg(long)]
        chunks: bool,
    },

    /// Show a tracked file with its chunks.
    Preview { path: PathBuf },

    /// Stop tracking a file and delete its chunks.
    Delete {
        path: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Show database statistics.
    Stats,

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "ragdoll", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let (path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut cfg = config::load_config(&path, explicit)?;
    if let Some(embedder) = &cli.embedder {
        cfg = cfg.with_embedder(embedder)?;
    }
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            let session = session::Session::open(&cfg).await?;
            session.finish(Ok(())).await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "database": cfg.db.path.display().to_string(),
                        "embedding_dims": cfg.embedding.dims,
                    })
                );
            } else {
                println!("Database initialized successfully.");
            }
        }
        Commands::Add { path, metadata } => {
            add::run_add(&cfg, &path, metadata.as_deref(), json).await?;
        }
        Commands::Index {
            limit,
            refresh,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            index_cmd::run_index(&cfg, limit, refresh, progress, json).await?;
        }
        Commands::List { page, per_page } => {
            list::run_list(&cfg, page, per_page, json).await?;
        }
        Commands::Search {
            query,
            limit,
            chunks,
        } => {
            search::run_search(&cfg, &query, limit, chunks, json).await?;
        }
        Commands::Preview { path } => {
            if !preview::run_preview(&cfg, &path, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Delete { path, yes } => {
            delete::run_delete(&cfg, &path, yes, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg, json).await?;
        }
        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(ExitCode::SUCCESS)
}
