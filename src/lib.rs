//! # Ragdoll
//!
//! Local semantic search over a set of tracked files.
//!
//! Files are registered with `ragdoll add`, which hashes their content and
//! marks changed files dirty. `ragdoll index` chunks every dirty file, embeds
//! the chunks, and stores the vectors in SQLite. `ragdoll search` embeds the
//! query, ranks stored chunks by cosine distance, and folds them into
//! file-level results.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ ChangeTracker│──▶│ IndexingPipeline │──▶│  SQLite  │
//! │  add / hash  │   │ Chunk + Embed    │   │ chunks   │
//! └──────────────┘   └──────────────────┘   └────┬─────┘
//!                                                │
//!                                                ▼
//!                                        ┌────────────────┐
//!                                        │SearchAggregator│
//!                                        └────────────────┘
//! ```
//!
//! The algorithms live in `ragdoll-core`; this crate supplies the SQLite
//! store, the HTTP embedding providers, configuration, and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | `Store` implementation over sqlx |
//! | [`embedding`] | OpenAI, Ollama, mock, and local providers |
//! | [`session`] | Per-command store and pipeline wiring |
//! | [`progress`] | Index progress reporting |

pub mod add;
pub mod config;
pub mod db;
pub mod delete;
pub mod embedding;
pub mod index_cmd;
pub mod list;
pub mod logging;
pub mod migrate;
pub mod preview;
pub mod progress;
pub mod search;
pub mod session;
pub mod sqlite_store;
pub mod stats;
