//! File identity and dirty-state tracking.
//!
//! [`ChangeTracker`] decides whether a file needs (re)indexing by comparing
//! a SHA-256 digest of its current bytes against the digest recorded at the
//! last `add`. The comparison happens inside the store's atomic upsert, so
//! two concurrent `add` calls on the same path cannot lose an update.
//!
//! # State machine
//!
//! ```text
//!   add (new path) ──▶ DIRTY ──index──▶ CLEAN
//!                        ▲                │
//!                        └─add (changed)──┘
//! ```
//!
//! Re-adding an unchanged file only replaces its metadata. `indexed_at` is
//! never touched here; only a successful index pass sets it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{FileListPage, FilePreview, FileRecord, Metadata, NewFile, Pagination};
use crate::store::Store;

/// Tracks files and their DIRTY/CLEAN state against a [`Store`].
#[derive(Clone)]
pub struct ChangeTracker {
    store: Arc<dyn Store>,
}

impl ChangeTracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register `path`, or refresh its hash and metadata if already tracked.
    ///
    /// # Errors
    ///
    /// [`Error::Read`] when the path does not exist or cannot be read.
    pub async fn register_or_update(&self, path: &Path, metadata: Metadata) -> Result<FileRecord> {
        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let bytes = tokio::fs::read(&canonical)
            .await
            .map_err(|source| Error::Read {
                path: canonical.clone(),
                source,
            })?;

        let new_file = NewFile {
            id: Uuid::now_v7(),
            path: path_key(&canonical),
            content_hash: content_hash(&bytes),
            metadata,
        };
        let record = self.store.upsert_file(&new_file).await?;

        tracing::debug!(
            path = %record.path,
            id = %record.id,
            dirty = record.is_dirty,
            "tracked file"
        );
        Ok(record)
    }

    /// Up to `limit` dirty files, oldest first.
    pub async fn list_dirty(&self, limit: usize) -> Result<Vec<FileRecord>> {
        self.store.list_dirty_files(limit).await
    }

    /// Stop tracking `path`, deleting its record and chunks.
    ///
    /// Returns 0 when the path is not tracked, 1 otherwise. The file does
    /// not need to exist on disk any more.
    pub async fn remove(&self, path: &Path) -> Result<u64> {
        let key = path_key(&resolve_path(path).await?);
        let Some(file) = self.store.get_file_by_path(&key).await? else {
            return Ok(0);
        };
        let removed = self.store.delete_file(file.id).await?;
        tracing::debug!(path = %key, removed, "removed file");
        Ok(removed)
    }

    /// One page of tracked files, newest first.
    ///
    /// A `page` past the end is clamped to the last page when any files
    /// are tracked.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<FileListPage> {
        if page == 0 {
            return Err(Error::invalid_input("page must be >= 1"));
        }
        if per_page == 0 {
            return Err(Error::invalid_input("per_page must be >= 1"));
        }

        let (mut files, total) = self.store.list_files(page, per_page).await?;
        let pagination = Pagination::new(page, per_page, total);
        if pagination.page != page {
            files = self.store.list_files(pagination.page, per_page).await?.0;
        }

        Ok(FileListPage { files, pagination })
    }

    /// The tracked record for `path` with all its chunks, or `None` when
    /// the path is not tracked.
    pub async fn preview(&self, path: &Path) -> Result<Option<FilePreview>> {
        let key = path_key(&resolve_path(path).await?);
        let Some(file) = self.store.get_file_by_path(&key).await? else {
            return Ok(None);
        };
        let chunks = self.store.get_chunks(file.id).await?;
        Ok(Some(FilePreview { file, chunks }))
    }

    /// Mark every tracked file dirty so the next run re-indexes it.
    pub async fn mark_all_dirty(&self) -> Result<u64> {
        self.store.mark_all_dirty().await
    }
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Canonicalize `path` if it exists; otherwise make it absolute without
/// touching the filesystem, so records for deleted files stay reachable.
pub async fn resolve_path(path: &Path) -> Result<PathBuf> {
    match tokio::fs::canonicalize(path).await {
        Ok(p) => Ok(p),
        Err(_) => std::path::absolute(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
