//! Core data models used throughout ragdoll.
//!
//! These types represent tracked files, their chunks, and the search and
//! listing responses that flow out of the indexing and retrieval pipeline.
//! All of them serialize with serde so the CLI can print them as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-supplied metadata attached to a tracked file.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single file tracked by the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Time-ordered identifier (UUIDv7).
    pub id: Uuid,
    /// Canonical absolute path. Unique across live records.
    pub path: String,
    /// SHA-256 hex digest of the file's bytes at the last `add`.
    pub content_hash: String,
    /// True when the content differs from what was last indexed.
    pub is_dirty: bool,
    /// When the file was last indexed successfully; `None` if never.
    pub indexed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to [`Store::upsert_file`](crate::store::Store::upsert_file).
///
/// `id` is only used when no record exists for `path` yet.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: Uuid,
    pub path: String,
    pub content_hash: String,
    pub metadata: Metadata,
}

/// A chunk ready to be written: `(index, text?, vector)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub content: Option<String>,
    pub embedding: Vec<f32>,
}

/// A stored chunk of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub file_id: Uuid,
    pub chunk_index: i64,
    pub content: Option<String>,
    pub embedding: Vec<f32>,
}

/// Everything needed to move one file from DIRTY to CLEAN atomically.
#[derive(Debug, Clone)]
pub struct IndexCommit {
    pub file_id: Uuid,
    /// Hash of the content that was chunked. The commit only applies if
    /// the stored record still carries this hash.
    pub content_hash: String,
    pub chunks: Vec<NewChunk>,
    pub indexed_at: DateTime<Utc>,
}

/// A raw nearest-neighbor hit returned by the store.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    /// Snapshot of the owning file at query time.
    pub file: FileRecord,
    pub chunk_index: i64,
    pub content: Option<String>,
    /// Cosine distance in `[0, 2]`.
    pub distance: f64,
}

/// One chunk that contributed to a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSearchResult {
    pub score: f64,
    pub chunk_index: i64,
    pub content: Option<String>,
}

/// A file-level search result: the file plus its aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub file: FileRecord,
    /// Best chunk score for this file (higher is better).
    pub score: f64,
    /// Contributing chunks, in the order they were returned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_chunks: Option<Vec<ChunkSearchResult>>,
}

/// Pagination information for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub page_count: u32,
    pub total_count: u64,
}

impl Pagination {
    /// Build pagination for `total_count` items, clamping `page` to the
    /// last page when it overshoots and data exists.
    pub fn new(page: u32, per_page: u32, total_count: u64) -> Self {
        let per_page = per_page.max(1);
        let page_count = if total_count == 0 {
            0
        } else {
            total_count.div_ceil(per_page as u64) as u32
        };
        let page = if page_count > 0 && page > page_count {
            page_count
        } else {
            page.max(1)
        };
        Self {
            page,
            per_page,
            page_count,
            total_count,
        }
    }
}

/// Response of a paginated file listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileListPage {
    pub files: Vec<FileRecord>,
    pub pagination: Pagination,
}

/// A tracked file together with all of its chunks.
#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    #[serde(flatten)]
    pub file: FileRecord,
    pub chunks: Vec<ChunkRecord>,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub files: u64,
    pub dirty_files: u64,
    pub never_indexed: u64,
    pub chunks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_exact_pages() {
        let p = Pagination::new(1, 10, 30);
        assert_eq!(p.page_count, 3);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(2, 10, 31);
        assert_eq!(p.page_count, 4);
        assert_eq!(p.page, 2);
    }

    #[test]
    fn test_pagination_clamps_beyond_last_page() {
        let p = Pagination::new(9, 20, 45);
        assert_eq!(p.page_count, 3);
        assert_eq!(p.page, 3);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Pagination::new(5, 20, 0);
        assert_eq!(p.page_count, 0);
        assert_eq!(p.total_count, 0);
        assert_eq!(p.page, 5);
    }

    #[test]
    fn test_search_result_omits_chunks_when_absent() {
        let now = Utc::now();
        let result = SearchResult {
            file: FileRecord {
                id: Uuid::now_v7(),
                path: "/tmp/a.md".to_string(),
                content_hash: "abc".to_string(),
                is_dirty: false,
                indexed_at: Some(now),
                metadata: Metadata::new(),
                created_at: now,
                updated_at: now,
            },
            score: 0.75,
            matched_chunks: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["path"], "/tmp/a.md");
        assert!(json.get("matched_chunks").is_none());
    }
}
