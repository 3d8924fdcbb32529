//! In-memory [`Store`] implementation for tests and embedding in other tools.
//!
//! All state lives behind a single `std::sync::RwLock`, so every mutating
//! method holds one write lock for its whole unit of work and readers never
//! see it half done. Vector search is brute-force cosine distance.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::embedding::cosine_distance;
use crate::error::{Error, Result};
use crate::models::{
    ChunkHit, ChunkRecord, FileRecord, IndexCommit, NewChunk, NewFile, StoreStats,
};

use super::Store;

#[derive(Default)]
struct State {
    /// Keyed by id; UUIDv7 ordering makes this creation order.
    files: BTreeMap<Uuid, FileRecord>,
    /// Keyed by `(file_id, chunk_index)`.
    chunks: BTreeMap<(Uuid, i64), ChunkRecord>,
}

impl State {
    fn file_id_by_path(&self, path: &str) -> Option<Uuid> {
        self.files
            .values()
            .find(|f| f.path == path)
            .map(|f| f.id)
    }

    fn replace_chunks(&mut self, file_id: Uuid, chunks: &[NewChunk]) {
        self.chunks.retain(|(fid, _), _| *fid != file_id);
        for c in chunks {
            self.chunks.insert(
                (file_id, c.chunk_index),
                ChunkRecord {
                    file_id,
                    chunk_index: c.chunk_index,
                    content: c.content.clone(),
                    embedding: c.embedding.clone(),
                },
            );
        }
    }

    fn mark_indexed(&mut self, file_id: Uuid, at: DateTime<Utc>) {
        if let Some(file) = self.files.get_mut(&file_id) {
            file.is_dirty = false;
            file.indexed_at = Some(at);
            file.updated_at = Utc::now();
        }
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::store("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::store("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_file(&self, file: &NewFile) -> Result<FileRecord> {
        let mut state = self.write()?;
        let now = Utc::now();

        if let Some(id) = state.file_id_by_path(&file.path) {
            let existing = state
                .files
                .get_mut(&id)
                .ok_or_else(|| Error::store("file index out of sync"))?;
            if existing.content_hash != file.content_hash {
                existing.content_hash = file.content_hash.clone();
                existing.is_dirty = true;
            }
            existing.metadata = file.metadata.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = FileRecord {
            id: file.id,
            path: file.path.clone(),
            content_hash: file.content_hash.clone(),
            is_dirty: true,
            indexed_at: None,
            metadata: file.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        state.files.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let state = self.read()?;
        Ok(state.files.values().find(|f| f.path == path).cloned())
    }

    async fn get_file_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        Ok(self.read()?.files.get(&id).cloned())
    }

    async fn delete_file(&self, id: Uuid) -> Result<u64> {
        let mut state = self.write()?;
        if state.files.remove(&id).is_none() {
            return Ok(0);
        }
        state.chunks.retain(|(fid, _), _| *fid != id);
        Ok(1)
    }

    async fn list_files(&self, page: u32, per_page: u32) -> Result<(Vec<FileRecord>, u64)> {
        let state = self.read()?;
        let total = state.files.len() as u64;
        let offset = (page.max(1) as usize - 1) * per_page as usize;
        let files = state
            .files
            .values()
            .rev()
            .skip(offset)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok((files, total))
    }

    async fn list_dirty_files(&self, limit: usize) -> Result<Vec<FileRecord>> {
        let state = self.read()?;
        Ok(state
            .files
            .values()
            .filter(|f| f.is_dirty)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_all_dirty(&self) -> Result<u64> {
        let mut state = self.write()?;
        let now = Utc::now();
        for f in state.files.values_mut() {
            f.is_dirty = true;
            f.updated_at = now;
        }
        Ok(state.files.len() as u64)
    }

    async fn replace_chunks(&self, file_id: Uuid, chunks: &[NewChunk]) -> Result<()> {
        self.write()?.replace_chunks(file_id, chunks);
        Ok(())
    }

    async fn mark_indexed(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.write()?.mark_indexed(file_id, at);
        Ok(())
    }

    async fn commit_index(&self, commit: &IndexCommit) -> Result<bool> {
        let mut state = self.write()?;
        match state.files.get(&commit.file_id) {
            Some(f) if f.content_hash == commit.content_hash => {}
            _ => return Ok(false),
        }
        state.replace_chunks(commit.file_id, &commit.chunks);
        state.mark_indexed(commit.file_id, commit.indexed_at);
        Ok(true)
    }

    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>> {
        let state = self.read()?;
        Ok(state
            .chunks
            .range((file_id, i64::MIN)..=(file_id, i64::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn nearest_chunks(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        let state = self.read()?;
        // BTreeMap iteration is already (file_id, chunk_index) ascending,
        // and the sort below is stable, so ties keep that order.
        let mut scored: Vec<(f64, &ChunkRecord)> = state
            .chunks
            .values()
            .map(|c| (cosine_distance(query, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let hits = scored
            .into_iter()
            .take(k)
            .filter_map(|(distance, c)| {
                state.files.get(&c.file_id).map(|file| ChunkHit {
                    file: file.clone(),
                    chunk_index: c.chunk_index,
                    content: c.content.clone(),
                    distance,
                })
            })
            .collect();
        Ok(hits)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.read()?;
        Ok(StoreStats {
            files: state.files.len() as u64,
            dirty_files: state.files.values().filter(|f| f.is_dirty).count() as u64,
            never_indexed: state
                .files
                .values()
                .filter(|f| f.indexed_at.is_none())
                .count() as u64,
            chunks: state.chunks.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn new_file(path: &str, hash: &str) -> NewFile {
        NewFile {
            id: Uuid::now_v7(),
            path: path.to_string(),
            content_hash: hash.to_string(),
            metadata: Metadata::new(),
        }
    }

    fn chunk(i: i64, v: Vec<f32>) -> NewChunk {
        NewChunk {
            chunk_index: i,
            content: Some(format!("chunk {}", i)),
            embedding: v,
        }
    }

    #[tokio::test]
    async fn test_upsert_same_path_keeps_id() {
        let store = InMemoryStore::new();
        let a = store.upsert_file(&new_file("/a", "h1")).await.unwrap();
        let b = store.upsert_file(&new_file("/a", "h2")).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.content_hash, "h2");
        assert_eq!(store.stats().await.unwrap().files, 1);
    }

    #[tokio::test]
    async fn test_replace_chunks_drops_old_set() {
        let store = InMemoryStore::new();
        let f = store.upsert_file(&new_file("/a", "h1")).await.unwrap();
        store
            .replace_chunks(f.id, &[chunk(0, vec![1.0]), chunk(1, vec![1.0]), chunk(2, vec![1.0])])
            .await
            .unwrap();
        store.replace_chunks(f.id, &[chunk(0, vec![1.0])]).await.unwrap();
        let chunks = store.get_chunks(f.id).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn test_commit_index_rejects_stale_hash() {
        let store = InMemoryStore::new();
        let f = store.upsert_file(&new_file("/a", "h1")).await.unwrap();
        store.upsert_file(&new_file("/a", "h2")).await.unwrap();

        let applied = store
            .commit_index(&IndexCommit {
                file_id: f.id,
                content_hash: "h1".to_string(),
                chunks: vec![chunk(0, vec![1.0])],
                indexed_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(!applied);
        assert!(store.get_chunks(f.id).await.unwrap().is_empty());
        assert!(store.get_file_by_id(f.id).await.unwrap().unwrap().is_dirty);
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance_then_position() {
        let store = InMemoryStore::new();
        let f = store.upsert_file(&new_file("/a", "h1")).await.unwrap();
        store
            .replace_chunks(
                f.id,
                &[
                    chunk(0, vec![0.0, 1.0]),
                    chunk(1, vec![1.0, 0.0]),
                    chunk(2, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.nearest_chunks(&[1.0, 0.0], 10).await.unwrap();
        let order: Vec<i64> = hits.iter().map(|h| h.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(hits[0].distance < 1e-6);
        assert!((hits[2].distance - 1.0).abs() < 1e-6);

        let top = store.nearest_chunks(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_list_files_newest_first() {
        let store = InMemoryStore::new();
        for p in ["/a", "/b", "/c"] {
            store.upsert_file(&new_file(p, "h")).await.unwrap();
        }
        let (page1, total) = store.list_files(1, 2).await.unwrap();
        assert_eq!(total, 3);
        let paths: Vec<&str> = page1.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/c", "/b"]);
        let (page2, _) = store.list_files(2, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].path, "/a");
    }
}
