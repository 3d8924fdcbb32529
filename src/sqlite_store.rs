//! SQLite-backed [`Store`] implementation.
//!
//! Files live in the `files` table and chunk vectors in `chunks` as
//! little-endian `f32` BLOBs (see [`vec_to_blob`]). Nearest-neighbor search
//! is exact: every chunk is scored by cosine distance in Rust, which is
//! plenty for a local corpus and keeps the database a plain SQLite file.
//!
//! Every mutating method runs as one statement or one transaction. A
//! transaction that is dropped before `commit` (an error, a timeout, a
//! cancelled future) rolls back, so a file's chunk set is never left half
//! replaced.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use ragdoll_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use ragdoll_core::models::{
    ChunkHit, ChunkRecord, FileRecord, IndexCommit, Metadata, NewChunk, NewFile, StoreStats,
};
use ragdoll_core::store::Store;
use ragdoll_core::{Error, Result};

const FILE_COLUMNS: &str =
    "id, path, content_hash, is_dirty, indexed_at, metadata, created_at, updated_at";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("bad timestamp '{}': {}", raw, e)))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::store(format!("bad id '{}': {}", raw, e)))
}

fn parse_metadata(raw: &str) -> Result<Metadata> {
    serde_json::from_str(raw).map_err(|e| Error::store(format!("bad metadata '{}': {}", raw, e)))
}

fn row_to_file(row: &SqliteRow) -> Result<FileRecord> {
    let id: String = row.try_get("id").map_err(Error::store)?;
    let indexed_at: Option<String> = row.try_get("indexed_at").map_err(Error::store)?;
    let metadata: String = row.try_get("metadata").map_err(Error::store)?;
    let created_at: String = row.try_get("created_at").map_err(Error::store)?;
    let updated_at: String = row.try_get("updated_at").map_err(Error::store)?;

    Ok(FileRecord {
        id: parse_id(&id)?,
        path: row.try_get("path").map_err(Error::store)?,
        content_hash: row.try_get("content_hash").map_err(Error::store)?,
        is_dirty: row.try_get("is_dirty").map_err(Error::store)?,
        indexed_at: indexed_at.as_deref().map(parse_ts).transpose()?,
        metadata: parse_metadata(&metadata)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

async fn insert_chunks(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: &str,
    chunks: &[NewChunk],
) -> Result<()> {
    sqlx::query("DELETE FROM chunks WHERE file_id = ?")
        .bind(file_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::store)?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (file_id, chunk_index, content, embedding) VALUES (?, ?, ?, ?)",
        )
        .bind(file_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(vec_to_blob(&chunk.embedding))
        .execute(&mut **tx)
        .await
        .map_err(Error::store)?;
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_file(&self, file: &NewFile) -> Result<FileRecord> {
        let now = format_ts(Utc::now());
        let metadata = serde_json::to_string(&file.metadata).map_err(Error::store)?;

        // One statement: the hash comparison and the write happen under
        // the same lock, so concurrent adds of one path cannot interleave.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO files (id, path, content_hash, is_dirty, indexed_at, metadata,
                               created_at, updated_at)
            VALUES (?, ?, ?, 1, NULL, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                is_dirty = CASE
                    WHEN files.content_hash <> excluded.content_hash THEN 1
                    ELSE files.is_dirty
                END,
                content_hash = excluded.content_hash,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(file.id.to_string())
        .bind(&file.path)
        .bind(&file.content_hash)
        .bind(&metadata)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::store)?;

        row_to_file(&row)
    }

    async fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM files WHERE path = ?", FILE_COLUMNS))
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::store)?;
        row.as_ref().map(row_to_file).transpose()
    }

    async fn get_file_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM files WHERE id = ?", FILE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::store)?;
        row.as_ref().map(row_to_file).transpose()
    }

    async fn delete_file(&self, id: Uuid) -> Result<u64> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(Error::store)?;

        // ON DELETE CASCADE covers this too; deleting explicitly keeps the
        // guarantee even on a connection opened without foreign_keys.
        sqlx::query("DELETE FROM chunks WHERE file_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(Error::store)?;
        let removed = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(Error::store)?
            .rows_affected();

        tx.commit().await.map_err(Error::store)?;
        Ok(removed)
    }

    async fn list_files(&self, page: u32, per_page: u32) -> Result<(Vec<FileRecord>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::store)?;

        let offset = (page.max(1) as i64 - 1) * per_page as i64;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM files ORDER BY id DESC LIMIT ? OFFSET ?",
            FILE_COLUMNS
        ))
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::store)?;

        let files = rows.iter().map(row_to_file).collect::<Result<Vec<_>>>()?;
        Ok((files, total as u64))
    }

    async fn list_dirty_files(&self, limit: usize) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM files WHERE is_dirty = 1 ORDER BY id ASC LIMIT ?",
            FILE_COLUMNS
        ))
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::store)?;

        rows.iter().map(row_to_file).collect()
    }

    async fn mark_all_dirty(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE files SET is_dirty = 1, updated_at = ?")
            .bind(format_ts(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(Error::store)?;
        Ok(result.rows_affected())
    }

    async fn replace_chunks(&self, file_id: Uuid, chunks: &[NewChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::store)?;
        insert_chunks(&mut tx, &file_id.to_string(), chunks).await?;
        tx.commit().await.map_err(Error::store)?;
        Ok(())
    }

    async fn mark_indexed(&self, file_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE files SET is_dirty = 0, indexed_at = ?, updated_at = ? WHERE id = ?")
            .bind(format_ts(at))
            .bind(format_ts(Utc::now()))
            .bind(file_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    async fn commit_index(&self, commit: &IndexCommit) -> Result<bool> {
        let file_id = commit.file_id.to_string();
        let mut tx = self.pool.begin().await.map_err(Error::store)?;

        // Write first so the transaction takes the write lock before it
        // checks the hash; a concurrent re-add either lands before (and
        // the guard fails) or waits until we commit.
        let marked = sqlx::query(
            r#"
            UPDATE files SET is_dirty = 0, indexed_at = ?, updated_at = ?
            WHERE id = ? AND content_hash = ?
            "#,
        )
        .bind(format_ts(commit.indexed_at))
        .bind(format_ts(Utc::now()))
        .bind(&file_id)
        .bind(&commit.content_hash)
        .execute(&mut *tx)
        .await
        .map_err(Error::store)?
        .rows_affected();

        if marked == 0 {
            tx.rollback().await.map_err(Error::store)?;
            return Ok(false);
        }

        insert_chunks(&mut tx, &file_id, &commit.chunks).await?;
        tx.commit().await.map_err(Error::store)?;
        Ok(true)
    }

    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>> {
        let rows = sqlx::query(
            "SELECT chunk_index, content, embedding FROM chunks WHERE file_id = ? ORDER BY chunk_index ASC",
        )
        .bind(file_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::store)?;

        rows.iter()
            .map(|row| {
                let blob: Vec<u8> = row.try_get("embedding").map_err(Error::store)?;
                Ok(ChunkRecord {
                    file_id,
                    chunk_index: row.try_get("chunk_index").map_err(Error::store)?,
                    content: row.try_get("content").map_err(Error::store)?,
                    embedding: blob_to_vec(&blob),
                })
            })
            .collect()
    }

    async fn nearest_chunks(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // Rows come back in (file id, chunk_index) order and the sort is
        // stable, so equal distances keep that order.
        let rows = sqlx::query(
            r#"
            SELECT c.chunk_index, c.content, c.embedding,
                   f.id, f.path, f.content_hash, f.is_dirty, f.indexed_at, f.metadata,
                   f.created_at, f.updated_at
            FROM chunks c
            JOIN files f ON f.id = c.file_id
            ORDER BY c.file_id ASC, c.chunk_index ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::store)?;

        let mut scored: Vec<(f64, &SqliteRow)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.try_get("embedding").map_err(Error::store)?;
                Ok((cosine_distance(query, &blob_to_vec(&blob)), row))
            })
            .collect::<Result<_>>()?;
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(distance, row)| {
                Ok(ChunkHit {
                    file: row_to_file(row)?,
                    chunk_index: row.try_get("chunk_index").map_err(Error::store)?,
                    content: row.try_get("content").map_err(Error::store)?,
                    distance,
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM files) AS files,
                (SELECT COUNT(*) FROM files WHERE is_dirty = 1) AS dirty_files,
                (SELECT COUNT(*) FROM files WHERE indexed_at IS NULL) AS never_indexed,
                (SELECT COUNT(*) FROM chunks) AS chunks
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::store)?;

        let count = |name: &str| -> Result<u64> {
            let n: i64 = row.try_get(name).map_err(Error::store)?;
            Ok(n as u64)
        };
        Ok(StoreStats {
            files: count("files")?,
            dirty_files: count("dirty_files")?,
            never_indexed: count("never_indexed")?,
            chunks: count("chunks")?,
        })
    }
}
