use sqlx::SqlitePool;

use ragdoll_core::{Error, Result};

const DIMS_KEY: &str = "embedding_dims";

/// Create the schema if missing and pin the embedding dimension.
///
/// Idempotent. The first run records `dims`; later runs fail with
/// [`Error::Config`] if `dims` differs from what the database was built
/// with, since stored vectors could not be compared with new ones.
pub async fn run_migrations(pool: &SqlitePool, dims: usize) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            is_dirty INTEGER NOT NULL DEFAULT 1,
            indexed_at TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(Error::store)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            chunk_index INTEGER NOT NULL,
            content TEXT,
            embedding BLOB NOT NULL,
            PRIMARY KEY (file_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(Error::store)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ragdoll_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(Error::store)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_dirty ON files(is_dirty, id)")
        .execute(pool)
        .await
        .map_err(Error::store)?;

    sqlx::query("INSERT OR IGNORE INTO ragdoll_meta (key, value) VALUES (?, ?)")
        .bind(DIMS_KEY)
        .bind(dims.to_string())
        .execute(pool)
        .await
        .map_err(Error::store)?;

    let stored: String = sqlx::query_scalar("SELECT value FROM ragdoll_meta WHERE key = ?")
        .bind(DIMS_KEY)
        .fetch_one(pool)
        .await
        .map_err(Error::store)?;

    if stored != dims.to_string() {
        return Err(Error::config(format!(
            "database was built with {}-dimensional embeddings but embedding.dims = {}; \
             use a new database or restore the original setting",
            stored, dims
        )));
    }

    tracing::debug!(dims, "schema ready");
    Ok(())
}
