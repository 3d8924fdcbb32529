//! Indexing pipeline: dirty files in, searchable chunks out.
//!
//! Each dirty file walks this state machine once per run:
//!
//! ```text
//! DIRTY → READING ─┬─ unreadable / not UTF-8 ──────────────▶ SKIPPED
//!                  └─ CHUNKING → EMBEDDING ─┬─ provider error ▶ ABORTED
//!                                           └─ WRITING ─┬─ store error ▶ FAILED
//!                                                       ├─ re-added ──▶ SUPERSEDED
//!                                                       └─────────────▶ CLEAN
//! ```
//!
//! Every outcome other than CLEAN leaves the file dirty so the next run
//! retries it. The write step goes through [`Store::commit_index`], which
//! replaces the chunk set and clears the dirty flag in one transaction, so
//! a failure or a cancelled future never leaves a partial chunk set.
//!
//! The optional per-file deadline bounds the embedding step only. Once
//! vectors are in hand the commit runs to completion, so the reported
//! outcome always matches what the store holds.
//!
//! Files are independent: one file failing never stops the others. Up to
//! `concurrency` files are in flight at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::chunk::Chunker;
use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result};
use crate::models::{FileRecord, IndexCommit, NewChunk};
use crate::store::Store;

/// Tuning knobs for an [`IndexingPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum number of files processed at once.
    pub concurrency: usize,
    /// Deadline for embedding a single file. The commit that follows is
    /// not bounded, so an expired deadline never races a landing write.
    pub file_timeout: Option<Duration>,
    /// Persist chunk text alongside vectors.
    pub store_text: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            file_timeout: None,
            store_text: true,
        }
    }
}

/// How a single file left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Chunks written and dirty flag cleared.
    Indexed,
    /// Could not be read or decoded.
    Skipped,
    /// The embedding provider failed.
    Aborted,
    /// The store write failed.
    Failed,
    /// The per-file deadline expired.
    TimedOut,
    /// Re-added with different content (or deleted) while being indexed.
    Superseded,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Indexed => "indexed",
            FileStatus::Skipped => "skipped",
            FileStatus::Aborted => "aborted",
            FileStatus::Failed => "failed",
            FileStatus::TimedOut => "timed_out",
            FileStatus::Superseded => "superseded",
        }
    }
}

/// Outcome of one file in a run.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_id: Uuid,
    pub path: String,
    pub status: FileStatus,
    /// Chunks written; 0 unless `status` is [`FileStatus::Indexed`].
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn new(file: &FileRecord, status: FileStatus) -> Self {
        Self {
            file_id: file.id,
            path: file.path.clone(),
            status,
            chunks: 0,
            error: None,
        }
    }

    fn with_error(mut self, err: &Error) -> Self {
        self.error = Some(err.to_string());
        self
    }
}

/// Result of an [`IndexingPipeline::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    /// One entry per file, in the order the files were listed.
    pub files: Vec<FileReport>,
}

impl IndexReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|f| f.chunks).sum()
    }

    /// True when every file reached CLEAN.
    pub fn is_clean(&self) -> bool {
        self.files.iter().all(|f| f.status == FileStatus::Indexed)
    }
}

/// Observer notified as each file finishes.
pub trait IndexProgress: Send + Sync {
    /// `done` files out of `total` have finished; `report` is the latest.
    fn file_done(&self, report: &FileReport, done: usize, total: usize);
}

/// Progress observer that ignores every event.
pub struct NoProgress;

impl IndexProgress for NoProgress {
    fn file_done(&self, _report: &FileReport, _done: usize, _total: usize) {}
}

/// Drives dirty files through chunking, embedding, and storage.
pub struct IndexingPipeline {
    store: Arc<dyn Store>,
    chunker: Chunker,
    gateway: EmbeddingGateway,
    options: PipelineOptions,
}

impl IndexingPipeline {
    /// # Errors
    ///
    /// [`Error::Config`] when `options.concurrency == 0`.
    pub fn new(
        store: Arc<dyn Store>,
        chunker: Chunker,
        gateway: EmbeddingGateway,
        options: PipelineOptions,
    ) -> Result<Self> {
        if options.concurrency == 0 {
            return Err(Error::config("indexing concurrency must be >= 1"));
        }
        Ok(Self {
            store,
            chunker,
            gateway,
            options,
        })
    }

    /// Index up to `limit` dirty files.
    ///
    /// Only a failure to list dirty files fails the run; per-file problems
    /// are reported in the returned [`IndexReport`].
    pub async fn run(&self, limit: usize, progress: &dyn IndexProgress) -> Result<IndexReport> {
        let dirty = self.store.list_dirty_files(limit).await?;
        let total = dirty.len();
        tracing::info!(files = total, "indexing dirty files");

        let mut files = Vec::with_capacity(total);
        let mut reports = stream::iter(dirty)
            .map(|file| self.index_file(file))
            .buffered(self.options.concurrency);

        while let Some(report) = reports.next().await {
            files.push(report);
            progress.file_done(&files[files.len() - 1], files.len(), total);
        }

        let report = IndexReport { files };
        tracing::info!(
            indexed = report.count(FileStatus::Indexed),
            skipped = report.count(FileStatus::Skipped),
            aborted = report.count(FileStatus::Aborted),
            failed = report.count(FileStatus::Failed),
            timed_out = report.count(FileStatus::TimedOut),
            superseded = report.count(FileStatus::Superseded),
            chunks = report.total_chunks(),
            "indexing finished"
        );
        Ok(report)
    }

    /// Process one file. Never fails; the outcome is in the report.
    pub async fn index_file(&self, file: FileRecord) -> FileReport {
        let path = PathBuf::from(&file.path);
        let text = match read_text(&path).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %file.path, error = %err, "skipping unreadable file");
                return FileReport::new(&file, FileStatus::Skipped).with_error(&err);
            }
        };

        let pieces = self.chunker.chunk(&text);
        tracing::debug!(path = %file.path, chunks = pieces.len(), "chunked file");

        let outcome = match self.embed_with_deadline(pieces).await {
            Ok(chunks) => self.commit(&file, chunks).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(Some(chunks)) => {
                tracing::debug!(path = %file.path, chunks, "indexed file");
                FileReport {
                    chunks,
                    ..FileReport::new(&file, FileStatus::Indexed)
                }
            }
            Ok(None) => {
                tracing::warn!(path = %file.path, "file changed during indexing; left dirty");
                FileReport::new(&file, FileStatus::Superseded)
            }
            Err(err) => {
                let status = match err {
                    Error::Provider(_) => FileStatus::Aborted,
                    Error::Timeout(_) => FileStatus::TimedOut,
                    _ => FileStatus::Failed,
                };
                tracing::error!(
                    path = %file.path,
                    status = status.as_str(),
                    error = %err,
                    "file left dirty"
                );
                FileReport::new(&file, status).with_error(&err)
            }
        }
    }

    async fn embed_with_deadline(&self, pieces: Vec<String>) -> Result<Vec<NewChunk>> {
        let work = self.embed(pieces);
        match self.options.file_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or(Err(Error::Timeout(limit))),
            None => work.await,
        }
    }

    async fn embed(&self, pieces: Vec<String>) -> Result<Vec<NewChunk>> {
        let vectors = self.gateway.embed_batch(&pieces).await?;

        Ok(pieces
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, embedding))| NewChunk {
                chunk_index: i as i64,
                content: self.options.store_text.then_some(text),
                embedding,
            })
            .collect())
    }

    /// `Ok(None)` means the commit was rejected because the record changed
    /// underneath us.
    async fn commit(&self, file: &FileRecord, chunks: Vec<NewChunk>) -> Result<Option<usize>> {
        let count = chunks.len();
        let applied = self
            .store
            .commit_index(&IndexCommit {
                file_id: file.id,
                content_hash: file.content_hash.clone(),
                chunks,
                indexed_at: Utc::now(),
            })
            .await?;

        Ok(applied.then_some(count))
    }
}

async fn read_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await.map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| Error::Decode {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::embedding::testing::KeywordProvider;
    use crate::embedding::EmbeddingProvider;
    use crate::models::{ChunkHit, ChunkRecord, Metadata, NewFile, StoreStats};
    use crate::store::memory::InMemoryStore;
    use crate::tracker::ChangeTracker;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        store: Arc<InMemoryStore>,
        tracker: ChangeTracker,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            let store = Arc::new(InMemoryStore::new());
            let tracker = ChangeTracker::new(store.clone());
            Self {
                _dir: dir,
                root,
                store,
                tracker,
            }
        }

        async fn add(&self, name: &str, content: &[u8]) -> FileRecord {
            let path = self.root.join(name);
            std::fs::write(&path, content).unwrap();
            self.tracker
                .register_or_update(&path, Metadata::new())
                .await
                .unwrap()
        }

        fn pipeline(&self, provider: Arc<dyn EmbeddingProvider>, chunker: Chunker) -> IndexingPipeline {
            self.pipeline_with(provider, chunker, PipelineOptions::default())
        }

        fn pipeline_with(
            &self,
            provider: Arc<dyn EmbeddingProvider>,
            chunker: Chunker,
            options: PipelineOptions,
        ) -> IndexingPipeline {
            IndexingPipeline::new(
                self.store.clone(),
                chunker,
                EmbeddingGateway::new(provider, 16).unwrap(),
                options,
            )
            .unwrap()
        }
    }

    struct Recorder(Mutex<Vec<(String, usize, usize)>>);

    impl IndexProgress for Recorder {
        fn file_done(&self, report: &FileReport, done: usize, total: usize) {
            self.0
                .lock()
                .unwrap()
                .push((report.status.as_str().to_string(), done, total));
        }
    }

    #[tokio::test]
    async fn test_successful_pass_clears_dirty_and_stores_chunks() {
        let fx = Fixture::new();
        let text = "rust sqlite vector search over many small windows";
        let rec = fx.add("a.md", text.as_bytes()).await;
        let chunker = Chunker::new(10, 3).unwrap();
        let expected = chunker.chunk(text);

        let report = fx
            .pipeline(Arc::new(KeywordProvider::new()), chunker)
            .run(10, &NoProgress)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.files[0].chunks, expected.len());

        let file = fx.store.get_file_by_id(rec.id).await.unwrap().unwrap();
        assert!(!file.is_dirty);
        assert!(file.indexed_at.is_some());

        let chunks = fx.store.get_chunks(rec.id).await.unwrap();
        assert_eq!(chunks.len(), expected.len());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.content.as_deref(), Some(expected[i].as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_file_becomes_clean_without_provider_call() {
        let fx = Fixture::new();
        let rec = fx.add("empty.md", b"").await;
        let provider = Arc::new(KeywordProvider::new());

        let report = fx
            .pipeline(provider.clone(), Chunker::new(5, 0).unwrap())
            .run(10, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.count(FileStatus::Indexed), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let file = fx.store.get_file_by_id(rec.id).await.unwrap().unwrap();
        assert!(!file.is_dirty);
        assert!(file.indexed_at.is_some());
        assert!(fx.store.get_chunks(rec.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_chunks() {
        let fx = Fixture::new();
        let rec = fx.add("a.md", b"abcdefghijklmnop").await;
        let chunker = Chunker::new(4, 0).unwrap();
        let pipeline = fx.pipeline(Arc::new(KeywordProvider::new()), chunker);
        pipeline.run(10, &NoProgress).await.unwrap();
        assert_eq!(fx.store.get_chunks(rec.id).await.unwrap().len(), 4);

        fx.add("a.md", b"abcdef").await;
        pipeline.run(10, &NoProgress).await.unwrap();
        let chunks = fx.store.get_chunks(rec.id).await.unwrap();
        let indexes: Vec<i64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_store_text_false_omits_content() {
        let fx = Fixture::new();
        let rec = fx.add("a.md", b"rust rust rust").await;
        let options = PipelineOptions {
            store_text: false,
            ..PipelineOptions::default()
        };
        fx.pipeline_with(
            Arc::new(KeywordProvider::new()),
            Chunker::new(5, 0).unwrap(),
            options,
        )
        .run(10, &NoProgress)
        .await
        .unwrap();

        let chunks = fx.store.get_chunks(rec.id).await.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.content.is_none()));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped_and_others_continue() {
        let fx = Fixture::new();
        let missing = fx.add("gone.md", b"rust").await;
        let bad_utf8 = fx.add("bin.dat", &[0xff, 0xfe, 0x00, 0x81]).await;
        let good = fx.add("good.md", b"python").await;
        std::fs::remove_file(&missing.path).unwrap();

        let recorder = Recorder(Mutex::new(Vec::new()));
        let report = fx
            .pipeline(Arc::new(KeywordProvider::new()), Chunker::new(5, 0).unwrap())
            .run(10, &recorder)
            .await
            .unwrap();

        assert_eq!(report.count(FileStatus::Skipped), 2);
        assert_eq!(report.count(FileStatus::Indexed), 1);
        assert!(fx.store.get_file_by_id(missing.id).await.unwrap().unwrap().is_dirty);
        assert!(fx.store.get_file_by_id(bad_utf8.id).await.unwrap().unwrap().is_dirty);
        assert!(!fx.store.get_file_by_id(good.id).await.unwrap().unwrap().is_dirty);

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].1, 3);
        assert_eq!(events[2].2, 3);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_only_that_file() {
        let fx = Fixture::new();
        let bad = fx.add("bad.md", b"boom goes here").await;
        let good = fx.add("good.md", b"all fine").await;

        let report = fx
            .pipeline(
                Arc::new(KeywordProvider::failing_on("boom")),
                Chunker::new(100, 0).unwrap(),
            )
            .run(10, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.files[0].status, FileStatus::Aborted);
        assert!(report.files[0].error.is_some());
        assert_eq!(report.files[1].status, FileStatus::Indexed);
        assert!(fx.store.get_file_by_id(bad.id).await.unwrap().unwrap().is_dirty);
        assert!(fx.store.get_chunks(bad.id).await.unwrap().is_empty());
        assert!(!fx.store.get_file_by_id(good.id).await.unwrap().unwrap().is_dirty);
    }

    #[tokio::test]
    async fn test_limit_caps_files_per_run() {
        let fx = Fixture::new();
        for name in ["a", "b", "c"] {
            fx.add(name, b"rust").await;
        }
        let pipeline = fx.pipeline(Arc::new(KeywordProvider::new()), Chunker::new(5, 0).unwrap());

        let first = pipeline.run(2, &NoProgress).await.unwrap();
        assert_eq!(first.files.len(), 2);
        let second = pipeline.run(2, &NoProgress).await.unwrap();
        assert_eq!(second.files.len(), 1);
        assert!(pipeline.run(2, &NoProgress).await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_run_processes_every_file() {
        let fx = Fixture::new();
        for i in 0..8 {
            fx.add(&format!("f{}.md", i), format!("rust {}", i).as_bytes()).await;
        }
        let options = PipelineOptions {
            concurrency: 4,
            ..PipelineOptions::default()
        };
        let report = fx
            .pipeline_with(
                Arc::new(KeywordProvider::new()),
                Chunker::new(5, 1).unwrap(),
                options,
            )
            .run(100, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.count(FileStatus::Indexed), 8);
        assert_eq!(fx.store.stats().await.unwrap().dirty_files, 0);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let fx = Fixture::new();
        let err = IndexingPipeline::new(
            fx.store.clone(),
            Chunker::default(),
            EmbeddingGateway::new(Arc::new(KeywordProvider::new()), 4).unwrap(),
            PipelineOptions {
                concurrency: 0,
                ..PipelineOptions::default()
            },
        )
        .err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    /// Provider that never answers.
    struct StalledProvider;

    #[async_trait]
    impl EmbeddingProvider for StalledProvider {
        fn model_name(&self) -> &str {
            "stalled"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_leaves_file_dirty() {
        let fx = Fixture::new();
        let rec = fx.add("a.md", b"some text").await;
        let options = PipelineOptions {
            file_timeout: Some(Duration::from_millis(20)),
            ..PipelineOptions::default()
        };
        let report = fx
            .pipeline_with(Arc::new(StalledProvider), Chunker::new(4, 0).unwrap(), options)
            .run(10, &NoProgress)
            .await
            .unwrap();

        assert_eq!(report.files[0].status, FileStatus::TimedOut);
        assert!(fx.store.get_file_by_id(rec.id).await.unwrap().unwrap().is_dirty);
        assert!(fx.store.get_chunks(rec.id).await.unwrap().is_empty());
    }

    /// Store wrapper that delays commits and optionally fails them.
    struct HookedCommits {
        inner: InMemoryStore,
        delay: Duration,
        fail: bool,
    }

    impl HookedCommits {
        fn broken() -> Self {
            Self {
                inner: InMemoryStore::new(),
                delay: Duration::ZERO,
                fail: true,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                inner: InMemoryStore::new(),
                delay,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Store for HookedCommits {
        async fn upsert_file(&self, file: &NewFile) -> Result<FileRecord> {
            self.inner.upsert_file(file).await
        }
        async fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
            self.inner.get_file_by_path(path).await
        }
        async fn get_file_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
            self.inner.get_file_by_id(id).await
        }
        async fn delete_file(&self, id: Uuid) -> Result<u64> {
            self.inner.delete_file(id).await
        }
        async fn list_files(&self, page: u32, per_page: u32) -> Result<(Vec<FileRecord>, u64)> {
            self.inner.list_files(page, per_page).await
        }
        async fn list_dirty_files(&self, limit: usize) -> Result<Vec<FileRecord>> {
            self.inner.list_dirty_files(limit).await
        }
        async fn mark_all_dirty(&self) -> Result<u64> {
            self.inner.mark_all_dirty().await
        }
        async fn replace_chunks(&self, file_id: Uuid, chunks: &[NewChunk]) -> Result<()> {
            self.inner.replace_chunks(file_id, chunks).await
        }
        async fn mark_indexed(&self, file_id: Uuid, at: chrono::DateTime<Utc>) -> Result<()> {
            self.inner.mark_indexed(file_id, at).await
        }
        async fn commit_index(&self, commit: &IndexCommit) -> Result<bool> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::store("disk full"));
            }
            self.inner.commit_index(commit).await
        }
        async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>> {
            self.inner.get_chunks(file_id).await
        }
        async fn nearest_chunks(&self, query: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
            self.inner.nearest_chunks(query, k).await
        }
        async fn stats(&self) -> Result<StoreStats> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn test_store_failure_reports_failed_and_leaves_dirty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "rust").unwrap();

        let store = Arc::new(HookedCommits::broken());
        let rec = ChangeTracker::new(store.clone())
            .register_or_update(&path, Metadata::new())
            .await
            .unwrap();

        let pipeline = IndexingPipeline::new(
            store.clone(),
            Chunker::new(4, 0).unwrap(),
            EmbeddingGateway::new(Arc::new(KeywordProvider::new()), 4).unwrap(),
            PipelineOptions::default(),
        )
        .unwrap();
        let report = pipeline.run(10, &NoProgress).await.unwrap();

        assert_eq!(report.files[0].status, FileStatus::Failed);
        assert!(store.get_file_by_id(rec.id).await.unwrap().unwrap().is_dirty);
    }

    #[tokio::test]
    async fn test_readd_during_indexing_keeps_file_dirty() {
        let fx = Fixture::new();
        let rec = fx.add("a.md", b"version one").await;
        let listed = fx.store.list_dirty_files(10).await.unwrap().remove(0);

        // Re-added with new content after the pipeline listed it.
        fx.add("a.md", b"version two").await;

        let report = fx
            .pipeline(Arc::new(KeywordProvider::new()), Chunker::new(4, 0).unwrap())
            .index_file(listed)
            .await;

        assert_eq!(report.status, FileStatus::Superseded);
        let file = fx.store.get_file_by_id(rec.id).await.unwrap().unwrap();
        assert!(file.is_dirty);
        assert!(file.indexed_at.is_none());
    }

    #[tokio::test]
    async fn test_deadline_does_not_cover_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "rust").unwrap();

        let store = Arc::new(HookedCommits::slow(Duration::from_millis(100)));
        let rec = ChangeTracker::new(store.clone())
            .register_or_update(&path, Metadata::new())
            .await
            .unwrap();

        let pipeline = IndexingPipeline::new(
            store.clone(),
            Chunker::new(4, 0).unwrap(),
            EmbeddingGateway::new(Arc::new(KeywordProvider::new()), 4).unwrap(),
            PipelineOptions {
                file_timeout: Some(Duration::from_millis(20)),
                ..PipelineOptions::default()
            },
        )
        .unwrap();
        let report = pipeline.run(10, &NoProgress).await.unwrap();

        // The commit outlives the deadline but the report matches the store.
        assert_eq!(report.files[0].status, FileStatus::Indexed);
        let file = store.get_file_by_id(rec.id).await.unwrap().unwrap();
        assert!(!file.is_dirty);
        assert_eq!(store.get_chunks(rec.id).await.unwrap().len(), 1);
    }
}
