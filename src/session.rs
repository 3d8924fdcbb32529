//! Per-command database session.
//!
//! Every CLI command opens one [`Session`], does its work, and closes it on
//! all paths (see [`Session::finish`]). Opening runs the idempotent schema
//! migrations, so commands work on a fresh database without `ragdoll init`.

use anyhow::Result;
use std::sync::Arc;

use ragdoll_core::chunk::Chunker;
use ragdoll_core::embedding::EmbeddingGateway;
use ragdoll_core::models::StoreStats;
use ragdoll_core::pipeline::{IndexingPipeline, PipelineOptions};
use ragdoll_core::search::SearchAggregator;
use ragdoll_core::store::Store;
use ragdoll_core::tracker::ChangeTracker;

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct Session {
    pub store: Arc<SqliteStore>,
    pub tracker: ChangeTracker,
}

impl Session {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        if let Err(e) = migrate::run_migrations(&pool, config.embedding.dims).await {
            pool.close().await;
            return Err(e.into());
        }

        let store = Arc::new(SqliteStore::new(pool));
        let tracker = ChangeTracker::new(store.clone() as Arc<dyn Store>);
        Ok(Self { store, tracker })
    }

    /// Close the pool, then hand back `result`.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        self.store.pool().close().await;
        result
    }

    pub async fn store_stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }

    fn gateway(config: &Config) -> Result<EmbeddingGateway> {
        let provider = create_provider(&config.embedding)?;
        Ok(EmbeddingGateway::new(provider, config.embedding.batch_size)?)
    }

    pub fn pipeline(&self, config: &Config) -> Result<IndexingPipeline> {
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;
        let options = PipelineOptions {
            concurrency: config.indexing.concurrency,
            file_timeout: config.indexing.file_timeout(),
            store_text: config.chunking.store_text,
        };
        Ok(IndexingPipeline::new(
            self.store.clone(),
            chunker,
            Self::gateway(config)?,
            options,
        )?)
    }

    pub fn search(&self, config: &Config) -> Result<SearchAggregator> {
        Ok(SearchAggregator::new(
            self.store.clone(),
            Self::gateway(config)?,
            config.retrieval.over_fetch_factor,
        )?)
    }
}
