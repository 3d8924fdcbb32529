//! In-process embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached;
//! after that no network calls are made. Inference runs on a blocking
//! thread, and the loaded model is kept for the provider's lifetime.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ragdoll_core::embedding::EmbeddingProvider;
use ragdoll_core::{Error, Result};

use crate::config::EmbeddingConfig;

const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

pub struct LocalProvider {
    model_name: String,
    model: fastembed::EmbeddingModel,
    dims: usize,
    batch_size: usize,
    loaded: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig, model: Option<String>) -> Result<Self> {
        let model_name = model.unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        let (model, native_dims) = resolve_model(&model_name)?;
        if config.dims != native_dims {
            return Err(Error::config(format!(
                "local model '{}' produces {}-dimensional vectors but embedding.dims = {}",
                model_name, native_dims, config.dims
            )));
        }
        Ok(Self {
            model_name,
            model,
            dims: native_dims,
            batch_size: config.batch_size,
            loaded: Arc::new(Mutex::new(None)),
        })
    }
}

fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel::*;
    match name {
        "all-minilm-l6-v2" => Ok((AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((BGEBaseENV15, 768)),
        "bge-large-en-v1.5" => Ok((BGELargeENV15, 1024)),
        "nomic-embed-text-v1.5" => Ok((NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Ok((MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((MultilingualE5Base, 768)),
        "multilingual-e5-large" => Ok((MultilingualE5Large, 1024)),
        other => Err(Error::config(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base, \
             multilingual-e5-large",
            other
        ))),
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let loaded = Arc::clone(&self.loaded);
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = loaded
                .lock()
                .map_err(|_| Error::provider("local embedding model lock poisoned"))?;
            if guard.is_none() {
                let embedding = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(model).with_show_download_progress(true),
                )
                .map_err(|e| {
                    Error::provider(format!("Failed to initialize local embedding model: {}", e))
                })?;
                *guard = Some(embedding);
            }
            let embedding = guard
                .as_mut()
                .ok_or_else(|| Error::provider("local embedding model not loaded"))?;
            embedding
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::provider(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| Error::provider(format!("local embedding task failed: {}", e)))?
    }
}
