//! TOML configuration.
//!
//! Every section is optional; missing keys fall back to the defaults shown
//! in `ragdoll.example.toml`. [`load_config`] validates the values that the
//! core would otherwise reject later, so a bad file fails before any
//! database or network work starts.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embedding::ProviderKind;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./ragdoll.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ragdoll.sqlite3")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Keep chunk text in the database next to the vector.
    #[serde(default = "default_true")]
    pub store_text: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            store_text: true,
        }
    }
}

fn default_chunk_size() -> usize {
    8192
}
fn default_overlap() -> usize {
    2000
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai`, `ollama`, `mock`, `local`, or `<provider>/<model>`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    /// Split `provider` into its kind and an optional model from the
    /// `provider/model` form. An explicit `model` key wins over the tag.
    pub fn resolve(&self) -> Result<(ProviderKind, Option<String>)> {
        let (kind, tagged_model) = match self.provider.split_once('/') {
            Some((kind, model)) if !model.is_empty() => (kind, Some(model.to_string())),
            Some((kind, _)) => (kind, None),
            None => (self.provider.as_str(), None),
        };
        let kind: ProviderKind = kind.parse()?;
        Ok((kind, self.model.clone().or(tagged_model)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_over_fetch_factor")]
    pub over_fetch_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            over_fetch_factor: default_over_fetch_factor(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_over_fetch_factor() -> usize {
    ragdoll_core::search::DEFAULT_OVER_FETCH_FACTOR
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Files processed per `ragdoll index` run unless `--limit` is given.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deadline for embedding one file; the store write is not bounded.
    #[serde(default)]
    pub file_timeout_secs: Option<u64>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            concurrency: default_concurrency(),
            file_timeout_secs: None,
        }
    }
}

impl IndexingConfig {
    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_secs.map(Duration::from_secs)
    }
}

fn default_batch_limit() -> usize {
    20
}
fn default_concurrency() -> usize {
    1
}

/// Filters applied when `ragdoll add` is given a directory.
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

impl Config {
    /// Apply a `--embedder` override. The configured `model` is cleared so
    /// the tag (or the provider default) decides.
    pub fn with_embedder(mut self, embedder: &str) -> Result<Self> {
        self.embedding.provider = embedder.to_string();
        self.embedding.model = None;
        validate(&self)?;
        Ok(self)
    }
}

/// Load and validate the config at `path`.
///
/// When `explicit` is false and the file does not exist, the built-in
/// defaults are used instead.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Chunker::new enforces the same rules; checking here gives a config
    // error before the database is touched.
    ragdoll_core::chunk::Chunker::new(config.chunking.chunk_size, config.chunking.overlap)
        .with_context(|| "invalid [chunking] settings")?;

    let embedding = &config.embedding;
    if embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    let (kind, model) = embedding.resolve()?;
    if kind == ProviderKind::OpenAi {
        let model = model.as_deref().unwrap_or(crate::embedding::DEFAULT_OPENAI_MODEL);
        if !crate::embedding::OPENAI_MODELS.contains(&model) {
            bail!(
                "Unsupported OpenAI model: '{}'. Must be one of: {}",
                model,
                crate::embedding::OPENAI_MODELS.join(", ")
            );
        }
    }

    if config.retrieval.default_limit < 1 {
        bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.over_fetch_factor < 1 {
        bail!("retrieval.over_fetch_factor must be >= 1");
    }
    if config.indexing.concurrency < 1 {
        bail!("indexing.concurrency must be >= 1");
    }
    if config.indexing.file_timeout_secs == Some(0) {
        bail!("indexing.file_timeout_secs must be > 0 when set");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.chunk_size, 8192);
        assert_eq!(config.chunking.overlap, 2000);
        assert!(config.chunking.store_text);
        assert_eq!(config.embedding.dims, 1024);
        assert_eq!(config.retrieval.over_fetch_factor, 5);
        assert_eq!(config.indexing.batch_limit, 20);
        assert_eq!(config.db.path, PathBuf::from("ragdoll.sqlite3"));
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            [db]
            path = "/tmp/r.sqlite3"

            [chunking]
            chunk_size = 100
            overlap = 10
            store_text = false

            [embedding]
            provider = "mock"
            dims = 16
            batch_size = 8

            [retrieval]
            default_limit = 3
            over_fetch_factor = 2

            [indexing]
            concurrency = 4
            file_timeout_secs = 60

            [tracking]
            include_globs = ["**/*.md"]
            exclude_globs = ["drafts/**"]
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 100);
        assert!(!config.chunking.store_text);
        assert_eq!(config.embedding.resolve().unwrap().0, ProviderKind::Mock);
        assert_eq!(config.indexing.file_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.tracking.exclude_globs, vec!["drafts/**"]);
    }

    #[test]
    fn test_overlap_not_less_than_chunk_size_rejected() {
        let err = parse_config("[chunking]\nchunk_size = 10\noverlap = 10\n").unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(parse_config("[chunking]\nchunk_size = 0\noverlap = 0\n").is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(parse_config("[embedding]\nprovider = \"cohere\"\n").is_err());
    }

    #[test]
    fn test_unsupported_openai_model_rejected() {
        assert!(parse_config("[embedding]\nprovider = \"openai/ada-002\"\n").is_err());
        assert!(parse_config("[embedding]\nprovider = \"openai/text-embedding-3-large\"\n").is_ok());
    }

    #[test]
    fn test_provider_tag_and_model_key() {
        let mut e = EmbeddingConfig {
            provider: "ollama/nomic-embed-text".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(
            e.resolve().unwrap(),
            (ProviderKind::Ollama, Some("nomic-embed-text".to_string()))
        );

        e.model = Some("mxbai-embed-large".to_string());
        assert_eq!(e.resolve().unwrap().1.as_deref(), Some("mxbai-embed-large"));
    }

    #[test]
    fn test_zero_over_fetch_rejected() {
        assert!(parse_config("[retrieval]\nover_fetch_factor = 0\n").is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(parse_config("[server]\nbind = \"x\"\n").is_err());
    }

    #[test]
    fn test_embedder_override() {
        let config = parse_config(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-large\"\n",
        )
        .unwrap();
        let config = config.with_embedder("ollama/nomic-embed-text").unwrap();
        assert_eq!(
            config.embedding.resolve().unwrap(),
            (ProviderKind::Ollama, Some("nomic-embed-text".to_string()))
        );
        assert!(Config::default().with_embedder("cohere").is_err());
    }

    #[test]
    fn test_missing_default_path_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("ragdoll.toml");
        assert!(load_config(&missing, false).is_ok());
        assert!(load_config(&missing, true).is_err());
    }
}
