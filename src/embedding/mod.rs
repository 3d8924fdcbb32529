//! Concrete embedding providers.
//!
//! Every provider implements [`ragdoll_core::embedding::EmbeddingProvider`]:
//! - **[`OpenAiProvider`]**: calls the OpenAI embeddings API with retry and backoff.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **[`MockProvider`]**: deterministic hash-derived vectors; offline, for tests and demos.
//! - **`LocalProvider`**: runs a fastembed model in-process (feature
//!   `local-embeddings-fastembed`); no network calls after model download.
//!
//! # Provider Selection
//!
//! [`create_provider`] picks the implementation from `[embedding].provider`,
//! which is either a bare kind (`"openai"`) or a `kind/model` tag
//! (`"openai/text-embedding-3-large"`):
//!
//! ```rust
//! # use ragdoll::config::EmbeddingConfig;
//! # use ragdoll::embedding::create_provider;
//! let config = EmbeddingConfig {
//!     provider: "mock".to_string(),
//!     dims: 8,
//!     ..EmbeddingConfig::default()
//! };
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.dims(), 8);
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

#[cfg(feature = "local-embeddings-fastembed")]
mod local;
mod mock;

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalProvider;
pub use mock::MockProvider;

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ragdoll_core::embedding::EmbeddingProvider;
use ragdoll_core::{Error, Result};

use crate::config::EmbeddingConfig;

/// Models accepted for the OpenAI provider.
pub const OPENAI_MODELS: [&str; 2] = ["text-embedding-3-small", "text-embedding-3-large"];
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// The closed set of embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
    Mock,
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Mock => "mock",
            ProviderKind::Local => "local",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "mock" => Ok(ProviderKind::Mock),
            "local" => Ok(ProviderKind::Local),
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be openai, ollama, mock, or local.",
                other
            ),
        }
    }
}

/// Build the provider selected by `config`.
///
/// # Errors
///
/// [`Error::Config`] for an unknown provider, an unsupported model, a
/// missing `OPENAI_API_KEY`, or `local` without the fastembed feature.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let (kind, model) = config.resolve().map_err(|e| Error::config(e.to_string()))?;

    let provider: Arc<dyn EmbeddingProvider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config, model)?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(config, model)?),
        ProviderKind::Mock => Arc::new(MockProvider::new(config.dims)),
        #[cfg(feature = "local-embeddings-fastembed")]
        ProviderKind::Local => Arc::new(LocalProvider::new(config, model)?),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        ProviderKind::Local => {
            return Err(Error::config(
                "Local embedding provider requires --features local-embeddings-fastembed",
            ))
        }
    };

    tracing::info!(
        provider = kind.as_str(),
        model = provider.model_name(),
        dims = provider.dims(),
        "embedding provider ready"
    );
    Ok(provider)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))
}

/// POST `body` to `url`, retrying transient failures with exponential
/// backoff, and return the decoded JSON response.
async fn post_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    label: &str,
) -> Result<serde_json::Value> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(provider = label, attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        Error::provider(format!("{} returned invalid JSON: {}", label, e))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = Error::provider(format!("{} API error {}: {}", label, status, body_text));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }

                // Client error (not 429): fail now
                return Err(err);
            }
            Err(e) => {
                last_err = Some(Error::provider(format!(
                    "{} connection error ({}): {}",
                    label, url, e
                )));
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::provider(format!("{} embedding failed after retries", label))))
}

fn json_to_vec(value: &serde_json::Value, label: &str) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| Error::provider(format!("Invalid {} response: embedding is not an array", label)))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::provider(format!("Invalid {} response: non-numeric value", label)))
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model and requested
/// `dimensions`. Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAiProvider {
    /// Create a provider, reading the key from `OPENAI_API_KEY`.
    pub fn new(config: &EmbeddingConfig, model: Option<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::config("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, model, api_key)
    }

    pub fn with_api_key(
        config: &EmbeddingConfig,
        model: Option<String>,
        api_key: String,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::config("OPENAI_API_KEY is empty"));
        }
        let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        if !OPENAI_MODELS.contains(&model.as_str()) {
            return Err(Error::config(format!(
                "Unsupported OpenAI model: '{}'",
                model
            )));
        }
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            model,
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // OpenAI recommends replacing newlines, which can degrade results.
        let input: Vec<String> = texts.iter().map(|t| t.replace('\n', " ")).collect();
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
            "dimensions": self.dims,
        });

        let json = post_with_retry(
            &self.client,
            OPENAI_EMBEDDINGS_URL,
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Items carry an `index` field; vectors are returned in input order.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::provider("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| Error::provider("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, json_to_vec(embedding, "OpenAI")?));
    }

    // Sort by index to ensure order matches input
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST {url}/api/embed` (default URL `http://localhost:11434`).
/// Requires Ollama to be running with an embedding model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig, model: Option<String>) -> Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_with_retry(
            &self.client,
            &format!("{}/api/embed", self.url),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::provider("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(|e| json_to_vec(e, "Ollama"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            dims: 4,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_provider_kind_parse() {
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Ollama,
            ProviderKind::Mock,
            ProviderKind::Local,
        ] {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("disabled".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&config("mock")).unwrap();
        assert_eq!(provider.model_name(), "mock");
        assert_eq!(provider.dims(), 4);
    }

    #[test]
    fn test_create_unknown_provider_is_config_error() {
        let err = create_provider(&config("cohere")).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[cfg(not(feature = "local-embeddings-fastembed"))]
    #[test]
    fn test_local_without_feature_is_config_error() {
        let err = create_provider(&config("local")).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[test]
    fn test_openai_rejects_empty_key_and_unknown_model() {
        let cfg = config("openai");
        assert!(matches!(
            OpenAiProvider::with_api_key(&cfg, None, String::new()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            OpenAiProvider::with_api_key(&cfg, Some("ada".to_string()), "sk-x".to_string()),
            Err(Error::Config(_))
        ));
        let ok = OpenAiProvider::with_api_key(&cfg, None, "sk-x".to_string()).unwrap();
        assert_eq!(ok.model_name(), DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_ollama_defaults() {
        let provider = OllamaProvider::new(&config("ollama"), None).unwrap();
        assert_eq!(provider.model_name(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(provider.url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_parse_openai_response_reorders_by_index() {
        let json = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        });
        let out = parse_openai_response(&json).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        let err = parse_openai_response(&serde_json::json!({"error": "x"})).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({"embeddings": [[0.5, 0.25], [1.0, 2.0]]});
        let out = parse_ollama_response(&json).unwrap();
        assert_eq!(out, vec![vec![0.5, 0.25], vec![1.0, 2.0]]);

        let bad = serde_json::json!({"embeddings": [["x"]]});
        assert!(parse_ollama_response(&bad).is_err());
    }
}
