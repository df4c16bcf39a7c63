//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and concrete implementations:
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`HashingEmbedder`]**: offline feature-hashing vectors; no model download.
//! - **[`LocalEmbedder`]**: runs an ONNX sentence-transformer locally via fastembed.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//!
//! The corpus build and the query path must embed through the same provider
//! so that their vectors share one space. [`embed_texts`] and
//! [`embed_query`] are the validated entry points used by both.
//!
//! # Provider Selection
//!
//! ```rust
//! # use medirag::config::EmbeddingConfig;
//! # use medirag::embedding::create_embedder;
//! let config = EmbeddingConfig {
//!     provider: "hashing".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "feature-hashing");
//! assert_eq!(embedder.dims(), 384);
//! ```

mod hashing;
#[cfg(feature = "local-embeddings-fastembed")]
mod local;
mod remote;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

pub use hashing::HashingEmbedder;
#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;
pub use remote::{OllamaEmbedder, OpenAIEmbedder};

/// A text → vector function with a fixed output dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality, or `0` if unknown.
    fn dims(&self) -> usize;

    /// Embed many texts. Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a batch of texts and check the provider's output shape.
///
/// Fails with [`Error::Embedding`] if the provider returns a different number
/// of vectors than inputs, or vectors whose length differs from
/// [`Embedder::dims`] (or from each other when `dims` is unknown).
pub async fn embed_texts(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed_batch(texts).await?;
    if vectors.len() != texts.len() {
        return Err(Error::Embedding(format!(
            "{} returned {} vectors for {} texts",
            embedder.model_name(),
            vectors.len(),
            texts.len()
        )));
    }

    let expected = match embedder.dims() {
        0 => vectors[0].len(),
        d => d,
    };
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
        return Err(Error::Embedding(format!(
            "{} returned a {}-dimensional vector at position {}, expected {}",
            embedder.model_name(),
            v.len(),
            i,
            expected
        )));
    }

    Ok(vectors)
}

/// Embed a single query text.
///
/// Goes through [`embed_texts`] so queries and documents share one code path
/// and therefore one vector space.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embed_texts(embedder, &[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::embedding("Empty embedding response"))
}

// ============ Disabled Provider ============

/// A no-op embedder that always returns errors.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::embedding(
            "Embedding provider is disabled. Set [embedding] provider in config.",
        ))
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"hashing"` | [`HashingEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
///
/// The `local` provider loads its ONNX model here (downloading it on first
/// use), so this call may block for a while.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        "hashing" => match config.dims.unwrap_or(hashing::DEFAULT_DIMS) {
            0 => Err(Error::InvalidArgument(
                "embedding.dims must be > 0".to_string(),
            )),
            dims => Ok(Box::new(HashingEmbedder::new(dims))),
        },
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Box::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(Error::embedding(
            "Local embedding provider requires --features local-embeddings-fastembed",
        )),
        "openai" => Ok(Box::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => Err(Error::embedding(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` when either vector has zero magnitude, or for empty vectors
/// or vectors of different lengths.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}
