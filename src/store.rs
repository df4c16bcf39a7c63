//! Lazily loaded, read-only vector store.
//!
//! A [`VectorStore`] starts out [`StoreState::Unloaded`]. The first
//! [`VectorStore::retrieve`] call reads the corpus artifact and initialises
//! the embedder; concurrent callers wait on the same load instead of
//! starting their own. A failed load leaves the store unloaded, so the next
//! call tries again (for example after `medirag build` has been run).
//!
//! Once loaded, the corpus is immutable and queries run concurrently without
//! locking. Share the store behind an [`Arc`].
//!
//! ```rust,no_run
//! # async fn demo() -> medirag::error::Result<()> {
//! use medirag::config::EmbeddingConfig;
//! use medirag::store::VectorStore;
//!
//! let store = VectorStore::new("data/embeddings.json", EmbeddingConfig::default());
//! let result = store.retrieve("What causes fever?", 3).await?;
//! println!("{}", result.context);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::artifact::read_artifact;
use crate::config::{Config, EmbeddingConfig};
use crate::embedding::{create_embedder, embed_query, Embedder};
use crate::error::{Error, Result};
use crate::models::{Corpus, RetrievedContext};
use crate::search::retrieve_from;

/// Lifecycle of a [`VectorStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unloaded,
    Loading,
    Loaded,
}

enum EmbedderSource {
    Config(EmbeddingConfig),
    Ready(Arc<dyn Embedder>),
}

struct LoadedStore {
    corpus: Corpus,
    /// `None` only for an empty corpus, which never needs query vectors.
    embedder: Option<Arc<dyn Embedder>>,
    model: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

/// Clears the loading flag when the load finishes, fails, or is cancelled.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct VectorStore {
    artifact_path: PathBuf,
    embedder: EmbedderSource,
    loaded: OnceCell<LoadedStore>,
    loading: AtomicBool,
    loads: AtomicUsize,
}

impl VectorStore {
    /// A store that builds its embedder from `embedding` when first loaded.
    pub fn new(artifact_path: impl Into<PathBuf>, embedding: EmbeddingConfig) -> Self {
        Self::with_source(artifact_path.into(), EmbedderSource::Config(embedding))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.corpus.artifact.clone(), config.embedding.clone())
    }

    /// A store that embeds queries with an already constructed embedder.
    pub fn with_embedder(artifact_path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_source(artifact_path.into(), EmbedderSource::Ready(embedder))
    }

    fn with_source(artifact_path: PathBuf, embedder: EmbedderSource) -> Self {
        Self {
            artifact_path,
            embedder,
            loaded: OnceCell::new(),
            loading: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn state(&self) -> StoreState {
        if self.loaded.initialized() {
            StoreState::Loaded
        } else if self.loading.load(Ordering::SeqCst) {
            StoreState::Loading
        } else {
            StoreState::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == StoreState::Loaded
    }

    /// Number of load attempts started so far, successful or not.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of documents in the loaded corpus, loading it if needed.
    pub async fn document_count(&self) -> Result<usize> {
        Ok(self.loaded_store().await?.corpus.len())
    }

    /// Model name recorded in the artifact, if any.
    pub async fn corpus_model(&self) -> Result<Option<String>> {
        Ok(self.loaded_store().await?.model.clone())
    }

    /// Load the corpus and embedder unless that already happened.
    pub async fn ensure_loaded(&self) -> Result<()> {
        self.loaded_store().await.map(|_| ())
    }

    async fn loaded_store(&self) -> Result<&LoadedStore> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedStore> {
        let _guard = LoadingGuard::raise(&self.loading);
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(path = %self.artifact_path.display(), attempt, "loading corpus artifact");

        let path = self.artifact_path.clone();
        let artifact = tokio::task::spawn_blocking(move || read_artifact(&path))
            .await
            .map_err(|e| Error::store_unavailable(&self.artifact_path, e.to_string()))??;
        let corpus = artifact.corpus;

        let embedder = if corpus.is_empty() {
            None
        } else {
            let embedder = self.resolve_embedder().await?;
            let expected = embedder.dims();
            if expected != 0 && expected != corpus.dims() {
                return Err(Error::store_unavailable(
                    &self.artifact_path,
                    format!(
                        "corpus vectors have {} dimensions ({}) but embedder {} produces {}",
                        corpus.dims(),
                        artifact.model.as_deref().unwrap_or("unknown model"),
                        embedder.model_name(),
                        expected
                    ),
                ));
            }
            if let Some(model) = artifact.model.as_deref() {
                if model != embedder.model_name() {
                    return Err(Error::store_unavailable(
                        &self.artifact_path,
                        format!(
                            "corpus was embedded with model {} but queries would use {}",
                            model,
                            embedder.model_name()
                        ),
                    ));
                }
            }
            Some(embedder)
        };

        info!(
            path = %self.artifact_path.display(),
            documents = corpus.len(),
            dims = corpus.dims(),
            model = artifact.model.as_deref().unwrap_or("unknown"),
            "corpus loaded"
        );

        Ok(LoadedStore {
            corpus,
            embedder,
            model: artifact.model,
            created_at: artifact.created_at,
        })
    }

    async fn resolve_embedder(&self) -> Result<Arc<dyn Embedder>> {
        match &self.embedder {
            EmbedderSource::Ready(embedder) => Ok(Arc::clone(embedder)),
            EmbedderSource::Config(config) => {
                let config = config.clone();
                let embedder = tokio::task::spawn_blocking(move || create_embedder(&config))
                    .await
                    .map_err(Error::embedding)??;
                Ok(Arc::from(embedder))
            }
        }
    }

    /// Return the `top_k` documents most similar to `query`.
    ///
    /// `context` holds their texts best first, separated by a blank line;
    /// `sources` is the set of their source labels. An empty corpus yields an
    /// empty result without embedding the query.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievedContext> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be at least 1".to_string()));
        }

        let store = self.loaded_store().await?;
        let embedder = match &store.embedder {
            Some(embedder) if !store.corpus.is_empty() => embedder,
            _ => return Ok(RetrievedContext::default()),
        };

        let query_vec = embed_query(embedder.as_ref(), query).await?;
        let result = retrieve_from(&store.corpus, &query_vec, top_k);

        debug!(
            top_k,
            hits = result.hits.len(),
            best = result.hits.first().map(|h| h.score),
            built = ?store.created_at,
            "retrieved context"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::write_artifact;
    use crate::embedding::{embed_texts, DisabledEmbedder, HashingEmbedder};
    use crate::models::{Document, EmbeddingMatrix};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }
    }

    fn qa(id: &str, q: &str, a: &str, source: &str) -> Document {
        Document::from_qa(id.to_string(), q, a, source.to_string())
    }

    async fn build(path: &Path, embedder: &dyn Embedder, docs: Vec<Document>) {
        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let vectors = embed_texts(embedder, &texts).await.unwrap();
        let corpus = Corpus::new(docs, EmbeddingMatrix::from_rows(vectors).unwrap()).unwrap();
        write_artifact(path, &corpus, embedder.model_name()).unwrap();
    }

    fn medical_docs() -> Vec<Document> {
        vec![
            qa("bioasq_0", "What is fever?", "Elevated body temperature.", "BioASQ | x"),
            qa("medquad_0", "What is cough?", "A reflex clearing airways.", "MedQuAD"),
        ]
    }

    #[tokio::test]
    async fn fever_query_returns_fever_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
        build(&path, embedder.as_ref(), medical_docs()).await;

        let store = VectorStore::with_embedder(&path, embedder);
        assert_eq!(store.state(), StoreState::Unloaded);

        let result = store.retrieve("What causes fever?", 1).await.unwrap();
        assert_eq!(result.context, "Q: What is fever?\nA: Elevated body temperature.");
        assert_eq!(
            result.sources.into_iter().collect::<Vec<_>>(),
            vec!["BioASQ | x".to_string()]
        );
        assert_eq!(store.state(), StoreState::Loaded);
    }

    #[tokio::test]
    async fn repeated_queries_are_deterministic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
        build(&path, embedder.as_ref(), medical_docs()).await;

        let store = VectorStore::with_embedder(&path, embedder);
        let first = store.retrieve("cough reflex", 2).await.unwrap();
        let second = store.retrieve("cough reflex", 2).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.hits.len(), 2);
        assert_eq!(first.hits[0].id, "medquad_0");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_load_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        let embedder = Arc::new(CountingEmbedder {
            inner: HashingEmbedder::new(64),
            calls: AtomicUsize::new(0),
        });
        build(&path, &*embedder, medical_docs()).await;

        let store = Arc::new(VectorStore::with_embedder(&path, embedder.clone()));
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.retrieve(&format!("fever {}", i), 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load_count(), 1);
        // one build call plus one call per query
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 17);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(32));
        let store = VectorStore::with_embedder(&path, Arc::clone(&embedder));

        let err = store.retrieve("fever", 1).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
        assert!(err.to_string().contains("medirag build"));
        assert_eq!(store.state(), StoreState::Unloaded);

        build(&path, embedder.as_ref(), medical_docs()).await;
        let result = store.retrieve("fever", 1).await.unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(store.load_count(), 2);
        assert_eq!(store.document_count().await.unwrap(), 2);
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn dims_mismatch_is_rejected_at_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        build(&path, &HashingEmbedder::new(16), medical_docs()).await;

        let store = VectorStore::with_embedder(&path, Arc::new(HashingEmbedder::new(32)));
        let err = store.retrieve("fever", 1).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
        assert!(err.to_string().contains("16 dimensions"));
        assert!(!store.is_loaded());
    }

    #[tokio::test]
    async fn model_mismatch_is_rejected_at_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        build(&path, &HashingEmbedder::new(64), medical_docs()).await;

        let other = Arc::new(CountingEmbedder {
            inner: HashingEmbedder::new(64),
            calls: AtomicUsize::new(0),
        });
        let store = VectorStore::with_embedder(&path, other.clone());
        let err = store.retrieve("fever", 1).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
        let msg = err.to_string();
        assert!(msg.contains("feature-hashing"));
        assert!(msg.contains("counting"));
        assert!(!store.is_loaded());
        assert_eq!(other.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_corpus_skips_the_embedder() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        write_artifact(&path, &Corpus::default(), "none").unwrap();

        let store = VectorStore::with_embedder(&path, Arc::new(DisabledEmbedder));
        assert_eq!(store.artifact_path(), path.as_path());
        store.ensure_loaded().await.unwrap();
        let result = store.retrieve("anything", 3).await.unwrap();
        assert_eq!(result, RetrievedContext::default());
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn zero_top_k_is_invalid() {
        let store = VectorStore::with_embedder("unused.json", Arc::new(DisabledEmbedder));
        let err = store.retrieve("fever", 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(store.load_count(), 0);
    }

    #[tokio::test]
    async fn embedder_from_config_is_built_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        build(&path, &HashingEmbedder::new(384), medical_docs()).await;

        let config = EmbeddingConfig {
            provider: "hashing".to_string(),
            ..EmbeddingConfig::default()
        };
        let store = VectorStore::new(&path, config);
        let result = store.retrieve("What causes fever?", 1).await.unwrap();
        assert_eq!(result.hits[0].id, "bioasq_0");
        assert_eq!(
            store.corpus_model().await.unwrap().as_deref(),
            Some("feature-hashing")
        );
    }
}
