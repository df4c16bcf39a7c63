//! TOML configuration parsing and validation.
//!
//! Every path the engine touches (input corpora, the persisted artifact) and
//! the embedding provider are resolved from a single file, by default
//! `./config/medirag.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Location of the persisted corpus artifact (JSON).
    pub artifact: PathBuf,
    #[serde(default)]
    pub markup: Option<MarkupCorpusConfig>,
    #[serde(default)]
    pub delimited: Option<DelimitedCorpusConfig>,
}

/// Directory tree of XML files containing `QAPair` elements.
#[derive(Debug, Deserialize, Clone)]
pub struct MarkupCorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_markup_label")]
    pub label: String,
    #[serde(default = "default_markup_id_prefix")]
    pub id_prefix: String,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_markup_label() -> String {
    "BioASQ".to_string()
}
fn default_markup_id_prefix() -> String {
    "bioasq".to_string()
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

/// Single delimited-text file with `question` and `answer` columns.
#[derive(Debug, Deserialize, Clone)]
pub struct DelimitedCorpusConfig {
    pub path: PathBuf,
    #[serde(default = "default_delimited_label")]
    pub label: String,
    #[serde(default = "default_delimited_id_prefix")]
    pub id_prefix: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimited_label() -> String {
    "MedQuAD".to_string()
}
fn default_delimited_id_prefix() -> String {
    "medquad".to_string()
}
fn default_delimiter() -> String {
    ",".to_string()
}

impl DelimitedCorpusConfig {
    /// The delimiter as a single byte. Validated by [`load_config`].
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
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
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
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
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "hashing" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hashing, local, openai, or ollama.",
            other
        ),
    }

    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    if let Some(delimited) = &config.corpus.delimited {
        if delimited.delimiter.len() != 1 {
            bail!(
                "corpus.delimited.delimiter must be a single ASCII character, got '{}'",
                delimited.delimiter
            );
        }
    }

    if let Some(markup) = &config.corpus.markup {
        if markup.include_globs.is_empty() {
            bail!("corpus.markup.include_globs must not be empty");
        }
    }

    Ok(config)
}
