//! # medirag
//!
//! Semantic retrieval over medical question/answer corpora.
//!
//! medirag ingests two public QA collections (a tree of XML files with
//! `QAPair` elements and a CSV file of question/answer rows), embeds every
//! pair with a sentence-embedding model, persists the result as a single
//! JSON artifact, and answers queries with the top-k most similar pairs.
//! The returned context and source labels are meant to ground a downstream
//! language-model prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Connectors  │──▶│  Embedder   │──▶│   Artifact   │
//! │  XML / CSV  │   │ (one pass)  │   │    (JSON)    │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ lazy, once
//!                                            ▼
//!                                     ┌──────────────┐
//!                                     │ VectorStore  │──▶ context + sources
//!                                     │ top-k cosine │
//!                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! medirag build                         # scan corpora, embed, write artifact
//! medirag query "What causes fever?"    # top-3 context with sources
//! medirag query "fever" --prompt        # grounded prompt for an LLM
//! medirag stats                         # what the artifact contains
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`traits`] | Connector trait and registry |
//! | [`connector_xml`] | `QAPair` markup connector |
//! | [`connector_csv`] | Question/answer CSV connector |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`ingest`] | Corpus build pipeline |
//! | [`artifact`] | Artifact persistence |
//! | [`store`] | Lazily loaded vector store |
//! | [`search`] | Top-k cosine ranking |
//! | [`prompt`] | Grounded prompt assembly |

pub mod artifact;
pub mod config;
pub mod connector_csv;
pub mod connector_xml;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod progress;
pub mod prompt;
pub mod search;
pub mod sources;
pub mod stats;
pub mod store;
pub mod traits;
