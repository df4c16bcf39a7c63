//! Exact top-k cosine ranking over an in-memory corpus, and `medirag query`.
//!
//! The ranking functions are pure: they never touch the embedder or the
//! filesystem, so they can be tested with hand-made vectors.
//!
//! # Ranking
//!
//! 1. Score every stored row against the query with [`cosine_similarity`].
//! 2. Order by score (desc), then corpus index (asc). NaN scores sort last.
//! 3. Keep the first `top_k` (all rows when `top_k` exceeds the corpus).

use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::Config;
use crate::embedding::cosine_similarity;
use crate::models::{Corpus, EmbeddingMatrix, Hit, RetrievedContext};
use crate::prompt::build_rag_prompt;
use crate::store::VectorStore;

/// Separator placed between document texts in the returned context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// A corpus row and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredIndex {
    pub index: usize,
    pub score: f32,
}

fn sort_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

fn by_rank(a: &ScoredIndex, b: &ScoredIndex) -> Ordering {
    sort_key(b.score)
        .total_cmp(&sort_key(a.score))
        .then(a.index.cmp(&b.index))
}

/// Similarity of `query` to every row of `matrix`, in row order.
pub fn score_all(query: &[f32], matrix: &EmbeddingMatrix) -> Vec<f32> {
    matrix
        .iter_rows()
        .map(|row| cosine_similarity(query, row))
        .collect()
}

/// The `top_k` rows most similar to `query`, best first.
pub fn rank(query: &[f32], matrix: &EmbeddingMatrix, top_k: usize) -> Vec<ScoredIndex> {
    let mut scored: Vec<ScoredIndex> = score_all(query, matrix)
        .into_iter()
        .enumerate()
        .map(|(index, score)| ScoredIndex { index, score })
        .collect();

    if top_k == 0 {
        return Vec::new();
    }
    if top_k < scored.len() {
        scored.select_nth_unstable_by(top_k - 1, by_rank);
        scored.truncate(top_k);
    }
    scored.sort_by(by_rank);
    scored
}

/// Rank `corpus` against `query` and assemble context text and sources.
pub fn retrieve_from(corpus: &Corpus, query: &[f32], top_k: usize) -> RetrievedContext {
    if corpus.is_empty() {
        return RetrievedContext::default();
    }

    let ranked = rank(query, corpus.embeddings(), top_k);
    let docs = corpus.documents();

    let context = ranked
        .iter()
        .map(|s| docs[s.index].text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    let sources: BTreeSet<String> = ranked
        .iter()
        .map(|s| docs[s.index].source.clone())
        .collect();
    let hits = ranked
        .iter()
        .map(|s| Hit {
            index: s.index,
            id: docs[s.index].id.clone(),
            source: docs[s.index].source.clone(),
            score: s.score,
        })
        .collect();

    RetrievedContext {
        context,
        sources,
        hits,
    }
}

/// How `medirag query` prints its result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryOutput {
    Human,
    Json,
    Prompt,
}

/// `medirag query`: retrieve context for `query` and print it.
pub async fn run_query(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    output: QueryOutput,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let store = VectorStore::from_config(config);
    let result = store.retrieve(query, top_k).await?;

    match output {
        QueryOutput::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        QueryOutput::Prompt => print!("{}", build_rag_prompt(query, &result.context)),
        QueryOutput::Human => print_hits(&result),
    }
    Ok(())
}

fn print_hits(result: &RetrievedContext) {
    if result.hits.is_empty() {
        println!("No results.");
        return;
    }

    for (i, hit) in result.hits.iter().enumerate() {
        println!("{}. [{:.4}] {}  ({})", i + 1, hit.score, hit.id, hit.source);
    }
    println!();
    println!("{}", result.context);
    println!();
    let sources: Vec<&str> = result.sources.iter().map(|s| s.as_str()).collect();
    println!("Sources: {}", sources.join(", "));
}
