//! Core data models used throughout medirag.
//!
//! These types represent the documents, vectors, and retrieval results that
//! flow through the build and query pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// One retrievable question/answer unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source: String,
}

impl Document {
    /// Builds a document from a question/answer pair using the
    /// `"Q: ...\nA: ..."` convention shared by every connector.
    pub fn from_qa(id: String, question: &str, answer: &str, source: String) -> Self {
        Self {
            id,
            text: format!("Q: {}\nA: {}", question, answer),
            source,
        }
    }
}

/// Row-major matrix of embedding vectors with a fixed row width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    dims: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Flattens a list of vectors. Every vector must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dims = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(dims * rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dims {
                return Err(Error::InvalidArgument(format!(
                    "embedding {} has {} dimensions, expected {}",
                    i,
                    row.len(),
                    dims
                )));
            }
            data.extend(row);
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn rows(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.dims.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }
}

/// Documents paired positionally with their embedding vectors.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    embeddings: EmbeddingMatrix,
}

impl Corpus {
    /// Pairs documents with vectors, enforcing `documents.len() == rows`.
    pub fn new(documents: Vec<Document>, embeddings: EmbeddingMatrix) -> Result<Self> {
        if documents.len() != embeddings.rows() {
            return Err(Error::InvalidArgument(format!(
                "corpus has {} documents but {} embeddings",
                documents.len(),
                embeddings.rows()
            )));
        }
        Ok(Self {
            documents,
            embeddings,
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.embeddings.dims()
    }
}

/// A single ranked document in a retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    /// Position of the document in the corpus.
    pub index: usize,
    pub id: String,
    pub source: String,
    /// Cosine similarity to the query, in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Result of a top-k query: prompt context plus source attribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievedContext {
    /// Texts of the selected documents, best first, separated by a blank line.
    pub context: String,
    /// Deduplicated source labels of the selected documents.
    pub sources: BTreeSet<String>,
    pub hits: Vec<Hit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_qa_uses_q_a_convention() {
        let doc = Document::from_qa(
            "x_0".into(),
            "What is fever?",
            "Elevated body temperature.",
            "A".into(),
        );
        assert_eq!(doc.text, "Q: What is fever?\nA: Elevated body temperature.");
    }

    #[test]
    fn matrix_rejects_ragged_rows() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn matrix_rows_are_addressable() {
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.dims(), 2);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn empty_matrix_has_no_rows() {
        let m = EmbeddingMatrix::from_rows(Vec::new()).unwrap();
        assert_eq!(m.rows(), 0);
        assert_eq!(m.iter_rows().count(), 0);
    }

    #[test]
    fn corpus_requires_parallel_lengths() {
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0]]).unwrap();
        assert!(Corpus::new(Vec::new(), m).is_err());
    }
}
