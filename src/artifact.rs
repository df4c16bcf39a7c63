//! Persisted corpus artifact (JSON).
//!
//! ```json
//! {
//!   "model": "all-minilm-l6-v2",
//!   "dims": 384,
//!   "created_at": "2026-10-18T09:00:00Z",
//!   "documents": [{ "id": "bioasq_0", "text": "Q: ...\nA: ...", "source": "BioASQ | 1_CancerGov" }],
//!   "embeddings": [[0.01, -0.2, ...]]
//! }
//! ```
//!
//! `model`, `dims` and `created_at` are optional when reading, so a file that
//! only carries `documents` and `embeddings` still loads. Writes go to a
//! sibling temporary file that is renamed over the target, so readers never
//! see a half-written artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{Corpus, Document, EmbeddingMatrix};

#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusArtifact {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub documents: Vec<Document>,
    pub embeddings: Vec<Vec<f32>>,
}

/// A corpus read back from disk, with the metadata recorded at build time.
#[derive(Debug)]
pub struct LoadedArtifact {
    pub corpus: Corpus,
    pub model: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Serialize `corpus` to `path`, replacing any previous artifact.
pub fn write_artifact(path: &Path, corpus: &Corpus, model: &str) -> Result<()> {
    let artifact = CorpusArtifact {
        model: Some(model.to_string()),
        dims: Some(corpus.dims()),
        created_at: Some(Utc::now()),
        documents: corpus.documents().to_vec(),
        embeddings: corpus.embeddings().to_rows(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = (|| -> Result<()> {
        let file = std::fs::File::create(&tmp)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, &artifact)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read and validate the artifact at `path`.
///
/// Every failure (missing file, bad JSON, mismatched lengths, ragged or
/// mislabelled vectors) is reported as [`Error::StoreUnavailable`].
pub fn read_artifact(path: &Path) -> Result<LoadedArtifact> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::store_unavailable(path, "artifact not found"));
        }
        Err(e) => return Err(Error::store_unavailable(path, e.to_string())),
    };

    let artifact: CorpusArtifact = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| Error::store_unavailable(path, format!("corrupt artifact: {}", e)))?;

    let matrix = EmbeddingMatrix::from_rows(artifact.embeddings)
        .map_err(|e| Error::store_unavailable(path, e.to_string()))?;

    if let Some(dims) = artifact.dims {
        if matrix.rows() > 0 && dims != matrix.dims() {
            return Err(Error::store_unavailable(
                path,
                format!(
                    "artifact declares {} dimensions but stores {}-dimensional vectors",
                    dims,
                    matrix.dims()
                ),
            ));
        }
    }

    let corpus = Corpus::new(artifact.documents, matrix)
        .map_err(|e| Error::store_unavailable(path, e.to_string()))?;

    Ok(LoadedArtifact {
        corpus,
        model: artifact.model,
        created_at: artifact.created_at,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn two_doc_corpus() -> Corpus {
        let docs = vec![
            Document {
                id: "a_0".into(),
                text: "Q: one\nA: 1".into(),
                source: "A".into(),
            },
            Document {
                id: "b_0".into(),
                text: "Q: two\nA: 2".into(),
                source: "B".into(),
            },
        ];
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0, 0.5], vec![0.0, 1.0, -0.5]]).unwrap();
        Corpus::new(docs, m).unwrap()
    }

    #[test]
    fn write_then_read_preserves_order_and_dims() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/embeddings.json");
        write_artifact(&path, &two_doc_corpus(), "test-model").unwrap();

        let loaded = read_artifact(&path).unwrap();
        assert_eq!(loaded.model.as_deref(), Some("test-model"));
        assert!(loaded.created_at.is_some());
        assert_eq!(loaded.corpus.len(), 2);
        assert_eq!(loaded.corpus.dims(), 3);
        assert_eq!(loaded.corpus.documents()[1].id, "b_0");
        assert_eq!(loaded.corpus.embeddings().row(1), &[0.0, 1.0, -0.5]);

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind: {:?}", leftovers);
    }

    #[test]
    fn reads_artifact_without_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        fs::write(
            &path,
            r#"{"documents":[{"id":"x","text":"Q: a\nA: b","source":"S"}],"embeddings":[[0.1,0.2]]}"#,
        )
        .unwrap();
        let loaded = read_artifact(&path).unwrap();
        assert!(loaded.model.is_none());
        assert_eq!(loaded.corpus.dims(), 2);
    }

    #[test]
    fn missing_artifact_is_store_unavailable() {
        let tmp = TempDir::new().unwrap();
        let err = read_artifact(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
        assert!(err.to_string().contains("medirag build"));
    }

    #[test]
    fn corrupt_or_inconsistent_artifacts_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");

        for body in [
            "{not json",
            r#"{"documents":[{"id":"x","text":"t","source":"s"}],"embeddings":[]}"#,
            r#"{"documents":[],"embeddings":[[1.0],[1.0,2.0]]}"#,
            r#"{"dims":4,"documents":[{"id":"x","text":"t","source":"s"}],"embeddings":[[1.0,2.0]]}"#,
        ] {
            fs::write(&path, body).unwrap();
            let err = read_artifact(&path).unwrap_err();
            assert!(
                matches!(err, Error::StoreUnavailable { .. }),
                "{} accepted: {:?}",
                body,
                err
            );
        }
    }

    #[test]
    fn empty_corpus_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.json");
        write_artifact(&path, &Corpus::default(), "m").unwrap();
        let loaded = read_artifact(&path).unwrap();
        assert!(loaded.corpus.is_empty());
    }
}
