//! Corpus build pipeline.
//!
//! Coordinates the full build: connectors → documents → one embedding pass
//! → artifact. The build is all-or-nothing: any connector configuration
//! error or embedding failure aborts before the artifact is touched, and a
//! successful build replaces the previous artifact atomically.

use anyhow::{bail, Context};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::artifact::write_artifact;
use crate::config::Config;
use crate::embedding::{create_embedder, embed_texts, Embedder};
use crate::error::Result;
use crate::models::{Corpus, EmbeddingMatrix};
use crate::progress::{format_number, BuildProgressEvent, BuildProgressReporter, ProgressMode};
use crate::traits::{ConnectorRegistry, ScanReport, Skipped};

/// Skipped items listed individually in the CLI summary.
const MAX_SKIPPED_SHOWN: usize = 10;

/// What one connector contributed to a build.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorSummary {
    pub connector: String,
    pub documents: usize,
    pub files_scanned: usize,
    pub skipped: usize,
}

/// Result of a build (or a dry run, which leaves `dims` at 0 and `model` empty).
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub documents: usize,
    pub connectors: Vec<ConnectorSummary>,
    /// Document count per source label.
    pub per_source: BTreeMap<String, usize>,
    pub skipped: Vec<Skipped>,
    pub dims: usize,
    pub model: String,
    pub artifact_path: PathBuf,
}

impl BuildSummary {
    fn from_reports(reports: &[ScanReport], artifact_path: &Path) -> Self {
        let mut per_source = BTreeMap::new();
        for doc in reports.iter().flat_map(|r| r.documents.iter()) {
            *per_source.entry(doc.source.clone()).or_insert(0) += 1;
        }
        Self {
            documents: reports.iter().map(|r| r.documents.len()).sum(),
            connectors: reports
                .iter()
                .map(|r| ConnectorSummary {
                    connector: r.connector.clone(),
                    documents: r.documents.len(),
                    files_scanned: r.files_scanned,
                    skipped: r.skipped.len(),
                })
                .collect(),
            per_source,
            skipped: reports.iter().flat_map(|r| r.skipped.clone()).collect(),
            dims: 0,
            model: String::new(),
            artifact_path: artifact_path.to_path_buf(),
        }
    }
}

/// Run every connector in registration order.
///
/// Stops at the first connector that returns an error.
pub fn scan_all(
    registry: &ConnectorRegistry,
    progress: &dyn BuildProgressReporter,
) -> Result<Vec<ScanReport>> {
    let mut reports = Vec::with_capacity(registry.len());
    for connector in registry.connectors() {
        progress.report(BuildProgressEvent::Scanning {
            connector: connector.name().to_string(),
        });
        let report = connector.scan()?;
        info!(
            connector = connector.name(),
            documents = report.documents.len(),
            files = report.files_scanned,
            skipped = report.skipped.len(),
            "scan complete"
        );
        progress.report(BuildProgressEvent::Scanned {
            connector: connector.name().to_string(),
            documents: report.documents.len() as u64,
            skipped: report.skipped.len() as u64,
        });
        reports.push(report);
    }
    Ok(reports)
}

/// Scan, embed, and persist the corpus to `artifact_path`.
///
/// Document order in the artifact is connector order, then each
/// connector's own order. All document texts go to the embedder in a single
/// [`embed_texts`] call.
pub async fn build_corpus(
    registry: &ConnectorRegistry,
    embedder: &dyn Embedder,
    artifact_path: &Path,
    progress: &dyn BuildProgressReporter,
) -> Result<BuildSummary> {
    let reports = scan_all(registry, progress)?;
    let mut summary = BuildSummary::from_reports(&reports, artifact_path);

    let documents: Vec<_> = reports.into_iter().flat_map(|r| r.documents).collect();
    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();

    progress.report(BuildProgressEvent::Embedding {
        documents: texts.len() as u64,
        model: embedder.model_name().to_string(),
    });
    let vectors = embed_texts(embedder, &texts).await?;
    let corpus = Corpus::new(documents, EmbeddingMatrix::from_rows(vectors)?)?;

    progress.report(BuildProgressEvent::Writing {
        path: artifact_path.to_path_buf(),
    });
    summary.dims = corpus.dims();
    summary.model = embedder.model_name().to_string();
    let path = artifact_path.to_path_buf();
    let model = summary.model.clone();
    tokio::task::spawn_blocking(move || write_artifact(&path, &corpus, &model))
        .await
        .map_err(std::io::Error::from)??;

    info!(
        documents = summary.documents,
        dims = summary.dims,
        model = %summary.model,
        path = %artifact_path.display(),
        "corpus artifact written"
    );
    Ok(summary)
}

/// `medirag build`: resolve connectors and embedder from `config` and build.
pub async fn run_build(config: &Config, dry_run: bool, mode: ProgressMode) -> anyhow::Result<()> {
    let registry = ConnectorRegistry::from_config(config);
    if registry.is_empty() {
        bail!("No corpus configured. Add [corpus.markup] and/or [corpus.delimited] to the config.");
    }
    let progress = mode.reporter();
    let artifact_path = &config.corpus.artifact;

    if dry_run {
        let reports = scan_all(&registry, progress.as_ref())?;
        let summary = BuildSummary::from_reports(&reports, artifact_path);
        println!("build (dry-run)");
        print_counts(&summary);
        println!("  artifact (not written): {}", artifact_path.display());
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config to build the corpus.");
    }
    let embedding = config.embedding.clone();
    let embedder: Arc<dyn Embedder> =
        Arc::from(tokio::task::spawn_blocking(move || create_embedder(&embedding)).await??);

    let summary = build_corpus(&registry, embedder.as_ref(), artifact_path, progress.as_ref())
        .await
        .with_context(|| format!("Build failed; {} left unchanged", artifact_path.display()))?;

    println!("build");
    print_counts(&summary);
    println!("  model: {}", summary.model);
    println!("  dims: {}", summary.dims);
    println!("  artifact: {}", summary.artifact_path.display());
    println!("ok");
    Ok(())
}

fn print_counts(summary: &BuildSummary) {
    println!("  documents: {}", format_number(summary.documents as u64));
    for c in &summary.connectors {
        println!(
            "    {}: {} documents from {} files ({} skipped)",
            c.connector,
            format_number(c.documents as u64),
            c.files_scanned,
            c.skipped
        );
    }
    println!("  skipped: {}", summary.skipped.len());
    for s in summary.skipped.iter().take(MAX_SKIPPED_SHOWN) {
        println!("    {}: {}", s.location, s.reason);
    }
    if summary.skipped.len() > MAX_SKIPPED_SHOWN {
        println!("    ... and {} more", summary.skipped.len() - MAX_SKIPPED_SHOWN);
    }
}
