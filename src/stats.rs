//! Artifact statistics.
//!
//! Summarises what the last build produced: where the artifact lives, how
//! big it is, which model embedded it, and how many documents each source
//! contributed. Used by `medirag stats` to confirm a build before serving
//! queries from it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::artifact::{read_artifact, LoadedArtifact};
use crate::config::Config;

/// Per-source document counts plus artifact metadata.
#[derive(Debug)]
pub struct ArtifactStats {
    pub documents: usize,
    pub dims: usize,
    pub model: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub by_source: BTreeMap<String, usize>,
}

impl ArtifactStats {
    pub fn from_artifact(artifact: &LoadedArtifact) -> Self {
        let mut by_source = BTreeMap::new();
        for doc in artifact.corpus.documents() {
            *by_source.entry(doc.source.clone()).or_insert(0) += 1;
        }
        Self {
            documents: artifact.corpus.len(),
            dims: artifact.corpus.dims(),
            model: artifact.model.clone(),
            created_at: artifact.created_at,
            by_source,
        }
    }

    /// Sources ordered by document count (desc), then name.
    pub fn sources_by_count(&self) -> Vec<(&str, usize)> {
        let mut sources: Vec<(&str, usize)> = self
            .by_source
            .iter()
            .map(|(s, n)| (s.as_str(), *n))
            .collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        sources
    }
}

/// Run the stats command: read the artifact and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let path = &config.corpus.artifact;
    let artifact = read_artifact(path).context("Cannot read corpus artifact")?;
    let stats = ArtifactStats::from_artifact(&artifact);
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("medirag corpus stats");
    println!("====================");
    println!();
    println!("  Artifact:    {}", path.display());
    println!("  Size:        {}", format_bytes(size));
    println!(
        "  Model:       {}",
        stats.model.as_deref().unwrap_or("unknown")
    );
    println!("  Dims:        {}", stats.dims);
    println!(
        "  Built:       {}",
        stats
            .created_at
            .map(format_relative)
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!();
    println!("  Documents:   {}", stats.documents);

    let sources = stats.sources_by_count();
    if !sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<40} {:>8}", "SOURCE", "DOCS");
        println!("  {}", "-".repeat(49));
        for (source, count) in sources {
            println!("  {:<40} {:>8}", source, count);
        }
    }
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to now (e.g. "3 hours ago").
fn format_relative(ts: DateTime<Utc>) -> String {
    let delta = (Utc::now() - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
