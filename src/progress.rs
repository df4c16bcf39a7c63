//! Build progress reporting.
//!
//! Reports observable progress during `medirag build` so users see which
//! corpus is being scanned, how many documents it produced, and when the
//! (potentially slow) embedding step starts. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::path::PathBuf;

/// A single progress event for a build.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildProgressEvent {
    /// Connector has started reading its input.
    Scanning { connector: String },
    /// Connector finished: documents produced and items skipped.
    Scanned {
        connector: String,
        documents: u64,
        skipped: u64,
    },
    /// All documents are being embedded in one pass.
    Embedding { documents: u64, model: String },
    /// The artifact is being written.
    Writing { path: PathBuf },
}

/// Reports build progress. Implementations write to stderr (human or JSON).
pub trait BuildProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the build pipeline.
    fn report(&self, event: BuildProgressEvent);
}

/// Human-friendly progress on stderr: "build xml  1,234 documents (2 skipped)".
pub struct StderrProgress;

impl BuildProgressReporter for StderrProgress {
    fn report(&self, event: BuildProgressEvent) {
        let line = match &event {
            BuildProgressEvent::Scanning { connector } => {
                format!("build {}  scanning...\n", connector)
            }
            BuildProgressEvent::Scanned {
                connector,
                documents,
                skipped,
            } => {
                if *skipped > 0 {
                    format!(
                        "build {}  {} documents ({} skipped)\n",
                        connector,
                        format_number(*documents),
                        format_number(*skipped)
                    )
                } else {
                    format!(
                        "build {}  {} documents\n",
                        connector,
                        format_number(*documents)
                    )
                }
            }
            BuildProgressEvent::Embedding { documents, model } => {
                format!(
                    "build  embedding {} documents with {}\n",
                    format_number(*documents),
                    model
                )
            }
            BuildProgressEvent::Writing { path } => {
                format!("build  writing {}\n", path.display())
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &BuildProgressEvent) -> serde_json::Value {
        match event {
            BuildProgressEvent::Scanning { connector } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "connector": connector
            }),
            BuildProgressEvent::Scanned {
                connector,
                documents,
                skipped,
            } => serde_json::json!({
                "event": "progress",
                "phase": "scanned",
                "connector": connector,
                "documents": documents,
                "skipped": skipped
            }),
            BuildProgressEvent::Embedding { documents, model } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "documents": documents,
                "model": model
            }),
            BuildProgressEvent::Writing { path } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "path": path.display().to_string()
            }),
        }
    }
}

impl BuildProgressReporter for JsonProgress {
    fn report(&self, event: BuildProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BuildProgressReporter for NoProgress {
    fn report(&self, _event: BuildProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn BuildProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
